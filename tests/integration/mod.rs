//! Integration Tests Module
//!
//! End-to-end coverage for the orchestration substrate: Memory Hub
//! round-trip/TTL/persistence invariants, the Safety Layer's circuit
//! breaker and resource limiter round trips, and the report-flow discipline
//! and phase sequencing a full upgrade run exercises. No network calls are
//! made — agents run against `orchestrator_llm::MockProvider`.

mod memory_hub_test;
mod safety_test;
mod report_flow_test;
mod orchestrator_loop_test;
