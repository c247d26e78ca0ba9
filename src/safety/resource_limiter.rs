//! Resource Limiter
//!
//! Enforces per-process caps on memory, CPU, open file handles, per-task
//! wall-clock, and concurrent task count. Ported from
//! `backend/packages/safety/resource_limiter.py`, which races the guarded
//! coroutine against a polling monitor via `asyncio.wait(FIRST_COMPLETED)`
//! and samples process stats through `psutil`. The Rust port races the same
//! way via `tokio::select!` (dropping the losing branch cancels it) and
//! samples through `sysinfo`, the closest in-pack equivalent to `psutil`.

use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use sysinfo::System;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Memory,
    Cpu,
    Time,
    Concurrent,
    File,
}

#[derive(Debug, thiserror::Error)]
#[error("resource exceeded ({kind:?}): {message}")]
pub struct ResourceExceededError {
    pub kind: ResourceKind,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceLimiterError<E> {
    #[error(transparent)]
    Exceeded(#[from] ResourceExceededError),
    #[error(transparent)]
    Inner(E),
}

#[derive(Debug, Clone)]
pub struct ResourceLimit {
    pub max_memory_mb: f64,
    pub max_cpu_percent: f64,
    pub max_open_files: usize,
    pub max_execution_time: Duration,
    pub max_concurrent_tasks: usize,
    pub check_interval: Duration,
}

impl Default for ResourceLimit {
    fn default() -> Self {
        Self {
            max_memory_mb: 2048.0,
            max_cpu_percent: 80.0,
            max_open_files: 1000,
            max_execution_time: Duration::from_secs(300),
            max_concurrent_tasks: 10,
            check_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceStats {
    pub memory_mb: f64,
    pub cpu_percent: f64,
    pub open_files: usize,
    pub current_tasks: usize,
    pub violations_memory: u64,
    pub violations_cpu: u64,
    pub violations_time: u64,
    pub violations_concurrent: u64,
    pub violations_file: u64,
}

#[derive(Default)]
struct Violations {
    memory: AtomicU64,
    cpu: AtomicU64,
    time: AtomicU64,
    concurrent: AtomicU64,
    file: AtomicU64,
}

impl Violations {
    fn bump(&self, kind: ResourceKind) {
        match kind {
            ResourceKind::Memory => self.memory.fetch_add(1, Ordering::Relaxed),
            ResourceKind::Cpu => self.cpu.fetch_add(1, Ordering::Relaxed),
            ResourceKind::Time => self.time.fetch_add(1, Ordering::Relaxed),
            ResourceKind::Concurrent => self.concurrent.fetch_add(1, Ordering::Relaxed),
            ResourceKind::File => self.file.fetch_add(1, Ordering::Relaxed),
        };
    }
}

/// Releases a concurrency slot on drop, regardless of how the guarded call
/// exits — the equivalent of the Python original's `try/finally` around
/// `_current_tasks`.
struct SlotGuard<'a> {
    current_tasks: &'a AtomicUsize,
}

impl Drop for SlotGuard<'_> {
    fn drop(&mut self) {
        self.current_tasks.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct ResourceLimiter {
    limits: Mutex<ResourceLimit>,
    current_tasks: AtomicUsize,
    violations: Violations,
    system: Mutex<System>,
}

impl ResourceLimiter {
    pub fn new(limits: ResourceLimit) -> Self {
        Self {
            limits: Mutex::new(limits),
            current_tasks: AtomicUsize::new(0),
            violations: Violations::default(),
            system: Mutex::new(System::new()),
        }
    }

    pub async fn update_limits(&self, limits: ResourceLimit) {
        *self.limits.lock().await = limits;
    }

    async fn current_resources(&self) -> (f64, f64, usize) {
        let mut system = self.system.lock().await;
        let pid = sysinfo::Pid::from_u32(std::process::id());
        system.refresh_process(pid);
        let (memory_mb, cpu_percent) = system
            .process(pid)
            .map(|p| (p.memory() as f64 / (1024.0 * 1024.0), p.cpu_usage() as f64))
            .unwrap_or((0.0, 0.0));
        let open_files = count_open_files();
        (memory_mb, cpu_percent, open_files)
    }

    pub async fn get_current_resources(&self) -> ResourceStats {
        let (memory_mb, cpu_percent, open_files) = self.current_resources().await;
        self.stats_with(memory_mb, cpu_percent, open_files)
    }

    pub async fn get_stats(&self) -> ResourceStats {
        self.get_current_resources().await
    }

    fn stats_with(&self, memory_mb: f64, cpu_percent: f64, open_files: usize) -> ResourceStats {
        ResourceStats {
            memory_mb,
            cpu_percent,
            open_files,
            current_tasks: self.current_tasks.load(Ordering::SeqCst),
            violations_memory: self.violations.memory.load(Ordering::Relaxed),
            violations_cpu: self.violations.cpu.load(Ordering::Relaxed),
            violations_time: self.violations.time.load(Ordering::Relaxed),
            violations_concurrent: self.violations.concurrent.load(Ordering::Relaxed),
            violations_file: self.violations.file.load(Ordering::Relaxed),
        }
    }

    /// Step 2 of the contract: fail fast if already over limit, without
    /// incrementing a violation counter for a pre-existing condition that
    /// wasn't caused by this call. Violation counters are for the monitor's
    /// *during-the-call* findings; see the module doc.
    async fn over_limit(&self, limits: &ResourceLimit) -> Option<ResourceKind> {
        let (memory_mb, cpu_percent, open_files) = self.current_resources().await;
        if memory_mb > limits.max_memory_mb {
            return Some(ResourceKind::Memory);
        }
        if cpu_percent > limits.max_cpu_percent {
            return Some(ResourceKind::Cpu);
        }
        if open_files > limits.max_open_files {
            return Some(ResourceKind::File);
        }
        None
    }

    async fn monitor_until_violation(&self, limits: ResourceLimit, started: Instant) -> ResourceKind {
        let mut ticker = tokio::time::interval(limits.check_interval);
        loop {
            ticker.tick().await;
            if started.elapsed() > limits.max_execution_time {
                return ResourceKind::Time;
            }
            if let Some(kind) = self.over_limit(&limits).await {
                return kind;
            }
        }
    }

    /// `execute(fn, *args)` per the Safety Layer contract: acquire a slot,
    /// snapshot resources, race `f` against a monitor, release the slot on
    /// every exit path.
    pub async fn execute<T, E, F, Fut>(&self, f: F) -> Result<T, ResourceLimiterError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let limits = self.limits.lock().await.clone();

        loop {
            let current = self.current_tasks.load(Ordering::SeqCst);
            if current >= limits.max_concurrent_tasks {
                self.violations.bump(ResourceKind::Concurrent);
                return Err(ResourceExceededError {
                    kind: ResourceKind::Concurrent,
                    message: format!("max_concurrent_tasks ({}) reached", limits.max_concurrent_tasks),
                }
                .into());
            }
            if self
                .current_tasks
                .compare_exchange(current, current + 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break;
            }
        }
        let _slot = SlotGuard { current_tasks: &self.current_tasks };

        if let Some(kind) = self.over_limit(&limits).await {
            self.violations.bump(kind);
            return Err(ResourceExceededError {
                kind,
                message: "resource already over limit before execution".to_string(),
            }
            .into());
        }

        let started = Instant::now();
        tokio::select! {
            result = f() => result.map_err(ResourceLimiterError::Inner),
            kind = self.monitor_until_violation(limits, started) => {
                self.violations.bump(kind);
                Err(ResourceExceededError {
                    kind,
                    message: format!("{:?} limit exceeded during execution", kind),
                }.into())
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn count_open_files() -> usize {
    std::fs::read_dir("/proc/self/fd").map(|d| d.count()).unwrap_or(0)
}

#[cfg(not(target_os = "linux"))]
fn count_open_files() -> usize {
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn permissive_limits() -> ResourceLimit {
        ResourceLimit {
            max_memory_mb: f64::MAX,
            max_cpu_percent: 100.0,
            max_open_files: usize::MAX,
            max_execution_time: Duration::from_secs(60),
            max_concurrent_tasks: 2,
            check_interval: Duration::from_millis(20),
        }
    }

    #[tokio::test]
    async fn runs_successfully_under_limits() {
        let limiter = ResourceLimiter::new(permissive_limits());
        let result = limiter.execute(|| async { Ok::<_, &str>(42) }).await;
        assert!(matches!(result, Ok(42)));
        assert_eq!(limiter.current_tasks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fails_fast_on_concurrency_cap() {
        let limits = ResourceLimit { max_concurrent_tasks: 0, ..permissive_limits() };
        let limiter = ResourceLimiter::new(limits);
        let result = limiter.execute(|| async { Ok::<_, &str>(1) }).await;
        assert!(matches!(result, Err(ResourceLimiterError::Exceeded(e)) if e.kind == ResourceKind::Concurrent));
    }

    #[tokio::test]
    async fn slot_released_on_inner_error() {
        let limiter = ResourceLimiter::new(permissive_limits());
        let _ = limiter.execute(|| async { Err::<(), _>("boom") }).await;
        assert_eq!(limiter.current_tasks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn times_out_long_running_calls() {
        let limits = ResourceLimit {
            max_execution_time: Duration::from_millis(30),
            check_interval: Duration::from_millis(5),
            ..permissive_limits()
        };
        let limiter = ResourceLimiter::new(limits);
        let result = limiter
            .execute(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, &str>(())
            })
            .await;
        assert!(matches!(result, Err(ResourceLimiterError::Exceeded(e)) if e.kind == ResourceKind::Time));
        assert_eq!(limiter.current_tasks.load(Ordering::SeqCst), 0);
    }
}
