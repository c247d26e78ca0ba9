//! Storage Layer
//!
//! Persistent process configuration. The Memory Hub (see `crate::memory`)
//! owns all runtime/report persistence; this module only covers the
//! on-disk `config.toml`.

pub mod config;

pub use config::*;
