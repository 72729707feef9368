//! Task registry and lifecycle management
//!
//! - TaskRegistry: id -> record map, create / get_status / sweep
//! - RetentionPolicy: total-age and terminal-grace eviction windows
//! - worker: bounded, supervised execution of one task
//! - sweeper: periodic background eviction

pub mod retention;
pub mod sweeper;
pub mod task_registry;
pub mod worker;

pub use retention::{DEFAULT_MAX_TERMINAL_GRACE, DEFAULT_MAX_TOTAL_AGE, RetentionPolicy};
pub use sweeper::DEFAULT_SWEEP_INTERVAL;
pub use task_registry::{RegistryConfig, TaskRegistry};
pub use worker::run_remote;
