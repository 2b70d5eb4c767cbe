//! Resilience features for remote calls
//!
//! Provides concurrency limiting and per-call timeouts for any
//! `WorkspaceClient`.

pub mod concurrency;
pub mod guarded;

pub use concurrency::{ConcurrencyLimiter, ConcurrencyStats};
pub use guarded::GuardedClient;
