//! Bounded-concurrency batch orchestration
//!
//! This module contains:
//! - The per-task state machine and the state store
//! - The shared task queue and the worker pool draining it
//! - Batches and the session that owns the active one

/// Batch membership and ownership of the state store
pub mod batch;
/// Worker pool with a fixed concurrency ceiling
pub mod pool;
/// Shared FIFO queue of tasks waiting to start
pub mod queue;
/// Active batch lifecycle, reset and stale-result guard
pub mod session;
/// Task state store with per-task atomic replace
pub mod store;
/// Task identity and state machine
pub mod task;

pub use session::Session;
