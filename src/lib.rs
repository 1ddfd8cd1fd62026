//! Bounded-concurrency image generation across a fixed set of styled universes
//!
//! One source image is sent to a generation service once per universe, with
//! a fixed ceiling on concurrent calls. Every task's progress is published to
//! a state store as it happens, and once all universes succeed the results are
//! composited into a single deterministic album image.

#![forbid(unsafe_code)]

/// Album grid layout, caption font and composition
pub mod album;
/// Generation client boundary and the bundled clients
pub mod generation;
/// Command-line interface, configuration, errors, logging and file output
pub mod io;
/// Task state machine, state store, worker pool and session
pub mod orchestration;
/// Universe catalog and prompt template
pub mod universe;

pub use io::error::{MultiverseError, Result};
