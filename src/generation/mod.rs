//! Generation clients: the boundary to the image synthesis service
//!
//! The worker pool only sees the [`client::GenerationClient`] trait. Two
//! implementations ship with the crate:
//! - an offline, deterministic stylizer
//! - a client that shells out to an external generator program

/// Client trait, image buffer and per-call errors
pub mod client;
/// Client backed by an external program
pub mod command;
/// Offline deterministic stylizer
pub mod stylize;

pub use client::{GenerationClient, GenerationError, ImageBytes};
