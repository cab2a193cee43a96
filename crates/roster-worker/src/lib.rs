//! Roster segment worker library
//!
//! Configuration and backend wiring for the `roster-worker` binary, exposed
//! for testing and reuse.

pub mod config;
pub mod engine;
pub mod error;
