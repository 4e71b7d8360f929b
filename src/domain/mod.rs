//! Domain layer - pure values with no runtime dependencies.
//!
//! This layer contains the core concepts and invariants of the harness:
//! - Rate limiter configuration and its validation errors
//! - Worker identity and the terminal outcome of a unit of work
//! - The error-vs-timeout latency cutoff
//! - Random payload generation for writes
//!
//! All types in this layer are pure and easily testable.

pub mod config;
pub mod outcome;
pub mod payload;
