//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates a load run:
//! - Rate limiter (admission decisions)
//! - Dispatcher (worker fanout and outcome accounting)
//! - Reporter (periodic live stats)
//! - Shutdown coordination (watchdogs and one-shot cleanup)
//! - Harness (end-to-end sequencing)
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod dispatcher;
pub mod harness;
pub mod limiter;
pub mod metrics;
pub mod ports;
pub mod reporter;
pub mod shutdown;
