//! HTTP service for the single-elimination bracket engine.
//!
//! The binary wires these modules together; they are exposed as a library so
//! the router can be driven in-process by integration tests.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
