//! API middleware stack.
//!
//! Execution order (outermost to innermost):
//! 1. Access log (method, path, status, latency)
//! 2. Identity (protected routes only)

pub mod access_log;
pub mod identity;
