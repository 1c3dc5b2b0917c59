//! API endpoint handlers, one module per caller group.

pub mod admin;
pub mod health;
pub mod patients;
pub mod staff;
pub mod triage;
