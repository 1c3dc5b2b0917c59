//! HTTP API.
//!
//! Exposes the triage pipeline, the staff queue, patient profiles and
//! admin views as JSON endpoints under `/api/`. Identity is forwarded by
//! the gateway in `X-User-Id` / `X-User-Role` headers.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{serve, ApiServer};
pub use types::ApiContext;
