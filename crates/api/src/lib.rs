//! HTTP API layer for rateit.
//!
//! This crate provides the REST API surface:
//!
//! - **Endpoints**: post lifecycle, vote submission, results, the feed
//! - **Extractors**: client IP derivation, device identity header
//! - **State**: shared service handles
//!
//! Built on Axum 0.8.

pub mod endpoints;
pub mod extractors;
pub mod response;
pub mod state;

pub use endpoints::router;
pub use state::AppState;
