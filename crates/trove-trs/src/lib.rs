//! GA4GH Tool Registry Service surface for the Trove catalog
//!
//! Read-only projection of published entries into TRS 2.0 (and legacy
//! 1.0) wire shapes, plus zip export of a version's files. Writes go
//! through `trove-service`; this crate never mutates the catalog.

pub mod adapter;
pub mod error;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod zip;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use handlers::{AppState, SUBJECT_HEADER};
pub use routes::build_router;
