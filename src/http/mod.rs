//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace + timeout layers)
//!     → middleware.rs (CasMiddleware: force_https → auth → remove_ticket → set_headers)
//!     → application handler
//!     → response.rs (302 helper used along the way)
//! ```

pub mod middleware;
pub mod response;
pub mod server;

pub use middleware::{CasMiddleware, X_CAS_ATTR_PREFIX, X_CAS_USER, X_FORWARDED_PROTO};
pub use server::HttpServer;
