//! CAS single sign-on middleware for axum.

pub mod cas;
pub mod config;
pub mod http;
pub mod observability;

pub use cas::{CasClient, CasPrincipal};
pub use config::{AppConfig, CasConfig};
pub use http::{CasMiddleware, HttpServer};
