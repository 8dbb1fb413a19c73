//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields
//!     → logging.rs subscriber (EnvFilter + fmt)
//! HTTP requests:
//!     → tower-http TraceLayer spans
//! ```

pub mod logging;
