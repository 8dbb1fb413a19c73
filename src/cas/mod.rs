//! CAS client subsystem.
//!
//! # Data Flow
//! ```text
//! Browser → /page?ticket=ST-…
//!     → middleware::handle
//!         → session.rs (cookie → session id)
//!         → client.rs (session id → ticket → store.rs)
//!         → client.rs validate_ticket (GET serviceValidate)
//!             → response.rs (XML → AuthenticationResponse)
//!         → request extension + Set-Cookie
//!     → middleware::require_authentication (302 to login when absent)
//!     → request.rs accessors read the identity downstream
//!
//! CAS server → POST logoutRequest=<samlp:LogoutRequest…>
//!     → middleware::handle → client.rs single_logout
//! ```

pub mod client;
pub mod middleware;
pub mod request;
pub mod response;
pub mod session;
pub mod store;
pub mod types;

pub use client::CasClient;
pub use request::{attributes, authentication_response, is_authenticated, username, CasPrincipal};
pub use store::{MemoryStore, TicketStore};
pub use types::{Attributes, AuthenticationResponse, CasError};
