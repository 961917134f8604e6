//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Rate limiting (governor), per route group
//!
//! Authentication and storefront resolution are extractors, not layers.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;
pub mod tenant;

pub use auth::{
    AuthRejection, OptionalUser, RequireAdmin, RequireVendor, clear_current_user,
    set_current_user,
};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
pub use tenant::{CurrentStore, StoreCache};
