//! Request middleware.
//!
//! Gated API routes are composed as rate limit → connection gate → handler,
//! so a rejected request never touches the shared store.

pub mod connection_gate;
pub mod rate_limit;
pub mod request_id;

pub use connection_gate::connection_gate;
pub use rate_limit::{client_identity, rate_limit};
pub use request_id::{make_span_with_request_id, request_id_middleware, RequestId};
