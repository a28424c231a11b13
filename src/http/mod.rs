//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from the
//! book endpoints: the cross-origin policy and protocol-level responses.

pub mod cors;
pub mod response;

// Re-export commonly used types
pub use cors::{CorsPolicy, OriginCheck};
pub use response::{build_health_response, build_options_response, set_server_header};
