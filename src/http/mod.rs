//! HTTP server module.
//!
//! Plain HTTP only: TLS is expected to be terminated by the ingress or
//! reverse proxy in front of the service.

mod server;
pub mod static_files;

pub use server::{bind, serve, start_server, ServerError};
