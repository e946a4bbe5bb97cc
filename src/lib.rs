//! vaultcheck: a demo web service for Azure Key Vault access.
//!
//! Serves a static landing page, echoes user input through a JSON endpoint,
//! and reveals a single demo secret from Key Vault when asked for it. The
//! secret store is injected through [`state::AppState`] so the router can be
//! driven in tests without a real vault.

pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod vault;

pub use error::{AppError, ErrorBody};
pub use routes::create_router;
pub use state::AppState;
