//! whitelist-server: HTTP surface for the premint whitelist
//!
//! Exposes wallet status, per-level counts, mint announcements and the
//! development-only list imports on top of `whitelist-core`.

pub mod dto;
pub mod routes;
pub mod server;
pub mod state;

pub use server::*;
pub use state::{AppState, Clock};
