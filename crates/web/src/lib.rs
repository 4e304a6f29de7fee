//! BDD Board Web API
//!
//! Serves BDD progress, feature drill-down, card trees, mockups and the
//! filesystem dashboard as JSON.

pub mod bdd;
pub mod error;
pub mod server;
pub mod skateboard;

pub use error::ApiError;
pub use server::{serve, AppState, WebServer};
