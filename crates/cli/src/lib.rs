//! BDD Board CLI
//!
//! Command-line interface for feature progress, quality scoring,
//! the project dashboard and the HTTP server.

pub mod commands;
pub mod output;
