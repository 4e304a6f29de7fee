//! CLI Commands

pub mod dashboard;
pub mod features;
pub mod lint;
pub mod serve;
pub mod timeouts;
