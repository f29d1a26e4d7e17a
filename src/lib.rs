/// Clipstream - video-sharing backend core
///
/// Staged publication of uploaded content, the reaction state machine that
/// keeps votes and counters consistent, and reconciliation of cached
/// aggregate counters, served over a thin HTTP layer.

pub mod account;
pub mod admin;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod counters;
pub mod db;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod publication;
pub mod reactions;
pub mod search;
pub mod server;
pub mod storage;

#[cfg(test)]
mod test_support;

pub use context::AppContext;
pub use error::{AppError, AppResult};
