/// Repository module
///
/// This module provides the data access layer for the application.
/// Every function takes the connection pool, checks out a connection for the
/// duration of one statement (or one transaction) and returns an
/// `anyhow::Result`. Connections are never held across an `.await`.
///
/// Ownership checks (a shoot belongs to the calling user, and so on) live
/// here rather than in the handlers, so every caller gets them.

mod user_repo;
mod client_repo;
mod shoot_repo;
mod post_idea_repo;
mod integration_repo;
mod webhook_channel_repo;
mod sync_state_repo;
mod calendar_event_repo;
mod event_deletion_repo;

// Re-export all repository functions
pub use user_repo::*;
pub use client_repo::*;
pub use shoot_repo::*;
pub use post_idea_repo::*;
pub use integration_repo::*;
pub use webhook_channel_repo::*;
pub use sync_state_repo::*;
pub use calendar_event_repo::*;
pub use event_deletion_repo::*;

/// Rule violations raised by the repository layer
///
/// These travel inside `anyhow::Error` like any other failure; the HTTP
/// layer downcasts them into client errors.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    InUse(String),
    #[error("record not found")]
    NotFound,
}
