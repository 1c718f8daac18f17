/// Data models module
///
/// This module defines the core data structures used throughout the application.
/// It includes database models that map to database tables, as well as methods
/// for creating and manipulating these models.

// Re-export all model types
mod user;
pub use user::{User, UserRole};

mod client;
pub use client::Client;

mod shoot;
pub use shoot::{Shoot, ShootStatus};

mod post_idea;
pub use post_idea::{PostIdea, PostIdeaStatus};

mod integration;
pub use integration::{Integration, IntegrationProvider};

mod webhook_channel;
pub use webhook_channel::WebhookChannel;

mod sync_state;
pub use sync_state::CalendarSyncState;

mod calendar_event;
pub use calendar_event::CalendarEvent;

mod pending_event_deletion;
pub use pending_event_deletion::PendingEventDeletion;

/// Error returned when a stored enum value is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}
