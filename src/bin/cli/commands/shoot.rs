use chrono::{DateTime, Utc};
use clap::Subcommand;
use shootdesk::dto::{CreateShootDto, ShootQuery, UpdateShootDto};
use shootdesk::models::ShootStatus;

use crate::client::ShootDeskClient;
use crate::output::{self, OutputConfig};

/// Shoot management commands
#[derive(Subcommand, Debug)]
pub enum ShootCommands {
    /// List shoots with optional filters
    List {
        /// Only shoots for this client
        #[clap(long)]
        client_id: Option<String>,
        /// Only shoots in these statuses (repeatable)
        #[clap(long = "status")]
        statuses: Vec<ShootStatus>,
        /// Only shoots starting at or after this datetime (RFC 3339)
        #[clap(long)]
        after: Option<DateTime<Utc>>,
        /// Only shoots starting before this datetime (RFC 3339)
        #[clap(long)]
        before: Option<DateTime<Utc>>,
    },
    /// Schedule a new shoot
    Create {
        /// The client the shoot is for
        #[clap(long)]
        client_id: String,
        /// Title, also used as the calendar event summary
        #[clap(long)]
        title: String,
        /// Start time (RFC 3339)
        #[clap(long)]
        starts_at: DateTime<Utc>,
        /// End time (RFC 3339)
        #[clap(long)]
        ends_at: DateTime<Utc>,
        /// Where the shoot takes place
        #[clap(long)]
        location: Option<String>,
        /// Free-form notes
        #[clap(long)]
        notes: Option<String>,
    },
    /// Get a specific shoot by ID
    Get {
        /// The shoot ID
        id: String,
    },
    /// Move a shoot to a new time
    Reschedule {
        /// The shoot ID
        id: String,
        /// New start time (RFC 3339)
        starts_at: DateTime<Utc>,
        /// New end time (RFC 3339)
        ends_at: DateTime<Utc>,
    },
    /// Change a shoot's status
    Status {
        /// The shoot ID
        id: String,
        /// scheduled, completed or cancelled
        status: ShootStatus,
    },
    /// Delete a shoot and its post ideas
    Delete {
        /// The shoot ID
        id: String,
    },
}

/// Executes a shoot command
pub async fn execute(
    client: &ShootDeskClient,
    cmd: ShootCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ShootCommands::List { client_id, statuses, after, before } => {
            let query = ShootQuery {
                client_id,
                statuses,
                starts_after: after,
                starts_before: before,
            };
            let shoots = client.list_shoots(&query).await?;
            output::print_shoots(&shoots, config);
        }
        ShootCommands::Create { client_id, title, starts_at, ends_at, location, notes } => {
            let dto = CreateShootDto { client_id, title, location, notes, starts_at, ends_at };
            let shoot = client.create_shoot(&dto).await?;
            output::print_shoot(&shoot, config);
        }
        ShootCommands::Get { id } => {
            let shoot = client.get_shoot(&id).await?;
            output::print_shoot(&shoot, config);
        }
        ShootCommands::Reschedule { id, starts_at, ends_at } => {
            let dto = UpdateShootDto {
                starts_at: Some(starts_at),
                ends_at: Some(ends_at),
                ..Default::default()
            };
            let shoot = client.update_shoot(&id, &dto).await?;
            output::print_shoot(&shoot, config);
        }
        ShootCommands::Status { id, status } => {
            let dto = UpdateShootDto { status: Some(status), ..Default::default() };
            let shoot = client.update_shoot(&id, &dto).await?;
            output::print_shoot(&shoot, config);
        }
        ShootCommands::Delete { id } => {
            client.delete_shoot(&id).await?;
            output::print_success(&format!("Deleted shoot {}", id), config);
        }
    }
    Ok(())
}
