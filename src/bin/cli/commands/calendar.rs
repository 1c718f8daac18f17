use chrono::{DateTime, Utc};
use clap::Subcommand;

use crate::client::ShootDeskClient;
use crate::output::{self, OutputConfig};

/// Google Calendar commands
#[derive(Subcommand, Debug)]
pub enum CalendarCommands {
    /// Print the URL that connects your Google Calendar
    Connect,
    /// Disconnect Google Calendar and unlink all shoots
    Disconnect,
    /// Run a sync now
    Sync {
        /// Re-list the whole window instead of only recent changes
        #[clap(long)]
        full: bool,
    },
    /// Show connection and sync status
    Status,
    /// List cached calendar events
    Events {
        /// Window start (RFC 3339), defaults to the sync window
        #[clap(long)]
        start: Option<DateTime<Utc>>,
        /// Window end (RFC 3339), defaults to the sync window
        #[clap(long)]
        end: Option<DateTime<Utc>>,
    },
    /// List double bookings, or what a proposed slot would clash with
    Conflicts {
        /// Proposed slot start (RFC 3339); needs --end
        #[clap(long, requires = "end")]
        start: Option<DateTime<Utc>>,
        /// Proposed slot end (RFC 3339); needs --start
        #[clap(long, requires = "start")]
        end: Option<DateTime<Utc>>,
        /// Shoot to leave out, e.g. the one being moved
        #[clap(long)]
        exclude_shoot_id: Option<String>,
    },
}

/// Executes a calendar command
pub async fn execute(
    client: &ShootDeskClient,
    cmd: CalendarCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        CalendarCommands::Connect => {
            let url = client.authorize_url().await?;
            output::print_success(&format!("Open this URL to connect Google Calendar:\n{}", url), config);
        }
        CalendarCommands::Disconnect => {
            client.disconnect().await?;
            output::print_success("Disconnected Google Calendar", config);
        }
        CalendarCommands::Sync { full } => {
            let report = client.sync(full).await?;
            output::print_sync_report(&report, config);
        }
        CalendarCommands::Status => {
            let status = client.sync_status().await?;
            output::print_value(&status, config);
        }
        CalendarCommands::Events { start, end } => {
            let events = client.list_events(start, end).await?;
            output::print_events(&events, config);
        }
        CalendarCommands::Conflicts { start, end, exclude_shoot_id } => {
            let slot = start.zip(end);
            let found = client.conflicts(slot, exclude_shoot_id).await?;
            output::print_value(&found, config);
        }
    }
    Ok(())
}
