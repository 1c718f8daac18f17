use clap::Subcommand;

use crate::client::ShootDeskClient;
use crate::output::{self, OutputConfig};

/// Client management commands
#[derive(Subcommand, Debug)]
pub enum ClientCommands {
    /// List your clients
    List,
    /// Create a new client
    Create {
        /// Name of the client
        #[clap(long)]
        name: String,
        /// Contact email
        #[clap(long)]
        email: Option<String>,
        /// Free-form notes
        #[clap(long)]
        notes: Option<String>,
    },
    /// Get a specific client by ID
    Get {
        /// The client ID
        id: String,
    },
    /// Delete a client that has no shoots
    Delete {
        /// The client ID
        id: String,
    },
}

/// Executes a client command
pub async fn execute(
    client: &ShootDeskClient,
    cmd: ClientCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ClientCommands::List => {
            let clients = client.list_clients().await?;
            output::print_clients(&clients, config);
        }
        ClientCommands::Create { name, email, notes } => {
            let created = client.create_client(name, email, notes).await?;
            output::print_client(&created, config);
        }
        ClientCommands::Get { id } => {
            let found = client.get_client(&id).await?;
            output::print_client(&found, config);
        }
        ClientCommands::Delete { id } => {
            client.delete_client(&id).await?;
            output::print_success(&format!("Deleted client {}", id), config);
        }
    }
    Ok(())
}
