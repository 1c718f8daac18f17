use clap::Subcommand;
use shootdesk::dto::{CreatePostIdeaDto, UpdatePostIdeaDto};
use shootdesk::models::PostIdeaStatus;

use crate::client::ShootDeskClient;
use crate::output::{self, OutputConfig};

/// Post idea commands
#[derive(Subcommand, Debug)]
pub enum IdeaCommands {
    /// List the post ideas for a shoot
    List {
        /// The shoot ID
        shoot_id: String,
    },
    /// Add a post idea to a shoot
    Add {
        /// The shoot ID
        shoot_id: String,
        /// Working title of the post
        #[clap(long)]
        title: String,
        /// Draft caption
        #[clap(long)]
        caption: Option<String>,
        /// Target platform, e.g. instagram
        #[clap(long)]
        platform: Option<String>,
    },
    /// Move a post idea along its workflow
    Status {
        /// The post idea ID
        id: String,
        /// idea, planned or posted
        status: PostIdeaStatus,
    },
    /// Delete a post idea
    Delete {
        /// The post idea ID
        id: String,
    },
}

/// Executes a post idea command
pub async fn execute(
    client: &ShootDeskClient,
    cmd: IdeaCommands,
    config: &OutputConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        IdeaCommands::List { shoot_id } => {
            let ideas = client.list_post_ideas(&shoot_id).await?;
            output::print_post_ideas(&ideas, config);
        }
        IdeaCommands::Add { shoot_id, title, caption, platform } => {
            let dto = CreatePostIdeaDto { title, caption, platform };
            let idea = client.create_post_idea(&shoot_id, &dto).await?;
            output::print_post_idea(&idea, config);
        }
        IdeaCommands::Status { id, status } => {
            let dto = UpdatePostIdeaDto { status: Some(status), ..Default::default() };
            let idea = client.update_post_idea(&id, &dto).await?;
            output::print_post_idea(&idea, config);
        }
        IdeaCommands::Delete { id } => {
            client.delete_post_idea(&id).await?;
            output::print_success(&format!("Deleted post idea {}", id), config);
        }
    }
    Ok(())
}
