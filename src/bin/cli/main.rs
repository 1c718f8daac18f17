mod client;
mod commands;
mod output;

use clap::{Parser, Subcommand};
use client::{ClientError, ShootDeskClient};
use output::{OutputConfig, OutputFormat};
use shootdesk::config;
use std::process;

/// CLI for the ShootDesk scheduling server
#[derive(Parser, Debug)]
#[clap(name = "shootdesk-cli", about = "CLI for the ShootDesk scheduling server")]
struct Cli {
    /// Server URL to connect to
    #[clap(long, env = "SHOOTDESK_URL", global = true)]
    server_url: Option<String>,

    /// Your user ID, sent as X-User-Id
    #[clap(long, env = "SHOOTDESK_USER", global = true)]
    user: Option<String>,

    /// Output format
    #[clap(long, value_enum, default_value_t = OutputFormat::Human, global = true)]
    format: OutputFormat,

    /// Quiet mode: minimal output (just IDs or counts)
    #[clap(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage clients
    #[command(subcommand)]
    Client(commands::client::ClientCommands),
    /// Manage shoots
    #[command(subcommand)]
    Shoot(commands::shoot::ShootCommands),
    /// Manage post ideas
    #[command(subcommand)]
    Idea(commands::idea::IdeaCommands),
    /// Google Calendar connection, sync and conflicts
    #[command(subcommand)]
    Calendar(commands::calendar::CalendarCommands),
}

/// Resolves the server URL from CLI args, config file, or defaults
///
/// Precedence: CLI flag / env var > config file > default
fn resolve_server_url(cli_url: Option<String>) -> String {
    if let Some(url) = cli_url {
        return url;
    }

    let config_dir = config::get_config_dir_path();
    if let Some(ref dir) = config_dir {
        let config_path = dir.join("config.toml");
        if let Ok(update) = config::config_from_file(Some(config_path)) {
            if let Some(url) = update.server_url {
                return url;
            }
        }
    }

    config::base_config(None).server_url
}

/// Renders a command failure for stderr, with a hint for the usual mistakes
fn describe_failure(err: &(dyn std::error::Error + 'static)) -> String {
    let Some(client_err) = err.downcast_ref::<ClientError>() else {
        return err.to_string();
    };

    let hint = match client_err {
        ClientError::Request(inner) if inner.is_connect() || inner.is_timeout() => {
            return format!("Could not connect to server. Is shootdesk running?\n  {}", inner);
        }
        ClientError::Server { status, message } => match status.as_u16() {
            401 if message.contains("Authentication required") => {
                Some("pass --user or set SHOOTDESK_USER to a known user id")
            }
            401 => Some("Google access was revoked; run `shootdesk-cli calendar connect` again"),
            403 => Some("viewers can read but not change anything"),
            409 if message.contains("not connected") => Some("run `shootdesk-cli calendar connect` first"),
            _ => None,
        },
        ClientError::Request(_) => None,
    };

    match hint {
        Some(hint) => format!("{}\n  hint: {}", client_err, hint),
        None => client_err.to_string(),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let server_url = resolve_server_url(cli.server_url);
    let client = ShootDeskClient::new(server_url, cli.user);
    let output_config = OutputConfig {
        format: cli.format,
        quiet: cli.quiet,
    };

    let result = match cli.command {
        Commands::Client(cmd) => commands::client::execute(&client, cmd, &output_config).await,
        Commands::Shoot(cmd) => commands::shoot::execute(&client, cmd, &output_config).await,
        Commands::Idea(cmd) => commands::idea::execute(&client, cmd, &output_config).await,
        Commands::Calendar(cmd) => commands::calendar::execute(&client, cmd, &output_config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", describe_failure(e.as_ref()));
        process::exit(1);
    }
}
