use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;
use shootdesk::models::{CalendarEvent, Client, PostIdea, Shoot};
use shootdesk::sync::SyncReport;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

/// Bundled output configuration passed to all print functions
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    /// The output format
    pub format: OutputFormat,
    /// When true, print minimal output (just IDs or counts)
    pub quiet: bool,
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(err) => eprintln!("Could not render JSON: {}", err),
    }
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Prints a list of clients in the specified format
pub fn print_clients(clients: &[Client], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if clients.is_empty() {
                if !config.quiet {
                    println!("No clients found.");
                }
                return;
            }
            if config.quiet {
                for client in clients {
                    println!("{}", client.get_id());
                }
                return;
            }
            let max_id = clients.iter().map(|c| c.get_id().len()).max().unwrap_or(2);
            println!("{:<width$}  NAME", "ID", width = max_id);
            for client in clients {
                println!("{:<width$}  {}", client.get_id(), client.get_name(), width = max_id);
            }
        }
        OutputFormat::Json => print_json(clients),
    }
}

/// Prints a single client in the specified format
pub fn print_client(client: &Client, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", client.get_id());
                return;
            }
            println!("ID:      {}", client.get_id());
            println!("Name:    {}", client.get_name());
            println!("Email:   {}", client.get_contact_email().unwrap_or_else(|| "-".to_string()));
            if let Some(notes) = client.get_notes() {
                println!("Notes:   {}", notes);
            }
            println!("Created: {}", client.get_created_at());
        }
        OutputFormat::Json => print_json(client),
    }
}

/// Prints a list of shoots in the specified format
pub fn print_shoots(shoots: &[Shoot], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if shoots.is_empty() {
                if !config.quiet {
                    println!("No shoots found.");
                }
                return;
            }
            if config.quiet {
                for shoot in shoots {
                    println!("{}", shoot.get_id());
                }
                return;
            }
            let max_id = shoots.iter().map(|s| s.get_id().len()).max().unwrap_or(2);
            println!(
                "{:<id_w$}  {:<16}  {:<16}  {:<10}  {:<6}  TITLE",
                "ID",
                "STARTS",
                "ENDS",
                "STATUS",
                "SYNCED",
                id_w = max_id,
            );
            for shoot in shoots {
                let synced = match (shoot.get_google_event_id(), shoot.has_unpushed_changes()) {
                    (None, _) => "-",
                    (Some(_), true) => "dirty",
                    (Some(_), false) => "yes",
                };
                println!(
                    "{:<id_w$}  {:<16}  {:<16}  {:<10}  {:<6}  {}",
                    shoot.get_id(),
                    shoot.get_starts_at().format(TIME_FORMAT),
                    shoot.get_ends_at().format(TIME_FORMAT),
                    shoot.get_status(),
                    synced,
                    shoot.get_title(),
                    id_w = max_id,
                );
            }
        }
        OutputFormat::Json => print_json(shoots),
    }
}

/// Prints a single shoot in the specified format
pub fn print_shoot(shoot: &Shoot, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", shoot.get_id());
                return;
            }
            println!("ID:       {}", shoot.get_id());
            println!("Title:    {}", shoot.get_title());
            println!("Client:   {}", shoot.get_client_id());
            println!("Status:   {}", shoot.get_status());
            println!("Starts:   {}", shoot.get_starts_at());
            println!("Ends:     {}", shoot.get_ends_at());
            println!("Location: {}", shoot.get_location().unwrap_or_else(|| "-".to_string()));
            match shoot.get_google_event_id() {
                Some(id) => println!("Event:    {}", id),
                None => println!("Event:    not linked"),
            }
            if let Some(notes) = shoot.get_notes() {
                println!("Notes:    {}", notes);
            }
        }
        OutputFormat::Json => print_json(shoot),
    }
}

/// Prints a list of post ideas in the specified format
pub fn print_post_ideas(ideas: &[PostIdea], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if ideas.is_empty() {
                if !config.quiet {
                    println!("No post ideas found.");
                }
                return;
            }
            if config.quiet {
                for idea in ideas {
                    println!("{}", idea.get_id());
                }
                return;
            }
            let max_id = ideas.iter().map(|i| i.get_id().len()).max().unwrap_or(2);
            println!("{:<id_w$}  {:<9}  {:<10}  TITLE", "ID", "STATUS", "PLATFORM", id_w = max_id);
            for idea in ideas {
                println!(
                    "{:<id_w$}  {:<9}  {:<10}  {}",
                    idea.get_id(),
                    idea.get_status().as_str(),
                    idea.get_platform().unwrap_or_else(|| "-".to_string()),
                    idea.get_title(),
                    id_w = max_id,
                );
            }
        }
        OutputFormat::Json => print_json(ideas),
    }
}

/// Prints a single post idea in the specified format
pub fn print_post_idea(idea: &PostIdea, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", idea.get_id());
                return;
            }
            println!("ID:       {}", idea.get_id());
            println!("Shoot:    {}", idea.get_shoot_id());
            println!("Title:    {}", idea.get_title());
            println!("Status:   {}", idea.get_status().as_str());
            if let Some(caption) = idea.get_caption() {
                println!("Caption:  {}", caption);
            }
        }
        OutputFormat::Json => print_json(idea),
    }
}

/// Prints cached calendar events in the specified format
pub fn print_events(events: &[CalendarEvent], config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if events.is_empty() {
                if !config.quiet {
                    println!("No calendar events found.");
                }
                return;
            }
            for event in events {
                if config.quiet {
                    println!("{}", event.get_google_event_id());
                    continue;
                }
                let marker = if event.get_shoot_id().is_some() { "*" } else { " " };
                println!(
                    "{} {}  {}  {}",
                    marker,
                    event.get_starts_at().format(TIME_FORMAT),
                    event.get_ends_at().format(TIME_FORMAT),
                    event.get_summary(),
                );
            }
        }
        OutputFormat::Json => print_json(events),
    }
}

/// Prints the outcome of a sync run
pub fn print_sync_report(report: &SyncReport, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if config.quiet {
                println!("{}", report.fetched);
                return;
            }
            println!("Mode:      {:?}", report.mode);
            println!("Fetched:   {}", report.fetched);
            println!(
                "Cache:     +{} ~{} -{}",
                report.created, report.updated, report.deleted
            );
            println!(
                "Shoots:    {} updated, {} unlinked",
                report.shoots_updated, report.shoots_unlinked
            );
            println!(
                "Pushed:    +{} ~{} -{} ({} failed)",
                report.pushed_created, report.pushed_updated, report.pushed_deleted, report.push_failures
            );
            println!("Conflicts: {}", report.conflicts);
        }
        OutputFormat::Json => print_json(report),
    }
}

/// Prints a raw JSON response; human mode shows it pretty-printed too
pub fn print_value(value: &Value, config: &OutputConfig) {
    if config.quiet {
        return;
    }
    print_json(value);
}

/// Prints a simple success message (for operations that don't return data)
pub fn print_success(message: &str, config: &OutputConfig) {
    match config.format {
        OutputFormat::Human => {
            if !config.quiet {
                println!("{}", message);
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({"status": "ok", "message": message})),
    }
}
