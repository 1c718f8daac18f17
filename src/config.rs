use std::path::PathBuf;
use std::time::Duration;
use serde::{Deserialize, Serialize};
use directories::ProjectDirs;
use clap::Parser;
use std::fs;
use tracing::{info, warn};

/// Configuration for the ShootDesk server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// URL for the database connection
    pub database_url: String,
    /// Base URL the CLI uses to reach the server
    pub server_url: String,
    /// Address the server binds to
    pub bind_address: String,
    /// Port the server listens on
    pub port: u16,
    /// OAuth client id registered with Google
    pub google_client_id: String,
    /// OAuth client secret registered with Google
    #[serde(skip_serializing)]
    pub google_client_secret: String,
    /// Where Google redirects after the consent screen
    pub google_redirect_uri: String,
    /// Public HTTPS URL of the push-notification webhook; push channels are
    /// not opened when unset
    pub webhook_url: Option<String>,
    /// Calendar used for newly connected integrations
    pub calendar_id: String,
    /// How far back a full sync looks, in days
    pub sync_past_days: i64,
    /// How far ahead a full sync looks, in days
    pub sync_future_days: i64,
    /// Push shoot edits to the calendar as they happen rather than waiting
    /// for the next sync
    pub push_on_write: bool,
    /// Requested lifetime of push channels, in hours
    pub channel_ttl_hours: i64,
    /// How often expiring push channels are renewed, in minutes
    pub channel_renew_interval_minutes: u64,
}

/// Update structure for Config with all fields optional
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConfigUpdate {
    #[serde(default)]
    pub database_url: Option<String>,
    #[serde(default)]
    pub server_url: Option<String>,
    #[serde(default)]
    pub bind_address: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub google_client_id: Option<String>,
    #[serde(default)]
    pub google_client_secret: Option<String>,
    #[serde(default)]
    pub google_redirect_uri: Option<String>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub calendar_id: Option<String>,
    #[serde(default)]
    pub sync_past_days: Option<i64>,
    #[serde(default)]
    pub sync_future_days: Option<i64>,
    #[serde(default)]
    pub push_on_write: Option<bool>,
    #[serde(default)]
    pub channel_ttl_hours: Option<i64>,
    #[serde(default)]
    pub channel_renew_interval_minutes: Option<u64>,
}

/// Command line arguments for the server
#[derive(Parser, Debug, Default)]
#[clap(name = "shootdesk", about = "Content-production scheduling server with Google Calendar sync")]
pub struct CliArgs {
    /// Database URL
    #[clap(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Address to bind to
    #[clap(long, env = "SHOOTDESK_BIND")]
    pub bind_address: Option<String>,

    /// Port to listen on
    #[clap(long, env = "SHOOTDESK_PORT")]
    pub port: Option<u16>,

    /// Google OAuth client id
    #[clap(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,

    /// Google OAuth client secret
    #[clap(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub google_client_secret: Option<String>,

    /// Google OAuth redirect URI
    #[clap(long, env = "GOOGLE_REDIRECT_URI")]
    pub google_redirect_uri: Option<String>,

    /// Public URL of the Google Calendar webhook receiver
    #[clap(long, env = "SHOOTDESK_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Create an admin user with this email on startup if none exists
    #[clap(long, env = "SHOOTDESK_BOOTSTRAP_ADMIN")]
    pub bootstrap_admin: Option<String>,

    /// Debug mode
    #[clap(long, env = "SHOOTDESK_DEBUG", default_value_t = false)]
    pub debug: bool,
}

impl Config {
    /// Applies a config update to the current configuration
    pub fn apply_update(self, update: ConfigUpdate) -> Self {
        Self {
            database_url: update.database_url.unwrap_or(self.database_url),
            server_url: update.server_url.unwrap_or(self.server_url),
            bind_address: update.bind_address.unwrap_or(self.bind_address),
            port: update.port.unwrap_or(self.port),
            google_client_id: update.google_client_id.unwrap_or(self.google_client_id),
            google_client_secret: update.google_client_secret.unwrap_or(self.google_client_secret),
            google_redirect_uri: update.google_redirect_uri.unwrap_or(self.google_redirect_uri),
            webhook_url: update.webhook_url.or(self.webhook_url),
            calendar_id: update.calendar_id.unwrap_or(self.calendar_id),
            sync_past_days: update.sync_past_days.unwrap_or(self.sync_past_days),
            sync_future_days: update.sync_future_days.unwrap_or(self.sync_future_days),
            push_on_write: update.push_on_write.unwrap_or(self.push_on_write),
            channel_ttl_hours: update.channel_ttl_hours.unwrap_or(self.channel_ttl_hours),
            channel_renew_interval_minutes: update
                .channel_renew_interval_minutes
                .unwrap_or(self.channel_renew_interval_minutes),
        }
    }

    /// Returns the requested push channel lifetime
    pub fn channel_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.channel_ttl_hours)
    }

    /// Returns the channel renewal interval as a Duration
    pub fn renew_interval(&self) -> Duration {
        Duration::from_secs(self.channel_renew_interval_minutes.max(1) * 60)
    }

    /// Returns the socket address string the server binds to
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    /// Whether Google OAuth credentials have been provided
    pub fn has_google_credentials(&self) -> bool {
        !self.google_client_id.is_empty() && !self.google_client_secret.is_empty()
    }
}

/// Returns the base (default) configuration
pub fn base_config(config_path: Option<PathBuf>) -> Config {
    let database_url = config_path.map_or("shootdesk.db".to_string(), |path| {
        path.join("shootdesk.db").to_string_lossy().to_string()
    });

    let port = 3000;

    Config {
        database_url,
        server_url: format!("http://localhost:{}", port),
        bind_address: "127.0.0.1".to_string(),
        port,
        google_client_id: String::new(),
        google_client_secret: String::new(),
        google_redirect_uri: format!("http://localhost:{}/integrations/google/callback", port),
        webhook_url: None,
        calendar_id: "primary".to_string(),
        sync_past_days: 30,
        sync_future_days: 180,
        push_on_write: true,
        channel_ttl_hours: 24 * 7,
        channel_renew_interval_minutes: 60,
    }
}

/// Loads configuration from a TOML file
pub fn config_from_file(config_path: Option<PathBuf>) -> Result<ConfigUpdate, String> {
    let Some(config_path) = config_path else {
        return Ok(ConfigUpdate::default());
    };

    if !config_path.exists() {
        info!("Config file not found at {:?}, using defaults", config_path);
        return Ok(ConfigUpdate::default());
    }

    match fs::read_to_string(&config_path) {
        Ok(content) => match toml::from_str::<ConfigUpdate>(&content) {
            Ok(config) => {
                info!("Loaded configuration from {:?}", config_path);
                Ok(config)
            },
            Err(e) => {
                warn!("Failed to parse config file: {}", e);
                Err(format!("Failed to parse config file: {}", e))
            }
        },
        Err(e) => {
            warn!("Failed to read config file: {}", e);
            Err(format!("Failed to read config file: {}", e))
        }
    }
}

/// Loads configuration from command line arguments
pub fn config_from_args(args: &CliArgs) -> ConfigUpdate {
    ConfigUpdate {
        database_url: args.database_url.clone(),
        bind_address: args.bind_address.clone(),
        port: args.port,
        google_client_id: args.google_client_id.clone(),
        google_client_secret: args.google_client_secret.clone(),
        google_redirect_uri: args.google_redirect_uri.clone(),
        webhook_url: args.webhook_url.clone(),
        ..ConfigUpdate::default()
    }
}

/// Returns the XDG config directory for ShootDesk, if it can be determined
pub fn get_config_dir_path() -> Option<PathBuf> {
    match ProjectDirs::from("com", "shootdesk", "shootdesk") {
        Some(proj_dirs) => Some(proj_dirs.config_dir().to_path_buf()),
        None => {
            warn!("Could not determine XDG config directory, skipping config file");
            None
        }
    }
}

/// Returns the XDG data directory for ShootDesk, used for log files
pub fn get_data_dir_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "shootdesk", "shootdesk").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Gets the complete configuration by combining defaults with
/// values from config file, environment variables, and command line arguments
/// in order of increasing precedence
pub fn get_config(args: &CliArgs) -> Config {
    let config_path = get_config_dir_path().and_then(|path| {
        if !path.exists() {
            info!("Config path not found at {:?}, using defaults", path);
            None
        } else {
            Some(path)
        }
    });

    let base = base_config(config_path.clone());

    // Apply updates in order of increasing precedence
    let file_update = config_from_file(config_path.map(|path| path.join("config.toml")))
        .unwrap_or_default();
    let config = base
        .apply_update(file_update)
        .apply_update(config_from_args(args));

    info!(
        "Final configuration: database_url={}, listen={}, calendar_id={}, webhook_url={:?}, google_credentials={}",
        config.database_url,
        config.listen_address(),
        config.calendar_id,
        config.webhook_url,
        config.has_google_credentials()
    );

    config
}

#[cfg(test)]
mod prop_tests;
