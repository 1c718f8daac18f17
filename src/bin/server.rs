use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shootdesk::calendar::{GoogleCalendarClient, GoogleOAuthSettings};
use shootdesk::config::{get_config, get_data_dir_path, CliArgs, Config};
use shootdesk::models::UserRole;
use shootdesk::sync::{GoogleCalendarSync, SyncSettings};
use shootdesk::{create_app, db, repo, AppState};

/// Sets up console logging plus a daily JSON log file in the data directory
///
/// ### Returns
///
/// The file writer's guard, which must live as long as the process
fn init_tracing(debug: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let default_filter = if debug {
        "shootdesk=debug,tower_http=debug"
    } else {
        "shootdesk=info,tower_http=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer());

    match get_data_dir_path() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir.join("logs"), "shootdesk.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            registry.init();
            None
        }
    }
}

/// Creates the first admin user when `--bootstrap-admin` names an unknown email
fn bootstrap_admin(pool: &db::DbPool, email: &str) -> anyhow::Result<()> {
    if let Some(existing) = repo::get_user_by_email(pool, email)? {
        info!(user_id = %existing.get_id(), "Bootstrap admin already exists");
        return Ok(());
    }
    let admin = repo::create_user(pool, email.to_string(), "Administrator".to_string(), UserRole::Admin)?;
    info!(user_id = %admin.get_id(), email = %email, "Created bootstrap admin");
    Ok(())
}

/// Periodically reopens push channels that are about to expire
fn spawn_channel_renewal(sync: GoogleCalendarSync, config: &Config) {
    let interval = config.renew_interval();
    // Renew anything that would expire before the tick after next
    let horizon = chrono::Duration::from_std(interval * 2).unwrap_or_else(|_| chrono::Duration::hours(2));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match sync.renew_expiring_channels(Utc::now() + horizon).await {
                Ok(0) => {}
                Ok(renewed) => info!("Renewed {} push channel(s)", renewed),
                Err(err) => error!("Channel renewal failed: {}", err),
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let args = CliArgs::parse();
    let _log_guard = init_tracing(args.debug);

    let config = get_config(&args);

    // Initialize the database pool
    let pool = Arc::new(db::init_pool(&config.database_url).context("Failed to build database pool")?);
    {
        let mut conn = pool.get().context("Failed to get a database connection")?;
        db::run_migrations(&mut conn)?;
    }

    if let Some(email) = &args.bootstrap_admin {
        bootstrap_admin(&pool, email)?;
    }

    if !config.has_google_credentials() {
        warn!("Google OAuth credentials are not set; connecting calendars will fail");
    }
    let google = GoogleCalendarClient::new(GoogleOAuthSettings {
        client_id: config.google_client_id.clone(),
        client_secret: config.google_client_secret.clone(),
        redirect_uri: config.google_redirect_uri.clone(),
    });
    let sync = GoogleCalendarSync::new(pool.clone(), Arc::new(google), SyncSettings::from(&config));

    if config.webhook_url.is_some() {
        spawn_channel_renewal(sync.clone(), &config);
    }

    let app = create_app(AppState { pool, sync });

    let address = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", err);
            }
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
