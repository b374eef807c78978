//! Pulverhub Console — native admin frontend for the Pulverlager server.
//!
//! Entry point that wires all crates together: configuration, logging,
//! the session guard, the realtime channel, and the interactive console.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use pulverhub_app::modules::{PulverModule, RolesModule, UsersModule};
use pulverhub_app::{AppContext, ContentLoader, ModuleRegistry};
use pulverhub_core::config::AppConfig;
use pulverhub_core::{AppError, AppResult};
use pulverhub_gateway::ApiGateway;
use pulverhub_realtime::EventChannel;
use pulverhub_session::{SessionGuard, SessionStore};

mod console;
mod notify;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "pulverhub-console", about = "Pulverlager admin console")]
struct Cli {
    /// Configuration environment (reads config/{env}.toml).
    #[arg(long, default_value = "development")]
    env: String,

    /// Page to open after start-up.
    #[arg(long, default_value = "startseite")]
    page: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(&cli.env) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config, &cli.page).await {
        tracing::error!("Console error: {e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt().json().with_env_filter(filter).with_target(true).init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main console run function.
async fn run(config: AppConfig, start_page: &str) -> AppResult<()> {
    tracing::info!("Starting Pulverhub Console v{}", env!("CARGO_PKG_VERSION"));

    let store = Arc::new(SessionStore::new(&config.session.file));
    let notifier = Arc::new(notify::TerminalNotifier);

    // ── Step 1: Session guard, before anything else ───────────────
    let http = reqwest::Client::new();
    let guard = SessionGuard::new(store.clone(), http, &config.api, &config.auth);
    if !guard.ensure_valid_session().await? {
        println!("Keine gültige Sitzung. Bitte zuerst am Server anmelden.");
        return Ok(());
    }

    let session = store
        .load()
        .await?
        .ok_or_else(|| AppError::session("Session disappeared after guard check"))?;
    println!("Angemeldet als: {}", session.username);

    // ── Step 2: Gateway + realtime channel ────────────────────────
    let gateway = Arc::new(ApiGateway::new(
        &config.api,
        &config.auth,
        store.clone(),
        notifier.clone(),
    )?);

    let channel = Arc::new(EventChannel::new(&config.api.base_url, &config.realtime)?);
    channel.start();

    let ctx = AppContext::new(store, gateway, channel.clone(), notifier);

    // ── Step 3: Page modules + content loader ─────────────────────
    let roles = RolesModule::new();
    let users = UsersModule::new();
    let pulver = PulverModule::new();

    let mut registry = ModuleRegistry::new();
    registry.register(roles.clone());
    registry.register(users.clone());
    registry.register(pulver.clone());

    let loader = Arc::new(ContentLoader::new(&config.api, Arc::new(registry)));
    loader.load_page(&ctx, start_page).await?;

    // ── Step 4: Interactive loop ──────────────────────────────────
    let result = console::Console::new(ctx, loader, roles, users, pulver)
        .run()
        .await;

    channel.shutdown();
    result
}
