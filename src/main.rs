pub mod models {
    pub mod access;
}

pub mod config;
pub mod db {
    pub mod models;
    pub mod store;

    #[cfg(test)]
    pub mod memory;
}
pub mod render;
pub mod schema;
pub mod server;
pub mod services {
    pub mod dashboard;
    pub mod ingest;
    pub mod normalize;
    pub mod occupancy;
    pub mod provision;
    pub mod simulate;
    pub mod timeline;
}

use crate::config::Config;
use crate::db::store::PgStore;
use crate::server::{router, AppState};
use crate::services::dashboard::{self, LoopSettings, TerminalScreen};
use crate::services::provision::{provision, Installation};
use crate::services::simulate::{self, SimulationSettings, DEFAULT_SEED};
use chrono::Utc;
use clap::{Parser, Subcommand};
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;

/// The dashboard only ever runs one fetch at a time.
const DASHBOARD_POOL_SIZE: u32 = 2;

#[derive(Debug, Parser)]
#[command(name = "access-occupancy", version, about = "Door sensor ingestion and room occupancy dashboard")]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true, value_name = "PATH")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Accept sensor reports over HTTP and append them to the access log
    Serve,
    /// Show live door state, occupancy and activity chart
    Dashboard {
        /// Draw a single frame and exit
        #[arg(long)]
        once: bool,
    },
    /// Write a synthetic history of sensor reports ending now
    Simulate {
        #[arg(long, default_value_t = 120)]
        count: usize,
        /// Seconds between consecutive reports
        #[arg(long, default_value_t = 60)]
        step_secs: i64,
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: u64,
    },
}

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
}

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

fn apply_database_migrations(conn: &mut PgConnection) -> Result<(), String> {
    match conn.run_pending_migrations(MIGRATIONS) {
        Ok(applied) => {
            if applied.is_empty() {
                info!("Database schema is up to date; no migrations were applied");
            } else {
                let names = applied.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                info!("Applied {} database migration(s): {}", applied.len(), names);
            }
            Ok(())
        }
        Err(e) => Err(format!("Applying database migrations failed: {}", e)),
    }
}

/// Migrate, open the pool and make sure the installation rows exist.
fn open_installation(cfg: &Config) -> Result<(PgStore, Installation), String> {
    let mut conn = PgConnection::establish(&cfg.database_url).map_err(|e| format!("DB connection failed: {}", e))?;
    info!("Connected to database");
    apply_database_migrations(&mut conn)?;
    drop(conn);

    let store = PgStore::connect(&cfg.database_url, cfg.pool_size).map_err(|e| format!("DB pool failed: {}", e))?;
    let installation = provision(&store, &cfg.installation)?;
    Ok((store, installation))
}

fn build_runtime() -> Result<tokio::runtime::Runtime, String> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start async runtime: {}", e))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Unable to listen for Ctrl-C, running until killed: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn serve(cfg: &Config) -> Result<(), String> {
    let (store, installation) = open_installation(cfg)?;
    let state = AppState {
        store: Arc::new(store),
        installation,
    };

    build_runtime()?.block_on(async {
        let listener = tokio::net::TcpListener::bind(cfg.listen_addr)
            .await
            .map_err(|e| format!("failed to bind {}: {}", cfg.listen_addr, e))?;
        info!("Ingestion service listening on http://{}", cfg.listen_addr);

        axum::serve(listener, router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| format!("server error: {}", e))?;
        info!("Ingestion service stopped");
        Ok::<(), String>(())
    })
}

fn run_dashboard(cfg: &Config, once: bool) -> Result<(), String> {
    let store = PgStore::connect_lazy(&cfg.database_url, DASHBOARD_POOL_SIZE);
    let mut screen = TerminalScreen::stdout();

    if once {
        let summary = dashboard::render_once(&store, &mut screen, cfg.chart, Utc::now())
            .map_err(|e| format!("dashboard fetch failed: {}", e))?;
        info!(
            "Dashboard frame drawn (door={}, occupancy={}, system_ok={})",
            summary.door, summary.occupancy, summary.system_ok
        );
        return Ok(());
    }

    let settings = LoopSettings {
        interval: cfg.dashboard_interval,
        retry_pause: cfg.dashboard_retry_pause,
        chart: cfg.chart,
    };
    build_runtime()?.block_on(async {
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            shutdown_signal().await;
            let _ = stop_tx.send(true);
        });
        dashboard::run_loop(Arc::new(store), &mut screen, settings, stop_rx).await?;
        Ok::<(), String>(())
    })
}

fn run_simulation(cfg: &Config, settings: SimulationSettings) -> Result<(), String> {
    let (store, installation) = open_installation(cfg)?;
    simulate::run(&store, installation.room_id, &settings, Utc::now())?;
    Ok(())
}

fn run(command: Command) -> Result<(), String> {
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (listen={}, pool_size={}, dashboard_interval={}s, dashboard_retry={}s, user={}, room={}, chart={}x{})",
        cfg.listen_addr,
        cfg.pool_size,
        cfg.dashboard_interval.as_secs(),
        cfg.dashboard_retry_pause.as_secs(),
        cfg.installation.user_name,
        cfg.installation.room_name,
        cfg.chart.width,
        cfg.chart.height
    );

    match command {
        Command::Serve => serve(&cfg),
        Command::Dashboard { once } => run_dashboard(&cfg, once),
        Command::Simulate { count, step_secs, seed } => {
            let settings = SimulationSettings::from_secs(count, step_secs, seed)
                .map_err(|e| format!("invalid --step-secs: {}", e))?;
            run_simulation(&cfg, settings)
        }
    }
}

fn load_env(explicit: Option<&Path>) -> Result<Option<LoadedEnvFile>, String> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(format!("env file not found: {}", path.display()));
        }
        dotenvy::from_path(path).map_err(|e| format!("failed to load {}: {}", path.display(), e))?;
        return Ok(Some(LoadedEnvFile {
            path: path.to_path_buf(),
            explicit: true,
        }));
    }

    let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
    let default_path = cwd.join(".env");
    if !default_path.is_file() {
        return Ok(None);
    }
    dotenvy::from_path(&default_path).map_err(|e| format!("failed to load {}: {}", default_path.display(), e))?;
    Ok(Some(LoadedEnvFile {
        path: default_path,
        explicit: false,
    }))
}

fn main() {
    let cli = Cli::parse();

    let loaded_env = match load_env(cli.env_file.as_deref()) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "access-occupancy {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(cli.command) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
