pub mod models {
    pub mod reading;
}

pub mod config;
pub mod error;
pub mod db {
    pub mod models;
}
pub mod schema;
pub mod services {
    pub mod aggregate;
    pub mod pipeline;
    pub mod quarantine;
    pub mod registry;
    pub mod retry;
    pub mod validate;
    pub mod watch;
    pub mod writer;
}

use crate::config::Config;
use crate::services::watch;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use log::{error, info};
use std::fs;

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

pub fn run() -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (data_dir={}, quarantine_dir={}, failed_dir={}, poll_interval={}s, max_db_attempts={})",
        cfg.data_dir.display(),
        cfg.quarantine_dir.display(),
        cfg.failed_dir.display(),
        cfg.poll_interval.as_secs(),
        cfg.retry.max_attempts
    );

    // 2) Connect DB
    let mut conn = PgConnection::establish(&cfg.database_url).map_err(|e| format!("DB connection failed: {}", e))?;
    info!("Connected to database");

    // 3) Apply pending database migrations
    apply_database_migrations(&mut conn)?;

    // 4) Working directories for the drop, quarantine and failure areas
    for dir in [&cfg.data_dir, &cfg.quarantine_dir, &cfg.failed_dir] {
        fs::create_dir_all(dir).map_err(|e| format!("creating {} failed: {}", dir.display(), e))?;
    }

    // 5) Files that arrived while we were not running
    info!("Processing existing files...");
    let existing = watch::scan_existing(&mut conn, &cfg)?;
    info!("Startup sweep complete ({} file(s))", existing);

    // 6) Poll for new arrivals until externally interrupted. Each file's
    // transaction is committed or rolled back before the loop advances, so
    // interruption between files leaves nothing open.
    info!("Pipeline started, monitoring {}", cfg.data_dir.display());
    watch::run_loop(&mut conn, &cfg)
}

fn main() {
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    info!(
        "sensor-ingest {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run() {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
