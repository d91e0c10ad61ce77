mod app;
mod cli;
mod clock;
mod config;
mod engine;
mod error;
mod event;
mod input;
mod logging;
mod stats;
mod store;
mod sync;
mod tui;
mod types;
mod ui;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};

use config::{ConfigStore, FileConfigStore};
use store::{MemoryStore, SqliteStore, Store};
use sync::{Remote, SnapshotFile};

/// Overrides the config file location.
const CONFIG_ENV: &str = "SPEAKR_CONFIG";

fn main() -> Result<()> {
    let config_store = match std::env::var_os(CONFIG_ENV) {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let created = if config_store.path().exists() {
        None
    } else {
        Some(config_store.save(&config::Config::default()))
    };
    let cfg = config_store.load();
    let _guard = logging::init(&cfg.log_level)?;
    info!(config = %config_store.path().display(), "starting speakr");
    if let Some(Err(err)) = created {
        warn!(path = %config_store.path().display(), error = %err, "failed to write default config");
    }

    let db_path = cfg.db_path.clone().unwrap_or_else(store::default_db_path);
    let (store, degraded): (Box<dyn Store>, bool) = match SqliteStore::open(&db_path) {
        Ok(store) => (Box::new(store), false),
        Err(err) => {
            warn!(path = %db_path, error = %err, "database unavailable, keeping data in memory");
            (Box::new(MemoryStore::new()), true)
        }
    };
    let remote = cfg
        .sync_path
        .as_ref()
        .map(|path| Box::new(SnapshotFile::new(path)) as Box<dyn Remote>);

    let mut app = app::App::new(store, remote, Box::new(clock::SystemClock), cfg.autosave_secs);
    if degraded {
        app.mark_degraded();
    }

    let cli_opts = cli::Cli::parse();
    if let Some(command) = cli_opts.command {
        return cli::run(command, &mut app);
    }

    let mut terminal = tui::init()?;
    let result = event::run(&mut app, &mut terminal, cfg.tick_millis);

    tui::restore()?;
    info!("speakr stopped");

    result
}
