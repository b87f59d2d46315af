//! omni-session CLI: serve one entity over HTTP.
//!
//! Logging: set `RUST_LOG=omni_session=debug` to see every journal and backchannel event on stderr.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use omni_session::{
    CheckpointStore, EntityHost, FileCheckpointStore, HelloMethods, MemoryCheckpointStore,
    SessionConfig, load_runtime_settings, run_http, set_config_home_override,
};

use crate::cli::{Cli, Command};

const DEFAULT_BIND: &str = "127.0.0.1:8080";
const DEFAULT_ENTITY: &str = "hello";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    if let Some(conf_dir) = cli.conf.clone() {
        set_config_home_override(conf_dir);
    }

    // RUST_LOG overrides; --verbose => debug; else info
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let verbose = matches!(&cli.command, Command::Serve { verbose: true, .. });
        EnvFilter::new(if verbose {
            "omni_session=debug"
        } else {
            "omni_session=info"
        })
    });
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let runtime_settings = load_runtime_settings();

    match cli.command {
        Command::Serve {
            bind,
            entity,
            checkpoint_dir,
            verbose: _,
        } => {
            let config = SessionConfig::resolve(&runtime_settings.session)?;
            let bind = bind
                .or(runtime_settings.gateway.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string());
            let entity = entity
                .or(runtime_settings.gateway.entity)
                .unwrap_or_else(|| DEFAULT_ENTITY.to_string());
            let checkpoints: Arc<dyn CheckpointStore> = match checkpoint_dir
                .or_else(|| runtime_settings.session.checkpoint_dir.map(PathBuf::from))
            {
                Some(dir) => Arc::new(FileCheckpointStore::new(dir)),
                None => Arc::new(MemoryCheckpointStore::new()),
            };
            let host = EntityHost::open(entity, config, Arc::new(HelloMethods), checkpoints)?;
            run_http(Arc::new(host), &bind).await
        }
    }
}
