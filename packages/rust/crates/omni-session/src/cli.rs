use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "omni-session")]
#[command(about = "Host one stateful entity with transactional sessions over HTTP long polling.")]
pub(crate) struct Cli {
    /// Override config directory (reads `<conf>/omni-session/settings.yaml`).
    #[arg(long, global = true)]
    pub(crate) conf: Option<PathBuf>,

    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run HTTP server (POST /invoke, POST /pull, GET /health).
    Serve {
        /// Listen address (default: settings `gateway.bind`, else 127.0.0.1:8080)
        #[arg(long)]
        bind: Option<String>,

        /// Entity id (default: settings `gateway.entity`, else `hello`)
        #[arg(long)]
        entity: Option<String>,

        /// Directory for checkpoint files; in-memory checkpoints when unset
        #[arg(long)]
        checkpoint_dir: Option<PathBuf>,

        /// Debug logging (ignored when RUST_LOG is set)
        #[arg(long, short)]
        verbose: bool,
    },
}
