use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "vidstream")]
#[command(author, version, about = "Upload, transcode and range-stream video files")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, default_value = "vidstream.json")]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check that ffmpeg is available
    CheckTools,

    /// List stored videos
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate the configuration file
    Validate,
}
