//! Command-line interface.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::server;

#[derive(Debug, Parser)]
#[command(
    name = "skillscan",
    about = "Resume text extraction and skill matching service",
    version
)]
pub struct Cli {
    /// Path to a TOML config file.
    #[arg(long, global = true, env = "SKILLSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP server.
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on.
        #[arg(long, default_value_t = 8080, env = "PORT")]
        port: u16,
    },
    /// Run one local PDF through the pipeline and print the result.
    Parse {
        /// Path to the PDF file.
        file: PathBuf,
    },
}

/// Peek at the raw arguments for verbosity before the logger is set up.
pub fn is_verbose() -> bool {
    std::env::args().any(|a| a == "-v" || a == "--verbose")
}

/// Parse arguments and dispatch.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Arc::new(Settings::load(cli.config.as_deref())?);

    match cli.command {
        Command::Serve { host, port } => server::serve(settings, &host, port).await,
        Command::Parse { file } => parse_file(settings, &file).await,
    }
}

async fn parse_file(settings: Arc<Settings>, file: &Path) -> anyhow::Result<()> {
    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("invalid file name: {}", file.display()))?
        .to_string();

    if !filename.to_lowercase().ends_with(".pdf") {
        anyhow::bail!("only PDF files are supported: {}", filename);
    }

    let bytes = tokio::fs::read(file).await?;

    let pipeline = server::build_pipeline(&settings);
    let result = pipeline.run(&filename, &bytes).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
