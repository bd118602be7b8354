//! Main entry point for the Docsmith API server

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use docsmith_api::{config::Config, server::Server};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "docsmith-api", about = "Docsmith OAuth backend", version, author)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print an example configuration file and exit
    #[arg(long)]
    gen_config: bool,

    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_filter = format!("{}=info", env!("CARGO_BIN_NAME").replace('-', "_"));
    docsmith_common::logging::init_logging(&args.verbosity, &log_filter)?;

    if args.gen_config {
        let example_config = Config::generate_example()?;
        println!("{example_config}");
        return Ok(());
    }

    info!("Starting Docsmith API v{}", docsmith_api::VERSION);

    let config = Config::load(args.config.as_deref())?;
    info!(
        "Configuration loaded, binding to {}",
        config.server.bind_address
    );

    let server = Server::new(config).await?;

    match server.run().await {
        Ok(()) => {
            info!("Docsmith API shut down gracefully");
            Ok(())
        }
        Err(e) => {
            error!("Docsmith API error: {}", e);
            Err(e.into())
        }
    }
}
