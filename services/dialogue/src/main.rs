//! Dialogue service binary
//!
//! Usage:
//!   dialogue --config frame.json
//!   dialogue --config frame.json --port 6000 --verbose

use anyhow::Result;
use clap::Parser;
use dialogue::{create_app, init_logging};
use dialogue_config::DEFAULT_CONFIG_FILE;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "dialogue")]
#[command(about = "Dialogue NLU service over the Majordomo protocol")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log at debug level and dump every routed message
    #[arg(short, long)]
    verbose: bool,

    /// Port to listen on, overriding the configuration file
    #[arg(short, long)]
    port: Option<String>,

    /// Enable JSON logging format
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.verbose, args.json_logs) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let mut app = create_app(&args.config)?.with_verbose(args.verbose);
    if let Some(port) = args.port {
        app = app.with_port(port)?;
    }
    info!("Finished setting up application");

    app.run_until(tokio::signal::ctrl_c()).await
}
