//! Send one text to a running dialogue service and print the reply
//!
//! Usage:
//!   nlu-client "hello world foo"
//!   nlu-client --endpoint 10.0.0.5:5590 --service nlu "some text"

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use clap::Parser;
use dialogue::init_logging;
use dialogue_config::{ClientSettings, RuntimeConfig};
use majordomo::Client;

#[derive(Parser, Debug)]
#[command(name = "nlu-client")]
#[command(about = "Query a dialogue NLU service")]
#[command(version)]
struct Args {
    /// Broker address
    #[arg(short, long, default_value = "127.0.0.1:5590")]
    endpoint: String,

    /// Service name to query
    #[arg(short, long, default_value = "nlu")]
    service: String,

    /// Reply timeout per attempt in milliseconds
    #[arg(long, default_value_t = ClientSettings::default().timeout_ms)]
    timeout_ms: u64,

    /// Extra attempts after a timeout
    #[arg(long, default_value_t = ClientSettings::default().retries)]
    retries: u32,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Text to analyse; multiple words are joined with spaces
    #[arg(required = true)]
    text: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, false)?;

    let runtime = RuntimeConfig {
        verbose: args.verbose,
        ..RuntimeConfig::default()
    };
    let mut client = Client::new(&args.endpoint, &runtime).with_settings(ClientSettings {
        timeout_ms: args.timeout_ms,
        retries: args.retries,
    });

    if !client.service_available(&args.service).await? {
        bail!("Service '{}' has no workers at {}", args.service, client.endpoint());
    }

    let reply = client
        .send(&args.service, vec![Bytes::from(args.text.join(" "))])
        .await
        .with_context(|| format!("Request to '{}' failed", args.service))?;

    for frame in reply {
        println!("{}", String::from_utf8_lossy(&frame));
    }

    client.close().await;
    Ok(())
}
