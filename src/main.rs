//! Command-line interface for kafka-nest
//!
//! # Usage Examples
//!
//! ## Produce
//! ```bash
//! # Publish nine generated messages with random keys
//! kafka-nest produce \
//!   --brokers broker-1:9093,broker-2:9093 \
//!   --username app --password secret \
//!   --topic default
//!
//! # Publish explicit payloads, verifying brokers against a private CA
//! kafka-nest produce --topic events \
//!   --ca-location ./ca.crt \
//!   --value '{"body": "hello"}' --value '{"body": "world"}'
//! ```
//!
//! ## Consume
//! ```bash
//! # Consume until Ctrl+C, decoding {"body": ...} payloads
//! kafka-nest consume --topics default,test --group-id test-consumer-group
//!
//! # Print raw payloads with broker and security diagnostics enabled
//! kafka-nest consume --topics events --raw --debug broker,security
//! ```
//!
//! Connection options fall back to `KAFKA_BROKERS`, `KAFKA_USERNAME`,
//! `KAFKA_PASSWORD`, `KAFKA_SCRAM_MECHANISM`, `KAFKA_CA_LOCATION`,
//! `KAFKA_CLIENT_ID` and `KAFKA_DEBUG`.

use clap::{Parser, Subcommand};
use kafka_nest::{ConsumeArgs, ProduceArgs};

mod commands;

#[derive(Parser)]
#[command(name = "kafka-nest")]
#[command(about = "Produce and consume Kafka messages over SASL/SCRAM")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish messages to a topic, one delivery at a time
    Produce(ProduceArgs),

    /// Consume topics in a consumer group until interrupted
    Consume(ConsumeArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Produce(args) => commands::produce::run(args).await,
        Commands::Consume(args) => commands::consume::run(args).await,
    }
}
