//! kafka-nest Library
//!
//! Command-line option types and message helpers for the `kafka-nest` binary,
//! built on the engines in `kafka_nest_engine`.
//!
//! # CLI Usage
//!
//! ```bash
//! # Publish nine sample messages
//! kafka-nest produce --brokers broker:9093 --username app --password secret --topic default
//!
//! # Consume two topics until Ctrl+C
//! kafka-nest consume --brokers broker:9093 --username app --password secret \
//!   --topics default,test --group-id test-consumer-group
//! ```
//!
//! Every connection option can also be supplied through its `KAFKA_*`
//! environment variable.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use kafka_nest_engine::{
    ConnectionConfig, DebugContexts, InboundMessage, OffsetStorePolicy, OutboundMessage,
    ScramMechanism,
};
use serde::Deserialize;

pub mod config;

pub use config::parse_duration;

#[derive(Parser, Clone)]
pub struct BrokerOpts {
    /// Kafka brokers (comma-separated host:port list)
    #[arg(long, env = "KAFKA_BROKERS")]
    pub brokers: String,

    /// SASL username
    #[arg(long, env = "KAFKA_USERNAME")]
    pub username: String,

    /// SASL password
    #[arg(long, env = "KAFKA_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// SASL SCRAM mechanism (SCRAM-SHA-256 or SCRAM-SHA-512)
    #[arg(long, default_value = "SCRAM-SHA-256", env = "KAFKA_SCRAM_MECHANISM")]
    pub mechanism: ScramMechanism,

    /// CA certificate used to verify the brokers
    #[arg(long, env = "KAFKA_CA_LOCATION")]
    pub ca_location: Option<PathBuf>,

    /// Client identifier reported to the brokers
    #[arg(long, env = "KAFKA_CLIENT_ID")]
    pub client_id: Option<String>,

    /// librdkafka debug contexts (generic, broker, security, conf or all)
    #[arg(long, env = "KAFKA_DEBUG")]
    pub debug: Option<DebugContexts>,
}

impl From<&BrokerOpts> for ConnectionConfig {
    fn from(opts: &BrokerOpts) -> Self {
        Self {
            identity: opts.client_id.clone(),
            brokers: opts.brokers.clone(),
            username: opts.username.clone(),
            password: opts.password.clone(),
            mechanism: opts.mechanism,
            ca_location: opts.ca_location.clone(),
            debug: opts.debug.clone().unwrap_or_default(),
        }
    }
}

#[derive(Parser, Clone)]
pub struct ProduceArgs {
    #[command(flatten)]
    pub broker: BrokerOpts,

    /// Topic to publish to
    #[arg(long, default_value = "default")]
    pub topic: String,

    /// Number of generated messages when no --value is given
    #[arg(long, default_value_t = 9)]
    pub count: usize,

    /// Explicit message payloads, one message each
    #[arg(long = "value", value_name = "PAYLOAD")]
    pub values: Vec<String>,

    /// Delivery and flush timeout (e.g. "10s", "500ms")
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub timeout: Duration,
}

#[derive(Parser, Clone)]
pub struct ConsumeArgs {
    #[command(flatten)]
    pub broker: BrokerOpts,

    /// Topics to subscribe to (comma-separated or multiple --topics)
    #[arg(long, value_delimiter = ',', required = true)]
    pub topics: Vec<String>,

    /// Consumer group ID
    #[arg(long, default_value = "test-consumer-group")]
    pub group_id: String,

    /// Consumer group session timeout
    #[arg(long, default_value = "60s", value_parser = parse_duration)]
    pub session_timeout: Duration,

    /// How long each poll waits for an event; also bounds Ctrl+C latency
    #[arg(long, default_value = "100ms", value_parser = parse_duration)]
    pub poll_timeout: Duration,

    /// Print payloads as text instead of decoding `{"body": ...}` JSON
    #[arg(long)]
    pub raw: bool,

    /// Store a message's offset only when it was handled successfully
    #[arg(long)]
    pub store_on_success: bool,
}

impl ConsumeArgs {
    pub fn offset_store_policy(&self) -> OffsetStorePolicy {
        if self.store_on_success {
            OffsetStorePolicy::OnSuccess
        } else {
            OffsetStorePolicy::Always
        }
    }
}

/// Build the messages for `produce`: one per explicit payload, or `count`
/// generated `value{i}` payloads. Each message gets a random UUID key.
pub fn build_messages(topic: &str, count: usize, values: &[String]) -> Vec<OutboundMessage> {
    let payloads: Vec<String> = if values.is_empty() {
        (0..count).map(|i| format!("value{i}")).collect()
    } else {
        values.to_vec()
    };

    payloads
        .into_iter()
        .map(|payload| {
            OutboundMessage::new(topic)
                .key(uuid::Uuid::new_v4().to_string())
                .payload(payload)
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct EventBody {
    body: String,
}

/// Render a consumed message's payload for display.
///
/// In raw mode the payload is shown as (lossy) UTF-8 text; otherwise it must
/// be a JSON object with a string `body` field, which is returned.
pub fn render_payload(message: &InboundMessage, raw: bool) -> anyhow::Result<String> {
    let payload = message.payload.as_deref().unwrap_or_default();
    if raw {
        return Ok(String::from_utf8_lossy(payload).into_owned());
    }

    let event: EventBody = serde_json::from_slice(payload).map_err(|e| {
        anyhow::anyhow!(
            "Failed to decode payload at {} [{}] offset {}: {e}",
            message.topic,
            message.partition,
            message.offset
        )
    })?;
    Ok(event.body)
}
