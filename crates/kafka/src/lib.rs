//! Producer and consumer engines for Kafka clusters reached over SASL/SCRAM
//! and TLS.
//!
//! Features:
//!
//! - Validated Connection Config: Missing brokers, credentials, or CA files fail before any network activity
//! - One-in-flight Production: Each message's delivery report is awaited before the next send
//! - Poll-loop Consumption: Handler-gated offset storage with at-least-once delivery
//! - Broker-error Termination: The loop stops when all brokers are down or a local timeout occurs
//!
//! The engines are blocking and single-threaded. From async code, run them
//! inside `tokio::task::spawn_blocking`.

pub mod config;

/// Broker-client traits the engines are written against
pub mod connection;

/// Poll-loop consumer with explicit offset storage
pub mod consumer;
pub mod error;
pub mod event;

/// rdkafka-backed connections
pub mod librdkafka;
pub mod message;

/// Sequential producer with per-message delivery reports
pub mod producer;

/// Scripted fake connections
pub mod testing;


// Re-export main types for easy access
pub use config::{ConnectionConfig, DebugContext, DebugContexts, ParseConfigError, ScramMechanism};
pub use connection::{ConsumerConnection, DeliverySender, ProducerConnection};
pub use consumer::{ConsumerEngine, OffsetStorePolicy, DEFAULT_POLL_TIMEOUT};
pub use error::{Error, Result};
pub use event::{is_fatal, CommittedOffset, PollEvent};
pub use librdkafka::{RdkafkaConsumer, RdkafkaProducer};
pub use message::{DeliveryOutcome, DeliveryReceipt, Header, InboundMessage, OutboundMessage};
pub use producer::ProducerEngine;
