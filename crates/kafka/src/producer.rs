use std::time::Duration;

use rdkafka::error::KafkaResult;
use rdkafka::ClientConfig;
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn, Span};

use crate::config::ConnectionConfig;
use crate::connection::ProducerConnection;
use crate::error::{Error, Result};
use crate::librdkafka::RdkafkaProducer;
use crate::message::{DeliveryOutcome, DeliveryReceipt, OutboundMessage};

/// Producer that sends one message at a time and waits for its delivery
/// report before sending the next.
///
/// Throughput is bounded by one broker round trip per message; in exchange
/// outcomes are observed in submission order.
pub struct ProducerEngine<C = RdkafkaProducer> {
    config: ConnectionConfig,
    connection: C,
    timeout: Duration,
    span: Span,
}

impl ProducerEngine<RdkafkaProducer> {
    /// Validate `config` and open a librdkafka producer.
    ///
    /// `timeout` bounds both a single message's delivery (`message.timeout.ms`)
    /// and the final flush of [`produce_batch`](Self::produce_batch). It must
    /// be at least one millisecond.
    pub fn open(config: ConnectionConfig, timeout: Duration) -> Result<Self> {
        Self::open_with(config, timeout, RdkafkaProducer::connect)
    }
}

impl<C: ProducerConnection> ProducerEngine<C> {
    /// Validate `config` and open a producer connection with `connect`.
    pub fn open_with<F>(config: ConnectionConfig, timeout: Duration, connect: F) -> Result<Self>
    where
        F: FnOnce(&ClientConfig) -> KafkaResult<C>,
    {
        config.validate()?;
        // librdkafka reads a zero message timeout as "wait forever"
        if timeout.as_millis() == 0 {
            return Err(Error::ZeroTimeout);
        }

        let mut client_config = config.client_config();
        client_config.set("message.timeout.ms", timeout.as_millis().to_string());
        let connection = connect(&client_config)?;

        let span = info_span!(
            "producer",
            client_id = config.identity.as_deref().unwrap_or_default()
        );
        span.in_scope(|| info!("Producer connected to {}", config.broker_list().join(",")));

        Ok(Self {
            config,
            connection,
            timeout,
            span,
        })
    }

    /// Replace the span this engine logs under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send `messages` in order, waiting for each delivery report, then flush.
    ///
    /// Send and delivery failures are logged and never abort the batch. The
    /// returned outcomes are in submission order, one per message.
    pub fn produce_batch<I>(&mut self, messages: I) -> Vec<DeliveryOutcome>
    where
        I: IntoIterator<Item = OutboundMessage>,
    {
        let span = self.span.clone();
        let _entered = span.enter();

        let mut outcomes = Vec::new();

        for message in messages {
            let topic = message.topic.clone();
            // the connection holds the only sender, so a lost report closes the channel
            let (ack, mut reports) = mpsc::unbounded_channel();
            if let Err(error) = self.connection.send(message, ack) {
                error!("Failed to produce message to {topic}: {error}");
                outcomes.push(DeliveryOutcome::NotSent { topic, error });
                continue;
            }

            let outcome = match reports.blocking_recv() {
                Some(receipt) => settle(receipt),
                None => {
                    error!("Delivery channel closed before {topic} confirmed a message");
                    DeliveryOutcome::Unconfirmed { topic }
                }
            };
            outcomes.push(outcome);
        }

        let pending = self.connection.flush(self.timeout);
        if pending > 0 {
            warn!(
                "Flush timed out after {:?} with {pending} messages still in flight",
                self.timeout
            );
        } else {
            debug!("Flushed producer");
        }

        outcomes
    }

    /// Release the connection.
    pub fn close(self) -> Result<()> {
        let _entered = self.span.enter();
        self.connection.close()?;
        info!("Producer closed");
        Ok(())
    }
}

fn settle(receipt: DeliveryReceipt) -> DeliveryOutcome {
    let DeliveryReceipt {
        message,
        partition,
        result,
    } = receipt;
    let topic = message.topic;

    match result {
        Ok(offset) => {
            info!("Delivered message to topic {topic} [{partition}] at offset {offset}");
            DeliveryOutcome::Delivered {
                topic,
                partition,
                offset,
            }
        }
        Err(error) => {
            warn!("Delivery to topic {topic} [{partition}] failed: {error}");
            DeliveryOutcome::Failed {
                topic,
                partition,
                error,
            }
        }
    }
}
