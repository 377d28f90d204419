use std::time::Duration;

use rdkafka::error::KafkaResult;
use rdkafka::ClientConfig;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, error, info, info_span, warn, Span};

use crate::config::ConnectionConfig;
use crate::connection::ConsumerConnection;
use crate::error::{Error, Result};
use crate::event::{is_fatal, PollEvent};
use crate::librdkafka::RdkafkaConsumer;
use crate::message::InboundMessage;

/// Poll timeout used unless overridden with
/// [`ConsumerEngine::with_poll_timeout`]. Also bounds how long a stop signal
/// may go unnoticed.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// When to store a message's offset after its handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetStorePolicy {
    /// Store regardless of the handler result. A failed message is not
    /// redelivered.
    #[default]
    Always,
    /// Store only when the handler succeeded, leaving failed messages to be
    /// redelivered after a restart or rebalance.
    OnSuccess,
}

enum LoopState {
    Running,
    Stopped(Option<Error>),
}

/// Single-threaded consumer running a poll loop over one connection.
///
/// Automatic offset storage is disabled: the engine stores each message's
/// offset itself once the handler has returned, and the client's periodic
/// auto-commit picks stored offsets up. Delivery is at-least-once.
pub struct ConsumerEngine<C = RdkafkaConsumer> {
    config: ConnectionConfig,
    group_id: String,
    connection: C,
    poll_timeout: Duration,
    offset_policy: OffsetStorePolicy,
    span: Span,
}

impl ConsumerEngine<RdkafkaConsumer> {
    /// Validate `config` and `group_id` and open a librdkafka consumer.
    pub fn open(
        config: ConnectionConfig,
        group_id: impl Into<String>,
        session_timeout: Duration,
    ) -> Result<Self> {
        Self::open_with(config, group_id, session_timeout, RdkafkaConsumer::connect)
    }
}

impl<C: ConsumerConnection> ConsumerEngine<C> {
    /// Validate `config` and `group_id` and open a consumer connection with
    /// `connect`.
    pub fn open_with<F>(
        config: ConnectionConfig,
        group_id: impl Into<String>,
        session_timeout: Duration,
        connect: F,
    ) -> Result<Self>
    where
        F: FnOnce(&ClientConfig) -> KafkaResult<C>,
    {
        config.validate()?;
        let group_id = group_id.into();
        if group_id.trim().is_empty() {
            return Err(Error::EmptyGroupId);
        }

        let mut client_config = config.client_config();
        client_config
            .set("group.id", &group_id)
            .set("session.timeout.ms", session_timeout.as_millis().to_string())
            .set("auto.offset.reset", "earliest")
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "false");
        let connection = connect(&client_config)?;

        let span = info_span!(
            "consumer",
            client_id = config.identity.as_deref().unwrap_or_default(),
            group_id = %group_id
        );
        span.in_scope(|| info!("Consumer connected to {}", config.broker_list().join(",")));

        Ok(Self {
            config,
            group_id,
            connection,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            offset_policy: OffsetStorePolicy::default(),
            span,
        })
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    pub fn with_offset_store_policy(mut self, policy: OffsetStorePolicy) -> Self {
        self.offset_policy = policy;
        self
    }

    /// Replace the span this engine logs under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    /// Subscribe to `topics` and run the poll loop until `stop` fires or the
    /// broker reports all brokers down or a local timeout.
    ///
    /// Each message is passed to `handler`; a handler error is logged and the
    /// loop moves on. The connection is closed on every exit path. Returns
    /// `Ok(())` when stopped by `stop`, otherwise the error that ended the
    /// loop. A value on `stop`, a lagged receiver, and a dropped sender all
    /// count as a stop request.
    pub fn consume<H>(
        mut self,
        topics: &[String],
        mut stop: broadcast::Receiver<()>,
        mut handler: H,
    ) -> Result<()>
    where
        H: FnMut(&InboundMessage) -> anyhow::Result<()>,
    {
        let span = self.span.clone();
        let _entered = span.enter();

        if let Err(e) = self.connection.subscribe(topics) {
            error!("Failed to subscribe to {topics:?}: {e}");
            return self.shutdown(Some(e.into()));
        }
        info!("Subscribed to {topics:?}");

        let failure = loop {
            if stop_requested(&mut stop) {
                info!("Caught stop signal, terminating");
                break None;
            }

            let Some(event) = self.connection.poll(self.poll_timeout) else {
                continue;
            };

            if let LoopState::Stopped(failure) = self.dispatch(event, &mut handler) {
                break failure;
            }
        };

        self.shutdown(failure)
    }

    fn dispatch<H>(&mut self, event: PollEvent, handler: &mut H) -> LoopState
    where
        H: FnMut(&InboundMessage) -> anyhow::Result<()>,
    {
        match event {
            PollEvent::Message(message) => {
                self.handle_message(&message, handler);
                LoopState::Running
            }
            PollEvent::Error { code, reason } if is_fatal(code) => {
                error!("Fatal broker error {code}: {reason}, stopping consumer");
                LoopState::Stopped(Some(Error::Fatal { code, reason }))
            }
            PollEvent::Error { code, reason } => {
                // the client retries on its own
                warn!("Broker error {code}: {reason}");
                LoopState::Running
            }
            PollEvent::OffsetsCommitted { offsets, error } => {
                if let Some(e) = error {
                    warn!("Failed to commit offsets: {e}");
                }
                for committed in offsets {
                    info!(
                        "Committed offset {:?} for topic {} [{}]",
                        committed.offset, committed.topic, committed.partition
                    );
                }
                LoopState::Running
            }
            PollEvent::Other(description) => {
                debug!("Ignored event: {description}");
                LoopState::Running
            }
        }
    }

    fn handle_message<H>(&mut self, message: &InboundMessage, handler: &mut H)
    where
        H: FnMut(&InboundMessage) -> anyhow::Result<()>,
    {
        let handled = match handler(message) {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "Handler failed for topic {} [{}] at offset {}: {e:#}",
                    message.topic, message.partition, message.offset
                );
                false
            }
        };

        if !handled && self.offset_policy == OffsetStorePolicy::OnSuccess {
            debug!(
                "Leaving offset {} of topic {} [{}] unstored",
                message.offset, message.topic, message.partition
            );
            return;
        }

        if let Err(e) = self.connection.store_offset(message) {
            error!(
                "Error storing offset after message {} [{}] at offset {}: {e}",
                message.topic, message.partition, message.offset
            );
        }
    }

    /// Close the connection. The error that stopped the loop wins over a
    /// close error.
    fn shutdown(self, failure: Option<Error>) -> Result<()> {
        let closed = self.connection.close();
        match failure {
            Some(failure) => {
                if let Err(e) = closed {
                    warn!("Failed to close consumer connection: {e}");
                }
                Err(failure)
            }
            None => {
                closed?;
                info!("Consumer closed");
                Ok(())
            }
        }
    }
}

fn stop_requested(stop: &mut broadcast::Receiver<()>) -> bool {
    !matches!(stop.try_recv(), Err(TryRecvError::Empty))
}
