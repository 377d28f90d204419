//! Scripted in-memory connections for exercising the engines without a
//! broker.
//!
//! Each fake shares a record of the calls it received, so tests can inspect
//! it after the engine has consumed the connection.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rdkafka::error::{KafkaError, KafkaResult, RDKafkaErrorCode};
use tokio::sync::broadcast;

use crate::config::{ConnectionConfig, ScramMechanism};
use crate::connection::{ConsumerConnection, DeliverySender, ProducerConnection};
use crate::event::PollEvent;
use crate::message::{DeliveryReceipt, InboundMessage, OutboundMessage};

/// A config that passes validation.
pub fn test_config() -> ConnectionConfig {
    ConnectionConfig::new("localhost:9093", "tester", "hunter2", ScramMechanism::Sha256)
        .with_identity("test-client")
}

/// Build an inbound message with a key and payload.
pub fn inbound(topic: &str, partition: i32, offset: i64, key: &str, payload: &str) -> InboundMessage {
    InboundMessage {
        topic: topic.to_string(),
        partition,
        offset,
        key: Some(key.as_bytes().to_vec()),
        payload: Some(payload.as_bytes().to_vec()),
        headers: Vec::new(),
        timestamp: None,
    }
}

/// Shorthand for a broker error event.
pub fn error_event(code: RDKafkaErrorCode) -> PollEvent {
    PollEvent::Error {
        code,
        reason: code.to_string(),
    }
}

fn lock<T>(record: &Mutex<T>) -> MutexGuard<'_, T> {
    record.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// How the fake producer treats one sent message.
#[derive(Debug, Clone)]
pub enum FakeDelivery {
    /// Accept and report delivery at the next offset.
    Deliver,
    /// Accept, then report a delivery failure.
    Fail(KafkaError),
    /// Refuse the send call itself.
    Refuse(KafkaError),
    /// Accept the message, then drop the delivery sender without reporting.
    Lose,
}

#[derive(Debug, Default)]
pub struct ProducerRecord {
    /// Every message passed to `send`, refused ones included
    pub attempts: Vec<OutboundMessage>,
    /// Timeouts of each flush call
    pub flushes: Vec<Duration>,
    pub closed: bool,
}

/// Producer connection replying to sends according to a script; messages
/// past the end of the script are delivered.
pub struct FakeProducer {
    script: VecDeque<FakeDelivery>,
    record: Arc<Mutex<ProducerRecord>>,
    next_offset: i64,
    pending_after_flush: usize,
}

impl FakeProducer {
    pub fn new(script: Vec<FakeDelivery>) -> Self {
        Self {
            script: script.into(),
            record: Arc::default(),
            next_offset: 0,
            pending_after_flush: 0,
        }
    }

    /// Make every flush report `pending` messages left behind.
    pub fn with_pending_after_flush(mut self, pending: usize) -> Self {
        self.pending_after_flush = pending;
        self
    }

    pub fn record(&self) -> Arc<Mutex<ProducerRecord>> {
        Arc::clone(&self.record)
    }
}

impl ProducerConnection for FakeProducer {
    fn send(&mut self, message: OutboundMessage, ack: DeliverySender) -> KafkaResult<()> {
        lock(&self.record).attempts.push(message.clone());

        let partition = message.partition.unwrap_or(0);
        let result = match self.script.pop_front().unwrap_or(FakeDelivery::Deliver) {
            FakeDelivery::Refuse(error) => return Err(error),
            FakeDelivery::Lose => return Ok(()),
            FakeDelivery::Fail(error) => Err(error),
            FakeDelivery::Deliver => {
                let offset = self.next_offset;
                self.next_offset += 1;
                Ok(offset)
            }
        };
        let _ = ack.send(DeliveryReceipt {
            message,
            partition,
            result,
        });
        Ok(())
    }

    fn flush(&mut self, timeout: Duration) -> usize {
        lock(&self.record).flushes.push(timeout);
        self.pending_after_flush
    }

    fn close(self) -> KafkaResult<()> {
        lock(&self.record).closed = true;
        Ok(())
    }
}

/// One scripted poll result of [`FakeConsumer`].
#[derive(Debug, Clone)]
pub enum FakeStep {
    Event(PollEvent),
    /// A poll that times out with nothing to report.
    Idle,
    /// Fire the stop signal, then time out.
    Stop,
}

#[derive(Debug, Default)]
pub struct ConsumerRecord {
    pub subscribed: Vec<String>,
    pub polls: usize,
    /// Messages passed to `store_offset`, in order
    pub stored: Vec<InboundMessage>,
    pub closed: bool,
}

/// Consumer connection replaying scripted poll results. Once the script is
/// exhausted it fires the stop signal, if one was attached.
pub struct FakeConsumer {
    steps: VecDeque<FakeStep>,
    stop: Option<broadcast::Sender<()>>,
    record: Arc<Mutex<ConsumerRecord>>,
    subscribe_error: Option<KafkaError>,
    store_error: Option<KafkaError>,
    close_error: Option<KafkaError>,
}

impl FakeConsumer {
    pub fn new(steps: Vec<FakeStep>) -> Self {
        Self {
            steps: steps.into(),
            stop: None,
            record: Arc::default(),
            subscribe_error: None,
            store_error: None,
            close_error: None,
        }
    }

    pub fn with_stop(mut self, stop: broadcast::Sender<()>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn failing_subscribe(mut self, error: KafkaError) -> Self {
        self.subscribe_error = Some(error);
        self
    }

    pub fn failing_store(mut self, error: KafkaError) -> Self {
        self.store_error = Some(error);
        self
    }

    pub fn failing_close(mut self, error: KafkaError) -> Self {
        self.close_error = Some(error);
        self
    }

    pub fn record(&self) -> Arc<Mutex<ConsumerRecord>> {
        Arc::clone(&self.record)
    }

    fn fire_stop(&self) {
        if let Some(stop) = &self.stop {
            let _ = stop.send(());
        }
    }
}

impl ConsumerConnection for FakeConsumer {
    fn subscribe(&mut self, topics: &[String]) -> KafkaResult<()> {
        if let Some(error) = self.subscribe_error.take() {
            return Err(error);
        }
        lock(&self.record).subscribed = topics.to_vec();
        Ok(())
    }

    fn poll(&mut self, _timeout: Duration) -> Option<PollEvent> {
        lock(&self.record).polls += 1;
        match self.steps.pop_front() {
            Some(FakeStep::Event(event)) => Some(event),
            Some(FakeStep::Idle) => None,
            Some(FakeStep::Stop) | None => {
                self.fire_stop();
                None
            }
        }
    }

    fn store_offset(&mut self, message: &InboundMessage) -> KafkaResult<()> {
        lock(&self.record).stored.push(message.clone());
        match &self.store_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn close(self) -> KafkaResult<()> {
        lock(&self.record).closed = true;
        match self.close_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
