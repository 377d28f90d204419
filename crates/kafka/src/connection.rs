//! The broker-client surface the engines depend on.
//!
//! [`crate::librdkafka`] implements these traits on top of rdkafka;
//! [`crate::testing`] provides scripted fakes.

use std::time::Duration;

use rdkafka::error::KafkaResult;
use tokio::sync::mpsc::UnboundedSender;

use crate::event::PollEvent;
use crate::message::{DeliveryReceipt, InboundMessage, OutboundMessage};

/// Channel on which a producer connection reports delivery of a sent message.
pub type DeliverySender = UnboundedSender<DeliveryReceipt>;

pub trait ProducerConnection {
    /// Enqueue a message. Success only means it was accepted locally; the
    /// delivery result arrives later on `ack`. On error no receipt is sent.
    fn send(&mut self, message: OutboundMessage, ack: DeliverySender) -> KafkaResult<()>;

    /// Wait up to `timeout` for in-flight messages, returning how many are
    /// still pending.
    fn flush(&mut self, timeout: Duration) -> usize;

    fn close(self) -> KafkaResult<()>
    where
        Self: Sized;
}

pub trait ConsumerConnection {
    fn subscribe(&mut self, topics: &[String]) -> KafkaResult<()>;

    /// Wait up to `timeout` for the next event. `None` means nothing happened.
    fn poll(&mut self, timeout: Duration) -> Option<PollEvent>;

    /// Mark the message as processed so the next group commit covers it.
    fn store_offset(&mut self, message: &InboundMessage) -> KafkaResult<()>;

    fn close(self) -> KafkaResult<()>
    where
        Self: Sized;
}
