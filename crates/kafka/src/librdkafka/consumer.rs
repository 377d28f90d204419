use std::time::Duration;

use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::KafkaResult;
use rdkafka::message::{BorrowedMessage, Headers, Message};
use rdkafka::ClientConfig;
use tokio::sync::mpsc::{self, UnboundedReceiver};

use super::context::EventContext;
use crate::connection::ConsumerConnection;
use crate::event::PollEvent;
use crate::message::{Header, InboundMessage};

const CLOSE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Consumer connection over a polled `BaseConsumer`.
///
/// Client errors and commit results reported through the consumer context
/// are queued and handed out by [`poll`](ConsumerConnection::poll) ahead of
/// new messages.
pub struct RdkafkaConsumer {
    inner: BaseConsumer<EventContext>,
    events: UnboundedReceiver<PollEvent>,
}

impl RdkafkaConsumer {
    pub fn connect(config: &ClientConfig) -> KafkaResult<Self> {
        let (tx, events) = mpsc::unbounded_channel();
        let inner = config.create_with_context(EventContext { events: tx })?;
        Ok(Self { inner, events })
    }
}

impl ConsumerConnection for RdkafkaConsumer {
    fn subscribe(&mut self, topics: &[String]) -> KafkaResult<()> {
        let topics: Vec<&str> = topics.iter().map(String::as_str).collect();
        self.inner.subscribe(&topics)
    }

    fn poll(&mut self, timeout: Duration) -> Option<PollEvent> {
        if let Ok(event) = self.events.try_recv() {
            return Some(event);
        }
        let polled = match self.inner.poll(timeout) {
            Some(Ok(message)) => Some(PollEvent::Message(to_inbound(&message))),
            Some(Err(error)) => {
                let reason = error.to_string();
                Some(PollEvent::from_error(&error, reason))
            }
            None => None,
        };
        // callbacks fired during this poll land in the queue
        polled.or_else(|| self.events.try_recv().ok())
    }

    fn store_offset(&mut self, message: &InboundMessage) -> KafkaResult<()> {
        self.inner
            .store_offset(&message.topic, message.partition, next_offset(message))
    }

    /// Leave the group and wait for librdkafka to finish closing. Messages
    /// still arriving meanwhile are discarded unstored.
    fn close(self) -> KafkaResult<()> {
        self.inner.close_queue()?;
        while !self.inner.closed() {
            let _ = self.inner.poll(CLOSE_POLL_INTERVAL);
        }
        Ok(())
    }
}

/// The offset stored for a processed message is the next one to consume.
fn next_offset(message: &InboundMessage) -> i64 {
    message.offset + 1
}

fn to_inbound(message: &BorrowedMessage<'_>) -> InboundMessage {
    let headers = message
        .headers()
        .map(|headers| {
            headers
                .iter()
                .map(|header| Header {
                    key: header.key.to_string(),
                    value: header.value.map(<[u8]>::to_vec),
                })
                .collect()
        })
        .unwrap_or_default();

    InboundMessage {
        topic: message.topic().to_string(),
        partition: message.partition(),
        offset: message.offset(),
        key: message.key().map(<[u8]>::to_vec),
        payload: message.payload().map(<[u8]>::to_vec),
        headers,
        timestamp: message.timestamp().to_millis(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_offset_is_next_to_consume() {
        let message = crate::testing::inbound("t1", 0, 41, "k", "v");
        assert_eq!(next_offset(&message), 42);
    }

    #[test]
    fn test_close_waits_for_consumer_to_finish() {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", "127.0.0.1:1")
            .set("group.id", "close-test");
        let mut consumer = RdkafkaConsumer::connect(&config).unwrap();
        consumer.subscribe(&["t1".to_string()]).unwrap();

        assert!(consumer.close().is_ok());
    }
}
