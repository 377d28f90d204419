//! Messages flowing in and out of the engines.

use rdkafka::error::KafkaError;

/// A message header; the value may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub key: String,
    pub value: Option<Vec<u8>>,
}

/// A message to be produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    /// Target topic
    pub topic: String,
    /// Target partition; `None` lets the partitioner choose
    pub partition: Option<i32>,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    pub headers: Vec<Header>,
}

impl OutboundMessage {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            partition: None,
            key: None,
            payload: None,
            headers: Vec::new(),
        }
    }

    pub fn key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    pub fn partition(mut self, partition: i32) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.headers.push(Header {
            key: key.into(),
            value: Some(value.into()),
        });
        self
    }
}

/// A message received from a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    pub headers: Vec<Header>,
    /// Milliseconds since epoch, when the broker reported one
    pub timestamp: Option<i64>,
}

impl InboundMessage {
    /// Look up the first header with the given key.
    pub fn header(&self, key: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|h| h.key == key)
            .and_then(|h| h.value.as_deref())
    }
}

/// Delivery report emitted by the connection for one sent message.
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveryReceipt {
    /// The message as it was handed to the connection
    pub message: OutboundMessage,
    /// Partition the message was (or would have been) written to
    pub partition: i32,
    /// Assigned offset, or the reason delivery failed
    pub result: Result<i64, KafkaError>,
}

/// What became of one message passed to
/// [`ProducerEngine::produce_batch`](crate::ProducerEngine::produce_batch).
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    Delivered {
        topic: String,
        partition: i32,
        offset: i64,
    },
    /// The broker reported a delivery failure.
    Failed {
        topic: String,
        partition: i32,
        error: KafkaError,
    },
    /// The connection refused the message (for example, a full local queue).
    NotSent { topic: String, error: KafkaError },
    /// The delivery channel closed before a receipt arrived.
    Unconfirmed { topic: String },
}

impl DeliveryOutcome {
    pub fn topic(&self) -> &str {
        match self {
            DeliveryOutcome::Delivered { topic, .. }
            | DeliveryOutcome::Failed { topic, .. }
            | DeliveryOutcome::NotSent { topic, .. }
            | DeliveryOutcome::Unconfirmed { topic } => topic,
        }
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}
