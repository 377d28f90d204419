use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::Offset;

use crate::message::InboundMessage;

/// One event surfaced by a consumer poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollEvent {
    Message(InboundMessage),
    Error {
        code: RDKafkaErrorCode,
        reason: String,
    },
    /// Result of a consumer-group offset commit.
    OffsetsCommitted {
        offsets: Vec<CommittedOffset>,
        error: Option<KafkaError>,
    },
    /// Anything the engine has no use for.
    Other(String),
}

impl PollEvent {
    /// Build an error event from a client error, keeping its librdkafka code
    /// when it carries one.
    pub fn from_error(error: &KafkaError, reason: impl Into<String>) -> Self {
        PollEvent::Error {
            code: error.rdkafka_error_code().unwrap_or(RDKafkaErrorCode::Fail),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommittedOffset {
    pub topic: String,
    pub partition: i32,
    pub offset: Offset,
}

/// Broker errors after which the consume loop stops instead of waiting for
/// the client to recover.
pub fn is_fatal(code: RDKafkaErrorCode) -> bool {
    matches!(
        code,
        RDKafkaErrorCode::AllBrokersDown | RDKafkaErrorCode::OperationTimedOut
    )
}
