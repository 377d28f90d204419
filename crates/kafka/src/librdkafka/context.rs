use rdkafka::config::RDKafkaLogLevel;
use rdkafka::consumer::ConsumerContext;
use rdkafka::error::{KafkaError, KafkaResult};
use rdkafka::message::DeliveryResult;
use rdkafka::producer::ProducerContext;
use rdkafka::{ClientContext, Message, TopicPartitionList};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::connection::DeliverySender;
use crate::event::{CommittedOffset, PollEvent};
use crate::message::{DeliveryReceipt, OutboundMessage};

/// Route a librdkafka log line into `tracing`.
fn forward_log(level: RDKafkaLogLevel, facility: &str, message: &str) {
    match level {
        RDKafkaLogLevel::Emerg
        | RDKafkaLogLevel::Alert
        | RDKafkaLogLevel::Critical
        | RDKafkaLogLevel::Error => error!(target: "librdkafka", "{facility}: {message}"),
        RDKafkaLogLevel::Warning => warn!(target: "librdkafka", "{facility}: {message}"),
        RDKafkaLogLevel::Notice | RDKafkaLogLevel::Info => {
            info!(target: "librdkafka", "{facility}: {message}")
        }
        RDKafkaLogLevel::Debug => debug!(target: "librdkafka", "{facility}: {message}"),
    }
}

/// Per-message opaque carried through librdkafka until its delivery report.
pub(crate) struct PendingDelivery {
    pub(crate) message: OutboundMessage,
    pub(crate) ack: DeliverySender,
}

/// Producer context turning delivery reports into [`DeliveryReceipt`]s.
pub(crate) struct DeliveryContext;

impl ClientContext for DeliveryContext {
    fn log(&self, level: RDKafkaLogLevel, fac: &str, log_message: &str) {
        forward_log(level, fac, log_message);
    }

    fn error(&self, error: KafkaError, reason: &str) {
        warn!("Kafka producer error: {error}: {reason}");
    }
}

impl ProducerContext for DeliveryContext {
    type DeliveryOpaque = Box<PendingDelivery>;

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, delivery_opaque: Self::DeliveryOpaque) {
        let PendingDelivery { message, ack } = *delivery_opaque;
        let receipt = match delivery_result {
            Ok(delivered) => DeliveryReceipt {
                message,
                partition: delivered.partition(),
                result: Ok(delivered.offset()),
            },
            Err((error, failed)) => DeliveryReceipt {
                message,
                partition: failed.partition(),
                result: Err(error.clone()),
            },
        };
        if ack.send(receipt).is_err() {
            debug!("Delivery receipt dropped, nobody is waiting for it");
        }
    }
}

/// Consumer context queueing client errors and commit results as
/// [`PollEvent`]s for the next poll.
pub(crate) struct EventContext {
    pub(crate) events: UnboundedSender<PollEvent>,
}

impl EventContext {
    fn push(&self, event: PollEvent) {
        if self.events.send(event).is_err() {
            debug!("Consumer event dropped, connection is closing");
        }
    }
}

impl ClientContext for EventContext {
    fn log(&self, level: RDKafkaLogLevel, fac: &str, log_message: &str) {
        forward_log(level, fac, log_message);
    }

    fn error(&self, error: KafkaError, reason: &str) {
        self.push(PollEvent::from_error(&error, reason));
    }
}

impl ConsumerContext for EventContext {
    fn commit_callback(&self, result: KafkaResult<()>, offsets: &TopicPartitionList) {
        self.push(PollEvent::OffsetsCommitted {
            offsets: committed_offsets(offsets),
            error: result.err(),
        });
    }
}

fn committed_offsets(offsets: &TopicPartitionList) -> Vec<CommittedOffset> {
    offsets
        .elements()
        .iter()
        .map(|elem| CommittedOffset {
            topic: elem.topic().to_string(),
            partition: elem.partition(),
            offset: elem.offset(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rdkafka::error::RDKafkaErrorCode;
    use rdkafka::Offset;
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn test_committed_offsets_follow_partition_list() {
        let mut list = TopicPartitionList::new();
        list.add_partition_offset("orders", 0, Offset::Offset(12))
            .unwrap();
        list.add_partition_offset("orders", 3, Offset::Offset(7))
            .unwrap();
        list.add_partition("audit", 1);

        assert_eq!(
            committed_offsets(&list),
            vec![
                CommittedOffset {
                    topic: "orders".to_string(),
                    partition: 0,
                    offset: Offset::Offset(12),
                },
                CommittedOffset {
                    topic: "orders".to_string(),
                    partition: 3,
                    offset: Offset::Offset(7),
                },
                CommittedOffset {
                    topic: "audit".to_string(),
                    partition: 1,
                    offset: Offset::Invalid,
                },
            ]
        );
    }

    #[test]
    fn test_commit_callback_queues_event() {
        let (tx, mut events) = mpsc::unbounded_channel();
        let context = EventContext { events: tx };
        let mut list = TopicPartitionList::new();
        list.add_partition_offset("orders", 0, Offset::Offset(5))
            .unwrap();

        let failure = KafkaError::ConsumerCommit(RDKafkaErrorCode::RebalanceInProgress);
        context.commit_callback(Err(failure.clone()), &list);

        match events.try_recv() {
            Ok(PollEvent::OffsetsCommitted { offsets, error }) => {
                assert_eq!(offsets.len(), 1);
                assert_eq!(offsets[0].offset, Offset::Offset(5));
                assert_eq!(error, Some(failure));
            }
            other => panic!("expected OffsetsCommitted, got {other:?}"),
        }
    }

    #[test]
    fn test_client_error_queues_event_with_code() {
        let (tx, mut events) = mpsc::unbounded_channel();
        let context = EventContext { events: tx };

        context.error(
            KafkaError::Global(RDKafkaErrorCode::AllBrokersDown),
            "3/3 brokers are down",
        );

        assert_eq!(
            events.try_recv().ok(),
            Some(PollEvent::Error {
                code: RDKafkaErrorCode::AllBrokersDown,
                reason: "3/3 brokers are down".to_string(),
            })
        );
    }
}
