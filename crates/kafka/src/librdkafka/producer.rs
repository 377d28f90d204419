use std::time::Duration;

use rdkafka::error::KafkaResult;
use rdkafka::message::{Header as RdkafkaHeader, OwnedHeaders};
use rdkafka::producer::{BaseRecord, Producer, ThreadedProducer};
use rdkafka::ClientConfig;
use tracing::debug;

use super::context::{DeliveryContext, PendingDelivery};
use crate::connection::{DeliverySender, ProducerConnection};
use crate::message::OutboundMessage;

/// Producer connection; delivery reports are served by rdkafka's background
/// polling thread.
pub struct RdkafkaProducer {
    inner: ThreadedProducer<DeliveryContext>,
}

impl RdkafkaProducer {
    pub fn connect(config: &ClientConfig) -> KafkaResult<Self> {
        let inner = config.create_with_context(DeliveryContext)?;
        Ok(Self { inner })
    }
}

impl ProducerConnection for RdkafkaProducer {
    fn send(&mut self, message: OutboundMessage, ack: DeliverySender) -> KafkaResult<()> {
        let pending = Box::new(PendingDelivery {
            message: message.clone(),
            ack,
        });

        let mut record: BaseRecord<'_, [u8], [u8], Box<PendingDelivery>> =
            BaseRecord::with_opaque_to(&message.topic, pending);
        if let Some(partition) = message.partition {
            record = record.partition(partition);
        }
        if let Some(key) = &message.key {
            record = record.key(key.as_slice());
        }
        if let Some(payload) = &message.payload {
            record = record.payload(payload.as_slice());
        }
        if !message.headers.is_empty() {
            let headers = message
                .headers
                .iter()
                .fold(OwnedHeaders::new(), |headers, header| {
                    headers.insert(RdkafkaHeader {
                        key: &header.key,
                        value: header.value.as_deref(),
                    })
                });
            record = record.headers(headers);
        }

        self.inner.send(record).map_err(|(error, _)| error)
    }

    fn flush(&mut self, timeout: Duration) -> usize {
        if let Err(e) = self.inner.flush(timeout) {
            debug!("Flush did not complete: {e}");
        }
        self.inner.in_flight_count().max(0) as usize
    }

    fn close(self) -> KafkaResult<()> {
        drop(self.inner);
        Ok(())
    }
}
