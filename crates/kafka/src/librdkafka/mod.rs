//! Connections backed by librdkafka.

mod consumer;
mod context;
mod producer;

pub use consumer::RdkafkaConsumer;
pub use producer::RdkafkaProducer;
