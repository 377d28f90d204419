use anyhow::Context;
use kafka_nest::{build_messages, ProduceArgs};
use kafka_nest_engine::{ConnectionConfig, DeliveryOutcome, ProducerEngine};

/// Publish the requested messages and close the producer.
pub async fn run(args: ProduceArgs) -> anyhow::Result<()> {
    let config = ConnectionConfig::from(&args.broker);
    let messages = build_messages(&args.topic, args.count, &args.values);
    let total = messages.len();
    let timeout = args.timeout;

    tracing::info!("Publishing {total} messages to '{}'", args.topic);

    let outcomes = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<DeliveryOutcome>> {
        let mut producer =
            ProducerEngine::open(config, timeout).context("Failed to create producer")?;
        let outcomes = producer.produce_batch(messages);
        producer.close().context("Failed to close producer")?;
        Ok(outcomes)
    })
    .await
    .context("Producer task panicked")??;

    let delivered = outcomes.iter().filter(|o| o.is_delivered()).count();
    tracing::info!(
        "Delivered {delivered} of {total} messages to '{}'",
        args.topic
    );
    if delivered < total {
        tracing::warn!("{} messages were not delivered", total - delivered);
    }

    Ok(())
}
