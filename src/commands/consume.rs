use anyhow::Context;
use kafka_nest::{render_payload, ConsumeArgs};
use kafka_nest_engine::{ConnectionConfig, ConsumerEngine};
use tracing::{error, info};

/// Consume until Ctrl+C or a fatal broker error.
pub async fn run(args: ConsumeArgs) -> anyhow::Result<()> {
    let config = ConnectionConfig::from(&args.broker);
    let policy = args.offset_store_policy();
    let shutdown = setup_shutdown_handler();

    info!(
        "Consuming {:?} as group '{}' (session timeout {:?})",
        args.topics, args.group_id, args.session_timeout
    );

    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let consumer = ConsumerEngine::open(config, &args.group_id, args.session_timeout)
            .context("Failed to create consumer")?
            .with_poll_timeout(args.poll_timeout)
            .with_offset_store_policy(policy);

        let raw = args.raw;
        consumer
            .consume(&args.topics, shutdown, |message| {
                let text = render_payload(message, raw)?;
                info!(
                    "{} [{}] @ {}: {text}",
                    message.topic, message.partition, message.offset
                );
                Ok(())
            })
            .context("Consumer stopped")
    })
    .await
    .context("Consumer task panicked")??;

    info!("Consumer finished");
    Ok(())
}

/// Sets up a shutdown signal handler
///
/// If the handler cannot be installed the sender is dropped, which the
/// consumer also treats as a stop request.
fn setup_shutdown_handler() -> tokio::sync::broadcast::Receiver<()> {
    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received interrupt signal (Ctrl+C)");
                let _ = shutdown_tx.send(());
            }
            Err(e) => error!("Failed to install Ctrl+C handler: {e}"),
        }
    });

    shutdown_rx
}
