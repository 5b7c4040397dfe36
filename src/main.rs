use std::sync::Arc;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_lifecycle::config::LifecycleConfig;
use order_lifecycle::domain::order::{
    order_engine, ChannelNotifier, LifecycleContext, OrderAggregate, OrderEvent, OrderLifecycleService,
    ScriptedServices, ServiceCall,
};
use order_lifecycle::metrics::Metrics;
use order_lifecycle::state_machine::store::InMemoryRepository;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();
    let config = LifecycleConfig::from_env()?;

    // Initialize structured logging with environment-based filtering
    // RUST_LOG wins over ORDER_LIFECYCLE_LOG_FILTER
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_filter))
        )
        .init();

    tracing::info!("🚀 Starting order lifecycle demo");
    tracing::debug!(?config, "Loaded configuration");

    // === 1. Initialize Prometheus metrics ===
    let metrics = if config.metrics_enabled {
        let metrics = Arc::new(Metrics::new()?);
        tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());
        Some(metrics)
    } else {
        None
    };

    // === 2. Notification outbox drained by a background task ===
    let (notifier, mut outbox) = ChannelNotifier::new(config.notification_capacity);
    let notifier = match &metrics {
        Some(metrics) => notifier.with_metrics(metrics.clone()),
        None => notifier,
    };
    let drain = tokio::spawn(async move {
        while let Some(notification) = outbox.recv().await {
            tracing::info!(
                order_id = %notification.order_id,
                recipient = %notification.recipient,
                state = %notification.context.state,
                "📣 {}",
                notification.context.message
            );
        }
    });

    // === 3. Wire the lifecycle service ===
    let services = Arc::new(ScriptedServices::succeeding());
    let context = LifecycleContext::new(services.clone(), Arc::new(notifier));
    let engine = match &metrics {
        Some(metrics) => order_engine().with_metrics(metrics.clone()),
        None => order_engine(),
    };
    let repository = Arc::new(InMemoryRepository::<OrderAggregate>::new("Order"));
    let service = OrderLifecycleService::new(repository, Arc::new(engine), context);

    // === 4. Walk an order through its lifecycle ===
    tracing::info!("📝 Demonstrating order lifecycle");

    let order_id = service.create_order("PO-1001", 12_999).await?;
    service.attach_shipping_address(order_id, "55401").await?;
    let shipment_id = service.add_shipment(order_id).await?;
    service.attach_payment_method(order_id).await?;

    while service.advance(order_id).await?.is_transitioned() {}
    tracing::info!("✅ Order placed: {} ({})", order_id, service.state(order_id).await?);

    service.mark_shipment_shipped(order_id, shipment_id).await?;

    // Settlement fails once, then the recharge succeeds
    services.set_outcome(ServiceCall::SettleCharge, false);
    while service.advance(order_id).await?.is_transitioned() {}
    tracing::warn!("⚠️ Settlement failed for {}", order_id);

    let outcome = service.fire(order_id, OrderEvent::EditPaymentMethod).await?;
    tracing::info!("✅ Order {} recharged: {}", order_id, outcome.state());

    let order = service.load(order_id).await?;
    for record in order.history() {
        tracing::info!(event = %record.event, "{} → {}", record.from, record.to);
    }

    // Closing the service drops the last sender and ends the drain task
    drop(service);
    drain.await?;

    if let Some(metrics) = metrics {
        tracing::info!("📊 Final metrics:\n{}", metrics.render()?);
    }

    tracing::info!("🎉 Demo complete!");

    Ok(())
}
