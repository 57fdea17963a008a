use anyhow::Context;
use clap::Parser;
use chrono::Utc;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use duna_orders::analysis::{mime_type_for, RecordedAnalyzer};
use duna_orders::cli::Cli;
use duna_orders::config::AppConfig;
use duna_orders::domain::order::{OrderServices, OrderSessionHandler};
use duna_orders::messaging::UploadNotifier;
use duna_orders::metrics::Metrics;
use duna_orders::persistence::{InMemoryClientDirectory, InMemoryOrderRepository};
use duna_orders::sheet::OrderSheet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default to INFO, debug for this crate; RUST_LOG overrides
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,duna_orders=debug"))
        )
        .init();

    let cli = Cli::parse();
    let photo = cli.photo.as_path();
    let client = cli.client();

    tracing::info!("🚀 Starting Duna order entry");

    // === 1. Configuration & metrics ===
    let config = AppConfig::from_env().context("Invalid configuration")?;
    tracing::debug!(?config, "Configuration loaded");

    let metrics = Arc::new(Metrics::new()?);
    tracing::info!("📊 Metrics registry created with {} metrics", metrics.registry().gather().len());

    // === 2. Storage and upload listener ===
    let repository = Arc::new(InMemoryOrderRepository::new());
    let uploads = UploadNotifier::new(config.upload.root_folder.clone(), metrics.clone())
        .spawn(repository.subscribe());

    let services = Arc::new(OrderServices {
        analyzer: Arc::new(RecordedAnalyzer::from_path(&cli.analysis)?),
        directory: Arc::new(InMemoryClientDirectory::with_clients([client.clone()])),
        repository: repository.clone(),
        metrics: metrics.clone(),
        retry: config.analysis.retry_config(),
    });

    // === 3. Order session ===
    let session = OrderSessionHandler::start(services, Some(client.id.clone()));

    let image = std::fs::read(photo)
        .with_context(|| format!("Failed to read photo {}", photo.display()))?;
    let items = session.add_photo(&image, mime_type_for(photo)).await?;
    tracing::info!(items = items.len(), "📷 Photo processed");

    if let Some(notes) = &cli.notes {
        session.set_notes(notes).await?;
    }

    session.request_signature().await?;
    session.sign(&cli.signature).await?;
    let order = session.finalize(cli.worker()).await?;

    println!("{}", OrderSheet::build(&order).render_text());

    let recent = repository
        .recent_orders(Utc::now(), config.history.recent_months, None)
        .await;
    tracing::info!(
        months = config.history.recent_months,
        orders = recent.len(),
        "Recent order history"
    );

    // === 4. Drain uploads ===
    // Dropping the last repository handle closes the notification channel
    drop(session);
    drop(repository);
    for plan in uploads.await? {
        println!("Upload: {}", plan.path());
    }

    println!("{}", metrics.render()?);

    tracing::info!("🎉 Done");
    Ok(())
}
