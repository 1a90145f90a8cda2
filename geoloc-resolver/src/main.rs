//! geoloc-resolver - Location Resolution Service
//!
//! Consumes batches of free-text entries from Kafka, extracts and geocodes the
//! location each one mentions, and publishes the resolved records.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use geoloc_common::config::{load_module_config, user_agent, ConfigFileLocator};
use geoloc_common::logging::{init_tracing, STARTUP_DIRECTIVE};
use tokio::signal;
use tracing::info;

use geoloc_resolver::config::{CliArgs, ResolverConfig, ResolverToml, MODULE_NAME};
use geoloc_resolver::extractors::{AddressPatternMatcher, NerClient};
use geoloc_resolver::geocoding::GoogleGeocoder;
use geoloc_resolver::transport::kafka::{KafkaBatchConsumer, KafkaPublisher};
use geoloc_resolver::{BatchDriver, ResolutionPipeline, TracingReporter};

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Step 1: Logging (RUST_LOG or startup level until the config is read)
    let log_filter = init_tracing(STARTUP_DIRECTIVE).context("Failed to initialize logging")?;

    // Step 2: Configuration (CLI → ENV → TOML → defaults)
    let locator = ConfigFileLocator::new(MODULE_NAME);
    let file: ResolverToml = load_module_config(&locator, args.config.as_deref())
        .context("Failed to load configuration file")?;
    let config = ResolverConfig::resolve(&args, file).context("Invalid configuration")?;
    log_filter
        .apply(&config.logging.level)
        .context("Invalid logging level")?;

    info!("Starting {} v{}", MODULE_NAME, env!("CARGO_PKG_VERSION"));
    info!(
        brokers = %config.kafka.brokers,
        input = %config.kafka.input_topic,
        output = %config.kafka.output_topic,
        workers = config.pipeline.workers,
        "Configuration resolved"
    );

    // Step 3: External clients
    let agent = user_agent(MODULE_NAME);
    let ner = NerClient::new(
        config.ner.endpoint.clone(),
        config.ner.api_key.clone(),
        config.pipeline.call_timeout,
        &agent,
    )?;
    let geocoder = GoogleGeocoder::new(
        config.geocoder.api_key.clone(),
        config.pipeline.call_timeout,
        &agent,
    )?
    .with_base_url(config.geocoder.base_url.clone())
    .with_rate_limit(config.geocoder.requests_per_second);

    let pipeline = ResolutionPipeline::new(
        Arc::new(AddressPatternMatcher::new()),
        Arc::new(ner),
        Arc::new(geocoder),
        config.pipeline.clone(),
    );

    // Step 4: Transport
    let publisher = KafkaPublisher::new(&config.kafka).context("Failed to create Kafka producer")?;
    let consumer =
        KafkaBatchConsumer::new(&config.kafka).context("Failed to create Kafka consumer")?;

    let driver = BatchDriver::new(
        Arc::new(pipeline),
        Arc::new(publisher),
        Arc::new(TracingReporter),
        config.kafka.output_topic.clone(),
    );

    consumer
        .run(&driver, shutdown_signal())
        .await
        .context("Consumer loop terminated")?;

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
