//! Symptom Ensemble - Main Entry Point
//!
//! Loads the classifier registry, then answers prediction requests received
//! over NATS. Requests are processed in parallel, bounded by the configured
//! worker count.

use anyhow::{Context, Result};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use symptom_ensemble::{
    config::{AppConfig, LoggingConfig},
    consumer::RequestConsumer,
    handler::{Outcome, PredictionHandler},
    metrics::{MetricsReporter, ServiceMetrics},
    models::{EnsemblePredictor, ModelRegistry},
    producer::ReplyProducer,
    workers::WorkerPool,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("symptom_ensemble={}", logging.level).parse()?);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
    Ok(())
}

fn config_path() -> Option<String> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" {
            return args.next();
        }
        if let Some(path) = arg.strip_prefix("--config=") {
            return Some(path.to_string());
        }
    }
    None
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = match config_path() {
        Some(path) => AppConfig::load_from_path(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => AppConfig::load()?,
    };

    init_logging(&config.logging)?;
    info!("Starting Symptom Ensemble");

    // Registry must be complete and verified before any traffic is accepted
    let registry = Arc::new(
        ModelRegistry::load(&config.models).context("Model registry failed integrity checks")?,
    );
    let predictor = Arc::new(EnsemblePredictor::with_encoding(
        registry.clone(),
        &config.encoding,
    ));
    info!(
        classifiers = ?predictor.model_names(),
        features = registry.feature_schema().len(),
        labels = registry.label_schema().len(),
        "Ensemble predictor initialized with {} classifiers",
        predictor.model_count()
    );

    let handler = PredictionHandler::new(predictor, config.requests.lenient_age);
    let metrics = Arc::new(ServiceMetrics::new());

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(client.clone(), &config.nats.predict_subject)
        .with_queue_group(config.nats.queue_group.clone());
    let producer = ReplyProducer::new(client.clone());

    // Limits concurrent processing; each task holds a permit until it replies
    let workers = WorkerPool::new(config.pipeline.workers);
    info!(
        "Starting request loop with {} parallel workers on subject {}",
        workers.size(),
        consumer.subject()
    );

    let processed_count = Arc::new(AtomicU64::new(0));

    let reporter = MetricsReporter::new(metrics.clone(), config.metrics.report_interval_secs);
    tokio::spawn(reporter.start());

    let mut subscription = consumer.subscribe().await?;

    loop {
        let message = tokio::select! {
            message = subscription.next() => match message {
                Some(message) => message,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        };

        let Some(reply_subject) = message.reply.clone() else {
            warn!(subject = %message.subject, "Request has no reply subject, dropping");
            continue;
        };

        let permit = workers.acquire().await?;

        let handler = handler.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let request_id = Uuid::new_v4();
            let start_time = Instant::now();

            let outcome = handler.handle(&message.payload);
            let processing_time = start_time.elapsed();

            match &outcome {
                Outcome::Predicted(result) => {
                    metrics.record_prediction(processing_time, result);
                    debug!(
                        request_id = %request_id,
                        prediction = %result.prediction,
                        confidence = %result.confidence,
                        processing_time_us = processing_time.as_micros(),
                        "Prediction served"
                    );
                }
                Outcome::Failed(err) if err.is_client_error() => {
                    metrics.record_rejection(processing_time);
                    warn!(request_id = %request_id, error = %err, "Rejected malformed request");
                }
                Outcome::Failed(err) => {
                    metrics.record_failure(processing_time);
                    error!(request_id = %request_id, error = %err, "Prediction failed");
                }
            }

            match outcome.to_reply() {
                Ok(body) => {
                    if let Err(e) = producer.reply(reply_subject, body).await {
                        error!(request_id = %request_id, error = %e, "Failed to publish reply");
                    }
                }
                Err(e) => {
                    error!(request_id = %request_id, error = %e, "Failed to encode reply");
                }
            }

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 1000 == 0 {
                let stats = metrics.get_processing_stats();
                info!(
                    processed = count,
                    throughput = format!("{:.1} req/s", metrics.get_throughput()),
                    avg_latency_us = stats.mean_us,
                    "Processing milestone"
                );
            }

            drop(permit);
        });
    }

    info!(
        in_flight = workers.in_flight(),
        "Service shutting down, waiting for in-flight requests..."
    );
    drop(subscription);
    workers.drain().await?;

    if let Err(e) = client.flush().await {
        warn!(error = %e, "Failed to flush pending replies");
    }
    metrics.print_summary();

    Ok(())
}
