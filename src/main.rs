//! Article consumer binary.
//! Connects to the work channel and the article store, then processes jobs
//! until SIGINT/SIGTERM.

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use article_pipeline::fetch::HttpFetcher;
use article_pipeline::metrics::Metrics;
use article_pipeline::notify::{DisabledNotifier, DiscordNotifier, Notifier};
use article_pipeline::queue::{JobQueue, RedisQueue};
use article_pipeline::store::PgArticleStore;
use article_pipeline::{telemetry, Consumer, DeadLetterRouter, JobProcessor, RetryPolicy, Settings};

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("consumer_config_error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    telemetry::init(&settings.log_level, settings.log_format);

    match run(settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "consumer_fatal_error");
            ExitCode::FAILURE
        }
    }
}

async fn run(settings: Settings) -> Result<()> {
    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let metrics = Metrics::init()?;
    let metrics_task = settings.metrics_addr.map(|addr| {
        let token = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = metrics.serve(addr, token).await {
                tracing::error!(error = format!("{e:#}"), "metrics_endpoint_failed");
            }
        })
    });

    // Connection failures here are the only fatal ones.
    let work = RedisQueue::connect(&settings.redis_url, &settings.queue_name)
        .await
        .with_context(|| format!("connecting to redis at {}", settings.redis_url_redacted()))?;
    let failed = RedisQueue::from_connection(work.connection(), &settings.dlq_name);
    tracing::info!(redis = %settings.redis_url_redacted(), "redis_connected");

    let store = PgArticleStore::connect(&settings.database_url)
        .await
        .with_context(|| {
            format!("connecting to postgres at {}", settings.database_url_redacted())
        })?;
    store
        .ensure_schema()
        .await
        .context("ensuring article store schema")?;

    let notifier: Arc<dyn Notifier> = match &settings.discord_webhook_url {
        Some(url) => Arc::new(DiscordNotifier::new(url.clone()).with_timeout(settings.notify_timeout)),
        None => {
            tracing::warn!("DISCORD_WEBHOOK_URL not set; notifications disabled");
            Arc::new(DisabledNotifier)
        }
    };

    let fetcher =
        HttpFetcher::new(settings.fetch_timeout)?.with_max_body_bytes(settings.max_body_bytes);
    let failed: Arc<dyn JobQueue> = Arc::new(failed);
    let processor = JobProcessor::new(
        Arc::new(fetcher),
        Arc::new(store.clone()),
        notifier,
        DeadLetterRouter::new(failed),
        RetryPolicy::new(settings.max_retries, settings.retry_backoff_base),
    );
    let consumer = Consumer::new(
        Arc::new(work),
        processor,
        settings.poll_timeout,
        settings.error_pause,
    );

    consumer.run(shutdown.clone()).await;

    // Release connections; the redis manager closes when dropped.
    drop(consumer);
    store.close().await;
    shutdown.cancel();
    if let Some(task) = metrics_task {
        let _ = task.await;
    }
    tracing::info!("consumer_stopped");
    Ok(())
}

fn spawn_signal_handler(token: CancellationToken) {
    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        tracing::info!(signal, "shutdown_signal_received");
        token.cancel();
    });
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable; listening for Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };
    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = term.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "SIGINT"
}
