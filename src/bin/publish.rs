//! Article publisher: validates a JSON file of jobs and pushes each one onto
//! the work channel.
//!
//! ```text
//! article-publisher --file data/articles.json
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;

use article_pipeline::queue::{JobQueue, RedisQueue};
use article_pipeline::{telemetry, Job, Settings};

#[derive(Debug, Parser)]
#[command(name = "article-publisher", about = "Publish article jobs to the work queue")]
struct Args {
    /// JSON file of the form {"articles": [...]}
    #[arg(long, short, env = "ARTICLES_FILE", default_value = "data/articles.json")]
    file: PathBuf,

    /// Override the work channel name from the settings.
    #[arg(long)]
    queue: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticlesFile {
    articles: Vec<Job>,
}

fn load_articles(path: &Path) -> Result<Vec<Job>> {
    tracing::info!(file_path = %path.display(), "loading_articles");
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("articles file not found or unreadable: {}", path.display()))?;
    let parsed: ArticlesFile = serde_json::from_str(&content)
        .with_context(|| format!("parsing {}", path.display()))?;
    for (i, job) in parsed.articles.iter().enumerate() {
        job.validate()
            .with_context(|| format!("article #{i} ({}) is invalid", job.id))?;
    }
    tracing::info!(count = parsed.articles.len(), "articles_loaded");
    Ok(parsed.articles)
}

async fn publish(queue: &dyn JobQueue, jobs: &[Job]) -> Result<usize> {
    let mut published = 0usize;
    for job in jobs {
        let payload = serde_json::to_string(job)?;
        queue
            .push(&payload)
            .await
            .with_context(|| format!("pushing job {}", job.id))?;
        tracing::info!(
            job_id = %job.id,
            url = %job.url,
            priority = job.priority.as_str(),
            queue = queue.name(),
            "task_published"
        );
        published += 1;
    }
    Ok(published)
}

async fn run(args: Args, settings: Settings) -> Result<()> {
    let jobs = load_articles(&args.file)?;
    let queue_name = args.queue.unwrap_or_else(|| settings.queue_name.clone());
    let queue = RedisQueue::connect(&settings.redis_url, &queue_name)
        .await
        .with_context(|| format!("connecting to redis at {}", settings.redis_url_redacted()))?;
    let published = publish(&queue, &jobs).await?;
    tracing::info!(total_articles = jobs.len(), published, "publisher_complete");
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    let settings = match Settings::load() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("publisher_config_error: {e:#}");
            return ExitCode::FAILURE;
        }
    };
    telemetry::init(&settings.log_level, settings.log_format);
    tracing::info!("publisher_starting");

    match run(args, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = format!("{e:#}"), "publisher_failed");
            ExitCode::FAILURE
        }
    }
}
