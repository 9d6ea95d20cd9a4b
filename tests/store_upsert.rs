// tests/store_upsert.rs
mod common;

use article_pipeline::model::ArticleStatus;
use article_pipeline::JobOutcome;

use common::*;

const ARTICLE: &str = r#"<html><head><title>Second time lucky</title><meta name="author" content="R. Ng"></head></html>"#;

#[tokio::test(start_paused = true)]
async fn failed_record_is_fully_replaced_by_later_success() {
    // First delivery: one attempt, fails.
    let first = harness(ScriptedFetcher::always_failing(), 1);
    let job = job("a1", "http://x.test");
    let outcome = first.processor.process(&job, &payload(&job)).await.unwrap();
    assert!(matches!(outcome, JobOutcome::Exhausted { .. }));
    let failed = first.store.get("a1").unwrap();
    assert_eq!(failed.status, ArticleStatus::Failed);
    assert!(failed.error_message.is_some());

    // Republished later: same store, fetch now works.
    let second = harness(ScriptedFetcher::new(vec![page(ARTICLE)]), 1);
    let store = first.store.clone();
    let processor = article_pipeline::JobProcessor::new(
        second.fetcher.clone(),
        store.clone(),
        second.notifier.clone(),
        article_pipeline::DeadLetterRouter::new(second.dlq.clone()),
        article_pipeline::RetryPolicy::new(1, BACKOFF_BASE),
    );
    processor.process(&job, &payload(&job)).await.unwrap();

    assert_eq!(store.len(), 1);
    let rec = store.get("a1").unwrap();
    assert_eq!(rec.status, ArticleStatus::Success);
    assert_eq!(rec.attempts, 1);
    assert_eq!(rec.error_message, None);
    assert_eq!(rec.title.as_deref(), Some("Second time lucky"));
    assert_eq!(rec.author.as_deref(), Some("R. Ng"));
    assert_eq!(rec.http_status, Some(200));
}

#[tokio::test(start_paused = true)]
async fn success_replaced_by_failure_drops_extraction_fields() {
    let h = harness(ScriptedFetcher::new(vec![page(ARTICLE)]), 1);
    let job = job("a2", "http://x.test/2");
    h.processor.process(&job, &payload(&job)).await.unwrap();
    assert_eq!(h.store.get("a2").unwrap().status, ArticleStatus::Success);

    // Script exhausted: the next run fails.
    h.processor.process(&job, &payload(&job)).await.unwrap();

    let rec = h.store.get("a2").unwrap();
    assert_eq!(rec.status, ArticleStatus::Failed);
    assert_eq!(rec.title, None);
    assert_eq!(rec.author, None);
    assert_eq!(rec.http_status, None);
    assert_eq!(rec.fetched_at, None);
    assert_eq!(h.store.len(), 1);
}
