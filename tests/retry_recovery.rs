// tests/retry_recovery.rs
mod common;

use std::sync::Arc;
use std::time::Duration;

use article_pipeline::error::ProcessError;
use article_pipeline::model::{ArticleRecord, ArticleStatus};
use article_pipeline::queue::MemoryQueue;
use article_pipeline::store::ArticleStore;
use article_pipeline::{DeadLetterRouter, JobOutcome, JobProcessor, RetryPolicy};
use tokio::time::Instant;

use common::*;

const ARTICLE: &str = r#"<html><head><meta property="og:title" content="Recovered"></head><body><h1>Ignored</h1></body></html>"#;

#[tokio::test(start_paused = true)]
async fn success_on_second_attempt() {
    let fetcher = ScriptedFetcher::new(vec![transient("timed out"), page(ARTICLE)]);
    let h = harness(fetcher, 3);
    let job = job("b1", "https://news.test/b1");

    let started = Instant::now();
    let outcome = h.processor.process(&job, &payload(&job)).await.unwrap();

    assert_eq!(outcome, JobOutcome::Success { attempts: 2 });
    assert_eq!(h.fetcher.call_count(), 2);
    let waited = started.elapsed();
    assert!(waited >= Duration::from_secs(1) && waited < Duration::from_secs(2));

    let rec = h.store.get("b1").unwrap();
    assert_eq!(rec.status, ArticleStatus::Success);
    assert_eq!(rec.attempts, 2);
    assert_eq!(rec.title.as_deref(), Some("Recovered"));
    assert_eq!(rec.http_status, Some(200));
    assert!(rec.fetched_at.is_some());
    assert!(rec.error_message.is_none());

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].success);
    assert_eq!(sent[0].field("Title"), Some("Recovered"));
    assert_eq!(sent[0].field("HTTP Status"), Some("200"));

    assert!(h.dlq.is_empty());
}

#[tokio::test(start_paused = true)]
async fn success_on_final_attempt_records_max_attempts() {
    let fetcher = ScriptedFetcher::new(vec![
        transient("connection reset"),
        transient("connection reset"),
        page(ARTICLE),
    ]);
    let h = harness(fetcher, 3);
    let job = job("b6", "https://news.test/b6");

    let outcome = h.processor.process(&job, &payload(&job)).await.unwrap();

    // Attempts counts what was made; success on the last one is still success.
    assert_eq!(outcome, JobOutcome::Success { attempts: 3 });

    let calls = h.fetcher.calls();
    assert_eq!(calls.len(), 3);
    let gaps = [calls[1] - calls[0], calls[2] - calls[1]];
    for (gap, expected) in gaps.into_iter().zip([1, 2].map(Duration::from_secs)) {
        assert!(gap >= expected && gap < expected + Duration::from_millis(1), "{gap:?}");
    }

    let rec = h.store.get("b6").unwrap();
    assert_eq!(rec.status, ArticleStatus::Success);
    assert_eq!(rec.attempts, 3);
    assert!(rec.error_message.is_none());

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].success);
    assert!(h.dlq.is_empty());
}

#[tokio::test(start_paused = true)]
async fn response_charset_reaches_the_stored_title() {
    let body = b"<html><head><title>R\xE9sum\xE9 des march\xE9s</title></head></html>";
    let h = harness(ScriptedFetcher::new(vec![encoded_page(body, "iso-8859-1")]), 3);
    let job = job("b7", "https://news.test/b7");

    h.processor.process(&job, &payload(&job)).await.unwrap();

    let rec = h.store.get("b7").unwrap();
    assert_eq!(rec.title.as_deref(), Some("R\u{e9}sum\u{e9} des march\u{e9}s"));
    assert_eq!(h.notifier.sent()[0].field("Title"), rec.title.as_deref());
}

#[tokio::test(start_paused = true)]
async fn first_attempt_success_never_sleeps() {
    let h = harness(ScriptedFetcher::new(vec![page(ARTICLE)]), 3);
    let job = job("b2", "https://news.test/b2");

    let started = Instant::now();
    let outcome = h.processor.process(&job, &payload(&job)).await.unwrap();

    assert_eq!(outcome.attempts(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn notifier_failure_does_not_change_outcome() {
    let h = harness_with(
        ScriptedFetcher::new(vec![page(ARTICLE)]),
        RecordingNotifier::failing(),
        3,
    );
    let job = job("b3", "https://news.test/b3");

    let outcome = h.processor.process(&job, &payload(&job)).await.unwrap();

    assert_eq!(outcome, JobOutcome::Success { attempts: 1 });
    assert_eq!(h.notifier.sent().len(), 1);
    assert_eq!(h.fetcher.call_count(), 1);
    assert_eq!(h.store.get("b3").unwrap().status, ArticleStatus::Success);
}

#[tokio::test(start_paused = true)]
async fn url_conflict_is_logged_and_processing_continues() {
    let h = harness(ScriptedFetcher::new(vec![page(ARTICLE)]), 3);
    let owner = job("other", "https://news.test/shared");
    h.store
        .upsert(&ArticleRecord::failed(&owner, 1, "x"))
        .await
        .unwrap();

    let job = job("b4", "https://news.test/shared");
    let outcome = h.processor.process(&job, &payload(&job)).await.unwrap();

    assert_eq!(outcome, JobOutcome::Success { attempts: 1 });
    assert!(h.store.get("b4").is_none());
    assert_eq!(h.store.get("other").unwrap().id, "other");
    assert_eq!(h.notifier.sent().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn store_backend_failure_aborts_the_job() {
    let store = Arc::new(FailingStore::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let dlq = Arc::new(MemoryQueue::new("dlq"));
    let processor = JobProcessor::new(
        Arc::new(ScriptedFetcher::new(vec![page(ARTICLE)])),
        store.clone(),
        notifier.clone(),
        DeadLetterRouter::new(dlq.clone()),
        RetryPolicy::new(3, BACKOFF_BASE),
    );
    let job = job("b5", "https://news.test/b5");

    let err = processor.process(&job, &payload(&job)).await.unwrap_err();

    assert!(matches!(err, ProcessError::Store(_)));
    assert_eq!(store.attempts.lock().unwrap().len(), 1);
    assert!(notifier.sent().is_empty());
    assert!(dlq.is_empty());
}
