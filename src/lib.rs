// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod config;
pub mod consumer;
pub mod dead_letter;
pub mod decode;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod metrics;
pub mod model;
pub mod notify;
pub mod queue;
pub mod retry;
pub mod store;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::config::Settings;
pub use crate::consumer::Consumer;
pub use crate::dead_letter::DeadLetterRouter;
pub use crate::model::{ArticleRecord, ArticleStatus, ExtractionResult, Job, Priority};
pub use crate::retry::{JobOutcome, JobProcessor, RetryPolicy};
