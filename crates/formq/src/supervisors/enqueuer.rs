//! 🚦 Bounded concurrent enqueuer — a bouncer with a clipboard and a stopwatch.
//!
//! 🎬 *[a line of work items, sorted, waiting outside the queue]*
//! 🎬 *[the bouncer lets in ten at a time. in the order of the list. no exceptions.]*
//!
//! 🧠 Knowledge graph:
//! - Items are sequenced first (`sequencer::order`), so dispatch order is the same every run
//! - Permits are acquired in the dispatch loop, in sequence order, BEFORE the task is spawned
//! - A task holds its permit across every retry and every backoff sleep
//! - Attempt `n` failing waits `base * 2^(n-1)`, up to `max_retries` attempts in total
//! - Each task returns its own verdict; the tally is counted from the joined results.
//!   A task that panicked counts as a failure.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::app_config::RuntimeConfig;
use crate::backends::WorkQueue;
use crate::common::WorkItem;
use crate::sequencer;

/// 🎛️ The three enqueue knobs, already validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct EnqueueSettings {
    pub(crate) max_concurrency: usize,
    pub(crate) max_retries: u32,
    pub(crate) base_delay: Duration,
}

impl EnqueueSettings {
    /// 🔒 Values below 1 become 1. A negative or unrepresentable delay becomes zero.
    pub(crate) fn new(max_concurrency: usize, max_retries: u32, base_delay: Duration) -> Self {
        if max_concurrency < 1 {
            warn!(max_concurrency, "🚦 max_concurrency below 1, using 1");
        }
        if max_retries < 1 {
            warn!(max_retries, "🔄 max_retries below 1, using 1");
        }
        Self {
            max_concurrency: max_concurrency.max(1),
            max_retries: max_retries.max(1),
            base_delay,
        }
    }

    pub(crate) fn from_runtime(runtime: &RuntimeConfig) -> Self {
        let base_delay = Duration::try_from_secs_f64(runtime.retry_base_delay_secs)
            .unwrap_or_else(|_| {
                warn!(
                    retry_base_delay_secs = runtime.retry_base_delay_secs,
                    "⏱️ retry_base_delay_secs is not a usable duration, retrying without delay"
                );
                Duration::ZERO
            });
        Self::new(runtime.max_concurrency, runtime.max_retries, base_delay)
    }

    /// ⏱️ The wait after failed attempt `attempt` (1-based).
    pub(crate) fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32
            .checked_pow(attempt.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// 📊 How the batch went.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnqueueSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl EnqueueSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

#[derive(Serialize)]
struct QueuePayload<'a> {
    item: &'a WorkItem,
}

/// 🚦 `enqueue_all(queue, items, settings)`: insert every item, never give up on the batch.
pub(crate) async fn enqueue_all<Q>(
    queue: Arc<Q>,
    items: Vec<WorkItem>,
    settings: EnqueueSettings,
) -> EnqueueSummary
where
    Q: WorkQueue + ?Sized + 'static,
{
    if items.is_empty() {
        info!("📭 No new items to add.");
        return EnqueueSummary::default();
    }

    let ordered = sequencer::order(items);
    info!(
        count = ordered.len(),
        max_concurrency = settings.max_concurrency,
        max_retries = settings.max_retries,
        "🔢 Processing items sorted by complete JSON structure"
    );

    let gate = Arc::new(Semaphore::new(settings.max_concurrency));
    let mut tasks = Vec::with_capacity(ordered.len());
    let mut undispatched = 0usize;

    for item in ordered {
        let permit = match Arc::clone(&gate).acquire_owned().await {
            Ok(permit) => permit,
            Err(closed) => {
                error!(reference = %item.reference, error = %closed, "💀 admission gate closed");
                undispatched += 1;
                continue;
            }
        };
        let queue = Arc::clone(&queue);
        tasks.push(tokio::spawn(async move {
            let _permit = permit;
            add_with_retry(queue.as_ref(), &item, settings).await
        }));
    }

    let mut summary = EnqueueSummary {
        succeeded: 0,
        failed: undispatched,
    };
    for result in join_all(tasks).await {
        match result {
            Ok(true) => summary.succeeded += 1,
            Ok(false) => summary.failed += 1,
            Err(join_error) => {
                error!(error = %join_error, "💀 enqueue task died before reporting back");
                summary.failed += 1;
            }
        }
    }

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        total = summary.total(),
        "📊 Summary: {} succeeded, {} failed out of {}",
        summary.succeeded,
        summary.failed,
        summary.total()
    );
    summary
}

async fn add_with_retry<Q>(queue: &Q, item: &WorkItem, settings: EnqueueSettings) -> bool
where
    Q: WorkQueue + ?Sized,
{
    let reference = item.reference.as_str();
    let payload = match serde_json::to_value(QueuePayload { item }) {
        Ok(payload) => payload,
        Err(err) => {
            error!(reference, error = %err, "💀 work item could not be serialized");
            return false;
        }
    };

    let max_retries = settings.max_retries;
    for attempt in 1..=max_retries {
        match queue.add_item(reference, &payload).await {
            Ok(()) => {
                info!(reference, attempt, "✅ Added item to queue");
                return true;
            }
            Err(err) if attempt >= max_retries => {
                error!(
                    reference,
                    attempt,
                    error = %err,
                    "💀 Failed to add item after {attempt} attempt(s)"
                );
                return false;
            }
            Err(err) => {
                let backoff = settings.backoff(attempt);
                warn!(
                    reference,
                    attempt,
                    max_retries,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "🔄 Error adding item, retrying after backoff"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }
    false
}
