//! # Previously, on formq...
//!
//! 🎬 The queue was remote. The document library was remote. The test suite was not
//! allowed on the network. Someone had to stand in for all of them, live entirely in RAM,
//! and be gone the moment you blink.
//!
//! That someone was this module.
//!
//! - [`InMemorySource`] hands out whatever rows it was built with.
//! - [`InMemoryQueue`] keeps every added item behind an `Arc<Mutex<...>>` so tests can peek
//!   after handing a clone to the pipeline. It can also be told to fail, on purpose, so the
//!   retry path has something to chew on. Every attempt is timestamped with tokio's clock,
//!   which means paused-time tests can assert exact backoff gaps.
//! - [`InMemoryStore`] is a document library shaped like a `BTreeMap`.
//!
//! 🦆
//!
//! ⚠️ Config can select these for dry runs. Nothing survives the process, which is the point.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::backends::{DocumentStore, SubmissionSource, WorkQueue, decode_rows};
use crate::common::RawSubmission;
use crate::errors::PipelineError;
use crate::exporter::ExportTable;

// ===== Source =====

/// 📦 A source that already knows every row it will ever return.
#[derive(Debug, Default)]
pub(crate) struct InMemorySource {
    rows: Vec<Value>,
}

impl InMemorySource {
    #[cfg(test)]
    pub(crate) fn new(rows: Vec<Value>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl SubmissionSource for InMemorySource {
    async fn fetch_all(&mut self, form_type_id: &str) -> Result<Vec<RawSubmission>> {
        Ok(decode_rows(self.rows.clone(), form_type_id))
    }
}

// ===== Queue =====

#[derive(Debug, Default)]
struct QueueState {
    items: Vec<(String, Value)>,
    attempts: Vec<(String, Instant)>,
    preloaded: HashSet<String>,
    failures_left: HashMap<String, usize>,
    always_fail: bool,
    listing_fails: bool,
    latency: Option<Duration>,
    in_flight: usize,
    peak_in_flight: usize,
}

/// 📬 A work queue that is a `Vec` wearing a trench coat.
///
/// Clone-able because tests need to peek inside after handing a clone off to the pipeline.
/// The `Arc` means every clone shares the same state.
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemoryQueue {
    state: Arc<Mutex<QueueState>>,
}

#[cfg(test)]
impl InMemoryQueue {
    /// 📋 Every successfully added `(reference, payload)`, in completion order.
    pub(crate) async fn items(&self) -> Vec<(String, Value)> {
        self.state.lock().await.items.clone()
    }

    /// 📌 A queue that already holds these references.
    pub(crate) async fn with_references<I, S>(self, references: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .lock()
            .await
            .preloaded
            .extend(references.into_iter().map(Into::into));
        self
    }

    /// 💥 The first `times` inserts of `reference` fail with a transport error.
    pub(crate) async fn failing_first(self, reference: &str, times: usize) -> Self {
        self.state
            .lock()
            .await
            .failures_left
            .insert(reference.to_string(), times);
        self
    }

    /// 💥 Every insert fails. Forever.
    pub(crate) async fn always_failing(self) -> Self {
        self.state.lock().await.always_fail = true;
        self
    }

    /// 💥 `list_references` fails with a transport error.
    pub(crate) async fn listing_fails(self) -> Self {
        self.state.lock().await.listing_fails = true;
        self
    }

    /// 🐢 Every insert takes this long, measured on tokio's clock.
    pub(crate) async fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().await.latency = Some(latency);
        self
    }

    /// ⏱️ Every insert attempt, successful or not, with the instant it started.
    pub(crate) async fn attempts(&self) -> Vec<(String, Instant)> {
        self.state.lock().await.attempts.clone()
    }

    /// 📈 The most inserts that were ever in progress at once.
    pub(crate) async fn peak_in_flight(&self) -> usize {
        self.state.lock().await.peak_in_flight
    }
}

#[async_trait]
impl WorkQueue for InMemoryQueue {
    async fn add_item(&self, reference: &str, payload: &Value) -> Result<(), PipelineError> {
        let latency = {
            let mut state = self.state.lock().await;
            state.attempts.push((reference.to_string(), Instant::now()));
            state.in_flight += 1;
            state.peak_in_flight = state.peak_in_flight.max(state.in_flight);
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state.lock().await;
        state.in_flight -= 1;

        let scheduled_failure = match state.failures_left.get_mut(reference) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        };
        if state.always_fail || scheduled_failure {
            return Err(PipelineError::transport(
                format!("add item {reference} to the in-memory queue"),
                "injected failure",
            ));
        }

        state.items.push((reference.to_string(), payload.clone()));
        Ok(())
    }

    async fn list_references(&self) -> Result<HashSet<String>, PipelineError> {
        let state = self.state.lock().await;
        if state.listing_fails {
            return Err(PipelineError::transport(
                "list in-memory queue items",
                "injected failure",
            ));
        }
        Ok(state
            .preloaded
            .iter()
            .cloned()
            .chain(state.items.iter().map(|(reference, _)| reference.clone()))
            .collect())
    }
}

// ===== Store =====

type FileKey = (String, String, String);

/// 🗄️ A document library that fits in a map. Key: `(site, folder, file_name)`.
///
/// Pre-seeded files have no contents (`None`), because all anyone ever asks is "is it there?"
#[derive(Debug, Default, Clone)]
pub(crate) struct InMemoryStore {
    files: Arc<Mutex<BTreeMap<FileKey, Option<ExportTable>>>>,
}

fn file_key(site: &str, folder: &str, file_name: &str) -> FileKey {
    (site.to_string(), folder.to_string(), file_name.to_string())
}

#[cfg(test)]
impl InMemoryStore {
    /// 📌 A store where `site/folder/file_name` already exists.
    pub(crate) async fn with_file(self, site: &str, folder: &str, file_name: &str) -> Self {
        self.files
            .lock()
            .await
            .insert(file_key(site, folder, file_name), None);
        self
    }

    /// 📋 What got uploaded to `site/folder/file_name`, if anything.
    pub(crate) async fn uploaded(&self, site: &str, folder: &str, file_name: &str) -> Option<ExportTable> {
        self.files
            .lock()
            .await
            .get(&file_key(site, folder, file_name))
            .cloned()
            .flatten()
    }

    pub(crate) async fn file_count(&self) -> usize {
        self.files.lock().await.len()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn list_files(&self, site: &str, folder: &str) -> Result<Vec<String>> {
        Ok(self
            .files
            .lock()
            .await
            .keys()
            .filter(|(s, f, _)| s == site && f == folder)
            .map(|(_, _, file_name)| file_name.clone())
            .collect())
    }

    async fn upload(
        &self,
        site: &str,
        folder: &str,
        file_name: &str,
        table: &ExportTable,
    ) -> Result<()> {
        self.files
            .lock()
            .await
            .insert(file_key(site, folder, file_name), Some(table.clone()));
        Ok(())
    }
}
