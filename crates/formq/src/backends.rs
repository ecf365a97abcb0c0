//! 🔌 Backends — where the real I/O happens.
//!
//! 🚰 Sources pour submissions in, queues swallow work items, stores keep the finished export.
//! And in between, we panic! (kidding, we use anyhow)
//!
//! 🎭 This module is the casting agency. Need submissions from an export file? From RAM?
//! A queue that lives behind an HTTP API, or one that lives in a `Vec`? We've got a backend
//! for that. Each seam is a trait plus an enum that dispatches to the concrete type, so the
//! supervisor never has to care which one showed up for work.
//!
//! 🦆 The duck is here because every file must have one. This is law. Do not question the duck.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::app_config::{QueueConfig, SourceConfig, StoreConfig};
use crate::common::RawSubmission;
use crate::errors::PipelineError;
use crate::exporter::ExportTable;

pub(crate) mod automation_server;
pub(crate) mod file;
pub(crate) mod in_mem;
pub(crate) mod local_dir;

// 🎯 Re-export backend-specific configs so callers can do `backends::FileSourceConfig`
// instead of spelunking into `backends::file::FileSourceConfig`.
pub use automation_server::AutomationServerConfig;
pub use file::FileSourceConfig;
pub use local_dir::LocalDirConfig;

// ===== Submission source =====

/// 🚰 Something that hands over every stored submission for one form type.
///
/// # Contract
/// - One call, everything. No paging, no cursor. Forms are not that popular.
/// - Purged submissions never come out. Malformed rows are skipped, loudly.
/// - `Err(...)` means the retrieval itself failed. That is fatal for the run.
#[async_trait]
pub(crate) trait SubmissionSource: std::fmt::Debug + Send {
    async fn fetch_all(&mut self, form_type_id: &str) -> Result<Vec<RawSubmission>>;
}

#[derive(Debug)]
pub(crate) enum SourceBackend {
    File(file::FileSource),
    InMemory(in_mem::InMemorySource),
}

impl SourceBackend {
    pub(crate) fn from_config(config: &SourceConfig) -> Self {
        match config {
            SourceConfig::File(file_config) => {
                SourceBackend::File(file::FileSource::new(file_config.clone()))
            }
            SourceConfig::InMemory => SourceBackend::InMemory(in_mem::InMemorySource::default()),
        }
    }
}

#[async_trait]
impl SubmissionSource for SourceBackend {
    async fn fetch_all(&mut self, form_type_id: &str) -> Result<Vec<RawSubmission>> {
        match self {
            SourceBackend::File(f) => f.fetch_all(form_type_id).await,
            SourceBackend::InMemory(i) => i.fetch_all(form_type_id).await,
        }
    }
}

/// 🔍 Turns exported rows into submissions.
///
/// A row is either the bare `form_data` value or the whole export row
/// (`{"form_type": ..., "form_data": ...}`). Rows tagged with another form type are dropped,
/// purged rows are dropped, and anything that won't decode is dropped with a warning.
pub(crate) fn decode_rows(
    rows: impl IntoIterator<Item = Value>,
    form_type_id: &str,
) -> Vec<RawSubmission> {
    let mut submissions = Vec::new();
    for (index, row) in rows.into_iter().enumerate() {
        let form_data = match row {
            Value::Object(mut export_row) if export_row.contains_key("form_data") => {
                let form_type = export_row.get("form_type").and_then(Value::as_str);
                if form_type.is_some_and(|form_type| form_type != form_type_id) {
                    continue;
                }
                export_row.remove("form_data").unwrap_or(Value::Null)
            }
            bare => bare,
        };

        match RawSubmission::from_row(form_data) {
            Ok(Some(submission)) => submissions.push(submission),
            Ok(None) => debug!(row = index, "🗑️ purged submission skipped"),
            Err(err) => warn!(row = index, error = %err, "⚠️ Invalid form_data row, skipping"),
        }
    }
    submissions
}

// ===== Work queue =====

/// 📬 The destination queue. Keyed by reference, payload is whatever JSON we hand it.
///
/// # Contract
/// - `add_item` inserts one item. It does not retry. Retries are the enqueuer's job.
/// - `list_references` returns every reference already present, as a set.
/// - Errors are typed (`PipelineError`) so the enqueuer can log them per attempt.
#[async_trait]
pub(crate) trait WorkQueue: std::fmt::Debug + Send + Sync {
    async fn add_item(&self, reference: &str, payload: &Value) -> Result<(), PipelineError>;
    async fn list_references(&self) -> Result<HashSet<String>, PipelineError>;
}

#[derive(Debug)]
pub(crate) enum QueueBackend {
    AutomationServer(automation_server::AutomationServerQueue),
    InMemory(in_mem::InMemoryQueue),
}

impl QueueBackend {
    pub(crate) fn from_config(config: &QueueConfig) -> Result<Self, PipelineError> {
        Ok(match config {
            QueueConfig::AutomationServer(ats_config) => QueueBackend::AutomationServer(
                automation_server::AutomationServerQueue::new(ats_config)?,
            ),
            QueueConfig::InMemory => QueueBackend::InMemory(in_mem::InMemoryQueue::default()),
        })
    }
}

#[async_trait]
impl WorkQueue for QueueBackend {
    async fn add_item(&self, reference: &str, payload: &Value) -> Result<(), PipelineError> {
        match self {
            QueueBackend::AutomationServer(q) => q.add_item(reference, payload).await,
            QueueBackend::InMemory(q) => q.add_item(reference, payload).await,
        }
    }

    async fn list_references(&self) -> Result<HashSet<String>, PipelineError> {
        match self {
            QueueBackend::AutomationServer(q) => q.list_references().await,
            QueueBackend::InMemory(q) => q.list_references().await,
        }
    }
}

// ===== Document store =====

/// 🗄️ Where the finished export lands. A site, a folder, a file name.
#[async_trait]
pub(crate) trait DocumentStore: std::fmt::Debug + Send + Sync {
    /// 📂 File names currently in `site/folder`. A folder that doesn't exist yet is empty.
    async fn list_files(&self, site: &str, folder: &str) -> Result<Vec<String>>;
    /// 📤 Write `table` as `site/folder/file_name`.
    async fn upload(&self, site: &str, folder: &str, file_name: &str, table: &ExportTable)
    -> Result<()>;
}

#[derive(Debug)]
pub(crate) enum StoreBackend {
    LocalDir(local_dir::LocalDirStore),
    InMemory(in_mem::InMemoryStore),
}

impl StoreBackend {
    pub(crate) fn from_config(config: &StoreConfig) -> Self {
        match config {
            StoreConfig::LocalDir(dir_config) => {
                StoreBackend::LocalDir(local_dir::LocalDirStore::new(dir_config.clone()))
            }
            StoreConfig::InMemory => StoreBackend::InMemory(in_mem::InMemoryStore::default()),
        }
    }
}

#[async_trait]
impl DocumentStore for StoreBackend {
    async fn list_files(&self, site: &str, folder: &str) -> Result<Vec<String>> {
        match self {
            StoreBackend::LocalDir(s) => s.list_files(site, folder).await,
            StoreBackend::InMemory(s) => s.list_files(site, folder).await,
        }
    }

    async fn upload(
        &self,
        site: &str,
        folder: &str,
        file_name: &str,
        table: &ExportTable,
    ) -> Result<()> {
        match self {
            StoreBackend::LocalDir(s) => s.upload(site, folder, file_name, table).await,
            StoreBackend::InMemory(s) => s.upload(site, folder, file_name, table).await,
        }
    }
}
