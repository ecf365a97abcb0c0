//! 📤 Exporter — the other end of the queue. One work item in, one file in the library out.
//!
//! 🎬 COLD OPEN — INT. DOCUMENT LIBRARY — MONDAY, 7:15 AM
//!
//! The work item has arrived. It carries a week of normalized rows and the address of a folder.
//! Three endings are possible: nothing to write, already written, or written just now. 🦆
//!
//! 🧠 Knowledge graph:
//! - Column order comes from the field mapping (`FieldMapping::columns`), never from the rows
//! - Columns a row lacks are null; columns a row has but the mapping doesn't are dropped
//! - Store failures propagate (`PipelineError::Transport` underneath the context)

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::backends::DocumentStore;
use crate::common::{FieldMapping, NormalizedRecord, WorkItemData};

/// 🧾 A header plus rows, in a fixed column order. The thing a spreadsheet is made from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ExportTable {
    /// 📐 Project each record onto `columns`.
    pub fn from_records(columns: Vec<String>, records: &[NormalizedRecord]) -> Self {
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| record.get(column).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }
}

/// 🏁 How the export step ended. None of these is an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    NoSubmissions,
    AlreadyExists { file_name: String },
    Completed { file_name: String, rows: usize },
}

impl std::fmt::Display for ExportOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportOutcome::NoSubmissions => write!(f, "No new submissions for the given week"),
            ExportOutcome::AlreadyExists { .. } => write!(f, "Excel file already exists"),
            ExportOutcome::Completed { .. } => write!(f, "Process completed without exceptions"),
        }
    }
}

/// 📤 `process_item(item_data, mapping, store)`
pub(crate) async fn process_item<D: DocumentStore + ?Sized>(
    item_data: &WorkItemData,
    mapping: &FieldMapping,
    store: &D,
) -> Result<ExportOutcome> {
    let target = &item_data.config;

    if item_data.submissions.is_empty() {
        info!("📭 No new submissions for the given week, process completed");
        return Ok(ExportOutcome::NoSubmissions);
    }

    let existing = store
        .list_files(&target.site_name, &target.folder_name)
        .await
        .context(format!(
            "💀 Could not list the files in '{}/{}'",
            target.site_name, target.folder_name
        ))?;
    if existing.iter().any(|name| name == &target.file_name) {
        info!(file_name = %target.file_name, "📎 Export already exists, process completed");
        return Ok(ExportOutcome::AlreadyExists {
            file_name: target.file_name.clone(),
        });
    }

    let table = ExportTable::from_records(mapping.columns(), &item_data.submissions);
    store
        .upload(
            &target.site_name,
            &target.folder_name,
            &target.file_name,
            &table,
        )
        .await
        .context(format!("💀 Could not upload '{}'", target.file_name))?;

    info!(
        file_name = %target.file_name,
        rows = table.rows.len(),
        columns = table.columns.len(),
        "✅ Export uploaded"
    );
    Ok(ExportOutcome::Completed {
        file_name: target.file_name.clone(),
        rows: table.rows.len(),
    })
}
