//! 📂 File source — reads an export of `form_data` rows off disk.
//!
//! Two layouts, sniffed from the first non-blank byte:
//! - `[` → one JSON array of rows
//! - anything else → NDJSON, one row per line (blank lines ignored)
//!
//! 🧠 Knowledge graph: a file that can't be opened, or an array that isn't valid JSON, fails
//! the run (`PipelineError::Transport`). A single bad NDJSON line only costs that line. 🦆

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::backends::{SubmissionSource, decode_rows};
use crate::common::RawSubmission;
use crate::errors::PipelineError;

// -- 📂 FileSourceConfig lives next to the FileSource that uses it. No scavenger hunts at 2am.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct FileSourceConfig {
    pub file_name: String,
}

#[derive(Debug)]
pub(crate) struct FileSource {
    source_config: FileSourceConfig,
}

impl FileSource {
    pub(crate) fn new(source_config: FileSourceConfig) -> Self {
        Self { source_config }
    }
}

#[async_trait]
impl SubmissionSource for FileSource {
    async fn fetch_all(&mut self, form_type_id: &str) -> Result<Vec<RawSubmission>> {
        let file_name = &self.source_config.file_name;
        let contents = tokio::fs::read_to_string(file_name)
            .await
            .map_err(|err| PipelineError::transport(format!("read '{file_name}'"), err))
            .context(format!(
                "💀 The submission export '{file_name}' would not open. We knocked. We checked \
                 the path. The door stayed shut."
            ))?;

        let rows = parse_rows(&contents)
            .map_err(|err| PipelineError::transport(format!("parse '{file_name}'"), err))
            .context("💀 The export starts like a JSON array but does not end like one")?;

        let total_rows = rows.len();
        let submissions = decode_rows(rows, form_type_id);
        info!(
            file_name = %file_name,
            total_rows,
            submissions = submissions.len(),
            "📂 Submissions read from export file"
        );
        Ok(submissions)
    }
}

fn parse_rows(contents: &str) -> Result<Vec<Value>, serde_json::Error> {
    let trimmed = contents.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed);
    }

    let mut rows = Vec::new();
    for (line_number, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(line) {
            Ok(row) => rows.push(row),
            Err(err) => warn!(line = line_number + 1, error = %err, "⚠️ Invalid JSON line, skipping"),
        }
    }
    Ok(rows)
}
