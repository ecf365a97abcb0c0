//! 🗂️ Local directory store — a document library made of plain folders.
//!
//! Layout: `{root}/{site}/{folder}/{file_name}`. The table is written as CSV, header first,
//! in the column order the exporter decided. The file name is used exactly as given,
//! extension and all. Each of the three names must be one plain path segment: no separators,
//! no `.` or `..`. They arrive inside a dequeued work item, so they are checked every time.

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::backends::DocumentStore;
use crate::errors::PipelineError;
use crate::exporter::ExportTable;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LocalDirConfig {
    pub root: String,
}

#[derive(Debug)]
pub(crate) struct LocalDirStore {
    config: LocalDirConfig,
}

impl LocalDirStore {
    pub(crate) fn new(config: LocalDirConfig) -> Self {
        Self { config }
    }

    fn folder_path(&self, site: &str, folder: &str) -> Result<PathBuf> {
        Ok(PathBuf::from(&self.config.root)
            .join(path_segment("site", site)?)
            .join(path_segment("folder", folder)?))
    }
}

/// 🚧 `name` as a single path segment under the export root, or an error.
fn path_segment<'a>(kind: &str, name: &'a str) -> Result<&'a str> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !name.contains(['/', '\\']) => Ok(name),
        _ => bail!("💀 Refusing {kind} name {name:?}: it must be one plain folder or file name"),
    }
}

/// 🧾 What a cell looks like in CSV: null is empty, strings are raw, the rest is JSON.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn render_csv(table: &ExportTable) -> Result<Vec<u8>, PipelineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&table.columns)
        .map_err(|err| PipelineError::transport("write the CSV header", err))?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(cell_text))
            .map_err(|err| PipelineError::transport("write a CSV row", err))?;
    }
    writer
        .into_inner()
        .map_err(|err| PipelineError::transport("finish the CSV", err.error()))
}

#[async_trait]
impl DocumentStore for LocalDirStore {
    async fn list_files(&self, site: &str, folder: &str) -> Result<Vec<String>> {
        let folder_path = self.folder_path(site, folder)?;
        let mut entries = match tokio::fs::read_dir(&folder_path).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => {
                let err = PipelineError::transport(format!("list '{}'", folder_path.display()), err);
                return Err(anyhow::Error::new(err)
                    .context("💀 The export folder exists but would not let us look inside"));
            }
        };

        let mut file_names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| PipelineError::transport(format!("list '{}'", folder_path.display()), err))?
        {
            file_names.push(entry.file_name().to_string_lossy().into_owned());
        }
        Ok(file_names)
    }

    async fn upload(
        &self,
        site: &str,
        folder: &str,
        file_name: &str,
        table: &ExportTable,
    ) -> Result<()> {
        let folder_path = self.folder_path(site, folder)?;
        let file_name = path_segment("file", file_name)?;
        tokio::fs::create_dir_all(&folder_path)
            .await
            .map_err(|err| {
                PipelineError::transport(format!("create '{}'", folder_path.display()), err)
            })?;

        let bytes = render_csv(table)?;
        let file_path = folder_path.join(file_name);
        tokio::fs::write(&file_path, bytes)
            .await
            .map_err(|err| PipelineError::transport(format!("write '{}'", file_path.display()), err))
            .context("💀 The export was ready, the disk was not")?;

        info!(
            path = %file_path.display(),
            rows = table.rows.len(),
            "📤 Export written"
        );
        Ok(())
    }
}
