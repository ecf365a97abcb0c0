//! 📦 Common data structures — the building blocks of formq
//!
//! ---
//!
//! 🎬 COLD OPEN — INT. MUNICIPAL OFFICE — MONDAY, 7:02 AM
//!
//! A parent filled in a form last Tuesday. Another one on Sunday, at 23:58, because of course.
//! The forms platform kept every answer, every nested table, every stringified list that
//! someone's frontend decided to serialize as `"['Arabic', 'Somali']"`. Nobody asked why.
//!
//! ✅ This module holds the shapes that carry those answers through the pipeline:
//! a [`RawSubmission`] goes in, a [`NormalizedRecord`] comes out, and a single [`WorkItem`]
//! ferries the whole week into the queue. 🦆
//!
//! ---

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::transforms::entity_value;

/// 🧾 One normalized row: output column → cleaned value.
///
/// A `BTreeMap` so the serialized form never depends on insertion order. The exporter
/// decides the real column order from the field mapping.
pub type NormalizedRecord = BTreeMap<String, Value>;

/// 📥 One respondent's form submission, exactly as the forms platform stored it.
///
/// `entity` holds the metadata lists (`serial`, `created`, `completed`, each a list of
/// `{"value": ...}` records). `data` holds the answers. Both stay as loose JSON maps,
/// because the platform is not in the business of honoring schemas and neither are we.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSubmission {
    #[serde(default)]
    pub entity: Map<String, Value>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl RawSubmission {
    /// 🔍 Decodes one exported `form_data` row.
    ///
    /// Rows arrive either as JSON objects or as strings containing JSON (that's how the
    /// database column stores them). Purged submissions come back as `Ok(None)`.
    pub(crate) fn from_row(row: Value) -> Result<Option<Self>> {
        let row = match row {
            Value::String(encoded) => serde_json::from_str::<Value>(&encoded)
                .context("💀 The form_data column held a string, but not a JSON one")?,
            already_json => already_json,
        };

        // 🗑️ purged submissions are ghosts. we do not enqueue ghosts.
        if row.get("purged").is_some() {
            return Ok(None);
        }

        let submission = serde_json::from_value(row)
            .context("💀 form_data row does not look like a submission (entity/data)")?;
        Ok(Some(submission))
    }

    /// 🔢 The submission's serial number, from `entity.serial[0].value`.
    ///
    /// The platform sends it as a string most of the time and as a number the rest of it.
    pub fn serial(&self) -> Option<String> {
        match entity_value(&self.entity, "serial")? {
            Value::String(serial) => Some(serial.clone()),
            Value::Number(serial) => Some(serial.to_string()),
            _ => None,
        }
    }
}

/// 🏷️ The names of the three columns every record carries, no matter what the mapping says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixedColumns {
    #[serde(default = "default_serial_column")]
    pub serial: String,
    #[serde(default = "default_created_column")]
    pub created: String,
    #[serde(default = "default_completed_column")]
    pub completed: String,
}

fn default_serial_column() -> String {
    "Serial number".to_string()
}

fn default_created_column() -> String {
    "Oprettet".to_string()
}

fn default_completed_column() -> String {
    "Gennemført".to_string()
}

impl Default for FixedColumns {
    fn default() -> Self {
        Self {
            serial: default_serial_column(),
            created: default_created_column(),
            completed: default_completed_column(),
        }
    }
}

impl FixedColumns {
    pub fn names(&self) -> [&str; 3] {
        [&self.serial, &self.created, &self.completed]
    }
}

/// 🗺️ The declarative source-key → output-column table.
///
/// An ordered list of entries (not a map) because the order IS the export column order,
/// and figment's dictionaries don't remember insertion order. They have other strengths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    #[serde(default)]
    pub fixed_columns: FixedColumns,
    #[serde(default)]
    pub entries: Vec<MappingEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// 🔑 Key inside `submission.data`.
    pub source: String,
    pub target: MappingTarget,
}

/// 🎯 Where a source key lands: one column, or a table of sub-answers fanned out into many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MappingTarget {
    Column(String),
    Nested(Vec<NestedColumn>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NestedColumn {
    pub key: String,
    pub column: String,
}

impl FieldMapping {
    pub fn new(entries: Vec<MappingEntry>) -> Self {
        Self {
            fixed_columns: FixedColumns::default(),
            entries,
        }
    }

    /// 📐 Declared output columns in declaration order, then any fixed column the
    /// mapping didn't already declare. Duplicates collapse onto their first position.
    pub fn columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        let declared = self.entries.iter().flat_map(|entry| match &entry.target {
            MappingTarget::Column(column) => vec![column.as_str()],
            MappingTarget::Nested(nested) => nested.iter().map(|n| n.column.as_str()).collect(),
        });
        for column in declared.chain(self.fixed_columns.names()) {
            if !columns.iter().any(|seen| seen == column) {
                columns.push(column.to_string());
            }
        }
        columns
    }
}

impl MappingEntry {
    pub fn flat(source: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: MappingTarget::Column(column.into()),
        }
    }

    pub fn nested<K: Into<String>, C: Into<String>>(
        source: impl Into<String>,
        columns: impl IntoIterator<Item = (K, C)>,
    ) -> Self {
        Self {
            source: source.into(),
            target: MappingTarget::Nested(
                columns
                    .into_iter()
                    .map(|(key, column)| NestedColumn {
                        key: key.into(),
                        column: column.into(),
                    })
                    .collect(),
            ),
        }
    }
}

/// 📍 Where the export for this run should land, resolved once per run.
///
/// This is the `config` half of a work item. The field mapping is deliberately NOT in here;
/// the item processor reads it from its own configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTarget {
    pub form_type_id: String,
    pub site_name: String,
    pub folder_name: String,
    pub file_name: String,
}

/// 📦 A unit of work for the queue: one week of normalized submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItem {
    pub reference: String,
    pub data: WorkItemData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkItemData {
    pub config: ExportTarget,
    pub submissions: Vec<NormalizedRecord>,
}

impl WorkItem {
    /// 📬 Decodes a work item from disk or from a dequeued payload.
    ///
    /// Accepts the bare item (`{"reference", "data"}`) as well as the queue payload
    /// envelope (`{"item": {...}}`) the enqueuer writes.
    pub fn decode(raw: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(raw).context("💀 The work item file is not valid JSON")?;
        let value = match value {
            Value::Object(mut envelope) if envelope.contains_key("item") => envelope
                .remove("item")
                .unwrap_or(Value::Null),
            bare => bare,
        };
        serde_json::from_value(value).context("💀 JSON parsed, but it is not a work item")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_one_where_purged_rows_never_make_it_past_the_door() -> Result<()> {
        let purged = json!({"purged": true, "entity": {}, "data": {}});
        assert_eq!(RawSubmission::from_row(purged)?, None);
        Ok(())
    }

    #[test]
    fn the_one_where_form_data_arrives_as_a_string_of_json() -> Result<()> {
        let row = Value::String(
            r#"{"entity":{"serial":[{"value":"42"}]},"data":{"skole":"Aarhus Skole"}}"#.to_string(),
        );
        let submission = RawSubmission::from_row(row)?.expect("💀 row should decode");
        assert_eq!(submission.serial().as_deref(), Some("42"));
        assert_eq!(submission.data["skole"], "Aarhus Skole");
        Ok(())
    }

    #[test]
    fn the_one_where_the_serial_is_secretly_a_number() {
        let submission = RawSubmission {
            entity: json!({"serial": [{"value": 1337}]})
                .as_object()
                .cloned()
                .unwrap_or_default(),
            data: Map::new(),
        };
        assert_eq!(submission.serial().as_deref(), Some("1337"));
    }

    #[test]
    fn the_one_where_columns_keep_declaration_order_and_fixed_columns_trail() {
        let mapping = FieldMapping::new(vec![
            MappingEntry::flat("serial", "Serial number"),
            MappingEntry::flat("elevens_navn", "Elevens navn"),
            MappingEntry::nested("tabel", [("a", "Række A"), ("b", "Række B")]),
        ]);

        assert_eq!(
            mapping.columns(),
            vec![
                "Serial number",
                "Elevens navn",
                "Række A",
                "Række B",
                "Oprettet",
                "Gennemført",
            ]
        );
    }

    #[test]
    fn the_one_where_mapping_parses_from_toml_both_flat_and_nested() {
        let mapping: FieldMapping = toml::from_str(
            r#"
            [[entries]]
            source = "klassetrin"
            target = "Klassetrin"

            [[entries]]
            source = "soeskende"
            target = [{ key = "navn", column = "Søskendes navn" }]
            "#,
        )
        .expect("💀 mapping TOML should parse");

        assert_eq!(mapping.entries[0], MappingEntry::flat("klassetrin", "Klassetrin"));
        assert_eq!(
            mapping.entries[1],
            MappingEntry::nested("soeskende", [("navn", "Søskendes navn")])
        );
        assert_eq!(mapping.fixed_columns, FixedColumns::default());
    }

    #[test]
    fn the_one_where_a_dequeued_envelope_unwraps_into_a_work_item() -> Result<()> {
        let raw = json!({
            "item": {
                "reference": "form_2025-06-18",
                "data": {
                    "config": {
                        "form_type_id": "form",
                        "site_name": "Site",
                        "folder_name": "General",
                        "file_name": "out.csv"
                    },
                    "submissions": [{"Serial number": "1"}]
                }
            }
        })
        .to_string();

        let item = WorkItem::decode(&raw)?;
        assert_eq!(item.reference, "form_2025-06-18");
        assert_eq!(item.data.submissions.len(), 1);
        Ok(())
    }
}
