// ai
//! 🔄 Submission transformer — one [`RawSubmission`] in, one [`NormalizedRecord`] out.
//!
//! 🧠 Knowledge graph:
//! - Flat entries: `data[source]` → normalize → `record[column]` (missing ⇒ null)
//! - Nested entries: `data[source]` is a table; each `sub key` → normalize → its column
//! - Fixed columns are written LAST, so they win any collision with mapped columns
//! - Column order is not this module's problem. The exporter owns order.

use serde_json::{Map, Value};

use super::{datetime, value};
use crate::common::{FieldMapping, MappingTarget, NormalizedRecord, RawSubmission};

/// 🔄 `transform(serial, submission, mapping)`: the mapping's columns plus the three fixed ones.
pub(crate) fn transform(
    serial: &str,
    submission: &RawSubmission,
    mapping: &FieldMapping,
) -> NormalizedRecord {
    let mut record = NormalizedRecord::new();
    let no_table = Map::new();

    for entry in &mapping.entries {
        match &entry.target {
            MappingTarget::Column(column) => {
                record.insert(column.clone(), lookup(&submission.data, &entry.source));
            }
            MappingTarget::Nested(columns) => {
                // 🪆 a missing table (or one that isn't a table) is an empty table
                let table = submission
                    .data
                    .get(&entry.source)
                    .and_then(Value::as_object)
                    .unwrap_or(&no_table);
                for nested in columns {
                    record.insert(nested.column.clone(), lookup(table, &nested.key));
                }
            }
        }
    }

    let fixed = &mapping.fixed_columns;
    record.insert(fixed.serial.clone(), Value::String(serial.to_string()));
    record.insert(fixed.created.clone(), timestamp(&submission.entity, "created"));
    record.insert(fixed.completed.clone(), timestamp(&submission.entity, "completed"));
    record
}

fn lookup(data: &Map<String, Value>, key: &str) -> Value {
    data.get(key).map(value::normalize).unwrap_or(Value::Null)
}

fn timestamp(entity: &Map<String, Value>, key: &str) -> Value {
    datetime::extract(entity, key)
        .map(Value::String)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::MappingEntry;
    use serde_json::json;

    fn submission(value: Value) -> RawSubmission {
        serde_json::from_value(value).expect("💀 test submission should deserialize")
    }

    fn mapping() -> FieldMapping {
        FieldMapping::new(vec![
            MappingEntry::flat("elevens_navn", "Elevens navn"),
            MappingEntry::flat("oensket_sprog", "Ønsket sprog"),
            MappingEntry::flat("klassetrin", "Klassetrin"),
            MappingEntry::nested(
                "foraeldre",
                [("navn", "Forælders navn"), ("email", "Forælders e-mail")],
            ),
        ])
    }

    #[test]
    fn the_one_where_every_declared_column_shows_up_even_when_empty() {
        let raw = submission(json!({
            "entity": {
                "created": [{"value": "2025-06-03T08:00:00+02:00"}],
                "completed": [{"value": "2025-06-04T09:30:00+02:00"}]
            },
            "data": {
                "elevens_navn": "Amina",
                "oensket_sprog": "['Arabic', 'Somali']",
                "foraeldre": {"navn": "Fatima"}
            }
        }));

        let record = transform("17", &raw, &mapping());

        assert_eq!(record["Elevens navn"], json!("Amina"));
        assert_eq!(record["Ønsket sprog"], json!("Arabic, Somali"));
        assert_eq!(record["Klassetrin"], Value::Null);
        assert_eq!(record["Forælders navn"], json!("Fatima"));
        assert_eq!(record["Forælders e-mail"], Value::Null);
        assert_eq!(record["Serial number"], json!("17"));
        assert_eq!(record["Oprettet"], json!("2025-06-03 08:00:00"));
        assert_eq!(record["Gennemført"], json!("2025-06-04 09:30:00"));

        // ✅ exactly the declared columns plus the three fixed ones, not one more
        let mut expected = mapping().columns();
        expected.sort();
        assert_eq!(record.keys().cloned().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn the_one_where_a_missing_table_still_yields_null_columns() {
        let raw = submission(json!({"entity": {}, "data": {"foraeldre": "not a table"}}));
        let record = transform("1", &raw, &mapping());

        assert_eq!(record["Forælders navn"], Value::Null);
        assert_eq!(record["Forælders e-mail"], Value::Null);
        assert_eq!(record["Oprettet"], Value::Null);
        assert_eq!(record["Gennemført"], Value::Null);
    }

    #[test]
    fn the_one_where_fixed_columns_win_collisions_and_serial_is_never_read_from_data() {
        let mapping = FieldMapping::new(vec![
            MappingEntry::flat("serial", "Serial number"),
            MappingEntry::flat("created", "Oprettet"),
        ]);
        let raw = submission(json!({
            "entity": {"serial": [{"value": "999"}]},
            "data": {"serial": "from-data", "created": "also from data"}
        }));

        let record = transform("given-serial", &raw, &mapping);

        assert_eq!(record["Serial number"], json!("given-serial"));
        assert_eq!(record["Oprettet"], Value::Null);
        assert_eq!(record.len(), 3);
    }
}
