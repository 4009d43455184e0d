//! Structural classification of tabular payload sections.
//!
//! The backend's tabular engine serializes the same logical table either as
//! an array of row records or as a column-oriented transposition
//! (`column -> row-index -> cell`), and the encoding has been observed to
//! vary payload-to-payload. Classification is therefore structural: the
//! shape is sniffed once per payload, never read from a flag.

use serde_json::{Map, Value};

/// The shape a tabular section arrived in, decided by [`TableShape::classify`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TableShape<'a> {
    /// Already an ordered sequence of row records.
    Rows(&'a [Value]),
    /// Column-oriented transposition; convert with [`to_record_sequence`].
    Transposed(&'a Map<String, Value>),
    /// Anything else; treated as an empty table downstream.
    Other,
}

impl<'a> TableShape<'a> {
    /// Classify `value` exactly once; callers match on the result instead of
    /// scattering shape checks.
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Array(rows) => TableShape::Rows(rows),
            Value::Object(map) if is_transposed_map(map) => TableShape::Transposed(map),
            _ => TableShape::Other,
        }
    }
}

/// True only for a non-empty, non-array object whose first column is itself
/// a non-empty object keyed exclusively by non-negative integers.
pub fn is_transposed_table(value: &Value) -> bool {
    matches!(TableShape::classify(value), TableShape::Transposed(_))
}

fn is_transposed_map(map: &Map<String, Value>) -> bool {
    let Some((_, first_column)) = map.iter().next() else {
        return false;
    };
    let Some(rows) = first_column.as_object() else {
        return false;
    };
    !rows.is_empty() && rows.keys().all(|key| key.parse::<u64>().is_ok())
}

/// Rebuild row records from a confirmed transposition.
///
/// Row indices are taken from the first column and sorted numerically, since
/// key order for numeric-looking keys is not stable across serializers. A
/// column missing a cell for some row simply omits that field in the record.
pub fn to_record_sequence(table: &Map<String, Value>) -> Vec<Value> {
    let Some((_, first_column)) = table.iter().next() else {
        return Vec::new();
    };
    let Some(first_rows) = first_column.as_object() else {
        return Vec::new();
    };

    let mut indices: Vec<(u64, &String)> = first_rows
        .keys()
        .filter_map(|key| key.parse::<u64>().ok().map(|index| (index, key)))
        .collect();
    indices.sort_unstable_by_key(|(index, _)| *index);

    indices
        .into_iter()
        .map(|(_, row_key)| {
            let mut record = Map::new();
            for (column, cells) in table {
                if let Some(cell) = cells.as_object().and_then(|cells| cells.get(row_key)) {
                    record.insert(column.clone(), cell.clone());
                }
            }
            Value::Object(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detects_transposed_table() {
        let table = json!({"ds": {"0": "2024-01-01", "1": "2024-01-02"}, "yhat": {"0": 10.0, "1": 12.5}});
        assert!(is_transposed_table(&table));
    }

    #[test]
    fn test_rejects_non_transposed_shapes() {
        assert!(!is_transposed_table(&json!([{"ds": "2024-01-01"}])));
        assert!(!is_transposed_table(&json!({})));
        assert!(!is_transposed_table(&json!({"ds": []})));
        assert!(!is_transposed_table(&json!({"ds": "scalar"})));
        assert!(!is_transposed_table(&json!({"ds": {}})));
        assert!(!is_transposed_table(&json!({"ds": {"first": 1}})));
        assert!(!is_transposed_table(&json!({"ds": {"-1": 1}})));
        assert!(!is_transposed_table(&json!(null)));
        assert!(!is_transposed_table(&json!(7)));
    }

    #[test]
    fn test_classify_rows() {
        let rows = json!([{"a": 1}]);
        assert!(matches!(TableShape::classify(&rows), TableShape::Rows(_)));
        assert!(matches!(TableShape::classify(&json!("x")), TableShape::Other));
    }

    #[test]
    fn test_record_sequence_preserves_row_order() {
        let table = json!({"a": {"0": 1, "1": 2}, "b": {"0": "x", "1": "y"}});
        let records = to_record_sequence(table.as_object().unwrap());
        assert_eq!(records, vec![json!({"a": 1, "b": "x"}), json!({"a": 2, "b": "y"})]);
    }

    #[test]
    fn test_record_sequence_sorts_indices_numerically() {
        // Lexicographic order would put "10" before "2".
        let table = json!({"v": {"10": "tenth", "2": "second", "0": "zeroth"}});
        let records = to_record_sequence(table.as_object().unwrap());
        assert_eq!(
            records,
            vec![json!({"v": "zeroth"}), json!({"v": "second"}), json!({"v": "tenth"})]
        );
    }

    #[test]
    fn test_record_sequence_omits_missing_cells() {
        let table = json!({"a": {"0": 1, "1": 2}, "b": {"1": "only"}});
        let records = to_record_sequence(table.as_object().unwrap());
        assert_eq!(records, vec![json!({"a": 1}), json!({"a": 2, "b": "only"})]);
    }

    #[test]
    fn test_record_sequence_skips_malformed_columns() {
        let table = json!({"a": {"0": 1}, "b": "not-a-column"});
        let records = to_record_sequence(table.as_object().unwrap());
        assert_eq!(records, vec![json!({"a": 1})]);
    }
}
