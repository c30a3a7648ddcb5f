use crate::{Gap, ReferenceIndex};
use schemars::{schema_for, Schema};

/// JSON Schema of the gap report: an array of gaps in reference order.
#[must_use]
pub fn gap_report_schema() -> Schema {
    schema_for!(Vec<Gap>)
}

/// JSON Schema of the persisted reference index.
#[must_use]
pub fn reference_index_schema() -> Schema {
    schema_for!(ReferenceIndex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn gap_report_is_an_array_of_gap_records() {
        let value = serde_json::to_value(gap_report_schema()).unwrap();
        assert_eq!(value["type"], "array");
        let text = value.to_string();
        for field in ["requirement_id", "source_reference", "sop_evidence", "justification"] {
            assert!(text.contains(field), "missing {field}");
        }
    }

    #[test]
    fn reference_index_covers_both_record_kinds() {
        let value = serde_json::to_value(reference_index_schema()).unwrap();
        assert_eq!(value["type"], "array");
        let text = value.to_string();
        for field in ["valid", "decomposition_failed", "origin_context", "embedding"] {
            assert!(text.contains(field), "missing {field}");
        }
    }
}
