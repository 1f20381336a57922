use crate::classify::{clean_line, is_numeric, split_parts};
use crate::schema::FieldSchema;

/// Exactly `schema.len()` trimmed tokens, each parseable as `f64`.
///
/// Only [`extract`] builds these, so the width and numeric invariants hold for
/// every value of this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    values: Vec<String>,
}

impl CandidateRecord {
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<String> {
        self.values
    }
}

/// Recovers a fixed-width numeric record from `line`, skipping any leading
/// tokens that precede the first run of `schema.len()` numeric parts.
///
/// The earliest starting offset wins and anything after the run is dropped.
/// Returns `None` when no offset yields a full run.
pub fn extract(line: &str, schema: &FieldSchema) -> Option<CandidateRecord> {
    extract_cleaned(&clean_line(line), schema)
}

pub(crate) fn extract_cleaned(cleaned: &str, schema: &FieldSchema) -> Option<CandidateRecord> {
    let width = schema.len();
    let parts = split_parts(cleaned, schema.delimiter());

    let mut start = 0;
    while width > 0 && start + width <= parts.len() {
        let window = &parts[start..start + width];
        match window.iter().position(|part| !is_numeric(part)) {
            None => {
                return Some(CandidateRecord {
                    values: window.iter().map(|part| (*part).to_string()).collect(),
                });
            }
            // Every run starting at or before the offending part stops there
            // short of `width`, so resume right after it.
            Some(offset) => start += offset + 1,
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(count: usize, base: f64) -> Vec<String> {
        (0..count)
            .map(|idx| format!("{:.2}", base + idx as f64 / 10.0))
            .collect()
    }

    #[test]
    fn exact_width_succeeds_at_offset_zero() {
        let schema = FieldSchema::default();
        let expected = values(21, 0.1);
        let record = extract(&expected.join(","), &schema).unwrap();
        assert_eq!(record.values(), expected.as_slice());
    }

    #[test]
    fn realigns_past_leading_junk() {
        let schema = FieldSchema::default();
        let expected = values(21, 1.0);
        for junk in [0usize, 1, 3] {
            let mut parts: Vec<String> = (0..junk).map(|idx| format!("junk{idx}")).collect();
            parts.extend(expected.iter().cloned());
            let record = extract(&parts.join(","), &schema)
                .unwrap_or_else(|| panic!("expected realignment with {junk} junk tokens"));
            assert_eq!(record.values(), expected.as_slice(), "junk={junk}");
        }
    }

    #[test]
    fn trailing_parts_are_truncated() {
        let schema = FieldSchema::default();
        let expected = values(21, 0.1);
        let line = format!("{},extra,99", expected.join(","));
        let record = extract(&line, &schema).unwrap();
        assert_eq!(record.len(), 21);
        assert_eq!(record.values(), expected.as_slice());
    }

    #[test]
    fn earliest_of_two_runs_wins() {
        let schema = FieldSchema::new(["a", "b", "c"], ',').unwrap();
        let record = extract("x,1,2,3,y,4,5,6", &schema).unwrap();
        assert_eq!(record.into_values(), vec!["1", "2", "3"]);

        // Overlapping runs: the longer numeric stretch starts at offset 1.
        let record = extract("x,1,2,3,4,5", &schema).unwrap();
        assert_eq!(record.into_values(), vec!["1", "2", "3"]);
    }

    #[test]
    fn short_or_interrupted_runs_fail() {
        let schema = FieldSchema::default();
        let mut parts = values(20, 0.0);
        assert!(extract(&parts.join(","), &schema).is_none());

        parts.insert(10, "oops".to_string());
        parts.push("1".to_string());
        assert!(extract(&parts.join(","), &schema).is_none());
    }

    #[test]
    fn tokens_are_trimmed_and_control_free() {
        let schema = FieldSchema::new(["a", "b"], ',').unwrap();
        let record = extract("\u{1}  1.5 ,\t-2 \r", &schema).unwrap();
        assert_eq!(record.into_values(), vec!["1.5", "-2"]);
    }

    #[test]
    fn every_record_is_full_width_and_numeric() {
        let schema = FieldSchema::default();
        let lines = [
            values(21, 0.0).join(","),
            format!("a,b,{}", values(22, 3.0).join(",")),
            format!("1,x,{},y", values(21, 7.0).join(",")),
        ];
        for line in &lines {
            let record = extract(line, &schema).unwrap();
            assert_eq!(record.len(), schema.len());
            assert!(record.values().iter().all(|v| v.parse::<f64>().is_ok()));
        }
    }
}
