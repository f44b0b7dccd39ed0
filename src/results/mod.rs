//! Read-side aggregation over a scanned store snapshot.
//!
//! Everything in this module is a pure function over a snapshot produced
//! by one `scan_all` pass; nothing here touches the filesystem or
//! re-scans mid-computation.

mod export;

pub use export::generate_csv;

use chrono::{DateTime, Utc};

use crate::models::{QuestionCatalog, StoredRecord};

/// The full, timestamp-sorted in-memory reconstruction of all stored
/// records, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    records: Vec<StoredRecord>,
}

impl ResultSet {
    /// Order a scanned snapshot by descending timestamp.
    ///
    /// Ordering is computed here with instant-comparison semantics, not
    /// lexical string comparison, so ISO-8601 timestamps with differing
    /// sub-second precision still sort correctly. Records whose
    /// timestamp fails to parse order last.
    pub fn from_scan(mut records: Vec<StoredRecord>) -> Self {
        records.sort_by_key(|r| std::cmp::Reverse(sort_instant(r)));
        Self { records }
    }

    pub fn records(&self) -> &[StoredRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[allow(dead_code)] // Utility for empty-state checks
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Arithmetic mean of all defined values for one question key,
    /// rounded to one decimal place. No record defining the key is a
    /// legitimate, silent `0.0`, not an error.
    pub fn average(&self, question_id: &str) -> f64 {
        let values: Vec<i64> = self
            .records
            .iter()
            .filter_map(|r| r.record.responses.get(question_id).copied())
            .collect();

        if values.is_empty() {
            return 0.0;
        }

        let mean = values.iter().sum::<i64>() as f64 / values.len() as f64;
        (mean * 10.0).round() / 10.0
    }

    /// Per-question averages in catalog order.
    pub fn averages(&self, catalog: &QuestionCatalog) -> Vec<(String, f64)> {
        catalog
            .questions()
            .iter()
            .map(|q| (q.id.clone(), self.average(&q.id)))
            .collect()
    }
}

fn sort_instant(record: &StoredRecord) -> DateTime<Utc> {
    record
        .record
        .parsed_timestamp()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SurveyRecord;
    use std::collections::BTreeMap;

    fn stored(timestamp: &str, responses: &[(&str, i64)]) -> StoredRecord {
        let record = SurveyRecord {
            timestamp: timestamp.to_string(),
            ip: "unknown".to_string(),
            participant_id: "P01".to_string(),
            participant_name: "Tester".to_string(),
            condition: None,
            responses: responses
                .iter()
                .map(|(k, v)| (k.to_string(), *v))
                .collect::<BTreeMap<_, _>>(),
        };
        StoredRecord {
            filename: crate::store::derive_filename("P01", timestamp),
            record,
        }
    }

    #[test]
    fn test_sorted_newest_first() {
        let set = ResultSet::from_scan(vec![
            stored("2024-05-01T10:00:00.000Z", &[]),
            stored("2024-05-03T10:00:00.000Z", &[]),
            stored("2024-05-02T10:00:00.000Z", &[]),
        ]);

        let timestamps: Vec<&str> = set
            .records()
            .iter()
            .map(|r| r.record.timestamp.as_str())
            .collect();
        assert_eq!(
            timestamps,
            vec![
                "2024-05-03T10:00:00.000Z",
                "2024-05-02T10:00:00.000Z",
                "2024-05-01T10:00:00.000Z",
            ]
        );
    }

    #[test]
    fn test_sort_compares_instants_not_strings() {
        // 12:00+03:00 is 09:00Z: lexically it sorts after 10:00Z, but as
        // an instant it comes first.
        let set = ResultSet::from_scan(vec![
            stored("2024-05-01T12:00:00.000+03:00", &[]),
            stored("2024-05-01T10:00:00.000Z", &[]),
        ]);
        assert_eq!(set.records()[0].record.timestamp, "2024-05-01T10:00:00.000Z");
    }

    #[test]
    fn test_unparseable_timestamps_order_last() {
        let set = ResultSet::from_scan(vec![
            stored("garbage", &[]),
            stored("2024-05-01T10:00:00.000Z", &[]),
        ]);
        assert_eq!(set.records()[1].record.timestamp, "garbage");
    }

    #[test]
    fn test_average_of_defined_values() {
        let set = ResultSet::from_scan(vec![
            stored("2024-05-01T10:00:00.000Z", &[("q1", 10)]),
            stored("2024-05-02T10:00:00.000Z", &[("q1", 20)]),
            stored("2024-05-03T10:00:00.000Z", &[("q1", 30)]),
        ]);
        assert_eq!(set.average("q1"), 20.0);
    }

    #[test]
    fn test_average_skips_records_missing_the_key() {
        let set = ResultSet::from_scan(vec![
            stored("2024-05-01T10:00:00.000Z", &[("q1", 10)]),
            stored("2024-05-02T10:00:00.000Z", &[("q2", 99)]),
            stored("2024-05-03T10:00:00.000Z", &[("q1", 15)]),
        ]);
        assert_eq!(set.average("q1"), 12.5);
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        let set = ResultSet::from_scan(vec![
            stored("2024-05-01T10:00:00.000Z", &[("q1", 10)]),
            stored("2024-05-02T10:00:00.000Z", &[("q1", 11)]),
            stored("2024-05-03T10:00:00.000Z", &[("q1", 11)]),
        ]);
        // 32 / 3 = 10.666... -> 10.7
        assert_eq!(set.average("q1"), 10.7);
    }

    #[test]
    fn test_average_without_data_is_zero() {
        let set = ResultSet::from_scan(vec![stored("2024-05-01T10:00:00.000Z", &[("q2", 50)])]);
        assert_eq!(set.average("q1"), 0.0);

        let empty = ResultSet::from_scan(Vec::new());
        assert_eq!(empty.average("q1"), 0.0);
    }

    #[test]
    fn test_from_scan_is_deterministic() {
        let snapshot = vec![
            stored("2024-05-01T10:00:00.000Z", &[("q1", 10)]),
            stored("2024-05-02T10:00:00.000Z", &[("q1", 20)]),
        ];
        let a = ResultSet::from_scan(snapshot.clone());
        let b = ResultSet::from_scan(snapshot);
        assert_eq!(a, b);
    }

    #[test]
    fn test_averages_follow_catalog_order() {
        let set = ResultSet::from_scan(vec![stored(
            "2024-05-01T10:00:00.000Z",
            &[("mental", 40), ("effort", 60)],
        )]);
        let averages = set.averages(&QuestionCatalog::nasa_tlx());

        assert_eq!(averages.len(), 6);
        assert_eq!(averages[0], ("mental".to_string(), 40.0));
        assert_eq!(averages[4], ("effort".to_string(), 60.0));
        assert_eq!(averages[5], ("frustration".to_string(), 0.0));
    }
}
