//! CSV export of a loaded result set.
//!
//! A pure projection over an already-loaded [`ResultSet`]; it performs
//! no storage access of its own. Rows keep the set's newest-first order
//! with an ordinal counting down from N to 1, so the newest record is
//! row N.

use crate::models::QuestionCatalog;
use crate::results::ResultSet;

/// UTF-8 byte order mark so spreadsheet applications detect the
/// encoding.
const BOM: &str = "\u{feff}";

/// Render the full result set as delimited text: one header row from
/// the catalog titles, then one row per record with empty cells for
/// unanswered questions.
pub fn generate_csv(results: &ResultSet, catalog: &QuestionCatalog) -> String {
    let mut lines = Vec::with_capacity(results.len() + 1);

    let mut header = vec![
        "#".to_string(),
        "Participant ID".to_string(),
        "Participant Name".to_string(),
        "Submitted At".to_string(),
        "Origin".to_string(),
    ];
    header.extend(catalog.questions().iter().map(|q| q.title.clone()));
    lines.push(render_row(&header));

    let total = results.len();
    for (index, stored) in results.records().iter().enumerate() {
        let record = &stored.record;
        let mut row = vec![
            (total - index).to_string(),
            record.participant_id.clone(),
            record.participant_name.clone(),
            record.timestamp.clone(),
            record.ip.clone(),
        ];
        row.extend(catalog.questions().iter().map(|q| {
            record
                .responses
                .get(&q.id)
                .map(|v| v.to_string())
                .unwrap_or_default()
        }));
        lines.push(render_row(&row));
    }

    format!("{}{}\n", BOM, lines.join("\n"))
}

fn render_row(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| escape_field(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Quote a field when it contains a delimiter, a quote, or a newline.
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Question, StoredRecord, SurveyRecord};
    use std::collections::BTreeMap;

    fn catalog() -> QuestionCatalog {
        QuestionCatalog::new(vec![
            Question {
                id: "q1".to_string(),
                title: "Mental Demand".to_string(),
                description: String::new(),
                left_label: String::new(),
                right_label: String::new(),
            },
            Question {
                id: "q2".to_string(),
                title: "Effort".to_string(),
                description: String::new(),
                left_label: String::new(),
                right_label: String::new(),
            },
        ])
    }

    fn stored(timestamp: &str, name: &str, responses: &[(&str, i64)]) -> StoredRecord {
        StoredRecord {
            filename: crate::store::derive_filename("P01", timestamp),
            record: SurveyRecord {
                timestamp: timestamp.to_string(),
                ip: "unknown".to_string(),
                participant_id: "P01".to_string(),
                participant_name: name.to_string(),
                condition: None,
                responses: responses
                    .iter()
                    .map(|(k, v)| (k.to_string(), *v))
                    .collect::<BTreeMap<_, _>>(),
            },
        }
    }

    #[test]
    fn test_header_from_catalog_titles() {
        let csv = generate_csv(&ResultSet::from_scan(Vec::new()), &catalog());
        assert!(csv.starts_with('\u{feff}'));
        assert_eq!(
            csv.trim_start_matches('\u{feff}').trim_end(),
            "#,Participant ID,Participant Name,Submitted At,Origin,Mental Demand,Effort"
        );
    }

    #[test]
    fn test_ordinals_count_down_from_newest() {
        let set = ResultSet::from_scan(vec![
            stored("2024-05-01T10:00:00.000Z", "First", &[("q1", 10)]),
            stored("2024-05-02T10:00:00.000Z", "Second", &[("q1", 20)]),
        ]);
        let csv = generate_csv(&set, &catalog());
        let lines: Vec<&str> = csv.trim_start_matches('\u{feff}').lines().collect();

        assert_eq!(lines.len(), 3);
        // Newest record is row N at the top.
        assert!(lines[1].starts_with("2,P01,Second,"));
        assert!(lines[2].starts_with("1,P01,First,"));
    }

    #[test]
    fn test_missing_answers_render_empty_cells() {
        let set = ResultSet::from_scan(vec![stored(
            "2024-05-01T10:00:00.000Z",
            "Solo",
            &[("q2", 75)],
        )]);
        let csv = generate_csv(&set, &catalog());
        let row = csv.trim_start_matches('\u{feff}').lines().nth(1).unwrap();

        assert_eq!(row, "1,P01,Solo,2024-05-01T10:00:00.000Z,unknown,,75");
    }

    #[test]
    fn test_fields_with_delimiters_are_quoted() {
        let set = ResultSet::from_scan(vec![stored(
            "2024-05-01T10:00:00.000Z",
            "Doe, Jane",
            &[],
        )]);
        let csv = generate_csv(&set, &catalog());

        assert!(csv.contains("\"Doe, Jane\""));
    }
}
