//! Best-effort statistics for uploaded TSV/CSV files
//!
//! Feature matrices are laid out with features in rows and samples in
//! columns: the first row names the samples and the first column names the
//! features. A header row one cell shorter than the data rows (no corner
//! cell, as written by R's `write.table`) is accepted.
//!
//! Label vectors hold one sample per row with the class label in the last
//! column. A leading header row is detected and skipped.

use std::collections::BTreeMap;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, Result};
use crate::types::FileRole;

/// Header cells that mark the first row of a label file as a header
const LABEL_HEADER_HINTS: [&str; 7] = ["", "sample", "samples", "sample_id", "id", "name", "class"];

/// Shape and class balance of a parsed file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableStats {
    pub n_features: Option<i32>,
    pub n_samples: Option<i32>,
    pub class_counts: Option<BTreeMap<String, i64>>,
}

/// Tab when the first non-empty line contains one, comma otherwise
pub fn detect_delimiter(text: &str) -> u8 {
    let first = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if first.contains('\t') {
        b'\t'
    } else {
        b','
    }
}

/// Inspect raw upload bytes according to the role the file is tagged with
pub fn inspect(bytes: &[u8], role: FileRole) -> Result<TableStats> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| CommonError::Table("file is not valid UTF-8 text".to_string()))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let rows = read_rows(text)?;
    if rows.is_empty() {
        return Err(CommonError::Table("file contains no rows".to_string()));
    }

    if role.is_labels() {
        inspect_labels(&rows)
    } else {
        inspect_matrix(&rows)
    }
}

fn read_rows(text: &str) -> Result<Vec<StringRecord>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(detect_delimiter(text))
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CommonError::Table(e.to_string()))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        rows.push(record);
    }
    Ok(rows)
}

fn inspect_matrix(rows: &[StringRecord]) -> Result<TableStats> {
    if rows.len() < 2 {
        return Err(CommonError::Table(
            "feature matrix needs a header row and at least one feature row".to_string(),
        ));
    }

    let width = rows[1].len();
    if width < 2 {
        return Err(CommonError::Table(
            "feature matrix needs a feature name column and at least one sample column"
                .to_string(),
        ));
    }

    if let Some((line, row)) = rows.iter().enumerate().skip(1).find(|(_, r)| r.len() != width) {
        return Err(CommonError::Table(format!(
            "row {} has {} columns, expected {}",
            line + 1,
            row.len(),
            width
        )));
    }

    let header_width = rows[0].len();
    if header_width != width && header_width + 1 != width {
        return Err(CommonError::Table(format!(
            "header has {} columns but data rows have {}",
            header_width, width
        )));
    }

    Ok(TableStats {
        n_features: Some(count(rows.len() - 1)),
        n_samples: Some(count(width - 1)),
        class_counts: None,
    })
}

fn inspect_labels(rows: &[StringRecord]) -> Result<TableStats> {
    let width = rows[0].len();
    if let Some((line, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != width) {
        return Err(CommonError::Table(format!(
            "row {} has {} columns, expected {}",
            line + 1,
            row.len(),
            width
        )));
    }

    let skip = usize::from(has_label_header(rows));
    let data = &rows[skip..];
    if data.is_empty() {
        return Err(CommonError::Table("label file contains no samples".to_string()));
    }

    let mut class_counts = BTreeMap::new();
    for row in data {
        let label = row.get(row.len() - 1).unwrap_or("");
        if label.is_empty() {
            return Err(CommonError::Table("label file contains an empty class label".to_string()));
        }
        *class_counts.entry(label.to_string()).or_insert(0) += 1;
    }

    Ok(TableStats {
        n_features: None,
        n_samples: Some(count(data.len())),
        class_counts: Some(class_counts),
    })
}

fn has_label_header(rows: &[StringRecord]) -> bool {
    let first = &rows[0];
    let label = first.get(first.len() - 1).unwrap_or("");

    if first.len() > 1 {
        let corner = first.get(0).unwrap_or("").trim_start_matches('#').to_ascii_lowercase();
        if LABEL_HEADER_HINTS.contains(&corner.as_str()) {
            return true;
        }
    }

    let rest_numeric = rows.len() > 1
        && rows[1..]
            .iter()
            .all(|r| r.get(r.len() - 1).is_some_and(|l| l.parse::<f64>().is_ok()));
    rest_numeric && label.parse::<f64>().is_err()
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a\tb\tc\n"), b'\t');
        assert_eq!(detect_delimiter("a,b,c\n"), b',');
        assert_eq!(detect_delimiter("\n\na\tb\n"), b'\t');
        assert_eq!(detect_delimiter("a;b\n"), b',');
        assert_eq!(detect_delimiter("single\n"), b',');
    }

    #[test]
    fn test_tsv_matrix_counts() {
        let tsv = "feature\ts1\ts2\ts3\nmsp_1\t0.1\t0\t0.3\nmsp_2\t0\t0.2\t0\n";
        let stats = inspect(tsv.as_bytes(), FileRole::XTrain).unwrap();
        assert_eq!(stats.n_features, Some(2));
        assert_eq!(stats.n_samples, Some(3));
        assert!(stats.class_counts.is_none());
    }

    #[test]
    fn test_csv_matrix_counts() {
        let csv = "feature,s1,s2\nf1,1,2\nf2,3,4\nf3,5,6\n";
        let stats = inspect(csv.as_bytes(), FileRole::XTest).unwrap();
        assert_eq!(stats.n_features, Some(3));
        assert_eq!(stats.n_samples, Some(2));
    }

    #[test]
    fn test_matrix_header_without_corner_cell() {
        let tsv = "s1\ts2\nf1\t1\t2\nf2\t3\t4\n";
        let stats = inspect(tsv.as_bytes(), FileRole::XTrain).unwrap();
        assert_eq!(stats.n_features, Some(2));
        assert_eq!(stats.n_samples, Some(2));
    }

    #[test]
    fn test_matrix_ragged_rows_rejected() {
        let tsv = "feature\ts1\ts2\nf1\t1\t2\nf2\t3\n";
        let err = inspect(tsv.as_bytes(), FileRole::XTrain).unwrap_err();
        assert!(err.to_string().contains("row 3"));
    }

    #[test]
    fn test_matrix_header_only_rejected() {
        assert!(inspect(b"feature\ts1\ts2\n", FileRole::XTrain).is_err());
    }

    #[test]
    fn test_matrix_skips_blank_lines() {
        let tsv = "\nfeature\ts1\n\nf1\t1\n";
        let stats = inspect(tsv.as_bytes(), FileRole::Unassigned).unwrap();
        assert_eq!(stats.n_features, Some(1));
        assert_eq!(stats.n_samples, Some(1));
    }

    #[test]
    fn test_matrix_hash_prefixed_header_is_kept() {
        let tsv = "#OTU ID\ts1\ts2\ts3\nmsp_1\t1\t2\t3\nmsp_2\t4\t5\t6\n";
        let stats = inspect(tsv.as_bytes(), FileRole::XTrain).unwrap();
        assert_eq!(stats.n_features, Some(2));
        assert_eq!(stats.n_samples, Some(3));
    }

    #[test]
    fn test_labels_hash_prefixed_header_is_skipped() {
        let tsv = "#sample\tclass\ns1\t0\ns2\t1\n";
        let stats = inspect(tsv.as_bytes(), FileRole::YTrain).unwrap();
        assert_eq!(stats.n_samples, Some(2));
    }

    #[test]
    fn test_labels_with_header() {
        let tsv = "sample\tclass\ns1\t0\ns2\t1\ns3\t1\n";
        let stats = inspect(tsv.as_bytes(), FileRole::YTrain).unwrap();
        assert_eq!(stats.n_samples, Some(3));
        assert!(stats.n_features.is_none());
        let counts = stats.class_counts.unwrap();
        assert_eq!(counts.get("0"), Some(&1));
        assert_eq!(counts.get("1"), Some(&2));
    }

    #[test]
    fn test_labels_without_header() {
        let tsv = "s1\t0\ns2\t1\n";
        let stats = inspect(tsv.as_bytes(), FileRole::YTest).unwrap();
        assert_eq!(stats.n_samples, Some(2));
    }

    #[test]
    fn test_labels_single_column_with_header() {
        let tsv = "y\n0\n1\n1\n";
        let stats = inspect(tsv.as_bytes(), FileRole::YTrain).unwrap();
        assert_eq!(stats.n_samples, Some(3));
    }

    #[test]
    fn test_non_utf8_rejected() {
        let err = inspect(&[0xff, 0xfe, 0x00, 0x41], FileRole::XTrain).unwrap_err();
        assert!(matches!(err, CommonError::Table(_)));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(inspect(b"", FileRole::XTrain).is_err());
        assert!(inspect(b"\n\n", FileRole::YTrain).is_err());
    }

    #[test]
    fn test_bom_is_ignored() {
        let tsv = "\u{feff}feature\ts1\nf1\t1\n";
        let stats = inspect(tsv.as_bytes(), FileRole::XTrain).unwrap();
        assert_eq!(stats.n_samples, Some(1));
    }

    proptest! {
        #[test]
        fn prop_matrix_dimensions(features in 1usize..40, samples in 1usize..40) {
            let mut text = String::from("feature");
            for s in 0..samples {
                text.push_str(&format!("\ts{}", s));
            }
            text.push('\n');
            for f in 0..features {
                text.push_str(&format!("f{}", f));
                for s in 0..samples {
                    text.push_str(&format!("\t{}", (f * s) % 7));
                }
                text.push('\n');
            }

            let stats = inspect(text.as_bytes(), FileRole::XTrain).unwrap();
            prop_assert_eq!(stats.n_features, Some(features as i32));
            prop_assert_eq!(stats.n_samples, Some(samples as i32));
        }
    }
}
