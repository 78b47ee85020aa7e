use chrono::NaiveDate;
use std::collections::HashMap;
use thiserror::Error;

/// Column names accepted as the observation date, checked in order.
pub const DATE_COLUMNS: &[&str] = &["date", "scraped_date"];

#[derive(Debug, Error)]
pub enum TableError {
    #[error("no date column found (expected `date` or `scraped_date`)")]
    MissingDateColumn,
    #[error("row {row}: unparseable date `{value}`")]
    BadDate { row: usize, value: String },
    #[error("row {row}: expected {expected} fields, got {got}")]
    Ragged {
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("column `{0}` not present in header")]
    UnknownColumn(String),
}

/// An in-memory tabular snapshot: header row plus string records, with the
/// date column located and parsed up front so later grouping never has to
/// re-validate it. Records keep their CSV string form; the engine only ever
/// interprets the date (and, for dedup, the key columns).
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
    dates: Vec<NaiveDate>,
    date_col: usize,
}

impl Table {
    /// Build a table from a header row and records, validating that a date
    /// column exists and that every record is rectangular with a parseable
    /// ISO date.
    pub fn new(headers: Vec<String>, records: Vec<Vec<String>>) -> Result<Self, TableError> {
        let date_col = DATE_COLUMNS
            .iter()
            .find_map(|c| headers.iter().position(|h| h == c))
            .ok_or(TableError::MissingDateColumn)?;

        let mut dates = Vec::with_capacity(records.len());
        for (i, rec) in records.iter().enumerate() {
            if rec.len() != headers.len() {
                return Err(TableError::Ragged {
                    row: i,
                    expected: headers.len(),
                    got: rec.len(),
                });
            }
            dates.push(parse_iso_date(&rec[date_col]).ok_or_else(|| TableError::BadDate {
                row: i,
                value: rec[date_col].clone(),
            })?);
        }

        Ok(Self {
            headers,
            records,
            dates,
            date_col,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Parsed date of record `i`.
    pub fn date_at(&self, i: usize) -> NaiveDate {
        self.dates[i]
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Index of the column the dates were parsed from.
    pub fn date_column(&self) -> usize {
        self.date_col
    }

    /// Drop every record observed on `day`. Returns how many were removed.
    /// This is the overwrite half of overwrite-on-regenerate: the caller
    /// appends the regenerated rows for the same day afterwards.
    pub fn remove_date(&mut self, day: NaiveDate) -> usize {
        let before = self.records.len();
        let mut kept_records = Vec::with_capacity(before);
        let mut kept_dates = Vec::with_capacity(before);
        for (rec, date) in self.records.drain(..).zip(self.dates.drain(..)) {
            if date != day {
                kept_records.push(rec);
                kept_dates.push(date);
            }
        }
        self.records = kept_records;
        self.dates = kept_dates;
        before - self.records.len()
    }

    /// Append records that share this table's header layout.
    pub fn append(&mut self, records: Vec<Vec<String>>) -> Result<usize, TableError> {
        let added = records.len();
        for (i, rec) in records.into_iter().enumerate() {
            if rec.len() != self.headers.len() {
                return Err(TableError::Ragged {
                    row: self.records.len() + i,
                    expected: self.headers.len(),
                    got: rec.len(),
                });
            }
            let date =
                parse_iso_date(&rec[self.date_col]).ok_or_else(|| TableError::BadDate {
                    row: self.records.len() + i,
                    value: rec[self.date_col].clone(),
                })?;
            self.records.push(rec);
            self.dates.push(date);
        }
        Ok(added)
    }

    /// Deduplicate by the given key columns, keeping the record merged last.
    /// Relative order of the surviving records is preserved. Returns how many
    /// duplicates were dropped.
    pub fn dedup_last(&mut self, key_columns: &[usize]) -> usize {
        let mut latest: HashMap<String, usize> = HashMap::with_capacity(self.records.len());
        for (i, rec) in self.records.iter().enumerate() {
            let key = key_columns
                .iter()
                .map(|&c| rec[c].as_str())
                .collect::<Vec<_>>()
                .join("\u{1f}");
            latest.insert(key, i);
        }

        if latest.len() == self.records.len() {
            return 0;
        }

        let mut keep: Vec<usize> = latest.into_values().collect();
        keep.sort_unstable();

        let removed = self.records.len() - keep.len();
        let mut records = Vec::with_capacity(keep.len());
        let mut dates = Vec::with_capacity(keep.len());
        for i in keep {
            records.push(std::mem::take(&mut self.records[i]));
            dates.push(self.dates[i]);
        }
        self.records = records;
        self.dates = dates;
        removed
    }

    /// Number of distinct values produced by the key columns. Matches `len()`
    /// exactly when the table is free of duplicate event keys.
    pub fn distinct_keys(&self, key_columns: &[usize]) -> usize {
        self.records
            .iter()
            .map(|rec| {
                key_columns
                    .iter()
                    .map(|&c| rec[c].as_str())
                    .collect::<Vec<_>>()
                    .join("\u{1f}")
            })
            .collect::<std::collections::HashSet<_>>()
            .len()
    }
}

/// Strict `YYYY-MM-DD` parse; anything else is rejected.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let headers = vec!["company".to_string(), "date".to_string(), "v".to_string()];
        let records = vec![
            vec!["a".into(), "2025-01-03".into(), "1".into()],
            vec!["b".into(), "2025-01-03".into(), "2".into()],
            vec!["a".into(), "2025-01-04".into(), "3".into()],
        ];
        Table::new(headers, records).unwrap()
    }

    #[test]
    fn missing_date_column_is_rejected() {
        let err = Table::new(
            vec!["company".into(), "v".into()],
            vec![vec!["a".into(), "1".into()]],
        )
        .unwrap_err();
        assert!(matches!(err, TableError::MissingDateColumn));
    }

    #[test]
    fn scraped_date_is_accepted_as_date_column() {
        let t = Table::new(
            vec!["company".into(), "scraped_date".into()],
            vec![vec!["a".into(), "2025-06-01".into()]],
        )
        .unwrap();
        assert_eq!(t.date_at(0), NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    }

    #[test]
    fn bad_date_is_rejected() {
        let err = Table::new(
            vec!["date".into()],
            vec![vec!["2025-01-01".into()], vec!["not-a-date".into()]],
        )
        .unwrap_err();
        assert!(matches!(err, TableError::BadDate { row: 1, .. }));
    }

    #[test]
    fn remove_date_drops_only_that_day() {
        let mut t = sample();
        let removed = t.remove_date(NaiveDate::from_ymd_opt(2025, 1, 3).unwrap());
        assert_eq!(removed, 2);
        assert_eq!(t.len(), 1);
        assert_eq!(t.records()[0][2], "3");
    }

    #[test]
    fn dedup_last_keeps_most_recent_merge() {
        let mut t = sample();
        t.append(vec![vec!["a".into(), "2025-01-03".into(), "9".into()]])
            .unwrap();
        // key = (company, date)
        let removed = t.dedup_last(&[0, 1]);
        assert_eq!(removed, 1);
        assert_eq!(t.len(), 3);
        let a_row = t
            .records()
            .iter()
            .find(|r| r[0] == "a" && r[1] == "2025-01-03")
            .unwrap();
        assert_eq!(a_row[2], "9");
    }

    #[test]
    fn dedup_is_noop_without_duplicates() {
        let mut t = sample();
        assert_eq!(t.dedup_last(&[0, 1]), 0);
        assert_eq!(t.len(), 3);
        assert_eq!(t.distinct_keys(&[0, 1]), 3);
    }

    #[test]
    fn append_rejects_ragged_rows() {
        let mut t = sample();
        let err = t
            .append(vec![vec!["a".into(), "2025-01-05".into()]])
            .unwrap_err();
        assert!(matches!(err, TableError::Ragged { .. }));
    }
}
