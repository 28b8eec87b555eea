//! Timestamp-indexed frame of named exogenous features.

use crate::core::time_series::validate_increasing;
use crate::error::{ForecastError, Result};
use chrono::{DateTime, Utc};

/// Rows of named scalar features, one row per timestamp.
///
/// Values are stored column-major: `columns[c][row]`. Every row carries a
/// value for every column; missing observations are NaN until removed with
/// [`FeatureFrame::drop_missing`].
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    timestamps: Vec<DateTime<Utc>>,
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
}

impl FeatureFrame {
    /// Create a frame from named columns.
    pub fn new(
        timestamps: Vec<DateTime<Utc>>,
        names: Vec<String>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: names.len(),
                got: columns.len(),
            });
        }
        for column in &columns {
            if column.len() != timestamps.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: timestamps.len(),
                    got: column.len(),
                });
            }
        }
        for (i, name) in names.iter().enumerate() {
            if names[..i].contains(name) {
                return Err(ForecastError::InvalidParameter(format!(
                    "duplicate feature column '{}'",
                    name
                )));
            }
        }
        validate_increasing(&timestamps)?;

        Ok(Self {
            timestamps,
            names,
            columns,
        })
    }

    /// Create a frame from row vectors (`rows[i][c]`).
    pub fn from_rows(
        timestamps: Vec<DateTime<Utc>>,
        names: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if rows.len() != timestamps.len() {
            return Err(ForecastError::DimensionMismatch {
                expected: timestamps.len(),
                got: rows.len(),
            });
        }
        for row in &rows {
            if row.len() != names.len() {
                return Err(ForecastError::DimensionMismatch {
                    expected: names.len(),
                    got: row.len(),
                });
            }
        }
        let columns = (0..names.len())
            .map(|c| rows.iter().map(|row| row[c]).collect())
            .collect();
        Self::new(timestamps, names, columns)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Number of feature columns.
    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Column names in storage order.
    pub fn columns(&self) -> &[String] {
        &self.names
    }

    /// Values of a named column.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|c| self.columns[c].as_slice())
    }

    /// All feature values at row `index`, in column order.
    pub fn row(&self, index: usize) -> Result<Vec<f64>> {
        if index >= self.len() {
            return Err(ForecastError::IndexOutOfBounds {
                index,
                size: self.len(),
            });
        }
        Ok(self.columns.iter().map(|col| col[index]).collect())
    }

    /// All rows, row-major.
    pub fn rows(&self) -> Vec<Vec<f64>> {
        (0..self.len())
            .map(|i| self.columns.iter().map(|col| col[i]).collect())
            .collect()
    }

    /// Drop every row that has a non-finite value in any column.
    pub fn drop_missing(&self) -> FeatureFrame {
        let keep: Vec<usize> = (0..self.len())
            .filter(|&i| self.columns.iter().all(|col| col[i].is_finite()))
            .collect();
        self.take(&keep)
    }

    /// Restrict the frame to the timestamps it shares with `timestamps`.
    pub fn align_to(&self, timestamps: &[DateTime<Utc>]) -> FeatureFrame {
        let mut keep = Vec::new();
        let (mut i, mut j) = (0, 0);

        while i < self.timestamps.len() && j < timestamps.len() {
            match self.timestamps[i].cmp(&timestamps[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    keep.push(i);
                    i += 1;
                    j += 1;
                }
            }
        }

        self.take(&keep)
    }

    /// Keep only the named columns, in the order given.
    pub fn select(&self, names: &[String]) -> Result<FeatureFrame> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            let column = self
                .column(name)
                .ok_or_else(|| ForecastError::MissingFeature(name.clone()))?;
            columns.push(column.to_vec());
        }

        Ok(FeatureFrame {
            timestamps: self.timestamps.clone(),
            names: names.to_vec(),
            columns,
        })
    }

    /// The last `n` rows (the whole frame when shorter).
    pub fn tail(&self, n: usize) -> FeatureFrame {
        let start = self.len().saturating_sub(n);
        let keep: Vec<usize> = (start..self.len()).collect();
        self.take(&keep)
    }

    fn take(&self, indices: &[usize]) -> FeatureFrame {
        FeatureFrame {
            timestamps: indices.iter().map(|&i| self.timestamps[i]).collect(),
            names: self.names.clone(),
            columns: self
                .columns
                .iter()
                .map(|col| indices.iter().map(|&i| col[i]).collect())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn make_timestamps(n: usize) -> Vec<DateTime<Utc>> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n).map(|i| base + Duration::hours(i as i64)).collect()
    }

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn feature_frame_builds_from_columns_and_rows() {
        let ts = make_timestamps(3);
        let by_columns = FeatureFrame::new(
            ts.clone(),
            names(&["dewpoint", "pressure"]),
            vec![vec![1.0, 2.0, 3.0], vec![1010.0, 1011.0, 1012.0]],
        )
        .unwrap();
        let by_rows = FeatureFrame::from_rows(
            ts,
            names(&["dewpoint", "pressure"]),
            vec![
                vec![1.0, 1010.0],
                vec![2.0, 1011.0],
                vec![3.0, 1012.0],
            ],
        )
        .unwrap();

        assert_eq!(by_columns, by_rows);
        assert_eq!(by_columns.width(), 2);
        assert_eq!(by_columns.row(1).unwrap(), vec![2.0, 1011.0]);
        assert_eq!(by_columns.column("pressure").unwrap()[2], 1012.0);
        assert!(by_columns.column("visibility").is_none());
    }

    #[test]
    fn feature_frame_validates_shape() {
        let ts = make_timestamps(3);
        assert!(FeatureFrame::new(ts.clone(), names(&["a"]), vec![vec![1.0, 2.0]]).is_err());
        assert!(FeatureFrame::new(ts.clone(), names(&["a", "b"]), vec![vec![1.0; 3]]).is_err());
        assert!(FeatureFrame::new(
            ts,
            names(&["a", "a"]),
            vec![vec![1.0; 3], vec![2.0; 3]]
        )
        .is_err());
    }

    #[test]
    fn drop_missing_removes_incomplete_rows() {
        let frame = FeatureFrame::new(
            make_timestamps(4),
            names(&["a", "b"]),
            vec![vec![1.0, f64::NAN, 3.0, 4.0], vec![1.0, 2.0, 3.0, f64::INFINITY]],
        )
        .unwrap();

        let clean = frame.drop_missing();
        assert_eq!(clean.len(), 2);
        assert_eq!(clean.column("a").unwrap(), &[1.0, 3.0]);
    }

    #[test]
    fn align_to_intersects_timestamps() {
        let ts = make_timestamps(6);
        let frame = FeatureFrame::new(ts.clone(), names(&["a"]), vec![(0..6).map(|i| i as f64).collect()])
            .unwrap();

        let aligned = frame.align_to(&ts[2..]);
        assert_eq!(aligned.len(), 4);
        assert_eq!(aligned.timestamps()[0], ts[2]);
        assert_eq!(aligned.column("a").unwrap(), &[2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn select_reorders_and_reports_missing_columns() {
        let frame = FeatureFrame::new(
            make_timestamps(2),
            names(&["a", "b", "c"]),
            vec![vec![1.0, 1.0], vec![2.0, 2.0], vec![3.0, 3.0]],
        )
        .unwrap();

        let picked = frame.select(&names(&["c", "a"])).unwrap();
        assert_eq!(picked.columns(), &["c", "a"]);
        assert_eq!(picked.row(0).unwrap(), vec![3.0, 1.0]);

        assert_eq!(
            frame.select(&names(&["wind"])),
            Err(ForecastError::MissingFeature("wind".to_string()))
        );
    }
}
