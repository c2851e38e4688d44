//! Labeled numeric series input for the CUSUM filter
//!
//! The first column holds the row label (a timestamp, a date, a bar number);
//! the value column and an optional per-row threshold column are chosen by
//! name.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use tickbars_core::{CusumThreshold, RowError, SourceError};

/// Values keyed by their row label, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledSeries {
    pub values: Vec<(String, f64)>,

    /// Per-row thresholds when a threshold column was requested
    pub thresholds: Option<Vec<f64>>,

    pub rejected: Vec<RowError>,
}

impl LabeledSeries {
    /// Threshold for a scan: the per-row column if present, else `fixed`
    pub fn threshold(&self, fixed: f64) -> CusumThreshold {
        match &self.thresholds {
            Some(ts) => CusumThreshold::PerIndex(ts.clone()),
            None => CusumThreshold::Fixed(fixed),
        }
    }
}

/// Read a labeled series from a CSV file
///
/// Rows with a missing or unparsable value (or threshold) are rejected and
/// skipped, keeping values and thresholds aligned.
pub fn read_series<P: AsRef<Path>>(
    path: P,
    value_column: &str,
    threshold_column: Option<&str>,
) -> Result<LabeledSeries, SourceError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| SourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_series_from(file, path, value_column, threshold_column)
}

pub fn read_series_from<R: Read>(
    reader: R,
    path: &Path,
    value_column: &str,
    threshold_column: Option<&str>,
) -> Result<LabeledSeries, SourceError> {
    let read_err = |e: csv::Error| SourceError::Read {
        path: path.to_path_buf(),
        source: Box::new(e),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader.headers().map_err(read_err)?.clone();
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| SourceError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
    };
    let value_idx = find(value_column)?;
    let threshold_idx = threshold_column.map(find).transpose()?;

    let mut series = LabeledSeries {
        thresholds: threshold_idx.map(|_| Vec::new()),
        ..Default::default()
    };

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Utf8 { .. }) => {
                let line = e.position().map_or(0, |p| p.line());
                let message = e.to_string();
                tracing::warn!(path = %path.display(), line, error = %message, "rejected series row");
                series.rejected.push(RowError { line, message });
                continue;
            }
            Err(e) => return Err(read_err(e)),
        };
        let line = record.position().map_or(0, |p| p.line());
        let label = record.get(0).unwrap_or_default().to_string();

        let parse = |idx: usize, name: &str| -> Result<f64, String> {
            let raw = record.get(idx).unwrap_or_default();
            raw.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("invalid {name} '{raw}'"))
        };

        let parsed = parse(value_idx, value_column).and_then(|value| {
            let threshold = match threshold_idx {
                Some(idx) => Some(parse(idx, "threshold")?),
                None => None,
            };
            Ok((value, threshold))
        });

        match parsed {
            Ok((value, threshold)) => {
                series.values.push((label, value));
                if let (Some(ts), Some(t)) = (series.thresholds.as_mut(), threshold) {
                    ts.push(t);
                }
            }
            Err(message) => {
                tracing::warn!(path = %path.display(), line, error = %message, "rejected series row");
                series.rejected.push(RowError { line, message });
            }
        }
    }

    tracing::debug!(
        path = %path.display(),
        values = series.values.len(),
        rejected = series.rejected.len(),
        "series read"
    );
    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickbars_core::CusumFilter;

    #[test]
    fn test_series_with_fixed_threshold() {
        let text = "date,close\n\
                    d0,0\nd1,1\nd2,2\nd3,0\nd4,-3\nd5,-3\nd6,5\n";
        let series =
            read_series_from(text.as_bytes(), Path::new("memory.csv"), "close", None).unwrap();
        assert_eq!(series.values.len(), 7);

        let events = CusumFilter::scan(&series.values, &series.threshold(2.0)).unwrap();
        assert_eq!(events, vec!["d4".to_string(), "d6".to_string()]);
    }

    #[test]
    fn test_series_with_threshold_column_and_bad_row() {
        let text = "t,v,h\n0,10,1\n1,oops,1\n2,12.5,1\n3,12.5,bad\n";
        let series =
            read_series_from(text.as_bytes(), Path::new("memory.csv"), "v", Some("h")).unwrap();
        assert_eq!(series.values.len(), 2);
        assert_eq!(series.thresholds, Some(vec![1.0, 1.0]));
        assert_eq!(
            series.rejected.iter().map(|r| r.line).collect::<Vec<_>>(),
            vec![3, 5]
        );
    }

    #[test]
    fn test_non_utf8_row_is_rejected() {
        let mut bytes = b"t,v\n0,1\n1,".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        bytes.extend_from_slice(b"\n2,3\n");

        let series = read_series_from(bytes.as_slice(), Path::new("memory.csv"), "v", None).unwrap();
        assert_eq!(
            series.values,
            vec![("0".to_string(), 1.0), ("2".to_string(), 3.0)]
        );
        assert_eq!(series.rejected.len(), 1);
        assert_eq!(series.rejected[0].line, 3);
    }

    #[test]
    fn test_missing_value_column() {
        let result = read_series_from("t,v\n0,1\n".as_bytes(), Path::new("memory.csv"), "close", None);
        assert!(matches!(result, Err(SourceError::MissingColumn { .. })));
    }
}
