use fitchain_core::{Matrix, MlError};
use fitchain_data::Dataset;
use fitchain_preprocessing::LabelEncoder;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::error::{IoError, IoResult};

/// Read a labeled CSV file with a header row.
///
/// Every column except `label_column` must be numeric and becomes a
/// feature. Labels that all parse as numbers are used as-is; otherwise they
/// are encoded with [`LabelEncoder`] and the original strings become the
/// dataset's class names.
pub fn read_labeled_csv<P: AsRef<Path>>(path: P, label_column: &str) -> IoResult<Dataset> {
    let rdr = csv::Reader::from_path(path.as_ref())?;
    debug!(path = %path.as_ref().display(), "reading labeled csv");
    read_labeled(rdr, label_column)
}

/// Same as [`read_labeled_csv`] for any reader.
pub fn read_labeled_csv_from_reader<R: Read>(reader: R, label_column: &str) -> IoResult<Dataset> {
    read_labeled(csv::Reader::from_reader(reader), label_column)
}

fn read_labeled<R: Read>(mut rdr: csv::Reader<R>, label_column: &str) -> IoResult<Dataset> {
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let label_idx = headers
        .iter()
        .position(|h| h == label_column)
        .ok_or_else(|| IoError::MissingColumn(label_column.to_string()))?;
    let feature_names: Vec<String> = headers
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != label_idx)
        .map(|(_, h)| h.clone())
        .collect();

    let mut data = Vec::new();
    let mut raw_labels = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        // header is line 1
        let line = row + 2;
        for (j, field) in record.iter().enumerate() {
            let field = field.trim();
            if j == label_idx {
                raw_labels.push(field.to_string());
                continue;
            }
            let value: f64 = field.parse().map_err(|_| IoError::Parse {
                line,
                column: headers.get(j).cloned().unwrap_or_default(),
                value: field.to_string(),
            })?;
            data.push(value);
        }
    }

    let n_rows = raw_labels.len();
    if n_rows == 0 {
        return Err(MlError::EmptyData("CSV file has no data rows".into()).into());
    }
    let features = Matrix::new(data, n_rows, feature_names.len())?;

    let numeric: Option<Vec<f64>> = raw_labels.iter().map(|l| l.parse().ok()).collect();
    let dataset = match numeric {
        Some(labels) => Dataset::new(features, labels, feature_names)?,
        None => {
            let mut encoder = LabelEncoder::new();
            let labels: Vec<f64> = encoder.fit_transform(raw_labels.as_slice())?;
            Dataset::new(features, labels, feature_names)?
                .with_class_names(encoder.classes().to_vec())?
        }
    };
    debug!(
        rows = dataset.n_samples(),
        features = dataset.n_features(),
        "csv loaded"
    );
    Ok(dataset)
}
