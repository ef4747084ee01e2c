use std::fs;
use std::path::Path;

use csv::{Position, ReaderBuilder, StringRecord, Trim};
use ndarray::Array2;
use serde::Deserialize;

use super::{NUM_COLUMNS, NUM_FEATURES};
use crate::error::DatasetError;

/// A single labeled row
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IrisRecord {
    pub sepal_len: f32,
    pub sepal_width: f32,
    pub petal_len: f32,
    pub petal_width: f32,
    pub label: String,
}

/// A single unlabeled row
#[derive(Debug, Deserialize)]
struct FeatureRecord {
    sepal_len: f32,
    sepal_width: f32,
    petal_len: f32,
    petal_width: f32,
}

impl IrisRecord {
    fn features(&self) -> [f32; NUM_FEATURES] {
        [
            self.sepal_len,
            self.sepal_width,
            self.petal_len,
            self.petal_width,
        ]
    }
}

impl FeatureRecord {
    fn features(&self) -> [f32; NUM_FEATURES] {
        [
            self.sepal_len,
            self.sepal_width,
            self.petal_len,
            self.petal_width,
        ]
    }
}

/// Features and raw labels read from a labeled file.
#[derive(Debug, Clone)]
pub struct IrisTable {
    /// `[rows, 4]`
    pub features: Array2<f32>,
    pub labels: Vec<String>,
}

impl IrisTable {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// 1-based line of a record. The reader positions a record where the previous
/// one ended, so blank lines it skipped are added back.
fn line_of(content: &[u8], pos: &Position) -> usize {
    let start = usize::try_from(pos.byte()).map_or(content.len(), |b| b.min(content.len()));
    let skipped = content[start..]
        .iter()
        .take_while(|&&b| b == b'\n' || b == b'\r')
        .filter(|&&b| b == b'\n')
        .count();
    pos.line() as usize + skipped
}

fn read_rows(path: &Path) -> Result<Vec<(usize, StringRecord)>, DatasetError> {
    let content = fs::read(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(content.as_slice());

    let mut rows = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|source| DatasetError::Parse {
            row: source.position().map_or(idx + 1, |pos| line_of(&content, pos)),
            source,
        })?;
        let row = record.position().map_or(idx + 1, |pos| line_of(&content, pos));
        rows.push((row, record));
    }
    if rows.is_empty() {
        return Err(DatasetError::Empty {
            path: path.to_path_buf(),
        });
    }
    Ok(rows)
}

fn to_matrix(features: &[[f32; NUM_FEATURES]]) -> Array2<f32> {
    Array2::from_shape_fn((features.len(), NUM_FEATURES), |(i, j)| features[i][j])
}

/// Loads a labeled dataset: comma-separated, no header, exactly five columns
/// `sepal_len, sepal_width, petal_len, petal_width, label`.
///
/// # Arguments
/// * `path` - Path to the CSV file
///
/// # Returns
/// Feature matrix `[N x 4]` and the raw label of each row
pub fn load_dataset(path: &Path) -> Result<IrisTable, DatasetError> {
    let rows = read_rows(path)?;
    let mut features = Vec::with_capacity(rows.len());
    let mut labels = Vec::with_capacity(rows.len());

    for (row, record) in rows {
        if record.len() != NUM_COLUMNS {
            return Err(DatasetError::ColumnCount {
                row,
                found: record.len(),
                expected: NUM_COLUMNS,
            });
        }
        let parsed: IrisRecord = record
            .deserialize(None)
            .map_err(|source| DatasetError::Parse { row, source })?;
        features.push(parsed.features());
        labels.push(parsed.label);
    }

    tracing::debug!(path = %path.display(), rows = labels.len(), "Loaded dataset");
    Ok(IrisTable {
        features: to_matrix(&features),
        labels,
    })
}

/// Loads feature rows for prediction. Rows may have four columns, or five with a
/// trailing label that is ignored.
pub fn load_features(path: &Path) -> Result<Array2<f32>, DatasetError> {
    let rows = read_rows(path)?;
    let mut features = Vec::with_capacity(rows.len());

    for (row, record) in rows {
        let values = match record.len() {
            NUM_FEATURES => record
                .deserialize(None)
                .map(|r: FeatureRecord| r.features()),
            NUM_COLUMNS => record.deserialize(None).map(|r: IrisRecord| r.features()),
            found => {
                return Err(DatasetError::ColumnCount {
                    row,
                    found,
                    expected: NUM_FEATURES,
                })
            }
        }
        .map_err(|source| DatasetError::Parse { row, source })?;
        features.push(values);
    }

    Ok(to_matrix(&features))
}
