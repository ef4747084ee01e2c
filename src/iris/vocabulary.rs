use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

pub const VOCABULARY_FORMAT_VERSION: u32 = 1;

/// Ordered class names. The index of a name is its integer label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelVocabulary {
    classes: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct VocabularyFile {
    format_version: u32,
    classes: Vec<String>,
}

impl LabelVocabulary {
    /// Builds a vocabulary from the distinct labels, in sorted order, so that row
    /// order never changes the mapping.
    pub fn from_labels<I, S>(labels: I) -> LabelVocabulary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let distinct: BTreeSet<String> = labels
            .into_iter()
            .map(|label| label.as_ref().to_owned())
            .collect();
        LabelVocabulary {
            classes: distinct.into_iter().collect(),
        }
    }

    /// Wraps an explicit class list, keeping its order. Names must be distinct.
    pub fn from_classes(classes: Vec<String>) -> Result<LabelVocabulary, String> {
        let mut seen = BTreeSet::new();
        for name in &classes {
            if !seen.insert(name.as_str()) {
                return Err(format!("duplicate class {name:?}"));
            }
        }
        Ok(LabelVocabulary { classes })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.classes.iter().position(|name| name == label)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    /// Maps each label to its index. Rows are reported 1-based.
    pub fn encode<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>, DatasetError> {
        labels
            .iter()
            .enumerate()
            .map(|(idx, label)| {
                self.index_of(label.as_ref())
                    .ok_or_else(|| DatasetError::UnknownLabel {
                        row: idx + 1,
                        label: label.as_ref().to_owned(),
                    })
            })
            .collect()
    }

    /// One-hot matrix `[codes.len(), self.len()]`.
    pub fn one_hot(&self, codes: &[usize]) -> Array2<f32> {
        let mut encoded = Array2::zeros((codes.len(), self.len()));
        for (row, &code) in codes.iter().enumerate() {
            encoded[[row, code]] = 1.0;
        }
        encoded
    }

    pub fn save(&self, path: &Path) -> Result<(), DatasetError> {
        let file = VocabularyFile {
            format_version: VOCABULARY_FORMAT_VERSION,
            classes: self.classes.clone(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(|source| {
            DatasetError::VocabularyJson {
                path: path.to_path_buf(),
                source,
            }
        })?;
        fs::write(path, json).map_err(|source| DatasetError::VocabularyIo {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<LabelVocabulary, DatasetError> {
        let bytes = fs::read(path).map_err(|source| DatasetError::VocabularyIo {
            path: path.to_path_buf(),
            source,
        })?;
        let file: VocabularyFile =
            serde_json::from_slice(&bytes).map_err(|source| DatasetError::VocabularyJson {
                path: path.to_path_buf(),
                source,
            })?;
        let invalid = |reason: String| DatasetError::VocabularyInvalid {
            path: path.to_path_buf(),
            reason,
        };
        if file.format_version != VOCABULARY_FORMAT_VERSION {
            return Err(invalid(format!(
                "unsupported format version {} (expected {})",
                file.format_version, VOCABULARY_FORMAT_VERSION
            )));
        }
        LabelVocabulary::from_classes(file.classes).map_err(invalid)
    }
}
