//! Feature and label schemas shared by every classifier.
//!
//! Both schemas are produced by the training pipeline alongside the model
//! artifacts. Their order is significant: the feature schema fixes vector
//! positions, the label schema fixes which disease each ordinal stands for.

use crate::error::StartupError;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Lowercase hex BLAKE3 digest over each entry followed by a newline byte.
pub fn fingerprint<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = blake3::Hasher::new();
    for entry in entries {
        hasher.update(entry.as_bytes());
        hasher.update(b"\n");
    }
    hasher.finalize().to_hex().to_string()
}

/// Ordered feature-column names defining the feature vector layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    columns: Vec<String>,
    fingerprint: String,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Result<Self, StartupError> {
        if columns.is_empty() {
            return Err(StartupError::InvalidSchema {
                what: "feature schema",
                reason: "no columns".to_string(),
            });
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(StartupError::InvalidSchema {
                    what: "feature schema",
                    reason: format!("duplicate column '{}'", column),
                });
            }
        }

        let fingerprint = fingerprint(columns.iter().map(String::as_str));
        Ok(Self {
            columns,
            fingerprint,
        })
    }

    /// Load from a JSON array of strings.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StartupError> {
        let columns: Vec<String> = read_json(path.as_ref(), "feature schema")?;
        Self::new(columns)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

#[derive(Deserialize)]
struct LabelMap {
    classes: Vec<String>,
}

/// Ordered class names; position is the ordinal a classifier emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSchema {
    classes: Vec<String>,
    fingerprint: String,
}

impl LabelSchema {
    pub fn new(classes: Vec<String>) -> Result<Self, StartupError> {
        if classes.is_empty() {
            return Err(StartupError::InvalidSchema {
                what: "label schema",
                reason: "no classes".to_string(),
            });
        }

        let fingerprint = fingerprint(classes.iter().map(String::as_str));
        Ok(Self {
            classes,
            fingerprint,
        })
    }

    /// Load from a JSON object holding the class list under `classes`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StartupError> {
        let map: LabelMap = read_json(path.as_ref(), "label schema")?;
        Self::new(map.classes)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Resolve an ordinal to its label, if in range.
    pub fn label(&self, ordinal: usize) -> Option<&str> {
        self.classes.get(ordinal).map(String::as_str)
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
    what: &'static str,
) -> Result<T, StartupError> {
    let raw = fs::read(path).map_err(|source| StartupError::Io {
        what,
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&raw).map_err(|source| StartupError::Parse {
        what,
        path: path.to_path_buf(),
        source,
    })
}
