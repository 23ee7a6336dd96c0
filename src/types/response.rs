//! Prediction results and reply envelopes

use crate::error::PredictError;
use crate::models::classifier::ClassifierId;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::fmt;

/// Aggregation strategy that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VotingMethod {
    Majority,
}

/// Share of classifiers agreeing with the winner, in hundredths of a percent.
///
/// Renders the way a float percentage rounded to two places prints:
/// `100.0%`, `66.67%`, `12.5%`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Confidence {
    hundredths: u32,
}

impl Confidence {
    /// `count / total * 100`, rounded half-up to two decimal places.
    ///
    /// Stays within `(0, 100]` and reaches 100 only when `count == total`.
    /// Callers guarantee `0 < count <= total`.
    pub(crate) fn from_votes(count: usize, total: usize) -> Self {
        assert!(
            total > 0 && count > 0 && count <= total,
            "invalid vote share {}/{}",
            count,
            total
        );
        let (count, total) = (count as u64, total as u64);
        let mut hundredths = (count * 20_000 + total) / (2 * total);
        if count < total {
            hundredths = hundredths.min(9_999);
        }
        Self {
            hundredths: hundredths.max(1) as u32,
        }
    }

    pub fn as_percent(&self) -> f64 {
        self.hundredths as f64 / 100.0
    }

    pub fn hundredths(&self) -> u32 {
        self.hundredths
    }

    pub fn is_unanimous(&self) -> bool {
        self.hundredths == 10_000
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.hundredths / 100;
        let frac = self.hundredths % 100;
        if frac == 0 {
            write!(f, "{}.0%", whole)
        } else if frac % 10 == 0 {
            write!(f, "{}.{}%", whole, frac / 10)
        } else {
            write!(f, "{}.{:02}%", whole, frac)
        }
    }
}

impl Serialize for Confidence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of one ensemble prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Winning disease label
    pub prediction: String,
    pub confidence: Confidence,
    /// Each classifier's label, in registry order
    #[serde(serialize_with = "ordered_map")]
    pub individual_predictions: Vec<(ClassifierId, String)>,
    pub voting_method: VotingMethod,
}

impl PredictionResult {
    pub fn individual(&self, id: ClassifierId) -> Option<&str> {
        self.individual_predictions
            .iter()
            .find(|(c, _)| *c == id)
            .map(|(_, label)| label.as_str())
    }
}

fn ordered_map<S: Serializer>(
    entries: &[(ClassifierId, String)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(entries.len()))?;
    for (id, label) in entries {
        map.serialize_entry(id.name(), label)?;
    }
    map.end()
}

/// Error reply sent back in place of a result.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReply {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub status: u16,
    pub message: String,
}

impl From<&PredictError> for ErrorReply {
    fn from(err: &PredictError) -> Self {
        Self {
            error: ErrorBody {
                kind: err.kind(),
                status: err.status(),
                message: err.to_string(),
            },
        }
    }
}
