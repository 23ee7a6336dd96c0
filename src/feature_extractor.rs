//! Feature extraction for classifier inference.
//!
//! Builds the vector in feature-schema order so it lines up with the column
//! layout every classifier was trained on.

use crate::error::PredictError;
use crate::schema::FeatureSchema;
use crate::types::request::PredictionRequest;

/// Name of the numeric age column.
pub const AGE_COLUMN: &str = "age";

/// Name of the derived male-gender indicator column.
pub const GENDER_COLUMN: &str = "gender_male";

/// How one schema position is filled.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Age,
    GenderMale,
    Symptom(String),
}

/// Feature extractor that transforms requests into model input vectors.
///
/// The schema is resolved into slots once; extraction walks the slots and
/// never consults request keys that are not in the schema.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    slots: Vec<Slot>,
}

impl FeatureExtractor {
    /// Create an extractor using the default special column names.
    pub fn new(schema: &FeatureSchema) -> Self {
        Self::with_columns(schema, AGE_COLUMN, GENDER_COLUMN)
    }

    /// Create an extractor with custom names for the age and gender columns.
    pub fn with_columns(schema: &FeatureSchema, age_column: &str, gender_column: &str) -> Self {
        let slots = schema
            .columns()
            .iter()
            .map(|c| {
                if c == age_column {
                    Slot::Age
                } else if c == gender_column {
                    Slot::GenderMale
                } else {
                    Slot::Symptom(c.clone())
                }
            })
            .collect();
        Self { slots }
    }

    /// Reject a request whose schema symptom columns hold non-integer values.
    ///
    /// Keys outside the schema are never looked at.
    pub fn validate(&self, request: &PredictionRequest) -> Result<(), PredictError> {
        for slot in &self.slots {
            if let Slot::Symptom(name) = slot {
                if let Some(raw) = request.unreadable_symptom(name) {
                    return Err(PredictError::MalformedRequest(format!(
                        "symptom '{}' has non-integer value {}",
                        name, raw
                    )));
                }
            }
        }
        Ok(())
    }

    /// Extract features from a request.
    ///
    /// - age column: `request.age`, 30 when absent
    /// - gender column: 1 when gender is exactly `"M"` (the default), else 0
    /// - symptom columns: the request's flag, 0 when absent
    pub fn extract(&self, request: &PredictionRequest) -> Vec<f32> {
        let male = request.effective_gender() == "M";

        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Age => request.effective_age() as f32,
                Slot::GenderMale => {
                    if male {
                        1.0
                    } else {
                        0.0
                    }
                }
                Slot::Symptom(name) => request.symptoms.get(name).copied().unwrap_or(0) as f32,
            })
            .collect()
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        self.slots.len()
    }
}
