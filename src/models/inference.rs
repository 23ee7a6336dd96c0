//! Ensemble inference over every registered classifier

use crate::config::EncodingConfig;
use crate::error::PredictError;
use crate::feature_extractor::FeatureExtractor;
use crate::models::aggregator::VoteTally;
use crate::models::classifier::ClassifierId;
use crate::models::registry::ModelRegistry;
use crate::types::request::PredictionRequest;
use crate::types::response::{PredictionResult, VotingMethod};
use std::sync::Arc;
use tracing::{debug, error};

/// Majority-vote predictor over a shared, immutable registry.
///
/// Holds no per-request state; one instance serves any number of
/// concurrent callers.
pub struct EnsemblePredictor {
    registry: Arc<ModelRegistry>,
    extractor: FeatureExtractor,
}

impl EnsemblePredictor {
    /// Create a predictor using the default age and gender column names.
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        let extractor = FeatureExtractor::new(registry.feature_schema());
        Self {
            registry,
            extractor,
        }
    }

    /// Create a predictor with configured special column names.
    pub fn with_encoding(registry: Arc<ModelRegistry>, encoding: &EncodingConfig) -> Self {
        let extractor = FeatureExtractor::with_columns(
            registry.feature_schema(),
            &encoding.age_column,
            &encoding.gender_column,
        );
        Self {
            registry,
            extractor,
        }
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Get the number of voting classifiers
    pub fn model_count(&self) -> usize {
        self.registry.len()
    }

    /// Get voting classifier names in registry order
    pub fn model_names(&self) -> Vec<&'static str> {
        self.registry.classifier_ids().map(|id| id.name()).collect()
    }

    /// Build the feature vector for a request.
    pub fn features(&self, request: &PredictionRequest) -> Vec<f32> {
        self.extractor.extract(request)
    }

    /// Run every classifier on one feature vector.
    ///
    /// Any classifier failure fails the whole call; partial tallies are
    /// never returned.
    pub fn tally(&self, features: &[f32]) -> Result<VoteTally, PredictError> {
        let mut tally = VoteTally::new();
        for (id, classifier) in self.registry.iter() {
            let ordinal = classifier.predict(features).map_err(|source| {
                error!(classifier = %id, error = %source, "Classifier inference failed");
                PredictError::Classifier {
                    classifier: id,
                    source,
                }
            })?;
            tally.record(id, ordinal);
        }
        Ok(tally)
    }

    /// Predict a disease label for the request by majority vote.
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictError> {
        self.extractor.validate(request)?;
        let features = self.features(request);
        let tally = self.tally(&features)?;
        self.resolve(&tally)
    }

    /// Turn a complete tally into a labelled result.
    ///
    /// Every vote must resolve to a label, not only the winner's.
    pub fn resolve(&self, tally: &VoteTally) -> Result<PredictionResult, PredictError> {
        let individual_predictions = tally
            .votes()
            .iter()
            .map(|&(id, ordinal)| Ok((id, self.label(id, ordinal)?.to_string())))
            .collect::<Result<Vec<_>, PredictError>>()?;

        let verdict = tally.majority().ok_or(PredictError::NoVotes)?;
        let prediction = self.label(verdict.first_voter, verdict.ordinal)?.to_string();

        debug!(
            prediction = %prediction,
            votes = verdict.count,
            voters = verdict.total,
            "Ensemble vote complete"
        );

        Ok(PredictionResult {
            prediction,
            confidence: verdict.confidence(),
            individual_predictions,
            voting_method: VotingMethod::Majority,
        })
    }

    fn label(&self, classifier: ClassifierId, ordinal: usize) -> Result<&str, PredictError> {
        let labels = self.registry.label_schema();
        labels.label(ordinal).ok_or_else(|| {
            error!(
                classifier = %classifier,
                ordinal = ordinal,
                labels = labels.len(),
                "Ordinal has no label; classifier and label schema disagree"
            );
            PredictError::LabelResolution {
                classifier,
                ordinal,
                labels: labels.len(),
            }
        })
    }
}
