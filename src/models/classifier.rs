//! Classifier identities and the prediction capability they share.

use crate::error::ClassifierError;
use serde::Serialize;
use std::fmt;

/// Closed set of classifiers the service knows how to load.
///
/// Declaration order is registry order: it fixes both the order of
/// `individual_predictions` and the majority-vote tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ClassifierId {
    #[serde(rename = "rf")]
    RandomForest,
    #[serde(rename = "dt")]
    DecisionTree,
    #[serde(rename = "lr")]
    LogisticRegression,
}

impl ClassifierId {
    pub const ALL: [ClassifierId; 3] = [
        ClassifierId::RandomForest,
        ClassifierId::DecisionTree,
        ClassifierId::LogisticRegression,
    ];

    /// Short name used in responses and logs.
    pub fn name(&self) -> &'static str {
        match self {
            ClassifierId::RandomForest => "rf",
            ClassifierId::DecisionTree => "dt",
            ClassifierId::LogisticRegression => "lr",
        }
    }

    /// Artifact file stem written by the training pipeline.
    pub fn artifact_stem(&self) -> &'static str {
        match self {
            ClassifierId::RandomForest => "randomforest_model",
            ClassifierId::DecisionTree => "decisiontree_model",
            ClassifierId::LogisticRegression => "logisticregression_model",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.name() == name)
    }
}

impl fmt::Display for ClassifierId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A trained model that maps one feature vector to one label ordinal.
pub trait Classifier: Send + Sync {
    /// Predict the label ordinal for a single feature vector.
    fn predict(&self, features: &[f32]) -> Result<usize, ClassifierError>;

    /// Input width the model was trained on, when the artifact records it.
    fn n_features(&self) -> Option<usize>;

    /// Number of ordinals the model can emit, when the artifact records it.
    fn n_classes(&self) -> Option<usize>;
}

impl<F> Classifier for F
where
    F: Fn(&[f32]) -> Result<usize, ClassifierError> + Send + Sync,
{
    fn predict(&self, features: &[f32]) -> Result<usize, ClassifierError> {
        self(features)
    }

    fn n_features(&self) -> Option<usize> {
        None
    }

    fn n_classes(&self) -> Option<usize> {
        None
    }
}
