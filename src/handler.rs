//! Request handling independent of the transport.

use crate::error::PredictError;
use crate::models::inference::EnsemblePredictor;
use crate::types::request::PredictionRequest;
use crate::types::response::{ErrorReply, PredictionResult};
use std::sync::Arc;

/// What a single inbound payload turned into.
#[derive(Debug)]
pub enum Outcome {
    Predicted(PredictionResult),
    Failed(PredictError),
}

impl Outcome {
    /// JSON reply body for the caller.
    pub fn to_reply(&self) -> serde_json::Result<Vec<u8>> {
        match self {
            Outcome::Predicted(result) => serde_json::to_vec(result),
            Outcome::Failed(err) => serde_json::to_vec(&ErrorReply::from(err)),
        }
    }
}

/// Parses payloads and runs them through the ensemble.
#[derive(Clone)]
pub struct PredictionHandler {
    predictor: Arc<EnsemblePredictor>,
    lenient_age: bool,
}

impl PredictionHandler {
    pub fn new(predictor: Arc<EnsemblePredictor>, lenient_age: bool) -> Self {
        Self {
            predictor,
            lenient_age,
        }
    }

    pub fn predictor(&self) -> &EnsemblePredictor {
        &self.predictor
    }

    /// Malformed payloads fail before any classifier runs.
    pub fn handle(&self, payload: &[u8]) -> Outcome {
        let result = PredictionRequest::from_json(payload, self.lenient_age)
            .and_then(|request| self.predictor.predict(&request));

        match result {
            Ok(prediction) => Outcome::Predicted(prediction),
            Err(err) => Outcome::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClassifierError;
    use crate::models::classifier::{Classifier, ClassifierId};
    use crate::models::registry::ModelRegistry;
    use crate::schema::{FeatureSchema, LabelSchema};

    /// Votes "cold" when fever is absent, "flu" otherwise.
    fn handler() -> PredictionHandler {
        let fever: Box<dyn Classifier> = Box::new(|x: &[f32]| -> Result<usize, ClassifierError> {
            Ok(usize::from(x[2] == 0.0))
        });
        let flu: Box<dyn Classifier> =
            Box::new(|_: &[f32]| -> Result<usize, ClassifierError> { Ok(0) });

        let registry = ModelRegistry::from_parts(
            FeatureSchema::new(vec![
                "age".into(),
                "gender_male".into(),
                "fever".into(),
                "cough".into(),
            ])
            .unwrap(),
            LabelSchema::new(vec!["flu".into(), "cold".into()]).unwrap(),
            vec![
                (ClassifierId::RandomForest, fever),
                (ClassifierId::DecisionTree, flu),
            ],
        )
        .unwrap();
        PredictionHandler::new(Arc::new(EnsemblePredictor::new(Arc::new(registry))), false)
    }

    #[test]
    fn test_success_reply() {
        let outcome = handler().handle(br#"{"symptoms": {"fever": 1}, "age": 40}"#);
        let reply: serde_json::Value =
            serde_json::from_slice(&outcome.to_reply().unwrap()).unwrap();

        assert_eq!(reply["prediction"], "flu");
        assert_eq!(reply["confidence"], "100.0%");
        assert_eq!(reply["individual_predictions"]["rf"], "flu");
        assert_eq!(reply["individual_predictions"]["dt"], "flu");
        assert_eq!(reply["voting_method"], "majority");
    }

    #[test]
    fn test_tie_reply_follows_registry_order() {
        let outcome = handler().handle(br#"{"symptoms": {"cough": 1}}"#);
        let Outcome::Predicted(result) = outcome else {
            panic!("expected a prediction");
        };
        // rf votes cold, dt votes flu: rf is earlier in registry order
        assert_eq!(result.prediction, "cold");
        assert_eq!(result.confidence.to_string(), "50.0%");
    }

    #[test]
    fn test_malformed_reply() {
        let outcome = handler().handle(b"[1, 2]");
        assert!(matches!(
            outcome,
            Outcome::Failed(PredictError::MalformedRequest(_))
        ));

        let reply: serde_json::Value =
            serde_json::from_slice(&outcome.to_reply().unwrap()).unwrap();
        assert_eq!(reply["error"]["kind"], "malformed_request");
        assert_eq!(reply["error"]["status"], 400);
        assert!(reply.get("prediction").is_none());
    }
}
