mod common;

use common::*;
use std::sync::Arc;
use symptom_ensemble::models::{ClassifierId, EnsemblePredictor, ModelRegistry};
use symptom_ensemble::{PredictError, PredictionHandler, PredictionRequest};

fn predictor_with(models: &[(&str, serde_json::Value)]) -> EnsemblePredictor {
    let dir = tempfile::tempdir().unwrap();
    write_schemas(dir.path());
    for (stem, model) in models {
        write_model(dir.path(), stem, &envelope(model.clone()));
    }
    let registry = ModelRegistry::load(&models_config(dir.path())).unwrap();
    EnsemblePredictor::new(Arc::new(registry))
}

fn all_three(rf: usize, dt: usize, lr: usize) -> EnsemblePredictor {
    predictor_with(&[
        ("randomforest_model", constant_tree(rf)),
        ("decisiontree_model", constant_tree(dt)),
        ("logisticregression_model", constant_tree(lr)),
    ])
}

#[test]
fn unanimous_vote_is_full_confidence() {
    let predictor = all_three(0, 0, 0);
    let request = PredictionRequest::new().with_symptom("fever", 1);

    let result = predictor.predict(&request).unwrap();
    assert_eq!(result.prediction, "flu");
    assert_eq!(result.confidence.to_string(), "100.0%");
}

#[test]
fn two_of_three_vote() {
    let predictor = all_three(0, 0, 1);

    let result = predictor.predict(&PredictionRequest::new()).unwrap();
    assert_eq!(result.prediction, "flu");
    assert_eq!(result.confidence.to_string(), "66.67%");
    assert_eq!(result.individual(ClassifierId::LogisticRegression), Some("cold"));
}

#[test]
fn omitted_age_encodes_as_thirty() {
    let predictor = all_three(0, 0, 0);
    let request = PredictionRequest::new().with_symptom("cough", 1);

    let features = predictor.features(&request);
    assert_eq!(features[0], 30.0);
    assert_eq!(
        features,
        predictor.features(&request.clone().with_age(30).with_gender("M"))
    );
}

#[test]
fn unknown_symptom_is_ignored() {
    let predictor = all_three(0, 0, 1);
    let base = PredictionRequest::new().with_symptom("fever", 1);
    let extra = base.clone().with_symptom("third_eye", 1);

    assert_eq!(predictor.features(&base), predictor.features(&extra));
    assert_eq!(
        predictor.predict(&base).unwrap(),
        predictor.predict(&extra).unwrap()
    );
}

#[test]
fn unknown_symptom_with_free_text_value_is_ignored() {
    let handler = PredictionHandler::new(Arc::new(all_three(0, 0, 1)), false);

    let outcome = handler.handle(br#"{"symptoms": {"fever": 1, "notes": "itchy"}}"#);
    let symptom_ensemble::Outcome::Predicted(result) = outcome else {
        panic!("expected a prediction");
    };
    assert_eq!(result.prediction, "flu");

    // the same value on a schema column is still a client error
    match handler.handle(br#"{"symptoms": {"fever": "itchy"}}"#) {
        symptom_ensemble::Outcome::Failed(err) => assert!(err.is_client_error()),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn repeated_predictions_are_identical() {
    let predictor = predictor_with(&[
        ("randomforest_model", fever_forest()),
        ("decisiontree_model", fever_tree()),
        ("logisticregression_model", cough_logistic()),
    ]);
    let request = PredictionRequest::new()
        .with_symptom("fever", 1)
        .with_symptom("cough", 1)
        .with_age(61);

    let first = predictor.predict(&request).unwrap();
    for _ in 0..10 {
        assert_eq!(predictor.predict(&request).unwrap(), first);
    }
}

#[test]
fn real_models_vote_on_symptoms() {
    let predictor = predictor_with(&[
        ("randomforest_model", fever_forest()),
        ("decisiontree_model", fever_tree()),
        ("logisticregression_model", cough_logistic()),
    ]);

    // fever only: every model says flu
    let fever = predictor
        .predict(&PredictionRequest::new().with_symptom("fever", 1))
        .unwrap();
    assert_eq!(fever.prediction, "flu");
    assert_eq!(fever.confidence.to_string(), "100.0%");

    // cough only: trees say cold (no fever), logistic says cold
    let cough = predictor
        .predict(&PredictionRequest::new().with_symptom("cough", 1))
        .unwrap();
    assert_eq!(cough.prediction, "cold");

    // nothing reported: trees say cold, logistic says flu
    let quiet = predictor.predict(&PredictionRequest::new()).unwrap();
    assert_eq!(quiet.prediction, "cold");
    assert_eq!(quiet.confidence.to_string(), "66.67%");
    assert_eq!(quiet.individual(ClassifierId::LogisticRegression), Some("flu"));
}

#[test]
fn tie_resolves_to_earliest_classifier() {
    let predictor = predictor_with(&[
        ("decisiontree_model", constant_tree(1)),
        ("logisticregression_model", constant_tree(0)),
    ]);

    let result = predictor.predict(&PredictionRequest::new()).unwrap();
    assert_eq!(result.prediction, "cold");
    assert_eq!(result.confidence.to_string(), "50.0%");
}

#[test]
fn confidence_stays_in_bounds() {
    for (rf, dt, lr) in [(0, 0, 0), (0, 0, 1), (0, 1, 0), (1, 0, 0), (1, 1, 0), (1, 1, 1)] {
        let result = all_three(rf, dt, lr)
            .predict(&PredictionRequest::new())
            .unwrap();
        let pct = result.confidence.as_percent();
        assert!(pct > 0.0 && pct <= 100.0);
        assert_eq!(result.confidence.is_unanimous(), rf == dt && dt == lr);
    }
}

#[test]
fn handler_rejects_malformed_payload_before_voting() {
    let handler = PredictionHandler::new(Arc::new(all_three(0, 0, 0)), false);

    for payload in [&b"not json"[..], b"42", br#"{"age": "old"}"#, br#"{"symptoms": 1}"#] {
        match handler.handle(payload) {
            symptom_ensemble::Outcome::Failed(err) => {
                assert!(matches!(err, PredictError::MalformedRequest(_)));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}

#[test]
fn handler_reply_matches_wire_shape() {
    let handler = PredictionHandler::new(Arc::new(all_three(0, 0, 1)), false);
    let outcome = handler.handle(br#"{"symptoms": {"fever": 1, "cough": 0}}"#);

    let reply: serde_json::Value = serde_json::from_slice(&outcome.to_reply().unwrap()).unwrap();
    assert_eq!(
        reply,
        serde_json::json!({
            "prediction": "flu",
            "confidence": "66.67%",
            "individual_predictions": {"rf": "flu", "dt": "flu", "lr": "cold"},
            "voting_method": "majority"
        })
    );
}
