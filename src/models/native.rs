//! Pure-Rust evaluators for JSON-exported tree and linear classifiers.
//!
//! The layouts mirror what the training pipeline exports from fitted
//! estimators: trees as parallel node arrays, linear models as a coefficient
//! matrix plus intercepts.

use crate::error::ClassifierError;
use crate::models::classifier::{Classifier, ClassifierId};
use serde::Deserialize;

const LEAF: i64 = -1;

/// Envelope every native artifact is wrapped in.
#[derive(Debug, Clone, Deserialize)]
pub struct NativeArtifact {
    pub format_version: u32,
    #[serde(default)]
    pub feature_checksum: Option<String>,
    #[serde(default)]
    pub label_checksum: Option<String>,
    pub model: NativeModel,
}

pub const NATIVE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NativeModel {
    DecisionTree(DecisionTree),
    RandomForest(RandomForest),
    LogisticRegression(LogisticRegression),
}

impl NativeModel {
    /// Check internal consistency so `predict` can index without bounds
    /// failures.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            NativeModel::DecisionTree(tree) => tree.validate(),
            NativeModel::RandomForest(forest) => forest.validate(),
            NativeModel::LogisticRegression(lr) => lr.validate(),
        }
    }

    /// Registry slot this estimator family normally fills.
    pub fn family(&self) -> ClassifierId {
        match self {
            NativeModel::DecisionTree(_) => ClassifierId::DecisionTree,
            NativeModel::RandomForest(_) => ClassifierId::RandomForest,
            NativeModel::LogisticRegression(_) => ClassifierId::LogisticRegression,
        }
    }

    pub fn into_classifier(self) -> Box<dyn Classifier> {
        match self {
            NativeModel::DecisionTree(tree) => Box::new(tree),
            NativeModel::RandomForest(forest) => Box::new(forest),
            NativeModel::LogisticRegression(lr) => Box::new(lr),
        }
    }
}

fn check_width(expected: usize, features: &[f32]) -> Result<(), ClassifierError> {
    if features.len() != expected {
        return Err(ClassifierError::FeatureCount {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

/// Index of the largest value; the first index wins ties.
fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Binary decision tree stored as parallel node arrays rooted at node 0.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub n_features: usize,
    pub n_classes: usize,
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (counts or fractions), `n_classes` wide.
    pub value: Vec<Vec<f64>>,
}

impl DecisionTree {
    fn validate(&self) -> Result<(), String> {
        let nodes = self.children_left.len();
        if nodes == 0 {
            return Err("decision tree has no nodes".to_string());
        }
        if self.n_classes == 0 {
            return Err("decision tree has zero classes".to_string());
        }
        if self.children_right.len() != nodes
            || self.feature.len() != nodes
            || self.threshold.len() != nodes
            || self.value.len() != nodes
        {
            return Err(format!(
                "node arrays disagree in length (children_left has {})",
                nodes
            ));
        }

        for node in 0..nodes {
            let left = self.children_left[node];
            let right = self.children_right[node];

            if left == LEAF || right == LEAF {
                if left != right {
                    return Err(format!("node {} has exactly one child", node));
                }
                if self.value[node].len() != self.n_classes {
                    return Err(format!(
                        "leaf {} has {} class weights, expected {}",
                        node,
                        self.value[node].len(),
                        self.n_classes
                    ));
                }
                continue;
            }

            // Children always follow their parent, which rules out cycles.
            for child in [left, right] {
                if child <= node as i64 || child >= nodes as i64 {
                    return Err(format!("node {} has invalid child {}", node, child));
                }
            }

            let feature = self.feature[node];
            if feature < 0 || feature as usize >= self.n_features {
                return Err(format!(
                    "node {} splits on feature {} but the model has {} features",
                    node, feature, self.n_features
                ));
            }
        }

        Ok(())
    }

    fn leaf(&self, features: &[f32]) -> usize {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let value = features[self.feature[node] as usize] as f64;
            node = if value <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        node
    }

    /// Normalized class distribution at the leaf reached by `features`.
    fn distribution(&self, features: &[f32]) -> Vec<f64> {
        let weights = &self.value[self.leaf(features)];
        let total: f64 = weights.iter().sum();
        if total > 0.0 {
            weights.iter().map(|w| w / total).collect()
        } else {
            weights.clone()
        }
    }
}

impl Classifier for DecisionTree {
    fn predict(&self, features: &[f32]) -> Result<usize, ClassifierError> {
        check_width(self.n_features, features)?;
        argmax(&self.value[self.leaf(features)]).ok_or(ClassifierError::EmptyOutput)
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn n_classes(&self) -> Option<usize> {
        Some(self.n_classes)
    }
}

/// Forest that averages per-tree leaf distributions (soft voting).
#[derive(Debug, Clone, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("random forest has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if tree.n_features != self.n_features || tree.n_classes != self.n_classes {
                return Err(format!(
                    "tree {} has shape {}x{}, forest expects {}x{}",
                    i, tree.n_features, tree.n_classes, self.n_features, self.n_classes
                ));
            }
            tree.validate().map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn predict(&self, features: &[f32]) -> Result<usize, ClassifierError> {
        check_width(self.n_features, features)?;

        let mut mean = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in mean.iter_mut().zip(tree.distribution(features)) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        mean.iter_mut().for_each(|p| *p /= n);

        argmax(&mean).ok_or(ClassifierError::EmptyOutput)
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn n_classes(&self) -> Option<usize> {
        Some(self.n_classes)
    }
}

/// Linear model over the raw feature vector.
///
/// One coefficient row means a binary model whose positive class is
/// ordinal 1; k rows mean one-vs-rest or multinomial scores over k classes.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticRegression {
    pub n_features: usize,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LogisticRegression {
    fn validate(&self) -> Result<(), String> {
        if self.coef.is_empty() {
            return Err("logistic regression has no coefficient rows".to_string());
        }
        if self.intercept.len() != self.coef.len() {
            return Err(format!(
                "{} coefficient rows but {} intercepts",
                self.coef.len(),
                self.intercept.len()
            ));
        }
        for (i, row) in self.coef.iter().enumerate() {
            if row.len() != self.n_features {
                return Err(format!(
                    "coefficient row {} has {} entries, expected {}",
                    i,
                    row.len(),
                    self.n_features
                ));
            }
        }
        Ok(())
    }

    fn decision(&self, features: &[f32]) -> Vec<f64> {
        self.coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, b)| {
                row.iter()
                    .zip(features)
                    .map(|(w, &x)| w * x as f64)
                    .sum::<f64>()
                    + b
            })
            .collect()
    }
}

impl Classifier for LogisticRegression {
    fn predict(&self, features: &[f32]) -> Result<usize, ClassifierError> {
        check_width(self.n_features, features)?;

        let scores = self.decision(features);
        if scores.len() == 1 {
            return Ok(usize::from(scores[0] > 0.0));
        }
        argmax(&scores).ok_or(ClassifierError::EmptyOutput)
    }

    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn n_classes(&self) -> Option<usize> {
        Some(if self.coef.len() == 1 { 2 } else { self.coef.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Splits on feature 2 (fever): absent -> class 1, present -> class 0.
    fn fever_stump() -> DecisionTree {
        DecisionTree {
            n_features: 4,
            n_classes: 2,
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![2, -2, -2],
            threshold: vec![0.5, -2.0, -2.0],
            value: vec![vec![5.0, 5.0], vec![1.0, 4.0], vec![4.0, 1.0]],
        }
    }

    #[test]
    fn test_model_family() {
        let tree = NativeModel::DecisionTree(fever_stump());
        assert_eq!(tree.family(), ClassifierId::DecisionTree);

        let forest = NativeModel::RandomForest(RandomForest {
            n_features: 4,
            n_classes: 2,
            trees: vec![fever_stump()],
        });
        assert_eq!(forest.family(), ClassifierId::RandomForest);
    }

    #[test]
    fn test_decision_tree_walk() {
        let tree = fever_stump();
        tree.validate().unwrap();
        assert_eq!(tree.predict(&[30.0, 1.0, 1.0, 0.0]).unwrap(), 0);
        assert_eq!(tree.predict(&[30.0, 1.0, 0.0, 0.0]).unwrap(), 1);
    }

    #[test]
    fn test_decision_tree_rejects_wrong_width() {
        let err = fever_stump().predict(&[1.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            ClassifierError::FeatureCount {
                expected: 4,
                actual: 2
            }
        ));
    }

    #[test]
    fn test_decision_tree_validation() {
        let mut backwards = fever_stump();
        backwards.children_left[0] = 0;
        assert!(backwards.validate().unwrap_err().contains("invalid child"));

        let mut bad_feature = fever_stump();
        bad_feature.feature[0] = 9;
        assert!(bad_feature.validate().is_err());

        let mut ragged = fever_stump();
        ragged.threshold.pop();
        assert!(ragged.validate().is_err());
    }

    #[test]
    fn test_argmax_prefers_first_on_tie() {
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[0.1, 0.7, 0.7]), Some(1));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_random_forest_soft_vote() {
        let mut flipped = fever_stump();
        flipped.value = vec![vec![5.0, 5.0], vec![4.0, 1.0], vec![1.0, 4.0]];
        let mut sure = fever_stump();
        sure.value = vec![vec![5.0, 5.0], vec![0.0, 10.0], vec![10.0, 0.0]];

        // fever absent: stump 0.8 for class 1, flipped 0.2, sure 1.0 -> class 1
        let forest = RandomForest {
            n_features: 4,
            n_classes: 2,
            trees: vec![fever_stump(), flipped, sure],
        };
        forest.validate().unwrap();
        assert_eq!(forest.predict(&[30.0, 1.0, 0.0, 0.0]).unwrap(), 1);
        assert_eq!(forest.predict(&[30.0, 1.0, 1.0, 0.0]).unwrap(), 0);
    }

    #[test]
    fn test_random_forest_shape_mismatch() {
        let mut tree = fever_stump();
        tree.n_features = 5;
        let forest = RandomForest {
            n_features: 4,
            n_classes: 2,
            trees: vec![tree],
        };
        assert!(forest.validate().is_err());
    }

    #[test]
    fn test_logistic_regression_binary() {
        let lr = LogisticRegression {
            n_features: 2,
            coef: vec![vec![2.0, -1.0]],
            intercept: vec![-0.5],
        };
        lr.validate().unwrap();
        assert_eq!(lr.n_classes(), Some(2));
        assert_eq!(lr.predict(&[1.0, 0.0]).unwrap(), 1);
        assert_eq!(lr.predict(&[0.0, 1.0]).unwrap(), 0);
    }

    #[test]
    fn test_logistic_regression_multiclass() {
        let lr = LogisticRegression {
            n_features: 2,
            coef: vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, -1.0]],
            intercept: vec![0.0, 0.0, 0.5],
        };
        assert_eq!(lr.n_classes(), Some(3));
        assert_eq!(lr.predict(&[2.0, 1.0]).unwrap(), 0);
        assert_eq!(lr.predict(&[0.0, 3.0]).unwrap(), 1);
        assert_eq!(lr.predict(&[0.0, 0.0]).unwrap(), 2);
    }

    #[test]
    fn test_artifact_deserialization() {
        let json = r#"{
            "format_version": 1,
            "feature_checksum": "abc",
            "model": {
                "kind": "logistic_regression",
                "n_features": 2,
                "coef": [[1.0, 1.0]],
                "intercept": [0.0]
            }
        }"#;
        let artifact: NativeArtifact = serde_json::from_str(json).unwrap();
        assert_eq!(artifact.format_version, NATIVE_FORMAT_VERSION);
        assert_eq!(artifact.feature_checksum.as_deref(), Some("abc"));
        assert!(artifact.label_checksum.is_none());
        assert!(matches!(artifact.model, NativeModel::LogisticRegression(_)));
    }
}
