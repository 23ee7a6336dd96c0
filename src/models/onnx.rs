//! ONNX Runtime backed classifiers

use crate::error::ClassifierError;
use crate::models::classifier::Classifier;
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::path::Path;
use std::sync::{Mutex, Once};
use tracing::{debug, info};

static ORT_INIT: Once = Once::new();

/// Exported classifier running in an ONNX Runtime session.
///
/// Sessions need `&mut` to run, so each one sits behind its own mutex.
pub struct OnnxClassifier {
    session: Mutex<Session>,
    input_name: String,
    label_output: String,
    n_features: Option<usize>,
    pub feature_checksum: Option<String>,
    pub label_checksum: Option<String>,
}

impl OnnxClassifier {
    pub fn load<P: AsRef<Path>>(path: P, onnx_threads: usize) -> Result<Self> {
        let path = path.as_ref();

        ORT_INIT.call_once(|| {
            if ort::init().commit().is_ok() {
                info!("ONNX Runtime initialized");
            }
        });

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(onnx_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;

        let input = session
            .inputs
            .first()
            .context("model declares no inputs")?;
        let input_name = input.name.clone();
        let n_features = input
            .input_type
            .tensor_shape()
            .and_then(|shape| shape.last().copied())
            .and_then(|dim| usize::try_from(dim).ok());

        // Exporters emit "label" and "probabilities"; take the label head.
        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .context("model declares no outputs")?;

        let metadata = session.metadata()?;
        let feature_checksum = metadata.custom("feature_checksum")?;
        let label_checksum = metadata.custom("label_checksum")?;
        drop(metadata);

        debug!(
            path = %path.display(),
            input = %input_name,
            output = %label_output,
            "ONNX classifier loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            label_output,
            n_features,
            feature_checksum,
            label_checksum,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn predict(&self, features: &[f32]) -> Result<usize, ClassifierError> {
        if let Some(expected) = self.n_features {
            if features.len() != expected {
                return Err(ClassifierError::FeatureCount {
                    expected,
                    actual: features.len(),
                });
            }
        }

        let shape = vec![1_i64, features.len() as i64];
        let input = Tensor::from_array((shape, features.to_vec()))
            .map_err(|e| ClassifierError::Runtime(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| ClassifierError::Runtime(format!("Lock error: {}", e)))?;
        let outputs = session
            .run(ort::inputs![self.input_name.as_str() => input])
            .map_err(|e| ClassifierError::Runtime(e.to_string()))?;

        let output = outputs
            .get(self.label_output.as_str())
            .ok_or(ClassifierError::EmptyOutput)?;
        let (_, labels) = output
            .try_extract_tensor::<i64>()
            .map_err(|e| ClassifierError::Runtime(e.to_string()))?;

        let ordinal = *labels.first().ok_or(ClassifierError::EmptyOutput)?;
        usize::try_from(ordinal).map_err(|_| ClassifierError::NegativeOrdinal(ordinal))
    }

    fn n_features(&self) -> Option<usize> {
        self.n_features
    }

    fn n_classes(&self) -> Option<usize> {
        None
    }
}
