//! Classifier artifact loader

use crate::error::StartupError;
use crate::models::classifier::{Classifier, ClassifierId};
use crate::models::native::{NativeArtifact, NATIVE_FORMAT_VERSION};
use crate::schema::{FeatureSchema, LabelSchema};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Classifier loaded from disk, tagged with its identity
pub struct LoadedModel {
    pub id: ClassifierId,
    pub path: PathBuf,
    pub classifier: Box<dyn Classifier>,
}

/// Loader for classifier artifacts in a models directory
pub struct ModelLoader {
    models_dir: PathBuf,
    /// Reject artifacts that carry no schema checksums
    require_checksums: bool,
    /// Number of threads for ONNX inference
    #[cfg_attr(not(feature = "onnx"), allow(dead_code))]
    onnx_threads: usize,
}

impl ModelLoader {
    pub fn new<P: Into<PathBuf>>(models_dir: P) -> Self {
        Self {
            models_dir: models_dir.into(),
            require_checksums: true,
            onnx_threads: 1,
        }
    }

    pub fn require_checksums(mut self, require: bool) -> Self {
        self.require_checksums = require;
        self
    }

    pub fn with_threads(mut self, onnx_threads: usize) -> Self {
        self.onnx_threads = onnx_threads.max(1);
        self
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Load one classifier, or `None` when no artifact exists for it.
    ///
    /// JSON artifacts take precedence over ONNX ones of the same stem.
    pub fn load_model(
        &self,
        id: ClassifierId,
        features: &FeatureSchema,
        labels: &LabelSchema,
    ) -> Result<Option<LoadedModel>, StartupError> {
        let json_path = self.models_dir.join(format!("{}.json", id.artifact_stem()));
        if json_path.exists() {
            let classifier = self.load_native(id, &json_path, features, labels)?;
            return Ok(Some(LoadedModel {
                id,
                path: json_path,
                classifier,
            }));
        }

        let onnx_path = self.models_dir.join(format!("{}.onnx", id.artifact_stem()));
        if onnx_path.exists() {
            let classifier = self.load_onnx(id, &onnx_path, features, labels)?;
            return Ok(Some(LoadedModel {
                id,
                path: onnx_path,
                classifier,
            }));
        }

        Ok(None)
    }

    /// Load every known classifier, skipping the ones with no artifact.
    pub fn load_all_models(
        &self,
        features: &FeatureSchema,
        labels: &LabelSchema,
    ) -> Result<Vec<LoadedModel>, StartupError> {
        let mut models = Vec::new();

        for id in ClassifierId::ALL {
            match self.load_model(id, features, labels)? {
                Some(model) => {
                    info!(classifier = %id, path = %model.path.display(), "Loaded classifier");
                    models.push(model);
                }
                None => {
                    warn!(
                        classifier = %id,
                        dir = %self.models_dir.display(),
                        stem = id.artifact_stem(),
                        "Classifier artifact not found, continuing with fewer voters"
                    );
                }
            }
        }

        if models.is_empty() {
            return Err(StartupError::NoClassifiers(self.models_dir.clone()));
        }

        info!(
            count = models.len(),
            "Loaded {} classifiers from {}",
            models.len(),
            self.models_dir.display()
        );

        Ok(models)
    }

    fn load_native(
        &self,
        id: ClassifierId,
        path: &Path,
        features: &FeatureSchema,
        labels: &LabelSchema,
    ) -> Result<Box<dyn Classifier>, StartupError> {
        let raw = fs::read(path).map_err(|source| StartupError::Io {
            what: "classifier artifact",
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: NativeArtifact =
            serde_json::from_slice(&raw).map_err(|source| StartupError::Parse {
                what: "classifier artifact",
                path: path.to_path_buf(),
                source,
            })?;

        if artifact.format_version != NATIVE_FORMAT_VERSION {
            return Err(StartupError::InvalidArtifact {
                classifier: id,
                reason: format!(
                    "unsupported format_version {} (expected {})",
                    artifact.format_version, NATIVE_FORMAT_VERSION
                ),
            });
        }

        self.verify_checksums(
            id,
            artifact.feature_checksum.as_deref(),
            artifact.label_checksum.as_deref(),
            features,
            labels,
        )?;

        artifact
            .model
            .validate()
            .map_err(|reason| StartupError::InvalidArtifact {
                classifier: id,
                reason,
            })?;

        // Any family may fill any slot, but a mismatch usually means a
        // misnamed file.
        if artifact.model.family() != id {
            warn!(
                classifier = %id,
                kind = %artifact.model.family(),
                path = %path.display(),
                "Artifact model kind differs from its classifier slot"
            );
        }

        let classifier = artifact.model.into_classifier();
        verify_shape(id, classifier.as_ref(), features, labels)?;
        Ok(classifier)
    }

    #[cfg(feature = "onnx")]
    fn load_onnx(
        &self,
        id: ClassifierId,
        path: &Path,
        features: &FeatureSchema,
        labels: &LabelSchema,
    ) -> Result<Box<dyn Classifier>, StartupError> {
        use crate::models::onnx::OnnxClassifier;

        let classifier = OnnxClassifier::load(path, self.onnx_threads).map_err(|e| {
            StartupError::InvalidArtifact {
                classifier: id,
                reason: format!("{:#}", e),
            }
        })?;

        self.verify_checksums(
            id,
            classifier.feature_checksum.as_deref(),
            classifier.label_checksum.as_deref(),
            features,
            labels,
        )?;
        verify_shape(id, &classifier, features, labels)?;
        Ok(Box::new(classifier))
    }

    #[cfg(not(feature = "onnx"))]
    fn load_onnx(
        &self,
        id: ClassifierId,
        path: &Path,
        _features: &FeatureSchema,
        _labels: &LabelSchema,
    ) -> Result<Box<dyn Classifier>, StartupError> {
        Err(StartupError::InvalidArtifact {
            classifier: id,
            reason: format!(
                "{} is an ONNX model but the `onnx` feature is not enabled",
                path.display()
            ),
        })
    }

    fn verify_checksums(
        &self,
        id: ClassifierId,
        feature_checksum: Option<&str>,
        label_checksum: Option<&str>,
        features: &FeatureSchema,
        labels: &LabelSchema,
    ) -> Result<(), StartupError> {
        let checks = [
            ("feature", feature_checksum, features.fingerprint()),
            ("label", label_checksum, labels.fingerprint()),
        ];

        for (schema, artifact, loaded) in checks {
            match artifact {
                Some(artifact) if artifact.eq_ignore_ascii_case(loaded) => {}
                Some(artifact) => {
                    return Err(StartupError::SchemaMismatch {
                        classifier: id,
                        schema,
                        artifact: artifact.to_string(),
                        loaded: loaded.to_string(),
                    });
                }
                None if self.require_checksums => {
                    return Err(StartupError::MissingChecksum {
                        classifier: id,
                        schema,
                    });
                }
                None => {
                    warn!(
                        classifier = %id,
                        schema = schema,
                        "Artifact carries no schema checksum, accepting unverified"
                    );
                }
            }
        }

        Ok(())
    }
}

fn verify_shape(
    id: ClassifierId,
    classifier: &dyn Classifier,
    features: &FeatureSchema,
    labels: &LabelSchema,
) -> Result<(), StartupError> {
    if let Some(n_features) = classifier.n_features() {
        if n_features != features.len() {
            return Err(StartupError::InvalidArtifact {
                classifier: id,
                reason: format!(
                    "model expects {} features, feature schema has {}",
                    n_features,
                    features.len()
                ),
            });
        }
    }
    if let Some(n_classes) = classifier.n_classes() {
        if n_classes > labels.len() {
            return Err(StartupError::InvalidArtifact {
                classifier: id,
                reason: format!(
                    "model emits {} classes, label schema has {}",
                    n_classes,
                    labels.len()
                ),
            });
        }
    }
    Ok(())
}
