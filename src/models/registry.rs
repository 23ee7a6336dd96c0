//! Immutable registry of schemas and classifiers, built once at startup.

use crate::config::ModelsConfig;
use crate::error::StartupError;
use crate::models::classifier::{Classifier, ClassifierId};
use crate::models::loader::ModelLoader;
use crate::schema::{FeatureSchema, LabelSchema};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Everything inference needs, loaded once and shared read-only.
///
/// Classifiers are keyed by [`ClassifierId`], so iteration always follows
/// the enum's declaration order regardless of load order.
pub struct ModelRegistry {
    features: FeatureSchema,
    labels: LabelSchema,
    classifiers: BTreeMap<ClassifierId, Box<dyn Classifier>>,
}

impl ModelRegistry {
    /// Load schemas and classifier artifacts described by the models config.
    pub fn load(config: &ModelsConfig) -> Result<Self, StartupError> {
        let dir = Path::new(&config.models_dir);

        let features = FeatureSchema::load(dir.join(&config.feature_schema_file))?;
        let labels = LabelSchema::load(dir.join(&config.label_schema_file))?;
        info!(
            features = features.len(),
            labels = labels.len(),
            feature_checksum = %features.fingerprint(),
            label_checksum = %labels.fingerprint(),
            "Schemas loaded"
        );

        let loader = ModelLoader::new(dir)
            .require_checksums(config.require_checksums)
            .with_threads(config.onnx_threads);
        let models = loader.load_all_models(&features, &labels)?;

        Self::from_parts(
            features,
            labels,
            models.into_iter().map(|m| (m.id, m.classifier)),
        )
    }

    /// Assemble a registry from already-constructed parts.
    pub fn from_parts<I>(
        features: FeatureSchema,
        labels: LabelSchema,
        classifiers: I,
    ) -> Result<Self, StartupError>
    where
        I: IntoIterator<Item = (ClassifierId, Box<dyn Classifier>)>,
    {
        let mut map = BTreeMap::new();
        for (id, classifier) in classifiers {
            if map.insert(id, classifier).is_some() {
                return Err(StartupError::DuplicateClassifier(id));
            }
        }

        if map.is_empty() {
            return Err(StartupError::NoClassifiers("<in-memory>".into()));
        }

        Ok(Self {
            features,
            labels,
            classifiers: map,
        })
    }

    /// Registered classifier identities in registry order.
    pub fn classifier_ids(&self) -> impl Iterator<Item = ClassifierId> + '_ {
        self.classifiers.keys().copied()
    }

    pub fn classifier(&self, id: ClassifierId) -> Option<&dyn Classifier> {
        self.classifiers.get(&id).map(|c| c.as_ref())
    }

    /// Classifiers in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (ClassifierId, &dyn Classifier)> + '_ {
        self.classifiers.iter().map(|(id, c)| (*id, c.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }

    pub fn feature_schema(&self) -> &FeatureSchema {
        &self.features
    }

    pub fn label_schema(&self) -> &LabelSchema {
        &self.labels
    }
}
