//! Classifiers, their registry and ensemble inference

pub mod aggregator;
pub mod classifier;
pub mod inference;
pub mod loader;
pub mod native;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod registry;

pub use aggregator::VoteTally;
pub use classifier::{Classifier, ClassifierId};
pub use inference::EnsemblePredictor;
pub use loader::ModelLoader;
pub use registry::ModelRegistry;
