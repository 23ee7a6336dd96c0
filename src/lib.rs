//! Symptom Ensemble Library
//!
//! Majority-vote disease prediction over several independently trained
//! classifiers sharing one feature encoding, served over NATS request/reply.

pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_extractor;
pub mod handler;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod schema;
pub mod types;
pub mod workers;

pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use error::{ClassifierError, PredictError, StartupError};
pub use feature_extractor::FeatureExtractor;
pub use handler::{Outcome, PredictionHandler};
pub use models::{Classifier, ClassifierId, EnsemblePredictor, ModelRegistry};
pub use producer::ReplyProducer;
pub use schema::{FeatureSchema, LabelSchema};
pub use types::{request::PredictionRequest, response::PredictionResult};
pub use workers::WorkerPool;
