//! Request and response types for the prediction service

pub mod request;
pub mod response;

pub use request::PredictionRequest;
pub use response::{Confidence, ErrorReply, PredictionResult, VotingMethod};
