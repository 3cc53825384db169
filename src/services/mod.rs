pub mod matrix;
pub mod model;
pub mod providers;
pub mod recommendation;
pub mod scoring;
pub mod similarity;
pub mod strategies;

pub use model::{CfModel, ModelHandle};
pub use recommendation::{RecommendOptions, Recommender};

use crate::error::AppError;

/// Failures of the collaborative-filtering pipeline
///
/// `InsufficientData` and `UnknownUser` are recoverable: the caller falls
/// back to a non-personalized strategy instead of surfacing them. Provider
/// failures pass through as application errors.
#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("not enough interaction data to build a model")]
    InsufficientData,

    #[error("user {0} has no interactions in the training window")]
    UnknownUser(i64),

    #[error(transparent)]
    Provider(#[from] AppError),
}
