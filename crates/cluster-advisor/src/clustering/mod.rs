//! Clustering Pipeline
//!
//! Raw prices -> return matrix -> cluster assignment -> themes.

mod classifier;
mod engine;
mod features;

pub use classifier::ClusterClassifier;
pub use engine::{ClusterEngine, ClusterFit};
pub use features::FeatureMatrixBuilder;
