//! Stress Flux - Wearable exports to stress-model feature vectors
//!
//! Stress Flux turns a raw wearable export directory into the fixed-order feature
//! vectors a pre-trained stress model expects, through a deterministic
//! pipeline: per-source extraction → date-keyed inner join → projection.
//!
//! ## Modules
//!
//! - **Vectorization**: five CSV source adapters, the typed join, and the
//!   [`Vectorizer`] that drives them
//! - **Prediction**: [`Predictor`], a JSON-artifact regression model with raw
//!   and clamped inference
//! - **Web form** (feature `server`): single-page form around a shared
//!   predictor handle

pub mod adapters;
pub mod error;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod types;

#[cfg(feature = "server")]
pub mod web;

pub use error::ComputeError;
pub use merge::{join, project};
pub use model::Predictor;
pub use pipeline::{vectorize_export, Vectorizer};
pub use types::{FeatureMatrix, FeatureVector, MetricSource, MetricTable, FEATURE_COUNT, FEATURE_NAMES};

/// Crate version embedded in CLI and JSON reports
pub const STRESS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "stress-flux";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_matches_package() {
        assert_eq!(STRESS_VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(PRODUCER_NAME, env!("CARGO_PKG_NAME"));
    }
}
