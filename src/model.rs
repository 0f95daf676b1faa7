//! Stress predictor
//!
//! The trained regression model is shipped as a JSON artifact describing a
//! small dense feed-forward network. This module loads it, validates layer
//! shapes once, and runs deterministic inference on feature vectors.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::ComputeError;
use crate::types::{FeatureMatrix, FEATURE_COUNT};

/// Lower and upper bound of a clamped stress score
pub const STRESS_SCORE_RANGE: (f64, f64) = (0.0, 100.0);

/// Layer activation function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    #[default]
    Linear,
    Relu,
    Sigmoid,
    Tanh,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Relu => x.max(0.0),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Tanh => x.tanh(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Activation::Linear => "linear",
            Activation::Relu => "relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
        }
    }
}

/// Fully connected layer; `weights` is `[output][input]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
    #[serde(default)]
    pub activation: Activation,
}

impl DenseLayer {
    fn output_width(&self) -> usize {
        self.bias.len()
    }

    fn parameter_count(&self) -> usize {
        self.weights.iter().map(Vec::len).sum::<usize>() + self.bias.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, bias)| {
                let z: f64 = row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + bias;
                self.activation.apply(z)
            })
            .collect()
    }
}

/// Per-feature standardization applied before the first layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Standardizer {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

/// On-disk model format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    #[serde(default)]
    pub name: Option<String>,
    pub input_width: usize,
    #[serde(default)]
    pub standardizer: Option<Standardizer>,
    pub layers: Vec<DenseLayer>,
}

/// Loaded, shape-checked stress model.
///
/// Built once at start-up and shared by reference; inference never mutates it.
#[derive(Debug, Clone)]
pub struct Predictor {
    artifact: ModelArtifact,
}

impl Predictor {
    /// Load and validate a model artifact from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ComputeError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| ComputeError::LoadError(format!("{}: {}", path.display(), e)))?;
        let artifact: ModelArtifact = serde_json::from_str(&raw)
            .map_err(|e| ComputeError::LoadError(format!("{}: {}", path.display(), e)))?;
        let predictor = Self::from_artifact(artifact)?;

        tracing::info!(
            model = %path.display(),
            layers = predictor.artifact.layers.len(),
            parameters = predictor.parameter_count(),
            "model loaded successfully"
        );
        Ok(predictor)
    }

    /// Validate an in-memory artifact
    pub fn from_artifact(artifact: ModelArtifact) -> Result<Self, ComputeError> {
        validate(&artifact)?;
        Ok(Self { artifact })
    }

    pub fn name(&self) -> &str {
        self.artifact.name.as_deref().unwrap_or("stress-model")
    }

    /// Number of features the model expects
    pub fn input_width(&self) -> usize {
        self.artifact.input_width
    }

    pub fn parameter_count(&self) -> usize {
        self.artifact.layers.iter().map(DenseLayer::parameter_count).sum()
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    /// Unclamped model output for one feature vector
    pub fn predict_raw(&self, features: &[f64]) -> Result<f64, ComputeError> {
        if features.len() != self.input_width() {
            return Err(ComputeError::ShapeError {
                expected: self.input_width(),
                actual: features.len(),
            });
        }

        let mut activations: Vec<f64> = match &self.artifact.standardizer {
            Some(s) => features
                .iter()
                .zip(s.mean.iter().zip(&s.scale))
                .map(|(x, (mean, scale))| (x - mean) / scale)
                .collect(),
            None => features.to_vec(),
        };
        for layer in &self.artifact.layers {
            activations = layer.forward(&activations);
        }

        // Output width is checked at load time.
        Ok(activations[0])
    }

    /// Model output clamped to [`STRESS_SCORE_RANGE`]
    pub fn predict_clamped(&self, features: &[f64]) -> Result<f64, ComputeError> {
        let (lo, hi) = STRESS_SCORE_RANGE;
        Ok(self.predict_raw(features)?.clamp(lo, hi))
    }

    /// Unclamped output for every row of a feature matrix
    pub fn predict_batch(&self, matrix: &FeatureMatrix) -> Result<Vec<f64>, ComputeError> {
        matrix
            .rows()
            .iter()
            .map(|row| self.predict_raw(row.as_slice()))
            .collect()
    }

    /// Human-readable layer table
    pub fn summary(&self) -> String {
        let rule = "=".repeat(46);
        let mut out = format!("Model: \"{}\"\n", self.name());
        out.push_str(&summary_row("Layer (type)", "Output Shape", "Param #"));
        out.push_str(&format!("{}\n", rule));
        if self.artifact.standardizer.is_some() {
            out.push_str(&summary_row(
                "standardize",
                &format!("(None, {})", self.input_width()),
                "0",
            ));
        }
        for (i, layer) in self.artifact.layers.iter().enumerate() {
            out.push_str(&summary_row(
                &format!("dense_{} ({})", i, layer.activation.as_str()),
                &format!("(None, {})", layer.output_width()),
                &layer.parameter_count().to_string(),
            ));
        }
        out.push_str(&format!("{}\n", rule));
        out.push_str(&format!("Total params: {}", self.parameter_count()));
        out
    }
}

fn summary_row(layer: &str, shape: &str, params: &str) -> String {
    format!("{:<20}{:<16}{:>10}\n", layer, shape, params)
}

fn validate(artifact: &ModelArtifact) -> Result<(), ComputeError> {
    let corrupt = |msg: String| -> Result<(), ComputeError> { Err(ComputeError::LoadError(msg)) };

    if artifact.input_width != FEATURE_COUNT {
        return corrupt(format!(
            "input_width is {}, the feature vector has {} values",
            artifact.input_width, FEATURE_COUNT
        ));
    }
    if artifact.layers.is_empty() {
        return corrupt("model has no layers".to_string());
    }

    if let Some(s) = &artifact.standardizer {
        if s.mean.len() != artifact.input_width || s.scale.len() != artifact.input_width {
            return corrupt(format!(
                "standardizer width does not match input width {}",
                artifact.input_width
            ));
        }
        if s.scale.iter().any(|v| *v == 0.0 || !v.is_finite()) || s.mean.iter().any(|v| !v.is_finite()) {
            return corrupt("standardizer has zero or non-finite values".to_string());
        }
    }

    let mut width = artifact.input_width;
    for (i, layer) in artifact.layers.iter().enumerate() {
        if layer.bias.is_empty() || layer.weights.len() != layer.bias.len() {
            return corrupt(format!(
                "layer {}: {} weight rows for {} biases",
                i,
                layer.weights.len(),
                layer.bias.len()
            ));
        }
        if let Some(row) = layer.weights.iter().find(|row| row.len() != width) {
            return corrupt(format!(
                "layer {}: weight row has {} inputs, expected {}",
                i,
                row.len(),
                width
            ));
        }
        let finite = layer.weights.iter().flatten().chain(&layer.bias).all(|v| v.is_finite());
        if !finite {
            return corrupt(format!("layer {}: non-finite parameter", i));
        }
        width = layer.output_width();
    }

    if width != 1 {
        return corrupt(format!("model output width is {}, expected 1", width));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_models {
    use super::*;

    /// Sum of all features plus `bias`
    pub fn sum_model(bias: f64) -> Predictor {
        Predictor::from_artifact(ModelArtifact {
            name: Some("sum".to_string()),
            input_width: FEATURE_COUNT,
            standardizer: None,
            layers: vec![DenseLayer {
                weights: vec![vec![1.0; FEATURE_COUNT]],
                bias: vec![bias],
                activation: Activation::Linear,
            }],
        })
        .unwrap()
    }

    /// Two-layer network with a relu hidden layer, as JSON
    pub fn two_layer_json() -> String {
        serde_json::json!({
            "name": "fitbit-stress",
            "input_width": FEATURE_COUNT,
            "standardizer": {
                "mean": [10.0, 60.0, 55.0, 3.0, 95.0, 75.0, 20.0, 80.0, 55.0, 0.08, 70.0],
                "scale": [5.0, 20.0, 5.0, 0.5, 2.0, 8.0, 3.0, 20.0, 4.0, 0.02, 10.0]
            },
            "layers": [
                {
                    "weights": [
                        [0.2, -0.1, 0.3, 0.0, -0.2, 0.1, 0.05, -0.3, 0.4, 0.2, 0.6],
                        [-0.1, 0.2, -0.2, 0.1, 0.3, -0.4, 0.1, 0.2, -0.3, 0.0, 0.5]
                    ],
                    "bias": [0.1, -0.05],
                    "activation": "relu"
                },
                {
                    "weights": [[8.0, 6.0]],
                    "bias": [70.0]
                }
            ]
        })
        .to_string()
    }
}
