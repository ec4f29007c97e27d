use crate::schema::{first_order_mismatch, FEATURE_COUNT, SCHEMA_VERSION};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to read model artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid model artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("inconsistent model artifact: {0}")]
    Shape(String),
}

/// A binary classifier over a fixed-width numeric vector. 1 means phishing.
pub trait Classifier: Send + Sync {
    fn version(&self) -> &str;

    /// Input width the model was trained on.
    fn n_features_in(&self) -> usize;

    fn predict(&self, features: &[f64]) -> u8;

    /// Probability of the predicted class, when the model can produce one.
    fn predict_probability(&self, _features: &[f64]) -> Option<f64> {
        None
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogisticArtifact {
    pub version: String,
    #[serde(default)]
    pub schema_version: Option<String>,
    pub intercept: f64,
    pub weights: Vec<f64>,
    #[serde(default)]
    pub feature_order: Vec<String>,
    #[serde(default)]
    pub scaler: Option<Scaler>,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

/// Logistic regression exported as JSON by the training pipeline.
#[derive(Clone, Debug)]
pub struct LogisticModel {
    artifact: LogisticArtifact,
}

impl LogisticModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let artifact: LogisticArtifact = serde_json::from_str(&data)?;
        let model = Self::from_artifact(artifact)?;

        info!(
            "Model {} loaded from {}. Expects {} features.",
            model.version(),
            path.display(),
            model.n_features_in()
        );
        for warning in model.schema_warnings() {
            warn!("{}", warning);
        }
        Ok(model)
    }

    pub fn from_artifact(artifact: LogisticArtifact) -> Result<Self, ModelError> {
        if artifact.weights.is_empty() {
            return Err(ModelError::Shape("no weights".to_string()));
        }
        if !artifact.feature_order.is_empty() && artifact.feature_order.len() != artifact.weights.len() {
            return Err(ModelError::Shape(format!(
                "{} weights but {} feature names",
                artifact.weights.len(),
                artifact.feature_order.len()
            )));
        }
        if let Some(scaler) = &artifact.scaler {
            let width = artifact.weights.len();
            if scaler.mean.len() != width || scaler.scale.len() != width {
                return Err(ModelError::Shape(format!(
                    "scaler width {}/{} does not match {} weights",
                    scaler.mean.len(),
                    scaler.scale.len(),
                    width
                )));
            }
        }
        if !(0.0..=1.0).contains(&artifact.threshold) {
            return Err(ModelError::Shape(format!("threshold {} outside [0, 1]", artifact.threshold)));
        }
        Ok(Self { artifact })
    }

    /// Differences between the artifact and the extractor's schema. None of
    /// them stop the model from serving; vectors get padded or truncated.
    pub fn schema_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let a = &self.artifact;

        if let Some(version) = &a.schema_version {
            if version != SCHEMA_VERSION {
                warnings.push(format!(
                    "Model trained on feature schema {} but extractor produces {}",
                    version, SCHEMA_VERSION
                ));
            }
        }
        if a.weights.len() != FEATURE_COUNT {
            warnings.push(format!(
                "Model expects {} features but extractor produces {}",
                a.weights.len(),
                FEATURE_COUNT
            ));
        }
        if !a.feature_order.is_empty() {
            if let Some((index, ours, theirs)) = first_order_mismatch(&a.feature_order) {
                warnings.push(format!(
                    "Feature order diverges at column {}: extractor has {:?}, model has {:?}",
                    index, ours, theirs
                ));
            }
        }
        warnings
    }

    /// Probability of the phishing class.
    pub fn positive_probability(&self, features: &[f64]) -> f64 {
        let a = &self.artifact;
        let mut z = a.intercept;
        for (i, weight) in a.weights.iter().enumerate() {
            let mut x = features.get(i).copied().unwrap_or(0.0);
            if let Some(scaler) = &a.scaler {
                let scale = scaler.scale[i];
                x = if scale != 0.0 { (x - scaler.mean[i]) / scale } else { 0.0 };
            }
            z += weight * x;
        }
        sigmoid(z)
    }
}

impl Classifier for LogisticModel {
    fn version(&self) -> &str {
        &self.artifact.version
    }

    fn n_features_in(&self) -> usize {
        self.artifact.weights.len()
    }

    fn predict(&self, features: &[f64]) -> u8 {
        u8::from(self.positive_probability(features) >= self.artifact.threshold)
    }

    fn predict_probability(&self, features: &[f64]) -> Option<f64> {
        let p = self.positive_probability(features);
        Some(p.max(1.0 - p))
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
