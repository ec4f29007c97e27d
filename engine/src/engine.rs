use crate::{
    error::AppError,
    features::{FeatureExtractor, FeatureVector},
    model::Classifier,
    schema::{fit_to_width, WidthFit},
    types::{Prediction, Verdict},
    whois::{WhoisClient, WhoisLookup},
};
use std::{sync::Arc, time::Instant};
use tracing::{debug, info, warn};

pub struct PhishingEngine<W = WhoisClient> {
    extractor: FeatureExtractor<W>,
    model: Option<Arc<dyn Classifier>>,
}

impl<W: WhoisLookup> PhishingEngine<W> {
    pub fn new(extractor: FeatureExtractor<W>, model: Option<Arc<dyn Classifier>>) -> Self {
        Self { extractor, model }
    }

    pub fn model(&self) -> Option<&dyn Classifier> {
        self.model.as_deref()
    }

    pub fn extractor(&self) -> &FeatureExtractor<W> {
        &self.extractor
    }

    /// Scores an already-normalized URL.
    pub async fn predict(&self, url: &str) -> Result<Prediction, AppError> {
        let model = self.model.as_deref().ok_or(AppError::ModelUnavailable)?;
        let start = Instant::now();

        let features = self.extractor.extract(url).await;
        info!("Extracted features count: {}", features.len());

        let input = fit_to_model(features, model.n_features_in());
        let verdict = Verdict::from_class(model.predict(&input));
        let confidence = model.predict_probability(&input);

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        metrics::counter!("predictions_total", "verdict" => verdict.as_str()).increment(1);
        metrics::histogram!("prediction_duration_ms").record(latency_ms);
        info!(
            "Prediction for {}: {} ({:.1}ms)",
            url,
            verdict.label(),
            latency_ms
        );

        Ok(Prediction {
            url: url.to_string(),
            verdict,
            confidence,
        })
    }
}

/// Pads or truncates to the model's width. Drift means the extractor and
/// the artifact were built from different schema versions.
pub fn fit_to_model(features: FeatureVector, width: usize) -> Vec<f64> {
    let mut values = features.into_vec();
    match fit_to_width(&mut values, width) {
        WidthFit::Exact => debug!("Feature vector matches model width {}", width),
        WidthFit::Padded { from, to } => {
            metrics::counter!("schema_width_adjustments_total", "kind" => "padded").increment(1);
            warn!("Padded features with zeros from {} to length: {}", from, to);
        }
        WidthFit::Truncated { from, to } => {
            metrics::counter!("schema_width_adjustments_total", "kind" => "truncated").increment(1);
            warn!("Trimmed features from {} to length: {}", from, to);
        }
    }
    values
}
