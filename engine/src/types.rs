use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Phishing,
    Legitimate,
}

impl Verdict {
    pub fn from_class(class: u8) -> Self {
        if class == 1 {
            Verdict::Phishing
        } else {
            Verdict::Legitimate
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Phishing => "phishing",
            Verdict::Legitimate => "legitimate",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Verdict::Phishing => "🔴 Phishing",
            Verdict::Legitimate => "🟢 Legitimate",
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            Verdict::Phishing => {
                "This URL shows characteristics commonly associated with phishing sites. \
                 Be cautious and verify the source before proceeding."
            }
            Verdict::Legitimate => {
                "This URL appears to be legitimate based on our analysis. However, always \
                 remain vigilant when sharing personal information online."
            }
        }
    }
}

/// Outcome of a single URL check.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub url: String,
    pub verdict: Verdict,
    pub confidence: Option<f64>,
}

impl Prediction {
    /// Explanation with the confidence appended when the model gave one.
    pub fn explanation(&self) -> String {
        match self.confidence {
            Some(c) => format!("{} (Confidence: {:.2}%)", self.verdict.explanation(), c * 100.0),
            None => self.verdict.explanation().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictForm {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    pub url: String,
    pub is_phishing: bool,
    pub prediction: Verdict,
    pub confidence: Option<f64>,
}

impl From<Prediction> for PredictResponse {
    fn from(p: Prediction) -> Self {
        Self {
            url: p.url,
            is_phishing: p.verdict == Verdict::Phishing,
            prediction: p.verdict,
            confidence: p.confidence,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub model_loaded: bool,
    pub model_version: Option<String>,
    pub schema_version: String,
    pub feature_count: usize,
    pub version: String,
}
