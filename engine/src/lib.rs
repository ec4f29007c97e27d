//! URL phishing classifier: lexical feature extraction, WHOIS-derived
//! registration signals and a JSON logistic model behind an axum service.

pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod model;
pub mod pages;
pub mod routes;
pub mod schema;
pub mod types;
pub mod url_parts;
pub mod validation;
pub mod whois;

pub use engine::PhishingEngine;
pub use features::{FeatureExtractor, FeatureVector};
pub use schema::{FEATURE_COUNT, FEATURE_NAMES, SCHEMA_VERSION};
