use crate::{
    engine::PhishingEngine,
    error::{validation_error, AppError},
    pages::{render, PageView},
    schema::{FEATURE_COUNT, SCHEMA_VERSION},
    types::{HealthResponse, PredictForm, PredictRequest, PredictResponse},
    validation::normalize_url,
};
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Form, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PhishingEngine>,
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(engine: PhishingEngine) -> Self {
        Self {
            engine: Arc::new(engine),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/predict", post(predict_form_handler))
        .route("/api/predict", post(api_predict_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(not_found_handler)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_handler() -> Html<String> {
    render(&PageView::default())
}

async fn predict_form_handler(
    State(state): State<AppState>,
    form: Option<Form<PredictForm>>,
) -> Html<String> {
    metrics::counter!("requests_total", "endpoint" => "form").increment(1);

    if state.engine.model().is_none() {
        return render(&PageView::result(
            "",
            "🔴 Error: Model not loaded",
            "The prediction model could not be loaded. Please contact the administrator.",
        ));
    }

    let form = form.map(|Form(form)| form).unwrap_or_default();
    let raw = form.url.trim();
    let url = match normalize_url(raw) {
        Ok(url) => url,
        Err(e) => return render(&PageView::result(raw, "🔴 Invalid URL", e.to_string())),
    };

    let view = match state.engine.predict(&url).await {
        Ok(prediction) => PageView::result(
            prediction.url.clone(),
            prediction.verdict.label(),
            prediction.explanation(),
        ),
        Err(e) => {
            error!("Prediction error for {}: {}", raw, e);
            PageView::result(raw, "🔴 Error", format!("An error occurred during analysis: {}", e))
        }
    };
    render(&view)
}

async fn api_predict_handler(
    State(state): State<AppState>,
    payload: Option<Json<PredictRequest>>,
) -> Result<Json<PredictResponse>, AppError> {
    metrics::counter!("requests_total", "endpoint" => "api").increment(1);

    if state.engine.model().is_none() {
        return Err(AppError::ModelUnavailable);
    }

    let raw = payload
        .and_then(|Json(request)| request.url)
        .ok_or_else(|| validation_error("URL is required"))?;
    let url = normalize_url(&raw)?;

    let prediction = state.engine.predict(&url).await.map_err(|e| {
        error!("API prediction error for {}: {}", raw, e);
        e
    })?;
    info!("API verdict for {}: {}", prediction.url, prediction.verdict.as_str());

    Ok(Json(prediction.into()))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let model = state.engine.model();
    Json(HealthResponse {
        status: "healthy".to_string(),
        model_loaded: model.is_some(),
        model_version: model.map(|m| m.version().to_string()),
        schema_version: SCHEMA_VERSION.to_string(),
        feature_count: FEATURE_COUNT,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics exporter not installed".to_string()),
    }
}

async fn not_found_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, render(&PageView::default()))
}
