//! MEP Drawing Analyzer - OCR-driven component/airflow/size extraction server.

mod aggregator;
mod config;
mod error;
mod export;
mod intake;
mod line_extractor;
mod ocr;
mod pipeline;
mod schema;

use anyhow::Context;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use config::{ConfigStore, Settings, VocabularyConfig};
use error::ApiError;
use intake::{Document, UploadedFile};
use ocr::{local::LocalOcrProvider, mistral::MistralOcrProvider, OcrProviderKind, OcrRegistry};
use pipeline::Analyzer;
use schema::Report;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    reports: Arc<RwLock<HashMap<String, Report>>>,
    configs: Arc<ConfigStore>,
    ocr: OcrRegistry,
    default_ocr: OcrProviderKind,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "mep_analyzer=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env();

    let configs = ConfigStore::load_from_dir(std::path::Path::new(&settings.config_dir))?;
    info!(
        "Loaded {} vocabularies: {:?} (default: {})",
        configs.list().len(),
        configs.list(),
        configs.default_name()
    );

    let client = reqwest::Client::new();
    let mut registry = OcrRegistry::new();
    registry.register(
        OcrProviderKind::Local,
        Arc::new(LocalOcrProvider::new(client.clone())),
    );
    match MistralOcrProvider::from_env(client) {
        Ok(provider) => registry.register(OcrProviderKind::MistralOcr, Arc::new(provider)),
        Err(e) => warn!("Mistral OCR disabled: {}", e),
    }

    let default_ocr = OcrProviderKind::parse(&settings.default_ocr_provider)
        .filter(|kind| registry.get(*kind).is_some())
        .with_context(|| {
            format!(
                "DEFAULT_OCR_PROVIDER '{}' is not available",
                settings.default_ocr_provider
            )
        })?;

    let state = AppState {
        reports: Arc::new(RwLock::new(HashMap::new())),
        configs: Arc::new(configs),
        ocr: registry,
        default_ocr,
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/configs", get(list_configs))
        .route("/configs/:name", get(get_config))
        .route("/analyze", post(analyze))
        .route("/reports/:id", get(get_report))
        .route("/reports/:id/csv", get(get_report_csv))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024)) // 100MB
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    info!("Server listening on http://{}", settings.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Handlers
// ============================================================================

async fn health() -> &'static str {
    "ok"
}

async fn list_configs(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.configs.list())
}

async fn get_config(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<VocabularyConfig>, ApiError> {
    state
        .configs
        .get(&name)
        .cloned()
        .map(Json)
        .ok_or(ApiError::NotFound)
}

#[derive(serde::Deserialize)]
struct AnalyzeQuery {
    config: Option<String>,
    ocr: Option<String>,
}

/// Upload drawings and build a summary report.
async fn analyze(
    State(state): State<AppState>,
    Query(query): Query<AnalyzeQuery>,
    mut multipart: Multipart,
) -> Result<Json<Report>, ApiError> {
    let vocabulary = state
        .configs
        .resolve(query.config.as_deref())
        .ok_or_else(|| ApiError::UnknownConfig {
            name: query.config.clone().unwrap_or_default(),
            available: state.configs.list(),
        })?;

    let provider = match query.ocr.as_deref() {
        None => state.ocr.get(state.default_ocr),
        Some(name) => OcrProviderKind::parse(name).and_then(|kind| state.ocr.get(kind)),
    }
    .ok_or_else(|| ApiError::UnknownProvider {
        name: query.ocr.clone().unwrap_or_default(),
        available: state.ocr.names(),
    })?;

    // Every field carrying a file name is an upload, kept in arrival order.
    let mut documents = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Multipart(e.to_string()))?
    {
        let Some(name) = field.file_name().map(|n| n.to_string()) else {
            continue;
        };
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Multipart(format!("Failed to read {}: {}", name, e)))?
            .to_vec();

        info!("Received file: {} ({} bytes)", name, data.len());
        documents.push(Document::classify(UploadedFile { name, data })?);
    }

    if documents.is_empty() {
        return Err(ApiError::NoFiles);
    }

    info!(
        "Analyzing {} files with vocabulary '{}' and OCR '{}'",
        documents.len(),
        vocabulary.name,
        provider.name()
    );

    let report = Analyzer::new(vocabulary, provider.as_ref())
        .run(&documents)
        .await;

    state
        .reports
        .write()
        .await
        .insert(report.id.clone(), report.clone());

    Ok(Json(report))
}

async fn get_report(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Report>, ApiError> {
    let reports = state.reports.read().await;
    let report = reports.get(&id).cloned().ok_or(ApiError::NotFound)?;
    Ok(Json(report))
}

/// Download a report's summary table as CSV.
async fn get_report_csv(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let csv = {
        let reports = state.reports.read().await;
        let report = reports.get(&id).ok_or(ApiError::NotFound)?;
        export::report_to_csv(report)?
    };

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export::EXPORT_FILENAME),
            ),
        ],
        csv,
    ))
}
