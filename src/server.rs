//! HTTP surface
//!
//! `POST /api/scrape` fingerprints a site, `POST /api/analyze` turns a report
//! into a prose summary, `GET /health` answers liveness checks.

use crate::error::Error;
use crate::report::SiteReport;
use crate::scanner::Scanner;
use crate::summary::Summarizer;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Fingerprinting pipeline behind `/api/scrape`
    pub scanner: Arc<Scanner>,
    /// Language-model client behind `/api/analyze`
    pub summarizer: Arc<Summarizer>,
}

impl AppState {
    /// Wrap a scanner and summarizer for sharing across handlers
    pub fn new(scanner: Scanner, summarizer: Summarizer) -> Self {
        Self {
            scanner: Arc::new(scanner),
            summarizer: Arc::new(summarizer),
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/scrape", post(scrape_handler))
        .route("/api/analyze", post(analyze_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ScrapeRequest {
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnalyzeResponse {
    analysis: String,
}

async fn scrape_handler(
    State(state): State<AppState>,
    body: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<SiteReport>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let url = request
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("url is required".to_string()))?;

    info!(url = %url, "scrape requested");
    let report = state.scanner.scan(&url).await?;
    Ok(Json(report))
}

async fn analyze_handler(
    State(state): State<AppState>,
    body: Result<Json<SiteReport>, JsonRejection>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let Json(report) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let analysis = state.summarizer.summarize(&report).await?;
    Ok(Json(AnalyzeResponse { analysis }))
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Request failure as seen by the caller
#[derive(Debug)]
pub enum ApiError {
    /// Missing or malformed input, or a blocked target (400)
    BadRequest(String),
    /// Target answered the primary fetch with a non-2xx status
    Upstream(StatusCode, String),
    /// Target could not be reached (502)
    BadGateway(String),
    /// Anything else (500), with diagnostic detail
    Internal {
        /// Short message
        message: String,
        /// Underlying error text
        details: String,
    },
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::InvalidUrl(_) => ApiError::BadRequest(err.to_string()),
            Error::HttpStatus(code) => {
                let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY);
                ApiError::Upstream(status, format!("target site responded with status {code}"))
            }
            Error::HttpRequest(_) => ApiError::BadGateway(err.to_string()),
            Error::MissingApiKey => ApiError::Internal {
                message: "analysis unavailable".to_string(),
                details: err.to_string(),
            },
            Error::LanguageModel { .. } | Error::EmptyCompletion => ApiError::Internal {
                message: "failed to generate analysis".to_string(),
                details: err.to_string(),
            },
            other => ApiError::Internal {
                message: "internal error".to_string(),
                details: other.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => {
                warn!(error = %msg, "bad request");
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            ApiError::Upstream(status, msg) => {
                warn!(status = status.as_u16(), "target fetch failed");
                (status, serde_json::json!({ "error": msg }))
            }
            ApiError::BadGateway(msg) => {
                warn!(error = %msg, "target unreachable");
                (StatusCode::BAD_GATEWAY, serde_json::json!({ "error": msg }))
            }
            ApiError::Internal { message, details } => {
                error!(error = %message, details = %details, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    serde_json::json!({ "error": message, "details": details }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
