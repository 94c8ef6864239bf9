use crate::services::metrics;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;
use std::time::Duration;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "message": "Welcome to GenAI Agent API",
        "description": "HTTP service for file downloads and PDF summarization",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/health - Health check endpoint",
            "ready": "/ready - Readiness probe",
            "metrics": "/metrics - Prometheus metrics",
            "download": "/download - Download files from URLs",
            "summarize": "/summarize - Summarize PDF documents"
        }
    }))
}

/// Liveness report. Always 200; dependency flags describe what is usable.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let downloads_accessible = state.downloader.store().is_accessible();
    let gemini_configured = state.summarizer.provider().is_configured();

    Json(json!({
        "status": "healthy",
        "service": "genai-agent",
        "timestamp": chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        "version": env!("CARGO_PKG_VERSION"),
        "uptime": format_uptime(state.started_at.elapsed()),
        "dependencies": {
            "downloads_directory": downloads_accessible,
            "google_gemini_api": gemini_configured
        },
        "endpoints": {
            "download": "/download",
            "summarize": "/summarize",
            "health": "/health",
            "ready": "/ready",
            "metrics": "/metrics"
        }
    }))
}

/// Readiness probe: the download directory must be usable.
pub async fn readiness_check(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let store = state.downloader.store();
    if store.is_accessible() {
        Ok(StatusCode::OK)
    } else {
        tracing::warn!(dir = %store.root().display(), "Download directory not accessible");
        Err(AppError::ServiceUnavailable(format!(
            "download directory {} is not accessible",
            store.root().display()
        )))
    }
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    metrics::get_metrics()
}

/// `1d 2h 3m 4s`, dropping leading zero units.
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{}d {}h {}m {}s", days, hours, minutes, seconds)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uptime_drops_leading_zero_units() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0s");
        assert_eq!(format_uptime(Duration::from_secs(59)), "59s");
        assert_eq!(format_uptime(Duration::from_secs(61)), "1m 1s");
        assert_eq!(format_uptime(Duration::from_secs(3_600)), "1h 0m 0s");
        assert_eq!(
            format_uptime(Duration::from_secs(86_400 + 2 * 3_600 + 3 * 60 + 4)),
            "1d 2h 3m 4s"
        );
    }
}
