use crate::error::{AgentError, InputRejection};
use crate::startup::AppState;
use axum::{
    async_trait,
    extract::{FromRequest, Query, Request, State},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct UrlParam {
    url: Option<String>,
}

/// The URL to fetch, from `?url=` or a `{"url": ...}` JSON body.
#[derive(Debug, Clone)]
pub struct DownloadTarget(pub String);

#[async_trait]
impl<S> FromRequest<S> for DownloadTarget
where
    S: Send + Sync,
{
    type Rejection = InputRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(url) = Query::<UrlParam>::try_from_uri(req.uri())
            .ok()
            .and_then(|Query(param)| param.url)
        {
            return Ok(DownloadTarget(url));
        }

        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| InputRejection::new(e.status(), e.body_text()))?;

        serde_json::from_slice::<UrlParam>(&body)
            .ok()
            .and_then(|param| param.url)
            .map(DownloadTarget)
            .ok_or_else(|| InputRejection::missing("Missing required parameter: url"))
    }
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub message: String,
    pub file_path: String,
}

pub async fn download_file(
    State(state): State<AppState>,
    DownloadTarget(url): DownloadTarget,
) -> Result<Json<DownloadResponse>, AgentError> {
    let path = state.downloader.download(&url).await?;

    Ok(Json(DownloadResponse {
        message: "File downloaded successfully".to_string(),
        file_path: path.display().to_string(),
    }))
}
