use crate::error::{AgentError, InputRejection};
use crate::startup::AppState;
use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;

/// Name of the multipart field carrying the document.
const FILE_FIELD: &str = "file";

/// The `file` part of a multipart upload. Content type is not checked.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub data: Bytes,
}

#[async_trait]
impl<S> FromRequest<S> for UploadedFile
where
    S: Send + Sync,
{
    type Rejection = InputRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| InputRejection::missing(e.body_text()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| InputRejection::new(e.status(), e.body_text()))?
        {
            if field.name() != Some(FILE_FIELD) {
                continue;
            }

            let file_name = field.file_name().map(str::to_string);
            let data = field
                .bytes()
                .await
                .map_err(|e| InputRejection::new(e.status(), e.body_text()))?;

            return Ok(UploadedFile { file_name, data });
        }

        Err(InputRejection::missing("Missing required file field: file"))
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

pub async fn summarize_document(
    State(state): State<AppState>,
    upload: UploadedFile,
) -> Result<Json<SummaryResponse>, AgentError> {
    tracing::info!(
        file_name = upload.file_name.as_deref().unwrap_or("unnamed"),
        size = upload.data.len(),
        "Summarizing uploaded document"
    );

    let summary = state.summarizer.summarize(upload.data).await?;

    Ok(Json(SummaryResponse { summary }))
}
