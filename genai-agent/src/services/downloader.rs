//! Remote file retrieval into the download store.

use crate::error::AgentError;
use crate::services::metrics;
use crate::services::storage::DownloadStore;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, CONTENT_DISPOSITION};
use reqwest::{Client, Url};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_util::io::StreamReader;

/// Size of each read from the response body.
const CHUNK_SIZE: usize = 8 * 1024;

pub struct Downloader {
    client: Client,
    store: DownloadStore,
}

impl Downloader {
    /// `timeout` of `None` leaves requests unbounded.
    pub fn new(store: DownloadStore, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            store,
        })
    }

    pub fn store(&self) -> &DownloadStore {
        &self.store
    }

    /// Fetches `url` and saves the body, returning the path it was written to.
    #[tracing::instrument(skip(self))]
    pub async fn download(&self, url: &str) -> Result<PathBuf, AgentError> {
        match self.fetch(url).await {
            Ok((path, bytes)) => {
                metrics::record_download("success", bytes);
                tracing::info!(path = %path.display(), bytes, "File downloaded");
                Ok(path)
            }
            Err(e) => {
                metrics::record_download("failure", 0);
                Err(e)
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<(PathBuf, u64), AgentError> {
        let url = Url::parse(url)
            .map_err(|e| AgentError::Transport(format!("Invalid URL {:?}: {}", url, e)))?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AgentError::Transport(e.to_string()))?;

        let filename = filename_from_headers(response.headers())
            .unwrap_or_else(|| filename_from_url(&url));

        let (path, mut file) = self.store.create(&filename).await?;

        let body = response.bytes_stream().map_err(std::io::Error::other);
        let reader = StreamReader::new(body);
        tokio::pin!(reader);
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut written: u64 = 0;

        let copied: Result<(), AgentError> = async {
            loop {
                let n = reader
                    .read(&mut buf)
                    .await
                    .map_err(|e| AgentError::Transport(e.to_string()))?;
                if n == 0 {
                    break;
                }
                file.write_all(&buf[..n])
                    .await
                    .map_err(|e| AgentError::Storage(e.to_string()))?;
                written += n as u64;
            }
            file.flush()
                .await
                .map_err(|e| AgentError::Storage(e.to_string()))
        }
        .await;

        if let Err(e) = copied {
            drop(file);
            // Don't leave a truncated file behind.
            if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                tracing::warn!(path = %path.display(), error = %remove_err, "Failed to remove partial download");
            }
            return Err(e);
        }

        Ok((path, written))
    }
}

/// The `filename=` parameter of a `content-disposition` header, quotes stripped.
fn filename_from_headers(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(CONTENT_DISPOSITION)?.to_str().ok()?;
    parse_content_disposition(value)
}

fn parse_content_disposition(value: &str) -> Option<String> {
    for param in split_params(value) {
        if let Some((key, val)) = param.split_once('=') {
            if key.trim().eq_ignore_ascii_case("filename") {
                let val = val.trim();
                let name = match val.strip_prefix('"') {
                    Some(quoted) => quoted.split('"').next().unwrap_or_default(),
                    None => val,
                };
                if !name.is_empty() {
                    return Some(name.to_string());
                }
            }
        }
    }
    None
}

/// Splits header parameters on `;`, leaving quoted strings intact.
fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut start = 0;
    let mut quoted = false;

    for (idx, c) in value.char_indices() {
        match c {
            '"' => quoted = !quoted,
            ';' if !quoted => {
                params.push(&value[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);
    params
}

/// Last path segment of the URL; empty when the path ends in `/`.
fn filename_from_url(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn content_disposition_quoted_and_bare() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="custom_name.pdf""#).as_deref(),
            Some("custom_name.pdf")
        );
        assert_eq!(
            parse_content_disposition("attachment; filename=report.txt").as_deref(),
            Some("report.txt")
        );
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="a.csv"; size=12"#).as_deref(),
            Some("a.csv")
        );
    }

    #[test]
    fn semicolon_inside_quotes_is_part_of_the_name() {
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="Q1; final.pdf""#).as_deref(),
            Some("Q1; final.pdf")
        );
        assert_eq!(
            parse_content_disposition(r#"attachment; filename="a;b.txt"; size=3"#).as_deref(),
            Some("a;b.txt")
        );
    }

    #[test]
    fn content_disposition_without_filename() {
        assert_eq!(parse_content_disposition("inline"), None);
        assert_eq!(parse_content_disposition(r#"attachment; filename="""#), None);
        assert_eq!(
            parse_content_disposition("attachment; filename*=UTF-8''x.txt"),
            None
        );
    }

    #[test]
    fn filename_read_from_response_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static(r#"attachment; filename="X""#),
        );
        assert_eq!(filename_from_headers(&headers).as_deref(), Some("X"));
        assert_eq!(filename_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn url_last_segment() {
        let url = Url::parse("https://example.com/files/test.txt?token=abc").unwrap();
        assert_eq!(filename_from_url(&url), "test.txt");

        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(filename_from_url(&url), "");
    }
}
