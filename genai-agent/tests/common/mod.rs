#![allow(dead_code)]

use genai_agent::config::{
    AgentConfig, CollisionPolicy, FetchConfig, GenaiConfig, StorageConfig, UploadConfig,
};
use genai_agent::services::extractor::{PdfTextExtractor, TextExtractor};
use genai_agent::services::providers::TextProvider;
use genai_agent::startup::Application;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use service_core::config::Config as CoreConfig;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

pub const TEST_API_KEY: &str = "test-api-key";

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub download_dir: PathBuf,
    pub client: reqwest::Client,
    // Keeps the download directory alive for the test's duration.
    _root: TempDir,
}

/// Config for a test instance: random port, fresh download dir, Gemini pointed at `api_base`.
pub fn test_config(download_dir: &std::path::Path, api_base: &str) -> AgentConfig {
    AgentConfig {
        common: CoreConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        storage: StorageConfig {
            download_dir: download_dir.display().to_string(),
            collision_policy: CollisionPolicy::Overwrite,
        },
        fetch: FetchConfig {
            timeout_secs: Some(10),
        },
        upload: UploadConfig {
            max_bytes: 10 * 1024 * 1024,
        },
        genai: GenaiConfig {
            text_model: "gemini-2.0-flash".to_string(),
            api_base: api_base.to_string(),
            api_key_var: "GEMINI_API_KEY".to_string(),
            api_key: Some(TEST_API_KEY.to_string()),
            timeout_secs: 10,
        },
    }
}

impl TestApp {
    /// Spawn with the production collaborators (Gemini at `api_base`, PDF extraction).
    pub async fn spawn(api_base: &str, configure: impl FnOnce(&mut AgentConfig)) -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let download_dir = root.path().join("downloads");
        let mut config = test_config(&download_dir, api_base);
        configure(&mut config);

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        Self::start(app, root, download_dir).await
    }

    /// Spawn with an injected provider and the PDF extractor.
    pub async fn spawn_with_provider(provider: Arc<dyn TextProvider>) -> Self {
        Self::spawn_with(provider, Arc::new(PdfTextExtractor), |_| {}).await
    }

    pub async fn spawn_with(
        provider: Arc<dyn TextProvider>,
        extractor: Arc<dyn TextExtractor>,
        configure: impl FnOnce(&mut AgentConfig),
    ) -> Self {
        let root = TempDir::new().expect("Failed to create temp dir");
        let download_dir = root.path().join("downloads");
        let mut config = test_config(&download_dir, "http://127.0.0.1:1");
        configure(&mut config);

        let app = Application::build_with(config, provider, extractor)
            .await
            .expect("Failed to build test application");

        Self::start(app, root, download_dir).await
    }

    async fn start(app: Application, root: TempDir, download_dir: PathBuf) -> Self {
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        Self {
            address,
            port,
            download_dir,
            client,
            _root: root,
        }
    }

    pub async fn download(&self, url: &str) -> reqwest::Response {
        self.client
            .post(format!("{}/download", self.address))
            .query(&[("url", url)])
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn summarize(&self, data: Vec<u8>) -> reqwest::Response {
        let form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(data)
                .file_name("document.pdf")
                .mime_str("application/pdf")
                .unwrap(),
        );

        self.client
            .post(format!("{}/summarize", self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// A PDF with one page per entry of `texts`, each drawn in Helvetica.
pub fn pdf_with_pages(texts: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in texts {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 720.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}
