pub mod download;
pub mod health;
pub mod summarize;

pub use download::download_file;
pub use health::{health_check, metrics_endpoint, readiness_check, root};
pub use summarize::summarize_document;
