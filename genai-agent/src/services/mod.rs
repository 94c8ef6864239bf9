pub mod downloader;
pub mod extractor;
pub mod metrics;
pub mod providers;
pub mod storage;
pub mod summarizer;

pub use downloader::Downloader;
pub use extractor::{PdfTextExtractor, TextExtractor};
pub use metrics::{get_metrics, init_metrics};
pub use storage::DownloadStore;
pub use summarizer::Summarizer;
