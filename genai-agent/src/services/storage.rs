use crate::config::CollisionPolicy;
use crate::error::AgentError;
use service_core::error::AppError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File, OpenOptions};

/// Local directory that downloaded files are written into.
#[derive(Debug, Clone)]
pub struct DownloadStore {
    root: PathBuf,
    policy: CollisionPolicy,
}

impl DownloadStore {
    /// Opens the store, creating the directory if it does not exist yet.
    pub async fn new(
        root: impl Into<PathBuf>,
        policy: CollisionPolicy,
    ) -> Result<Self, AppError> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root).await?;
        }
        if !root.is_dir() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "download directory {} exists but is not a directory",
                root.display()
            )));
        }
        Ok(Self { root, policy })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// True when the root exists and is a directory.
    pub fn is_accessible(&self) -> bool {
        self.root.is_dir()
    }

    /// Opens a new file for `filename` under the root, applying the collision policy.
    ///
    /// `filename` is reduced to its final path component first.
    pub async fn create(&self, filename: &str) -> Result<(PathBuf, File), AgentError> {
        let name = sanitize_filename(filename)?;
        let path = self.root.join(name);

        match self.policy {
            CollisionPolicy::Overwrite => {
                let file = File::create(&path)
                    .await
                    .map_err(|e| storage_error(&path, e))?;
                Ok((path, file))
            }
            CollisionPolicy::Reject => match create_new(&path).await {
                Ok(file) => Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(AgentError::Storage(
                    format!("File already exists: {}", path.display()),
                )),
                Err(e) => Err(storage_error(&path, e)),
            },
            CollisionPolicy::Version => self.create_versioned(name).await,
        }
    }

    async fn create_versioned(&self, name: &str) -> Result<(PathBuf, File), AgentError> {
        let (stem, ext) = split_extension(name);

        for n in 0u32.. {
            let candidate = if n == 0 {
                name.to_string()
            } else {
                match ext {
                    Some(ext) => format!("{}-{}.{}", stem, n, ext),
                    None => format!("{}-{}", stem, n),
                }
            };
            let path = self.root.join(candidate);

            match create_new(&path).await {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(storage_error(&path, e)),
            }
        }

        Err(AgentError::Storage(format!(
            "No free name left for {}",
            name
        )))
    }
}

async fn create_new(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
}

fn storage_error(path: &Path, err: std::io::Error) -> AgentError {
    AgentError::Storage(format!("Failed to write {}: {}", path.display(), err))
}

/// Keeps only the last path component so a name can never leave the root.
pub fn sanitize_filename(filename: &str) -> Result<&str, AgentError> {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or_default();

    if name.is_empty() || name == "." || name == ".." {
        return Err(AgentError::Storage(format!(
            "Invalid filename: {:?}",
            filename
        )));
    }
    Ok(name)
}

/// `report.pdf` -> (`report`, Some(`pdf`)); dotfiles keep their leading dot in the stem.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}
