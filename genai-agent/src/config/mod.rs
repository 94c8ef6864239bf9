use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::time::Duration;

/// Default request body limit for uploads (50MB).
const DEFAULT_UPLOAD_MAX_BYTES: usize = 50 * 1024 * 1024;

/// Default timeout for a single generation call.
const DEFAULT_GENAI_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub storage: StorageConfig,
    pub fetch: FetchConfig,
    pub upload: UploadConfig,
    pub genai: GenaiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub download_dir: String,
    pub collision_policy: CollisionPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// No timeout when unset.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenaiConfig {
    /// Model used for summaries (e.g., gemini-2.0-flash)
    pub text_model: String,
    pub api_base: String,
    /// Name of the environment variable the key was read from.
    pub api_key_var: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// What to do when a download's filename already exists in the download directory.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Replace the existing file; last writer wins.
    #[default]
    Overwrite,
    /// Fail the download with a storage error.
    Reject,
    /// Save under the first free `stem-N.ext` name.
    Version,
}

impl AgentConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let api_key_var = get_env("GENAI_API_KEY_VAR", Some("GEMINI_API_KEY"), is_prod)?;
        let api_key = env::var(&api_key_var).ok().filter(|k| !k.is_empty());

        Ok(AgentConfig {
            common: common_config,
            storage: StorageConfig {
                download_dir: get_env("DOWNLOAD_DIR", Some("downloads"), is_prod)?,
                collision_policy: get_env("DOWNLOAD_COLLISION_POLICY", Some("overwrite"), is_prod)?
                    .parse()
                    .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?,
            },
            fetch: FetchConfig {
                timeout_secs: parse_optional("FETCH_TIMEOUT_SECS")?,
            },
            upload: UploadConfig {
                max_bytes: parse_number(
                    "UPLOAD_MAX_BYTES",
                    &get_env(
                        "UPLOAD_MAX_BYTES",
                        Some(&DEFAULT_UPLOAD_MAX_BYTES.to_string()),
                        is_prod,
                    )?,
                )?,
            },
            genai: GenaiConfig {
                text_model: get_env("GENAI_TEXT_MODEL", Some("gemini-2.0-flash"), is_prod)?,
                api_base: get_env(
                    "GENAI_API_BASE",
                    Some("https://generativelanguage.googleapis.com/v1beta"),
                    is_prod,
                )?,
                api_key_var,
                api_key,
                timeout_secs: parse_number(
                    "GENAI_TIMEOUT_SECS",
                    &get_env(
                        "GENAI_TIMEOUT_SECS",
                        Some(&DEFAULT_GENAI_TIMEOUT_SECS.to_string()),
                        is_prod,
                    )?,
                )?,
            },
        })
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl GenaiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::str::FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(CollisionPolicy::Overwrite),
            "reject" => Ok(CollisionPolicy::Reject),
            "version" => Ok(CollisionPolicy::Version),
            _ => Err(format!("Invalid download collision policy: {}", s)),
        }
    }
}

fn parse_optional(key: &str) -> Result<Option<u64>, AppError> {
    match env::var(key) {
        Ok(val) => parse_number(key, &val).map(Some),
        Err(_) => Ok(None),
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e| {
        AppError::ConfigError(anyhow::anyhow!("{} must be a whole number: {}", key, e))
    })
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}
