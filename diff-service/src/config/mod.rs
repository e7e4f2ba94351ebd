use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;

pub const DEFAULT_PROJECT_ID: &str = "json-diff-agent";
pub const DEFAULT_REGION: &str = "europe-west1";
pub const DEFAULT_BUCKET_NAME: &str = "json-diff-agent-files";
pub const DEFAULT_MODEL_NAME: &str = "gemini-2.5-flash";
pub const DEFAULT_LOCAL_STORAGE_PATH: &str = "./local-bucket";

#[derive(Debug, Clone, Deserialize)]
pub struct DiffConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub gcp: GcpConfig,
    pub storage: StorageConfig,
    pub model: ModelConfig,
    pub auth: AuthConfig,
    pub prompt: PromptConfig,
    pub health: HealthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GcpConfig {
    pub project_id: String,
    pub region: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub bucket: String,
    /// Root directory for the `local` backend.
    pub local_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    pub backend: ModelBackend,
    pub name: String,
    /// Only read by the `api-key` backend.
    pub api_key: Option<Secret<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Static bearer token. When unset, Application Default Credentials are used.
    pub access_token: Option<Secret<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    /// Blob holding an external prompt template.
    pub object: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    /// Probe the model on every `/health` call.
    pub probe_model: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    Gcs,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelBackend {
    Vertex,
    ApiKey,
    Mock,
}

impl FromStr for StorageBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gcs" => Ok(StorageBackend::Gcs),
            "local" => Ok(StorageBackend::Local),
            other => Err(AppError::Configuration(anyhow::anyhow!(
                "Unknown STORAGE_BACKEND '{}', expected 'gcs' or 'local'",
                other
            ))),
        }
    }
}

impl FromStr for ModelBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vertex" => Ok(ModelBackend::Vertex),
            "api-key" | "api_key" => Ok(ModelBackend::ApiKey),
            "mock" => Ok(ModelBackend::Mock),
            other => Err(AppError::Configuration(anyhow::anyhow!(
                "Unknown MODEL_BACKEND '{}', expected 'vertex', 'api-key' or 'mock'",
                other
            ))),
        }
    }
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            common: core_config::Config {
                host: core_config::bind_host(false).to_string(),
                port: 8080,
            },
            gcp: GcpConfig {
                project_id: DEFAULT_PROJECT_ID.to_string(),
                region: DEFAULT_REGION.to_string(),
            },
            storage: StorageConfig {
                backend: StorageBackend::Gcs,
                bucket: DEFAULT_BUCKET_NAME.to_string(),
                local_path: DEFAULT_LOCAL_STORAGE_PATH.to_string(),
            },
            model: ModelConfig {
                backend: ModelBackend::Vertex,
                name: DEFAULT_MODEL_NAME.to_string(),
                api_key: None,
            },
            auth: AuthConfig { access_token: None },
            prompt: PromptConfig { object: None },
            health: HealthConfig { probe_model: false },
        }
    }
}

impl DiffConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let model_backend: ModelBackend = get_env("MODEL_BACKEND", Some("vertex"), false)?.parse()?;
        let api_key = get_optional_env("GOOGLE_API_KEY").map(Secret::new);
        if model_backend == ModelBackend::ApiKey && api_key.is_none() {
            return Err(AppError::Configuration(anyhow::anyhow!(
                "GOOGLE_API_KEY is required when MODEL_BACKEND=api-key"
            )));
        }

        Ok(DiffConfig {
            common: common_config,
            gcp: GcpConfig {
                project_id: get_env("GCP_PROJECT", Some(DEFAULT_PROJECT_ID), is_prod)?,
                region: get_env("GCP_REGION", Some(DEFAULT_REGION), is_prod)?,
            },
            storage: StorageConfig {
                backend: get_env("STORAGE_BACKEND", Some("gcs"), false)?.parse()?,
                bucket: get_env("BUCKET_NAME", Some(DEFAULT_BUCKET_NAME), is_prod)?,
                local_path: get_env(
                    "LOCAL_STORAGE_PATH",
                    Some(DEFAULT_LOCAL_STORAGE_PATH),
                    false,
                )?,
            },
            model: ModelConfig {
                backend: model_backend,
                name: get_env("GEMINI_MODEL", Some(DEFAULT_MODEL_NAME), false)?,
                api_key,
            },
            auth: AuthConfig {
                access_token: get_optional_env("GOOGLE_OAUTH_ACCESS_TOKEN").map(Secret::new),
            },
            prompt: PromptConfig {
                object: get_optional_env("PROMPT_OBJECT"),
            },
            health: HealthConfig {
                probe_model: parse_flag(get_optional_env("HEALTH_PROBE_MODEL").as_deref()),
            },
        })
    }

    /// True when the platform marker selected the public bind address.
    pub fn is_cloud_mode(&self) -> bool {
        self.common.is_public_bind()
    }

    /// True when a backend talks to Google APIs with OAuth credentials.
    pub fn needs_google_credentials(&self) -> bool {
        self.storage.backend == StorageBackend::Gcs || self.model.backend == ModelBackend::Vertex
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => {
            if is_prod {
                Err(AppError::Configuration(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::Configuration(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

fn get_optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}
