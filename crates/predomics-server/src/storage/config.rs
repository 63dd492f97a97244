use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Which object store holds uploaded files and result bundles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    #[default]
    Local,
    S3,
}

impl std::str::FromStr for StorageBackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "fs" => Ok(Self::Local),
            "s3" | "minio" => Ok(Self::S3),
            other => Err(anyhow::anyhow!("Unknown STORAGE_BACKEND '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    pub local_root: PathBuf,
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    #[serde(skip_serializing)]
    pub secret_key: String,
    pub path_style: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackendKind::Local,
            local_root: PathBuf::from("./data/objects"),
            endpoint: None,
            region: "us-east-1".to_string(),
            bucket: "predomics".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            path_style: false,
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            backend: match env::var("STORAGE_BACKEND") {
                Ok(v) => v.parse()?,
                Err(_) => defaults.backend,
            },
            local_root: env::var("STORAGE_LOCAL_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_root),
            endpoint: env::var("S3_ENDPOINT").ok(),
            region: env::var("S3_REGION").unwrap_or(defaults.region),
            bucket: env::var("S3_BUCKET").unwrap_or(defaults.bucket),
            access_key: env::var("S3_ACCESS_KEY")
                .or_else(|_| env::var("AWS_ACCESS_KEY_ID"))
                .unwrap_or(defaults.access_key),
            secret_key: env::var("S3_SECRET_KEY")
                .or_else(|_| env::var("AWS_SECRET_ACCESS_KEY"))
                .unwrap_or(defaults.secret_key),
            path_style: env::var("S3_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
        })
    }

    /// Filesystem-backed store rooted at `root`
    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: StorageBackendKind::Local,
            local_root: root.into(),
            ..Self::default()
        }
    }

    pub fn for_minio(endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            backend: StorageBackendKind::S3,
            endpoint: Some(endpoint.into()),
            bucket: bucket.into(),
            path_style: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        match self.backend {
            StorageBackendKind::Local if self.local_root.as_os_str().is_empty() => {
                anyhow::bail!("STORAGE_LOCAL_ROOT cannot be empty")
            },
            StorageBackendKind::S3 if self.bucket.trim().is_empty() => {
                anyhow::bail!("S3_BUCKET cannot be empty")
            },
            _ => Ok(()),
        }
    }
}
