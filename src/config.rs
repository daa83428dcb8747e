use anyhow::{anyhow, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration, loaded from the environment.
///
/// The provider list is ordered: its order is the upload failover sequence
/// and is fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub providers: Vec<ProviderConfig>,
    pub user_quota_bytes: i64,
    pub provider_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub id: String,
    pub backend: BackendConfig,
}

#[derive(Debug, Clone)]
pub enum BackendConfig {
    S3 {
        bucket: String,
        region: String,
        endpoint: Option<String>,
        access_key: String,
        secret_key: String,
    },
    Local {
        root: PathBuf,
    },
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let provider_ids = env::var("STORAGE_PROVIDERS")
            .unwrap_or_else(|_| "local".to_string());

        let mut providers = Vec::new();
        for id in provider_ids.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            providers.push(ProviderConfig::from_env(id)?);
        }
        if providers.is_empty() {
            return Err(anyhow!("STORAGE_PROVIDERS must name at least one provider"));
        }

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/filedepot".to_string()),
            providers,
            user_quota_bytes: env::var("USER_QUOTA_BYTES")
                .unwrap_or_else(|_| "5368709120".to_string()) // 5 GiB
                .parse()?,
            provider_timeout: Duration::from_secs(
                env::var("PROVIDER_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            ),
        })
    }
}

impl ProviderConfig {
    fn from_env(id: &str) -> Result<Self> {
        let kind = provider_var(id, "KIND").unwrap_or_else(|| "local".to_string());

        let backend = match kind.as_str() {
            "s3" => BackendConfig::S3 {
                bucket: require_provider_var(id, "BUCKET")?,
                region: provider_var(id, "REGION").unwrap_or_else(|| "us-east-1".to_string()),
                endpoint: provider_var(id, "ENDPOINT"),
                access_key: require_provider_var(id, "ACCESS_KEY")?,
                secret_key: require_provider_var(id, "SECRET_KEY")?,
            },
            "local" => BackendConfig::Local {
                root: provider_var(id, "ROOT")
                    .unwrap_or_else(|| "./uploads".to_string())
                    .into(),
            },
            other => return Err(anyhow!("Unsupported provider kind for {}: {}", id, other)),
        };

        Ok(ProviderConfig {
            id: id.to_string(),
            backend,
        })
    }
}

fn provider_var(id: &str, name: &str) -> Option<String> {
    let key = format!(
        "PROVIDER_{}_{}",
        id.to_uppercase().replace('-', "_"),
        name
    );
    env::var(key).ok()
}

fn require_provider_var(id: &str, name: &str) -> Result<String> {
    provider_var(id, name).ok_or_else(|| anyhow!("Missing PROVIDER_{}_{} for provider {}", id.to_uppercase(), name, id))
}
