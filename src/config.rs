use anyhow::{Context, Result};
use std::path::PathBuf;

const DEFAULT_BUCKET: &str = "job-applications-storage";
const DEFAULT_MODEL: &str = "gemini-flash";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 20;

/// Runtime configuration, read once at startup and handed to each component.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub object_store_root: PathBuf,
    pub resume_bucket: String,
    pub dashboard_hosts: Vec<String>,
    pub ai_model: String,
    pub gemini_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub fetch_timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // .env is optional
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let data_dir = default_data_dir();

        let database_path = var("BEACON_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("beacon.db"));
        let object_store_root = var("BEACON_OBJECT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("objects"));

        let dashboard_hosts = match var("BEACON_DASHBOARD_HOSTS") {
            Some(hosts) => hosts
                .split(',')
                .map(|h| h.trim().to_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
            None => vec!["localhost".to_string(), "127.0.0.1".to_string()],
        };

        let fetch_timeout_secs = match var("BEACON_FETCH_TIMEOUT") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("BEACON_FETCH_TIMEOUT must be a number of seconds, got '{}'", raw))?,
            None => DEFAULT_FETCH_TIMEOUT_SECS,
        };

        Ok(Self {
            database_path,
            object_store_root,
            resume_bucket: var("BEACON_RESUME_BUCKET").unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            dashboard_hosts,
            ai_model: var("BEACON_AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_api_key: var("GOOGLE_GENERATIVE_AI_API_KEY"),
            anthropic_api_key: var("ANTHROPIC_API_KEY"),
            openai_api_key: var("OPENAI_API_KEY"),
            fetch_timeout_secs,
        })
    }
}

fn default_data_dir() -> PathBuf {
    // Use XDG data directory or fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "beacon") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".beacon")
    }
}
