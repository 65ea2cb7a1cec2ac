use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // API
    #[serde(default = "default_api_host")]
    pub api_host: String,
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_api_timeout_seconds")]
    pub api_timeout_seconds: u64,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,
    /// CORS allowlist (§6.4), parsed from a comma-separated env value.
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    /// 32-byte credential-vault key, hex or raw (§4.8, §6.4).
    pub encryption_key: Option<String>,

    /// External identity-service base URL (§6.2).
    #[serde(default = "default_devpad_url")]
    pub devpad_url: String,

    // Per-platform system-wide OAuth client credentials (§4.8). A profile
    // may override these with its own bring-your-own credentials.
    pub github_client_id: Option<String>,
    pub github_client_secret: Option<String>,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub twitter_client_id: Option<String>,
    pub twitter_client_secret: Option<String>,
}

fn default_api_host() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    3000
}

fn default_api_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_database_url() -> String {
    "sqlite://aggregator.db".to_string()
}

fn default_api_timeout_seconds() -> u64 {
    30
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_frontend_url() -> String {
    "http://localhost:5173".to_string()
}

fn default_devpad_url() -> String {
    "https://devpad.tools".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: default_api_host(),
            api_port: default_api_port(),
            api_url: default_api_url(),
            database_url: default_database_url(),
            api_timeout_seconds: default_api_timeout_seconds(),
            environment: default_environment(),
            frontend_url: default_frontend_url(),
            cors_allowed_origins: Vec::new(),
            encryption_key: None,
            devpad_url: default_devpad_url(),
            github_client_id: None,
            github_client_secret: None,
            reddit_client_id: None,
            reddit_client_secret: None,
            twitter_client_id: None,
            twitter_client_secret: None,
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::new()
            // Start with default values
            .merge(Serialized::defaults(Config::default()))
            // Load from config.toml (profile-aware)
            .merge(Toml::file("config.toml").nested())
            // Environment variables override everything
            .merge(Env::prefixed("AGGREGATOR_").split("__"))
    }

    pub fn from_profile(profile: &str) -> Result<Self, Box<figment::Error>> {
        Ok(Self::figment().select(profile).extract()?)
    }

    pub fn load() -> Result<Self, Box<figment::Error>> {
        let profile = std::env::var("AGGREGATOR_PROFILE").unwrap_or_else(|_| "default".to_string());
        let mut cfg = Self::from_profile(&profile)?;
        if cfg.cors_allowed_origins.is_empty() {
            if let Ok(raw) = std::env::var("AGGREGATOR_CORS_ALLOWED_ORIGINS") {
                cfg.cors_allowed_origins = raw.split(',').map(|s| s.trim().to_string()).collect();
            }
        }
        Ok(cfg)
    }
}
