use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Public URL of the web client, used for CORS and checkout redirects
    #[serde(default = "default_client_domain")]
    pub client_domain: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_url: default_database_url(),
            client_domain: default_client_domain(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_database_url() -> String {
    "sqlite:./data/clubsphere.db?mode=rwc".to_string()
}

fn default_client_domain() -> String {
    "http://localhost:5173".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AuthConfig {
    /// Shared secret for HS256 identity tokens
    #[serde(default)]
    pub jwt_secret: Option<String>,
    /// PEM encoded RSA public key for RS256 identity tokens (takes precedence)
    #[serde(default)]
    pub jwt_public_key_pem: Option<String>,
    /// Expected `iss` claim
    #[serde(default)]
    pub issuer: Option<String>,
    /// Expected `aud` claim
    #[serde(default)]
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsConfig {
    /// Stripe secret API key
    #[serde(default)]
    pub stripe_secret_key: Option<String>,
    /// Signing secret for the Stripe webhook endpoint (whsec_...)
    #[serde(default)]
    pub webhook_secret: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            stripe_secret_key: None,
            webhook_secret: None,
            api_base: default_api_base(),
            currency: default_currency(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_currency() -> String {
    "usd".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Values taken from the command line or the environment. `None` keeps the file value.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub port: Option<u16>,
    pub database_url: Option<String>,
    pub client_domain: Option<String>,
    pub jwt_secret: Option<String>,
    pub stripe_secret_key: Option<String>,
    pub webhook_secret: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&content)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).with_context(|| "Failed to parse configuration file")
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(url) = overrides.database_url {
            self.server.database_url = url;
        }
        if let Some(domain) = overrides.client_domain {
            self.server.client_domain = domain;
        }
        if overrides.jwt_secret.is_some() {
            self.auth.jwt_secret = overrides.jwt_secret;
        }
        if overrides.stripe_secret_key.is_some() {
            self.payments.stripe_secret_key = overrides.stripe_secret_key;
        }
        if overrides.webhook_secret.is_some() {
            self.payments.webhook_secret = overrides.webhook_secret;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            payments: PaymentsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
