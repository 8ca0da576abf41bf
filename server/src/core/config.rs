use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::utils::crypto::generate_session_secret;
use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_HOST, DEFAULT_JWKS_URL, DEFAULT_PORT,
    DEFAULT_SITE_DOMAIN, DEFAULT_STRIPE_API_BASE, MIN_SESSION_SECRET_LEN,
};

// =============================================================================
// Environment
// =============================================================================

/// Deployment environment. Drives cookie attributes and secret requirements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    #[default]
    Development,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Production => write!(f, "production"),
            Environment::Development => write!(f, "development"),
        }
    }
}

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// CORS configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CorsFileConfig {
    pub allowed_origins: Option<Vec<String>>,
}

/// Authentication configuration section
#[derive(Default, Clone, Deserialize)]
pub struct AuthFileConfig {
    pub session_secret: Option<String>,
    pub firebase_project_id: Option<String>,
    pub jwks_url: Option<String>,
    pub sessions_valid_after: Option<i64>,
}

impl fmt::Debug for AuthFileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthFileConfig")
            .field(
                "session_secret",
                &self.session_secret.as_ref().map(|_| "***"),
            )
            .field("firebase_project_id", &self.firebase_project_id)
            .field("jwks_url", &self.jwks_url)
            .field("sessions_valid_after", &self.sessions_valid_after)
            .finish()
    }
}

/// Payment processor configuration section
#[derive(Default, Clone, Deserialize)]
pub struct StripeFileConfig {
    pub secret_key: Option<String>,
    pub api_base: Option<String>,
}

impl fmt::Debug for StripeFileConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeFileConfig")
            .field("secret_key", &self.secret_key.as_ref().map(|_| "***"))
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Database configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    pub path: Option<String>,
}

/// Root config file structure
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub environment: Option<Environment>,
    pub site_domain: Option<String>,
    pub cors: Option<CorsFileConfig>,
    pub auth: Option<AuthFileConfig>,
    pub stripe: Option<StripeFileConfig>,
    pub database: Option<DatabaseFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Overlay `other` on top of `self`; fields set in `other` win
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                current.host = server.host;
            }
            if server.port.is_some() {
                current.port = server.port;
            }
        }

        if other.environment.is_some() {
            self.environment = other.environment;
        }
        if other.site_domain.is_some() {
            self.site_domain = other.site_domain;
        }

        if let Some(cors) = other.cors
            && cors.allowed_origins.is_some()
        {
            self.cors = Some(cors);
        }

        if let Some(auth) = other.auth {
            let current = self.auth.get_or_insert_with(AuthFileConfig::default);
            if auth.session_secret.is_some() {
                current.session_secret = auth.session_secret;
            }
            if auth.firebase_project_id.is_some() {
                current.firebase_project_id = auth.firebase_project_id;
            }
            if auth.jwks_url.is_some() {
                current.jwks_url = auth.jwks_url;
            }
            if auth.sessions_valid_after.is_some() {
                current.sessions_valid_after = auth.sessions_valid_after;
            }
        }

        if let Some(stripe) = other.stripe {
            let current = self.stripe.get_or_insert_with(StripeFileConfig::default);
            if stripe.secret_key.is_some() {
                current.secret_key = stripe.secret_key;
            }
            if stripe.api_base.is_some() {
                current.api_base = stripe.api_base;
            }
        }

        if let Some(database) = other.database
            && database.path.is_some()
        {
            self.database = Some(database);
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// CORS configuration
#[derive(Debug, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Authentication configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub session_secret: String,
    /// True when no secret was configured and one was generated for this process
    pub session_secret_ephemeral: bool,
    pub firebase_project_id: String,
    pub jwks_url: String,
    /// Sessions issued before this unix timestamp are treated as revoked
    pub sessions_valid_after: Option<i64>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("session_secret", &"***")
            .field("session_secret_ephemeral", &self.session_secret_ephemeral)
            .field("firebase_project_id", &self.firebase_project_id)
            .field("jwks_url", &self.jwks_url)
            .field("sessions_valid_after", &self.sessions_valid_after)
            .finish()
    }
}

/// Payment processor configuration
#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub api_base: String,
}

impl fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"***")
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Database configuration
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfig {
    /// Explicit SQLite file; `None` uses the platform data directory
    pub path: Option<PathBuf>,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub environment: Environment,
    pub site_domain: String,
    pub cors: CorsConfig,
    pub auth: AuthConfig,
    pub stripe: StripeConfig,
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.rintrack/rintrack.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::from_layers(cli, file_config)
    }

    /// Layer CLI/env values over a merged file config and apply defaults
    fn from_layers(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_server = file_config.server.unwrap_or_default();
        let file_auth = file_config.auth.unwrap_or_default();
        let file_stripe = file_config.stripe.unwrap_or_default();
        let file_database = file_config.database.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        let environment = cli
            .environment
            .or(file_config.environment)
            .unwrap_or_default();

        let site_domain = cli
            .site_domain
            .clone()
            .or(file_config.site_domain)
            .unwrap_or_else(|| DEFAULT_SITE_DOMAIN.to_string())
            .trim_end_matches('/')
            .to_string();

        let allowed_origins = file_config
            .cors
            .and_then(|c| c.allowed_origins)
            .unwrap_or_else(|| default_allowed_origins(&site_domain));

        let configured_secret = cli
            .session_secret
            .clone()
            .or(file_auth.session_secret)
            .filter(|s| !s.is_empty());
        let session_secret_ephemeral = configured_secret.is_none() && !environment.is_production();
        let session_secret = match configured_secret {
            Some(secret) => secret,
            None if session_secret_ephemeral => generate_session_secret(),
            None => String::new(),
        };

        let auth = AuthConfig {
            session_secret,
            session_secret_ephemeral,
            firebase_project_id: cli
                .firebase_project_id
                .clone()
                .or(file_auth.firebase_project_id)
                .unwrap_or_default(),
            jwks_url: cli
                .jwks_url
                .clone()
                .or(file_auth.jwks_url)
                .unwrap_or_else(|| DEFAULT_JWKS_URL.to_string()),
            sessions_valid_after: file_auth.sessions_valid_after,
        };

        let stripe = StripeConfig {
            secret_key: cli
                .stripe_secret_key
                .clone()
                .or(file_stripe.secret_key)
                .unwrap_or_default(),
            api_base: cli
                .stripe_api_base
                .clone()
                .or(file_stripe.api_base)
                .unwrap_or_else(|| DEFAULT_STRIPE_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
        };

        let database = DatabaseConfig {
            path: cli
                .db_path
                .clone()
                .or_else(|| file_database.path.map(PathBuf::from))
                .map(|p| expand_path(&p.to_string_lossy())),
        };

        let config = Self {
            server: ServerConfig { host, port },
            environment,
            site_domain,
            cors: CorsConfig { allowed_origins },
            auth,
            stripe,
            database,
        };

        config.validate()?;

        if config.auth.session_secret_ephemeral {
            tracing::warn!("No session secret configured; sessions will not survive a restart");
        }
        if is_all_interfaces(&config.server.host) {
            tracing::warn!(host = %config.server.host, "Server is listening on all interfaces");
        }

        tracing::debug!(config = ?config, "Configuration loaded");
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.site_domain.is_empty() {
            anyhow::bail!("Configuration error: site_domain must not be empty");
        }

        if self.environment.is_production() {
            if self.auth.session_secret.len() < MIN_SESSION_SECRET_LEN {
                anyhow::bail!(
                    "Configuration error: auth.session_secret must be at least {} bytes in production",
                    MIN_SESSION_SECRET_LEN
                );
            }
            if self.auth.firebase_project_id.is_empty() {
                anyhow::bail!(
                    "Configuration error: auth.firebase_project_id is required in production"
                );
            }
            if self.stripe.secret_key.is_empty() {
                anyhow::bail!("Configuration error: stripe.secret_key is required in production");
            }
        }

        Ok(())
    }
}

fn default_allowed_origins(site_domain: &str) -> Vec<String> {
    let mut origins = vec![site_domain.to_string()];
    if site_domain != DEFAULT_SITE_DOMAIN {
        origins.push(DEFAULT_SITE_DOMAIN.to_string());
    }
    origins
}

/// Get the profile config path (~/.rintrack/rintrack.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Check if host binds to all network interfaces
pub(crate) fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}
