use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::Environment;
use super::constants::{
    ENV_CONFIG, ENV_DB_PATH, ENV_ENVIRONMENT, ENV_FIREBASE_PROJECT_ID, ENV_HOST, ENV_JWKS_URL,
    ENV_PORT, ENV_SESSION_SECRET, ENV_SITE_DOMAIN, ENV_STRIPE_API_BASE, ENV_STRIPE_SECRET_KEY,
};

#[derive(Parser)]
#[command(name = "rintrack")]
#[command(version, about = "Loan tracking backend", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Deployment environment (production or development)
    #[arg(long = "env", global = true, env = ENV_ENVIRONMENT, value_parser = parse_environment)]
    pub environment: Option<Environment>,

    /// Public origin of the web client
    #[arg(long, global = true, env = ENV_SITE_DOMAIN)]
    pub site_domain: Option<String>,

    /// Secret used to sign session tokens
    #[arg(long, global = true, env = ENV_SESSION_SECRET, hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Identity provider project id (ID token audience)
    #[arg(long, global = true, env = ENV_FIREBASE_PROJECT_ID)]
    pub firebase_project_id: Option<String>,

    /// Override the ID token signing key endpoint
    #[arg(long, global = true, env = ENV_JWKS_URL)]
    pub jwks_url: Option<String>,

    /// Stripe secret API key
    #[arg(long, global = true, env = ENV_STRIPE_SECRET_KEY, hide_env_values = true)]
    pub stripe_secret_key: Option<String>,

    /// Override the Stripe API base URL
    #[arg(long, global = true, env = ENV_STRIPE_API_BASE)]
    pub stripe_api_base: Option<String>,

    /// SQLite database file (defaults to the platform data directory)
    #[arg(long, global = true, env = ENV_DB_PATH)]
    pub db_path: Option<PathBuf>,
}

/// Parse deployment environment from CLI/env string
fn parse_environment(s: &str) -> Result<Environment, String> {
    match s.to_lowercase().as_str() {
        "production" | "prod" => Ok(Environment::Production),
        "development" | "dev" => Ok(Environment::Development),
        _ => Err(format!(
            "Invalid environment '{}'. Valid options: production, development",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Apply database migrations and exit
    Migrate,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub environment: Option<Environment>,
    pub site_domain: Option<String>,
    pub session_secret: Option<String>,
    pub firebase_project_id: Option<String>,
    pub jwks_url: Option<String>,
    pub stripe_secret_key: Option<String>,
    pub stripe_api_base: Option<String>,
    pub db_path: Option<PathBuf>,
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let cli = Cli::parse();
    let config = CliConfig {
        host: cli.host,
        port: cli.port,
        config: cli.config,
        environment: cli.environment,
        site_domain: cli.site_domain,
        session_secret: cli.session_secret,
        firebase_project_id: cli.firebase_project_id,
        jwks_url: cli.jwks_url,
        stripe_secret_key: cli.stripe_secret_key,
        stripe_api_base: cli.stripe_api_base,
        db_path: cli.db_path,
    };
    (config, cli.command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_environment() {
        assert_eq!(parse_environment("production"), Ok(Environment::Production));
        assert_eq!(parse_environment("PROD"), Ok(Environment::Production));
        assert_eq!(parse_environment("dev"), Ok(Environment::Development));
        assert!(parse_environment("staging").is_err());
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "rintrack",
            "--port",
            "8080",
            "--env",
            "production",
            "--site-domain",
            "https://rintrack.app",
            "migrate",
        ])
        .unwrap();
        assert_eq!(cli.port, Some(8080));
        assert_eq!(cli.environment, Some(Environment::Production));
        assert_eq!(cli.site_domain.as_deref(), Some("https://rintrack.app"));
        assert!(matches!(cli.command, Some(Commands::Migrate)));
    }
}
