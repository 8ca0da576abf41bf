//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::api::auth::AuthManager;
use crate::core::banner;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::TransactionalService;
use crate::domain::payments::StripeClient;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub storage: AppStorage,
    pub database: Arc<TransactionalService>,
    pub issuer: Arc<AuthManager>,
    pub processor: Arc<StripeClient>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Migrate) => Self::migrate(&cli_config).await,
            Some(Commands::Start) | None => {
                let app = Self::init(&cli_config).await?;
                Self::start_server(app).await
            }
        }
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let storage = AppStorage::init(&config).await?;

        let database = Arc::new(
            TransactionalService::init(&storage)
                .await
                .context("Failed to open database")?,
        );
        let issuer = Arc::new(
            AuthManager::init(&config.auth)
                .map_err(|e| anyhow::anyhow!("Failed to initialize authentication: {}", e))?,
        );
        let processor = Arc::new(
            StripeClient::new(&config.stripe)
                .map_err(|e| anyhow::anyhow!("Failed to initialize payment processor: {}", e))?,
        );
        let shutdown = ShutdownService::new(database.clone());

        Ok(Self {
            shutdown,
            config,
            storage,
            database,
            issuer,
            processor,
        })
    }

    /// Apply pending migrations and exit
    async fn migrate(cli: &CliConfig) -> Result<()> {
        let config = AppConfig::load(cli)?;
        let storage = AppStorage::init(&config).await?;
        let database = TransactionalService::init(&storage)
            .await
            .context("Failed to migrate database")?;
        database.close().await;
        println!(
            "Database is up to date: {}",
            storage.database_path().display()
        );
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await;

        banner::print_banner(
            &app.config.server.host,
            app.config.server.port,
            app.config.environment,
            app.storage.database_path(),
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    pub async fn start_background_tasks(&self) {
        self.shutdown
            .register(
                self.database
                    .start_checkpoint_task(self.shutdown.subscribe()),
            )
            .await;

        tracing::debug!("Background tasks started");
    }
}
