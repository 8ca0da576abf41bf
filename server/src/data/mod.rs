//! Data storage layer
//!
//! - `sqlite` - Embedded transactional store for identities, loans and applications
//! - `types` - Row and enum types shared with the API layer
//! - `traits` - `TransactionalRepository`, the seam handlers depend on
//! - `error` - Unified error type

pub mod error;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::DataError;
pub use sqlite::SqliteService;
pub use traits::TransactionalRepository;

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::storage::AppStorage;

/// Transactional database service
///
/// Owns the SQLite service and hands out repository trait objects.
pub struct TransactionalService {
    sqlite: Arc<SqliteService>,
}

impl TransactionalService {
    /// Open the database at the storage location and run migrations
    pub async fn init(storage: &AppStorage) -> Result<Self, DataError> {
        let service = SqliteService::init(storage.database_path()).await?;
        Ok(Self {
            sqlite: Arc::new(service),
        })
    }

    /// Private in-memory database with the full schema
    pub async fn in_memory() -> Result<Self, DataError> {
        let service = SqliteService::in_memory().await?;
        Ok(Self {
            sqlite: Arc::new(service),
        })
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        self.sqlite.pool()
    }

    /// Run a WAL checkpoint
    pub async fn checkpoint(&self) -> Result<(), DataError> {
        self.sqlite.checkpoint().await.map_err(Into::into)
    }

    pub async fn close(&self) {
        self.sqlite.close().await
    }

    pub fn start_checkpoint_task(&self, shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        self.sqlite.start_checkpoint_task(shutdown_rx)
    }

    /// Repository trait object for data operations
    pub fn repository(&self) -> Arc<dyn TransactionalRepository> {
        Arc::new(Arc::clone(&self.sqlite))
    }
}
