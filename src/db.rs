use crate::catalog::Catalog;
use crate::config::DbConfig;
use crate::storage::{BufferPool, HeapFile, StorageError, TableId};
use crate::table::SchemaRef;
use crate::transaction::TransactionId;
use crate::wal::{NoopWal, Wal};
use std::path::Path;
use std::sync::Arc;

/// Explicit context handle owning the catalog, the buffer pool and the
/// wal hook. There is no process-wide instance; every test builds its
/// own.
pub struct Database {
    config: DbConfig,
    catalog: Catalog,
    buffer_pool: BufferPool,
    wal: Box<dyn Wal>,
}

pub type DatabaseRef = Arc<Database>;

impl Database {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> DatabaseRef {
        Self::with_config(DbConfig::default())
    }
    pub fn with_config(config: DbConfig) -> DatabaseRef {
        Self::with_wal(config, Box::new(NoopWal))
    }
    pub fn with_wal(config: DbConfig, wal: Box<dyn Wal>) -> DatabaseRef {
        Arc::new(Self {
            catalog: Catalog::new(),
            buffer_pool: BufferPool::new(&config),
            wal,
            config,
        })
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
    pub fn buffer_pool(&self) -> &BufferPool {
        &self.buffer_pool
    }
    pub fn log(&self) -> &dyn Wal {
        self.wal.as_ref()
    }

    /// Opens (creating if absent) a heap file and registers it under the
    /// path's file stem.
    pub fn open_table(
        &self,
        path: impl AsRef<Path>,
        schema: SchemaRef,
        primary_key: &str,
    ) -> Result<TableId, StorageError> {
        let file = HeapFile::open(path.as_ref(), schema, &self.config)?;
        let name = path
            .as_ref()
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(self.catalog.add_table(Arc::new(file), &name, primary_key))
    }

    pub fn begin_transaction(&self) -> Result<TransactionId, StorageError> {
        let tid = TransactionId::new();
        self.wal.log_begin(tid)?;
        Ok(tid)
    }

    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<(), StorageError> {
        self.buffer_pool.transaction_complete(self, tid, commit)
    }
}
