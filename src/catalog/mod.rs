use crate::storage::{HeapFile, TableId};
use crate::table::SchemaRef;
use log::info;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

mod loader;

pub use loader::{load_csv, load_schema, LoaderError};

pub struct TableInfo {
    pub file: Arc<HeapFile>,
    pub name: String,
    pub primary_key: String,
}

/// Registry mapping table id to (heap file, schema, primary-key column).
/// Lives inside a `Database` context; there is no process-wide instance.
pub struct Catalog {
    tables: Mutex<HashMap<TableId, TableInfo>>,
}

impl Catalog {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a table under its file's id. Re-registering the same
    /// id replaces the previous entry.
    pub fn add_table(&self, file: Arc<HeapFile>, name: &str, primary_key: &str) -> TableId {
        let id = file.id();
        info!("catalog registers table {} with id {}", name, id);
        self.tables.lock().insert(
            id,
            TableInfo {
                file,
                name: name.to_string(),
                primary_key: primary_key.to_string(),
            },
        );
        id
    }

    pub fn file(&self, table: TableId) -> Result<Arc<HeapFile>, CatalogError> {
        self.tables
            .lock()
            .get(&table)
            .map(|info| info.file.clone())
            .ok_or(CatalogError::TableNotFound(table))
    }

    pub fn schema(&self, table: TableId) -> Result<SchemaRef, CatalogError> {
        Ok(self.file(table)?.schema().clone())
    }

    pub fn table_name(&self, table: TableId) -> Result<String, CatalogError> {
        self.tables
            .lock()
            .get(&table)
            .map(|info| info.name.clone())
            .ok_or(CatalogError::TableNotFound(table))
    }

    pub fn primary_key(&self, table: TableId) -> Result<String, CatalogError> {
        self.tables
            .lock()
            .get(&table)
            .map(|info| info.primary_key.clone())
            .ok_or(CatalogError::TableNotFound(table))
    }

    pub fn table_id_of(&self, name: &str) -> Result<TableId, CatalogError> {
        self.tables
            .lock()
            .iter()
            .find(|(_, info)| info.name == name)
            .map(|(id, _)| *id)
            .ok_or_else(|| CatalogError::NoSuchTable(name.to_string()))
    }

    pub fn table_ids(&self) -> Vec<TableId> {
        self.tables.lock().keys().copied().collect()
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("no table with id {0}")]
    TableNotFound(TableId),
    #[error("no table named {0}")]
    NoSuchTable(String),
}
