use crate::catalog::CatalogError;
use crate::storage::StorageError;
use crate::table::{SchemaRef, TableError, Tuple};
use itertools::Itertools;
use prettytable::{Cell, Row, Table as PrintTable};
use std::fmt;
use thiserror::Error;

mod executor;

pub use executor::{
    AggExecutor, AggOp, DeleteExecutor, Executor, ExecutorImpl, FilterExecutor, InsertExecutor,
    NestedLoopJoinExecutor, SeqScanExecutor, ValuesExecutor,
};

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("table error: {0}")]
    Table(#[from] TableError),
    #[error("illegal state: {0}")]
    IllegalState(&'static str),
    #[error("illegal argument: {0}")]
    IllegalArgument(String),
}

impl ExecutionError {
    /// True iff this failure is a deadlock-by-timeout abort, the one
    /// error a driver should respond to with `transaction_complete(tid,
    /// false)` and an optional retry.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Storage(err) if err.is_abort())
    }
}

/// Drained operator output, kept for display and assertions.
pub struct ResultSet {
    pub schema: SchemaRef,
    pub tuples: Vec<Tuple>,
}

impl fmt::Display for ResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut table = PrintTable::new();
        let header = self
            .schema
            .iter()
            .map(|c| Cell::new(c.desc.as_str()))
            .collect_vec();
        table.add_row(Row::new(header));
        self.tuples.iter().for_each(|tuple| {
            let cells = tuple
                .values()
                .iter()
                .map(|d| Cell::new(d.to_string().as_str()))
                .collect_vec();
            table.add_row(Row::new(cells));
        });
        write!(f, "{}", table)
    }
}
