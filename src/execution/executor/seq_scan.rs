use super::Executor;
use crate::db::DatabaseRef;
use crate::execution::ExecutionError;
use crate::storage::{HeapFileIterator, TableId};
use crate::table::{SchemaRef, Tuple};
use crate::transaction::TransactionId;
use std::sync::Arc;

/// Sequential scan: a thin wrapper over the heap file's iterator. The
/// output descriptor carries `alias.field` names.
pub struct SeqScanExecutor {
    db: DatabaseRef,
    tid: TransactionId,
    table: TableId,
    schema: SchemaRef,
    iter: Option<HeapFileIterator>,
}

impl SeqScanExecutor {
    pub fn new(
        db: DatabaseRef,
        tid: TransactionId,
        table: TableId,
        alias: &str,
    ) -> Result<Self, ExecutionError> {
        let schema = Arc::new(db.catalog().schema(table)?.with_prefix(alias));
        Ok(Self {
            db,
            tid,
            table,
            schema,
            iter: None,
        })
    }
}

impl Executor for SeqScanExecutor {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
    fn open(&mut self) -> Result<(), ExecutionError> {
        self.iter = Some(HeapFileIterator::new(self.db.clone(), self.tid, self.table)?);
        Ok(())
    }
    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError> {
        let iter = self
            .iter
            .as_mut()
            .ok_or(ExecutionError::IllegalState("seq scan is not open"))?;
        match iter.next_tuple()? {
            Some(tuple) => Ok(Some(tuple.with_schema(self.schema.clone())?)),
            None => Ok(None),
        }
    }
    fn rewind(&mut self) -> Result<(), ExecutionError> {
        self.iter
            .as_mut()
            .ok_or(ExecutionError::IllegalState("seq scan is not open"))?
            .rewind();
        Ok(())
    }
    fn close(&mut self) {
        self.iter = None;
    }
}
