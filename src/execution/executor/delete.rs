use super::{Executor, ExecutorImpl};
use crate::datum::{DataType, Datum};
use crate::db::DatabaseRef;
use crate::execution::ExecutionError;
use crate::table::{Schema, SchemaRef, Tuple};
use crate::transaction::TransactionId;
use log::info;
use std::sync::Arc;

/// Drains the child and removes each tuple (by its record id) through
/// the buffer pool; yields a single tuple holding the delete count.
pub struct DeleteExecutor {
    db: DatabaseRef,
    tid: TransactionId,
    pub(super) child: Box<ExecutorImpl>,
    schema: SchemaRef,
    executed: bool,
    opened: bool,
}

impl DeleteExecutor {
    pub fn new(db: DatabaseRef, tid: TransactionId, child: ExecutorImpl) -> Self {
        Self {
            db,
            tid,
            child: Box::new(child),
            schema: Arc::new(Schema::from_slice(&[(
                DataType::new_int(),
                "deleted".to_string(),
            )])),
            executed: false,
            opened: false,
        }
    }
}

impl Executor for DeleteExecutor {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
    fn open(&mut self) -> Result<(), ExecutionError> {
        self.child.open()?;
        self.executed = false;
        self.opened = true;
        Ok(())
    }
    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError> {
        if !self.opened {
            return Err(ExecutionError::IllegalState("delete is not open"));
        }
        if self.executed {
            return Ok(None);
        }
        self.executed = true;
        let mut count = 0;
        while let Some(tuple) = self.child.next()? {
            info!("delete tuple {}", tuple);
            self.db
                .buffer_pool()
                .delete_tuple(&self.db, self.tid, &tuple)?;
            count += 1;
        }
        Ok(Some(Tuple::new(
            self.schema.clone(),
            vec![Datum::Int(count)],
        )?))
    }
    fn rewind(&mut self) -> Result<(), ExecutionError> {
        if !self.opened {
            return Err(ExecutionError::IllegalState("delete is not open"));
        }
        self.child.rewind()?;
        self.executed = false;
        Ok(())
    }
    fn close(&mut self) {
        self.child.close();
        self.opened = false;
    }
}
