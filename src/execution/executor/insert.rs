use super::{Executor, ExecutorImpl};
use crate::datum::{DataType, Datum};
use crate::db::DatabaseRef;
use crate::execution::ExecutionError;
use crate::storage::TableId;
use crate::table::{Schema, SchemaRef, Tuple};
use crate::transaction::TransactionId;
use log::info;
use std::sync::Arc;

/// Drains the child into the target table through the buffer pool and
/// yields a single tuple holding the insert count.
pub struct InsertExecutor {
    db: DatabaseRef,
    tid: TransactionId,
    table: TableId,
    table_schema: SchemaRef,
    pub(super) child: Box<ExecutorImpl>,
    schema: SchemaRef,
    executed: bool,
    opened: bool,
}

impl InsertExecutor {
    pub fn new(
        db: DatabaseRef,
        tid: TransactionId,
        table: TableId,
        child: ExecutorImpl,
    ) -> Result<Self, ExecutionError> {
        let table_schema = db.catalog().schema(table)?;
        if *child.schema() != *table_schema {
            return Err(ExecutionError::Table(
                crate::table::TableError::DatumSchemaNotMatch,
            ));
        }
        Ok(Self {
            db,
            tid,
            table,
            table_schema,
            child: Box::new(child),
            schema: Arc::new(Schema::from_slice(&[(
                DataType::new_int(),
                "inserted".to_string(),
            )])),
            executed: false,
            opened: false,
        })
    }
}

impl Executor for InsertExecutor {
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
            return Err(ExecutionError::IllegalState("insert is not open"));
        }
        if self.executed {
            return Ok(None);
        }
        self.executed = true;
        let mut count = 0;
        while let Some(tuple) = self.child.next()? {
            info!("insert tuple {}", tuple);
            let mut tuple = tuple.with_schema(self.table_schema.clone())?;
            tuple.set_record_id(None);
            self.db
                .buffer_pool()
                .insert_tuple(&self.db, self.tid, self.table, tuple)?;
            count += 1;
        }
        Ok(Some(Tuple::new(
            self.schema.clone(),
            vec![Datum::Int(count)],
        )?))
    }
    fn rewind(&mut self) -> Result<(), ExecutionError> {
        if !self.opened {
            return Err(ExecutionError::IllegalState("insert is not open"));
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
