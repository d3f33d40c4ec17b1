use super::Executor;
use crate::datum::Datum;
use crate::execution::ExecutionError;
use crate::table::{SchemaRef, Tuple};

/// Leaf operator yielding a fixed list of rows; the usual source under
/// an insert.
pub struct ValuesExecutor {
    schema: SchemaRef,
    tuples: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl ValuesExecutor {
    pub fn new(schema: SchemaRef, rows: Vec<Vec<Datum>>) -> Result<Self, ExecutionError> {
        let tuples = rows
            .into_iter()
            .map(|row| Tuple::new(schema.clone(), row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            schema,
            tuples,
            cursor: 0,
            opened: false,
        })
    }
}

impl Executor for ValuesExecutor {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
    fn open(&mut self) -> Result<(), ExecutionError> {
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }
    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError> {
        if !self.opened {
            return Err(ExecutionError::IllegalState("values is not open"));
        }
        if self.cursor < self.tuples.len() {
            self.cursor += 1;
            Ok(Some(self.tuples[self.cursor - 1].clone()))
        } else {
            Ok(None)
        }
    }
    fn rewind(&mut self) -> Result<(), ExecutionError> {
        if !self.opened {
            return Err(ExecutionError::IllegalState("values is not open"));
        }
        self.cursor = 0;
        Ok(())
    }
    fn close(&mut self) {
        self.opened = false;
        self.cursor = 0;
    }
}
