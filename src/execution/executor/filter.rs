use super::{Executor, ExecutorImpl};
use crate::execution::ExecutionError;
use crate::expr::Predicate;
use crate::table::{SchemaRef, Tuple};

/// Yields every child tuple the predicate accepts.
pub struct FilterExecutor {
    pub(super) child: Box<ExecutorImpl>,
    predicate: Predicate,
    opened: bool,
}

impl FilterExecutor {
    pub fn new(predicate: Predicate, child: ExecutorImpl) -> Self {
        Self {
            child: Box::new(child),
            predicate,
            opened: false,
        }
    }
}

impl Executor for FilterExecutor {
    fn schema(&self) -> SchemaRef {
        self.child.schema()
    }
    fn open(&mut self) -> Result<(), ExecutionError> {
        self.child.open()?;
        self.opened = true;
        Ok(())
    }
    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError> {
        if !self.opened {
            return Err(ExecutionError::IllegalState("filter is not open"));
        }
        while let Some(tuple) = self.child.next()? {
            if self.predicate.filter(&tuple) {
                return Ok(Some(tuple));
            }
        }
        Ok(None)
    }
    fn rewind(&mut self) -> Result<(), ExecutionError> {
        if !self.opened {
            return Err(ExecutionError::IllegalState("filter is not open"));
        }
        self.child.rewind()
    }
    fn close(&mut self) {
        self.child.close();
        self.opened = false;
    }
}
