use super::{Executor, ExecutorImpl};
use crate::execution::ExecutionError;
use crate::expr::JoinPredicate;
use crate::table::{Schema, SchemaRef, Tuple};
use itertools::Itertools;
use std::sync::Arc;

/// Simple nested-loop join. For each left tuple the right child is
/// drained and then rewound, so output order is lexicographic in
/// (left position, right position).
pub struct NestedLoopJoinExecutor {
    pub(super) left: Box<ExecutorImpl>,
    pub(super) right: Box<ExecutorImpl>,
    predicate: JoinPredicate,
    schema: SchemaRef,
    current_left: Option<Tuple>,
    opened: bool,
}

impl NestedLoopJoinExecutor {
    pub fn new(predicate: JoinPredicate, left: ExecutorImpl, right: ExecutorImpl) -> Self {
        let schema = Arc::new(Schema::concat(&left.schema(), &right.schema()));
        Self {
            left: Box::new(left),
            right: Box::new(right),
            predicate,
            schema,
            current_left: None,
            opened: false,
        }
    }
}

impl Executor for NestedLoopJoinExecutor {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
    fn open(&mut self) -> Result<(), ExecutionError> {
        self.left.open()?;
        self.right.open()?;
        self.current_left = self.left.next()?;
        self.opened = true;
        Ok(())
    }
    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError> {
        if !self.opened {
            return Err(ExecutionError::IllegalState("join is not open"));
        }
        loop {
            let left_tuple = match &self.current_left {
                Some(tuple) => tuple.clone(),
                None => return Ok(None),
            };
            while let Some(right_tuple) = self.right.next()? {
                if self.predicate.filter(&left_tuple, &right_tuple) {
                    let values = left_tuple
                        .values()
                        .iter()
                        .chain(right_tuple.values().iter())
                        .cloned()
                        .collect_vec();
                    return Ok(Some(Tuple::new(self.schema.clone(), values)?));
                }
            }
            self.current_left = self.left.next()?;
            self.right.rewind()?;
        }
    }
    fn rewind(&mut self) -> Result<(), ExecutionError> {
        if !self.opened {
            return Err(ExecutionError::IllegalState("join is not open"));
        }
        self.left.rewind()?;
        self.right.rewind()?;
        self.current_left = self.left.next()?;
        Ok(())
    }
    fn close(&mut self) {
        self.left.close();
        self.right.close();
        self.current_left = None;
        self.opened = false;
    }
}
