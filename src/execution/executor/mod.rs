use super::{ExecutionError, ResultSet};
use crate::table::{SchemaRef, Tuple};

pub use agg::{AggExecutor, AggOp};
pub use delete::DeleteExecutor;
pub use filter::FilterExecutor;
pub use insert::InsertExecutor;
pub use nested_loop_join::NestedLoopJoinExecutor;
pub use seq_scan::SeqScanExecutor;
pub use values::ValuesExecutor;

mod agg;
mod delete;
mod filter;
mod insert;
mod nested_loop_join;
mod seq_scan;
mod values;

/// Pull contract shared by every operator. `open` may reach the buffer
/// pool (so it can block on locks or abort); `next` returns `Ok(None)`
/// at end of stream; `close` drops iterator state only, locks stay with
/// the transaction; `rewind` restarts from the beginning.
pub trait Executor {
    fn schema(&self) -> SchemaRef;
    fn open(&mut self) -> Result<(), ExecutionError>;
    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError>;
    fn rewind(&mut self) -> Result<(), ExecutionError>;
    fn close(&mut self);
}

pub enum ExecutorImpl {
    SeqScan(SeqScanExecutor),
    Filter(FilterExecutor),
    NestedLoopJoin(NestedLoopJoinExecutor),
    Agg(AggExecutor),
    Insert(InsertExecutor),
    Delete(DeleteExecutor),
    Values(ValuesExecutor),
}

impl ExecutorImpl {
    pub fn schema(&self) -> SchemaRef {
        match self {
            Self::SeqScan(executor) => executor.schema(),
            Self::Filter(executor) => executor.schema(),
            Self::NestedLoopJoin(executor) => executor.schema(),
            Self::Agg(executor) => executor.schema(),
            Self::Insert(executor) => executor.schema(),
            Self::Delete(executor) => executor.schema(),
            Self::Values(executor) => executor.schema(),
        }
    }
    pub fn open(&mut self) -> Result<(), ExecutionError> {
        match self {
            Self::SeqScan(executor) => executor.open(),
            Self::Filter(executor) => executor.open(),
            Self::NestedLoopJoin(executor) => executor.open(),
            Self::Agg(executor) => executor.open(),
            Self::Insert(executor) => executor.open(),
            Self::Delete(executor) => executor.open(),
            Self::Values(executor) => executor.open(),
        }
    }
    pub fn next(&mut self) -> Result<Option<Tuple>, ExecutionError> {
        match self {
            Self::SeqScan(executor) => executor.next(),
            Self::Filter(executor) => executor.next(),
            Self::NestedLoopJoin(executor) => executor.next(),
            Self::Agg(executor) => executor.next(),
            Self::Insert(executor) => executor.next(),
            Self::Delete(executor) => executor.next(),
            Self::Values(executor) => executor.next(),
        }
    }
    pub fn rewind(&mut self) -> Result<(), ExecutionError> {
        match self {
            Self::SeqScan(executor) => executor.rewind(),
            Self::Filter(executor) => executor.rewind(),
            Self::NestedLoopJoin(executor) => executor.rewind(),
            Self::Agg(executor) => executor.rewind(),
            Self::Insert(executor) => executor.rewind(),
            Self::Delete(executor) => executor.rewind(),
            Self::Values(executor) => executor.rewind(),
        }
    }
    pub fn close(&mut self) {
        match self {
            Self::SeqScan(executor) => executor.close(),
            Self::Filter(executor) => executor.close(),
            Self::NestedLoopJoin(executor) => executor.close(),
            Self::Agg(executor) => executor.close(),
            Self::Insert(executor) => executor.close(),
            Self::Delete(executor) => executor.close(),
            Self::Values(executor) => executor.close(),
        }
    }

    pub fn children(&self) -> Vec<&ExecutorImpl> {
        match self {
            Self::SeqScan(_) | Self::Values(_) => vec![],
            Self::Filter(executor) => vec![&executor.child],
            Self::NestedLoopJoin(executor) => vec![&executor.left, &executor.right],
            Self::Agg(executor) => vec![&executor.child],
            Self::Insert(executor) => vec![&executor.child],
            Self::Delete(executor) => vec![&executor.child],
        }
    }

    /// Replaces this operator's children, handing the old ones back to
    /// the caller. The replacement arity must match.
    pub fn set_children(
        &mut self,
        mut children: Vec<ExecutorImpl>,
    ) -> Result<Vec<ExecutorImpl>, ExecutionError> {
        let slots: Vec<&mut Box<ExecutorImpl>> = match self {
            Self::SeqScan(_) | Self::Values(_) => vec![],
            Self::Filter(executor) => vec![&mut executor.child],
            Self::NestedLoopJoin(executor) => vec![&mut executor.left, &mut executor.right],
            Self::Agg(executor) => vec![&mut executor.child],
            Self::Insert(executor) => vec![&mut executor.child],
            Self::Delete(executor) => vec![&mut executor.child],
        };
        if children.len() != slots.len() {
            return Err(ExecutionError::IllegalArgument(format!(
                "expected {} children, got {}",
                slots.len(),
                children.len()
            )));
        }
        let mut replaced = vec![];
        for slot in slots {
            let new_child = Box::new(children.remove(0));
            replaced.push(*std::mem::replace(slot, new_child));
        }
        Ok(replaced)
    }

    /// Open, drain to completion, close; the everyday driver loop.
    pub fn collect(&mut self) -> Result<ResultSet, ExecutionError> {
        self.open()?;
        let mut tuples = vec![];
        while let Some(tuple) = self.next()? {
            tuples.push(tuple);
        }
        self.close();
        Ok(ResultSet {
            schema: self.schema(),
            tuples,
        })
    }
}
