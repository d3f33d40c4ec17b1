use super::{Executor, ExecutorImpl};
use crate::datum::{DataType, Datum};
use crate::execution::ExecutionError;
use crate::table::{Schema, SchemaRef, Tuple};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl fmt::Display for AggOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Count => "count",
        };
        write!(f, "{}", s)
    }
}

/// Accumulates integer values, optionally per group. Groups live in an
/// ordered map so emission is in ascending group-key order.
struct IntAggregator {
    afield: usize,
    gfield: Option<usize>,
    op: AggOp,
    groups: BTreeMap<Datum, Vec<i32>>,
    values: Vec<i32>,
}

impl IntAggregator {
    fn new(afield: usize, gfield: Option<usize>, op: AggOp) -> Self {
        Self {
            afield,
            gfield,
            op,
            groups: BTreeMap::new(),
            values: vec![],
        }
    }
    fn merge(&mut self, tuple: &Tuple) -> Result<(), ExecutionError> {
        let value = match tuple.value_at(self.afield) {
            Datum::Int(value) => *value,
            datum => {
                return Err(ExecutionError::IllegalArgument(format!(
                    "integer aggregator fed {}",
                    datum
                )))
            }
        };
        match self.gfield {
            Some(gfield) => self
                .groups
                .entry(tuple.value_at(gfield).clone())
                .or_default()
                .push(value),
            None => self.values.push(value),
        }
        Ok(())
    }
    fn eval(op: AggOp, values: &[i32]) -> i32 {
        if values.is_empty() {
            return 0;
        }
        match op {
            AggOp::Min => *values.iter().min().unwrap_or(&0),
            AggOp::Max => *values.iter().max().unwrap_or(&0),
            AggOp::Sum => values.iter().sum(),
            // integer division, as the wire type demands
            AggOp::Avg => values.iter().sum::<i32>() / values.len() as i32,
            AggOp::Count => values.len() as i32,
        }
    }
    fn results(&self, schema: &SchemaRef) -> Result<Vec<Tuple>, ExecutionError> {
        match self.gfield {
            Some(_) => self
                .groups
                .iter()
                .map(|(key, values)| {
                    Tuple::new(
                        schema.clone(),
                        vec![key.clone(), Datum::Int(Self::eval(self.op, values))],
                    )
                    .map_err(ExecutionError::Table)
                })
                .collect(),
            None => Ok(vec![Tuple::new(
                schema.clone(),
                vec![Datum::Int(Self::eval(self.op, &self.values))],
            )?]),
        }
    }
}

/// COUNT over a char column, optionally per group. Any other op is
/// rejected at construction.
struct CharAggregator {
    gfield: Option<usize>,
    groups: BTreeMap<Datum, i32>,
    count: i32,
}

impl CharAggregator {
    fn new(gfield: Option<usize>) -> Self {
        Self {
            gfield,
            groups: BTreeMap::new(),
            count: 0,
        }
    }
    fn merge(&mut self, tuple: &Tuple) {
        match self.gfield {
            Some(gfield) => {
                *self.groups.entry(tuple.value_at(gfield).clone()).or_insert(0) += 1
            }
            None => self.count += 1,
        }
    }
    fn results(&self, schema: &SchemaRef) -> Result<Vec<Tuple>, ExecutionError> {
        match self.gfield {
            Some(_) => self
                .groups
                .iter()
                .map(|(key, count)| {
                    Tuple::new(schema.clone(), vec![key.clone(), Datum::Int(*count)])
                        .map_err(ExecutionError::Table)
                })
                .collect(),
            None => Ok(vec![Tuple::new(
                schema.clone(),
                vec![Datum::Int(self.count)],
            )?]),
        }
    }
}

enum AggregatorImpl {
    Int(IntAggregator),
    Char(CharAggregator),
}

impl AggregatorImpl {
    fn merge(&mut self, tuple: &Tuple) -> Result<(), ExecutionError> {
        match self {
            Self::Int(aggregator) => aggregator.merge(tuple),
            Self::Char(aggregator) => {
                aggregator.merge(tuple);
                Ok(())
            }
        }
    }
    fn results(&self, schema: &SchemaRef) -> Result<Vec<Tuple>, ExecutionError> {
        match self {
            Self::Int(aggregator) => aggregator.results(schema),
            Self::Char(aggregator) => aggregator.results(schema),
        }
    }
}

/// Group-accumulate-then-emit. `open` drains the child into the
/// aggregator and snapshots the output, so `rewind` is a cursor reset.
pub struct AggExecutor {
    pub(super) child: Box<ExecutorImpl>,
    afield: usize,
    gfield: Option<usize>,
    op: AggOp,
    schema: SchemaRef,
    results: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl AggExecutor {
    pub fn new(
        child: ExecutorImpl,
        afield: usize,
        gfield: Option<usize>,
        op: AggOp,
    ) -> Result<Self, ExecutionError> {
        let child_schema = child.schema();
        if let DataType::Char(_) = child_schema.type_at(afield) {
            if op != AggOp::Count {
                return Err(ExecutionError::IllegalArgument(format!(
                    "char aggregator supports only count, got {}",
                    op
                )));
            }
        }
        let agg_column = (
            DataType::new_int(),
            format!("{}({})", op, child_schema.column_at(afield).desc),
        );
        let schema = Arc::new(match gfield {
            Some(gfield) => {
                let group_column = child_schema.column_at(gfield);
                Schema::from_slice(&[
                    (group_column.data_type, group_column.desc.clone()),
                    agg_column,
                ])
            }
            None => Schema::from_slice(&[agg_column]),
        });
        Ok(Self {
            child: Box::new(child),
            afield,
            gfield,
            op,
            schema,
            results: vec![],
            cursor: 0,
            opened: false,
        })
    }

    fn build_aggregator(&self) -> AggregatorImpl {
        match self.child.schema().type_at(self.afield) {
            DataType::Int => {
                AggregatorImpl::Int(IntAggregator::new(self.afield, self.gfield, self.op))
            }
            DataType::Char(_) => AggregatorImpl::Char(CharAggregator::new(self.gfield)),
        }
    }
}

impl Executor for AggExecutor {
    fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }
    fn open(&mut self) -> Result<(), ExecutionError> {
        self.child.open()?;
        let mut aggregator = self.build_aggregator();
        while let Some(tuple) = self.child.next()? {
            aggregator.merge(&tuple)?;
        }
        self.results = aggregator.results(&self.schema)?;
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }
    fn next(&mut self) -> Result<Option<Tuple>, ExecutionError> {
        if !self.opened {
            return Err(ExecutionError::IllegalState("aggregate is not open"));
        }
        if self.cursor < self.results.len() {
            self.cursor += 1;
            Ok(Some(self.results[self.cursor - 1].clone()))
        } else {
            Ok(None)
        }
    }
    fn rewind(&mut self) -> Result<(), ExecutionError> {
        if !self.opened {
            return Err(ExecutionError::IllegalState("aggregate is not open"));
        }
        self.cursor = 0;
        Ok(())
    }
    fn close(&mut self) {
        self.child.close();
        self.results = vec![];
        self.cursor = 0;
        self.opened = false;
    }
}
