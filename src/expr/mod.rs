use crate::datum::Datum;
use crate::table::Tuple;
use like::Like;
use std::fmt;

/// Comparison applied between a tuple field and a constant (or a second
/// field, for joins). `Like` falls back to equality on integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOp {
    Equals,
    NotEquals,
    LessThan,
    LessThanOrEq,
    GreaterThan,
    GreaterThanOrEq,
    Like,
}

impl PredicateOp {
    pub fn apply(&self, lhs: &Datum, rhs: &Datum) -> bool {
        match self {
            Self::Equals => lhs == rhs,
            Self::NotEquals => lhs != rhs,
            Self::LessThan => lhs < rhs,
            Self::LessThanOrEq => lhs <= rhs,
            Self::GreaterThan => lhs > rhs,
            Self::GreaterThanOrEq => lhs >= rhs,
            Self::Like => match (lhs, rhs) {
                (Datum::Char(value), Datum::Char(pattern)) => {
                    Like::<false>::like(value.as_str(), pattern.as_str()).unwrap_or(false)
                }
                _ => lhs == rhs,
            },
        }
    }
}

impl fmt::Display for PredicateOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Self::Equals => "=",
            Self::NotEquals => "<>",
            Self::LessThan => "<",
            Self::LessThanOrEq => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEq => ">=",
            Self::Like => "like",
        };
        write!(f, "{}", s)
    }
}

/// field[idx] op constant
#[derive(Debug, Clone)]
pub struct Predicate {
    pub field: usize,
    pub op: PredicateOp,
    pub operand: Datum,
}

impl Predicate {
    pub fn new(field: usize, op: PredicateOp, operand: Datum) -> Self {
        Self { field, op, operand }
    }
    pub fn filter(&self, tuple: &Tuple) -> bool {
        self.op.apply(tuple.value_at(self.field), &self.operand)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "field[{}] {} {}", self.field, self.op, self.operand)
    }
}

/// left.field[i] op right.field[j]
#[derive(Debug, Clone)]
pub struct JoinPredicate {
    pub left_field: usize,
    pub op: PredicateOp,
    pub right_field: usize,
}

impl JoinPredicate {
    pub fn new(left_field: usize, op: PredicateOp, right_field: usize) -> Self {
        Self {
            left_field,
            op,
            right_field,
        }
    }
    pub fn filter(&self, left: &Tuple, right: &Tuple) -> bool {
        self.op
            .apply(left.value_at(self.left_field), right.value_at(self.right_field))
    }
}
