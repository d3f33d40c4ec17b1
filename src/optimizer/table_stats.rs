use super::IntHistogram;
use crate::datum::Datum;
use crate::db::DatabaseRef;
use crate::expr::PredicateOp;
use crate::storage::{HeapFileIterator, StorageError, TableId};
use crate::transaction::TransactionId;

/// Histogram buckets per column.
const NUM_HIST_BUCKETS: usize = 100;

/// Per-table column statistics, built by two sequential scans: one for
/// per-column bounds, one to populate the histograms. Char columns are
/// keyed by their first four padded bytes so the integer histogram
/// serves both types.
pub struct TableStats {
    io_cost_per_page: usize,
    total_tuples: usize,
    num_pages: usize,
    histograms: Vec<IntHistogram>,
}

fn key_of(datum: &Datum) -> i32 {
    match datum {
        Datum::Int(v) => *v,
        Datum::Char(s) => {
            let mut key = [0u8; 4];
            for (slot, byte) in key.iter_mut().zip(s.as_bytes()) {
                *slot = *byte;
            }
            i32::from_be_bytes(key)
        }
    }
}

impl TableStats {
    pub fn new(
        db: DatabaseRef,
        tid: TransactionId,
        table: TableId,
        io_cost_per_page: usize,
    ) -> Result<Self, StorageError> {
        let schema = db.catalog().schema(table)?;
        let mut mins = vec![i32::MAX; schema.len()];
        let mut maxs = vec![i32::MIN; schema.len()];
        let mut total_tuples = 0;
        let mut iter = HeapFileIterator::new(db.clone(), tid, table)?;
        while let Some(tuple) = iter.next_tuple()? {
            total_tuples += 1;
            for field in 0..schema.len() {
                let key = key_of(tuple.value_at(field));
                mins[field] = mins[field].min(key);
                maxs[field] = maxs[field].max(key);
            }
        }
        let mut histograms = (0..schema.len())
            .map(|field| {
                if total_tuples == 0 {
                    IntHistogram::new(NUM_HIST_BUCKETS, 0, 0)
                } else {
                    IntHistogram::new(NUM_HIST_BUCKETS, mins[field], maxs[field])
                }
            })
            .collect::<Vec<_>>();
        iter.rewind();
        while let Some(tuple) = iter.next_tuple()? {
            for (field, histogram) in histograms.iter_mut().enumerate() {
                histogram.add_value(key_of(tuple.value_at(field)));
            }
        }
        let num_pages = db.catalog().file(table)?.num_pages()?;
        Ok(Self {
            io_cost_per_page,
            total_tuples,
            num_pages,
            histograms,
        })
    }

    pub fn estimate_selectivity(&self, field: usize, op: PredicateOp, constant: &Datum) -> f64 {
        self.histograms[field].estimate_selectivity(op, key_of(constant))
    }

    pub fn total_tuples(&self) -> usize {
        self.total_tuples
    }

    /// Cost of one full sequential scan.
    pub fn estimate_scan_cost(&self) -> f64 {
        (self.num_pages * self.io_cost_per_page) as f64
    }

    /// Cardinality of a scan after a predicate of the given selectivity.
    pub fn estimate_table_cardinality(&self, selectivity: f64) -> usize {
        (self.total_tuples as f64 * selectivity) as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::DataType;
    use crate::db::Database;
    use crate::table::{Schema, Tuple};
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn statistics_over_a_small_table() {
        let dir = TempDir::new().unwrap();
        let db = Database::new();
        let schema = Arc::new(Schema::from_slice(&[
            (DataType::new_int(), "v".to_string()),
            (DataType::new_char(8), "s".to_string()),
        ]));
        let table = db
            .open_table(dir.path().join("t.dat"), schema.clone(), "v")
            .unwrap();
        let tid = TransactionId::new();
        for v in 1..=100 {
            let tuple = Tuple::new(
                schema.clone(),
                vec![Datum::Int(v), Datum::from(if v <= 50 { "aa" } else { "zz" })],
            )
            .unwrap();
            db.buffer_pool().insert_tuple(&db, tid, table, tuple).unwrap();
        }
        db.transaction_complete(tid, true).unwrap();

        let tid = TransactionId::new();
        let stats = TableStats::new(db.clone(), tid, table, 1000).unwrap();
        db.transaction_complete(tid, true).unwrap();
        assert_eq!(stats.total_tuples(), 100);
        assert_eq!(stats.estimate_scan_cost(), 1000.0);
        let half = stats.estimate_selectivity(0, PredicateOp::GreaterThan, &Datum::Int(50));
        assert!((half - 0.5).abs() < 0.05, "got {}", half);
        assert_eq!(stats.estimate_table_cardinality(0.5), 50);
        // char column: everything is >= "aa"
        let all = stats.estimate_selectivity(1, PredicateOp::GreaterThanOrEq, &Datum::from("aa"));
        assert!(all > 0.9, "got {}", all);
    }

    #[test]
    fn empty_table_yields_zero_estimates() {
        let dir = TempDir::new().unwrap();
        let db = Database::new();
        let schema = Arc::new(Schema::from_slice(&[(DataType::new_int(), "v".to_string())]));
        let table = db
            .open_table(dir.path().join("t.dat"), schema, "v")
            .unwrap();
        let tid = TransactionId::new();
        let stats = TableStats::new(db.clone(), tid, table, 7).unwrap();
        db.transaction_complete(tid, true).unwrap();
        assert_eq!(stats.total_tuples(), 0);
        assert_eq!(stats.estimate_scan_cost(), 0.0);
        assert_eq!(
            stats.estimate_selectivity(0, PredicateOp::Equals, &Datum::Int(3)),
            0.0
        );
    }
}
