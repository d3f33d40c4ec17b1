use crate::expr::PredicateOp;

/// Fixed-width histogram over one integer column, used for selectivity
/// estimation. Space and update time are constant in the number of
/// values seen.
pub struct IntHistogram {
    min: i32,
    max: i32,
    width: i64,
    tuples: usize,
    heights: Vec<usize>,
}

impl IntHistogram {
    /// `min <= max` required. The last bucket may extend past `max` when
    /// the range does not divide evenly.
    pub fn new(buckets: usize, min: i32, max: i32) -> Self {
        assert!(min <= max);
        assert!(buckets > 0);
        let span = max as i64 - min as i64 + 1;
        let mut buckets = buckets;
        let mut width = span / buckets as i64;
        if width == 0 {
            width = 1;
        } else if span % buckets as i64 != 0 {
            buckets += 1;
        }
        Self {
            min,
            max,
            width,
            tuples: 0,
            heights: vec![0; buckets],
        }
    }

    fn bucket_of(&self, v: i32) -> Option<usize> {
        if v < self.min || v > self.max {
            return None;
        }
        let idx = ((v as i64 - self.min as i64) / self.width) as usize;
        (idx < self.heights.len()).then_some(idx)
    }
    fn left(&self, bucket: usize) -> i64 {
        self.min as i64 + bucket as i64 * self.width
    }
    fn right(&self, bucket: usize) -> i64 {
        self.left(bucket) + self.width - 1
    }

    /// Values outside `[min, max]` are silently ignored.
    pub fn add_value(&mut self, v: i32) {
        if let Some(bucket) = self.bucket_of(v) {
            self.heights[bucket] += 1;
            self.tuples += 1;
        }
    }

    fn estimate_equal(&self, v: i32) -> f64 {
        if self.tuples == 0 {
            return 0.0;
        }
        match self.bucket_of(v) {
            Some(bucket) => {
                self.heights[bucket] as f64 / self.width as f64 / self.tuples as f64
            }
            None => 0.0,
        }
    }

    fn estimate_greater_than(&self, v: i32) -> f64 {
        if v < self.min {
            return 1.0;
        }
        if v >= self.max || self.tuples == 0 {
            return 0.0;
        }
        let bucket = match self.bucket_of(v) {
            Some(bucket) => bucket,
            None => return 0.0,
        };
        let b_f = (self.right(bucket) - v as i64) as f64 / self.tuples as f64;
        let b_part = self.heights[bucket] as f64 / self.width as f64;
        let mut selectivity = b_f * b_part;
        for b in bucket + 1..self.heights.len() {
            selectivity += self.heights[b] as f64 / self.tuples as f64;
        }
        selectivity
    }

    fn estimate_less_than(&self, v: i32) -> f64 {
        if v <= self.min {
            return 0.0;
        }
        if v > self.max {
            return 1.0;
        }
        if self.tuples == 0 {
            return 0.0;
        }
        let bucket = match self.bucket_of(v) {
            Some(bucket) => bucket,
            None => return 0.0,
        };
        let b_f = (v as i64 - self.left(bucket)) as f64 / self.tuples as f64;
        let b_part = self.heights[bucket] as f64 / self.width as f64;
        let mut selectivity = b_f * b_part;
        for b in 0..bucket {
            selectivity += self.heights[b] as f64 / self.tuples as f64;
        }
        selectivity
    }

    /// Estimated fraction of recorded values satisfying `op v`, in
    /// `[0, 1]`.
    pub fn estimate_selectivity(&self, op: PredicateOp, v: i32) -> f64 {
        match op {
            PredicateOp::Equals | PredicateOp::Like => self.estimate_equal(v),
            PredicateOp::NotEquals => 1.0 - self.estimate_equal(v),
            PredicateOp::GreaterThan => self.estimate_greater_than(v),
            PredicateOp::GreaterThanOrEq => self.estimate_greater_than(v.saturating_sub(1)),
            PredicateOp::LessThan => self.estimate_less_than(v),
            PredicateOp::LessThanOrEq => self.estimate_less_than(v.saturating_add(1)),
        }
    }

    pub fn num_values(&self) -> usize {
        self.tuples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform() -> IntHistogram {
        let mut histogram = IntHistogram::new(10, 1, 100);
        for v in 1..=100 {
            histogram.add_value(v);
        }
        histogram
    }

    #[test]
    fn out_of_range_values_are_ignored() {
        let mut histogram = IntHistogram::new(4, 0, 10);
        histogram.add_value(-5);
        histogram.add_value(11);
        histogram.add_value(3);
        assert_eq!(histogram.num_values(), 1);
        assert_eq!(histogram.estimate_selectivity(PredicateOp::Equals, -5), 0.0);
        assert_eq!(histogram.estimate_selectivity(PredicateOp::Equals, 11), 0.0);
    }

    #[test]
    fn boundary_estimates() {
        let histogram = uniform();
        assert_eq!(
            histogram.estimate_selectivity(PredicateOp::GreaterThan, 100),
            0.0
        );
        assert_eq!(
            histogram.estimate_selectivity(PredicateOp::LessThan, 1),
            0.0
        );
        assert_eq!(
            histogram.estimate_selectivity(PredicateOp::GreaterThan, 0),
            1.0
        );
        assert_eq!(histogram.estimate_selectivity(PredicateOp::Equals, 0), 0.0);
        assert_eq!(
            histogram.estimate_selectivity(PredicateOp::Equals, 101),
            0.0
        );
    }

    #[test]
    fn eq_gt_lt_partition_unity() {
        let histogram = uniform();
        for v in [1, 5, 37, 50, 99] {
            let eq = histogram.estimate_selectivity(PredicateOp::Equals, v);
            let gt = histogram.estimate_selectivity(PredicateOp::GreaterThan, v);
            let lt = histogram.estimate_selectivity(PredicateOp::LessThan, v);
            assert!((eq + gt + lt - 1.0).abs() < 1e-9, "v = {}", v);
        }
    }

    #[test]
    fn skew_shows_up_in_estimates() {
        let mut histogram = IntHistogram::new(10, 1, 100);
        for _ in 0..90 {
            histogram.add_value(5);
        }
        for _ in 0..10 {
            histogram.add_value(95);
        }
        let low = histogram.estimate_selectivity(PredicateOp::Equals, 5);
        let high = histogram.estimate_selectivity(PredicateOp::Equals, 95);
        assert!(low > high);
        assert!(histogram.estimate_selectivity(PredicateOp::LessThan, 50) > 0.8);
    }

    #[test]
    fn uneven_range_rounds_bucket_count_up() {
        // span 11 over 4 buckets: width 2, five buckets cover the range
        let mut histogram = IntHistogram::new(4, 0, 10);
        for v in 0..=10 {
            histogram.add_value(v);
        }
        assert_eq!(histogram.num_values(), 11);
        assert!(histogram.estimate_selectivity(PredicateOp::Equals, 10) > 0.0);
    }
}
