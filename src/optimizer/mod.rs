mod histogram;
mod table_stats;

pub use histogram::IntHistogram;
pub use table_stats::TableStats;
