/// Per-instance knobs. Every `Database` carries its own copy so tests can
/// run with tiny pools and short lock timeouts.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Bytes per disk-resident page, fixed for the lifetime of a database.
    pub page_size: usize,
    /// Maximum number of pages the buffer pool caches.
    pub pool_capacity: usize,
    /// Fixed width in bytes of every `char` column.
    pub string_len: usize,
    /// Upper bound of the randomized lock-acquisition timeout.
    pub deadlock_timeout_ms: u64,
}

pub const PAGE_SIZE: usize = 4096;
pub const DEFAULT_PAGES: usize = 50;
pub const STRING_LEN: usize = 128;
pub const DEADLOCK_TIMEOUT_MS: u64 = 5000;

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            pool_capacity: DEFAULT_PAGES,
            string_len: STRING_LEN,
            deadlock_timeout_ms: DEADLOCK_TIMEOUT_MS,
        }
    }
}

impl DbConfig {
    pub fn small(pool_capacity: usize) -> Self {
        Self {
            pool_capacity,
            ..Self::default()
        }
    }
}
