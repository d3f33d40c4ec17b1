use super::{HeapPage, LockManager, LockMode, PageId, PageRef, StorageError};
use crate::config::DbConfig;
use crate::db::Database;
use crate::table::Tuple;
use crate::transaction::{Permissions, TransactionId};
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Bounded page cache mediating every page read and write. Acquires the
/// page lock matching the requested permission before touching the
/// cache, evicts only clean pages (NO-STEAL), and flushes a
/// transaction's dirty pages at commit (FORCE), logging each write
/// through the wal hook first.
///
/// Lock order is pool monitor, then page latch; no path takes the pool
/// monitor while holding a latch.
pub struct BufferPool {
    capacity: usize,
    pages: Mutex<HashMap<PageId, PageRef>>,
    lock_manager: LockManager,
}

impl BufferPool {
    pub fn new(config: &DbConfig) -> Self {
        Self {
            capacity: config.pool_capacity,
            pages: Mutex::new(HashMap::new()),
            lock_manager: LockManager::new(config.deadlock_timeout_ms),
        }
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> bool {
        self.lock_manager.holds_lock(tid, pid)
    }

    pub fn cached_pages(&self) -> usize {
        self.pages.lock().len()
    }

    /// Lock, then return the cached page; on miss, read through the
    /// owning heap file, evicting until space is available. While a page
    /// stays cached, every caller gets the same live object.
    pub fn get_page(
        &self,
        db: &Database,
        tid: TransactionId,
        pid: PageId,
        perm: Permissions,
    ) -> Result<PageRef, StorageError> {
        let mode = match perm {
            Permissions::ReadOnly => LockMode::Shared,
            Permissions::ReadWrite => LockMode::Exclusive,
        };
        self.lock_manager.acquire(tid, pid, mode)?;
        let mut pages = self.pages.lock();
        if let Some(page) = pages.get(&pid) {
            return Ok(page.clone());
        }
        let file = db.catalog().file(pid.table)?;
        let page = file.read_page(pid)?;
        while pages.len() >= self.capacity {
            Self::evict(&mut pages)?;
        }
        let page = Arc::new(RwLock::new(page));
        pages.insert(pid, page.clone());
        Ok(page)
    }

    /// NO-STEAL: only a clean page may be dropped from the cache. The
    /// choice among clean candidates is arbitrary.
    fn evict(pages: &mut HashMap<PageId, PageRef>) -> Result<(), StorageError> {
        let victim = pages
            .iter()
            .find(|(_, page)| page.read().is_dirty().is_none())
            .map(|(pid, _)| *pid);
        match victim {
            Some(pid) => {
                debug!("evicting clean {}", pid);
                pages.remove(&pid);
                Ok(())
            }
            None => Err(StorageError::BufferFull),
        }
    }

    /// Place `page` (back) in the cache after a mutation so future
    /// requests see the up-to-date object.
    fn reseat(&self, pid: PageId, page: PageRef) -> Result<(), StorageError> {
        let mut pages = self.pages.lock();
        if !pages.contains_key(&pid) {
            while pages.len() >= self.capacity {
                Self::evict(&mut pages)?;
            }
        }
        pages.insert(pid, page);
        Ok(())
    }

    pub fn insert_tuple(
        &self,
        db: &Database,
        tid: TransactionId,
        table: super::TableId,
        tuple: Tuple,
    ) -> Result<(), StorageError> {
        debug!("{} inserts {} into table {}", tid, tuple, table);
        let file = db.catalog().file(table)?;
        let modified = file.insert_tuple(db, tid, tuple)?;
        for page in modified {
            let pid = {
                let mut guard = page.write();
                guard.mark_dirty(Some(tid));
                guard.pid()
            };
            self.reseat(pid, page)?;
        }
        Ok(())
    }

    pub fn delete_tuple(
        &self,
        db: &Database,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<(), StorageError> {
        let record_id = tuple.record_id().ok_or(StorageError::NoRecordId)?;
        debug!("{} deletes {}", tid, record_id);
        let file = db.catalog().file(record_id.page_id.table)?;
        let page = file.delete_tuple(db, tid, tuple)?;
        let pid = {
            let mut guard = page.write();
            guard.mark_dirty(Some(tid));
            guard.pid()
        };
        self.reseat(pid, page)?;
        Ok(())
    }

    /// Commit or abort `tid`. On commit every dirty page in its lock set
    /// is forced to disk (wal-first) and re-snapshotted as the new
    /// before-image; on abort its dirty pages are discarded unwritten.
    /// All of `tid`'s locks are then released.
    pub fn transaction_complete(
        &self,
        db: &Database,
        tid: TransactionId,
        commit: bool,
    ) -> Result<(), StorageError> {
        info!(
            "{} completing with {}",
            tid,
            if commit { "commit" } else { "abort" }
        );
        {
            let mut pages = self.pages.lock();
            for pid in self.lock_manager.pages_of(tid) {
                let page = match pages.get(&pid) {
                    Some(page) => page.clone(),
                    None => continue,
                };
                let mut guard = page.write();
                if commit {
                    Self::flush_locked(db, &mut guard)?;
                    guard.set_before_image()?;
                } else if guard.is_dirty() == Some(tid) {
                    drop(guard);
                    pages.remove(&pid);
                }
            }
        }
        self.lock_manager.release_all(tid);
        if commit {
            db.log().log_commit(tid)?;
        } else {
            db.log().log_abort(tid)?;
        }
        Ok(())
    }

    /// Write one dirty page out, wal record first, and clear its flag.
    /// Clean pages are left untouched.
    fn flush_locked(db: &Database, page: &mut HeapPage) -> Result<(), StorageError> {
        let dirtier = match page.is_dirty() {
            Some(dirtier) => dirtier,
            None => return Ok(()),
        };
        let after = page.page_data()?;
        db.log().log_write(dirtier, page.before_image_data(), &after)?;
        db.log().force()?;
        db.catalog().file(page.pid().table)?.write_page(page)?;
        page.mark_dirty(None);
        Ok(())
    }

    pub fn flush_all_pages(&self, db: &Database) -> Result<(), StorageError> {
        let pages = self.pages.lock();
        for page in pages.values() {
            Self::flush_locked(db, &mut page.write())?;
        }
        Ok(())
    }

    /// Write out every dirty page in `tid`'s lock set.
    pub fn flush_pages(&self, db: &Database, tid: TransactionId) -> Result<(), StorageError> {
        let pages = self.pages.lock();
        for pid in self.lock_manager.pages_of(tid) {
            if let Some(page) = pages.get(&pid) {
                Self::flush_locked(db, &mut page.write())?;
            }
        }
        Ok(())
    }

    /// Drop a page from the cache without writing it. Used by recovery
    /// to keep rolled-back images out of the cache.
    pub fn discard_page(&self, pid: PageId) {
        self.pages.lock().remove(&pid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::{DataType, Datum};
    use crate::db::Database;
    use crate::table::{Schema, SchemaRef, Tuple};
    use tempfile::TempDir;

    fn one_int_schema() -> SchemaRef {
        Arc::new(Schema::from_slice(&[(DataType::new_int(), "v".to_string())]))
    }

    fn tuple(schema: &SchemaRef, v: i32) -> Tuple {
        Tuple::new(schema.clone(), vec![Datum::Int(v)]).unwrap()
    }

    /// Registers `tables` single-int tables and seeds each with one
    /// committed tuple so its file has exactly one page.
    fn seed_tables(
        db: &crate::db::DatabaseRef,
        dir: &TempDir,
        tables: usize,
    ) -> Vec<crate::storage::TableId> {
        let schema = one_int_schema();
        let ids = (0..tables)
            .map(|i| {
                db.open_table(dir.path().join(format!("t{}.dat", i)), schema.clone(), "v")
                    .unwrap()
            })
            .collect::<Vec<_>>();
        for &table in &ids {
            let tid = TransactionId::new();
            db.buffer_pool()
                .insert_tuple(db, tid, table, tuple(&schema, 1))
                .unwrap();
            db.transaction_complete(tid, true).unwrap();
        }
        ids
    }

    #[test]
    fn clean_pages_are_evicted_at_capacity() {
        let dir = TempDir::new().unwrap();
        let db = Database::with_config(crate::config::DbConfig::small(3));
        let tables = seed_tables(&db, &dir, 4);
        let tid = TransactionId::new();
        for &table in &tables {
            db.buffer_pool()
                .get_page(&db, tid, PageId::new(table, 0), Permissions::ReadOnly)
                .unwrap();
        }
        // four distinct clean pages through a pool of three
        assert_eq!(db.buffer_pool().cached_pages(), 3);
        db.transaction_complete(tid, true).unwrap();
    }

    #[test]
    fn all_dirty_pool_refuses_new_pages() {
        let dir = TempDir::new().unwrap();
        let db = Database::with_config(crate::config::DbConfig::small(2));
        let tables = seed_tables(&db, &dir, 3);
        let schema = one_int_schema();
        let tid = TransactionId::new();
        db.buffer_pool()
            .insert_tuple(&db, tid, tables[0], tuple(&schema, 2))
            .unwrap();
        db.buffer_pool()
            .insert_tuple(&db, tid, tables[1], tuple(&schema, 2))
            .unwrap();
        let err = db
            .buffer_pool()
            .get_page(&db, tid, PageId::new(tables[2], 0), Permissions::ReadOnly)
            .unwrap_err();
        assert!(matches!(err, StorageError::BufferFull));
        db.transaction_complete(tid, false).unwrap();
    }

    #[test]
    fn commit_forces_dirty_pages_to_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.dat");
        let schema = one_int_schema();
        {
            let db = Database::new();
            let table = db.open_table(&path, schema.clone(), "v").unwrap();
            let tid = TransactionId::new();
            db.buffer_pool()
                .insert_tuple(&db, tid, table, tuple(&schema, 42))
                .unwrap();
            db.transaction_complete(tid, true).unwrap();
        }
        // a fresh database sees the committed tuple straight off disk
        let db = Database::new();
        let table = db.open_table(&path, schema, "v").unwrap();
        let tid = TransactionId::new();
        let page = db
            .buffer_pool()
            .get_page(&db, tid, PageId::new(table, 0), Permissions::ReadOnly)
            .unwrap();
        let values: Vec<_> = page.read().iter().map(|t| t.value_at(0).clone()).collect();
        assert_eq!(values, vec![Datum::Int(42)]);
    }

    #[test]
    fn abort_discards_dirty_pages() {
        let dir = TempDir::new().unwrap();
        let db = Database::new();
        let schema = one_int_schema();
        let table = db
            .open_table(dir.path().join("t.dat"), schema.clone(), "v")
            .unwrap();
        let t1 = TransactionId::new();
        db.buffer_pool()
            .insert_tuple(&db, t1, table, tuple(&schema, 1))
            .unwrap();
        db.transaction_complete(t1, true).unwrap();

        let t2 = TransactionId::new();
        db.buffer_pool()
            .insert_tuple(&db, t2, table, tuple(&schema, 2))
            .unwrap();
        db.transaction_complete(t2, false).unwrap();

        // the aborted insert is gone, on disk and in cache
        let t3 = TransactionId::new();
        let page = db
            .buffer_pool()
            .get_page(&db, t3, PageId::new(table, 0), Permissions::ReadOnly)
            .unwrap();
        let values: Vec<_> = page.read().iter().map(|t| t.value_at(0).clone()).collect();
        assert_eq!(values, vec![Datum::Int(1)]);
        db.transaction_complete(t3, true).unwrap();
    }

    #[test]
    fn flush_pages_then_discard_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let db = Database::new();
        let schema = one_int_schema();
        let table = db
            .open_table(dir.path().join("t.dat"), schema.clone(), "v")
            .unwrap();
        let tid = TransactionId::new();
        db.buffer_pool()
            .insert_tuple(&db, tid, table, tuple(&schema, 7))
            .unwrap();
        db.buffer_pool().flush_pages(&db, tid).unwrap();
        db.buffer_pool().flush_all_pages(&db).unwrap();
        let pid = PageId::new(table, 0);
        db.buffer_pool().discard_page(pid);
        assert_eq!(db.buffer_pool().cached_pages(), 0);
        // the flushed image comes back from disk
        let page = db
            .buffer_pool()
            .get_page(&db, tid, pid, Permissions::ReadOnly)
            .unwrap();
        let values: Vec<_> = page.read().iter().map(|t| t.value_at(0).clone()).collect();
        assert_eq!(values, vec![Datum::Int(7)]);
        db.transaction_complete(tid, true).unwrap();
    }

    #[test]
    fn locks_are_released_on_completion() {
        let dir = TempDir::new().unwrap();
        let db = Database::new();
        let tables = seed_tables(&db, &dir, 1);
        let pid = PageId::new(tables[0], 0);
        let tid = TransactionId::new();
        db.buffer_pool()
            .get_page(&db, tid, pid, Permissions::ReadWrite)
            .unwrap();
        assert!(db.buffer_pool().holds_lock(tid, pid));
        db.transaction_complete(tid, true).unwrap();
        assert!(!db.buffer_pool().holds_lock(tid, pid));
    }
}
