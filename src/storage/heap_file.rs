use super::{HeapPage, PageId, PageRef, StorageError, TableId};
use crate::config::DbConfig;
use crate::db::{Database, DatabaseRef};
use crate::table::{SchemaRef, Tuple};
use crate::transaction::{Permissions, TransactionId};
use log::info;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One table's backing store: a sequence of fixed-size heap pages in a
/// single OS file, page `p` at byte offset `p * page_size`. Grows by
/// appending a fresh page when no existing page has capacity.
///
/// The heap file does no locking of its own; every page access funnels
/// through the buffer pool, which serializes writers per page.
pub struct HeapFile {
    path: PathBuf,
    id: TableId,
    schema: SchemaRef,
    page_size: usize,
    file: Mutex<std::fs::File>,
}

/// FNV-1a over the canonical path, truncated. Stable across restarts so
/// record ids written to disk keep naming the same table.
fn stable_table_id(path: &Path) -> TableId {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in path.to_string_lossy().as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash as TableId
}

impl HeapFile {
    pub fn open(
        path: impl AsRef<Path>,
        schema: SchemaRef,
        config: &DbConfig,
    ) -> Result<Self, StorageError> {
        if HeapPage::slots_per_page(config.page_size, schema.size_in_bytes()) == 0 {
            return Err(StorageError::SchemaMismatch);
        }
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path.as_ref())?;
        let path = path.as_ref().canonicalize()?;
        let id = stable_table_id(&path);
        Ok(Self {
            path,
            id,
            schema,
            page_size: config.page_size,
            file: Mutex::new(file),
        })
    }

    pub fn id(&self) -> TableId {
        self.id
    }
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_pages(&self) -> Result<usize, StorageError> {
        let len = self.file.lock().metadata()?.len() as usize;
        Ok(len / self.page_size)
    }

    pub fn read_page(&self, pid: PageId) -> Result<HeapPage, StorageError> {
        if pid.page_no >= self.num_pages()? {
            return Err(StorageError::PageOutOfBound(pid));
        }
        let mut bytes = vec![0u8; self.page_size];
        {
            let mut file = self.file.lock();
            file.seek(SeekFrom::Start((pid.page_no * self.page_size) as u64))?;
            file.read_exact(&mut bytes)?;
        }
        HeapPage::parse(pid, self.schema.clone(), self.page_size, &bytes)
    }

    pub fn write_page(&self, page: &HeapPage) -> Result<(), StorageError> {
        let bytes = page.page_data()?;
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start((page.pid().page_no * self.page_size) as u64))?;
        file.write_all(&bytes)?;
        Ok(())
    }

    /// Appends one zeroed page image, extending the file.
    fn append_empty_page(&self) -> Result<(), StorageError> {
        let mut file = self.file.lock();
        file.seek(SeekFrom::End(0))?;
        file.write_all(&HeapPage::empty_page_data(self.page_size))?;
        Ok(())
    }

    /// First-fit insert. Walks existing pages in page order, obtaining
    /// each with an X-lock through the buffer pool, and places the tuple
    /// on the first page with a free slot; extends the file with a fresh
    /// page when every page is full. Returns the pages it modified.
    pub fn insert_tuple(
        &self,
        db: &Database,
        tid: TransactionId,
        tuple: Tuple,
    ) -> Result<Vec<PageRef>, StorageError> {
        let num_pages = self.num_pages()?;
        let mut target = None;
        for page_no in 0..num_pages {
            let pid = PageId::new(self.id, page_no);
            let page = db
                .buffer_pool()
                .get_page(db, tid, pid, Permissions::ReadWrite)?;
            if page.read().num_empty_slots() > 0 {
                target = Some(page);
                break;
            }
        }
        let page = match target {
            Some(page) => page,
            None => {
                self.append_empty_page()?;
                info!(
                    "heap file {} grown to {} pages",
                    self.path.display(),
                    num_pages + 1
                );
                let pid = PageId::new(self.id, num_pages);
                db.buffer_pool()
                    .get_page(db, tid, pid, Permissions::ReadWrite)?
            }
        };
        page.write().insert_tuple(tuple)?;
        Ok(vec![page])
    }

    /// Clears the slot named by the tuple's record id, via an X-lock on
    /// its page. Returns the modified page.
    pub fn delete_tuple(
        &self,
        db: &Database,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<PageRef, StorageError> {
        let record_id = tuple.record_id().ok_or(StorageError::NoRecordId)?;
        if record_id.page_id.table != self.id {
            return Err(StorageError::InvalidRecord(record_id));
        }
        let page = db
            .buffer_pool()
            .get_page(db, tid, record_id.page_id, Permissions::ReadWrite)?;
        page.write().delete_tuple(tuple)?;
        Ok(page)
    }
}

/// Pull iterator over a table's live tuples: pages in page order under
/// S-locks, tuples in slot order within each page.
pub struct HeapFileIterator {
    db: DatabaseRef,
    file: Arc<HeapFile>,
    tid: TransactionId,
    next_page_no: usize,
    buffer: VecDeque<Tuple>,
}

impl HeapFileIterator {
    pub fn new(
        db: DatabaseRef,
        tid: TransactionId,
        table: TableId,
    ) -> Result<Self, StorageError> {
        let file = db.catalog().file(table)?;
        Ok(Self {
            db,
            file,
            tid,
            next_page_no: 0,
            buffer: VecDeque::new(),
        })
    }

    pub fn next_tuple(&mut self) -> Result<Option<Tuple>, StorageError> {
        loop {
            if let Some(tuple) = self.buffer.pop_front() {
                return Ok(Some(tuple));
            }
            if self.next_page_no >= self.file.num_pages()? {
                return Ok(None);
            }
            let pid = PageId::new(self.file.id(), self.next_page_no);
            let page = self
                .db
                .buffer_pool()
                .get_page(&self.db, self.tid, pid, Permissions::ReadOnly)?;
            self.buffer.extend(page.read().iter().cloned());
            self.next_page_no += 1;
        }
    }

    pub fn rewind(&mut self) {
        self.next_page_no = 0;
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datum::{DataType, Datum};
    use crate::db::Database;
    use crate::table::Schema;
    use itertools::Itertools;
    use tempfile::TempDir;

    fn int_schema() -> SchemaRef {
        Arc::new(Schema::from_slice(&[
            (DataType::new_int(), "a".to_string()),
            (DataType::new_int(), "b".to_string()),
        ]))
    }

    fn int_tuple(schema: &SchemaRef, v: i32) -> Tuple {
        Tuple::new(schema.clone(), vec![Datum::Int(v), Datum::Int(-v)]).unwrap()
    }

    #[test]
    fn table_id_is_stable_per_path() {
        let dir = TempDir::new().unwrap();
        let db = Database::new();
        let schema = int_schema();
        let first = db
            .open_table(dir.path().join("t.dat"), schema.clone(), "a")
            .unwrap();
        let again = HeapFile::open(dir.path().join("t.dat"), schema.clone(), db.config()).unwrap();
        assert_eq!(first, again.id());
        let other = HeapFile::open(dir.path().join("u.dat"), schema, db.config()).unwrap();
        assert_ne!(first, other.id());
    }

    #[test]
    fn read_past_eof_is_out_of_bound() {
        let dir = TempDir::new().unwrap();
        let db = Database::new();
        let table = db
            .open_table(dir.path().join("t.dat"), int_schema(), "a")
            .unwrap();
        let file = db.catalog().file(table).unwrap();
        assert_eq!(file.num_pages().unwrap(), 0);
        assert!(matches!(
            file.read_page(PageId::new(table, 0)),
            Err(StorageError::PageOutOfBound(_))
        ));
    }

    #[test]
    fn insert_spans_pages_and_scan_sees_all() {
        let dir = TempDir::new().unwrap();
        let db = Database::new();
        let schema = int_schema();
        let table = db
            .open_table(dir.path().join("t.dat"), schema.clone(), "a")
            .unwrap();
        let file = db.catalog().file(table).unwrap();
        let per_page = HeapPage::slots_per_page(db.config().page_size, schema.size_in_bytes());
        let total = per_page + 3;
        let tid = TransactionId::new();
        for v in 0..total as i32 {
            db.buffer_pool()
                .insert_tuple(&db, tid, table, int_tuple(&schema, v))
                .unwrap();
        }
        assert_eq!(file.num_pages().unwrap(), 2);
        let mut iter = HeapFileIterator::new(db.clone(), tid, table).unwrap();
        let mut seen = vec![];
        while let Some(tuple) = iter.next_tuple().unwrap() {
            let record_id = tuple.record_id().unwrap();
            assert_eq!(record_id.page_id.table, table);
            assert!(record_id.slot < per_page);
            seen.push(tuple.value_at(0).clone());
        }
        assert_eq!(seen, (0..total as i32).map(Datum::Int).collect_vec());
        db.transaction_complete(tid, true).unwrap();
    }

    #[test]
    fn delete_rejects_foreign_table() {
        let dir = TempDir::new().unwrap();
        let db = Database::new();
        let schema = int_schema();
        let table = db
            .open_table(dir.path().join("t.dat"), schema.clone(), "a")
            .unwrap();
        let other = db
            .open_table(dir.path().join("u.dat"), schema.clone(), "a")
            .unwrap();
        let tid = TransactionId::new();
        db.buffer_pool()
            .insert_tuple(&db, tid, table, int_tuple(&schema, 1))
            .unwrap();
        let mut iter = HeapFileIterator::new(db.clone(), tid, table).unwrap();
        let stored = iter.next_tuple().unwrap().unwrap();
        let foreign = db.catalog().file(other).unwrap();
        assert!(matches!(
            foreign.delete_tuple(&db, tid, &stored),
            Err(StorageError::InvalidRecord(_))
        ));
        db.transaction_complete(tid, true).unwrap();
    }
}
