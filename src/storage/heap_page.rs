use super::{PageId, StorageError};
use crate::table::{RecordId, SchemaRef, Tuple};
use crate::transaction::TransactionId;
use parking_lot::RwLock;
use std::io;
use std::sync::Arc;

///
/// HeapPage format (exactly `page_size` bytes):
///
///     | header bitmap | slot[0] | slot[1] | ... | slot[n-1] | padding |
///
/// The header holds one bit per slot, LSB-first within each byte; bit i
/// is set iff slot i holds a live tuple. Each slot is one fixed-size
/// tuple record. Freed slots serialize as zeros so the byte image is
/// deterministic.
///
#[derive(Debug)]
pub struct HeapPage {
    pid: PageId,
    schema: SchemaRef,
    page_size: usize,
    header: Vec<u8>,
    tuples: Vec<Option<Tuple>>,
    dirty: Option<TransactionId>,
    before_image: Vec<u8>,
}

pub type PageRef = Arc<RwLock<HeapPage>>;

impl HeapPage {
    /// One header bit per slot: `floor(8 * page_size / (8 * tuple_size + 1))`.
    pub fn slots_per_page(page_size: usize, tuple_size: usize) -> usize {
        page_size * 8 / (tuple_size * 8 + 1)
    }
    pub fn header_size(slots: usize) -> usize {
        (slots + 7) / 8
    }
    pub fn empty_page_data(page_size: usize) -> Vec<u8> {
        vec![0u8; page_size]
    }

    pub fn parse(
        pid: PageId,
        schema: SchemaRef,
        page_size: usize,
        bytes: &[u8],
    ) -> Result<Self, StorageError> {
        if bytes.len() != page_size {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{} bytes for a {}-byte page", bytes.len(), page_size),
            )));
        }
        let tuple_size = schema.size_in_bytes();
        let slots = Self::slots_per_page(page_size, tuple_size);
        if slots == 0 {
            return Err(StorageError::SchemaMismatch);
        }
        let header_size = Self::header_size(slots);
        let header = bytes[0..header_size].to_vec();
        let mut tuples = Vec::with_capacity(slots);
        for slot in 0..slots {
            if header[slot / 8] >> (slot % 8) & 1 == 1 {
                let offset = header_size + slot * tuple_size;
                let mut tuple =
                    Tuple::from_bytes(schema.clone(), &bytes[offset..offset + tuple_size])?;
                tuple.set_record_id(Some(RecordId::new(pid, slot)));
                tuples.push(Some(tuple));
            } else {
                tuples.push(None);
            }
        }
        Ok(Self {
            pid,
            schema,
            page_size,
            header,
            tuples,
            dirty: None,
            before_image: bytes.to_vec(),
        })
    }

    /// Deterministic byte image; round-trips with `parse`. Slots whose
    /// header bit is clear serialize as zeros.
    pub fn page_data(&self) -> Result<Vec<u8>, StorageError> {
        let tuple_size = self.schema.size_in_bytes();
        let mut bytes = vec![0u8; self.page_size];
        bytes[0..self.header.len()].copy_from_slice(&self.header);
        for (slot, tuple) in self.tuples.iter().enumerate() {
            if let Some(tuple) = tuple {
                let offset = self.header.len() + slot * tuple_size;
                bytes[offset..offset + tuple_size].copy_from_slice(&tuple.to_bytes()?);
            }
        }
        Ok(bytes)
    }

    pub fn pid(&self) -> PageId {
        self.pid
    }
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }
    pub fn num_slots(&self) -> usize {
        self.tuples.len()
    }
    pub fn is_slot_used(&self, slot: usize) -> bool {
        self.header[slot / 8] >> (slot % 8) & 1 == 1
    }
    pub fn num_empty_slots(&self) -> usize {
        (0..self.tuples.len())
            .filter(|&slot| !self.is_slot_used(slot))
            .count()
    }

    /// Live tuples in slot order, each carrying its record id.
    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter().flatten()
    }

    /// First-fit insert: picks the lowest empty slot, sets its header
    /// bit and stamps the tuple's record id.
    pub fn insert_tuple(&mut self, mut tuple: Tuple) -> Result<RecordId, StorageError> {
        if **tuple.schema() != *self.schema {
            return Err(StorageError::SchemaMismatch);
        }
        // validate the record encodes before committing the slot
        tuple.to_bytes().map_err(StorageError::Table)?;
        let slot = (0..self.tuples.len())
            .find(|&slot| !self.is_slot_used(slot))
            .ok_or(StorageError::PageFull(self.pid))?;
        let record_id = RecordId::new(self.pid, slot);
        tuple.set_record_id(Some(record_id));
        self.header[slot / 8] |= 1 << (slot % 8);
        self.tuples[slot] = Some(tuple);
        Ok(record_id)
    }

    /// Clears the slot named by the tuple's record id.
    pub fn delete_tuple(&mut self, tuple: &Tuple) -> Result<(), StorageError> {
        let record_id = tuple.record_id().ok_or(StorageError::NoRecordId)?;
        if record_id.page_id != self.pid
            || record_id.slot >= self.tuples.len()
            || !self.is_slot_used(record_id.slot)
        {
            return Err(StorageError::InvalidRecord(record_id));
        }
        self.header[record_id.slot / 8] &= !(1 << (record_id.slot % 8));
        self.tuples[record_id.slot] = None;
        Ok(())
    }

    /// The dirty flag carries the last writer while set.
    pub fn mark_dirty(&mut self, dirty: Option<TransactionId>) {
        self.dirty = dirty;
    }
    pub fn is_dirty(&self) -> Option<TransactionId> {
        self.dirty
    }

    /// Byte image as of the last commit point, for UNDO logging.
    pub fn before_image_data(&self) -> &[u8] {
        &self.before_image
    }
    pub fn before_image(&self) -> Result<HeapPage, StorageError> {
        Self::parse(
            self.pid,
            self.schema.clone(),
            self.page_size,
            &self.before_image,
        )
    }
    /// Called at commit: the current state becomes the rollback point.
    pub fn set_before_image(&mut self) -> Result<(), StorageError> {
        self.before_image = self.page_data()?;
        Ok(())
    }
}
