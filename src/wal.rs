use crate::transaction::TransactionId;
use std::io;

/// Seam between the engine and an external log/recovery subsystem.
///
/// The buffer pool calls `log_write` followed by `force` immediately
/// before each disk write of a dirty page, so a real implementation can
/// maintain write-ahead ordering. The engine itself never reads the log.
pub trait Wal: Send + Sync {
    fn log_begin(&self, tid: TransactionId) -> io::Result<()>;
    /// Record an UNDO/REDO pair for one page written by `dirtier`.
    fn log_write(&self, dirtier: TransactionId, before: &[u8], after: &[u8]) -> io::Result<()>;
    /// Make every record logged so far durable.
    fn force(&self) -> io::Result<()>;
    fn log_commit(&self, tid: TransactionId) -> io::Result<()>;
    fn log_abort(&self, tid: TransactionId) -> io::Result<()>;
}

/// Default hook: drops every record. Used when no recovery subsystem is
/// attached.
pub struct NoopWal;

impl Wal for NoopWal {
    fn log_begin(&self, _tid: TransactionId) -> io::Result<()> {
        Ok(())
    }
    fn log_write(
        &self,
        _dirtier: TransactionId,
        _before: &[u8],
        _after: &[u8],
    ) -> io::Result<()> {
        Ok(())
    }
    fn force(&self) -> io::Result<()> {
        Ok(())
    }
    fn log_commit(&self, _tid: TransactionId) -> io::Result<()> {
        Ok(())
    }
    fn log_abort(&self, _tid: TransactionId) -> io::Result<()> {
        Ok(())
    }
}
