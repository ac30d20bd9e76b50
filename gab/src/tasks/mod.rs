//! Backup/restore orchestration.
//!
//! Tasks run on the caller's background thread and report progress through
//! an [EventMonitor]. Operations against the same record are expected to
//! be serialized by the caller; nothing here locks.

pub mod backup;
pub mod delete;
pub mod restore;

pub use backup::{backup, BackupOptions, BackupOutcome, Credentials};
pub use delete::delete;
pub use restore::restore;

use crate::db::{self, Account, Database};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("account record {0} not found")]
    RecordNotFound(i32),

    #[error("backup for `{0}` is damaged: missing `{1}` directory")]
    DamagedBackup(String, String),

    #[error("failed to restore ownership: {0}")]
    Ownership(String),

    #[error("{0}")]
    Extract(#[from] crate::extract::Error),

    #[error("{0}")]
    DB(#[from] db::Error),

    #[error("{0}")]
    Base(#[from] crate::Error),
}

/// Progress events emitted during backup and restore
pub enum Event {
    StoppingApp,
    CapturingMetadata,
    Copying { src: String, dst: String },
    ExtractingIdentifiers,
    IdentifiersExtracted { missing: Vec<&'static str> },
    ApplyingSsaid,
    SsaidApplied { ok: bool },
    RestoringOwnership,
    IdentityChannelWritten { ok: bool },
    RecordPersisted { id: i32 },
}

pub trait EventMonitor<T>: Send + Sync {
    fn on_event(&self, evt: T);
}

impl<U> EventMonitor<U> for Box<dyn EventMonitor<U>> {
    fn on_event(&self, evt: U) {
        self.as_ref().on_event(evt)
    }
}

/// An [EventMonitor] that is just a noop
pub struct NoopMonitor;

impl<T> EventMonitor<T> for NoopMonitor {
    fn on_event(&self, _evt: T) {
        // noop
    }
}

impl NoopMonitor {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for NoopMonitor {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn get_record(db: &dyn Database, id: i32) -> Result<Account> {
    match db.get_account_by_id(id) {
        Ok(v) => Ok(v),
        Err(db::Error::NotFound) => Err(Error::RecordNotFound(id)),
        Err(e) => Err(e.into()),
    }
}
