//! The Android-ID (SSAID) store manager.
//!
//! This mutates the OS-level per-package identifier store: a mistake here
//! affects the whole device's identity subsystem, not just one app, so
//! every mutation is wrapped in a safety-copy/rollback guard and is only
//! reported successful after a verification re-read.
//!
//! Concurrency note: two overlapping mutations would race on the single
//! store file. Callers are expected to serialize operations; there is no
//! internal locking.

pub mod format;
pub mod sql;
pub mod xml;

pub use format::Encoding;
pub use xml::{IdentifierStoreEntry, SsaidDocument};

use crate::device::{
    SSAID_STORE, SSAID_STORE_BAK, SSAID_STORE_GROUP, SSAID_STORE_MODE, SSAID_STORE_OWNER,
};
use crate::extract::find_ssaid;
use crate::identifiers::{normalize_android_id, SENTINEL};
use crate::su::Su;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no binary/text converter on this device")]
    ConverterUnavailable,

    #[error("store conversion failed: {0}")]
    ConvertFailed(String),

    #[error("store parse failed: {0}")]
    ParseFailed(String),

    #[error("store serialization failed: {0}")]
    SerializeFailed(String),

    #[error("sql fallback failed: {0}")]
    SqlFailed(String),

    #[error("verification mismatch for {package}: wrote {expected}, read back {actual}")]
    VerifyMismatch {
        package: String,
        expected: String,
        actual: String,
    },

    #[error("every store mutation strategy failed; last error: {0}")]
    FallbacksExhausted(String),

    #[error("{0}")]
    Base(#[from] crate::Error),
}

/// Manages the per-app Android-ID store through an elevated shell
pub struct SsaidStore<'s> {
    su: &'s dyn Su,
}

impl<'s> SsaidStore<'s> {
    pub fn new(su: &'s dyn Su) -> Self {
        Self { su }
    }

    /// Sets the SSAID for `package`, creating the entry if needed.
    ///
    /// The value is validated and lowercased before anything touches the
    /// device. On any failure after the safety copy was taken, the copy is
    /// restored so the store is never left worse than it was found.
    pub fn set_android_id(&self, package: &str, value: &str) -> Result<()> {
        let value = normalize_android_id(value)?;

        self.with_rollback(|| self.apply(package, &value))
    }

    /// Reads the current SSAID for `package`, [SENTINEL] when absent
    pub fn read_android_id(&self, package: &str) -> Result<String> {
        let from_file = self.read_file_value(package)?;
        if from_file != SENTINEL {
            return Ok(from_file);
        }
        if sql::is_available(self.su) {
            if let Some(v) = sql::read_value(self.su, package)? {
                return Ok(v.to_ascii_lowercase());
            }
        }
        Ok(SENTINEL.into())
    }

    fn apply(&self, package: &str, value: &str) -> Result<()> {
        match self.try_file_mutation(package, value) {
            Ok(()) => Ok(()),
            Err(file_err) => {
                log::warn!(
                    "file-based mutation of the identifier store failed: {}",
                    file_err
                );
                if !sql::is_available(self.su) {
                    return Err(Error::FallbacksExhausted(file_err.to_string()));
                }
                log::info!("falling back to the sql identifier store");
                self.try_sql_mutation(package, value)
            }
        }
    }

    /// Read -> detect -> (convert) -> edit -> (convert) -> write -> verify
    fn try_file_mutation(&self, package: &str, value: &str) -> Result<()> {
        let (encoding, mut doc) = match self.read_store() {
            None => {
                log::info!("identifier store missing or unreadable, creating fresh");
                (Encoding::Text, SsaidDocument::new_empty())
            }
            Some(raw) => {
                let encoding = format::detect_encoding(&raw);
                let text = match encoding {
                    Encoding::Text => String::from_utf8_lossy(&raw).into_owned(),
                    Encoding::Binary => format::binary_to_text(self.su, &raw)?,
                };
                (encoding, SsaidDocument::parse(&text)?)
            }
        };

        doc.upsert(package, value);

        let text = doc.serialize()?;
        let bytes = match encoding {
            Encoding::Text => text.into_bytes(),
            Encoding::Binary => format::text_to_binary(self.su, &text)?,
        };

        self.write_store(&bytes)?;

        let actual = self.read_file_value(package)?;
        if !actual.eq_ignore_ascii_case(value) {
            return Err(Error::VerifyMismatch {
                package: package.into(),
                expected: value.into(),
                actual,
            });
        }
        Ok(())
    }

    fn try_sql_mutation(&self, package: &str, value: &str) -> Result<()> {
        sql::set_value(self.su, package, value)?;

        let actual = sql::read_value(self.su, package)?.unwrap_or_else(|| SENTINEL.into());
        if !actual.eq_ignore_ascii_case(value) {
            return Err(Error::VerifyMismatch {
                package: package.into(),
                expected: value.into(),
                actual,
            });
        }
        Ok(())
    }

    /// Raw store bytes, or `None` for the "create new" case.
    ///
    /// An unreadable file is treated the same as a missing one; if it was
    /// truly there but unreadable the subsequent write will fail and roll
    /// back.
    fn read_store(&self) -> Option<Vec<u8>> {
        match self.su.read_file_bytes(SSAID_STORE) {
            Ok(raw) if raw.iter().any(|b| !b.is_ascii_whitespace()) => Some(raw),
            Ok(_) => None,
            Err(e) => {
                log::debug!("identifier store read failed: {}", e);
                None
            }
        }
    }

    /// Writes via a temp sibling + atomic rename, then restores the
    /// ownership and mode the settings provider expects.
    fn write_store(&self, bytes: &[u8]) -> Result<()> {
        let tmp = format!("{}.tmp", SSAID_STORE);
        self.su.write_file_bytes(&tmp, bytes)?;
        self.su.move_file(&tmp, SSAID_STORE)?;
        self.su
            .chown(SSAID_STORE_OWNER, SSAID_STORE_GROUP, SSAID_STORE, false)?;
        self.su.chmod(SSAID_STORE_MODE, SSAID_STORE, false)?;
        self.su.sync_fs()?;
        Ok(())
    }

    /// Current value for `package` in the file store, [SENTINEL] if absent
    fn read_file_value(&self, package: &str) -> Result<String> {
        let raw = match self.read_store() {
            None => return Ok(SENTINEL.into()),
            Some(v) => v,
        };

        let text = match format::detect_encoding(&raw) {
            Encoding::Text => String::from_utf8_lossy(&raw).into_owned(),
            Encoding::Binary => match format::binary_to_text(self.su, &raw) {
                Ok(v) => v,
                Err(Error::ConverterUnavailable) => {
                    // No converter; pattern matching on the raw bytes still
                    // recovers the value for read purposes
                    return Ok(find_ssaid(&raw, package));
                }
                Err(e) => return Err(e),
            },
        };

        Ok(SsaidDocument::parse(&text)?
            .get(package)
            .map(|e| e.value.to_ascii_lowercase())
            .unwrap_or_else(|| SENTINEL.into()))
    }

    /// Scoped safety net: snapshot before, restore on any failure
    fn with_rollback<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let snapshotted = self.snapshot();

        let res = f();

        if res.is_err() && snapshotted {
            log::warn!("restoring identifier store from safety copy");
            if let Err(e) = self.restore_snapshot() {
                log::error!("failed to restore identifier store safety copy: {}", e);
            }
        }
        res
    }

    /// Best effort: failing to take the copy is logged but doesn't block,
    /// there is nothing to lose yet
    fn snapshot(&self) -> bool {
        if !self.su.file_exists(SSAID_STORE) {
            return false;
        }
        match self.su.copy(SSAID_STORE, SSAID_STORE_BAK) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("failed to create identifier store safety copy: {}", e);
                false
            }
        }
    }

    fn restore_snapshot(&self) -> crate::Result<()> {
        self.su.copy(SSAID_STORE_BAK, SSAID_STORE)?;
        self.su
            .chown(SSAID_STORE_OWNER, SSAID_STORE_GROUP, SSAID_STORE, false)?;
        self.su.chmod(SSAID_STORE_MODE, SSAID_STORE, false)?;
        Ok(())
    }
}
