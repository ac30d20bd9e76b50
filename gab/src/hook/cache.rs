//! TTL cache over the cross-process identity file.
//!
//! The interceptor runs inside the target app's process and may be asked
//! for the identifier many times in a burst; this bounds the cost to one
//! file read per TTL window. Clock and reader are injected so expiry is
//! testable without sleeping.

use std::fs;
use std::io;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::device::IDENTITY_FILE;
use crate::identifiers::IdentityPayload;

pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

pub type IdentityReader = Box<dyn Fn() -> io::Result<String> + Send + Sync>;

pub const DEFAULT_TTL_MILLIS: i64 = 5_000;

struct CachedRead {
    at: i64,
    payload: Option<IdentityPayload>,
}

/// Owned by the hosting process's composition root; lives as long as that
/// process does.
pub struct IdentityCache {
    reader: IdentityReader,
    clock: Box<dyn Clock>,
    ttl_millis: i64,
    state: Mutex<Option<CachedRead>>,
}

impl IdentityCache {
    pub fn new(reader: IdentityReader, clock: Box<dyn Clock>, ttl_millis: i64) -> Self {
        Self {
            reader,
            clock,
            ttl_millis,
            state: Mutex::new(None),
        }
    }

    /// Reads [IDENTITY_FILE] directly; the file is world-readable so no
    /// elevation is needed from inside the target process.
    pub fn with_default_reader() -> Self {
        Self::new(
            Box::new(|| fs::read_to_string(IDENTITY_FILE)),
            Box::new(SystemClock),
            DEFAULT_TTL_MILLIS,
        )
    }

    /// The current identity, or `None` when the channel file is missing or
    /// malformed. Misses are cached too; a missing file stays "missing"
    /// for one TTL window.
    pub fn get(&self) -> Option<IdentityPayload> {
        let now = self.clock.now_millis();
        let mut state = self.state.lock().expect("poisoned");

        if let Some(cached) = state.as_ref() {
            if now - cached.at < self.ttl_millis {
                return cached.payload.clone();
            }
        }

        let payload = match (self.reader)() {
            Ok(content) => IdentityPayload::parse(content.lines().next().unwrap_or("")),
            Err(e) => {
                log::debug!("identity channel read failed: {}", e);
                None
            }
        };

        *state = Some(CachedRead {
            at: now,
            payload: payload.clone(),
        });
        payload
    }

    /// Drops the cached value so the next [get] re-reads the file
    pub fn invalidate(&self) {
        *self.state.lock().expect("poisoned") = None;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Arc;

    struct FakeClock(Arc<AtomicI64>);

    impl Clock for FakeClock {
        fn now_millis(&self) -> i64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    fn counting_reader(line: &'static str) -> (IdentityReader, Arc<AtomicI64>) {
        let count = Arc::new(AtomicI64::new(0));
        let inner = Arc::clone(&count);
        let reader: IdentityReader = Box::new(move || {
            inner.fetch_add(1, Ordering::Relaxed);
            Ok(line.to_string())
        });
        (reader, count)
    }

    #[test]
    fn test_caches_within_ttl() {
        let now = Arc::new(AtomicI64::new(1_000));
        let (reader, reads) = counting_reader("abc|0011223344556677|Alice|5\n");
        let cache = IdentityCache::new(reader, Box::new(FakeClock(Arc::clone(&now))), 5_000);

        assert_eq!(cache.get().unwrap().app_set_id, "abc");
        now.store(4_000, Ordering::Relaxed);
        assert_eq!(cache.get().unwrap().label, "Alice");
        assert_eq!(reads.load(Ordering::Relaxed), 1);

        // TTL elapsed
        now.store(6_001, Ordering::Relaxed);
        assert!(cache.get().is_some());
        assert_eq!(reads.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_invalidate_forces_reread() {
        let now = Arc::new(AtomicI64::new(0));
        let (reader, reads) = counting_reader("abc|x|y|1");
        let cache = IdentityCache::new(reader, Box::new(FakeClock(now)), 5_000);

        cache.get();
        cache.invalidate();
        cache.get();
        assert_eq!(reads.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_missing_file_is_none_and_cached() {
        let now = Arc::new(AtomicI64::new(0));
        let count = Arc::new(AtomicI64::new(0));
        let inner = Arc::clone(&count);
        let reader: IdentityReader = Box::new(move || {
            inner.fetch_add(1, Ordering::Relaxed);
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
        });
        let cache = IdentityCache::new(reader, Box::new(FakeClock(now)), 5_000);

        assert!(cache.get().is_none());
        assert!(cache.get().is_none());
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_malformed_line_is_none() {
        let now = Arc::new(AtomicI64::new(0));
        let (reader, _) = counting_reader("not a payload");
        let cache = IdentityCache::new(reader, Box::new(FakeClock(now)), 5_000);
        assert!(cache.get().is_none());
    }
}
