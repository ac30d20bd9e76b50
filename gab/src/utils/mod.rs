pub mod fs;
pub use fs::*;

use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the unix epoch.
///
/// Timestamps are stored as plain epoch seconds; formatting only happens at
/// the presentation layer.
pub fn epoch_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_epoch_seconds_sane() {
        // 2020-01-01
        assert!(epoch_seconds() > 1_577_836_800);
    }
}
