//! Identifier value handling shared by the extractor, the store manager and
//! the interceptor cache.

use std::fmt::{Display, Formatter};

/// Placeholder used instead of null for any optional identifier.
///
/// Downstream code compares against this instead of branching on
/// `Option`s; an identifier is either a real value or this literal.
pub const SENTINEL: &str = "none";

/// Returns true if the value is a real identifier, not the sentinel
#[inline]
pub fn is_present(value: &str) -> bool {
    !value.is_empty() && value != SENTINEL
}

/// SSAID values are exactly 16 hex characters
pub fn is_valid_android_id(value: &str) -> bool {
    value.len() == 16 && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validates and lowercases an SSAID value.
///
/// All store writes and comparisons go through this so the store only ever
/// holds lowercase values.
pub fn normalize_android_id(value: &str) -> crate::Result<String> {
    if !is_valid_android_id(value) {
        return Err(crate::Error::InvalidAndroidId(value.into()));
    }
    Ok(value.to_ascii_lowercase())
}

/// One line of the cross-process identity channel file.
///
/// The file is a pipe-delimited flat file rather than a database so the
/// reader in the target app's process never deals with cross-process
/// locking.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityPayload {
    pub app_set_id: String,
    pub ssaid: String,
    pub label: String,
    pub timestamp: i64,
}

impl IdentityPayload {
    pub fn new(app_set_id: &str, ssaid: &str, label: &str, timestamp: i64) -> Self {
        Self {
            app_set_id: app_set_id.into(),
            ssaid: ssaid.into(),
            label: label.replace('|', "_"),
            timestamp,
        }
    }

    /// Parses `appSetId|ssaid|accountLabel|timestamp`.
    ///
    /// Short or malformed lines yield `None`; the interceptor treats that
    /// the same as a missing file.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.trim_end_matches('\n').splitn(4, '|');
        let app_set_id = parts.next()?;
        let ssaid = parts.next()?;
        let label = parts.next()?;
        let timestamp = parts.next()?.parse::<i64>().ok()?;
        Some(Self {
            app_set_id: app_set_id.into(),
            ssaid: ssaid.into(),
            label: label.into(),
            timestamp,
        })
    }
}

impl Display for IdentityPayload {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.app_set_id, self.ssaid, self.label, self.timestamp
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_valid_android_id() {
        assert!(is_valid_android_id("0123456789abcdef"));
        assert!(is_valid_android_id("ABCDEF0123456789"));

        assert!(!is_valid_android_id(""));
        assert!(!is_valid_android_id("0123456789abcde"));
        assert!(!is_valid_android_id("0123456789abcdef0"));
        assert!(!is_valid_android_id("0123456789abcdeg"));
        assert!(!is_valid_android_id("0123456789 bcdef"));
    }

    #[test]
    fn test_normalize_android_id() {
        assert_eq!(
            normalize_android_id("ABCDEF0123456789").unwrap(),
            "abcdef0123456789"
        );
        assert!(normalize_android_id("nope").is_err());
    }

    #[test]
    fn test_sentinel_not_present() {
        assert!(!is_present(SENTINEL));
        assert!(!is_present(""));
        assert!(is_present("abcdef0123456789"));
    }

    #[test]
    fn test_identity_payload_round_trip() {
        let p = IdentityPayload::new("9c7e-44aa", "00c0ffee00c0ffee", "Alice", 1700000000);
        let parsed = IdentityPayload::parse(&p.to_string()).unwrap();
        assert_eq!(parsed, p);
    }

    #[test]
    fn test_identity_payload_label_pipe_escaped() {
        let p = IdentityPayload::new("a", "b", "Ali|ce", 1);
        assert_eq!(p.label, "Ali_ce");
    }

    #[test]
    fn test_identity_payload_malformed() {
        assert_eq!(IdentityPayload::parse("just|three|fields"), None);
        assert_eq!(IdentityPayload::parse(""), None);
        assert_eq!(IdentityPayload::parse("a|b|c|notanumber"), None);
    }
}
