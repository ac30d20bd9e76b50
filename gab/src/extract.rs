//! Pulls account identifiers out of the target app's preference file and
//! the raw Android-ID store.

use quick_xml::events::Event;
use regex::Regex;

use crate::device::{
    PREF_KEY_ACCOUNT_ID, PREF_KEY_AD_ID, PREF_KEY_APP_SET_ID, PREF_KEY_DEVICE_TOKEN,
};
use crate::identifiers::SENTINEL;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The account id key is mandatory; without it there is no record
    #[error("preference file has no `{0}` entry")]
    MissingAccountId(&'static str),

    #[error("unreadable preference xml: {0}")]
    BadXml(String),
}

/// All identifiers extracted from one preference file.
///
/// Only `account_id` is guaranteed real; the rest default to the sentinel
/// so no downstream code has to branch on `Option`s.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedIdentifiers {
    pub account_id: String,
    pub ad_id: String,
    pub device_token: String,
    pub app_set_id: String,
}

impl ExtractedIdentifiers {
    /// Names of the optional identifiers that came back as the sentinel
    pub fn missing(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.ad_id == SENTINEL {
            out.push("advertising id");
        }
        if self.device_token == SENTINEL {
            out.push("device token");
        }
        if self.app_set_id == SENTINEL {
            out.push("app set id");
        }
        out
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }
}

/// Scans a shared-preferences xml blob for `<string name="KEY">value</string>`
/// entries and returns the fixed identifier set.
pub fn extract_identifiers(prefs_xml: &str) -> Result<ExtractedIdentifiers> {
    let mut account_id = None;
    let mut ad_id = None;
    let mut device_token = None;
    let mut app_set_id = None;

    let mut reader = quick_xml::Reader::from_str(prefs_xml);
    let mut pending_key: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(Event::Start(bs)) if bs.local_name().as_ref() == b"string" => {
                for e in bs.attributes() {
                    let att = match e {
                        Ok(v) => v,
                        Err(_) => continue,
                    };
                    if att.key.local_name().as_ref() != b"name" {
                        continue;
                    }
                    pending_key = Some(String::from_utf8_lossy(&att.value).into_owned());
                }
            }
            Ok(Event::Text(bt)) => {
                let key = match pending_key.take() {
                    Some(k) => k,
                    None => continue,
                };
                let value = match bt.unescape() {
                    Ok(v) => v.into_owned(),
                    Err(_) => String::from_utf8_lossy(&bt.into_inner()).into_owned(),
                };
                match key.as_str() {
                    PREF_KEY_ACCOUNT_ID => account_id = Some(value),
                    PREF_KEY_AD_ID => ad_id = Some(value),
                    PREF_KEY_DEVICE_TOKEN => device_token = Some(value),
                    PREF_KEY_APP_SET_ID => app_set_id = Some(value),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => {
                // <string name="..."></string> with an empty body
                pending_key = None;
            }
            Err(e) => return Err(Error::BadXml(e.to_string())),
            _ => continue,
        }
    }

    let account_id = account_id
        .filter(|v| !v.is_empty())
        .ok_or(Error::MissingAccountId(PREF_KEY_ACCOUNT_ID))?;

    let or_sentinel = |v: Option<String>| v.filter(|s| !s.is_empty()).unwrap_or_else(|| SENTINEL.into());

    Ok(ExtractedIdentifiers {
        account_id,
        ad_id: or_sentinel(ad_id),
        device_token: or_sentinel(device_token),
        app_set_id: or_sentinel(app_set_id),
    })
}

/// How far around the package-name occurrence the loose strategy searches
const SSAID_SEARCH_WINDOW: usize = 160;

/// Recovers the per-app SSAID from the raw store bytes by pattern matching.
///
/// This works on both store encodings: the binary encoding keeps package
/// names and hex values as contiguous printable runs, so after replacing
/// non-printable bytes with spaces the same patterns apply. Three
/// strategies are tried in order, first match wins; the sentinel comes
/// back if none hit. Never errors.
pub fn find_ssaid(raw: &[u8], package: &str) -> String {
    let printable: String = raw
        .iter()
        .map(|&b| {
            if (0x20..0x7F).contains(&b) {
                b as char
            } else {
                ' '
            }
        })
        .collect();

    let escaped = regex::escape(package);

    // SSAID directly after "package/"
    let after = Regex::new(&format!(r"{}/\s*([0-9a-fA-F]{{16}})", escaped)).expect("static regex");
    if let Some(caps) = after.captures(&printable) {
        return caps[1].to_ascii_lowercase();
    }

    // SSAID directly before "/package"
    let before = Regex::new(&format!(r"([0-9a-fA-F]{{16}})\s*/{}", escaped)).expect("static regex");
    if let Some(caps) = before.captures(&printable) {
        return caps[1].to_ascii_lowercase();
    }

    // Any 16-hex token near the package name occurrence
    if let Some(idx) = printable.find(package) {
        let start = idx.saturating_sub(SSAID_SEARCH_WINDOW);
        let end = usize::min(printable.len(), idx + package.len() + SSAID_SEARCH_WINDOW);
        let window = &printable[start..end];
        let any = Regex::new(r"\b[0-9a-fA-F]{16}\b").expect("static regex");
        if let Some(m) = any.find(window) {
            return m.as_str().to_ascii_lowercase();
        }
    }

    SENTINEL.into()
}

#[cfg(test)]
mod test {
    use super::*;

    const FULL_PREFS: &str = r#"<?xml version='1.0' encoding='utf-8' standalone='yes' ?>
<map>
    <string name="LAST_LOGIN_UID">991827364</string>
    <string name="GOOGLE_AD_ID">6f5d0e3a-1234-4cc1-9f00-aabbccddeeff</string>
    <string name="DEVICE_TOKEN">tok-81b2</string>
    <string name="APP_SET_ID">2c7e1f00-9c1d-4b61-8a7e-001122334455</string>
    <int name="UNRELATED" value="3" />
</map>"#;

    #[test]
    fn test_extract_all_present() {
        let ids = extract_identifiers(FULL_PREFS).unwrap();
        assert_eq!(ids.account_id, "991827364");
        assert_eq!(ids.ad_id, "6f5d0e3a-1234-4cc1-9f00-aabbccddeeff");
        assert_eq!(ids.device_token, "tok-81b2");
        assert_eq!(ids.app_set_id, "2c7e1f00-9c1d-4b61-8a7e-001122334455");
        assert!(ids.is_complete());
    }

    #[test]
    fn test_extract_only_mandatory() {
        let xml = r#"<map><string name="LAST_LOGIN_UID">42</string></map>"#;
        let ids = extract_identifiers(xml).unwrap();
        assert_eq!(ids.account_id, "42");
        assert_eq!(ids.ad_id, SENTINEL);
        assert_eq!(ids.device_token, SENTINEL);
        assert_eq!(ids.app_set_id, SENTINEL);
        assert_eq!(ids.missing().len(), 3);
    }

    #[test]
    fn test_extract_missing_mandatory() {
        let xml = r#"<map><string name="GOOGLE_AD_ID">abc</string></map>"#;
        match extract_identifiers(xml) {
            Err(Error::MissingAccountId(key)) => assert_eq!(key, "LAST_LOGIN_UID"),
            other => panic!("expected missing account id, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_empty_mandatory_is_missing() {
        let xml = r#"<map><string name="LAST_LOGIN_UID"></string></map>"#;
        assert!(extract_identifiers(xml).is_err());
    }

    #[test]
    fn test_find_ssaid_after_package() {
        let raw = b"junk com.fun.lastwar.gp/1a2b3c4d5e6f7a8b more".to_vec();
        assert_eq!(
            find_ssaid(&raw, "com.fun.lastwar.gp"),
            "1a2b3c4d5e6f7a8b"
        );
    }

    #[test]
    fn test_find_ssaid_before_package() {
        let raw = b"junk AABB3C4D5E6F7A8B/com.fun.lastwar.gp more".to_vec();
        assert_eq!(
            find_ssaid(&raw, "com.fun.lastwar.gp"),
            "aabb3c4d5e6f7a8b"
        );
    }

    #[test]
    fn test_find_ssaid_window() {
        let raw = b"<entry name=\"com.fun.lastwar.gp\" other=\"x\" value=\"00c0ffee00c0ffee\" />".to_vec();
        assert_eq!(
            find_ssaid(&raw, "com.fun.lastwar.gp"),
            "00c0ffee00c0ffee"
        );
    }

    #[test]
    fn test_find_ssaid_binary_noise() {
        let mut raw = vec![0x00, 0x0B, 0x01, 0xFF];
        raw.extend_from_slice(b"com.fun.lastwar.gp");
        raw.push(0x00);
        raw.push(b'/');
        raw.extend_from_slice(b"deadbeef00112233");
        raw.push(0x02);
        // The null byte between name and slash defeats the tight
        // strategies; the windowed one still finds it
        assert_eq!(find_ssaid(&raw, "com.fun.lastwar.gp"), "deadbeef00112233");
    }

    #[test]
    fn test_find_ssaid_absent() {
        let raw = b"nothing to see".to_vec();
        assert_eq!(find_ssaid(&raw, "com.fun.lastwar.gp"), SENTINEL);
    }
}
