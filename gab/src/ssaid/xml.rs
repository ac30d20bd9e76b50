//! Text-format parsing and serialization for the per-app Android-ID store.
//!
//! The store is a flat `<settings version="...">` element containing one
//! `<setting>` per package. The `version` attribute is opaque to us and is
//! reproduced verbatim on rewrite.

use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Writer;

use super::{Error, Result};

/// One row of the store; at most one per package name
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierStoreEntry {
    pub id: i64,
    pub name: String,
    pub value: String,
    pub package: String,
    pub default_value: String,
    pub default_sys_set: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SsaidDocument {
    /// Schema version declared by the settings provider, kept verbatim
    pub version: String,
    pub entries: Vec<IdentifierStoreEntry>,
}

/// Version used when we have to create the store from scratch
pub const NEW_STORE_VERSION: &str = "-1";

impl SsaidDocument {
    pub fn new_empty() -> Self {
        Self {
            version: NEW_STORE_VERSION.into(),
            entries: Vec::new(),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut reader = quick_xml::Reader::from_str(text);

        let mut version: Option<String> = None;
        let mut entries = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(Event::Start(bs)) | Ok(Event::Empty(bs)) => {
                    match bs.local_name().as_ref() {
                        b"settings" => {
                            version = get_attr(&bs, b"version");
                        }
                        b"setting" => {
                            entries.push(parse_entry(&bs)?);
                        }
                        other => {
                            log::debug!(
                                "ignoring unexpected element `{}` in ssaid store",
                                String::from_utf8_lossy(other)
                            );
                        }
                    }
                }
                Err(e) => return Err(Error::ParseFailed(e.to_string())),
                _ => continue,
            }
        }

        let version = version.ok_or_else(|| {
            Error::ParseFailed("store xml has no <settings version=...> root".into())
        })?;

        Ok(Self { version, entries })
    }

    pub fn get(&self, package: &str) -> Option<&IdentifierStoreEntry> {
        self.entries.iter().find(|e| e.name == package)
    }

    /// Updates the entry for `package` in place, or inserts a fresh one
    /// with id = max existing id + 1.
    pub fn upsert(&mut self, package: &str, value: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == package) {
            entry.value = value.into();
            entry.default_value = value.into();
            return;
        }

        let next_id = self.entries.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        self.entries.push(IdentifierStoreEntry {
            id: next_id,
            name: package.into(),
            value: value.into(),
            package: package.into(),
            default_value: value.into(),
            default_sys_set: "true".into(),
        });
    }

    pub fn serialize(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), Some("yes"))))
            .map_err(|e| Error::SerializeFailed(e.to_string()))?;

        let mut root = BytesStart::new("settings");
        root.push_attribute(("version", self.version.as_str()));
        writer
            .write_event(Event::Start(root))
            .map_err(|e| Error::SerializeFailed(e.to_string()))?;

        for entry in &self.entries {
            let mut el = BytesStart::new("setting");
            el.push_attribute(("id", entry.id.to_string().as_str()));
            el.push_attribute(("name", entry.name.as_str()));
            el.push_attribute(("value", entry.value.as_str()));
            el.push_attribute(("package", entry.package.as_str()));
            el.push_attribute(("defaultValue", entry.default_value.as_str()));
            el.push_attribute(("defaultSysSet", entry.default_sys_set.as_str()));
            writer
                .write_event(Event::Empty(el))
                .map_err(|e| Error::SerializeFailed(e.to_string()))?;
        }

        writer
            .write_event(Event::End(quick_xml::events::BytesEnd::new("settings")))
            .map_err(|e| Error::SerializeFailed(e.to_string()))?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| Error::SerializeFailed(e.to_string()))
    }
}

fn get_attr(bs: &BytesStart, name: &[u8]) -> Option<String> {
    for e in bs.attributes() {
        let att = match e {
            Ok(v) => v,
            Err(_) => continue,
        };
        if att.key.local_name().as_ref() == name {
            return Some(String::from_utf8_lossy(&att.value).into_owned());
        }
    }
    None
}

fn parse_entry(bs: &BytesStart) -> Result<IdentifierStoreEntry> {
    let need = |key: &[u8]| -> Result<String> {
        get_attr(bs, key).ok_or_else(|| {
            Error::ParseFailed(format!(
                "<setting> missing attribute `{}`",
                String::from_utf8_lossy(key)
            ))
        })
    };

    let id_raw = need(b"id")?;
    let id = id_raw
        .parse::<i64>()
        .map_err(|_| Error::ParseFailed(format!("non-numeric setting id `{}`", id_raw)))?;

    Ok(IdentifierStoreEntry {
        id,
        name: need(b"name")?,
        value: need(b"value")?,
        package: need(b"package")?,
        // Older store versions drop the mirror attributes; treat them as
        // empty rather than failing the whole parse
        default_value: get_attr(bs, b"defaultValue").unwrap_or_default(),
        default_sys_set: get_attr(bs, b"defaultSysSet").unwrap_or_default(),
    })
}

#[cfg(test)]
mod test {
    use super::*;

    const STORE: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>
<settings version="6">
  <setting id="1" name="com.android.vending" value="11aa22bb33cc44dd" package="com.android.vending" defaultValue="11aa22bb33cc44dd" defaultSysSet="true"/>
  <setting id="2" name="com.fun.lastwar.gp" value="deadbeefcafef00d" package="com.fun.lastwar.gp" defaultValue="deadbeefcafef00d" defaultSysSet="true"/>
  <setting id="5" name="org.example.other" value="0102030405060708" package="org.example.other" defaultValue="0102030405060708" defaultSysSet="true"/>
</settings>"#;

    #[test]
    fn test_parse() {
        let doc = SsaidDocument::parse(STORE).unwrap();
        assert_eq!(doc.version, "6");
        assert_eq!(doc.entries.len(), 3);
        let e = doc.get("com.fun.lastwar.gp").unwrap();
        assert_eq!(e.id, 2);
        assert_eq!(e.value, "deadbeefcafef00d");
    }

    #[test]
    fn test_parse_no_root_version() {
        assert!(SsaidDocument::parse("<settings><setting/></settings>").is_err());
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let mut doc = SsaidDocument::parse(STORE).unwrap();
        doc.upsert("com.fun.lastwar.gp", "00000000aaaaaaaa");
        assert_eq!(doc.entries.len(), 3);
        let e = doc.get("com.fun.lastwar.gp").unwrap();
        assert_eq!(e.id, 2);
        assert_eq!(e.value, "00000000aaaaaaaa");
        assert_eq!(e.default_value, "00000000aaaaaaaa");
    }

    #[test]
    fn test_upsert_assigns_max_plus_one() {
        // ids {1, 2, 5} -> new entry gets 6
        let mut doc = SsaidDocument::parse(STORE).unwrap();
        doc.upsert("com.new.app", "ffffffff00000000");
        let e = doc.get("com.new.app").unwrap();
        assert_eq!(e.id, 6);
        assert_eq!(e.package, "com.new.app");
        assert_eq!(e.default_sys_set, "true");
    }

    #[test]
    fn test_upsert_into_empty_store_gets_id_one() {
        let mut doc = SsaidDocument::new_empty();
        doc.upsert("com.fun.lastwar.gp", "deadbeefcafef00d");
        assert_eq!(doc.entries.len(), 1);
        assert_eq!(doc.entries[0].id, 1);
    }

    #[test]
    fn test_serialize_round_trip_preserves_version() {
        let mut doc = SsaidDocument::parse(STORE).unwrap();
        doc.upsert("com.new.app", "ffffffff00000000");
        let text = doc.serialize().unwrap();
        let parsed = SsaidDocument::parse(&text).unwrap();
        assert_eq!(parsed.version, "6");
        assert_eq!(parsed, doc);
    }
}
