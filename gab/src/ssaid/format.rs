//! Store-file encoding detection and binary<->text conversion.
//!
//! Newer OS builds keep `settings_ssaid.xml` in a binary encoding. We never
//! parse that encoding ourselves; the device ships converter utilities and
//! we round-trip through them. The detected encoding is carried as a value
//! through the whole read-modify-write cycle so the write stage reproduces
//! exactly what it found.

use std::process;

use crate::device::{ABX_TO_XML_BIN, DEVICE_TMP_DIR, XML_TO_ABX_BIN};
use crate::su::Su;

use super::{Error, Result};

/// Magic marker of the binary-encoded store
pub const BINARY_MAGIC: &[u8] = b"ABX\0";

/// How much of the file the non-printable heuristic looks at
const SNIFF_LEN: usize = 512;

/// Non-printable ratio above which marker-less content is called binary
const BINARY_RATIO: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoding {
    Text,
    Binary,
}

/// Classifies raw store bytes.
///
/// Magic wins; otherwise content with XML markers is text, and marker-less
/// content with a high proportion of non-printable bytes is binary.
pub fn detect_encoding(raw: &[u8]) -> Encoding {
    if raw.starts_with(BINARY_MAGIC) {
        return Encoding::Binary;
    }

    let head = &raw[..usize::min(raw.len(), SNIFF_LEN)];
    if head.contains(&b'<') {
        return Encoding::Text;
    }

    if head.is_empty() {
        return Encoding::Text;
    }

    let unprintable = head
        .iter()
        .filter(|&&b| !(0x20..0x7F).contains(&b) && b != b'\n' && b != b'\r' && b != b'\t')
        .count();
    if unprintable as f32 / head.len() as f32 > BINARY_RATIO {
        Encoding::Binary
    } else {
        Encoding::Text
    }
}

/// True when the device ships both conversion utilities
pub fn converter_available(su: &dyn Su) -> bool {
    su.is_executable(ABX_TO_XML_BIN) && su.is_executable(XML_TO_ABX_BIN)
}

fn scratch_pair(suffix_in: &str, suffix_out: &str) -> (String, String) {
    let pid = process::id();
    (
        format!("{}/gab_conv_{}.{}", DEVICE_TMP_DIR, pid, suffix_in),
        format!("{}/gab_conv_{}.{}", DEVICE_TMP_DIR, pid, suffix_out),
    )
}

fn cleanup(su: &dyn Su, paths: &[&str]) {
    for p in paths {
        if let Err(e) = su.remove_recursive(p) {
            log::debug!("failed to remove conversion scratch {}: {}", p, e);
        }
    }
}

/// Converts binary store content to its text representation via the
/// device's `abx2xml`.
pub fn binary_to_text(su: &dyn Su, raw: &[u8]) -> Result<String> {
    if !converter_available(su) {
        return Err(Error::ConverterUnavailable);
    }

    let (input, output) = scratch_pair("abx", "xml");
    su.write_file_bytes(&input, raw)?;

    let run = su
        .execute_checked(&format!("{} {} {}", ABX_TO_XML_BIN, input, output))
        .map_err(|e| Error::ConvertFailed(e.to_string()));

    let text = run.and_then(|_| {
        su.read_file_bytes(&output)
            .map_err(|e| Error::ConvertFailed(e.to_string()))
    });

    cleanup(su, &[&input, &output]);

    let bytes = text?;
    String::from_utf8(bytes).map_err(|e| Error::ConvertFailed(e.to_string()))
}

/// Converts text content back to the binary encoding via `xml2abx`
pub fn text_to_binary(su: &dyn Su, text: &str) -> Result<Vec<u8>> {
    if !converter_available(su) {
        return Err(Error::ConverterUnavailable);
    }

    let (input, output) = scratch_pair("xml", "abx");
    su.write_file_bytes(&input, text.as_bytes())?;

    let run = su
        .execute_checked(&format!("{} {} {}", XML_TO_ABX_BIN, input, output))
        .map_err(|e| Error::ConvertFailed(e.to_string()));

    let raw = run.and_then(|_| {
        su.read_file_bytes(&output)
            .map_err(|e| Error::ConvertFailed(e.to_string()))
    });

    cleanup(su, &[&input, &output]);

    raw
}
