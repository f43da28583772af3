//! Source key decoding and derivative key naming.
//!
//! Trigger events deliver object keys percent-encoded, and some producers also
//! encode spaces as `+`. Both conventions are undone here, once, before the
//! source object is read:
//!
//! - `input/my+photo.png` → `input/my photo.png`
//! - `input/caf%C3%A9.jpg` → `input/café.jpg`
//!
//! ## Output Keys
//!
//! Every derivative lands under a namespace built from the source filename:
//!
//! ```text
//! input/abc.jpg  →  resized/abc/50.jpg
//!                   resized/abc/100.jpg
//!                   resized/abc/500.jpg
//! ```
//!
//! Both functions are pure, so a redelivered trigger rewrites the same keys.

use crate::types::{DecodedKey, DerivativeSpec};
use percent_encoding::percent_decode_str;
use thiserror::Error;

/// Top-level namespace for generated derivatives.
pub const OUTPUT_PREFIX: &str = "resized";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyDecodeError {
    #[error("malformed escape sequence at byte {position} in key {key:?}")]
    MalformedEscape { key: String, position: usize },
    #[error("key {key:?} does not decode to valid UTF-8")]
    InvalidUtf8 { key: String },
}

/// Decode a raw trigger key and split its final segment into name and extension.
///
/// Percent escapes must be well formed (`%` followed by two hex digits) and
/// decode to UTF-8. After decoding, every literal `+` becomes a space.
pub fn decode(raw_key: &str) -> Result<DecodedKey, KeyDecodeError> {
    check_escapes(raw_key)?;

    let decoded = percent_decode_str(raw_key)
        .decode_utf8()
        .map_err(|_| KeyDecodeError::InvalidUtf8 {
            key: raw_key.to_string(),
        })?
        .replace('+', " ");

    let file_name = decoded.rsplit('/').next().unwrap_or(&decoded);
    let (base_name, extension) = match file_name.rfind('.') {
        Some(dot) => (&file_name[..dot], &file_name[dot..]),
        None => (file_name, ""),
    };

    Ok(DecodedKey {
        base_name: base_name.to_string(),
        extension: extension.to_string(),
        key: decoded,
    })
}

fn check_escapes(raw_key: &str) -> Result<(), KeyDecodeError> {
    let bytes = raw_key.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let well_formed = bytes
                .get(i + 1..i + 3)
                .is_some_and(|pair| pair.iter().all(u8::is_ascii_hexdigit));
            if !well_formed {
                return Err(KeyDecodeError::MalformedEscape {
                    key: raw_key.to_string(),
                    position: i,
                });
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// `resized/<base_name>/<size><extension>`
pub fn derive_output_key(decoded: &DecodedKey, size: u32) -> String {
    format!(
        "{}/{}/{}{}",
        OUTPUT_PREFIX, decoded.base_name, size, decoded.extension
    )
}

/// Output keys for every size, in the order given.
pub fn plan_output_keys(decoded: &DecodedKey, specs: &[DerivativeSpec]) -> Vec<String> {
    specs
        .iter()
        .map(|spec| derive_output_key(decoded, spec.size))
        .collect()
}
