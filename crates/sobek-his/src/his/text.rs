//! ISO-8859-1 fixed-width text fields

use crate::his::error::{HisError, Result};

/// Decode ISO-8859-1 bytes; every byte maps to the code point of the same value
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode text as ISO-8859-1
pub fn encode_latin1(text: &str) -> Result<Vec<u8>> {
    text.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| HisError::UnencodableText(text.to_string()))
        })
        .collect()
}

/// Decode a fixed-width field and drop trailing whitespace padding
pub fn decode_field(bytes: &[u8]) -> String {
    let mut text = decode_latin1(bytes);
    text.truncate(text.trim_end().len());
    text
}

/// Encode text left-justified into exactly `width` bytes, truncating or
/// padding with spaces
pub fn encode_field(text: &str, width: usize) -> Result<Vec<u8>> {
    let mut bytes = encode_latin1(text)?;
    bytes.resize(width, b' ');
    Ok(bytes)
}

/// Normalize a lookup key the way fixed-width names are stored: keep the
/// first `width` characters, then drop trailing whitespace
pub fn normalize_key(key: &str, width: usize) -> &str {
    let end = key.char_indices().nth(width).map_or(key.len(), |(i, _)| i);
    key[..end].trim_end()
}
