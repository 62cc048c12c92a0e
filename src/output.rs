// src/output.rs
use heapless::Vec as BoundedVec;

use crate::error::DecodeError;

/// ISO 14443-A UID: 4 (single) or 7 (double size) bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uid(BoundedVec<u8, 7>);

impl Uid {
    pub fn new(bytes: &[u8]) -> Result<Self, DecodeError> {
        match bytes.len() {
            4 | 7 => Ok(Uid(bytes.iter().copied().collect())),
            other => Err(DecodeError::InvalidUid(other)),
        }
    }

    /// Uppercase, two characters per byte, no separators.
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.0)
    }
}

/// The document handed to the publisher for one tag presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPayload {
    pub uid_hex: String,
    pub text: Vec<u8>, // Raw tag bytes, not validated as UTF-8
}

impl OutputPayload {
    /// Fails with `EmptyResult` when there is no text to publish.
    pub fn new(uid: &Uid, text: &[u8]) -> Result<Self, DecodeError> {
        if text.is_empty() {
            return Err(DecodeError::EmptyResult);
        }

        Ok(OutputPayload {
            uid_hex: uid.to_hex(),
            text: text.to_vec(),
        })
    }

    /// `{"uid": "<HEX>", "txt": "<TEXT>"}`
    ///
    /// Values are inserted as-is. Quotes, backslashes and control characters
    /// in the text are not escaped, so such text produces invalid JSON;
    /// producers that need strict JSON must escape before writing the tag.
    /// Malformed UTF-8 in the text is passed through byte for byte.
    pub fn to_json(&self) -> Vec<u8> {
        let mut json = format!("{{\"uid\": \"{}\", \"txt\": \"", self.uid_hex).into_bytes();
        json.extend_from_slice(&self.text);
        json.extend_from_slice(b"\"}");
        json
    }
}
