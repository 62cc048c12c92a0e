// src/error.rs
use std::path::PathBuf;

use thiserror::Error;

/// Local outcomes of a decode pass. None of these escape the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("field at offset {offset} needs {needed} byte(s) past the end of a {len}-byte buffer")]
    TruncatedBuffer {
        offset: usize,
        needed: usize,
        len: usize,
    },
    #[error("record is not a Well-Known Text record")]
    UnsupportedRecord,
    #[error("text payload of {len} byte(s) cannot hold a {lang_len}-byte language code")]
    ShortTextPayload { len: usize, lang_len: usize },
    #[error("decoded text is empty")]
    EmptyResult,
    #[error("no NDEF message TLV in buffer")]
    NoNdefMessage,
    #[error("uid must be 4 or 7 bytes, got {0}")]
    InvalidUid(usize),
}

#[derive(Debug, Error)]
pub enum ReaderError {
    #[error("pcsc: {0}")]
    Pcsc(#[from] pcsc::Error),
    #[error("card answered {sw1:02X} {sw2:02X}")]
    Status { sw1: u8, sw2: u8 },
    #[error("could not authenticate block {block}")]
    Auth { block: u8 },
    #[error("unsupported card with {uid_len}-byte uid")]
    UnsupportedCard { uid_len: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
