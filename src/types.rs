// src/types.rs
use heapless::Vec as BoundedVec;

// TLV block types found in tag memory
pub const TLV_NULL: u8 = 0x00;
pub const TLV_NDEF_MESSAGE: u8 = 0x03;
pub const TLV_TERMINATOR: u8 = 0xFE;
pub const TLV_EXTENDED_LENGTH: u8 = 0xFF; // Next 2 bytes carry the real length

// Record header flags: MB | ME | CF | SR | IL | TNF(3)
pub const FLAG_MB: u8 = 0x80;
pub const FLAG_ME: u8 = 0x40;
pub const FLAG_CF: u8 = 0x20;
pub const FLAG_SR: u8 = 0x10;
pub const FLAG_IL: u8 = 0x08;
pub const TNF_MASK: u8 = 0x07;

pub const RTD_TEXT: u8 = b'T';

// Text record status byte
pub const STATUS_UTF16: u8 = 0x80;
pub const STATUS_LANG_LEN_MASK: u8 = 0x3F;

pub const TYPE_CAPACITY: usize = 15;
pub const LANGUAGE_CAPACITY: usize = 7;
pub const TEXT_CAPACITY: usize = 63;

/// Three 16-byte blocks, the window read from a tag on every presentation.
pub const CAPTURE_WINDOW: usize = 48;

pub type TypeName = BoundedVec<u8, TYPE_CAPACITY>;
pub type Language = BoundedVec<u8, LANGUAGE_CAPACITY>;
pub type TextBody = BoundedVec<u8, TEXT_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeNameFormat {
    Empty,
    WellKnown,
    MediaType,
    AbsoluteUri,
    External,
    Unknown,
    Unchanged,
    Reserved,
}

impl From<u8> for TypeNameFormat {
    fn from(bits: u8) -> Self {
        match bits & TNF_MASK {
            0x00 => TypeNameFormat::Empty,
            0x01 => TypeNameFormat::WellKnown,
            0x02 => TypeNameFormat::MediaType,
            0x03 => TypeNameFormat::AbsoluteUri,
            0x04 => TypeNameFormat::External,
            0x05 => TypeNameFormat::Unknown,
            0x06 => TypeNameFormat::Unchanged,
            _ => TypeNameFormat::Reserved,
        }
    }
}

/// One JSON document bound for a topic, handed from the NFC thread to the publisher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Publication {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Record header byte, decoded once before any other field is read.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordFlags {
    pub message_begin: bool,
    pub message_end: bool,
    pub chunk_flag: bool,
    pub short_record: bool,
    pub id_length_present: bool,
    pub tnf: TypeNameFormat,
}

impl From<u8> for RecordFlags {
    fn from(header: u8) -> Self {
        RecordFlags {
            message_begin: header & FLAG_MB != 0,
            message_end: header & FLAG_ME != 0,
            chunk_flag: header & FLAG_CF != 0,
            short_record: header & FLAG_SR != 0,
            id_length_present: header & FLAG_IL != 0,
            tnf: TypeNameFormat::from(header),
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdefRecord<'a> {
    pub flags: RecordFlags,
    pub type_length: u8,
    pub id_length: u8,
    pub payload_length: u32,
    pub record_type: TypeName, // First TYPE_CAPACITY bytes of the type field
    pub payload: &'a [u8],
}

impl NdefRecord<'_> {
    /// Well-Known type "T".
    pub fn is_text(&self) -> bool {
        self.flags.tnf == TypeNameFormat::WellKnown
            && self.type_length == 1
            && self.record_type.first() == Some(&RTD_TEXT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf16,
}

#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRecord {
    pub encoding: TextEncoding,
    pub language: Language,
    pub text: TextBody,
}

impl TextRecord {
    /// The text as a C string would see it: everything before the first NUL.
    pub fn published_text(&self) -> &[u8] {
        match self.text.iter().position(|&b| b == 0) {
            Some(end) => &self.text[..end],
            None => self.text.as_slice(),
        }
    }
}
