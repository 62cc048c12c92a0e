// src/ndef.rs
use log::{debug, trace};

use crate::error::DecodeError;
use crate::tlv;
use crate::types::{
    LANGUAGE_CAPACITY, Language, NdefRecord, RecordFlags, STATUS_LANG_LEN_MASK, STATUS_UTF16,
    TEXT_CAPACITY, TYPE_CAPACITY, TextBody, TextEncoding, TextRecord, TypeName,
};

struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .offset
            .checked_add(count)
            .filter(|&end| end <= self.data.len())
            .ok_or(DecodeError::TruncatedBuffer {
                offset: self.offset,
                needed: count,
                len: self.data.len(),
            })?;

        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn byte(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn is_empty(&self) -> bool {
        self.offset >= self.data.len()
    }
}

/// Iterates the records of one NDEF message.
///
/// Stops after the record carrying ME, at the end of the message, or after
/// yielding the first `TruncatedBuffer` error.
pub struct RecordDecoder<'a> {
    cursor: Cursor<'a>,
    done: bool,
}

pub fn decode_message(message: &[u8]) -> RecordDecoder<'_> {
    RecordDecoder {
        cursor: Cursor {
            data: message,
            offset: 0,
        },
        done: false,
    }
}

impl<'a> RecordDecoder<'a> {
    fn decode_record(&mut self) -> Result<NdefRecord<'a>, DecodeError> {
        let flags = RecordFlags::from(self.cursor.byte()?);
        let type_length = self.cursor.byte()?;

        // 1 byte for Short Record, 4 bytes big-endian otherwise
        let payload_length = if flags.short_record {
            u32::from(self.cursor.byte()?)
        } else {
            let b = self.cursor.take(4)?;
            u32::from_be_bytes([b[0], b[1], b[2], b[3]])
        };

        let id_length = if flags.id_length_present {
            self.cursor.byte()?
        } else {
            0
        };
        trace!(
            "record header {:?}, type_length {}, payload_length {}, id_length {}",
            flags, type_length, payload_length, id_length
        );

        let type_field = self.cursor.take(usize::from(type_length))?;
        let record_type: TypeName = type_field.iter().copied().take(TYPE_CAPACITY).collect();

        // ID is not interpreted
        self.cursor.take(usize::from(id_length))?;

        let payload_len = usize::try_from(payload_length).unwrap_or(usize::MAX);
        let payload = self.cursor.take(payload_len)?;

        Ok(NdefRecord {
            flags,
            type_length,
            id_length,
            payload_length,
            record_type,
            payload,
        })
    }
}

impl<'a> Iterator for RecordDecoder<'a> {
    type Item = Result<NdefRecord<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.cursor.is_empty() {
            return None;
        }

        let result = self.decode_record();
        match &result {
            Ok(record) => self.done = record.flags.message_end,
            Err(_) => self.done = true,
        }
        Some(result)
    }
}

/// Decodes a Well-Known Text record payload.
///
/// Status byte: bit 7 selects UTF-16, bits 0-5 give the language code length.
/// UTF-8 text is copied as-is without validation. UTF-16 text is read as
/// little-endian code units and only units below 128 are kept, as ASCII.
pub fn decode_text(payload: &[u8]) -> Result<TextRecord, DecodeError> {
    let short = |lang_len: usize| DecodeError::ShortTextPayload {
        len: payload.len(),
        lang_len,
    };

    let (&status, rest) = payload.split_first().ok_or(short(0))?;
    let lang_len = usize::from(status & STATUS_LANG_LEN_MASK);
    if rest.len() < lang_len {
        return Err(short(lang_len));
    }

    let (language, body) = rest.split_at(lang_len);
    let language: Language = language.iter().copied().take(LANGUAGE_CAPACITY).collect();

    let (encoding, text): (TextEncoding, TextBody) = if status & STATUS_UTF16 != 0 {
        let text = body
            .chunks_exact(2)
            .map(|unit| u16::from_le_bytes([unit[0], unit[1]]))
            .filter(|&unit| unit < 0x80)
            .map(|unit| unit as u8)
            .take(TEXT_CAPACITY)
            .collect();
        (TextEncoding::Utf16, text)
    } else {
        let text = body.iter().copied().take(TEXT_CAPACITY).collect();
        (TextEncoding::Utf8, text)
    };

    trace!(
        "text record: language {:?}, encoding {:?}, {} body byte(s)",
        String::from_utf8_lossy(&language),
        encoding,
        body.len()
    );

    Ok(TextRecord {
        encoding,
        language,
        text,
    })
}

/// Decodes the first Text record of a message. Records before it are skipped.
pub fn find_text_record(message: &[u8]) -> Result<TextRecord, DecodeError> {
    for record in decode_message(message) {
        let record = record?;
        if record.is_text() {
            return decode_text(record.payload);
        }

        debug!(
            "Skipping record, TNF: {:?}, Type: {}",
            record.flags.tnf,
            String::from_utf8_lossy(&record.record_type)
        );
    }

    Err(DecodeError::UnsupportedRecord)
}

/// Full pass over a raw memory dump: TLV scan, message decode, text decode.
///
/// Returns the first Text record found in any NDEF message TLV. When no
/// message yields one, the error from the last attempt is returned.
pub fn read_tag_text(buffer: &[u8]) -> Result<TextRecord, DecodeError> {
    let mut outcome = DecodeError::NoNdefMessage;

    for message in tlv::ndef_messages(buffer) {
        match find_text_record(message) {
            Ok(text) => return Ok(text),
            Err(e) => {
                debug!("NDEF message without usable text: {}", e);
                outcome = e;
            }
        }
    }

    Err(outcome)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::{FLAG_IL, FLAG_MB, FLAG_ME, FLAG_SR};

    pub fn text_payload(lang: &[u8], text: &[u8]) -> Vec<u8> {
        // Status byte: UTF-8 (bit 7=0) | Lang length (bits 0-5)
        let mut payload = vec![lang.len() as u8];
        payload.extend_from_slice(lang);
        payload.extend_from_slice(text);
        payload
    }

    pub fn utf16_payload(lang: &[u8], units: &[u16]) -> Vec<u8> {
        let mut payload = vec![0x80 | lang.len() as u8];
        payload.extend_from_slice(lang);
        for unit in units {
            payload.extend_from_slice(&unit.to_le_bytes());
        }
        payload
    }

    pub fn encode_record(
        tnf: u8,
        record_type: &[u8],
        id: Option<&[u8]>,
        payload: &[u8],
        mb: bool,
        me: bool,
    ) -> Vec<u8> {
        let short = payload.len() <= u8::MAX as usize;

        let mut header = tnf;
        if mb {
            header |= FLAG_MB;
        }
        if me {
            header |= FLAG_ME;
        }
        if short {
            header |= FLAG_SR;
        }
        if id.is_some() {
            header |= FLAG_IL;
        }

        let mut record = vec![header, record_type.len() as u8];
        if short {
            record.push(payload.len() as u8);
        } else {
            record.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        }
        if let Some(id) = id {
            record.push(id.len() as u8);
        }
        record.extend_from_slice(record_type);
        if let Some(id) = id {
            record.extend_from_slice(id);
        }
        record.extend_from_slice(payload);
        record
    }

    pub fn text_record(text: &str) -> Vec<u8> {
        encode_record(0x01, b"T", None, &text_payload(b"en", text.as_bytes()), true, true)
    }

    pub fn wrap_in_tlv(ndef_bytes: &[u8]) -> Vec<u8> {
        let mut tlv = vec![0x03];
        if ndef_bytes.len() < 0xFF {
            tlv.push(ndef_bytes.len() as u8);
        } else {
            tlv.push(0xFF);
            tlv.extend_from_slice(&(ndef_bytes.len() as u16).to_be_bytes());
        }
        tlv.extend_from_slice(ndef_bytes);
        tlv.push(0xFE);
        tlv
    }

    /// Pads a TLV area out to the 48-byte capture window with zeros.
    pub fn capture_window(tlv: &[u8]) -> Vec<u8> {
        let mut window = tlv.to_vec();
        window.resize(window.len().max(crate::types::CAPTURE_WINDOW), 0x00);
        window
    }
}
