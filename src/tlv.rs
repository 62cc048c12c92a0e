// src/tlv.rs
use log::{debug, trace};

use crate::types::{TLV_EXTENDED_LENGTH, TLV_NDEF_MESSAGE, TLV_NULL, TLV_TERMINATOR};

/// One Type-Length-Value block, borrowed from the raw tag memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    pub tlv_type: u8,
    pub value: &'a [u8],
}

/// Walks the TLV blocks of a raw memory dump from the start.
///
/// The scan stops at a terminator TLV, at the end of the buffer, or as soon as
/// a length field would need bytes the buffer does not have. Blocks already
/// yielded stay valid; nothing past `buffer.len()` is ever read.
pub struct TlvScanner<'a> {
    buffer: &'a [u8],
    offset: usize,
    done: bool,
}

pub fn scan(buffer: &[u8]) -> TlvScanner<'_> {
    TlvScanner {
        buffer,
        offset: 0,
        done: false,
    }
}

/// Values of every NDEF Message TLV in the buffer, in physical order.
pub fn ndef_messages(buffer: &[u8]) -> impl Iterator<Item = &[u8]> {
    scan(buffer)
        .filter(|tlv| tlv.tlv_type == TLV_NDEF_MESSAGE)
        .map(|tlv| tlv.value)
}

impl<'a> TlvScanner<'a> {
    // 1 byte, or 0xFF followed by a big-endian u16
    fn read_length(&mut self) -> Option<usize> {
        let &first = self.buffer.get(self.offset)?;
        self.offset += 1;

        if first != TLV_EXTENDED_LENGTH {
            return Some(first as usize);
        }

        let bytes = self.buffer.get(self.offset..self.offset + 2)?;
        self.offset += 2;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]) as usize)
    }
}

impl<'a> Iterator for TlvScanner<'a> {
    type Item = Tlv<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done && self.offset < self.buffer.len() {
            let tlv_type = self.buffer[self.offset];
            self.offset += 1;

            match tlv_type {
                TLV_NULL => continue,
                TLV_TERMINATOR => {
                    trace!("terminator TLV at offset {}", self.offset - 1);
                    self.done = true;
                    return None;
                }
                _ => {}
            }

            let Some(length) = self.read_length() else {
                debug!(
                    "TLV 0x{:02X} length runs past end of {}-byte buffer",
                    tlv_type,
                    self.buffer.len()
                );
                self.done = true;
                return None;
            };

            let start = self.offset;
            let end = start.saturating_add(length).min(self.buffer.len());
            if end - start < length {
                // Capture window cut the value short; hand over what is there.
                debug!(
                    "TLV 0x{:02X} declares {} bytes, only {} available",
                    tlv_type,
                    length,
                    end - start
                );
            }
            trace!("TLV 0x{:02X} at {}..{}", tlv_type, start, end);

            self.offset = end;
            return Some(Tlv {
                tlv_type,
                value: &self.buffer[start..end],
            });
        }

        self.done = true;
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn collect(buffer: &[u8]) -> Vec<Tlv<'_>> {
        scan(buffer).collect()
    }

    #[test]
    fn empty_buffer_has_no_blocks() {
        assert!(collect(&[]).is_empty());
    }

    #[test]
    fn null_blocks_are_skipped() {
        let buffer = [0x00, 0x00, 0x03, 0x02, 0xAA, 0xBB, 0xFE];
        let tlvs = collect(&buffer);
        assert_eq!(
            tlvs,
            vec![Tlv {
                tlv_type: 0x03,
                value: &[0xAA, 0xBB]
            }]
        );
    }

    #[test]
    fn terminator_stops_the_scan() {
        let buffer = [0x03, 0x01, 0x11, 0xFE, 0x03, 0x01, 0x22];
        let tlvs = collect(&buffer);
        assert_eq!(tlvs.len(), 1);
        assert_eq!(tlvs[0].value, &[0x11]);
    }

    #[test]
    fn other_types_are_consumed_in_order() {
        // Lock Control TLV, then the NDEF message
        let buffer = [0x01, 0x03, 0xA0, 0x10, 0x44, 0x03, 0x01, 0x55, 0xFE];
        let tlvs = collect(&buffer);
        assert_eq!(tlvs.len(), 2);
        assert_eq!(tlvs[0].tlv_type, 0x01);
        assert_eq!(tlvs[0].value, &[0xA0, 0x10, 0x44]);
        assert_eq!(tlvs[1].tlv_type, 0x03);

        let messages: Vec<&[u8]> = ndef_messages(&buffer).collect();
        assert_eq!(messages, vec![&[0x55][..]]);
    }

    #[test]
    fn extended_length_is_big_endian() {
        let mut buffer = vec![0x03, 0xFF, 0x01, 0x02];
        buffer.extend(std::iter::repeat_n(0x5A, 0x0102));
        buffer.push(0xFE);

        let tlvs = collect(&buffer);
        assert_eq!(tlvs.len(), 1);
        assert_eq!(tlvs[0].value.len(), 0x0102);
    }

    #[test]
    fn extended_length_with_exactly_two_bytes_left() {
        let tlvs = collect(&[0x03, 0xFF, 0x00, 0x00]);
        assert_eq!(
            tlvs,
            vec![Tlv {
                tlv_type: 0x03,
                value: &[]
            }]
        );
    }

    #[test]
    fn truncated_extended_length_keeps_earlier_blocks() {
        let buffer = [0x01, 0x01, 0x99, 0x03, 0xFF, 0x00];
        let tlvs = collect(&buffer);
        assert_eq!(
            tlvs,
            vec![Tlv {
                tlv_type: 0x01,
                value: &[0x99]
            }]
        );
    }

    #[test]
    fn missing_length_byte_halts() {
        assert!(collect(&[0x03]).is_empty());
        assert!(collect(&[0x00, 0x00, 0x03]).is_empty());
    }

    #[test]
    fn value_is_clamped_to_buffer() {
        let buffer = [0x03, 0x10, 0xD1, 0x01];
        let tlvs = collect(&buffer);
        assert_eq!(tlvs.len(), 1);
        assert_eq!(tlvs[0].value, &[0xD1, 0x01]);
    }

    proptest! {
        #[test]
        fn short_buffers_yield_nothing(buffer in prop::collection::vec(any::<u8>(), 0..2)) {
            prop_assert_eq!(scan(&buffer).count(), 0);
        }

        #[test]
        fn values_stay_inside_buffer(buffer in prop::collection::vec(any::<u8>(), 0..128)) {
            let total: usize = scan(&buffer).map(|tlv| tlv.value.len()).sum();
            prop_assert!(total <= buffer.len());
        }
    }
}
