// src/apdu.rs
// PC/SC pseudo-APDUs understood by ACR122U-class readers (class byte 0xFF).
use log::trace;
use pcsc::Card;

use crate::error::ReaderError;

pub const KEY_TYPE_A: u8 = 0x60;
pub const KEY_TYPE_B: u8 = 0x61;

// Sends one command and strips the trailing status word; anything but 90 00 is an error.
fn transmit(card: &Card, apdu: &[u8]) -> Result<Vec<u8>, ReaderError> {
    let mut recv_buffer = [0u8; 258];
    let resp = card.transmit(apdu, &mut recv_buffer)?;
    trace!("APDU {:02X?} -> {:02X?}", apdu, resp);
    check_status(resp).map(<[u8]>::to_vec)
}

pub(crate) fn check_status(resp: &[u8]) -> Result<&[u8], ReaderError> {
    match resp {
        [data @ .., 0x90, 0x00] => Ok(data),
        [.., sw1, sw2] => Err(ReaderError::Status {
            sw1: *sw1,
            sw2: *sw2,
        }),
        _ => Err(ReaderError::Status { sw1: 0, sw2: 0 }),
    }
}

// GET DATA: FF CA 00 00 00
pub fn get_uid(card: &Card) -> Result<Vec<u8>, ReaderError> {
    transmit(card, &[0xFF, 0xCA, 0x00, 0x00, 0x00])
}

// Load Authentication Keys into Reader Memory (Location 0x00)
// ACR122U standard: FF 82 00 key_num 06 [KEY]
pub fn load_key(card: &Card, key: &[u8; 6]) -> Result<(), ReaderError> {
    let mut apdu = vec![0xFF, 0x82, 0x00, 0x00, 0x06];
    apdu.extend_from_slice(key);
    transmit(card, &apdu).map(|_| ())
}

// Authenticate Block
// CMD: FF 86 00 00 05 01 00 Block KeyType KeyNumber
pub fn authenticate(card: &Card, block: u8, key_type: u8) -> Result<(), ReaderError> {
    let apdu = [
        0xFF, 0x86, 0x00, 0x00, 0x05, 0x01, 0x00, block, key_type, 0x00,
    ];
    transmit(card, &apdu).map(|_| ())
}

// Read: FF B0 00 Block Len
pub fn read_binary(card: &Card, block: u8, length: u8) -> Result<Vec<u8>, ReaderError> {
    transmit(card, &[0xFF, 0xB0, 0x00, block, length])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_success_status_word() {
        let resp = [0x04, 0xA3, 0x7F, 0x01, 0x90, 0x00];
        assert_eq!(check_status(&resp).unwrap(), &[0x04, 0xA3, 0x7F, 0x01]);
        assert!(check_status(&[0x90, 0x00]).unwrap().is_empty());
    }

    #[test]
    fn maps_failure_status_word() {
        match check_status(&[0x63, 0x00]) {
            Err(ReaderError::Status { sw1, sw2 }) => assert_eq!((sw1, sw2), (0x63, 0x00)),
            other => panic!("unexpected {:?}", other),
        }
        assert!(check_status(&[0x90]).is_err());
    }
}
