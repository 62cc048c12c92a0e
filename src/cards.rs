// src/cards.rs
use log::{debug, warn};
use pcsc::Card;

use crate::apdu::{self, KEY_TYPE_A, KEY_TYPE_B};
use crate::error::ReaderError;
use crate::types::CAPTURE_WINDOW;

const BLOCK_SIZE: usize = 16;

// Sector 1 data blocks; block 7 is the sector trailer
pub const MIFARE_NDEF_BLOCKS: [u8; 3] = [4, 5, 6];

// Each READ BINARY of 16 bytes returns four 4-byte pages
pub const NTAG_NDEF_PAGES: [u8; 3] = [4, 8, 12];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    MifareClassic,
    Ntag,
}

impl CardKind {
    /// 4-byte UIDs are MIFARE Classic, 7-byte UIDs NTAG/Ultralight.
    pub fn from_uid_len(uid_len: usize) -> Result<Self, ReaderError> {
        match uid_len {
            4 => Ok(CardKind::MifareClassic),
            7 => Ok(CardKind::Ntag),
            _ => Err(ReaderError::UnsupportedCard { uid_len }),
        }
    }
}

/// Reads the 48-byte window holding the start of the NDEF TLV area.
pub fn read_capture_window(
    card: &Card,
    kind: CardKind,
    key: &[u8; 6],
) -> Result<[u8; CAPTURE_WINDOW], ReaderError> {
    let addresses = match kind {
        CardKind::MifareClassic => {
            authenticate_sector(card, MIFARE_NDEF_BLOCKS[0], key)?;
            MIFARE_NDEF_BLOCKS
        }
        CardKind::Ntag => NTAG_NDEF_PAGES,
    };

    let mut window = [0u8; CAPTURE_WINDOW];
    for (chunk, &address) in window.chunks_exact_mut(BLOCK_SIZE).zip(addresses.iter()) {
        let data = apdu::read_binary(card, address, BLOCK_SIZE as u8)?;
        debug!("block {}: {:02X?}", address, data);
        copy_block(chunk, &data);
    }

    Ok(window)
}

// Short answers leave the rest of the chunk zeroed; the window is fully overwritten either way.
fn copy_block(chunk: &mut [u8], data: &[u8]) {
    let n = data.len().min(chunk.len());
    chunk[..n].copy_from_slice(&data[..n]);
    chunk[n..].fill(0);
}

// Authenticate once for the sector (covers blocks 4, 5, 6)
fn authenticate_sector(card: &Card, block: u8, key: &[u8; 6]) -> Result<(), ReaderError> {
    apdu::load_key(card, key)?;

    if apdu::authenticate(card, block, KEY_TYPE_A).is_ok()
        || apdu::authenticate(card, block, KEY_TYPE_B).is_ok()
    {
        return Ok(());
    }

    warn!("Could not authenticate sector at block {}", block);
    Err(ReaderError::Auth { block })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_kind_follows_uid_length() {
        assert_eq!(CardKind::from_uid_len(4).unwrap(), CardKind::MifareClassic);
        assert_eq!(CardKind::from_uid_len(7).unwrap(), CardKind::Ntag);
        assert!(matches!(
            CardKind::from_uid_len(10),
            Err(ReaderError::UnsupportedCard { uid_len: 10 })
        ));
    }

    #[test]
    fn short_block_is_zero_filled() {
        let mut chunk = [0xAAu8; BLOCK_SIZE];
        copy_block(&mut chunk, &[1, 2, 3]);
        assert_eq!(&chunk[..3], &[1, 2, 3]);
        assert!(chunk[3..].iter().all(|&b| b == 0));
    }

    #[test]
    fn window_covers_three_blocks() {
        assert_eq!(MIFARE_NDEF_BLOCKS.len() * BLOCK_SIZE, CAPTURE_WINDOW);
        assert_eq!(NTAG_NDEF_PAGES.len() * BLOCK_SIZE, CAPTURE_WINDOW);
    }
}
