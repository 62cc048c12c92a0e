// src/nfc_service.rs
use crossbeam_channel::Sender;
use log::{debug, error, info, warn};
use pcsc::{Context, PNP_NOTIFICATION, Protocols, ReaderState, Scope, ShareMode, State};
use std::ffi::{CStr, CString};
use std::time::Duration;

use crate::apdu;
use crate::cards::{self, CardKind};
use crate::config::Config;
use crate::error::{DecodeError, ReaderError};
use crate::ndef;
use crate::output::{OutputPayload, Uid};
use crate::types::Publication;

/// Where card payloads go. One call per tag presentation that produced text.
pub trait Publisher {
    /// Returns false when the payload could not be handed over.
    fn publish(&self, topic: &str, payload: &[u8]) -> bool;
}

impl Publisher for Sender<Publication> {
    fn publish(&self, topic: &str, payload: &[u8]) -> bool {
        self.send(Publication {
            topic: topic.to_string(),
            payload: payload.to_vec(),
        })
        .is_ok()
    }
}

fn decode_payload(uid: &[u8], buffer: &[u8]) -> Result<OutputPayload, DecodeError> {
    let uid = Uid::new(uid)?;
    let record = ndef::read_tag_text(buffer)?;
    OutputPayload::new(&uid, record.published_text())
}

/// Decodes one capture window and publishes its text.
///
/// Decode failures are logged and dropped here so the polling loop always
/// moves on to the next tag. Returns whether a publish call was made.
pub fn process_tag<P: Publisher + ?Sized>(
    uid: &[u8],
    buffer: &[u8],
    topic: &str,
    publisher: &P,
) -> bool {
    match decode_payload(uid, buffer) {
        Ok(payload) => {
            let json = payload.to_json();
            info!("Publishing {} on {}", String::from_utf8_lossy(&json), topic);
            if !publisher.publish(topic, &json) {
                warn!("Json pub failed.");
            }
            true
        }
        Err(DecodeError::EmptyResult) => {
            debug!("Tag {:02X?} carries no text", uid);
            false
        }
        Err(e) => {
            debug!("No text from tag {:02X?}: {}", uid, e);
            false
        }
    }
}

pub fn run<P: Publisher>(config: &Config, publisher: P) {
    info!("Starting NFC Service (Event Driven)...");

    let ctx = match Context::establish(Scope::User) {
        Ok(ctx) => ctx,
        Err(err) => {
            error!("Failed to establish context: {}", err);
            return;
        }
    };

    let mut readers_buf = [0; 2048];
    let mut reader_names: Vec<CString> = Vec::new();
    let mut reader_states = vec![ReaderState::new(PNP_NOTIFICATION(), State::UNAWARE)];

    // Pick up readers that were plugged in before we started
    let mut readers_changed = true;

    loop {
        if readers_changed {
            refresh_readers(&ctx, &mut readers_buf, &mut reader_names, &mut reader_states);
            readers_changed = false;
        }

        // 1. Wait for State Change
        if let Err(err) = ctx.get_status_change(config.poll_timeout(), &mut reader_states) {
            if err != pcsc::Error::Timeout {
                error!("PCSC Error: {}", err);
                std::thread::sleep(Duration::from_secs(1));
            }
            continue;
        }

        // 2. PnP (Index 0)
        if reader_states[0].event_state().intersects(State::CHANGED) {
            info!("Hardware change detected");
            readers_changed = true;
            reader_states[0].sync_current_state();
        }

        // 3. Readers (Indices 1..)
        for (rs, name) in reader_states[1..].iter_mut().zip(reader_names.iter()) {
            if !rs.event_state().intersects(State::CHANGED) {
                continue;
            }

            let current = rs.event_state();
            if current.intersects(State::PRESENT) && !rs.current_state().intersects(State::PRESENT)
            {
                info!("Card Inserted on {:?}", name);
                if let Err(e) = handle_card_insertion(&ctx, name, config, &publisher) {
                    warn!("Card read failed: {}", e);
                }
            }

            if current.intersects(State::EMPTY) && rs.current_state().intersects(State::PRESENT) {
                info!("Card Removed from {:?}", name);
            }

            rs.sync_current_state();
        }
    }
}

fn refresh_readers(
    ctx: &Context,
    readers_buf: &mut [u8],
    reader_names: &mut Vec<CString>,
    reader_states: &mut Vec<ReaderState>,
) {
    // Keep the PnP state (index 0) and drop everything else
    reader_states.truncate(1);

    match ctx.list_readers(readers_buf) {
        Ok(iter) => {
            *reader_names = iter.map(CString::from).collect();
            for name in reader_names.iter() {
                reader_states.push(ReaderState::new(name.clone(), State::UNAWARE));
            }
            info!("{} reader(s) connected", reader_names.len());
        }
        Err(err) => {
            warn!("No readers: {}", err);
            reader_names.clear();
        }
    }
}

fn handle_card_insertion<P: Publisher>(
    ctx: &Context,
    reader_name: &CStr,
    config: &Config,
    publisher: &P,
) -> Result<bool, ReaderError> {
    let card = ctx.connect(reader_name, ShareMode::Shared, Protocols::ANY)?;

    let uid = apdu::get_uid(&card)?;
    info!("Found an ISO14443A card, UID {}", hex::encode_upper(&uid));

    let kind = CardKind::from_uid_len(uid.len())?;
    let window = cards::read_capture_window(&card, kind, &config.mifare_key)?;

    Ok(process_tag(&uid, &window, &config.topic, publisher))
}
