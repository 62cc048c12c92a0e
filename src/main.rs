mod apdu;
mod cards;
mod config;
mod error;
mod ndef;
mod nfc_service;
mod output;
mod tlv;
mod types;
mod ws;

use crossbeam_channel::unbounded;
use log::{error, info};
use tokio::sync::broadcast;

use crate::config::Config;
use crate::types::Publication;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };
    info!("Starting {} (topic {})", config.device_name, config.topic);

    // Channel: NFC -> bridge (Publications)
    // Crossbeam (Sync) because the NFC thread is blocking
    let (publish_tx, publish_rx) = unbounded::<Publication>();

    // Channel: bridge -> WS subscribers
    let (event_tx, _) = broadcast::channel::<Publication>(100);

    let nfc_config = config.clone();
    std::thread::spawn(move || {
        nfc_service::run(&nfc_config, publish_tx);
    });

    let bridge_tx = event_tx.clone();
    std::thread::spawn(move || {
        while let Ok(publication) = publish_rx.recv() {
            // No subscribers is not an error
            let _ = bridge_tx.send(publication);
        }
    });

    ws::start_server(config.bind, event_tx).await;
}
