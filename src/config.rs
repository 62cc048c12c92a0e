// src/config.rs
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

pub const CONFIG_ENV: &str = "NFC_READER_CONFIG";

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Name the reader announces itself with
    pub device_name: String,

    /// Topic every card payload is published on
    pub topic: String,

    /// Address of the WebSocket publisher
    pub bind: SocketAddr,

    /// MIFARE Classic key for sector 1, as 12 hex digits
    #[serde(deserialize_with = "deserialize_key")]
    pub mifare_key: [u8; 6],

    /// How long one wait for reader events may block
    pub poll_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            device_name: "CardReader".into(),
            topic: "card_reader/card_text".into(),
            bind: SocketAddr::from(([127, 0, 0, 1], 3500)),
            mifare_key: [0xFF; 6],
            poll_timeout_ms: 500,
        }
    }
}

impl Config {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// First CLI argument, then `NFC_READER_CONFIG`, then built-in defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::args()
            .nth(1)
            .or_else(|| std::env::var(CONFIG_ENV).ok());

        match path {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

fn deserialize_key<'de, D>(deserializer: D) -> Result<[u8; 6], D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let bytes = hex::decode(s.trim()).map_err(serde::de::Error::custom)?;

    <[u8; 6]>::try_from(bytes.as_slice()).map_err(|_| {
        serde::de::Error::custom(format!("mifare_key must be 6 bytes, got {}", bytes.len()))
    })
}
