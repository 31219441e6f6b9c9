use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::transport::serial::SerialParams;
use crate::{Duration, Error};

const DEFAULT_CONNECTION_TIMEOUT_MS: u32 = 1000;
const DEFAULT_QUERY_TIMEOUT_MS: u32 = 2000;

/// Settings for opening endpoints and talking to them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportOptions {
    pub connection_timeout: Duration,
    pub query_timeout: Duration,
    /// Read and write terminator.
    pub term: u8,
    /// Used when listing serial ports and for VISA serial resources.
    pub serial: SerialParams,
    /// Network endpoints (`tcp::` or `vxi::`) to probe during discovery, they cannot be enumerated.
    pub tcp_endpoints: Vec<String>,
    pub scan_serial: bool,
    /// Set ASYNC_LOW_LATENCY on serial ports (linux only).
    pub low_latency: bool,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_millis(DEFAULT_CONNECTION_TIMEOUT_MS),
            query_timeout: Duration::from_millis(DEFAULT_QUERY_TIMEOUT_MS),
            term: b'\n',
            serial: SerialParams::default(),
            tcp_endpoints: Vec::new(),
            scan_serial: true,
            low_latency: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: TransportOptions,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading configuration from {}", path.display());
        let data = fs::read_to_string(path)
            .map_err(|x| Error::argument(anyhow!("Cannot read `{}`: {}", path.display(), x)))?;
        data.parse()
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s).map_err(|x| Error::argument(anyhow!("Invalid configuration: {}", x)))
    }
}
