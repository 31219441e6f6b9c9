use serde::{Deserialize, Serialize};

pub mod error;
pub mod identity;
pub mod scpi;

pub use crate::error::{Error, ProtocolError, TransportError};
pub use crate::identity::{Identity, IDN_QUERY};
pub use crate::scpi::{ScpiRequest, ScpiResponse};

pub type Result<T> = std::result::Result<T, Error>;

/// Serializable duration, as used in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duration {
    pub micros: u32,
    pub seconds: u32,
}

impl Duration {
    pub fn from_millis(millis: u32) -> Self {
        Self {
            micros: (millis % 1000) * 1000,
            seconds: millis / 1000,
        }
    }
}

impl From<Duration> for std::time::Duration {
    fn from(x: Duration) -> Self {
        std::time::Duration::from_micros(x.micros as u64) + std::time::Duration::from_secs(x.seconds as u64)
    }
}

impl From<std::time::Duration> for Duration {
    fn from(x: std::time::Duration) -> Self {
        Self {
            micros: x.subsec_micros(),
            seconds: x.as_secs() as u32,
        }
    }
}
