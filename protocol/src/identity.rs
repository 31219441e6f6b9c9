use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::Error;

/// The query every IEEE-488.2 instrument answers with its identification string.
pub const IDN_QUERY: &str = "*IDN?";

/// Parsed reply to `*IDN?`.
///
/// The reply consists of exactly four comma-separated fields:
/// manufacturer, model, serial number and firmware version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub manufacturer: String,
    pub model: String,
    pub serial_number: String,
    pub firmware: String,
}

impl Identity {
    /// Parse an identification reply.
    /// Replies which do not split into exactly four fields are rejected with
    /// `ProtocolError::UnexpectedResponse`.
    pub fn parse(reply: &str) -> crate::Result<Self> {
        let reply = reply.trim_end_matches(|c: char| c == '\r' || c == '\n');
        let fields: Vec<&str> = reply.split(',').collect();
        if let [manufacturer, model, serial_number, firmware] = fields[..] {
            Ok(Identity {
                manufacturer: manufacturer.to_string(),
                model: model.to_string(),
                serial_number: serial_number.to_string(),
                firmware: firmware.to_string(),
            })
        } else {
            Err(Error::unexpected_response(reply))
        }
    }

    /// Exact, case-sensitive membership test.
    pub fn matches_any<T: AsRef<str>>(&self, models: &[T]) -> bool {
        models.iter().any(|x| x.as_ref() == self.model)
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}\nSN: {}\nFirmware: {}",
            self.manufacturer, self.model, self.serial_number, self.firmware
        )
    }
}
