use core::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// A single character of a `8N1`-style settings string.
trait SettingCode: Sized + Copy + 'static {
    const CODES: &'static [(char, Self)];

    fn from_code(c: char) -> Option<Self> {
        let c = c.to_ascii_uppercase();
        Self::CODES.iter().find(|(x, _)| *x == c).map(|(_, v)| *v)
    }
}

macro_rules! setting {
    ($name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        #[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl SettingCode for $name {
            const CODES: &'static [(char, Self)] = &[$(($code, $name::$variant)),+];
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                let code = match self {
                    $($name::$variant => $code),+
                };
                write!(f, "{}", code)
            }
        }

        impl From<$name> for tokio_serial::$name {
            fn from(x: $name) -> Self {
                match x {
                    $($name::$variant => tokio_serial::$name::$variant),+
                }
            }
        }
    };
}

setting!(DataBits { Seven = '7', Eight = '8' });
setting!(Parity { None = 'N', Odd = 'O', Even = 'E' });
setting!(StopBits { One = '1', Two = '2' });

fn invalid_address() -> crate::Error {
    crate::Error::argument(anyhow!("Invalid Address"))
}

/// Parse settings of the form `8N1`.
pub fn parse_serial_settings(settings: &str) -> crate::Result<(DataBits, Parity, StopBits)> {
    let chars: Vec<char> = settings.chars().collect();
    match chars[..] {
        [d, p, s] => Ok((
            DataBits::from_code(d).ok_or_else(invalid_address)?,
            Parity::from_code(p).ok_or_else(invalid_address)?,
            StopBits::from_code(s).ok_or_else(invalid_address)?,
        )),
        _ => Err(invalid_address()),
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize, Hash)]
pub struct SerialParams {
    pub baud: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
}

impl Default for SerialParams {
    fn default() -> Self {
        Self {
            baud: 9600,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
        }
    }
}

impl SerialParams {
    /// Parse `["/dev/ttyUSB0", "9600", "8N1"]`.
    pub fn from_address_with_path(addr_parts: &[&str]) -> crate::Result<(String, SerialParams)> {
        if addr_parts.len() != 3 || addr_parts[0].is_empty() {
            return Err(invalid_address());
        }
        let path = addr_parts[0].into();
        let params = Self::from_address(&addr_parts[1..])?;
        Ok((path, params))
    }

    /// Parse `["9600", "8N1"]`.
    pub fn from_address(addr_parts: &[&str]) -> crate::Result<SerialParams> {
        if addr_parts.len() != 2 {
            return Err(invalid_address());
        }
        let baud: u32 = addr_parts[0].parse().map_err(|_| invalid_address())?;
        let (data_bits, parity, stop_bits) = parse_serial_settings(addr_parts[1])?;

        Ok(SerialParams {
            baud,
            data_bits,
            stop_bits,
            parity,
        })
    }
}

impl FromStr for SerialParams {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let splits: Vec<&str> = s.split("::").collect();
        Self::from_address(&splits)
    }
}

impl Display for SerialParams {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let x = format!("{}::{}{}{}", self.baud, self.data_bits, self.parity, self.stop_bits);
        f.write_str(&x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings() {
        assert_eq!(
            parse_serial_settings("7e2").unwrap(),
            (DataBits::Seven, Parity::Even, StopBits::Two)
        );
        assert!(parse_serial_settings("8N").is_err());
        assert!(parse_serial_settings("9N1").is_err());
        assert!(parse_serial_settings("8X1").is_err());
    }

    #[test]
    fn display_roundtrip() {
        let params: SerialParams = "115200::8O1".parse().unwrap();
        assert_eq!(params.baud, 115200);
        assert_eq!(params.parity, Parity::Odd);
        assert_eq!(params.to_string(), "115200::8O1");
        assert_eq!(SerialParams::default().to_string(), "9600::8N1");
    }
}
