//! This module implements `Address` which is used for parsing
//! endpoint strings of the form "serial::COM3::115200::8N1"
use std::fmt;
use std::fmt::{Display, Formatter};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use anyhow::anyhow;

use crate::transport::serial::SerialParams;
use crate::Error;

/// Represents a parsed endpoint identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    Serial { path: String, params: SerialParams },
    Tcp { addr: SocketAddr },
    Vxi { addr: IpAddr },
}

fn invalid_address(addr: &str) -> Error {
    Error::argument(anyhow!("Invalid address: `{}`", addr))
}

impl Address {
    /// Create a new `Address` by parsing the given endpoint string.
    /// VISA resources without explicit serial settings use `SerialParams::default()`.
    pub fn parse(addr: &str) -> crate::Result<Self> {
        Self::parse_with_defaults(addr, &SerialParams::default())
    }

    /// Like `parse`, but VISA serial resources (`ASRL...::INSTR`) get `serial_defaults`.
    pub fn parse_with_defaults(addr: &str, serial_defaults: &SerialParams) -> crate::Result<Self> {
        let splits: Vec<&str> = addr.split("::").collect();
        if splits.len() < 2 {
            return Err(invalid_address(addr));
        }
        let kind = splits[0].to_lowercase();

        if kind == "serial" {
            // serial::/dev/ttyUSB0::9600::8N1
            let (path, params) = SerialParams::from_address_with_path(&splits[1..])?;
            Ok(Address::Serial { path, params })
        } else if kind == "tcp" {
            // tcp::192.168.0.1:5025
            if splits.len() != 2 {
                return Err(invalid_address(addr));
            }
            let sock_addr: SocketAddr = splits[1].parse().map_err(|_| invalid_address(addr))?;
            Ok(Address::Tcp { addr: sock_addr })
        } else if kind == "vxi" {
            // vxi::192.168.0.1
            if splits.len() != 2 {
                return Err(invalid_address(addr));
            }
            let ip: IpAddr = splits[1].parse().map_err(|_| invalid_address(addr))?;
            Ok(Address::Vxi { addr: ip })
        } else if kind.starts_with("tcpip") {
            let board = &kind["tcpip".len()..];
            if !board.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid_address(addr));
            }
            let ip: IpAddr = splits[1].parse().map_err(|_| invalid_address(addr))?;
            let lower: Vec<String> = splits[2..].iter().map(|x| x.to_lowercase()).collect();
            let suffix: Vec<&str> = lower.iter().map(String::as_str).collect();
            match suffix[..] {
                // TCPIP0::192.168.0.1::5025::SOCKET
                [port, "socket"] => {
                    let port: u16 = port.parse().map_err(|_| invalid_address(addr))?;
                    Ok(Address::Tcp {
                        addr: SocketAddr::new(ip, port),
                    })
                }
                // TCPIP0::192.168.0.1::inst0::INSTR or TCPIP0::192.168.0.1::INSTR
                ["inst0", "instr"] | ["instr"] => Ok(Address::Vxi { addr: ip }),
                _ => Err(invalid_address(addr)),
            }
        } else if kind.starts_with("asrl") {
            // ASRL/dev/ttyUSB0::INSTR or ASRL3::INSTR
            let port = &splits[0]["asrl".len()..];
            if splits.len() != 2 || splits[1].to_lowercase() != "instr" || port.is_empty() {
                return Err(invalid_address(addr));
            }
            let path = if port.chars().all(|c| c.is_ascii_digit()) {
                format!("COM{}", port)
            } else {
                port.to_string()
            };
            Ok(Address::Serial {
                path,
                params: serial_defaults.clone(),
            })
        } else {
            Err(invalid_address(addr))
        }
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::parse(s)
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Address::Serial { path, params } => write!(f, "serial::{}::{}", path, params),
            Address::Tcp { addr } => write!(f, "tcp::{}", addr),
            Address::Vxi { addr } => write!(f, "vxi::{}", addr),
        }
    }
}
