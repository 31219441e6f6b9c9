//! Locate and talk to bench instruments over line-oriented SCPI channels.
//!
//! The entry point is [`Resolver`], which scans the endpoints of a [`Transport`]
//! and hands back the first open channel whose `*IDN?` model is acceptable.

pub mod address;
pub mod config;
pub mod protocol;
pub mod resolver;
pub mod transport;

pub use benchlink_protocol::{
    Duration, Error, Identity, ProtocolError, ScpiRequest, ScpiResponse, TransportError, IDN_QUERY,
};

pub use crate::address::Address;
pub use crate::config::{Config, TransportOptions};
pub use crate::resolver::{Resolved, Resolver};
pub use crate::transport::{Channel, InstrumentChannel, SystemTransport, Transport};

pub type Result<T> = std::result::Result<T, Error>;
