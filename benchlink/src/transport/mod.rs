use async_trait::async_trait;

use crate::address::Address;
use crate::config::TransportOptions;
use crate::{Error, Identity, IDN_QUERY};

pub mod serial;
pub mod tcp;
pub mod vxi;

#[cfg(test)]
pub(crate) mod fake;

pub use serial::SerialChannel;
pub use tcp::TcpChannel;
pub use vxi::VxiChannel;

/// An open, line-terminated, bidirectional text channel bound to one endpoint.
#[async_trait]
pub trait Channel: Send {
    fn endpoint(&self) -> &str;

    async fn write_line(&mut self, line: &str) -> crate::Result<()>;

    /// Write `line` and block until a full reply line arrives.
    async fn query_line(&mut self, line: &str) -> crate::Result<String>;

    async fn close(self) -> crate::Result<()>;

    /// Called once the channel has been accepted, before it is handed out.
    async fn claim(&mut self) -> crate::Result<()> {
        Ok(())
    }

    async fn identify(&mut self) -> crate::Result<Identity> {
        let reply = self.query_line(IDN_QUERY).await?;
        Identity::parse(&reply)
    }

    async fn query_f64(&mut self, line: &str) -> crate::Result<f64> {
        let reply = self.query_line(line).await?;
        parse_f64(&reply)
    }

    async fn query_f64_list(&mut self, line: &str) -> crate::Result<Vec<f64>> {
        let reply = self.query_line(line).await?;
        reply.split(',').map(parse_f64).collect()
    }
}

fn parse_f64(x: &str) -> crate::Result<f64> {
    x.trim().parse().map_err(|_| Error::unexpected_response(x))
}

/// Enumerates and opens endpoints.
#[async_trait]
pub trait Transport: Send + Sync {
    type Channel: Channel;

    /// Currently visible endpoints, in a stable order.
    async fn list_endpoints(&self) -> crate::Result<Vec<String>>;

    async fn open(&self, endpoint: &str) -> crate::Result<Self::Channel>;
}

pub enum InstrumentChannel {
    Tcp(TcpChannel),
    Serial(SerialChannel),
    Vxi(VxiChannel),
}

#[async_trait]
impl Channel for InstrumentChannel {
    fn endpoint(&self) -> &str {
        match self {
            InstrumentChannel::Tcp(x) => x.endpoint(),
            InstrumentChannel::Serial(x) => x.endpoint(),
            InstrumentChannel::Vxi(x) => x.endpoint(),
        }
    }

    async fn write_line(&mut self, line: &str) -> crate::Result<()> {
        match self {
            InstrumentChannel::Tcp(x) => x.write_line(line).await,
            InstrumentChannel::Serial(x) => x.write_line(line).await,
            InstrumentChannel::Vxi(x) => x.write_line(line).await,
        }
    }

    async fn query_line(&mut self, line: &str) -> crate::Result<String> {
        match self {
            InstrumentChannel::Tcp(x) => x.query_line(line).await,
            InstrumentChannel::Serial(x) => x.query_line(line).await,
            InstrumentChannel::Vxi(x) => x.query_line(line).await,
        }
    }

    async fn claim(&mut self) -> crate::Result<()> {
        match self {
            InstrumentChannel::Tcp(x) => x.claim().await,
            InstrumentChannel::Serial(x) => x.claim().await,
            InstrumentChannel::Vxi(x) => x.claim().await,
        }
    }

    async fn close(self) -> crate::Result<()> {
        match self {
            InstrumentChannel::Tcp(x) => x.close().await,
            InstrumentChannel::Serial(x) => x.close().await,
            InstrumentChannel::Vxi(x) => x.close().await,
        }
    }
}

/// The transport backed by the operating system: raw SCPI sockets and serial ports.
#[derive(Clone, Default)]
pub struct SystemTransport {
    options: TransportOptions,
}

impl SystemTransport {
    pub fn new(options: TransportOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }
}

#[async_trait]
impl Transport for SystemTransport {
    type Channel = InstrumentChannel;

    async fn list_endpoints(&self) -> crate::Result<Vec<String>> {
        let mut ret = self.options.tcp_endpoints.clone();
        if self.options.scan_serial {
            let ports = serial::list_devices().await?;
            ret.extend(ports.into_iter().map(|path| {
                Address::Serial {
                    path,
                    params: self.options.serial.clone(),
                }
                .to_string()
            }));
        }
        Ok(ret)
    }

    async fn open(&self, endpoint: &str) -> crate::Result<Self::Channel> {
        let addr = Address::parse_with_defaults(endpoint, &self.options.serial)?;
        match addr {
            Address::Tcp { addr } => {
                let channel = TcpChannel::connect(endpoint, addr, &self.options).await?;
                Ok(InstrumentChannel::Tcp(channel))
            }
            Address::Serial { path, params } => {
                let channel = SerialChannel::open(endpoint, &path, &params, &self.options)?;
                Ok(InstrumentChannel::Serial(channel))
            }
            Address::Vxi { addr } => {
                let channel = VxiChannel::connect(endpoint, addr, &self.options).await?;
                Ok(InstrumentChannel::Vxi(channel))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::fake::FakeInstrument;

    fn options(tcp_endpoints: Vec<String>) -> TransportOptions {
        TransportOptions {
            tcp_endpoints,
            scan_serial: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn list_configured_endpoints_in_order() {
        let transport = SystemTransport::new(options(vec![
            "tcp::10.0.0.2:5025".to_string(),
            "tcp::10.0.0.1:5025".to_string(),
        ]));
        let endpoints = transport.list_endpoints().await.unwrap();
        assert_eq!(endpoints, vec!["tcp::10.0.0.2:5025", "tcp::10.0.0.1:5025"]);
    }

    #[tokio::test]
    async fn open_rejects_invalid_address() {
        let transport = SystemTransport::new(options(vec![]));
        assert!(matches!(transport.open("USB0::1").await, Err(Error::Argument(_))));
    }

    #[tokio::test]
    async fn open_tcp_and_query_numbers() {
        let fake = FakeInstrument::spawn(|cmd| match cmd {
            "MEASURE:VOLT? CH1" => Some("12.003".to_string()),
            "MEASURE:ALL? CH1" => Some("12.003,0.512,6.145".to_string()),
            "MEASURE:CURRENT? CH1" => Some("n/a".to_string()),
            _ => None,
        })
        .await;
        let transport = SystemTransport::new(options(vec![]));
        let mut channel = transport.open(&fake.endpoint()).await.unwrap();
        assert_eq!(channel.endpoint(), fake.endpoint());
        assert_eq!(channel.query_f64("MEASURE:VOLT? CH1").await.unwrap(), 12.003);
        assert_eq!(
            channel.query_f64_list("MEASURE:ALL? CH1").await.unwrap(),
            vec![12.003, 0.512, 6.145]
        );
        assert!(matches!(
            channel.query_f64("MEASURE:CURRENT? CH1").await,
            Err(Error::Protocol(_))
        ));
        channel.close().await.unwrap();
    }
}
