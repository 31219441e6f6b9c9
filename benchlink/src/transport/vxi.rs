//! VXI-11 core channel, the transport behind LXI `TCPIP0::<ip>::inst0::INSTR` resources.
use std::io;
use std::net::IpAddr;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use async_vxi11::CoreClient;
use tokio::time::timeout;

use crate::config::TransportOptions;
use crate::protocol::lineio;
use crate::transport::Channel;
use crate::Error;

pub struct VxiChannel {
    endpoint: String,
    client: CoreClient,
    term: char,
    query_timeout: Duration,
}

impl VxiChannel {
    pub async fn connect(endpoint: &str, addr: IpAddr, options: &TransportOptions) -> crate::Result<Self> {
        lineio::check_term(options.term)?;
        log::debug!("Connecting to VXI-11 device at {}", addr);
        let client = match timeout(options.connection_timeout.into(), CoreClient::connect(addr)).await {
            Ok(x) => x.map_err(map_error)?,
            Err(_) => {
                return Err(Error::transport(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "Connection timed out",
                )))
            }
        };
        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
            term: options.term as char,
            query_timeout: options.query_timeout.into(),
        })
    }

    async fn write_terminated(&mut self, line: &str) -> crate::Result<()> {
        let mut msg = line.to_string();
        if !msg.ends_with(self.term) {
            msg.push(self.term);
        }
        log::debug!("write: {:?}", line);
        self.client.device_write(msg.into_bytes()).await.map_err(map_error)?;
        Ok(())
    }
}

#[async_trait]
impl Channel for VxiChannel {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn write_line(&mut self, line: &str) -> crate::Result<()> {
        match timeout(self.query_timeout, self.write_terminated(line)).await {
            Ok(x) => x,
            Err(_) => Err(Error::protocol_timeout()),
        }
    }

    async fn query_line(&mut self, line: &str) -> crate::Result<String> {
        let query_timeout = self.query_timeout;
        let fut = async {
            self.write_terminated(line).await?;
            self.client.device_read().await.map_err(map_error)
        };
        let data = match timeout(query_timeout, fut).await {
            Ok(x) => x?,
            Err(_) => return Err(Error::protocol_timeout()),
        };
        let ret = String::from_utf8(data).map_err(|_| Error::protocol(anyhow!("Cannot decode as UTF-8")))?;
        let ret = ret.trim_end_matches(|c: char| c == self.term || c == '\r').to_string();
        log::debug!("read: {:?}", ret);
        Ok(ret)
    }

    async fn close(self) -> crate::Result<()> {
        log::debug!("Closing {}", self.endpoint);
        drop(self.client);
        Ok(())
    }
}

fn map_error(err: async_vxi11::Error) -> crate::Error {
    match err {
        async_vxi11::Error::Io(io) => crate::Error::transport(io),
        err => crate::Error::transport(anyhow!(err)),
    }
}
