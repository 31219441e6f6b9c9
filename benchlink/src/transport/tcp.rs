use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::TransportOptions;
use crate::protocol::lineio;
use crate::transport::Channel;
use crate::Error;

/// Raw SCPI socket, usually on port 5025.
pub struct TcpChannel {
    endpoint: String,
    stream: TcpStream,
    term: u8,
    query_timeout: Duration,
}

impl TcpChannel {
    pub async fn connect(endpoint: &str, addr: SocketAddr, options: &TransportOptions) -> crate::Result<Self> {
        log::debug!("Connecting to {}", addr);
        let stream = connect_tcp_stream(addr, options.connection_timeout.into()).await?;
        if let Err(x) = stream.set_nodelay(true) {
            log::warn!("Cannot set TCP_NODELAY on {}: {}", addr, x);
        }
        Ok(Self {
            endpoint: endpoint.to_string(),
            stream,
            term: options.term,
            query_timeout: options.query_timeout.into(),
        })
    }
}

async fn connect_tcp_stream(addr: SocketAddr, connection_timeout: Duration) -> crate::Result<TcpStream> {
    let fut = async move { TcpStream::connect(&addr).await.map_err(Error::transport) };
    match timeout(connection_timeout, fut).await {
        Ok(Ok(x)) => Ok(x),
        Ok(Err(x)) => Err(x),
        Err(_) => Err(Error::transport(io::Error::new(
            io::ErrorKind::TimedOut,
            "Connection timed out",
        ))),
    }
}

#[async_trait]
impl Channel for TcpChannel {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn write_line(&mut self, line: &str) -> crate::Result<()> {
        lineio::write_line(&mut self.stream, line, self.term).await
    }

    async fn query_line(&mut self, line: &str) -> crate::Result<String> {
        lineio::query_line(&mut self.stream, line, self.term, self.query_timeout).await
    }

    async fn close(mut self) -> crate::Result<()> {
        log::debug!("Closing {}", self.endpoint);
        self.stream.shutdown().await.map_err(Error::transport)
    }
}
