use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::task;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

pub use params::SerialParams;

use crate::config::TransportOptions;
use crate::protocol::lineio;
use crate::transport::Channel;
use crate::Error;

pub mod params;

#[cfg(target_os = "linux")]
mod linux_low_latency;

pub struct SerialChannel {
    endpoint: String,
    serial: SerialStream,
    term: u8,
    query_timeout: Duration,
    #[cfg_attr(not(target_os = "linux"), allow(dead_code))]
    low_latency: bool,
}

impl SerialChannel {
    pub fn open(endpoint: &str, path: &str, params: &SerialParams, options: &TransportOptions) -> crate::Result<Self> {
        log::debug!("Opening {} with {}", path, params);
        let serial = tokio_serial::new(path, params.baud)
            .parity(params.parity.into())
            .stop_bits(params.stop_bits.into())
            .data_bits(params.data_bits.into())
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(map_tokio_serial_error)?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            serial,
            term: options.term,
            query_timeout: options.query_timeout.into(),
            low_latency: options.low_latency,
        })
    }
}

fn map_tokio_serial_error(err: tokio_serial::Error) -> crate::Error {
    crate::Error::transport(anyhow!(err))
}

#[async_trait]
impl Channel for SerialChannel {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn write_line(&mut self, line: &str) -> crate::Result<()> {
        lineio::write_line(&mut self.serial, line, self.term).await
    }

    async fn query_line(&mut self, line: &str) -> crate::Result<String> {
        lineio::query_line(&mut self.serial, line, self.term, self.query_timeout).await
    }

    /// Only accepted ports get `ASYNC_LOW_LATENCY`, ports probed during a scan are left alone.
    async fn claim(&mut self) -> crate::Result<()> {
        #[cfg(target_os = "linux")]
        {
            if self.low_latency {
                match linux_low_latency::apply_low_latency(&self.serial) {
                    Ok(true) => log::debug!("Applied ASYNC_LOW_LATENCY to {}", self.endpoint),
                    Ok(false) => {}
                    Err(x) => log::warn!("Cannot set ASYNC_LOW_LATENCY on {}: {}", self.endpoint, x),
                }
            }
        }
        Ok(())
    }

    async fn close(mut self) -> crate::Result<()> {
        log::debug!("Closing {}", self.endpoint);
        self.serial.flush().await.map_err(Error::transport)
    }
}

/// Serial ports known to the operating system, sorted by name.
pub async fn list_devices() -> crate::Result<Vec<String>> {
    let ret = task::spawn_blocking(move || match tokio_serial::available_ports() {
        Ok(x) => {
            let mut ports: Vec<String> = x.into_iter().map(|x| x.port_name).collect();
            ports.sort();
            Ok(ports)
        }
        Err(err) => Err(Error::transport(anyhow!(err.description))),
    })
    .await;
    ret.map_err(Error::internal)?
}
