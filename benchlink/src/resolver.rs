//! Locate an instrument by its `*IDN?` model.
//!
//! Every failure mode for a candidate (cannot open, no or malformed reply, wrong model)
//! collapses into "no match". Rejected channels are closed before the next candidate is
//! tried, the accepted channel is claimed and handed to the caller.
use crate::transport::{Channel, Transport};
use crate::{Error, Identity};

/// An open channel together with the identity the instrument reported on it.
pub struct Resolved<C> {
    pub channel: C,
    pub identity: Identity,
}

pub struct Resolver<T: Transport> {
    transport: T,
}

impl<T: Transport> Resolver<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve an instrument reporting one of `models`.
    ///
    /// With an explicit `endpoint` only that endpoint is probed. Otherwise all endpoints
    /// of the transport are probed in enumeration order and the first match wins.
    pub async fn resolve<S: AsRef<str>>(&self, endpoint: Option<&str>, models: &[S]) -> Option<Resolved<T::Channel>> {
        match endpoint {
            Some(endpoint) => self.probe(endpoint, models, false).await,
            None => self.discover(models).await,
        }
    }

    /// Same as `resolve` but a miss is reported as `Error::NotFound`.
    pub async fn resolve_or_err<S: AsRef<str>>(
        &self,
        endpoint: Option<&str>,
        models: &[S],
    ) -> crate::Result<Resolved<T::Channel>> {
        self.resolve(endpoint, models)
            .await
            .ok_or_else(|| Error::not_found(models))
    }

    async fn discover<S: AsRef<str>>(&self, models: &[S]) -> Option<Resolved<T::Channel>> {
        let endpoints = match self.transport.list_endpoints().await {
            Ok(x) => x,
            Err(err) => {
                log::warn!("Cannot enumerate endpoints: {}", err);
                return None;
            }
        };
        log::debug!("Scanning {} endpoints", endpoints.len());
        for endpoint in &endpoints {
            if let Some(ret) = self.probe(endpoint, models, true).await {
                return Some(ret);
            }
        }
        None
    }

    /// While scanning, a blank model is never accepted, even if `""` is in `models`.
    async fn probe<S: AsRef<str>>(
        &self,
        endpoint: &str,
        models: &[S],
        scanning: bool,
    ) -> Option<Resolved<T::Channel>> {
        let mut channel = match self.transport.open(endpoint).await {
            Ok(x) => x,
            Err(err) => {
                log::debug!("Skipping {}: cannot open: {}", endpoint, err);
                return None;
            }
        };
        let identity = match channel.identify().await {
            Ok(x) => x,
            Err(err) => {
                if err.is_timeout() {
                    log::debug!("Skipping {}: no identification reply", endpoint);
                } else {
                    log::debug!("Skipping {}: identification failed: {}", endpoint, err);
                }
                close(channel).await;
                return None;
            }
        };
        if scanning && identity.model.is_empty() {
            log::debug!("Skipping {}: empty model", endpoint);
            close(channel).await;
            return None;
        }
        if !identity.matches_any(models) {
            log::debug!("Skipping {}: model `{}` does not match", endpoint, identity.model);
            close(channel).await;
            return None;
        }
        if let Err(err) = channel.claim().await {
            log::debug!("Skipping {}: cannot claim: {}", endpoint, err);
            close(channel).await;
            return None;
        }
        log::info!("Found {} {} on {}", identity.manufacturer, identity.model, endpoint);
        Some(Resolved { channel, identity })
    }
}

async fn close<C: Channel>(channel: C) {
    let endpoint = channel.endpoint().to_string();
    if let Err(err) = channel.close().await {
        log::warn!("Failed to close {}: {}", endpoint, err);
    }
}
