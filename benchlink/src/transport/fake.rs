//! Test doubles: a scripted in-memory transport and a fake instrument on a local socket.
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};

use crate::transport::{Channel, Transport};
use crate::Error;

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Open(String),
    Query(String, String),
    Write(String, String),
    Claim(String),
    Close(String),
}

#[derive(Clone)]
pub enum Script {
    Refuse,
    Silent,
    Reply(String),
    /// Replies, but fails to close.
    StuckOnClose(String),
}

pub struct ScriptedTransport {
    endpoints: Vec<(String, Script)>,
    events: Arc<Mutex<Vec<Event>>>,
    enumeration_fails: bool,
}

impl ScriptedTransport {
    pub fn new(endpoints: Vec<(&str, Script)>) -> Self {
        Self {
            endpoints: endpoints.into_iter().map(|(x, s)| (x.to_string(), s)).collect(),
            events: Default::default(),
            enumeration_fails: false,
        }
    }

    pub fn failing_enumeration() -> Self {
        let mut ret = Self::new(vec![]);
        ret.enumeration_fails = true;
        ret
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.filter(|x| match x {
            Event::Open(x) => Some(x.clone()),
            _ => None,
        })
    }

    pub fn claimed(&self) -> Vec<String> {
        self.filter(|x| match x {
            Event::Claim(x) => Some(x.clone()),
            _ => None,
        })
    }

    pub fn closed(&self) -> Vec<String> {
        self.filter(|x| match x {
            Event::Close(x) => Some(x.clone()),
            _ => None,
        })
    }

    fn filter<F: Fn(&Event) -> Option<String>>(&self, f: F) -> Vec<String> {
        self.events.lock().unwrap().iter().filter_map(f).collect()
    }

    fn record(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct ScriptedChannel {
    endpoint: String,
    reply: Option<String>,
    close_fails: bool,
    events: Arc<Mutex<Vec<Event>>>,
}

#[async_trait]
impl Channel for ScriptedChannel {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn write_line(&mut self, line: &str) -> crate::Result<()> {
        let event = Event::Write(self.endpoint.clone(), line.to_string());
        self.events.lock().unwrap().push(event);
        Ok(())
    }

    async fn query_line(&mut self, line: &str) -> crate::Result<String> {
        let event = Event::Query(self.endpoint.clone(), line.to_string());
        self.events.lock().unwrap().push(event);
        self.reply.clone().ok_or_else(Error::protocol_timeout)
    }

    async fn claim(&mut self) -> crate::Result<()> {
        self.events.lock().unwrap().push(Event::Claim(self.endpoint.clone()));
        Ok(())
    }

    async fn close(self) -> crate::Result<()> {
        self.events.lock().unwrap().push(Event::Close(self.endpoint.clone()));
        if self.close_fails {
            return Err(Error::transport(anyhow!("device busy")));
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Channel = ScriptedChannel;

    async fn list_endpoints(&self) -> crate::Result<Vec<String>> {
        if self.enumeration_fails {
            return Err(Error::transport(anyhow!("enumeration failed")));
        }
        Ok(self.endpoints.iter().map(|(x, _)| x.clone()).collect())
    }

    async fn open(&self, endpoint: &str) -> crate::Result<Self::Channel> {
        let script = self
            .endpoints
            .iter()
            .find(|(x, _)| x == endpoint)
            .map(|(_, s)| s.clone())
            .ok_or_else(|| Error::argument(anyhow!("Invalid address: `{}`", endpoint)))?;
        let close_fails = matches!(script, Script::StuckOnClose(_));
        let reply = match script {
            Script::Refuse => {
                return Err(Error::transport(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "refused",
                )))
            }
            Script::Silent => None,
            Script::Reply(x) | Script::StuckOnClose(x) => Some(x),
        };
        self.record(Event::Open(endpoint.to_string()));
        Ok(ScriptedChannel {
            endpoint: endpoint.to_string(),
            reply,
            close_fails,
            events: self.events.clone(),
        })
    }
}

type Handler = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Line-based instrument listening on a local TCP port.
pub struct FakeInstrument {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<String>>>,
    closed: watch::Receiver<usize>,
    task: JoinHandle<()>,
}

impl FakeInstrument {
    pub async fn spawn<F>(handler: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let received: Arc<Mutex<Vec<String>>> = Default::default();
        let (closed_tx, closed) = watch::channel(0_usize);
        let closed_tx = Arc::new(closed_tx);
        let closed_count = Arc::new(Mutex::new(0_usize));

        let log = received.clone();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let handler = handler.clone();
                let log = log.clone();
                let closed_tx = closed_tx.clone();
                let closed_count = closed_count.clone();
                tokio::spawn(async move {
                    let (read, mut write) = stream.into_split();
                    let mut lines = BufReader::new(read).lines();
                    while let Ok(Some(line)) = lines.next_line().await {
                        log.lock().unwrap().push(line.clone());
                        if let Some(mut reply) = (*handler)(line.as_str()) {
                            reply.push('\n');
                            if write.write_all(reply.as_bytes()).await.is_err() {
                                break;
                            }
                        }
                    }
                    let count = {
                        let mut count = closed_count.lock().unwrap();
                        *count += 1;
                        *count
                    };
                    let _ = closed_tx.send(count);
                });
            }
        });

        Self {
            addr,
            received,
            closed,
            task,
        }
    }

    /// Answers `*IDN?` with `idn` and ignores everything else.
    pub async fn identity(idn: &str) -> Self {
        let idn = idn.to_string();
        Self::spawn(move |cmd| if cmd == "*IDN?" { Some(idn.clone()) } else { None }).await
    }

    /// An address nobody listens on.
    pub async fn unused_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn endpoint(&self) -> String {
        format!("tcp::{}", self.addr)
    }

    /// Wait until `count` client connections have been closed.
    pub async fn wait_closed(&self, count: usize) {
        let mut closed = self.closed.clone();
        let fut = async move {
            while *closed.borrow() < count {
                if closed.changed().await.is_err() {
                    break;
                }
            }
        };
        timeout(Duration::from_secs(2), fut)
            .await
            .expect("connection was not closed");
    }

    pub fn closed_connections(&self) -> usize {
        *self.closed.borrow()
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

impl Drop for FakeInstrument {
    fn drop(&mut self) {
        self.task.abort();
    }
}
