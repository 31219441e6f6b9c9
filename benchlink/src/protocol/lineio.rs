//! This module implements line-terminated text exchange on a bytestream-like
//! channel, for example TCP streams or serial ports
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use anyhow::anyhow;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::time;

use crate::Error;

struct ReadAll<'a, T: AsyncRead + Unpin> {
    inner: &'a mut T,
}

impl<'a, T: AsyncRead + Unpin> Future for ReadAll<'a, T> {
    type Output = io::Result<Vec<u8>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut ret = Vec::new();
        loop {
            let mut buf_data = [0_u8; 1000];
            let mut buf = ReadBuf::new(&mut buf_data);
            match Pin::new(&mut self.inner).poll_read(cx, &mut buf) {
                Poll::Ready(Ok(())) => {
                    if buf.filled().is_empty() {
                        // end of stream
                        return Poll::Ready(Ok(ret));
                    }
                    ret.extend_from_slice(buf.filled());
                    continue;
                }
                Poll::Ready(Err(err)) => {
                    return Poll::Ready(Err(err));
                }
                Poll::Pending => {
                    return Poll::Ready(Ok(ret));
                }
            }
        }
    }
}

/// Drain everything that is currently buffered without waiting for more data.
pub async fn read_all<T: AsyncRead + Unpin>(stream: &mut T) -> io::Result<Vec<u8>> {
    let fut = ReadAll { inner: stream };
    fut.await
}

pub fn check_term(term: u8) -> crate::Result<()> {
    if term == 0 || term > 127 {
        Err(Error::argument(anyhow!("Invalid termination.")))
    } else {
        Ok(())
    }
}

pub async fn write_line<T: AsyncWrite + Unpin>(stream: &mut T, line: &str, term: u8) -> crate::Result<()> {
    check_term(term)?;
    let mut data = line.as_bytes().to_vec();
    if data.last() != Some(&term) {
        data.push(term);
    }
    log::debug!("write: {:?}", line);
    AsyncWriteExt::write_all(stream, &data).await.map_err(Error::transport)?;
    AsyncWriteExt::flush(stream).await.map_err(Error::transport)
}

pub async fn read_line<T: AsyncRead + Unpin>(stream: &mut T, term: u8, timeout: Duration) -> crate::Result<String> {
    check_term(term)?;
    let mut ret = read_to_term_timeout(stream, term, timeout).await?;
    if ret.last() == Some(&b'\r') {
        ret.pop();
    }
    let ret = String::from_utf8(ret).map_err(|_| Error::protocol(anyhow!("Cannot decode as UTF-8")))?;
    log::debug!("read: {:?}", ret);
    Ok(ret)
}

pub async fn query_line<T: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut T,
    line: &str,
    term: u8,
    timeout: Duration,
) -> crate::Result<String> {
    let stale = read_all(stream).await.map_err(Error::transport)?;
    if !stale.is_empty() {
        log::debug!("discarding {} stale bytes", stale.len());
    }
    write_line(stream, line, term).await?;
    read_line(stream, term, timeout).await
}

/// pop a u8 from a byte stream
async fn pop<T: AsyncRead + Unpin>(stream: &mut T) -> crate::Result<u8> {
    AsyncReadExt::read_u8(stream).await.map_err(Error::protocol)
}

async fn read_to_term_timeout<T: AsyncRead + Unpin>(stream: &mut T, term: u8, timeout: Duration) -> crate::Result<Vec<u8>> {
    let fut = read_to_term(stream, term);
    match time::timeout(timeout, fut).await {
        Ok(x) => x,
        Err(_) => Err(Error::protocol_timeout()),
    }
}

async fn read_to_term<T: AsyncRead + Unpin>(stream: &mut T, term: u8) -> crate::Result<Vec<u8>> {
    let mut ret = Vec::new();
    loop {
        let x = pop(stream).await?;
        if x == term {
            break;
        }
        ret.push(x);
    }
    Ok(ret)
}
