//! Adapter over any reliable byte stream (TCP, Unix sockets, in-memory
//! duplex pipes).
//!
//! The halves track liveness themselves: a 0-byte read, a 0-byte write, or
//! an I/O error marks the half dead. There is no reconnection; a dead half
//! stays dead.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::error::{Result, TransportError};
use crate::traits::{IoFuture, TransportRead, TransportWrite};

/// Read half of a byte-stream transport.
pub struct StreamReadHalf<R> {
    inner: R,
    open: bool,
}

/// Write half of a byte-stream transport.
pub struct StreamWriteHalf<W> {
    inner: W,
    open: bool,
}

pub type TcpReadHalf = StreamReadHalf<OwnedReadHalf>;
pub type TcpWriteHalf = StreamWriteHalf<OwnedWriteHalf>;

/// Splits any `AsyncRead + AsyncWrite` stream into transport halves.
///
/// Useful for Unix sockets and `tokio::io::duplex` pairs in tests; for
/// TCP prefer [`from_tcp`], which avoids the internal lock of
/// `tokio::io::split`.
pub fn split<T>(io: T) -> (StreamReadHalf<ReadHalf<T>>, StreamWriteHalf<WriteHalf<T>>)
where
    T: AsyncRead + AsyncWrite + Send,
{
    let (r, w) = tokio::io::split(io);
    (
        StreamReadHalf {
            inner: r,
            open: true,
        },
        StreamWriteHalf {
            inner: w,
            open: true,
        },
    )
}

/// Wraps a connected TCP stream.
pub fn from_tcp(stream: TcpStream) -> (TcpReadHalf, TcpWriteHalf) {
    let (r, w) = stream.into_split();
    (
        StreamReadHalf {
            inner: r,
            open: true,
        },
        StreamWriteHalf {
            inner: w,
            open: true,
        },
    )
}

/// Connects to `addr` and returns the transport halves.
pub async fn connect(addr: impl ToSocketAddrs) -> Result<(TcpReadHalf, TcpWriteHalf)> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    Ok(from_tcp(stream))
}

/// Accepts one connection from `listener` and returns the halves plus the
/// peer address.
pub async fn accept(
    listener: &tokio::net::TcpListener,
) -> Result<(TcpReadHalf, TcpWriteHalf, SocketAddr)> {
    let (stream, addr) = listener.accept().await?;
    stream.set_nodelay(true)?;
    let (r, w) = from_tcp(stream);
    Ok((r, w, addr))
}

impl<R: AsyncRead + Unpin + Send> TransportRead for StreamReadHalf<R> {
    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> IoFuture<'a> {
        Box::pin(async move {
            if !self.open || buf.is_empty() {
                return Ok(0);
            }
            match self.inner.read(buf).await {
                Ok(0) => {
                    self.open = false;
                    Ok(0)
                }
                Ok(n) => Ok(n),
                Err(e) => {
                    self.open = false;
                    Err(TransportError::Io(e))
                }
            }
        })
    }

    fn is_alive(&self) -> bool {
        self.open
    }
}

impl<W: AsyncWrite + Unpin + Send> TransportWrite for StreamWriteHalf<W> {
    fn write<'a>(&'a mut self, buf: &'a [u8]) -> IoFuture<'a> {
        Box::pin(async move {
            if !self.open || buf.is_empty() {
                return Ok(0);
            }
            match self.inner.write(buf).await {
                Ok(0) => {
                    self.open = false;
                    Ok(0)
                }
                Ok(n) => Ok(n),
                Err(e) => {
                    self.open = false;
                    Err(TransportError::Io(e))
                }
            }
        })
    }

    fn is_alive(&self) -> bool {
        self.open
    }
}

impl<W: AsyncWrite + Unpin + Send> StreamWriteHalf<W> {
    /// Flushes and shuts down the write side.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.open = false;
        self.inner.shutdown().await?;
        Ok(())
    }
}
