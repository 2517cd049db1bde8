//! The two-method transport contract the Room codec reads and writes
//! through.
//!
//! Both traits are object-safe (boxed futures, like the handler traits in
//! the service layer), so a service can hold `Box<dyn TransportWrite>`
//! halves for streams of mixed transport types.

use std::future::Future;
use std::pin::Pin;

use crate::error::TransportError;

/// A boxed I/O future returned by transport methods.
pub type IoFuture<'a> = Pin<Box<dyn Future<Output = Result<usize, TransportError>> + Send + 'a>>;

/// The read half of a transport.
pub trait TransportRead: Send {
    /// Fills up to `buf.len()` bytes into `buf` and returns the number
    /// read. A return of 0 signals end-of-stream.
    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> IoFuture<'a>;

    /// `true` while the underlying channel is open.
    fn is_alive(&self) -> bool;
}

/// The write half of a transport.
pub trait TransportWrite: Send {
    /// Writes zero or more bytes from `buf` and returns the number
    /// written. A return of 0 signals the channel is closed.
    fn write<'a>(&'a mut self, buf: &'a [u8]) -> IoFuture<'a>;

    /// `true` while the underlying channel is open.
    fn is_alive(&self) -> bool;
}

impl<T: TransportRead + ?Sized> TransportRead for Box<T> {
    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> IoFuture<'a> {
        (**self).read(buf)
    }

    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }
}

impl<T: TransportWrite + ?Sized> TransportWrite for Box<T> {
    fn write<'a>(&'a mut self, buf: &'a [u8]) -> IoFuture<'a> {
        (**self).write(buf)
    }

    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }
}
