//! Byte-transport adapters for the Room protocol.
//!
//! The codec in `room-wire` is generic over two small capabilities:
//! [`TransportRead`] and [`TransportWrite`], plus a liveness probe. This
//! crate defines that contract and implements it for the two transports
//! Room runs over in practice:
//!
//! - any reliable byte stream (TCP, Unix sockets, in-memory duplex pipes)
//!   via [`stream`]
//! - WebSocket binary messages via [`ws`]
//!
//! Adapters carry no framing knowledge of their own; they move raw bytes
//! and report liveness.

pub mod error;
pub mod stream;
pub mod traits;
pub mod ws;

pub use error::TransportError;
pub use stream::{StreamReadHalf, StreamWriteHalf, TcpReadHalf, TcpWriteHalf};
pub use traits::{IoFuture, TransportRead, TransportWrite};
pub use ws::{WsReadHalf, WsWriteHalf};
