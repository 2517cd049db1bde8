//! Streaming codec for the Room messaging protocol.
//!
//! Room is a compact, text-framed protocol over reliable byte streams.
//! Every message is four fields, the first three terminated by a single
//! blank byte:
//!
//! ```text
//! <VERB> SP <CHANNEL> SP <COUNT> SP <CONTENT[COUNT bytes]>
//!
//! MSG +0 26 UTF8 Text or Binary dat
//! PING +ffffffff 0
//! BCAST -1 4 ABCD
//! ```
//!
//! - `VERB` is `[A-Za-z_]+`, an opaque message kind.
//! - `CHANNEL` is `[+-][0-9A-Fa-f]+`, a signed hexadecimal route id.
//! - `COUNT` is `[0-9]+`, the content length in bytes.
//! - `CONTENT` is exactly `COUNT` opaque bytes; there is no delimiter
//!   between messages beyond the blank after `COUNT`.
//!
//! The writer always emits `0x20` as the blank; the reader accepts any
//! blank-class byte (space, tab, newline, carriage return, form feed).
//!
//! [`RoomReader`] and [`RoomWriter`] run over anything implementing the
//! transport contract from `room-transport`, with bounded staging buffers,
//! per-field size caps, and content that spills to a temp file past a
//! configurable threshold.

pub mod content;
pub mod error;
pub mod message;
pub mod options;
pub mod reader;
pub mod scan;
pub mod token;
pub mod writer;

pub use content::Content;
pub use error::{Field, Result, WireError};
pub use message::Message;
pub use options::StreamOptions;
pub use reader::RoomReader;
pub use token::{Channel, Count, Verb};
pub use writer::RoomWriter;
