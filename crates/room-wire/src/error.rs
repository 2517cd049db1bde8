//! Error types for the Room codec.

use std::fmt;

use room_transport::TransportError;

/// The four fields of a Room frame, used to attribute framing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Verb,
    Channel,
    Count,
    Content,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Verb => "verb",
            Field::Channel => "channel",
            Field::Count => "count",
            Field::Content => "content",
        })
    }
}

/// Errors produced while reading or writing Room messages.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// A field exceeded its configured cap. Detected before the over-cap
    /// byte is buffered (read) or before any byte hits the wire (write).
    #[error("{field} too large ({len} bytes, max {max})")]
    FieldTooLarge { field: Field, len: u64, max: u64 },

    /// The stream ended (or the peer stopped accepting bytes) in the
    /// middle of a field.
    #[error("{field} broken")]
    FieldBroken { field: Field },

    /// A field's bytes do not match its lexical rule.
    #[error("invalid {field}")]
    Invalid { field: Field },

    /// The peer closed the stream cleanly, between messages.
    #[error("connection closed")]
    Closed,

    /// I/O failure on a content buffer.
    #[error("content buffer I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure of the underlying transport, propagated unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl WireError {
    /// `true` for violations of the framing rules (as opposed to
    /// transport failures or a clean close).
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            WireError::FieldTooLarge { .. } | WireError::FieldBroken { .. } | WireError::Invalid { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
