//! The read side of the codec: parses Room messages from a byte
//! transport.
//!
//! Each underlying read may return any partial chunk, so header fields are
//! assembled across chunks in a scratch buffer while the staging buffer
//! tracks a `pos..end` window of unconsumed bytes. Memory stays bounded:
//! the staging buffer is `read_buffer_size`, the scratch buffer is capped
//! by the active field's limit, and content goes straight into its
//! [`Content`] buffer.
//!
//! Cancelling a read mid-field is safe; the scratch buffer is reset at the
//! start of the next field and no partial message is ever returned.

use room_transport::TransportRead;

use crate::content::Content;
use crate::error::{Field, WireError};
use crate::message::Message;
use crate::options::StreamOptions;
use crate::scan::{is_blank, is_sign, scan_digit, scan_hex, scan_word};
use crate::token::{Channel, Count, Verb};

/// The three header fields, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderField {
    Verb,
    Channel,
    Count,
}

impl HeaderField {
    fn field(self) -> Field {
        match self {
            HeaderField::Verb => Field::Verb,
            HeaderField::Channel => Field::Channel,
            HeaderField::Count => Field::Count,
        }
    }
}

/// Length of the leading run of `field`-class bytes in `chunk`, given
/// `have` bytes of the field already accumulated.
fn scan_header(field: HeaderField, have: usize, chunk: &[u8]) -> usize {
    match field {
        HeaderField::Verb => scan_word(chunk, 0, chunk.len()),
        HeaderField::Count => scan_digit(chunk, 0, chunk.len()),
        HeaderField::Channel => {
            // The sign is only field-class at the first byte.
            let sign = usize::from(have == 0 && !chunk.is_empty() && is_sign(chunk[0]));
            sign + scan_hex(&chunk[sign..], 0, chunk.len() - sign)
        }
    }
}

/// Streaming reader for Room messages.
pub struct RoomReader<R> {
    transport: R,
    options: StreamOptions,
    /// Staging buffer; `pos..end` is the unconsumed window.
    buf: Box<[u8]>,
    pos: usize,
    end: usize,
    /// Assembles one header token across chunk boundaries.
    scratch: Vec<u8>,
}

impl<R: TransportRead> RoomReader<R> {
    pub fn new(transport: R, options: StreamOptions) -> Self {
        let size = options.read_buffer_size.max(1);
        Self {
            transport,
            options,
            buf: vec![0u8; size].into_boxed_slice(),
            pos: 0,
            end: 0,
            scratch: Vec::new(),
        }
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    pub fn transport(&self) -> &R {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut R {
        &mut self.transport
    }

    /// Consumes the reader and returns the transport half.
    pub fn into_inner(self) -> R {
        self.transport
    }

    /// `true` while buffered bytes remain or the transport is open.
    pub fn is_alive(&self) -> bool {
        self.pos < self.end || self.transport.is_alive()
    }

    /// Refills the staging buffer if it is exhausted and returns the
    /// number of unconsumed bytes (0 only at end-of-stream).
    async fn fill(&mut self) -> Result<usize, WireError> {
        if self.pos == self.end {
            self.pos = 0;
            self.end = self.transport.read(&mut self.buf).await?;
        }
        Ok(self.end - self.pos)
    }

    /// Reads one header field into the scratch buffer, consuming its
    /// blank terminator when present.
    async fn read_field(&mut self, field: HeaderField) -> Result<(), WireError> {
        self.scratch.clear();
        let cap = match field {
            HeaderField::Verb => self.options.max_verb_length,
            HeaderField::Channel => self.options.max_channel_length,
            HeaderField::Count => self.options.max_count_length,
        };
        loop {
            let available = self.fill().await?;
            if available == 0 {
                // Nothing at all before the first verb byte is a clean
                // close, not a torn frame.
                if field == HeaderField::Verb && self.scratch.is_empty() {
                    return Err(WireError::Closed);
                }
                return Err(WireError::FieldBroken {
                    field: field.field(),
                });
            }

            let chunk = &self.buf[self.pos..self.end];
            let n = scan_header(field, self.scratch.len(), chunk);
            let mut consumed = n;
            let mut complete = false;
            if n < chunk.len() {
                // The stop byte ends the field; a blank is the terminator
                // and is consumed, anything else is left for the next
                // field.
                complete = true;
                if is_blank(chunk[n]) {
                    consumed += 1;
                }
            }

            if self.scratch.len() + n > cap {
                return Err(WireError::FieldTooLarge {
                    field: field.field(),
                    len: (self.scratch.len() + n) as u64,
                    max: cap as u64,
                });
            }

            let start = self.pos;
            self.scratch.extend_from_slice(&self.buf[start..start + n]);
            self.pos += consumed;
            if complete {
                return Ok(());
            }
        }
    }

    /// Reads the next message.
    ///
    /// Returns [`WireError::Closed`] when the peer closes the stream at a
    /// message boundary; any other end-of-stream or lexical violation is
    /// a framing error. On error the staging buffers remain valid but no
    /// partial message is exposed.
    pub async fn read_message(&mut self) -> Result<Message, WireError> {
        self.read_field(HeaderField::Verb).await?;
        let verb = Verb::from_scanned(&self.scratch);

        self.read_field(HeaderField::Channel).await?;
        let channel = if self.scratch.is_empty() {
            0
        } else {
            Channel::parse(&self.scratch)?.to_i64()?
        };

        self.read_field(HeaderField::Count).await?;
        let count = if self.scratch.is_empty() {
            0
        } else {
            Count::parse(&self.scratch)?.to_u64()?
        };

        if count > self.options.max_content_length {
            return Err(WireError::FieldTooLarge {
                field: Field::Content,
                len: count,
                max: self.options.max_content_length,
            });
        }

        let mut content = Content::for_length(count, &self.options).await?;
        let mut remaining = count;
        while remaining > 0 {
            let available = self.fill().await?;
            if available == 0 {
                return Err(WireError::FieldBroken {
                    field: Field::Content,
                });
            }
            let take = remaining.min(available as u64) as usize;
            content.write_all(&self.buf[self.pos..self.pos + take]).await?;
            self.pos += take;
            remaining -= take as u64;
        }
        content.rewind().await?;

        Ok(Message {
            verb,
            channel,
            content,
        })
    }
}
