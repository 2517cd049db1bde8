//! The write side of the codec: serializes Room messages to a byte
//! transport.
//!
//! All three header fields are validated (form and caps) before the first
//! byte hits the wire, and the count is derived from the content buffer's
//! length, never from a caller-supplied value. Content is copied in
//! chunks of `write_buffer_size`.

use room_transport::TransportWrite;

use crate::error::{Field, WireError};
use crate::message::Message;
use crate::options::StreamOptions;
use crate::token::{Channel, Count, Verb};

/// Streaming writer for Room messages.
pub struct RoomWriter<W> {
    transport: W,
    options: StreamOptions,
    /// Staging buffer for content chunks.
    buf: Box<[u8]>,
}

impl<W: TransportWrite> RoomWriter<W> {
    pub fn new(transport: W, options: StreamOptions) -> Self {
        let size = options.write_buffer_size.max(1);
        Self {
            transport,
            options,
            buf: vec![0u8; size].into_boxed_slice(),
        }
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    pub fn transport(&self) -> &W {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut W {
        &mut self.transport
    }

    /// Consumes the writer and returns the transport half.
    pub fn into_inner(self) -> W {
        self.transport
    }

    pub fn is_alive(&self) -> bool {
        self.transport.is_alive()
    }

    /// Serializes one message.
    ///
    /// Takes the message mutably to rewind its content before and after
    /// copying; the content is left positioned at offset 0 so the owner
    /// can send it again or read it back.
    pub async fn write_message(&mut self, message: &mut Message) -> Result<(), WireError> {
        if !Verb::verify(message.verb.as_bytes()) {
            return Err(WireError::Invalid { field: Field::Verb });
        }
        if message.verb.len() > self.options.max_verb_length {
            return Err(WireError::FieldTooLarge {
                field: Field::Verb,
                len: message.verb.len() as u64,
                max: self.options.max_verb_length as u64,
            });
        }

        let channel = Channel::from_i64(message.channel);
        if channel.len() > self.options.max_channel_length {
            return Err(WireError::FieldTooLarge {
                field: Field::Channel,
                len: channel.len() as u64,
                max: self.options.max_channel_length as u64,
            });
        }

        let content_len = message.content.len();
        if content_len > self.options.max_content_length {
            return Err(WireError::FieldTooLarge {
                field: Field::Content,
                len: content_len,
                max: self.options.max_content_length,
            });
        }
        let count = Count::from_u64(content_len);
        if count.len() > self.options.max_count_length {
            return Err(WireError::FieldTooLarge {
                field: Field::Count,
                len: count.len() as u64,
                max: self.options.max_count_length as u64,
            });
        }

        self.write_raw(message.verb.as_bytes(), Field::Verb).await?;
        self.write_raw(b" ", Field::Verb).await?;
        self.write_raw(channel.as_bytes(), Field::Channel).await?;
        self.write_raw(b" ", Field::Channel).await?;
        self.write_raw(count.as_bytes(), Field::Count).await?;
        self.write_raw(b" ", Field::Count).await?;

        if content_len > 0 {
            message.content.rewind().await?;
            let mut remaining = content_len;
            while remaining > 0 {
                let n = message.content.read(&mut self.buf).await?;
                if n == 0 {
                    return Err(WireError::FieldBroken {
                        field: Field::Content,
                    });
                }
                let mut off = 0;
                while off < n {
                    let written = self.transport.write(&self.buf[off..n]).await?;
                    if written == 0 {
                        return Err(WireError::FieldBroken {
                            field: Field::Content,
                        });
                    }
                    off += written;
                }
                remaining -= n as u64;
            }
            message.content.rewind().await?;
        }

        Ok(())
    }

    /// Writes a slice fully, retrying short writes; a zero-byte write is
    /// a broken field.
    async fn write_raw(&mut self, bytes: &[u8], field: Field) -> Result<(), WireError> {
        let mut off = 0;
        while off < bytes.len() {
            let n = self.transport.write(&bytes[off..]).await?;
            if n == 0 {
                return Err(WireError::FieldBroken { field });
            }
            off += n;
        }
        Ok(())
    }
}
