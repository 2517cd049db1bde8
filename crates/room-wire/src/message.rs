//! The message record: verb, channel, content.

use crate::content::Content;
use crate::token::Verb;

/// One Room message.
///
/// The message owns its content buffer; dropping the message disposes the
/// buffer (and unlinks a spilled temp file).
#[derive(Debug, Default)]
pub struct Message {
    /// The message kind.
    pub verb: Verb,
    /// The signed channel identifier.
    pub channel: i64,
    /// The payload, positioned at offset 0 when produced by the codec.
    pub content: Content,
}

impl Message {
    pub fn new(verb: Verb, channel: i64, content: Content) -> Self {
        Self {
            verb,
            channel,
            content,
        }
    }

    /// A message with no content.
    pub fn signal(verb: Verb, channel: i64) -> Self {
        Self::new(verb, channel, Content::empty())
    }
}
