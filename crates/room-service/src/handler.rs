//! Handler trait for application logic over Room streams.

use std::future::Future;
use std::pin::Pin;

use room_wire::Message;

use crate::stream::{Outbox, StreamHandle};

/// A boxed future returned by handler methods.
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// Application logic invoked by the service pumps.
///
/// `on_receive` runs on the stream's listen pump; messages from one
/// stream arrive strictly in wire order. The handler owns the message: to
/// forward it (routing, echo), move it into the queue via
/// [`Outbox::post`]; otherwise dropping it disposes the content buffer.
pub trait RoomHandler: Send + Sync + 'static {
    /// Called for every inbound message.
    fn on_receive(&self, outbox: Outbox, stream: StreamHandle, message: Message)
        -> HandlerFuture<'_>;

    /// Transform hook applied by the transmit pump just before the codec
    /// write. The default is the identity.
    fn on_send(&self, message: Message) -> Message {
        message
    }
}
