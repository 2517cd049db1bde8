//! Shared transmit pump: drains the process-wide FIFO of pending
//! messages.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::handler::RoomHandler;
use crate::stream::MessageContext;

/// Writes queued messages to their target streams until cancelled or the
/// queue closes.
///
/// A write error is logged and the pump proceeds to the next message; a
/// failing stream does not stall traffic to the others. The receiver is
/// parked back in its slot on exit so a stopped service can start again.
pub(crate) async fn transmit_pump<H: RoomHandler>(
    handler: Arc<H>,
    rx_slot: Arc<Mutex<Option<mpsc::UnboundedReceiver<MessageContext>>>>,
    cancel: CancellationToken,
) {
    // After a stop/start cycle the previous pump may still be parking the
    // receiver; wait for the slot instead of giving up.
    let mut rx = loop {
        if let Some(rx) = rx_slot.lock().await.take() {
            break rx;
        }
        if cancel.is_cancelled() {
            return;
        }
        tokio::task::yield_now().await;
    };

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            ctx = rx.recv() => match ctx {
                Some(ctx) => send_one(handler.as_ref(), ctx).await,
                None => break,
            },
        }
    }

    *rx_slot.lock().await = Some(rx);
}

async fn send_one<H: RoomHandler>(handler: &H, ctx: MessageContext) {
    let MessageContext { stream, message } = ctx;
    let mut message = handler.on_send(message);
    let mut writer = stream.writer().lock().await;
    if let Err(e) = writer.write_message(&mut message).await {
        tracing::error!(stream = stream.id(), "transmit pump error: {e}");
        if !writer.is_alive() {
            stream.mark_dead();
        }
    }
    // `message` drops here: content disposed unless the handler moved it
    // back into the queue.
}
