//! Handles shared between the service, its pumps, and handlers.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use room_transport::TransportWrite;
use room_wire::{Message, RoomWriter};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;

/// The writer type stored per stream: the codec over a boxed write half,
/// so streams of mixed transports share one service.
pub type DynWriter = RoomWriter<Box<dyn TransportWrite>>;

/// One pending outbound message: target stream plus the owned message.
pub(crate) struct MessageContext {
    pub(crate) stream: StreamHandle,
    pub(crate) message: Message,
}

/// Lifecycle flags shared by the service and its handles.
#[derive(Default)]
pub(crate) struct Lifecycle {
    running: AtomicBool,
    disposed: AtomicBool,
}

impl Lifecycle {
    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Flips running on; `false` if it already was.
    pub(crate) fn set_running(&self) -> bool {
        !self.running.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn clear_running(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Flips disposed on; `false` if it already was.
    pub(crate) fn set_disposed(&self) -> bool {
        !self.disposed.swap(true, Ordering::SeqCst)
    }

    /// Guard for entry points that require a live, running service.
    pub(crate) fn ensure_running(&self) -> Result<(), ServiceError> {
        if self.is_disposed() {
            return Err(ServiceError::Disposed);
        }
        if !self.is_running() {
            return Err(ServiceError::NotRunning);
        }
        Ok(())
    }
}

struct StreamShared {
    id: u64,
    writer: Mutex<DynWriter>,
    alive: AtomicBool,
    cancel: CancellationToken,
}

/// Cloneable handle to one attached stream.
///
/// The listen pump holds the read half exclusively; the transmit pump
/// reaches the write half through this handle's mutex. The two touch
/// disjoint staging buffers, so one reader and one writer run
/// concurrently per stream.
#[derive(Clone)]
pub struct StreamHandle {
    shared: Arc<StreamShared>,
}

impl StreamHandle {
    pub(crate) fn new(id: u64, writer: DynWriter, cancel: CancellationToken) -> Self {
        Self {
            shared: Arc::new(StreamShared {
                id,
                writer: Mutex::new(writer),
                alive: AtomicBool::new(true),
                cancel,
            }),
        }
    }

    /// Service-assigned stream id.
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// `true` until the listen pump ends or the transport dies.
    pub fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst) && !self.shared.cancel.is_cancelled()
    }

    /// Stops this stream's listen pump; other streams are untouched.
    pub fn close(&self) {
        self.shared.cancel.cancel();
    }

    pub(crate) fn writer(&self) -> &Mutex<DynWriter> {
        &self.shared.writer
    }

    pub(crate) fn cancel_token(&self) -> &CancellationToken {
        &self.shared.cancel
    }

    pub(crate) fn mark_dead(&self) {
        self.shared.alive.store(false, Ordering::SeqCst);
    }
}

impl fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandle")
            .field("id", &self.shared.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Cloneable handle for enqueueing outbound messages.
///
/// Handed to [`RoomHandler::on_receive`]; also available from
/// [`RoomService::outbox`] for producers outside the handler.
///
/// [`RoomHandler::on_receive`]: crate::handler::RoomHandler::on_receive
/// [`RoomService::outbox`]: crate::service::RoomService::outbox
#[derive(Clone)]
pub struct Outbox {
    pub(crate) tx: mpsc::UnboundedSender<MessageContext>,
    pub(crate) lifecycle: Arc<Lifecycle>,
}

impl Outbox {
    /// Enqueues `message` for transmission to `stream`.
    ///
    /// The queue is strict FIFO across all producers. The message (and
    /// its content buffer) is owned by the queue until written.
    pub fn post(&self, stream: &StreamHandle, message: Message) -> Result<(), ServiceError> {
        self.lifecycle.ensure_running()?;
        self.tx
            .send(MessageContext {
                stream: stream.clone(),
                message,
            })
            .map_err(|_| ServiceError::NotRunning)
    }
}
