//! The service: stream registry, lifecycle, and pump orchestration.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use room_transport::{TransportRead, TransportWrite};
use room_wire::{Message, RoomReader, RoomWriter, StreamOptions};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::handler::RoomHandler;
use crate::pumps::{listen, transmit};
use crate::stream::{Lifecycle, MessageContext, Outbox, StreamHandle};
use crate::ServiceOptions;

/// Runs listen pumps for attached streams and the shared transmit pump.
///
/// ```no_run
/// # use std::sync::Arc;
/// # use room_service::{RoomService, RoomHandler, HandlerFuture, Outbox, StreamHandle, ServiceOptions};
/// # use room_wire::{Message, StreamOptions};
/// struct Echo;
///
/// impl RoomHandler for Echo {
///     fn on_receive(&self, outbox: Outbox, stream: StreamHandle, message: Message)
///         -> HandlerFuture<'_>
///     {
///         Box::pin(async move {
///             let _ = outbox.post(&stream, message);
///         })
///     }
/// }
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let service = RoomService::new(ServiceOptions::default(), Echo);
/// service.start()?;
/// let (read, write) = room_transport::stream::connect("127.0.0.1:9000").await?;
/// let stream = service.attach(read, write, StreamOptions::default())?;
/// # let _ = stream;
/// # Ok(())
/// # }
/// ```
pub struct RoomService<H: RoomHandler> {
    handler: Arc<H>,
    options: ServiceOptions,
    lifecycle: Arc<Lifecycle>,
    queue_tx: mpsc::UnboundedSender<MessageContext>,
    queue_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<MessageContext>>>>,
    run_cancel: StdMutex<CancellationToken>,
    transmit_task: StdMutex<Option<JoinHandle<()>>>,
    next_stream_id: AtomicU64,
}

impl<H: RoomHandler> RoomService<H> {
    pub fn new(options: ServiceOptions, handler: H) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            handler: Arc::new(handler),
            options,
            lifecycle: Arc::new(Lifecycle::default()),
            queue_tx,
            queue_rx: Arc::new(Mutex::new(Some(queue_rx))),
            run_cancel: StdMutex::new(CancellationToken::new()),
            transmit_task: StdMutex::new(None),
            next_stream_id: AtomicU64::new(1),
        }
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.options
    }

    pub fn is_running(&self) -> bool {
        self.lifecycle.is_running()
    }

    pub fn is_disposed(&self) -> bool {
        self.lifecycle.is_disposed()
    }

    /// A cloneable enqueue handle bound to this service's queue.
    pub fn outbox(&self) -> Outbox {
        Outbox {
            tx: self.queue_tx.clone(),
            lifecycle: Arc::clone(&self.lifecycle),
        }
    }

    /// Starts the service: sets the running flag and spawns the transmit
    /// pump. Must be called from within a tokio runtime.
    pub fn start(&self) -> Result<(), ServiceError> {
        if self.lifecycle.is_disposed() {
            return Err(ServiceError::Disposed);
        }
        if !self.lifecycle.set_running() {
            return Err(ServiceError::AlreadyRunning);
        }

        let token = CancellationToken::new();
        *self.lock_cancel() = token.clone();

        let task = tokio::spawn(transmit::transmit_pump(
            Arc::clone(&self.handler),
            Arc::clone(&self.queue_rx),
            token,
        ));
        // A finished pump from a previous run is simply detached.
        drop(self.lock_transmit().replace(task));
        Ok(())
    }

    /// Stops the service: clears the running flag and cancels every pump.
    /// Pending queue entries survive and are drained after a restart.
    pub fn stop(&self) -> Result<(), ServiceError> {
        if self.lifecycle.is_disposed() {
            return Err(ServiceError::Disposed);
        }
        if !self.lifecycle.is_running() {
            return Err(ServiceError::NotRunning);
        }
        self.lifecycle.clear_running();
        self.lock_cancel().cancel();
        Ok(())
    }

    /// Stops the service and waits for the transmit pump to finish. After
    /// disposal every entry point reports [`ServiceError::Disposed`].
    pub async fn dispose(&self) -> Result<(), ServiceError> {
        if !self.lifecycle.set_disposed() {
            return Err(ServiceError::Disposed);
        }
        self.lifecycle.clear_running();
        self.lock_cancel().cancel();

        let task = self.lock_transmit().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                tracing::error!("transmit pump panicked: {e}");
            }
        }
        Ok(())
    }

    /// Attaches a stream: builds its codec halves and spawns its listen
    /// pump. The returned handle targets outbound messages and can close
    /// the stream without touching the rest of the service.
    pub fn attach<R, W>(
        &self,
        read: R,
        write: W,
        stream_options: StreamOptions,
    ) -> Result<StreamHandle, ServiceError>
    where
        R: TransportRead + 'static,
        W: TransportWrite + 'static,
    {
        self.lifecycle.ensure_running()?;

        let id = self.next_stream_id.fetch_add(1, Ordering::Relaxed);
        let writer = RoomWriter::new(
            Box::new(write) as Box<dyn TransportWrite>,
            stream_options.clone(),
        );
        let reader = RoomReader::new(read, stream_options);

        let cancel = self.lock_cancel().child_token();
        let handle = StreamHandle::new(id, writer, cancel.clone());

        tokio::spawn(listen::listen_pump(
            reader,
            handle.clone(),
            Arc::clone(&self.handler),
            self.outbox(),
            self.options.max_stream_rate,
            cancel,
        ));

        tracing::debug!(stream = id, "stream attached");
        Ok(handle)
    }

    /// Enqueues `message` for transmission to `stream`. Strict FIFO
    /// across all producers.
    pub fn post(&self, stream: &StreamHandle, message: Message) -> Result<(), ServiceError> {
        self.outbox().post(stream, message)
    }

    fn lock_cancel(&self) -> std::sync::MutexGuard<'_, CancellationToken> {
        self.run_cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_transmit(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.transmit_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<H: RoomHandler> std::fmt::Debug for RoomService<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomService")
            .field("running", &self.is_running())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
