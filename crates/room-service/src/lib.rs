//! Service loops for Room protocol streams.
//!
//! A [`RoomService`] composes any number of live streams with application
//! logic:
//!
//! - one **listen pump** per attached stream drains framed messages,
//!   applies a per-stream ingress rate cap, and dispatches each message to
//!   the user's [`RoomHandler`];
//! - one shared **transmit pump** drains a process-wide FIFO of pending
//!   messages and serializes each to its target stream.
//!
//! Messages own their content buffers, so disposal is automatic: a handler
//! that re-enqueues a message moves it into the queue, anything else is
//! dropped (and a spilled temp file unlinked) when the handler returns.
//!
//! Errors in one listen pump end that stream only; transmit errors are
//! logged and the pump moves on. Lifecycle is `start` / `stop` /
//! `dispose`, with distinct use errors for operations on a stopped or
//! disposed service.

pub mod error;
pub mod handler;
mod pumps;
pub mod service;
pub mod stream;

pub use error::ServiceError;
pub use handler::{HandlerFuture, RoomHandler};
pub use service::RoomService;
pub use stream::{DynWriter, Outbox, StreamHandle};

use serde::{Deserialize, Serialize};

/// Default ingress soft cap per listen pump: 1 MiB/s of content bytes.
pub const DEFAULT_MAX_STREAM_RATE: u64 = 1024 * 1024;

fn default_max_stream_rate() -> u64 {
    DEFAULT_MAX_STREAM_RATE
}

/// Service-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceOptions {
    /// Ingress soft cap (content bytes per second) per listen pump. The
    /// limiter throttles an abusive peer without closing the connection.
    #[serde(default = "default_max_stream_rate")]
    pub max_stream_rate: u64,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            max_stream_rate: default_max_stream_rate(),
        }
    }
}
