//! Per-stream listen pump: read, rate-limit, dispatch.

use std::sync::Arc;
use std::time::Duration;

use room_transport::TransportRead;
use room_wire::{RoomReader, WireError};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::handler::RoomHandler;
use crate::stream::{Outbox, StreamHandle};

/// Drains messages from one stream until it closes, errors, or is
/// cancelled.
///
/// The rate limiter is a soft, content-bytes-only token bucket refilling
/// every second: once the window's byte total exceeds `max_stream_rate`
/// the pump sleeps proportionally, then resets the window. It throttles
/// an abusive peer without closing the connection.
pub(crate) async fn listen_pump<R, H>(
    mut reader: RoomReader<R>,
    stream: StreamHandle,
    handler: Arc<H>,
    outbox: Outbox,
    max_stream_rate: u64,
    cancel: CancellationToken,
) where
    R: TransportRead,
    H: RoomHandler,
{
    let mut window = Instant::now();
    let mut rate: u64 = 0;

    while stream.is_alive() && reader.is_alive() {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            result = reader.read_message() => match result {
                Ok(message) => message,
                Err(WireError::Closed) => {
                    tracing::debug!(stream = stream.id(), "peer closed");
                    break;
                }
                Err(e) => {
                    tracing::error!(stream = stream.id(), "listen pump error: {e}");
                    break;
                }
            },
        };

        if window.elapsed() >= Duration::from_secs(1) {
            rate = 0;
            window = Instant::now();
        }
        rate += message.content.len();
        if max_stream_rate > 0 && rate > max_stream_rate {
            let pause = Duration::from_secs_f64(rate as f64 / max_stream_rate as f64);
            tracing::debug!(
                stream = stream.id(),
                pause_ms = pause.as_millis() as u64,
                "ingress rate cap exceeded, throttling"
            );
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
            rate = 0;
            window = Instant::now();
        }

        handler
            .on_receive(outbox.clone(), stream.clone(), message)
            .await;
    }

    stream.mark_dead();
}
