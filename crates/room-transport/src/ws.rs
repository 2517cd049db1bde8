//! WebSocket transport adapter.
//!
//! Room frames travel as WebSocket binary messages; each [`write`] call
//! becomes one final (end-of-message) binary frame. Text frames are a
//! protocol violation: the read half answers them with a close frame
//! carrying code 1003 (invalid message type) and reports end-of-stream.
//!
//! The sink side is driven by a small pump task fed over an mpsc channel,
//! so the read half can emit control frames (the rejection close) without
//! sharing the sink. [`split_ws`] must therefore be called from within a
//! tokio runtime.
//!
//! [`write`]: crate::TransportWrite::write

use bytes::{Buf, Bytes};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::{Result, TransportError};
use crate::traits::{IoFuture, TransportRead, TransportWrite};

/// Outbound frame buffer (messages, not bytes).
const SINK_BUFFER: usize = 32;

/// Read half of a WebSocket transport.
///
/// Binary frames larger than the caller's buffer are carried over between
/// `read` calls.
pub struct WsReadHalf<S> {
    stream: SplitStream<WebSocketStream<S>>,
    pending: Bytes,
    out: mpsc::Sender<WsMessage>,
    open: bool,
}

/// Write half of a WebSocket transport.
pub struct WsWriteHalf {
    out: mpsc::Sender<WsMessage>,
}

/// Splits a WebSocket stream into transport halves and spawns its sink
/// pump.
pub fn split_ws<S>(ws: WebSocketStream<S>) -> (WsReadHalf<S>, WsWriteHalf)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (sink, stream) = ws.split();
    let (tx, rx) = mpsc::channel(SINK_BUFFER);
    tokio::spawn(sink_pump(sink, rx));
    (
        WsReadHalf {
            stream,
            pending: Bytes::new(),
            out: tx.clone(),
            open: true,
        },
        WsWriteHalf { out: tx },
    )
}

/// Connects to a `ws://` / `wss://` URL and returns the transport halves.
pub async fn connect(url: &str) -> Result<(WsReadHalf<MaybeTlsStream<TcpStream>>, WsWriteHalf)> {
    let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
    Ok(split_ws(ws))
}

/// Performs the server-side WebSocket handshake on an accepted TCP stream.
pub async fn accept(stream: TcpStream) -> Result<(WsReadHalf<TcpStream>, WsWriteHalf)> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    Ok(split_ws(ws))
}

/// Drains outbound messages into the sink until the channel closes or a
/// close frame goes out, then closes the socket.
async fn sink_pump<S>(
    mut sink: SplitSink<WebSocketStream<S>, WsMessage>,
    mut rx: mpsc::Receiver<WsMessage>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(msg) = rx.recv().await {
        let is_close = matches!(msg, WsMessage::Close(_));
        if let Err(e) = sink.send(msg).await {
            tracing::debug!("WebSocket sink error: {e}");
            rx.close();
            return;
        }
        if is_close {
            rx.close();
            return;
        }
    }
    let _ = sink.send(WsMessage::Close(None)).await;
}

impl<S> TransportRead for WsReadHalf<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn read<'a>(&'a mut self, buf: &'a mut [u8]) -> IoFuture<'a> {
        Box::pin(async move {
            if buf.is_empty() {
                return Ok(0);
            }
            loop {
                if !self.pending.is_empty() {
                    let n = self.pending.len().min(buf.len());
                    buf[..n].copy_from_slice(&self.pending[..n]);
                    self.pending.advance(n);
                    return Ok(n);
                }
                if !self.open {
                    return Ok(0);
                }
                match self.stream.next().await {
                    Some(Ok(WsMessage::Binary(data))) => {
                        self.pending = data;
                    }
                    Some(Ok(WsMessage::Text(_))) => {
                        tracing::warn!("text frame on a binary channel, closing");
                        let close = WsMessage::Close(Some(CloseFrame {
                            code: CloseCode::Unsupported,
                            reason: "binary frames only".into(),
                        }));
                        let _ = self.out.try_send(close);
                        self.open = false;
                        return Ok(0);
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        self.open = false;
                        return Ok(0);
                    }
                    Some(Ok(_)) => {} // Ping/Pong/raw frames
                    Some(Err(
                        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed,
                    )) => {
                        self.open = false;
                        return Ok(0);
                    }
                    Some(Err(e)) => {
                        self.open = false;
                        return Err(TransportError::WebSocket(e));
                    }
                }
            }
        })
    }

    fn is_alive(&self) -> bool {
        self.open || !self.pending.is_empty()
    }
}

impl TransportWrite for WsWriteHalf {
    fn write<'a>(&'a mut self, buf: &'a [u8]) -> IoFuture<'a> {
        Box::pin(async move {
            if buf.is_empty() {
                return Ok(0);
            }
            let msg = WsMessage::Binary(buf.to_vec().into());
            match self.out.send(msg).await {
                Ok(()) => Ok(buf.len()),
                Err(_) => Ok(0),
            }
        })
    }

    fn is_alive(&self) -> bool {
        !self.out.is_closed()
    }
}

impl WsWriteHalf {
    /// Sends a close frame and stops the sink pump.
    pub async fn close(&mut self) {
        let _ = self.out.send(WsMessage::Close(None)).await;
    }
}

#[cfg(test)]
mod tests {
    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::traits::{TransportRead, TransportWrite};

    async fn ws_pair() -> (
        (WsReadHalf<TcpStream>, WsWriteHalf),
        WebSocketStream<MaybeTlsStream<TcpStream>>,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            accept(stream).await.unwrap()
        });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        (server.await.unwrap(), client)
    }

    #[tokio::test]
    async fn binary_frame_roundtrip() {
        let ((mut r, mut w), mut client) = ws_pair().await;

        client
            .send(WsMessage::Binary(b"hello".to_vec().into()))
            .await
            .unwrap();

        let mut buf = [0u8; 16];
        let n = r.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"hello");

        let n = w.write(b"world").await.unwrap();
        assert_eq!(n, 5);
        match client.next().await.unwrap().unwrap() {
            WsMessage::Binary(data) => assert_eq!(data.as_ref(), b"world"),
            other => panic!("expected binary frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_frame_carries_over() {
        let ((mut r, _w), mut client) = ws_pair().await;

        client
            .send(WsMessage::Binary(b"0123456789".to_vec().into()))
            .await
            .unwrap();

        let mut got = Vec::new();
        let mut buf = [0u8; 3];
        while got.len() < 10 {
            let n = r.read(&mut buf).await.unwrap();
            assert!(n > 0 && n <= 3);
            got.extend_from_slice(&buf[..n]);
        }
        assert_eq!(&got, b"0123456789");
    }

    #[tokio::test]
    async fn text_frame_rejected_with_close_1003() {
        let ((mut r, _w), mut client) = ws_pair().await;

        client
            .send(WsMessage::Text("not binary".into()))
            .await
            .unwrap();

        let mut buf = [0u8; 8];
        let n = r.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
        assert!(!r.is_alive());

        // The client should see the rejection close frame.
        loop {
            match client.next().await {
                Some(Ok(WsMessage::Close(Some(frame)))) => {
                    assert_eq!(u16::from(frame.code), 1003);
                    break;
                }
                Some(Ok(_)) => continue,
                other => panic!("expected close frame, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn peer_close_reads_as_eof() {
        let ((mut r, _w), mut client) = ws_pair().await;

        client.close(None).await.unwrap();

        let mut buf = [0u8; 8];
        let n = r.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
        assert!(!r.is_alive());
    }

    #[tokio::test]
    async fn write_after_peer_gone_reports_closed() {
        let ((r, mut w), client) = ws_pair().await;
        drop(client);
        drop(r);

        // The sink pump dies once the peer socket is gone; writes then
        // report a closed channel.
        let mut reported_closed = false;
        for _ in 0..50 {
            match w.write(b"x").await {
                Ok(0) => {
                    reported_closed = true;
                    break;
                }
                Ok(_) => tokio::time::sleep(std::time::Duration::from_millis(10)).await,
                Err(_) => {
                    reported_closed = true;
                    break;
                }
            }
        }
        assert!(reported_closed);
    }
}
