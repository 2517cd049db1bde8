//! Service tests over in-memory duplex streams.

use std::time::Duration;

use room_service::{
    HandlerFuture, Outbox, RoomHandler, RoomService, ServiceError, ServiceOptions, StreamHandle,
};
use room_transport::stream;
use room_wire::{Content, Message, RoomReader, RoomWriter, StreamOptions, Verb};
use tokio::sync::mpsc;

/// Echoes every inbound message back to its source stream and reports it
/// to the test over a channel.
struct EchoHandler {
    seen: mpsc::UnboundedSender<(String, i64, u64)>,
}

impl RoomHandler for EchoHandler {
    fn on_receive(
        &self,
        outbox: Outbox,
        stream: StreamHandle,
        message: Message,
    ) -> HandlerFuture<'_> {
        let seen = self.seen.clone();
        Box::pin(async move {
            let _ = seen.send((
                message.verb.as_str().to_string(),
                message.channel,
                message.content.len(),
            ));
            let _ = outbox.post(&stream, message);
        })
    }
}

/// Records inbound messages without replying.
struct SinkHandler {
    seen: mpsc::UnboundedSender<(String, Vec<u8>)>,
}

impl RoomHandler for SinkHandler {
    fn on_receive(
        &self,
        _outbox: Outbox,
        _stream: StreamHandle,
        mut message: Message,
    ) -> HandlerFuture<'_> {
        let seen = self.seen.clone();
        Box::pin(async move {
            let bytes = message.content.bytes().await.unwrap_or_default();
            let _ = seen.send((message.verb.as_str().to_string(), bytes));
        })
    }
}

/// Client-side codec pair over a fresh duplex connected to `service`.
fn attach_client<H: RoomHandler>(
    service: &RoomService<H>,
) -> (
    RoomWriter<stream::StreamWriteHalf<tokio::io::WriteHalf<tokio::io::DuplexStream>>>,
    RoomReader<stream::StreamReadHalf<tokio::io::ReadHalf<tokio::io::DuplexStream>>>,
    StreamHandle,
) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (client_read, client_write) = stream::split(client);
    let (server_read, server_write) = stream::split(server);

    let handle = service
        .attach(server_read, server_write, StreamOptions::default())
        .expect("attach should succeed on a running service");

    (
        RoomWriter::new(client_write, StreamOptions::default()),
        RoomReader::new(client_read, StreamOptions::default()),
        handle,
    )
}

fn text_message(verb: &str, channel: i64, content: &[u8]) -> Message {
    Message::new(
        Verb::parse(verb).unwrap(),
        channel,
        if content.is_empty() {
            Content::empty()
        } else {
            Content::from_bytes(content.to_vec())
        },
    )
}

#[tokio::test]
async fn echo_roundtrip_through_the_service() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let service = RoomService::new(ServiceOptions::default(), EchoHandler { seen: seen_tx });
    service.start().unwrap();

    let (mut writer, mut reader, _handle) = attach_client(&service);

    let mut msg = text_message("MSG", 255, b"hello");
    writer.write_message(&mut msg).await.unwrap();

    let (verb, channel, len) = seen_rx.recv().await.unwrap();
    assert_eq!((verb.as_str(), channel, len), ("MSG", 255, 5));

    let mut echoed = reader.read_message().await.unwrap();
    assert_eq!(echoed.verb.as_str(), "MSG");
    assert_eq!(echoed.channel, 255);
    assert_eq!(echoed.content.bytes().await.unwrap(), b"hello");

    service.dispose().await.unwrap();
}

#[tokio::test]
async fn transmit_queue_is_fifo() {
    let (seen_tx, _seen_rx) = mpsc::unbounded_channel();
    let service = RoomService::new(ServiceOptions::default(), SinkHandler { seen: seen_tx });
    service.start().unwrap();

    let (_writer, mut reader, handle) = attach_client(&service);

    for i in 0..16i64 {
        let payload = format!("payload-{i}");
        service
            .post(&handle, text_message("SEQ", i, payload.as_bytes()))
            .unwrap();
    }

    for i in 0..16i64 {
        let mut msg = reader.read_message().await.unwrap();
        assert_eq!(msg.verb.as_str(), "SEQ");
        assert_eq!(msg.channel, i, "messages must arrive in enqueue order");
        assert_eq!(
            msg.content.bytes().await.unwrap(),
            format!("payload-{i}").as_bytes()
        );
    }

    service.dispose().await.unwrap();
}

#[tokio::test]
async fn outbox_posts_from_outside_the_handler() {
    let (seen_tx, _seen_rx) = mpsc::unbounded_channel();
    let service = RoomService::new(ServiceOptions::default(), SinkHandler { seen: seen_tx });
    service.start().unwrap();

    let (_writer, mut reader, handle) = attach_client(&service);
    let outbox = service.outbox();

    outbox.post(&handle, text_message("PING", -1, b"")).unwrap();

    let msg = reader.read_message().await.unwrap();
    assert_eq!(msg.verb.as_str(), "PING");
    assert_eq!(msg.channel, -1);

    service.dispose().await.unwrap();
}

#[tokio::test]
async fn lifecycle_use_errors_are_distinct() {
    let (seen_tx, _seen_rx) = mpsc::unbounded_channel();
    let service = RoomService::new(ServiceOptions::default(), SinkHandler { seen: seen_tx });

    // Not started yet.
    let (client, server) = tokio::io::duplex(1024);
    let (server_read, server_write) = stream::split(server);
    assert_eq!(
        service
            .attach(server_read, server_write, StreamOptions::default())
            .unwrap_err(),
        ServiceError::NotRunning
    );
    assert_eq!(service.stop().unwrap_err(), ServiceError::NotRunning);
    drop(client);

    service.start().unwrap();
    assert_eq!(service.start().unwrap_err(), ServiceError::AlreadyRunning);

    let (_writer, _reader, handle) = attach_client(&service);
    service.stop().unwrap();
    assert_eq!(
        service
            .post(&handle, text_message("MSG", 0, b""))
            .unwrap_err(),
        ServiceError::NotRunning
    );

    service.dispose().await.unwrap();
    assert_eq!(service.start().unwrap_err(), ServiceError::Disposed);
    assert_eq!(service.stop().unwrap_err(), ServiceError::Disposed);
    assert_eq!(
        service
            .post(&handle, text_message("MSG", 0, b""))
            .unwrap_err(),
        ServiceError::Disposed
    );
    assert_eq!(service.dispose().await.unwrap_err(), ServiceError::Disposed);
}

#[tokio::test]
async fn service_restarts_after_stop() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let service = RoomService::new(ServiceOptions::default(), SinkHandler { seen: seen_tx });

    service.start().unwrap();
    service.stop().unwrap();
    service.start().unwrap();

    let (mut writer, _reader, _handle) = attach_client(&service);
    let mut msg = text_message("AGAIN", 7, b"second run");
    writer.write_message(&mut msg).await.unwrap();

    let (verb, bytes) = seen_rx.recv().await.unwrap();
    assert_eq!(verb, "AGAIN");
    assert_eq!(bytes, b"second run");

    service.dispose().await.unwrap();
}

#[tokio::test]
async fn one_broken_stream_does_not_stop_the_others() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let service = RoomService::new(ServiceOptions::default(), SinkHandler { seen: seen_tx });
    service.start().unwrap();

    let (mut writer_a, _reader_a, _handle_a) = attach_client(&service);
    let (writer_b, _reader_b, _handle_b) = attach_client(&service);

    // Kill stream B mid-frame: raw bytes of a torn message, then EOF.
    {
        let mut transport = writer_b.into_inner();
        use room_transport::TransportWrite;
        let n = transport.write(b"MSG +0 5 xy").await.unwrap();
        assert!(n > 0);
        transport.shutdown().await.unwrap();
    }

    // Stream A keeps flowing.
    let mut msg = text_message("ALIVE", 1, b"ok");
    writer_a.write_message(&mut msg).await.unwrap();
    let (verb, bytes) = seen_rx.recv().await.unwrap();
    assert_eq!(verb, "ALIVE");
    assert_eq!(bytes, b"ok");

    service.dispose().await.unwrap();
}

#[tokio::test]
async fn closing_a_stream_handle_ends_its_pump() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let service = RoomService::new(ServiceOptions::default(), SinkHandler { seen: seen_tx });
    service.start().unwrap();

    let (mut writer, _reader, handle) = attach_client(&service);
    assert!(handle.is_alive());
    handle.close();
    assert!(!handle.is_alive());

    // Give the pump a beat to observe the cancellation, then write.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let mut msg = text_message("LATE", 0, b"x");
    let _ = writer.write_message(&mut msg).await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(seen_rx.try_recv().is_err());

    service.dispose().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn ingress_rate_cap_throttles_a_flood() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let service = RoomService::new(
        ServiceOptions {
            max_stream_rate: 8,
        },
        SinkHandler { seen: seen_tx },
    );
    service.start().unwrap();

    let (mut writer, _reader, _handle) = attach_client(&service);

    let started = tokio::time::Instant::now();
    // Two 16-byte payloads against an 8 B/s cap: each triggers a
    // 16/8 = 2 s throttle sleep before dispatch of the next read.
    for i in 0..2i64 {
        let mut msg = text_message("FLOOD", i, &[0x55u8; 16]);
        writer.write_message(&mut msg).await.unwrap();
    }

    for _ in 0..2 {
        let (verb, bytes) = seen_rx.recv().await.unwrap();
        assert_eq!(verb, "FLOOD");
        assert_eq!(bytes.len(), 16);
    }

    // The limiter must have slept at least once per over-cap window; with
    // the paused clock this is deterministic.
    assert!(
        started.elapsed() >= Duration::from_secs(4),
        "expected throttling, elapsed {:?}",
        started.elapsed()
    );

    service.dispose().await.unwrap();
}

/// Routing-style handler: rewrites the verb before the codec write.
struct StampHandler;

impl RoomHandler for StampHandler {
    fn on_receive(
        &self,
        outbox: Outbox,
        stream: StreamHandle,
        message: Message,
    ) -> HandlerFuture<'_> {
        Box::pin(async move {
            let _ = outbox.post(&stream, message);
        })
    }

    fn on_send(&self, mut message: Message) -> Message {
        message.verb = Verb::parse("STAMPED").unwrap();
        message
    }
}

#[tokio::test]
async fn on_send_transforms_before_the_wire() {
    let service = RoomService::new(ServiceOptions::default(), StampHandler);
    service.start().unwrap();

    let (mut writer, mut reader, _handle) = attach_client(&service);
    let mut msg = text_message("ORIG", 3, b"data");
    writer.write_message(&mut msg).await.unwrap();

    let mut echoed = reader.read_message().await.unwrap();
    assert_eq!(echoed.verb.as_str(), "STAMPED");
    assert_eq!(echoed.channel, 3);
    assert_eq!(echoed.content.bytes().await.unwrap(), b"data");

    service.dispose().await.unwrap();
}
