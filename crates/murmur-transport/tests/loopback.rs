//! Two QUIC hosts talking over loopback.

use std::{sync::Arc, time::Duration};

use murmur_core::{
    CHAT_PROTOCOL, HandlerRegistry, Host, HostError, Line, PeerId, ProtocolTag, RawStream,
    Transcript, Ttl,
};
use murmur_transport::{HostConfig, Identity, QuicHost};
use tokio::{sync::mpsc, time::timeout};

const STEP: Duration = Duration::from_secs(5);

fn loopback_config() -> HostConfig {
    HostConfig { listen_addr: "127.0.0.1:0".parse().unwrap(), ..HostConfig::default() }
}

/// Listener whose chat handler forwards accepted streams to the test.
fn listener() -> (QuicHost, mpsc::UnboundedReceiver<RawStream>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handlers = Arc::new(HandlerRegistry::new());
    handlers.set(
        CHAT_PROTOCOL,
        Arc::new(move |stream: RawStream| {
            let _ = tx.send(stream);
        }),
    );

    let identity = Identity::generate().unwrap();
    let host = QuicHost::listen(&loopback_config(), &identity, handlers).unwrap();
    (host, rx)
}

fn dialer() -> QuicHost {
    let identity = Identity::generate().unwrap();
    QuicHost::listen(&loopback_config(), &identity, Arc::new(HandlerRegistry::new())).unwrap()
}

#[tokio::test]
async fn hosts_exchange_lines_both_ways() {
    let (listener, mut accepted) = listener();
    let dialer = dialer();

    let addr = listener.listen_addresses()[0];
    assert_ne!(addr.port(), 0);
    dialer.directory().register(listener.peer_id(), [addr], Ttl::Permanent);

    let stream = timeout(STEP, dialer.open_stream(listener.peer_id(), &CHAT_PROTOCOL))
        .await
        .unwrap()
        .unwrap();
    let (mut dial_reader, mut dial_writer) = Transcript::new(stream).split();

    dial_writer.write_line("hello").await.unwrap();

    let inbound = timeout(STEP, accepted.recv()).await.unwrap().unwrap();
    let (mut listen_reader, mut listen_writer) = Transcript::new(inbound).split();

    let line = timeout(STEP, listen_reader.next_line()).await.unwrap();
    assert_eq!(line, Some(Line::Text("hello".to_string())));

    listen_writer.write_line("hi").await.unwrap();
    let line = timeout(STEP, dial_reader.next_line()).await.unwrap();
    assert_eq!(line, Some(Line::Text("hi".to_string())));

    dial_writer.close().await.unwrap();
    let line = timeout(STEP, listen_reader.next_line()).await.unwrap();
    assert_eq!(line, None);

    dialer.close().await;
    listener.close().await;
}

#[tokio::test]
async fn wrong_peer_id_fails_handshake() {
    let (listener, _accepted) = listener();
    let dialer = dialer();

    let impostor = PeerId::from_bytes([9; 32]);
    dialer.directory().register(impostor, listener.listen_addresses(), Ttl::Permanent);

    let result = timeout(STEP, dialer.open_stream(impostor, &CHAT_PROTOCOL)).await.unwrap();
    assert!(matches!(result, Err(HostError::Dial { peer, .. }) if peer == impostor));

    dialer.close().await;
    listener.close().await;
}

#[tokio::test]
async fn unsupported_protocol_is_refused() {
    let (listener, _accepted) = listener();
    let dialer = dialer();
    dialer.directory().register(
        listener.peer_id(),
        listener.listen_addresses(),
        Ttl::Permanent,
    );

    let other = ProtocolTag::from_static("/other/1.0.0");
    let result = timeout(STEP, dialer.open_stream(listener.peer_id(), &other)).await.unwrap();
    assert!(matches!(result, Err(HostError::ProtocolNotSupported(tag)) if tag == "/other/1.0.0"));

    dialer.close().await;
    listener.close().await;
}

#[tokio::test]
async fn unregistered_peer_is_unknown() {
    let dialer = dialer();
    let stranger = PeerId::from_bytes([3; 32]);

    let result = dialer.open_stream(stranger, &CHAT_PROTOCOL).await;
    assert!(matches!(result, Err(HostError::UnknownPeer(peer)) if peer == stranger));

    dialer.close().await;
}
