use bytes::Bytes;
use futures::StreamExt;
use moleculer_fabric::{
    channel::Channel,
    codec::{Codec, JsonCodec},
    error::Error,
    transport::{MemoryBus, NatsTransport, Transport},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct TestMessage {
    id: u32,
    data: String,
}

/// Helper to await the next payload without hanging the test
async fn next_payload(subscription: &mut moleculer_fabric::Subscription) -> Option<Bytes> {
    timeout(Duration::from_secs(1), subscription.next())
        .await
        .expect("timed out waiting for payload")
}

#[tokio::test]
async fn memory_publish_reaches_subscriber() {
    let bus = MemoryBus::new();
    let publisher = bus.connect();
    let subscriber = bus.connect();

    let mut subscription = subscriber.subscribe("MOL.REQ.node-1").await.unwrap();
    publisher
        .publish("MOL.REQ.node-1", Bytes::from_static(b"hello"))
        .await
        .unwrap();

    assert_eq!(
        next_payload(&mut subscription).await.unwrap(),
        Bytes::from_static(b"hello")
    );
}

#[tokio::test]
async fn memory_multiple_messages_preserve_order() {
    let bus = MemoryBus::new();
    let transport = bus.connect();

    let mut subscription = transport.subscribe("topic").await.unwrap();
    for msg in ["first", "second", "third"] {
        transport.publish("topic", Bytes::from(msg)).await.unwrap();
    }

    for expected in ["first", "second", "third"] {
        assert_eq!(
            next_payload(&mut subscription).await.unwrap(),
            Bytes::from(expected)
        );
    }
}

#[tokio::test]
async fn memory_topics_are_isolated() {
    let bus = MemoryBus::new();
    let transport = bus.connect();

    let mut pong = transport.subscribe("MOL.PONG.api").await.unwrap();
    transport
        .publish("MOL.PONG.other", Bytes::from_static(b"not for us"))
        .await
        .unwrap();
    transport
        .publish("MOL.PONG.api", Bytes::from_static(b"for us"))
        .await
        .unwrap();

    assert_eq!(
        next_payload(&mut pong).await.unwrap(),
        Bytes::from_static(b"for us")
    );
}

#[tokio::test]
async fn memory_publish_without_subscribers_succeeds() {
    let bus = MemoryBus::new();
    let transport = bus.connect();

    transport
        .publish("MOL.EVENT.nobody", Bytes::from_static(b"{}"))
        .await
        .unwrap();

    assert_eq!(bus.published_to("MOL.EVENT.nobody").len(), 1);
    assert_eq!(bus.subscriber_count("MOL.EVENT.nobody"), 0);
}

#[tokio::test]
async fn memory_records_every_publish() {
    let bus = MemoryBus::new();
    let transport = bus.connect();

    transport.publish("a", Bytes::from_static(b"1")).await.unwrap();
    transport.publish("b", Bytes::from_static(b"2")).await.unwrap();

    let topics: Vec<_> = bus.published().into_iter().map(|(topic, _)| topic).collect();
    assert_eq!(topics, ["a", "b"]);
}

#[tokio::test]
async fn memory_closed_transport_rejects_publish() {
    let bus = MemoryBus::new();
    let transport = bus.connect();
    transport.close().await.unwrap();

    let result = transport.publish("topic", Bytes::new()).await;
    assert!(matches!(result, Err(Error::ConnectionClosed)));

    let result = transport.subscribe("topic").await;
    assert!(matches!(result, Err(Error::ConnectionClosed)));
}

#[tokio::test]
async fn memory_close_ends_subscriptions() {
    let bus = MemoryBus::new();
    let transport = bus.connect();
    let other = bus.connect();

    let mut mine = transport.subscribe("topic").await.unwrap();
    let _theirs = other.subscribe("topic").await.unwrap();
    assert_eq!(bus.subscriber_count("topic"), 2);

    transport.close().await.unwrap();

    assert!(next_payload(&mut mine).await.is_none());
    assert_eq!(bus.subscriber_count("topic"), 1);
}

#[tokio::test]
async fn channel_with_codec_roundtrip() {
    let bus = MemoryBus::new();
    let channel = Channel::from_transport(bus.connect(), JsonCodec);

    let expected = TestMessage {
        id: 42,
        data: "test data".to_string(),
    };

    let mut subscription = channel.subscribe("MOL.RES.api").await.unwrap();
    channel.publish("MOL.RES.api", &expected).await.unwrap();

    let bytes = next_payload(&mut subscription).await.unwrap();
    let received: TestMessage = channel.codec().decode(&bytes).unwrap();
    assert_eq!(received, expected);
}

#[tokio::test]
async fn channel_subscription_survives_malformed_payload() {
    let bus = MemoryBus::new();
    let raw = bus.connect();
    let channel = Channel::from_transport(bus.connect(), JsonCodec);

    let mut subscription = channel.subscribe("topic").await.unwrap();
    raw.publish("topic", Bytes::from_static(b"{broken"))
        .await
        .unwrap();
    channel
        .publish(
            "topic",
            &TestMessage {
                id: 1,
                data: "ok".to_string(),
            },
        )
        .await
        .unwrap();

    let first = next_payload(&mut subscription).await.unwrap();
    let decoded: Result<TestMessage, Error> = channel.codec().decode(&first);
    assert!(matches!(decoded, Err(Error::MalformedEnvelope(_))));

    let second = next_payload(&mut subscription).await.unwrap();
    let decoded: TestMessage = channel.codec().decode(&second).unwrap();
    assert_eq!(decoded.id, 1);
}

#[tokio::test]
async fn nats_connect_refused_is_connect_error() {
    // Nothing listens on port 1
    let result = NatsTransport::connect_timeout("nats://127.0.0.1:1", Duration::from_secs(1)).await;

    match result {
        Err(Error::Connect(msg)) => assert!(msg.contains("127.0.0.1:1")),
        Err(e) => panic!("Expected Connect error, got {:?}", e),
        Ok(_) => panic!("Expected Connect error"),
    }
}

#[tokio::test]
#[ignore = "requires a NATS server on localhost:4222"]
async fn nats_publish_subscribe() {
    let transport = NatsTransport::builder()
        .url("nats://127.0.0.1:4222")
        .name("moleculer-fabric-test")
        .connect_timeout(Duration::from_secs(5))
        .connect()
        .await
        .unwrap();

    let mut subscription = transport.subscribe("MOL.TEST.fabric").await.unwrap();
    transport
        .publish("MOL.TEST.fabric", Bytes::from_static(b"over nats"))
        .await
        .unwrap();

    assert_eq!(
        next_payload(&mut subscription).await.unwrap(),
        Bytes::from_static(b"over nats")
    );

    transport.close().await.unwrap();
}
