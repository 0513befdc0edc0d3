use std::time::Duration;

use tokio::time::timeout;

use streamhub::{LocalTransport, Subscriber, Transport, TransportConfig, Update};

const TOPIC: &str = "https://example.com/foo";

fn subscriber() -> Subscriber {
    Subscriber::new().with_topics([TOPIC.to_string()])
}

fn update(id: &str) -> Update {
    Update::new(vec![TOPIC.to_string()], "data").with_id(id)
}

#[tokio::test]
async fn every_attached_pipe_receives_a_write() {
    let transport = LocalTransport::new(TransportConfig::default());

    let mut first = transport.create_pipe(subscriber()).await.expect("pipe");
    let mut second = transport.create_pipe(subscriber()).await.expect("pipe");

    transport.write(update("1")).await.expect("write");

    for pipe in [&mut first, &mut second] {
        let received = timeout(Duration::from_secs(1), pipe.recv())
            .await
            .expect("timed out")
            .expect("pipe closed");
        assert_eq!(received.id(), "1");
    }
}

#[tokio::test]
async fn pipes_see_updates_in_write_order() {
    let transport = LocalTransport::new(TransportConfig::default());
    let mut pipe = transport.create_pipe(subscriber()).await.expect("pipe");

    for id in ["1", "2", "3"] {
        transport.write(update(id)).await.expect("write");
    }

    for expected in ["1", "2", "3"] {
        let received = timeout(Duration::from_secs(1), pipe.recv())
            .await
            .expect("timed out")
            .expect("pipe closed");
        assert_eq!(received.id(), expected);
    }
}

#[tokio::test]
async fn non_matching_updates_are_dropped_silently() {
    let transport = LocalTransport::new(TransportConfig::default());
    let mut pipe = transport.create_pipe(subscriber()).await.expect("pipe");

    transport
        .write(Update::new(vec!["https://example.com/other".into()], "x").with_id("skip"))
        .await
        .expect("write");
    transport.write(update("keep")).await.expect("write");

    let received = timeout(Duration::from_secs(1), pipe.recv())
        .await
        .expect("timed out")
        .expect("pipe closed");
    assert_eq!(received.id(), "keep");

    // The filter reject did not cost the subscriber its attachment.
    assert_eq!(transport.pipe_count().await, 1);
}

#[tokio::test]
async fn unauthorized_updates_are_dropped_silently() {
    let transport = LocalTransport::new(TransportConfig::default());
    let mut pipe = transport
        .create_pipe(subscriber().with_targets(["alice".to_string()]))
        .await
        .expect("pipe");

    transport
        .write(update("private").with_targets(["bob".to_string()]))
        .await
        .expect("write");
    transport
        .write(update("shared").with_targets(["alice".to_string(), "bob".to_string()]))
        .await
        .expect("write");

    let received = timeout(Duration::from_secs(1), pipe.recv())
        .await
        .expect("timed out")
        .expect("pipe closed");
    assert_eq!(received.id(), "shared");
}

#[tokio::test]
async fn slow_subscribers_are_evicted_after_the_handoff_budget() {
    let transport = LocalTransport::new(TransportConfig {
        buffer_size: 1,
        handoff_timeout: Some(Duration::from_millis(20)),
    });

    // The pipe is held but never read.
    let _pipe = transport.create_pipe(subscriber()).await.expect("pipe");
    assert_eq!(transport.pipe_count().await, 1);

    // Non-matching updates are rejected by the filter, not the buffers:
    // the subscriber stays attached no matter how many arrive.
    for _ in 0..4 {
        transport
            .write(Update::new(vec!["https://example.com/other".into()], "x"))
            .await
            .expect("write");
    }
    assert_eq!(transport.pipe_count().await, 1);

    // Matching updates pile up in the pipeline until a handoff times out.
    for i in 0..8 {
        transport.write(update(&i.to_string())).await.expect("write");
        if transport.pipe_count().await == 0 {
            break;
        }
    }
    assert_eq!(transport.pipe_count().await, 0);
}

#[tokio::test]
async fn close_disconnects_every_pipe() {
    let transport = LocalTransport::new(TransportConfig::default());
    let mut pipe = transport.create_pipe(subscriber()).await.expect("pipe");

    transport.close().await.expect("close");

    let err = transport.write(update("1")).await.expect_err("write after close");
    assert!(err.is_closed());
    let err = transport
        .create_pipe(subscriber())
        .await
        .err()
        .expect("create_pipe after close");
    assert!(err.is_closed());

    let closed = timeout(Duration::from_secs(1), pipe.recv())
        .await
        .expect("timed out");
    assert_eq!(closed, None);
}
