mod common;

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;

use wires::dashboard::Dashboard;
use wires::feed::{ConnectionState, LiveFeedSubscriber, SseTransport};
use wires::model::{Channel, Sample};

#[test]
fn dashboard_streams_events_from_the_backend() -> Result<()> {
    let backend = common::spawn_backend()?;
    backend.serve_snapshot();
    backend.queue_event("packet_data", json!({"timestamp": 3, "value": 30}));
    backend.queue_event("anomalies", json!({"timestamp": "2024-05-01T10:00:05", "value": 2}));

    let mut dashboard = Dashboard::connect(&backend.config())?;
    assert!(dashboard.pump_until(Duration::from_secs(10), |v| {
        !v.loading && v.packets.values == vec![10.0, 20.0, 30.0] && v.anomalies.values == vec![1.0, 2.0]
    }));

    assert!(backend.wait_for_request("/events", Duration::from_secs(5)));
    dashboard.unmount();
    Ok(())
}

/// Accepts one feed request, answers with SSE headers and a single event, then
/// keeps the socket open without sending anything else.
fn quiet_feed_peer(listener: TcpListener) -> Result<TcpStream> {
    let (mut socket, _) = listener.accept()?;
    let mut reader = BufReader::new(socket.try_clone()?);
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 || line == "\r\n" {
            break;
        }
    }
    socket.write_all(
        b"HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\ncache-control: no-cache\r\n\r\n\
          event: packets\ndata: {\"timestamp\":1,\"value\":7}\n\n",
    )?;
    socket.flush()?;
    Ok(socket)
}

#[test]
fn unsubscribe_hangs_up_a_quiet_event_stream() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    let url = format!("http://{}", listener.local_addr()?);
    let peer = thread::spawn(move || quiet_feed_peer(listener));

    let transport = SseTransport::new(&url)?;
    let mut subscriber = LiveFeedSubscriber::new(Arc::new(transport));
    let (tx, rx) = mpsc::channel();
    let status_tx = tx.clone();
    let conn = subscriber.subscribe_with_status(
        move |channel, sample| {
            let _ = tx.send(Some((channel, sample)));
        },
        move |state| {
            if state == ConnectionState::Connected {
                let _ = status_tx.send(None);
            }
        },
    )?;

    assert_eq!(rx.recv_timeout(Duration::from_secs(5))?, None);
    assert_eq!(
        rx.recv_timeout(Duration::from_secs(5))?,
        Some((Channel::Packets, Sample::new(1, 7.0)))
    );

    let mut socket = peer
        .join()
        .map_err(|_| anyhow::anyhow!("feed peer panicked"))??;
    subscriber.unsubscribe(conn);

    socket.set_read_timeout(Some(Duration::from_secs(2)))?;
    let mut buf = [0u8; 64];
    let n = socket
        .read(&mut buf)
        .context("client kept the event stream open")?;
    assert_eq!(n, 0, "expected EOF from the client side");
    Ok(())
}
