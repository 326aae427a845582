// Integration tests for `GatewayClient` against a scripted fake gateway.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpListener;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use cgate_api::{
    ClientConfig, ConnectionState, Error, GatewayClient, NetworkAddress, ReconnectConfig,
    ZoneState,
};

const STEP: Duration = Duration::from_secs(5);

// ── Helpers ─────────────────────────────────────────────────────────

/// One accepted connection, driven line by line from the test.
struct FakeGateway {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl FakeGateway {
    async fn accept(listener: &TcpListener) -> Self {
        let (stream, _) = tokio::time::timeout(STEP, listener.accept())
            .await
            .unwrap()
            .unwrap();
        let (read, writer) = stream.into_split();
        let mut gateway = Self {
            lines: BufReader::new(read).lines(),
            writer,
        };
        gateway
            .send("201 Service ready: Clipsal C-Gate Version: v4.5.6 (build 2409)")
            .await;
        gateway
    }

    /// Read the next command, assert its text, and return its tag.
    async fn expect(&mut self, command: &str) -> u32 {
        let line = tokio::time::timeout(STEP, self.lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let (tag, rest) = line
            .strip_prefix('[')
            .and_then(|l| l.split_once("] "))
            .unwrap_or_else(|| panic!("untagged command {line:?}"));
        assert_eq!(rest, command);
        tag.parse().unwrap()
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    async fn reply(&mut self, tag: u32, text: &str) {
        self.send(&format!("[{tag}] {text}")).await;
    }
}

fn config(port: u16) -> ClientConfig {
    ClientConfig {
        response_timeout: Some(STEP),
        reconnect: ReconnectConfig {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_millis(400),
            max_retries: None,
        },
        ..ClientConfig::new("127.0.0.1", port)
    }
}

async fn setup() -> (TcpListener, GatewayClient) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let client = GatewayClient::start(config(port));
    (listener, client)
}

fn group(n: i64) -> NetworkAddress {
    NetworkAddress::group("HOME", 254, 56, n).unwrap()
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_turn_on_and_read_level() {
    let (listener, client) = setup().await;

    let gateway = async {
        let mut gw = FakeGateway::accept(&listener).await;
        let tag = gw.expect("on //HOME/254/56/3").await;
        gw.reply(tag, "200 OK: //HOME/254/56/3").await;
        let tag = gw.expect("get //HOME/254/56/3 level").await;
        gw.reply(tag, "300 //HOME/254/56/3: level=128").await;
        let tag = gw.expect("ramp //HOME/254/56/3 128 4s").await;
        gw.reply(tag, "200 OK: //HOME/254/56/3").await;
        gw
    };
    let calls = async {
        client.turn_on(&group(3)).await.unwrap();
        let brightness = client.get_brightness(&group(3)).await.unwrap();
        client
            .set_brightness(&group(3), 50, Some(Duration::from_secs(4)))
            .await
            .unwrap();
        brightness
    };

    let (_gw, brightness) = tokio::join!(gateway, calls);
    assert_eq!(brightness, 50);
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_rejected_command_keeps_connection_open() {
    let (listener, client) = setup().await;

    let gateway = async {
        let mut gw = FakeGateway::accept(&listener).await;
        let tag = gw.expect("off //HOME/254/56/200").await;
        gw.reply(tag, "401 Bad object or device ID: //HOME/254/56/200").await;
        let tag = gw.expect("noop").await;
        gw.reply(tag, "200 OK.").await;
        gw
    };
    let calls = async {
        let rejected = client.turn_off(&group(200)).await.unwrap_err();
        client.noop().await.unwrap();
        rejected
    };

    let (_gw, rejected) = tokio::join!(gateway, calls);
    assert!(
        matches!(rejected, Error::Rejected { code: 401, .. }),
        "{rejected:?}"
    );
}

#[tokio::test]
async fn test_snapshot_xml_is_reassembled() {
    let (listener, client) = setup().await;
    let network = NetworkAddress::network("HOME", 254).unwrap();

    let gateway = async {
        let mut gw = FakeGateway::accept(&listener).await;
        let tag = gw.expect("dbgetxml //HOME/254").await;
        gw.reply(tag, "343-Begin XML snippet").await;
        gw.reply(tag, "347-<Network>").await;
        // An event may interleave with a multi-line response.
        gw.send("lighting off //HOME/254/56/1  #sourceunit=3").await;
        gw.reply(tag, "347-<TagName>Ground</TagName>").await;
        gw.reply(tag, "347-</Network>").await;
        gw.reply(tag, "344 End XML snippet").await;
        gw
    };

    let (_gw, xml) = tokio::join!(gateway, client.get_snapshot_xml(&network));
    assert_eq!(
        xml.unwrap(),
        "<Network>\n<TagName>Ground</TagName>\n</Network>"
    );
}

#[tokio::test]
async fn test_zone_state_and_actions() {
    let (listener, client) = setup().await;
    let zone = NetworkAddress::group("HOME", 254, 208, 4).unwrap();
    let trigger = NetworkAddress::group("HOME", 254, 202, 1).unwrap();

    let gateway = async {
        let mut gw = FakeGateway::accept(&listener).await;
        let tag = gw.expect("get //HOME/254/208/4 level").await;
        gw.reply(tag, "300 //HOME/254/208/4: level=1").await;
        let tag = gw.expect("trigger event //HOME/254/202/1 7").await;
        gw.reply(tag, "200 OK: //HOME/254/202/1").await;
        let tag = gw.expect("enable set //HOME/254/202/1 255").await;
        gw.reply(tag, "200 OK: //HOME/254/202/1").await;
        gw
    };
    let calls = async {
        let state = client.get_zone_state(&zone).await.unwrap();
        client.trigger_action(&trigger, 7).await.unwrap();
        client.enable_set(&trigger, 255).await.unwrap();
        state
    };

    let (_gw, state) = tokio::join!(gateway, calls);
    assert_eq!(state, ZoneState::Unsealed);
}

#[tokio::test]
async fn test_invalid_target_is_rejected_before_sending() {
    let (_listener, client) = setup().await;
    let network = NetworkAddress::network("HOME", 254).unwrap();

    let err = client.turn_on(&network).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTarget { .. }), "{err:?}");
    client.stop().await;
}

// ── Events ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_events_reach_subscribers() {
    let (listener, client) = setup().await;
    let mut sub = client.subscribe(&group(3));
    let mut all = client.events();

    let mut gw = FakeGateway::accept(&listener).await;
    gw.send("lighting on //HOME/254/56/9  #sourceunit=8").await;
    gw.send("lighting ramp //HOME/254/56/3 128 4  #sourceunit=12 OID=ab")
        .await;

    let event = tokio::time::timeout(STEP, sub.recv()).await.unwrap().unwrap();
    assert_eq!(event.address, group(3));
    assert_eq!(event.level(), Some(128));
    assert_eq!(event.ramp_time(), Some(Duration::from_secs(4)));
    assert_eq!(event.source_unit, Some(12));

    let first = tokio::time::timeout(STEP, all.recv()).await.unwrap().unwrap();
    assert_eq!(first.address, group(9));
}

#[tokio::test]
async fn test_event_without_subscribers_is_dropped() {
    let (listener, client) = setup().await;

    let gateway = async {
        let mut gw = FakeGateway::accept(&listener).await;
        gw.send("lighting on //HOME/254/56/77").await;
        gw.send("this is not a protocol line").await;
        let tag = gw.expect("noop").await;
        gw.reply(tag, "200 OK.").await;
        gw
    };

    let (_gw, result) = tokio::join!(gateway, client.noop());
    result.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);
}

// ── Connection lifecycle ────────────────────────────────────────────

#[tokio::test]
async fn test_connection_drop_fails_pending_and_reconnects() {
    let (listener, client) = setup().await;
    let mut state = client.watch_state();

    let mut gw = FakeGateway::accept(&listener).await;
    client.wait_connected(STEP).await.unwrap();

    // Each command reports its group number once it completes.
    let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();
    let submit = |number: i64| {
        let client = client.clone();
        let done = done_tx.clone();
        tokio::spawn(async move {
            let result = client.turn_on(&group(number)).await;
            done.send(number).unwrap();
            result
        })
    };

    let first = submit(1);
    gw.expect("on //HOME/254/56/1").await;
    let second = submit(2);
    // Let the second command reach the client's queue.
    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(gw);

    let first = first.await.unwrap();
    let second = second.await.unwrap();
    assert!(matches!(first, Err(Error::Connection(_))), "{first:?}");
    assert!(matches!(second, Err(Error::Connection(_))), "{second:?}");
    assert_eq!(done_rx.recv().await, Some(1));
    assert_eq!(done_rx.recv().await, Some(2));
    assert_eq!(client.state(), ConnectionState::Disconnected);

    // Backoff elapses and the client starts a new attempt on its own.
    tokio::time::timeout(
        STEP,
        state.wait_for(|s| *s == ConnectionState::Connecting),
    )
    .await
    .unwrap()
    .unwrap();

    // A fresh connection carries commands again.
    let gateway = async {
        let mut gw = FakeGateway::accept(&listener).await;
        let tag = gw.expect("noop").await;
        gw.reply(tag, "200 OK.").await;
        gw
    };
    let (_gw, result) = tokio::join!(gateway, client.noop());
    result.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_stop_fails_pending_with_stopped() {
    let (listener, client) = setup().await;
    let mut gw = FakeGateway::accept(&listener).await;

    let pending = tokio::spawn({
        let client = client.clone();
        async move { client.noop().await }
    });
    gw.expect("noop").await;

    client.stop().await;
    assert!(matches!(pending.await.unwrap(), Err(Error::Stopped)));
    assert_eq!(client.state(), ConnectionState::Stopped);
    assert!(matches!(client.noop().await, Err(Error::Stopped)));

    // Idempotent.
    client.stop().await;
}

#[tokio::test]
async fn test_response_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let client = GatewayClient::start(ClientConfig {
        response_timeout: Some(Duration::from_millis(300)),
        ..config(port)
    });

    let mut gw = FakeGateway::accept(&listener).await;
    let (tag, result) = tokio::join!(gw.expect("noop"), client.noop());
    assert!(tag > 0);
    assert!(matches!(result, Err(Error::Timeout { .. })), "{result:?}");
}

#[tokio::test]
async fn test_unreachable_gateway_gives_up_after_retry_limit() {
    // Reserve a port, then free it so nothing is listening.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = GatewayClient::start(ClientConfig {
        reconnect: ReconnectConfig {
            initial_delay: Duration::from_millis(10),
            max_delay: Duration::from_millis(20),
            max_retries: Some(2),
        },
        ..config(port)
    });

    let err = client.wait_connected(STEP).await.unwrap_err();
    assert!(matches!(err, Error::Connection(_)), "{err:?}");
    assert_eq!(client.state(), ConnectionState::Failed);
    assert!(matches!(client.noop().await, Err(Error::Connection(_))));
}
