// ── Connection task ──
//
// Owns the socket for the lifetime of the client:
// connect → session (read/write until the link drops) → backoff → reconnect.
// Exits on cancellation, when every client handle is gone, or when the
// reconnect limit is exhausted.

use std::borrow::Cow;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Framed};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::ConnectionState;
use super::dispatch::{Dispatcher, PendingCommand};
use crate::error::Error;
use crate::transport::ClientConfig;

/// Longest inbound line accepted before it is discarded as a violation.
const MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Split on raw bytes so a line that is not valid UTF-8 never surfaces as an
/// I/O error; outbound lines are terminated with a bare LF.
fn line_codec() -> AnyDelimiterCodec {
    AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), MAX_LINE_LENGTH)
}

/// Strip the trailing CR and decode, replacing invalid UTF-8 sequences.
fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let line = String::from_utf8_lossy(raw);
    if matches!(line, Cow::Owned(_)) {
        warn!(%line, "inbound line is not valid UTF-8, decoded lossily");
    }
    line
}

/// How a single session ended.
#[derive(Debug)]
enum SessionEnd {
    /// Stop requested, or every client handle dropped.
    Closed,
    /// Transport failure, close by the peer, or a silent gateway.
    Lost(String),
}

pub(crate) struct Connection {
    config: ClientConfig,
    commands: mpsc::Receiver<PendingCommand>,
    state: watch::Sender<ConnectionState>,
    dispatcher: Dispatcher,
    cancel: CancellationToken,
}

impl Connection {
    pub(crate) fn new(
        config: ClientConfig,
        commands: mpsc::Receiver<PendingCommand>,
        state: watch::Sender<ConnectionState>,
        dispatcher: Dispatcher,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            commands,
            state,
            dispatcher,
            cancel,
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                debug!(from = %current, to = %state, "connection state");
                *current = state;
                true
            }
        });
    }

    /// Main loop: connect → session → on loss, backoff → reconnect.
    pub(crate) async fn run(mut self) {
        let endpoint = self.config.endpoint();
        let mut attempt: u32 = 0;

        let outcome = loop {
            self.set_state(ConnectionState::Connecting);
            info!(%endpoint, attempt, "connecting to gateway");

            let connected = tokio::select! {
                biased;
                () = self.cancel.cancelled() => break ConnectionState::Stopped,
                result = self.config.connect() => result,
            };

            match connected {
                Ok(stream) => {
                    attempt = 0;
                    info!(%endpoint, "connected to gateway");
                    self.set_state(ConnectionState::Connected);

                    match self.session(stream).await {
                        SessionEnd::Closed => break ConnectionState::Stopped,
                        SessionEnd::Lost(reason) => {
                            warn!(%endpoint, %reason, "gateway connection lost");
                            self.set_state(ConnectionState::Disconnected);
                            self.fail_pending(&reason);
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, attempt, "connection attempt failed");
                    self.set_state(ConnectionState::Disconnected);
                }
            }

            if let Some(max) = self.config.reconnect.max_retries {
                if attempt >= max {
                    error!(max_retries = max, "reconnection limit reached, giving up");
                    break ConnectionState::Failed;
                }
            }

            let delay = self.config.reconnect.backoff(attempt);
            info!(
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                attempt,
                "waiting before reconnect"
            );
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break ConnectionState::Stopped,
                () = tokio::time::sleep(delay) => {}
            }
            attempt = attempt.saturating_add(1);
        };

        self.shutdown(outcome);
    }

    /// Read and write one connection until it ends.
    async fn session<S>(&mut self, stream: S) -> SessionEnd
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framed = Framed::new(stream, line_codec());

        loop {
            if let Some(line) = self.dispatcher.next_outbound() {
                debug!(%line, "send");
                if let Err(e) = framed.send(line).await {
                    return SessionEnd::Lost(format!("write failed: {e}"));
                }
            }

            let deadline = self
                .dispatcher
                .in_flight_since()
                .zip(self.config.response_timeout)
                .map(|(sent, limit)| sent + limit);

            tokio::select! {
                biased;
                () = self.cancel.cancelled() => return SessionEnd::Closed,
                frame = framed.next() => match frame {
                    Some(Ok(raw)) => {
                        let line = decode_line(&raw);
                        trace!(%line, "recv");
                        self.dispatcher.handle_line(&line);
                    }
                    Some(Err(AnyDelimiterCodecError::MaxChunkLengthExceeded)) => {
                        warn!(max = MAX_LINE_LENGTH, "inbound line too long, discarded");
                        self.dispatcher.fail_in_flight(Error::protocol(
                            "",
                            format!("line longer than {MAX_LINE_LENGTH} bytes"),
                        ));
                    }
                    Some(Err(AnyDelimiterCodecError::Io(e))) => {
                        return SessionEnd::Lost(format!("read failed: {e}"));
                    }
                    None => return SessionEnd::Lost("gateway closed the connection".into()),
                },
                command = self.commands.recv() => match command {
                    Some(command) => self.dispatcher.enqueue(command),
                    None => return SessionEnd::Closed,
                },
                () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    let timeout_secs = self.config.response_timeout.map_or(0, |t| t.as_secs());
                    self.dispatcher.fail_in_flight(Error::Timeout { timeout_secs });
                    return SessionEnd::Lost(format!("no response within {timeout_secs}s"));
                }
            }
        }
    }

    /// Fail everything accepted so far, including commands still sitting in
    /// the channel, so callers see the loss in submission order.
    fn fail_pending(&mut self, reason: &str) {
        while let Ok(command) = self.commands.try_recv() {
            self.dispatcher.enqueue(command);
        }
        self.dispatcher
            .fail_all(|| Error::Connection(reason.to_owned()));
    }

    fn shutdown(mut self, outcome: ConnectionState) {
        self.set_state(outcome);
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            self.dispatcher.enqueue(command);
        }
        if outcome == ConnectionState::Failed {
            self.dispatcher.fail_all(|| {
                Error::Connection("gateway unreachable, reconnection limit reached".into())
            });
        } else {
            self.dispatcher.fail_all(|| Error::Stopped);
        }
        debug!("connection task exiting");
    }
}
