// ── Command correlation ──
//
// Owns the queue of accepted commands and the single in-flight slot. The
// connection task feeds it inbound lines and asks it for the next line to
// write; it never touches the socket itself.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::subscription::SubscriberRegistry;
use crate::error::Error;
use crate::protocol::{self, Inbound, Reply, Request, ResponseLine};

/// A command waiting for transmission or for its response.
pub(crate) struct PendingCommand {
    pub(crate) request: Request,
    pub(crate) reply: oneshot::Sender<Result<Reply, Error>>,
}

impl PendingCommand {
    /// The caller stopped waiting (its future was dropped or timed out).
    fn is_abandoned(&self) -> bool {
        self.reply.is_closed()
    }

    fn complete(self, result: Result<Reply, Error>) {
        if self.reply.send(result).is_err() {
            trace!(verb = self.request.verb(), "caller gone before completion");
        }
    }
}

struct InFlight {
    tag: u32,
    command: PendingCommand,
    lines: Vec<ResponseLine>,
    sent_at: Instant,
}

pub(crate) struct Dispatcher {
    queue: VecDeque<PendingCommand>,
    in_flight: Option<InFlight>,
    next_tag: u32,
    registry: Arc<SubscriberRegistry>,
}

impl Dispatcher {
    pub(crate) fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self {
            queue: VecDeque::new(),
            in_flight: None,
            next_tag: 1,
            registry,
        }
    }

    pub(crate) fn enqueue(&mut self, command: PendingCommand) {
        self.queue.push_back(command);
    }

    /// Claim the next command for transmission and render it.
    ///
    /// Returns `None` while a response is outstanding or nothing is queued.
    pub(crate) fn next_outbound(&mut self) -> Option<String> {
        if self.in_flight.is_some() {
            return None;
        }
        while let Some(command) = self.queue.pop_front() {
            if command.is_abandoned() {
                debug!(verb = command.request.verb(), "skipping abandoned command");
                continue;
            }
            let tag = self.allocate_tag();
            let line = command.request.render(tag);
            self.in_flight = Some(InFlight {
                tag,
                command,
                lines: Vec::new(),
                sent_at: Instant::now(),
            });
            return Some(line);
        }
        None
    }

    fn allocate_tag(&mut self) -> u32 {
        let tag = self.next_tag;
        self.next_tag = self.next_tag.checked_add(1).unwrap_or(1);
        tag
    }

    /// When the outstanding command was written, if there is one.
    pub(crate) fn in_flight_since(&self) -> Option<Instant> {
        self.in_flight.as_ref().map(|f| f.sent_at)
    }

    /// Route one complete inbound line.
    pub(crate) fn handle_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        match protocol::classify(line) {
            Ok(Inbound::Event(event)) => {
                let reached = self.registry.dispatch(event);
                trace!(reached, line, "event");
            }
            Ok(Inbound::Response(response)) => self.handle_response(response),
            // A response we cannot parse cannot be correlated either; fail
            // whatever it most likely belonged to.
            Err(err) if protocol::looks_like_response(line) => {
                warn!(error = %err, "malformed response line");
                self.fail_in_flight(err);
            }
            Err(err) => warn!(error = %err, "ignoring unrecognised line"),
        }
    }

    fn handle_response(&mut self, response: ResponseLine) {
        let Some(tag) = response.tag else {
            debug!(code = response.code, text = %response.text, "unsolicited response");
            return;
        };
        let Some(in_flight) = self.in_flight.as_mut() else {
            warn!(tag, code = response.code, "response with no command in flight");
            return;
        };
        if in_flight.tag != tag {
            warn!(
                tag,
                expected = in_flight.tag,
                code = response.code,
                "response tag does not match in-flight command, dropped"
            );
            return;
        }

        let finished = response.is_final();
        in_flight.lines.push(response);
        if !finished {
            return;
        }

        if let Some(done) = self.in_flight.take() {
            let result = done.command.request.interpret(&done.lines);
            debug!(
                tag = done.tag,
                verb = done.command.request.verb(),
                lines = done.lines.len(),
                elapsed_ms = u64::try_from(done.sent_at.elapsed().as_millis()).unwrap_or(u64::MAX),
                ok = result.is_ok(),
                "command complete"
            );
            done.command.complete(result);
        }
    }

    /// Fail the outstanding command, if any, leaving the queue intact.
    pub(crate) fn fail_in_flight(&mut self, err: Error) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.command.complete(Err(err));
        }
    }

    /// Fail every command, oldest first: the in-flight one, then the queue.
    pub(crate) fn fail_all(&mut self, make_err: impl Fn() -> Error) {
        let failed = usize::from(self.in_flight.is_some()) + self.queue.len();
        if failed > 0 {
            debug!(failed, "failing pending commands");
        }
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.command.complete(Err(make_err()));
        }
        for command in self.queue.drain(..) {
            command.complete(Err(make_err()));
        }
    }
}
