// C-Gate command-interface grammar
//
// Pure line-level parsing and rendering. Nothing here touches a socket:
// the client feeds complete lines in and takes rendered command lines out.
//
// Inbound lines come in two shapes, told apart by their first byte:
//   `[17] 200 OK: //HOME/254/56/3`              response (tag or status digit)
//   `lighting on //HOME/254/56/3 #sourceunit=8` status-change event (lowercase word)

mod event;
mod request;
mod response;

pub use event::{ApplicationKind, StatusEvent};
pub use request::{Reply, Request};
pub use response::{ResponseLine, status};

use crate::error::Error;

/// One classified inbound line.
#[derive(Debug, Clone)]
pub enum Inbound {
    Response(ResponseLine),
    Event(StatusEvent),
}

/// Classify a complete line (terminator already stripped).
pub fn classify(line: &str) -> Result<Inbound, Error> {
    if looks_like_response(line) {
        return ResponseLine::parse(line).map(Inbound::Response);
    }
    match line.as_bytes().first() {
        Some(b) if b.is_ascii_lowercase() => StatusEvent::parse(line).map(Inbound::Event),
        _ => Err(Error::protocol(line, "neither a response nor a status event")),
    }
}

/// Whether a line is framed like a response, parseable or not.
pub fn looks_like_response(line: &str) -> bool {
    matches!(line.as_bytes().first(), Some(b'[' | b'0'..=b'9'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_responses_and_events() {
        assert!(matches!(
            classify("[3] 200 OK: //HOME/254/56/3"),
            Ok(Inbound::Response(_))
        ));
        assert!(matches!(
            classify("201 Service ready: Clipsal C-Gate Version: v4.5.6"),
            Ok(Inbound::Response(_))
        ));
        assert!(matches!(
            classify("lighting on //HOME/254/56/3  #sourceunit=8"),
            Ok(Inbound::Event(_))
        ));
    }

    #[test]
    fn rejects_unrecognised_lines() {
        for line in ["", "  leading space", "Lighting on //HOME/254/56/3", "# comment"] {
            assert!(
                matches!(classify(line), Err(Error::Protocol { .. })),
                "{line:?}"
            );
        }
    }

    #[test]
    fn response_framing_detection() {
        assert!(looks_like_response("[1] garbage"));
        assert!(looks_like_response("9"));
        assert!(!looks_like_response("lighting off //HOME/254/56/1"));
        assert!(!looks_like_response(""));
    }
}
