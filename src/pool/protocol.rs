//! Line protocol between the dispatcher and a worker process
//!
//! Each request and reply is one JSON object on its own line. Replies are
//! prefixed with [`REPLY_MARKER`] so that text a unit writes to stdout can
//! be told apart from the worker's answers.

use serde::{Deserialize, Serialize};

use crate::models::ExecutionOutcome;

/// Prefix of every reply line a worker writes
pub const REPLY_MARKER: &str = "@@tessitura@@ ";

/// Dispatcher to worker
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    /// Execute one unit by id
    Run { unit_id: String },
    /// Exit the worker loop
    Shutdown,
}

/// Worker to dispatcher
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Reply {
    /// Sent once after the worker has discovered its units
    Ready { units: usize },
    Outcome { outcome: ExecutionOutcome },
}

/// Serialize a reply into one marked line, newline included
pub fn encode_reply(reply: &Reply) -> serde_json::Result<String> {
    Ok(format!("{}{}\n", REPLY_MARKER, serde_json::to_string(reply)?))
}

/// What a worker stdout line turned out to be
#[derive(Debug)]
pub enum Line {
    /// A reply, with any unit output that preceded the marker on the line
    Reply { stray: String, reply: Reply },
    /// Unit output with no marker
    Stray(String),
    /// A marker followed by something that is not a reply
    Malformed(String),
}

pub fn decode_line(line: &str) -> Line {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(at) = line.find(REPLY_MARKER) else {
        return Line::Stray(line.to_string());
    };
    let (stray, rest) = line.split_at(at);
    match serde_json::from_str(&rest[REPLY_MARKER.len()..]) {
        Ok(reply) => Line::Reply {
            stray: stray.to_string(),
            reply,
        },
        Err(e) => Line::Malformed(format!("{e}: {line}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let json = serde_json::to_string(&Request::Run {
            unit_id: "pitch::test_middle_c".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"op":"run","unit_id":"pitch::test_middle_c"}"#);
        assert_eq!(
            serde_json::from_str::<Request>(r#"{"op":"shutdown"}"#).unwrap(),
            Request::Shutdown
        );
    }

    #[test]
    fn test_reply_after_stray_output() {
        let encoded = encode_reply(&Reply::Outcome {
            outcome: ExecutionOutcome::pass("m::test_a", 3),
        })
        .unwrap();
        let line = format!("no newline from print{encoded}");

        match decode_line(&line) {
            Line::Reply {
                stray,
                reply: Reply::Outcome { outcome },
            } => {
                assert_eq!(stray, "no newline from print");
                assert_eq!(outcome.unit_id, "m::test_a");
                assert_eq!(outcome.duration_ms, 3);
            }
            other => panic!("unexpected line: {other:?}"),
        }
    }

    #[test]
    fn test_stray_and_malformed() {
        assert!(matches!(decode_line("hello\n"), Line::Stray(s) if s == "hello"));
        assert!(matches!(
            decode_line(&format!("{REPLY_MARKER}{{not json")),
            Line::Malformed(_)
        ));
    }
}
