//! Driver IPC protocol types.
//!
//! Defines the JSON messages exchanged with the browser driver subprocess
//! over its stdin/stdout, one JSON object per line.
//!
//! Commands carry an `id`; the driver answers each with a reply bearing the
//! same id. Requests the rendered page wants to make surface as `request`
//! events, and the driver holds each request until it receives a verdict
//! line for that `request_id`. A driver that gets no verdict lets nothing
//! through, so a missing or crashed gate fails closed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A command sent to the driver.
///
/// Known commands: `set_viewport` (applies to the next navigation),
/// `navigate`, `current_url`, `title`, `eval`, `query`, `query_all`,
/// `screenshot`, `wait`, `close`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverCommand {
    /// Correlates the reply (monotonically increasing per session).
    pub id: u64,

    /// Command name.
    pub cmd: String,

    /// Command arguments. Null for commands that take none.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl DriverCommand {
    pub fn new(id: u64, cmd: impl Into<String>, params: Value) -> Self {
        Self {
            id,
            cmd: cmd.into(),
            params,
        }
    }
}

/// The driver's reply to one command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverReply {
    /// Matches the id of the command being answered.
    pub id: u64,

    /// Whether the command succeeded.
    pub ok: bool,

    /// Command result. Always a JSON object; `eval` wraps its result as
    /// {"value": ...}.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    /// Human-readable failure detail when `ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Machine-readable failure code when `ok` is false
    /// ("timeout" marks a navigation that exceeded its deadline).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// An asynchronous event from the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DriverEvent {
    /// The page wants to issue a request. The driver holds it until a
    /// [`RequestVerdict`] for this `request_id` arrives.
    Request { request_id: String, url: String },

    /// The driver is going away (browser crash, page closed underneath).
    Closed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// One line from the driver: either a reply or an event.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DriverMessage {
    Event(DriverEvent),
    Reply(DriverReply),
}

/// The gate's answer to a `request` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestVerdict {
    /// Matches the request_id from the event.
    pub request_id: String,

    /// Whether the driver may let the request proceed.
    pub allow: bool,

    /// If blocked: why, for the driver's own diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl RequestVerdict {
    /// Let the request through.
    pub fn allow(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            allow: true,
            reason: None,
        }
    }

    /// Abort the request with a reason.
    pub fn block(request_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            allow: false,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_command_serializes_without_null_params() {
        let cmd = DriverCommand::new(7, "title", Value::Null);
        let line = serde_json::to_string(&cmd).unwrap();
        assert_eq!(line, r#"{"id":7,"cmd":"title"}"#);
    }

    #[test]
    fn test_reply_line_parses_as_reply() {
        let line = r#"{"id":3,"ok":true,"data":{"url":"https://example.com/"}}"#;
        match serde_json::from_str::<DriverMessage>(line).unwrap() {
            DriverMessage::Reply(reply) => {
                assert_eq!(reply.id, 3);
                assert!(reply.ok);
                assert_eq!(
                    reply.data.unwrap()["url"].as_str(),
                    Some("https://example.com/")
                );
            }
            DriverMessage::Event(_) => panic!("parsed as event"),
        }
    }

    #[test]
    fn test_request_event_parses_as_event() {
        let line = r#"{"event":"request","request_id":"r-1","url":"http://10.0.0.5/x"}"#;
        match serde_json::from_str::<DriverMessage>(line).unwrap() {
            DriverMessage::Event(DriverEvent::Request { request_id, url }) => {
                assert_eq!(request_id, "r-1");
                assert_eq!(url, "http://10.0.0.5/x");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_error_reply_carries_code() {
        let line = r#"{"id":9,"ok":false,"error":"Navigation timeout of 30000 ms exceeded","code":"timeout"}"#;
        match serde_json::from_str::<DriverMessage>(line).unwrap() {
            DriverMessage::Reply(reply) => {
                assert!(!reply.ok);
                assert_eq!(reply.code.as_deref(), Some("timeout"));
            }
            DriverMessage::Event(_) => panic!("parsed as event"),
        }
    }

    #[test]
    fn test_verdict_wire_shape() {
        let allow = RequestVerdict::allow("r-1");
        assert_eq!(
            serde_json::to_string(&allow).unwrap(),
            r#"{"request_id":"r-1","allow":true}"#
        );

        let block = RequestVerdict::block("r-2", "Blocked non-public IP: 10.0.0.5");
        let json: Value = serde_json::from_str(&serde_json::to_string(&block).unwrap()).unwrap();
        assert_eq!(json, json!({
            "request_id": "r-2",
            "allow": false,
            "reason": "Blocked non-public IP: 10.0.0.5",
        }));
    }
}
