//! Inbound adapter message types
//!
//! JSON-over-newline protocol. Each message is a single line of JSON followed by `\n`.

use serde::{Deserialize, Serialize};

use super::form::CommandForm;

/// Messages from a webhook relay or the CLI to the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum InboundMessage {
    /// An outgoing-webhook call to route
    Command(CommandForm),

    /// Ping to check if the server is alive
    Ping,
}

/// Responses from the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum InboundReply {
    /// Outcome of a command: HTTP-style status and optional text for the chat
    Reply {
        status: u16,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },

    /// Pong response to ping
    Pong { version: String },

    /// The message itself could not be handled
    Error { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_serialize() {
        let json = serde_json::to_string(&InboundMessage::Ping).unwrap();
        assert_eq!(json, r#"{"type":"Ping"}"#);
    }

    #[test]
    fn test_command_deserialize() {
        let json = r#"{"type":"Command","trigger_word":"slacker","text":"slacker echo hi"}"#;
        let msg: InboundMessage = serde_json::from_str(json).unwrap();

        let InboundMessage::Command(form) = msg else {
            panic!("expected Command");
        };
        assert_eq!(form.trigger_word.as_deref(), Some("slacker"));
        assert_eq!(form.text.as_deref(), Some("slacker echo hi"));
        assert_eq!(form.timestamp, None);
    }

    #[test]
    fn test_reply_serialize() {
        let reply = InboundReply::Reply {
            status: 200,
            text: Some("hi".to_string()),
        };
        assert_eq!(
            serde_json::to_string(&reply).unwrap(),
            r#"{"type":"Reply","status":200,"text":"hi"}"#
        );

        let reply = InboundReply::Reply { status: 500, text: None };
        assert_eq!(serde_json::to_string(&reply).unwrap(), r#"{"type":"Reply","status":500}"#);
    }

    #[test]
    fn test_roundtrip_all_replies() {
        let replies = vec![
            InboundReply::Reply { status: 400, text: None },
            InboundReply::Pong {
                version: "0.1.0".to_string(),
            },
            InboundReply::Error {
                message: "test error".to_string(),
            },
        ];

        for reply in replies {
            let json = serde_json::to_string(&reply).unwrap();
            let parsed: InboundReply = serde_json::from_str(&json).unwrap();
            assert_eq!(reply, parsed);
        }
    }
}
