//! Webhook form fields to command request

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use slacker_api::request::{CommandRequest, ValidationError};

/// Width of the seconds part of a webhook timestamp
const SECONDS_DIGITS: usize = 10;

/// Maximum digits in the fractional part (nanosecond precision)
const MAX_FRACTION_DIGITS: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("required request field is missing: {0}")]
    MissingField(&'static str),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Fields posted by a chat outgoing webhook.
///
/// Every field is required; absent ones are reported by [`CommandForm::into_request`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandForm {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_word: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, FormError> {
    value.as_deref().ok_or(FormError::MissingField(field))
}

impl CommandForm {
    /// Build the command request this webhook call describes
    pub fn into_request(self) -> Result<CommandRequest, FormError> {
        let timestamp = parse_timestamp(required(&self.timestamp, "timestamp")?)?;
        let trigger = required(&self.trigger_word, "trigger_word")?;
        let text = required(&self.text, "text")?;
        let (command, arguments) = split_command(trigger, text);

        let request = CommandRequest::builder()
            .timestamp(timestamp)
            .team_id(required(&self.team_id, "team_id")?)
            .team_domain(required(&self.team_domain, "team_domain")?)
            .channel_id(required(&self.channel_id, "channel_id")?)
            .channel_name(required(&self.channel_name, "channel_name")?)
            .user_id(required(&self.user_id, "user_id")?)
            .user_name(required(&self.user_name, "user_name")?)
            .command(command)
            .arguments(arguments.unwrap_or_default())
            .build()?;
        Ok(request)
    }
}

/// Parse a webhook timestamp: ten digits of epoch seconds, a dot, and up to
/// nine fraction digits
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, FormError> {
    let invalid = || FormError::InvalidTimestamp(raw.to_string());

    let (seconds, fraction) = raw.split_once('.').ok_or_else(invalid)?;
    if seconds.len() != SECONDS_DIGITS || !seconds.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if fraction.len() > MAX_FRACTION_DIGITS || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let seconds: i64 = seconds.parse().map_err(|_| invalid())?;
    let nanos: u32 = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{:0<width$}", fraction, width = MAX_FRACTION_DIGITS);
        padded.parse().map_err(|_| invalid())?
    };

    DateTime::from_timestamp(seconds, nanos).ok_or_else(invalid)
}

/// Remove the first occurrence of `trigger` from `text` and split what is left
/// into the command and its arguments at the first whitespace
pub fn split_command(trigger: &str, text: &str) -> (String, Option<String>) {
    let remainder = if trigger.is_empty() {
        text.to_string()
    } else {
        text.replacen(trigger, "", 1)
    };
    let remainder = remainder.trim_start();

    match remainder.split_once(char::is_whitespace) {
        Some((command, arguments)) => (command.to_string(), Some(arguments.to_string())),
        None => (remainder.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn form(text: &str) -> CommandForm {
        CommandForm {
            timestamp: Some("1355517523.000005".to_string()),
            team_id: Some("T0001".to_string()),
            team_domain: Some("example".to_string()),
            channel_id: Some("C2147483705".to_string()),
            channel_name: Some("test".to_string()),
            user_id: Some("U2147483697".to_string()),
            user_name: Some("Steve".to_string()),
            trigger_word: Some("slacker".to_string()),
            text: Some(text.to_string()),
        }
    }

    #[test]
    fn test_parse_timestamp() {
        let ts = parse_timestamp("1355517523.000005").unwrap();
        assert_eq!(ts.timestamp(), 1_355_517_523);
        assert_eq!(ts.nanosecond(), 5_000);

        let ts = parse_timestamp("1355517523.5").unwrap();
        assert_eq!(ts.nanosecond(), 500_000_000);

        let ts = parse_timestamp("1355517523.").unwrap();
        assert_eq!(ts.nanosecond(), 0);
    }

    #[test]
    fn test_parse_timestamp_rejects_bad_input() {
        for raw in ["", "1355517523", "135551752.1", "13555175231.1", "1355517523.1234567890", "abcdefghij.1", "1355517523.-1"] {
            assert!(parse_timestamp(raw).is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn test_split_command() {
        assert_eq!(
            split_command("slacker", "slacker echo hello world"),
            ("echo".to_string(), Some("hello world".to_string()))
        );
        assert_eq!(split_command("slacker:", "slacker:help"), ("help".to_string(), None));
        assert_eq!(split_command("!", "!echo"), ("echo".to_string(), None));
    }

    #[test]
    fn test_split_command_only_first_trigger_removed() {
        assert_eq!(
            split_command("go", "go echo go"),
            ("echo".to_string(), Some("go".to_string()))
        );
    }

    #[test]
    fn test_into_request() {
        let request = form("slacker echo hi there").into_request().unwrap();

        assert_eq!(request.command(), "echo");
        assert_eq!(request.arguments(), Some("hi there"));
        assert_eq!(request.user_name(), "Steve");
        assert_eq!(request.timestamp().timestamp(), 1_355_517_523);
    }

    #[test]
    fn test_into_request_trailing_space_means_no_arguments() {
        let request = form("slacker help ").into_request().unwrap();
        assert_eq!(request.command(), "help");
        assert_eq!(request.arguments(), None);
    }

    #[test]
    fn test_into_request_missing_field() {
        let mut form = form("slacker echo");
        form.user_id = None;

        assert_eq!(form.into_request(), Err(FormError::MissingField("user_id")));
    }

    #[test]
    fn test_into_request_empty_command() {
        let err = form("slacker").into_request().unwrap_err();
        assert!(matches!(err, FormError::Validation(_)));
    }

    #[test]
    fn test_form_deserializes_webhook_json() {
        let json = r#"{"timestamp":"1355517523.000005","team_id":"T1","text":"slacker echo"}"#;
        let form: CommandForm = serde_json::from_str(json).unwrap();

        assert_eq!(form.team_id.as_deref(), Some("T1"));
        assert_eq!(form.channel_id, None);
    }
}
