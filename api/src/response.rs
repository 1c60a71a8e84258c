//! Command response model

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome reported by an executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultCode {
    Ok,
    Invalid,
    Error,
}

impl ResultCode {
    /// Position of this code on the wire
    pub fn ordinal(self) -> u32 {
        match self {
            ResultCode::Ok => 0,
            ResultCode::Invalid => 1,
            ResultCode::Error => 2,
        }
    }

    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        match ordinal {
            0 => Some(ResultCode::Ok),
            1 => Some(ResultCode::Invalid),
            2 => Some(ResultCode::Error),
            _ => None,
        }
    }

    /// HTTP-style status presented to the webhook caller
    pub fn status(self) -> u16 {
        match self {
            ResultCode::Ok => 200,
            ResultCode::Invalid => 400,
            ResultCode::Error => 500,
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResultCode::Ok => "OK",
            ResultCode::Invalid => "INVALID",
            ResultCode::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Reply produced by an executor for a single request.
///
/// An `Ok` response without a message means the command was handled silently.
/// An empty message is the same as no message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    code: ResultCode,
    message: Option<String>,
}

impl CommandResponse {
    pub fn new(code: ResultCode, message: Option<String>) -> Self {
        Self {
            code,
            message: message.filter(|m| !m.is_empty()),
        }
    }

    /// Handled, nothing to say
    pub fn ok() -> Self {
        Self::new(ResultCode::Ok, None)
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self::new(ResultCode::Ok, Some(message.into()))
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ResultCode::Invalid, Some(message.into()))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(ResultCode::Error, Some(message.into()))
    }

    pub fn code(&self) -> ResultCode {
        self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals_roundtrip() {
        for code in [ResultCode::Ok, ResultCode::Invalid, ResultCode::Error] {
            assert_eq!(ResultCode::from_ordinal(code.ordinal()), Some(code));
        }
        assert_eq!(ResultCode::from_ordinal(3), None);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ResultCode::Ok.status(), 200);
        assert_eq!(ResultCode::Invalid.status(), 400);
        assert_eq!(ResultCode::Error.status(), 500);
    }

    #[test]
    fn test_empty_message_is_absent() {
        let response = CommandResponse::ok_with("");
        assert_eq!(response, CommandResponse::ok());
        assert!(response.message().is_none());
    }

    #[test]
    fn test_result_code_serialization() {
        let json = serde_json::to_string(&ResultCode::Invalid).unwrap();
        assert_eq!(json, r#""INVALID""#);
    }
}
