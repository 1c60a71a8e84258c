//! Command request model and builder

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors raised while building a [`CommandRequest`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("required request field is missing: {0}")]
    MissingField(&'static str),
}

/// A single command invocation coming from the chat webhook.
///
/// Requests are immutable once built; the only way to obtain one is through
/// [`CommandRequestBuilder`], which enforces that every mandatory field is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    timestamp: DateTime<Utc>,
    team_id: String,
    team_domain: String,
    channel_id: String,
    channel_name: String,
    user_id: String,
    user_name: String,
    command: String,
    arguments: Option<String>,
}

impl CommandRequest {
    /// Start building a new request
    pub fn builder() -> CommandRequestBuilder {
        CommandRequestBuilder::default()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn team_id(&self) -> &str {
        &self.team_id
    }

    pub fn team_domain(&self) -> &str {
        &self.team_domain
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn channel_name(&self) -> &str {
        &self.channel_name
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    /// Identifier of the executor this request targets
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Free text following the command, if any
    pub fn arguments(&self) -> Option<&str> {
        self.arguments.as_deref()
    }
}

/// Builder for [`CommandRequest`]
#[derive(Debug, Clone, Default)]
pub struct CommandRequestBuilder {
    timestamp: Option<DateTime<Utc>>,
    team_id: Option<String>,
    team_domain: Option<String>,
    channel_id: Option<String>,
    channel_name: Option<String>,
    user_id: Option<String>,
    user_name: Option<String>,
    command: Option<String>,
    arguments: Option<String>,
}

impl CommandRequestBuilder {
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn team_id(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    pub fn team_domain(mut self, team_domain: impl Into<String>) -> Self {
        self.team_domain = Some(team_domain.into());
        self
    }

    pub fn channel_id(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn channel_name(mut self, channel_name: impl Into<String>) -> Self {
        self.channel_name = Some(channel_name.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn user_name(mut self, user_name: impl Into<String>) -> Self {
        self.user_name = Some(user_name.into());
        self
    }

    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Set the arguments; an empty string means no arguments
    pub fn arguments(mut self, arguments: impl Into<String>) -> Self {
        let arguments = arguments.into();
        self.arguments = (!arguments.is_empty()).then_some(arguments);
        self
    }

    /// Build the request, failing on the first missing mandatory field
    pub fn build(self) -> Result<CommandRequest, ValidationError> {
        Ok(CommandRequest {
            timestamp: self.timestamp.ok_or(ValidationError::MissingField("timestamp"))?,
            team_id: self.team_id.ok_or(ValidationError::MissingField("team identifier"))?,
            team_domain: self.team_domain.ok_or(ValidationError::MissingField("team domain"))?,
            channel_id: self
                .channel_id
                .ok_or(ValidationError::MissingField("channel identifier"))?,
            channel_name: self.channel_name.ok_or(ValidationError::MissingField("channel name"))?,
            user_id: self.user_id.ok_or(ValidationError::MissingField("user identifier"))?,
            user_name: self.user_name.ok_or(ValidationError::MissingField("user name"))?,
            command: self
                .command
                .filter(|c| !c.is_empty())
                .ok_or(ValidationError::MissingField("command"))?,
            arguments: self.arguments,
        })
    }
}
