//! Built-in `help` command

use async_trait::async_trait;
use tracing::debug;

use slacker_api::executor::{Executor, ExecutorError};
use slacker_api::request::CommandRequest;
use slacker_api::response::CommandResponse;

use crate::registry::{ExecutorEntry, ExecutorRegistry};

pub const HELP_IDENTIFIER: &str = "help";

const HELP_DESCRIPTION: &str = "shows the help message for all the available commands";

const NO_COMMANDS: &str = "There are no commands available at the moment.";

/// Lists registered commands and their descriptions.
///
/// With an argument, only the command whose identifier matches it
/// (case-insensitively) is shown.
pub struct HelpExecutor {
    registry: ExecutorRegistry,
}

impl HelpExecutor {
    pub fn new(registry: ExecutorRegistry) -> Self {
        Self { registry }
    }
}

fn format_entry(entry: &ExecutorEntry) -> String {
    format!("{:<10} {}", entry.identifier, entry.description)
}

/// Render the help text for `entries`, optionally filtered by `filter`
pub fn render_help(entries: &[ExecutorEntry], filter: Option<&str>) -> String {
    let lines: Vec<String> = entries
        .iter()
        .filter(|e| filter.is_none_or(|f| e.identifier.eq_ignore_ascii_case(f)))
        .map(format_entry)
        .collect();

    if !lines.is_empty() {
        return lines.join("\n");
    }

    match filter {
        Some(command) => format!("No help available for the command '{}'", command),
        None => NO_COMMANDS.to_string(),
    }
}

#[async_trait]
impl Executor for HelpExecutor {
    fn identifier(&self) -> &str {
        HELP_IDENTIFIER
    }

    fn description(&self) -> &str {
        HELP_DESCRIPTION
    }

    fn version(&self) -> &str {
        env!("CARGO_PKG_VERSION")
    }

    async fn execute(&self, request: CommandRequest) -> Result<CommandResponse, ExecutorError> {
        debug!(arguments = ?request.arguments(), "HelpExecutor::execute: called");
        let entries = self
            .registry
            .list()
            .await
            .map_err(|e| ExecutorError::failed(e.to_string()))?;

        Ok(CommandResponse::ok_with(render_help(&entries, request.arguments())))
    }
}
