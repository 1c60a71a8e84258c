//! CLI command definitions and subcommands

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::ipc::CommandForm;

/// Slacker - chat command router
#[derive(Parser)]
#[command(
    name = "slacker",
    about = "Routes chat webhook commands to registered executors",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/slacker/logs/slacker.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// Run the router in the foreground until Ctrl-C
    Serve,

    /// Send a command through a running server, as a webhook call would
    Send(SendArgs),

    /// Check that a server is running
    Ping,
}

/// Webhook fields for `send`
#[derive(clap::Args, Debug, Clone)]
pub struct SendArgs {
    /// Trigger word stripped from the text before the command is read
    #[arg(short, long, default_value = "slacker")]
    pub trigger: String,

    #[arg(long, default_value = "T0000")]
    pub team_id: String,

    #[arg(long, default_value = "local")]
    pub team_domain: String,

    #[arg(long, default_value = "C0000")]
    pub channel_id: String,

    #[arg(long, default_value = "cli")]
    pub channel_name: String,

    #[arg(long, default_value = "U0000")]
    pub user_id: String,

    /// Defaults to $USER
    #[arg(long)]
    pub user_name: Option<String>,

    /// Message text, e.g. `slacker help echo`
    #[arg(required = true, trailing_var_arg = true)]
    pub text: Vec<String>,
}

/// Render an instant the way chat webhooks send it
pub fn webhook_timestamp(at: DateTime<Utc>) -> String {
    format!("{}.{:06}", at.timestamp(), at.timestamp_subsec_micros())
}

impl SendArgs {
    /// Build the webhook form for this invocation
    pub fn to_form(&self, at: DateTime<Utc>) -> CommandForm {
        let user_name = self
            .user_name
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "cli".to_string());

        CommandForm {
            timestamp: Some(webhook_timestamp(at)),
            team_id: Some(self.team_id.clone()),
            team_domain: Some(self.team_domain.clone()),
            channel_id: Some(self.channel_id.clone()),
            channel_name: Some(self.channel_name.clone()),
            user_id: Some(self.user_id.clone()),
            user_name: Some(user_name),
            trigger_word: Some(self.trigger.clone()),
            text: Some(self.text.join(" ")),
        }
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slacker")
        .join("logs")
        .join("slacker.log")
}
