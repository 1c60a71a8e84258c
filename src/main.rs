//! Slacker - command-line entry point

use std::fs;

use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::info;

use slacker::cli::{Cli, Command, SendArgs, get_log_path};
use slacker::config::Config;
use slacker::ipc::{InboundClient, InboundReply};
use slacker::server::SlackerServer;

fn setup_logging(verbose: bool) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Write to the log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Serve => serve(&config).await,
        Command::Send(args) => send(&config, &args).await,
        Command::Ping => ping(&config).await,
    }
}

async fn serve(config: &Config) -> Result<()> {
    let server = SlackerServer::start(config).await?;
    println!(
        "{} slacker listening on {}",
        "✓".green(),
        server.socket_path().display().to_string().cyan()
    );

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl-C")?;
    info!("Ctrl-C received, shutting down");
    println!("Shutting down...");

    server.shutdown().await
}

async fn send(config: &Config, args: &SendArgs) -> Result<()> {
    let reply = InboundClient::from_config(config)
        .send_form(args.to_form(Utc::now()))
        .await
        .context("Failed to reach slacker server")?;

    match reply {
        InboundReply::Reply { status, text } => {
            let status_text = status.to_string();
            let status_text = if status < 300 {
                status_text.green()
            } else if status < 500 {
                status_text.yellow()
            } else {
                status_text.red()
            };
            println!("{} {}", status_text, text.unwrap_or_default());
            if status >= 400 {
                std::process::exit(1);
            }
            Ok(())
        }
        InboundReply::Error { message } => Err(eyre::eyre!("Server error: {}", message)),
        other => Err(eyre::eyre!("Unexpected response: {:?}", other)),
    }
}

async fn ping(config: &Config) -> Result<()> {
    let client = InboundClient::from_config(config);
    match client.ping().await {
        Ok(version) => {
            println!("{} slacker {} is running", "✓".green(), version);
            Ok(())
        }
        Err(e) => {
            println!(
                "{} no slacker server at {}",
                "✗".red(),
                client.socket_path().display()
            );
            Err(e)
        }
    }
}
