use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use reolink_api::error::{EXIT_ERROR, EXIT_OK, EXIT_USAGE};
use reolink_api::{ApiError, CameraClient, ClientConfig, SnapStream, DEFAULT_USERNAME};
use reolink_watch::WatchError;
use tracing::debug;

mod commands;
mod logging;
mod output;

use logging::LoggingMode;
use output::OutputMode;

/// Invalid invocation or missing configuration
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct UsageError(pub String);

/// Command-line interface for controlling Reolink cameras
#[derive(Parser, Debug)]
#[command(name = "reolink")]
#[command(version)]
#[command(about = "Control Reolink cameras over their HTTP API")]
pub struct Cli {
    /// Camera IP or hostname
    #[arg(long, env = "REOLINK_HOST", global = true)]
    pub host: Option<String>,

    /// Login user
    #[arg(long, env = "REOLINK_USER", default_value = DEFAULT_USERNAME, global = true)]
    pub user: String,

    /// Login password
    #[arg(long, env = "REOLINK_PASS", hide_env_values = true, global = true)]
    pub password: Option<String>,

    /// Channel index (NVRs); 0 for standalone cameras
    #[arg(long, env = "REOLINK_CHANNEL", default_value_t = 0, global = true)]
    pub channel: u8,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10, global = true)]
    pub timeout: u64,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress informational output and logs
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose diagnostics on stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run any API command and print its payload as JSON
    Exec {
        /// Command name, e.g. GetIrLights
        cmd: String,

        /// Parameters as a JSON object
        #[arg(long)]
        param: Option<String>,

        /// Action field (1 also returns ranges and defaults)
        #[arg(long, default_value_t = 0)]
        action: u8,
    },

    /// Show model, firmware and identity
    Info,

    /// Show which features this camera supports
    Capabilities,

    /// Capture a JPEG snapshot
    Snap {
        /// Output file (default: snapshot_<timestamp>.jpg)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Stream to capture from: main or sub
        #[arg(long, default_value = "main")]
        stream: SnapStream,
    },

    /// Watch for motion and AI detection events until Ctrl-C
    Watch {
        /// Seconds between polls
        #[arg(long, default_value_t = 3)]
        interval: u64,

        /// Only report these event types (person, vehicle, animal, motion)
        #[arg(long)]
        filter: Option<String>,

        /// Shell command run per event; {type}, {action} and {timestamp} are substituted
        #[arg(long = "exec")]
        exec: Option<String>,
    },
}

impl Cli {
    pub fn logging_mode(&self) -> LoggingMode {
        if self.quiet {
            LoggingMode::Silent
        } else if self.verbose {
            LoggingMode::Debug
        } else {
            LoggingMode::Development
        }
    }

    pub fn output_mode(&self) -> OutputMode {
        OutputMode {
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Build the client configuration, requiring host and password
    pub fn client_config(&self) -> Result<ClientConfig> {
        let host = self
            .host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| UsageError("--host is required (or set REOLINK_HOST)".to_string()))?;
        let password = self
            .password
            .as_deref()
            .ok_or_else(|| UsageError("--password is required (or set REOLINK_PASS)".to_string()))?;
        if self.timeout == 0 {
            return Err(UsageError("--timeout must be positive".to_string()).into());
        }

        Ok(ClientConfig::new(host, password)
            .with_username(self.user.clone())
            .with_channel(self.channel)
            .with_timeout(Duration::from_secs(self.timeout)))
    }
}

/// Map an error to the process exit code
pub fn exit_code(error: &anyhow::Error) -> i32 {
    if let Some(e) = error.downcast_ref::<ApiError>() {
        e.exit_code()
    } else if let Some(e) = error.downcast_ref::<WatchError>() {
        e.exit_code()
    } else if error.downcast_ref::<UsageError>().is_some() {
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

fn run(cli: Cli) -> Result<()> {
    let out = cli.output_mode();
    let config = cli.client_config()?;
    debug!(host = %config.host, channel = config.channel, "connecting");

    let client = CameraClient::new(config);

    let result = match cli.command {
        Command::Exec { cmd, param, action } => {
            commands::exec(&client, out, &cmd, param.as_deref(), action)
        }
        Command::Info => commands::info(&client, out),
        Command::Capabilities => commands::capabilities(&client, out),
        Command::Snap { out: path, stream } => commands::snap(&client, out, path, stream),
        Command::Watch {
            interval,
            filter,
            exec,
        } => {
            if interval == 0 {
                return Err(UsageError("--interval must be positive".to_string()).into());
            }
            let filter = filter.as_deref().map(commands::parse_filter).transpose()?;
            commands::watch(
                &client,
                out,
                commands::WatchOptions {
                    interval: Duration::from_secs(interval),
                    filter,
                    exec,
                },
            )
        }
    };

    client.close();
    result
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.logging_mode()) {
        output::print_error(&e.to_string());
    }

    let code = match run(cli) {
        Ok(()) => EXIT_OK,
        Err(e) => {
            output::print_error(&format!("{:#}", e));
            exit_code(&e)
        }
    };
    std::process::exit(code);
}
