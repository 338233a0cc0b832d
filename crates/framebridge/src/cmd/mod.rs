use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod channel_id;
pub mod inspect;
pub mod origin;
pub mod simulate;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate channel ids.
    ChannelId(ChannelIdArgs),
    /// Decode a wire message and print its fields.
    Inspect(InspectArgs),
    /// Resolve a target origin and check a declared origin against it.
    Origin(OriginArgs),
    /// Run an in-process host and embed session and print its transcript.
    Simulate(SimulateArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::ChannelId(args) => channel_id::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Origin(args) => origin::run(args, format),
        Command::Simulate(args) => simulate::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ChannelIdArgs {
    /// Prefix for generated ids.
    #[arg(long, default_value = framebridge_message::DEFAULT_CHANNEL_PREFIX)]
    pub prefix: String,
    /// Number of ids to generate.
    #[arg(long, short = 'n', default_value = "1")]
    pub count: usize,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Wire message as JSON text.
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,
    /// Read the wire message from a file. Default: stdin.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct OriginArgs {
    /// Target origin or URL; relative references resolve against --base.
    pub target: String,
    /// Location of the local document.
    #[arg(long, default_value = "https://app.example/")]
    pub base: String,
    /// Origin declared by an incoming event, checked against the target.
    #[arg(long)]
    pub check: Option<String>,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Host document location.
    #[arg(long, default_value = "https://app.example/dashboard")]
    pub host: String,
    /// Embedded document URL.
    #[arg(long, default_value = "https://widgets.example/embed")]
    pub url: String,
    /// Content height the embed reports first.
    #[arg(long, default_value = "300")]
    pub height: u32,
    /// Content height after the embed grows. Skipped when unset.
    #[arg(long)]
    pub grow_to: Option<u32>,
    /// Action requested by the host.
    #[arg(long, default_value = "ping")]
    pub action: String,
    /// JSON payload for the request.
    #[arg(long)]
    pub payload: Option<String>,
    /// Do not register a handler in the embed; the request is rejected.
    #[arg(long)]
    pub no_handler: bool,
    /// Delay before the embed's handler answers (e.g. 50ms, 1s).
    #[arg(long)]
    pub handler_delay: Option<String>,
    /// Request timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `150ms`, `2s`, `1m`, or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(input.len());
    let (number, unit) = input.split_at(split);

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: '{input}'")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        "" | "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value.saturating_mul(60))),
        other => Err(CliError::new(
            USAGE,
            format!("unsupported duration unit '{other}' (use ms, s, or m)"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("5h").is_err());
        assert!(parse_duration("-1s").is_err());
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }
}
