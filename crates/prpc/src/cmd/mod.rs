use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use prpc_frame::{parse_arg, Arg};
use prpc_handler::DEFAULT_MAX_REQS;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod encode;
pub mod parse;
pub mod req;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Decode one wire line and print the frame.
    Parse(ParseArgs),
    /// Build a frame from arguments and print it.
    Encode(EncodeArgs),
    /// Send one request to a device and print the reply.
    Req(ReqArgs),
    /// Run a simulated device on a Unix socket.
    Serve(ServeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Parse(args) => parse::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Req(args) => req::run(args, format),
        Command::Serve(args) => serve::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// The line to decode. A missing trailing newline is added.
    pub line: String,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Command identifier (e.g. gpio/led/set).
    pub identifier: String,
    /// Arguments: yes/no, integers, floats, "quoted strings"; other words
    /// are sent as strings.
    #[arg(allow_negative_numbers = true)]
    pub args: Vec<String>,
    /// Sequence id, or * for a notification.
    #[arg(long, default_value = "0")]
    pub seq: String,
}

#[derive(Args, Debug)]
pub struct ReqArgs {
    /// Device address: a Unix socket path, unix://PATH or tcp://HOST:PORT.
    pub addr: String,
    /// Command identifier.
    pub identifier: String,
    /// Arguments, as for `encode`.
    #[arg(allow_negative_numbers = true)]
    pub args: Vec<String>,
    /// How long to wait for the reply (e.g. 5s, 500ms).
    #[arg(long, env = "PRPC_TIMEOUT", default_value = "5s")]
    pub timeout: String,
    /// Sequence-id pool size.
    #[arg(long, env = "PRPC_MAX_REQS", default_value_t = DEFAULT_MAX_REQS)]
    pub max_reqs: u32,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Socket path to bind.
    pub path: PathBuf,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Turn command-line tokens into frame arguments. Tokens that are not
/// valid argument syntax become plain strings.
pub(crate) fn parse_arg_tokens(tokens: &[String]) -> Vec<Arg> {
    tokens
        .iter()
        .map(|token| parse_arg(token).unwrap_or_else(|_| Arg::Str(token.clone())))
        .collect()
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(match unit {
        "ms" => Duration::from_millis(value),
        _ => Duration::from_secs(value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn tokens_follow_argument_grammar() {
        let args = parse_arg_tokens(&tokens(&["yes", "-4", "2.0", "\"two words\"", "plain"]));
        assert_eq!(
            args,
            vec![
                Arg::Bool(true),
                Arg::Int(-4),
                Arg::Float(2.0),
                Arg::Str("two words".into()),
                Arg::Str("plain".into()),
            ]
        );
    }

    #[test]
    fn durations() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("7").unwrap(), Duration::from_secs(7));
        assert_eq!(parse_duration("0s").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("soon").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("").unwrap_err().code, USAGE);
    }
}
