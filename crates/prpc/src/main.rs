mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "prpc", version, about = "PRPC device client and simulator")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    match cmd::run(cli.command, format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_req_with_negative_argument() {
        let cli = Cli::try_parse_from([
            "prpc",
            "req",
            "/tmp/device.sock",
            "motor/step",
            "-200",
            "yes",
            "--timeout",
            "2s",
        ])
        .expect("req args should parse");

        match cli.command {
            Command::Req(args) => {
                assert_eq!(args.identifier, "motor/step");
                assert_eq!(args.args, vec!["-200", "yes"]);
                assert_eq!(args.timeout, "2s");
            }
            other => panic!("expected req, got {other:?}"),
        }
    }

    #[test]
    fn parses_encode_notification() {
        let cli = Cli::try_parse_from(["prpc", "encode", "evt/boot", "--seq", "*"])
            .expect("encode args should parse");
        assert!(matches!(cli.command, Command::Encode(_)));
    }

    #[test]
    fn serve_requires_a_path() {
        let err = Cli::try_parse_from(["prpc", "serve"]).expect_err("path is required");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
