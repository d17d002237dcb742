use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use prpc_frame::{Arg, Frame};
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    /// The frame exactly as it goes over the wire.
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct ArgOutput {
    #[serde(rename = "type")]
    kind: &'static str,
    value: Value,
}

impl From<&Arg> for ArgOutput {
    fn from(arg: &Arg) -> Self {
        let value = match arg {
            Arg::Int(v) => Value::from(*v),
            Arg::Float(v) => Value::from(*v),
            Arg::Bool(v) => Value::from(*v),
            Arg::Str(v) => Value::from(v.as_str()),
        };
        Self {
            kind: arg.type_name(),
            value,
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    seq_id: Option<u32>,
    notification: bool,
    identifier: &'a str,
    response: Option<&'static str>,
    args: Vec<ArgOutput>,
    wire: String,
}

#[derive(Serialize)]
struct ReplyOutput<'a> {
    seq_id: u32,
    identifier: &'a str,
    result: Vec<ArgOutput>,
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    let wire = wire_line(frame);
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                seq_id: frame.seq_id.id(),
                notification: frame.is_notification(),
                identifier: &frame.identifier,
                response: frame.response_kind().map(|kind| kind.as_str()),
                args: frame.args().iter().map(ArgOutput::from).collect(),
                wire,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "IDENTIFIER", "ARGS"])
                .add_row(vec![
                    frame.seq_id.to_string(),
                    frame.identifier.clone(),
                    typed_args(frame.args()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "seq={} identifier={} args=[{}]",
                frame.seq_id,
                frame.identifier,
                typed_args(frame.args())
            );
        }
        OutputFormat::Raw => println!("{wire}"),
    }
}

pub fn print_reply(seq_id: u32, identifier: &str, result: &[Arg], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ReplyOutput {
                seq_id,
                identifier,
                result: result.iter().map(ArgOutput::from).collect(),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "TYPE", "VALUE"]);
            for (index, arg) in result.iter().enumerate() {
                table.add_row(vec![index.to_string(), arg.type_name().to_string(), arg.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("{identifier} (seq {seq_id}) -> [{}]", typed_args(result));
        }
        OutputFormat::Raw => {
            let values: Vec<String> = result.iter().map(Arg::to_string).collect();
            println!("{}", values.join(" "));
        }
    }
}

/// Wire form without the trailing newline. Frames built by the CLI are
/// validated before printing, so the fallback only covers decoded input.
fn wire_line(frame: &Frame) -> String {
    match frame.encode() {
        Ok(line) => line.trim_end_matches('\n').to_string(),
        Err(err) => format!("<unencodable: {err}>"),
    }
}

fn typed_args(args: &[Arg]) -> String {
    args.iter()
        .map(|arg| format!("{}:{arg}", arg.type_name()))
        .collect::<Vec<_>>()
        .join(", ")
}
