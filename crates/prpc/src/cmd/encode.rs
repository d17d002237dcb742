use prpc_frame::{is_valid_identifier, Frame, SeqId};

use crate::cmd::{parse_arg_tokens, EncodeArgs};
use crate::exit::{frame_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let frame = build_frame(&args)?;
    // Surface encoder rejections (NaN, trailing backslash, ...) before printing.
    frame
        .encode()
        .map_err(|err| frame_error("cannot encode frame", err))?;
    print_frame(&frame, format);
    Ok(SUCCESS)
}

fn build_frame(args: &EncodeArgs) -> CliResult<Frame> {
    if !is_valid_identifier(&args.identifier) {
        return Err(CliError::new(
            USAGE,
            format!("invalid identifier '{}'", args.identifier),
        ));
    }

    let seq_id = parse_seq(&args.seq)?;
    let call_args = parse_arg_tokens(&args.args);
    let call_args = if call_args.is_empty() {
        None
    } else {
        Some(call_args)
    };
    Ok(Frame::new(seq_id, args.identifier.as_str(), call_args))
}

fn parse_seq(input: &str) -> CliResult<SeqId> {
    if input == "*" {
        return Ok(SeqId::Notification);
    }
    input
        .parse::<u32>()
        .map(SeqId::Id)
        .map_err(|_| CliError::new(USAGE, format!("invalid sequence id '{input}'")))
}
