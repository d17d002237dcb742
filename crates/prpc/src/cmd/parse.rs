use prpc_frame::decode_frame;

use crate::cmd::ParseArgs;
use crate::exit::{CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: ParseArgs, format: OutputFormat) -> CliResult<i32> {
    let mut line = args.line;
    if !line.ends_with('\n') {
        line.push('\n');
    }

    let frame = decode_frame(&line)
        .map_err(|err| CliError::new(DATA_INVALID, format!("invalid frame: {err}")))?;
    print_frame(&frame, format);
    Ok(SUCCESS)
}
