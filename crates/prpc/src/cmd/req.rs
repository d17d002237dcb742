use prpc_frame::is_valid_identifier;
use prpc_handler::{HandlerConfig, IoHandler};
use prpc_transport::PrpcStream;

use crate::cmd::{parse_arg_tokens, parse_duration, ReqArgs};
use crate::exit::{handler_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_reply, OutputFormat};

pub fn run(args: ReqArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    if !is_valid_identifier(&args.identifier) {
        return Err(CliError::new(
            USAGE,
            format!("invalid identifier '{}'", args.identifier),
        ));
    }
    let call_args = parse_arg_tokens(&args.args);

    let stream =
        PrpcStream::connect(&args.addr).map_err(|err| transport_error("connect failed", err))?;
    let config = HandlerConfig {
        max_reqs: args.max_reqs,
        ..HandlerConfig::default()
    };
    let handler =
        IoHandler::with_config(stream, config).map_err(|err| handler_error("setup failed", err))?;
    handler
        .start()
        .map_err(|err| handler_error("setup failed", err))?;

    let outcome = handler
        .req(&args.identifier, call_args)
        .and_then(|request| {
            let seq_id = request.seq_id();
            request.wait(Some(timeout)).map(|result| (seq_id, result))
        });

    if let Err(err) = handler.close() {
        tracing::warn!(error = %err, "closing connection failed");
    }

    let (seq_id, result) = outcome.map_err(|err| handler_error("request failed", err))?;
    print_reply(seq_id, &args.identifier, &result, format);
    Ok(SUCCESS)
}
