use crate::cmd::{connect, AckOutput, GotoArgs};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: GotoArgs, format: OutputFormat) -> CliResult<i32> {
    let mut controller = connect(&args.connect)?;
    controller
        .goto(args.x, args.y)
        .map_err(|err| peer_error("goto failed", err))?;

    AckOutput::new("goto", &args.connect.addr)
        .at(args.x, args.y)
        .print(format);
    Ok(SUCCESS)
}
