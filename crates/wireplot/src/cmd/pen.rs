use crate::cmd::{connect, AckOutput, PenArgs};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: PenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut controller = connect(&args.connect)?;
    controller
        .pen(args.state.is_down())
        .map_err(|err| peer_error("pen failed", err))?;

    let mut ack = AckOutput::new("pen", &args.connect.addr);
    ack.pen = Some(args.state);
    ack.print(format);
    Ok(SUCCESS)
}
