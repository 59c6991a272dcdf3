use crate::cmd::{connect, AckOutput, ReportArgs};
use crate::exit::{peer_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: ReportArgs, format: OutputFormat) -> CliResult<i32> {
    let mut controller = connect(&args.connect)?;
    controller
        .report_position(args.x, args.y)
        .map_err(|err| peer_error("position report failed", err))?;

    AckOutput::new("report", &args.connect.addr)
        .at(args.x, args.y)
        .print(format);
    Ok(SUCCESS)
}
