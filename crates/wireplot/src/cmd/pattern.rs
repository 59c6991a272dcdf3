use wireplot_motion::Kinematics;

use crate::cmd::{connect, load_config, AckOutput, PatternArgs};
use crate::exit::{peer_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::OutputFormat;

pub fn run(args: PatternArgs, format: OutputFormat) -> CliResult<i32> {
    let config = load_config(args.config.as_deref())?;
    let kinematics = Kinematics::from_config(&config);

    let max_margin = kinematics.width().min(kinematics.height()) / 2.0;
    if !(0.0..max_margin).contains(&args.margin) {
        return Err(CliError::new(
            USAGE,
            format!("--margin must be in [0, {max_margin}) for this board"),
        ));
    }

    let pattern = kinematics.test_pattern(args.margin);
    tracing::info!(margin = args.margin, waypoints = pattern.len(), "sending test pattern");

    let mut controller = connect(&args.connect)?;
    let sent = controller
        .send_path(&pattern)
        .map_err(|err| peer_error("pattern failed", err))?;

    let mut ack = AckOutput::new("pattern", &args.connect.addr);
    ack.waypoints = Some(sent);
    ack.print(format);
    Ok(SUCCESS)
}
