use serde::Serialize;
use wireplot_motion::{Kinematics, MovePlan, Point, StepCounts, WireLengths};

use crate::cmd::{load_config, PlanArgs};
use crate::exit::{motion_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{coords, OutputFormat, Report};

#[derive(Serialize)]
struct PlanOutput {
    from: Point,
    to: Point,
    in_bounds: bool,
    lengths_from: WireLengths,
    lengths_to: WireLengths,
    steps_from: StepCounts,
    steps_to: StepCounts,
    delta: StepCounts,
    speed_left: f64,
    speed_right: f64,
    duration_ms: f64,
}

pub fn run(args: PlanArgs, format: OutputFormat) -> CliResult<i32> {
    let config = load_config(args.config.as_deref())?;
    let kinematics = Kinematics::from_config(&config);
    let speed = args.speed.unwrap_or(config.motion.max_speed);

    let from = match args.from.as_deref() {
        None => kinematics.center(),
        Some(&[x, y]) => Point::new(x, y),
        Some(_) => return Err(CliError::new(USAGE, "--from takes exactly two values")),
    };
    let to = Point::new(args.x, args.y);

    for (label, point) in [("start", from), ("target", to)] {
        if !kinematics.is_in_bounds(point.x, point.y) {
            return Err(CliError::new(
                DATA_INVALID,
                format!(
                    "{label} {point} is outside the {}x{} board",
                    kinematics.width(),
                    kinematics.height()
                ),
            ));
        }
    }

    let output = plan(&kinematics, from, to, speed)
        .map_err(|err| motion_error("planning failed", err))?;

    Report::new(&output)
        .row("from", coords(from.x, from.y))
        .row("to", coords(to.x, to.y))
        .row(
            "wires_mm",
            format!(
                "{:.3}, {:.3}",
                output.lengths_to.left, output.lengths_to.right
            ),
        )
        .row(
            "steps",
            format!("{}, {}", output.steps_to.left, output.steps_to.right),
        )
        .row(
            "delta",
            format!("{}, {}", output.delta.left, output.delta.right),
        )
        .row(
            "speed_steps_per_s",
            format!("{:.1}, {:.1}", output.speed_left, output.speed_right),
        )
        .row("duration_ms", format!("{:.1}", output.duration_ms))
        .print(format);
    Ok(SUCCESS)
}

fn plan(
    kinematics: &Kinematics,
    from: Point,
    to: Point,
    speed: f64,
) -> wireplot_motion::Result<PlanOutput> {
    let delta = kinematics.delta_steps(from, to);
    let move_plan = MovePlan::new(delta, speed)?;
    Ok(PlanOutput {
        from,
        to,
        in_bounds: kinematics.is_in_bounds(to.x, to.y),
        lengths_from: kinematics.wire_lengths(from.x, from.y),
        lengths_to: kinematics.wire_lengths(to.x, to.y),
        steps_from: kinematics.steps_from_position(from.x, from.y),
        steps_to: kinematics.steps_from_position(to.x, to.y),
        delta,
        speed_left: move_plan.left.speed,
        speed_right: move_plan.right.speed,
        duration_ms: move_plan.duration().as_secs_f64() * 1_000.0,
    })
}
