use std::path::Path;

use serde::Deserialize;
use wireplot_motion::Point;

use crate::cmd::{connect, AckOutput, PathArgs};
use crate::exit::{io_error, peer_error, CliError, CliResult, DATA_INVALID, SUCCESS};
use crate::output::OutputFormat;

/// One waypoint in either accepted shape.
#[derive(Deserialize)]
#[serde(untagged)]
enum Waypoint {
    Object { x: f64, y: f64 },
    Pair([f64; 2]),
}

impl From<Waypoint> for Point {
    fn from(waypoint: Waypoint) -> Self {
        match waypoint {
            Waypoint::Object { x, y } => Point::new(x, y),
            Waypoint::Pair([x, y]) => Point::new(x, y),
        }
    }
}

pub fn run(args: PathArgs, format: OutputFormat) -> CliResult<i32> {
    let waypoints = read_waypoints(&args.file)?;
    let mut controller = connect(&args.connect)?;
    let sent = controller
        .send_path(&waypoints)
        .map_err(|err| peer_error("path failed", err))?;

    let mut ack = AckOutput::new("path", &args.connect.addr);
    ack.waypoints = Some(sent);
    ack.print(format);
    Ok(SUCCESS)
}

fn read_waypoints(path: &Path) -> CliResult<Vec<Point>> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    parse_waypoints(&text)
        .map_err(|err| CliError::new(DATA_INVALID, format!("{}: {err}", path.display())))
}

fn parse_waypoints(text: &str) -> Result<Vec<Point>, serde_json::Error> {
    let waypoints: Vec<Waypoint> = serde_json::from_str(text)?;
    Ok(waypoints.into_iter().map(Point::from).collect())
}
