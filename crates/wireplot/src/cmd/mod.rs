use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;
use wireplot_frame::MessageConfig;
use wireplot_motion::PlotterConfig;
use wireplot_peer::Controller;

use crate::exit::{config_error, peer_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod goto;
pub mod path;
pub mod pattern;
pub mod pen;
pub mod plan;
pub mod report;
pub mod serve;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the plotter: accept a controller and execute its moves.
    Serve(ServeArgs),
    /// Move the marker to a point.
    Goto(GotoArgs),
    /// Raise or lower the pen.
    Pen(PenArgs),
    /// Tell the plotter where the marker currently is.
    Report(ReportArgs),
    /// Send a JSON waypoint file.
    Path(PathArgs),
    /// Draw the calibration rectangle and diagonals.
    Pattern(PatternArgs),
    /// Show wire lengths, step counts and speeds for a move without hardware.
    Plan(PlanArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Serve(args) => serve::run(args, format),
        Command::Goto(args) => goto::run(args, format),
        Command::Pen(args) => pen::run(args, format),
        Command::Report(args) => report::run(args, format),
        Command::Path(args) => path::run(args, format),
        Command::Pattern(args) => pattern::run(args, format),
        Command::Plan(args) => plan::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Plotter config file (TOML). Defaults apply when omitted.
    #[arg(long, short = 'c', value_name = "FILE", env = "WIREPLOT_CONFIG")]
    pub config: Option<PathBuf>,
    /// Listen address; overrides `network.bind`.
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,
    /// Advance a virtual clock instead of sleeping between pulses.
    #[arg(long)]
    pub dry_run: bool,
    /// Print the effective config as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

/// Connection options shared by controller-side commands.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Plotter address (host:port).
    pub addr: String,
    /// Connection timeout (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct GotoArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Target x in millimeters.
    #[arg(allow_negative_numbers = true)]
    pub x: f64,
    /// Target y in millimeters.
    #[arg(allow_negative_numbers = true)]
    pub y: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PenState {
    Up,
    Down,
}

impl PenState {
    pub fn is_down(self) -> bool {
        self == PenState::Down
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PenState::Up => "up",
            PenState::Down => "down",
        }
    }
}

#[derive(Args, Debug)]
pub struct PenArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    pub state: PenState,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Actual x in millimeters.
    #[arg(allow_negative_numbers = true)]
    pub x: f64,
    /// Actual y in millimeters.
    #[arg(allow_negative_numbers = true)]
    pub y: f64,
}

#[derive(Args, Debug)]
pub struct PathArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// JSON file: `[{"x": .., "y": ..}, ...]` or `[[x, y], ...]`.
    pub file: PathBuf,
}

#[derive(Args, Debug)]
pub struct PatternArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Plotter config file, for the board size.
    #[arg(long, short = 'c', value_name = "FILE", env = "WIREPLOT_CONFIG")]
    pub config: Option<PathBuf>,
    /// Inset from the board edges, in millimeters.
    #[arg(long, default_value_t = 50.0)]
    pub margin: f64,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Plotter config file (TOML).
    #[arg(long, short = 'c', value_name = "FILE", env = "WIREPLOT_CONFIG")]
    pub config: Option<PathBuf>,
    /// Target x in millimeters.
    #[arg(allow_negative_numbers = true)]
    pub x: f64,
    /// Target y in millimeters.
    #[arg(allow_negative_numbers = true)]
    pub y: f64,
    /// Start position; defaults to the board center.
    #[arg(long, num_args = 2, value_names = ["X", "Y"], allow_negative_numbers = true)]
    pub from: Option<Vec<f64>>,
    /// Step rate of the longer-travel actuator; defaults to `motion.max_speed`.
    #[arg(long)]
    pub speed: Option<f64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Load `path`, or the defaults when no file was given.
pub fn load_config(path: Option<&Path>) -> CliResult<PlotterConfig> {
    match path {
        Some(path) => PlotterConfig::load(path)
            .map_err(|err| config_error(&format!("failed loading {}", path.display()), err)),
        None => Ok(PlotterConfig::default()),
    }
}

pub fn connect(args: &ConnectArgs) -> CliResult<Controller> {
    let timeout = parse_duration(&args.timeout)?;
    Controller::connect_with_config(args.addr.as_str(), timeout, MessageConfig::default())
        .map_err(|err| peer_error(&format!("connect to {} failed", args.addr), err))
}

/// Acknowledgement printed by the single-message commands.
#[derive(Serialize)]
pub struct AckOutput {
    pub command: &'static str,
    pub addr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pen: Option<PenState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waypoints: Option<usize>,
    pub status: &'static str,
}

impl AckOutput {
    pub fn new(command: &'static str, addr: &str) -> Self {
        Self {
            command,
            addr: addr.to_string(),
            x: None,
            y: None,
            pen: None,
            waypoints: None,
            status: "ok",
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn print(&self, format: OutputFormat) {
        let mut report = crate::output::Report::new(self)
            .row("command", self.command)
            .row("addr", &self.addr);
        if let (Some(x), Some(y)) = (self.x, self.y) {
            report = report.row("target", crate::output::coords(x, y));
        }
        if let Some(pen) = self.pen {
            report = report.row("pen", pen.as_str());
        }
        if let Some(waypoints) = self.waypoints {
            report = report.row("waypoints", waypoints);
        }
        report.row("status", self.status).print(format);
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
