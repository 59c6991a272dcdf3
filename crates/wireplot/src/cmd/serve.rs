use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use serde::Serialize;
use wireplot_motion::sim::{SimulatedDelay, SimulatedDriver, VirtualClock};
use wireplot_motion::{MotionExecutor, PlotterConfig, Point, StdDelay, StepCounts};
use wireplot_peer::{PlotterServer, ShutdownHandle};

use crate::cmd::{load_config, ServeArgs};
use crate::exit::{
    config_error, motion_error, peer_error, CliError, CliResult, CONFIG_INVALID, INTERNAL,
    SUCCESS,
};
use crate::output::{coords, OutputFormat, Report};

#[derive(Serialize)]
struct ServeSummary {
    bind: String,
    dry_run: bool,
    position: Point,
    steps: StepCounts,
}

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.network.bind = bind;
    }
    config
        .validate()
        .map_err(|err| config_error("invalid config", err))?;

    if args.print_config {
        let text = config.to_toml_string().map_err(|err| {
            CliError::new(CONFIG_INVALID, format!("failed rendering config: {err}"))
        })?;
        print!("{text}");
        return Ok(SUCCESS);
    }

    if args.dry_run {
        tracing::info!("dry run: pulses advance a virtual clock");
        serve_with(&config, SimulatedDelay::new(VirtualClock::new()), true, format)
    } else {
        serve_with(&config, StdDelay, false, format)
    }
}

fn serve_with<D>(
    config: &PlotterConfig,
    delay: D,
    dry_run: bool,
    format: OutputFormat,
) -> CliResult<i32>
where
    D: DelayNs + Clone,
{
    let mut driver = SimulatedDriver::wall_clock();
    let executor = MotionExecutor::from_driver(config, &mut driver, delay)
        .map_err(|err| motion_error("actuator setup failed", err))?;
    let executor = Arc::new(executor);

    let mut server = PlotterServer::bind(config.network.bind.as_str(), Arc::clone(&executor))
        .map_err(|err| peer_error(&format!("bind {} failed", config.network.bind), err))?;
    let bound = server.local_addr();
    install_ctrlc_handler(server.shutdown_handle())?;

    let served = server.serve();

    let position = executor.position();
    let summary = ServeSummary {
        bind: bound.to_string(),
        dry_run,
        position,
        steps: executor.step_positions(),
    };
    served.map_err(|err| peer_error("plotter stopped", err))?;

    Report::new(&summary)
        .row("bind", &summary.bind)
        .row("dry_run", summary.dry_run)
        .row("position", coords(position.x, position.y))
        .row(
            "steps",
            format!("{}, {}", summary.steps.left, summary.steps.right),
        )
        .print(format);
    Ok(SUCCESS)
}

fn install_ctrlc_handler(handle: ShutdownHandle) -> CliResult<()> {
    ctrlc::set_handler(move || {
        handle.shutdown();
    })
    .map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
