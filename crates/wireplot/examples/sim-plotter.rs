//! Simulated plotter with an in-process controller.
//!
//! Run with:
//!   cargo run --example sim-plotter
//!
//! The server drives simulated pins on a virtual clock, so the drawing
//! finishes instantly; the pin log shows how many pulses each reel took.

use std::sync::Arc;
use std::thread;

use wireplot::motion::sim::{SimulatedDelay, SimulatedDriver, VirtualClock};
use wireplot::motion::{MotionExecutor, PlotterConfig};
use wireplot::peer::{Controller, PlotterServer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = PlotterConfig::default();
    config.network.bind = "127.0.0.1:0".to_string();

    let clock = VirtualClock::new();
    let mut driver = SimulatedDriver::with_clock(clock.clone());
    let log = driver.log();
    let executor = Arc::new(MotionExecutor::from_driver(
        &config,
        &mut driver,
        SimulatedDelay::new(clock.clone()),
    )?);

    let mut server = PlotterServer::bind(config.network.bind.as_str(), Arc::clone(&executor))?;
    let addr = server.local_addr();
    let shutdown = server.shutdown_handle();
    eprintln!("Plotter listening on {addr}");

    let pattern = executor.kinematics().test_pattern(50.0);
    let controller = thread::spawn(move || -> Result<usize, wireplot::peer::PeerError> {
        let mut controller = Controller::connect(addr)?;
        controller.pen(true)?;
        let sent = controller.send_path(&pattern)?;
        controller.pen(false)?;
        controller.shutdown()?;
        Ok(sent)
    });

    let summary = server.serve_one()?;
    let sent = controller
        .join()
        .map_err(|_| "controller thread panicked")??;
    shutdown.shutdown();

    eprintln!(
        "Session with {:?} ended ({:?}) after {} messages",
        summary.peer, summary.end, summary.messages
    );
    eprintln!("Drew {sent} waypoints in {:?} of virtual time", clock.now());
    for (side, pins) in [("left", &config.left), ("right", &config.right)] {
        eprintln!(
            "{side}: {} pulses",
            log.rising_edges(pins.step_pin).len()
        );
    }
    eprintln!("Final step counters: {:?}", executor.step_positions());

    executor.cleanup()?;
    Ok(())
}
