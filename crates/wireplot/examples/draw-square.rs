//! Controller that draws a square on a running plotter.
//!
//! Start a plotter first:
//!   cargo run --features cli -- serve --dry-run --bind 127.0.0.1:7878
//!
//! Then:
//!   cargo run --example draw-square -- 127.0.0.1:7878 300 200 400

use wireplot::motion::Point;
use wireplot::peer::Controller;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let addr = args.next().unwrap_or_else(|| "127.0.0.1:7878".to_string());
    let x: f64 = args.next().map_or(Ok(300.0), |v| v.parse())?;
    let y: f64 = args.next().map_or(Ok(200.0), |v| v.parse())?;
    let side: f64 = args.next().map_or(Ok(400.0), |v| v.parse())?;

    let square = [
        Point::new(x, y),
        Point::new(x + side, y),
        Point::new(x + side, y + side),
        Point::new(x, y + side),
        Point::new(x, y),
    ];

    let mut controller = Controller::connect(addr.as_str())?;
    eprintln!("Connected to {addr}");

    controller.goto(square[0].x, square[0].y)?;
    controller.pen(true)?;
    let sent = controller.send_path(&square[1..])?;
    controller.pen(false)?;
    controller.shutdown()?;

    eprintln!("Drew a {side} mm square from ({x}, {y}) with {sent} strokes");
    Ok(())
}
