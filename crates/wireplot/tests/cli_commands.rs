#![cfg(all(unix, feature = "cli"))]

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/wireplot-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn free_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("ephemeral port should bind");
    listener.local_addr().expect("listener should have an address")
}

fn wait_for_listen(addr: SocketAddr, timeout: Duration) -> io::Result<()> {
    let start = Instant::now();
    loop {
        match TcpStream::connect(addr) {
            Ok(_) => return Ok(()),
            Err(err) => {
                if start.elapsed() >= timeout {
                    return Err(io::Error::other(format!("connect timeout: {err}")));
                }
                thread::sleep(Duration::from_millis(25));
            }
        }
    }
}

fn wireplot(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wireplot"))
        .args(["--log-level", "error", "--format", "json"])
        .args(args)
        .output()
        .expect("wireplot should run")
}

fn spawn_plotter(addr: SocketAddr) -> Child {
    let child = Command::new(env!("CARGO_BIN_EXE_wireplot"))
        .args(["--log-level", "error", "serve", "--dry-run", "--bind"])
        .arg(addr.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
        .expect("serve command should start");
    wait_for_listen(addr, Duration::from_secs(5)).expect("plotter should start listening");
    child
}

fn stdout_json(output: &Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be json")
}

#[test]
fn goto_against_dry_run_plotter() {
    let addr = free_addr();
    let mut plotter = spawn_plotter(addr);
    let addr_arg = addr.to_string();

    let output = wireplot(&["goto", &addr_arg, "100", "100"]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json = stdout_json(&output);
    assert_eq!(json["command"], "goto");
    assert_eq!(json["status"], "ok");
    assert_eq!(json["x"], 100.0);

    let output = wireplot(&["pen", &addr_arg, "down"]);
    assert!(output.status.success());
    assert_eq!(stdout_json(&output)["pen"], "down");

    let output = wireplot(&["goto", &addr_arg, "2000", "2000"]);
    assert_eq!(output.status.code(), Some(20));
    assert!(String::from_utf8_lossy(&output.stderr).contains("outside"));

    let _ = plotter.kill();
    let _ = plotter.wait();
}

#[test]
fn path_file_is_sent_in_order() {
    let addr = free_addr();
    let mut plotter = spawn_plotter(addr);
    let dir = unique_temp_dir("path");
    let file = dir.join("square.json");
    std::fs::write(
        &file,
        r#"[[200, 200], {"x": 400, "y": 200}, [400, 400], [200, 400]]"#,
    )
    .expect("path file should be writable");

    let output = wireplot(&["path", &addr.to_string(), file.to_str().expect("utf-8 path")]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(stdout_json(&output)["waypoints"], 4);

    let _ = plotter.kill();
    let _ = plotter.wait();
    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn malformed_path_file_is_data_invalid() {
    let dir = unique_temp_dir("bad-path");
    let file = dir.join("bad.json");
    std::fs::write(&file, r#"[[1, 2, 3]]"#).expect("path file should be writable");

    let output = wireplot(&["path", "127.0.0.1:9", file.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(60));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn connect_refused_fails() {
    let addr = free_addr();
    let output = wireplot(&["goto", &addr.to_string(), "1", "1", "--timeout", "500ms"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("connect"));
}

#[test]
fn plan_reports_step_delta() {
    let dir = unique_temp_dir("plan");
    let config = dir.join("plotter.toml");
    std::fs::write(&config, "[motor]\nsteps_per_mm = 2.0\n").expect("config should be writable");

    let output = wireplot(&[
        "plan",
        "--config",
        config.to_str().expect("utf-8 path"),
        "100",
        "100",
    ]);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let json = stdout_json(&output);
    assert_eq!(json["delta"]["left"], 1217);
    assert_eq!(json["delta"]["right"], -709);
    assert_eq!(json["steps_to"]["left"], 283);
    assert_eq!(json["in_bounds"], true);

    let output = wireplot(&[
        "plan",
        "--config",
        config.to_str().expect("utf-8 path"),
        "1300",
        "100",
    ]);
    assert_eq!(output.status.code(), Some(60));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn invalid_config_exits_78() {
    let dir = unique_temp_dir("bad-config");
    let config = dir.join("plotter.toml");
    std::fs::write(&config, "[board]\nwidth_mm = -5.0\n").expect("config should be writable");

    let output = wireplot(&["serve", "--config", config.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(78));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn print_config_round_trips_overrides() {
    let output = wireplot(&["serve", "--bind", "127.0.0.1:7999", "--print-config"]);
    assert!(output.status.success());
    let text = String::from_utf8_lossy(&output.stdout);
    assert!(text.contains("127.0.0.1:7999"));
    assert!(text.contains("[board]"));
}

#[test]
fn version_reports_name() {
    let output = wireplot(&["version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("wireplot "));
}
