use std::io::BufRead;
use std::thread;
use std::time::Duration;

use log::{info, warn};
use maskguard::{ComplianceMonitor, Frame, MonitorConfig, Monitoring};

fn parse_line(line: &str) -> Option<Frame> {
    let idx = line.find(':')?;
    let (ts, vector) = line.split_at(idx);

    match (ts.trim().parse::<f32>(), serde_json::from_str(&vector[1..])) {
        (Ok(ts), Ok(detections)) => Some(Frame::new(ts, detections)),
        (Ok(_), Err(e)) => {
            warn!("wrong file format: parse json failed: {}", e);
            None
        }
        (Err(_), _) => {
            warn!("wrong file format: parse timestamp failed");
            None
        }
    }
}

fn main() -> Result<(), maskguard::error::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let in_file_name = match args.next() {
        Some(name) => name,
        None => {
            eprintln!("usage: replay <detections file> [config.toml]");
            std::process::exit(2);
        }
    };

    let config = match args.next() {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };

    let monitor = ComplianceMonitor::with_config(config)?;
    let dets_file = std::fs::File::open(in_file_name)?;

    for line in std::io::BufReader::new(dets_file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let Some(frame) = parse_line(&line) else {
            continue;
        };

        while monitor.is_paused() {
            thread::sleep(Duration::from_millis(100));
        }

        let alert = monitor.process_frame(&frame.detections)?;

        if !alert.new_alerts.is_empty() {
            info!(
                "{:.2}s: new alerts for tracks {:?} ({} boxes)",
                frame.timestamp,
                alert.new_alerts,
                frame.detections.len()
            );
        }

        if alert.environment_unsafe {
            warn!(
                "{:.2}s: environment not safe, {} unsafe",
                frame.timestamp, alert.unsafe_count
            );
        }
    }

    let snapshot = monitor.snapshot();
    if snapshot.is_stale() {
        warn!("final snapshot is stale");
    }

    match serde_json::to_string_pretty(snapshot.statistics()) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("failed to serialize statistics: {}", e),
    }

    Ok(())
}
