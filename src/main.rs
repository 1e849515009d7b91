// src/main.rs
//! GPS Tracker - follow a serial NMEA receiver from the command line

use anyhow::Context;
use clap::Parser;
use gps_tracker::{
    display::{self, FixPrinter},
    logging, transport, GeoPoint, Geofence, Tracker, TrackerConfig,
};
use std::{io, path::PathBuf, process::ExitCode, str::FromStr, time::Duration};
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "gps-tracker", version, about = "Track positions from a serial NMEA GPS receiver")]
struct Args {
    /// Serial port (e.g. /dev/ttyUSB0 or COM3)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long)]
    baud: Option<u32>,

    /// Serial read timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Number of fixes kept in history
    #[arg(long)]
    history: Option<usize>,

    /// Config file (defaults to ~/.config/gps-tracker/config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Persist the effective settings to the default config file
    #[arg(long)]
    save_config: bool,

    /// Write the position history to this CSV file on exit
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Circular geofence as LAT,LON,RADIUS_M
    #[arg(long, allow_hyphen_values = true)]
    geofence: Option<GeofenceArg>,

    /// Print one JSON object per fix instead of text
    #[arg(long)]
    json: bool,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone)]
struct GeofenceArg {
    center: GeoPoint,
    radius_m: f64,
}

impl FromStr for GeofenceArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values: Vec<f64> = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("invalid number in geofence: {}", e))?;

        match values.as_slice() {
            [lat, lon, radius] => Ok(Self {
                center: GeoPoint::new(*lat, *lon),
                radius_m: *radius,
            }),
            _ => Err("expected LAT,LON,RADIUS_M".to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    if let Err(e) = logging::init_logging(level) {
        eprintln!("{}", e);
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> anyhow::Result<TrackerConfig> {
    let mut config = match &args.config {
        Some(path) => TrackerConfig::load_from(path)?,
        None => TrackerConfig::load()?,
    };

    if let Some(port) = &args.port {
        config.port = port.clone();
    }
    if let Some(baud) = args.baud {
        config.baudrate = baud;
    }
    if let Some(ms) = args.timeout_ms {
        config.read_timeout = Duration::from_millis(ms);
    }
    if let Some(history) = args.history {
        config.history_size = history;
    }

    config.validate()?;
    Ok(config)
}

async fn run(args: Args) -> anyhow::Result<()> {
    if args.list_ports {
        let ports = transport::list_serial_ports()?;
        if ports.is_empty() {
            println!("No serial ports found.");
        } else {
            println!("Available serial ports:");
            for (name, kind) in ports {
                println!("  {} - {}", name, kind);
            }
        }
        return Ok(());
    }

    let config = load_config(&args)?;
    if args.save_config {
        config.save().context("failed to save configuration")?;
    }

    let geofence = args
        .geofence
        .as_ref()
        .map(|g| Geofence::new(g.center, g.radius_m))
        .transpose()?;

    let tracker = Tracker::new(config)?;
    let printer = FixPrinter::new(args.json, geofence);
    tracker.set_callback(move |pos| Ok(printer.print(&mut io::stdout().lock(), &pos)?));

    tracker
        .start()
        .with_context(|| format!("could not start tracking on {}", tracker.config().port))?;
    info!("tracking, press Ctrl-C to stop");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut watchdog = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                res.context("failed to listen for Ctrl-C")?;
                info!("interrupt received, stopping");
                break;
            }
            _ = watchdog.tick() => {
                if !tracker.is_running() {
                    break;
                }
            }
        }
    }

    let stopped = tracker.stop().await;

    if let Some(path) = &args.csv {
        tracker
            .save_history_csv(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), fixes = tracker.history_len(), "history saved");
    }
    if !args.json {
        display::print_summary(&mut io::stdout(), &tracker.stats())?;
    }

    stopped.context("tracking ended with a transport failure")?;
    Ok(())
}
