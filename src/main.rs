// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

// USB-CDC file transfer protocol implementation
mod chunk;
mod config;
mod error;
mod files;
mod packet;
mod payload;
mod protocol;
mod serial;
mod session;
mod settings;
mod store;

use clap::{Parser, Subcommand};
use serialport::{DataBits, Parity, StopBits};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use config::{Role, SessionConfig, TransferMode};
use error::{ConfigError, Error, SessionError, SettingsError};
use serial::{PortSettings, RealSerialPort};
use session::{Endpoint, SessionFsm, SessionReport};
use settings::PlanSettings;
use store::{DirSink, MemorySource, PathSource};

#[derive(Parser)]
#[command(name = "usbxfer")]
#[command(about = "File transfer with data loggers over USB-CDC serial", long_about = None)]
#[command(disable_help_subcommand = true)]
struct Cli {
    /// Serial port to use (e.g., /dev/ttyACM0 or COM3)
    #[arg(short, long, default_value = "/dev/ttyACM0")]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value = "115200")]
    baud: u32,

    /// Data bits (5, 6, 7, or 8)
    #[arg(long, default_value = "8", value_name = "BITS")]
    data_bits: u8,

    /// Parity (none, odd, or even)
    #[arg(long, default_value = "none")]
    parity: String,

    /// Stop bits (1 or 2)
    #[arg(long, default_value = "1", value_name = "BITS")]
    stop_bits: u8,

    /// Send the handshake instead of waiting for the peer's
    #[arg(long)]
    initiate: bool,

    /// Skip the handshake, for firmware that starts with the file info
    #[arg(long, conflicts_with = "initiate")]
    no_handshake: bool,

    /// Seconds to wait for a valid handshake
    #[arg(long, default_value = "30", value_name = "SECS")]
    handshake_timeout: u64,

    /// Seconds to wait for the ACK of a sent frame
    #[arg(long, default_value = "5", value_name = "SECS")]
    ack_timeout: u64,

    /// Seconds to wait for the peer's next frame while receiving
    #[arg(long, default_value = "30", value_name = "SECS")]
    frame_timeout: u64,

    /// File bytes per chunk when sending
    #[arg(long, default_value = "512", value_name = "BYTES")]
    chunk_size: usize,

    /// Enable debug output
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Receive every file the device lists
    Pull {
        /// Directory to save received files
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Send one configuration file to the device
    Push {
        /// File to send
        #[arg(required_unless_present = "config_dir")]
        file: Option<PathBuf>,

        /// File index to announce; taken from a setting_N.csv name if omitted
        #[arg(long)]
        index: Option<u8>,

        /// Directory holding setting_1.csv .. setting_4.csv
        #[arg(short, long, conflicts_with = "file")]
        config_dir: Option<PathBuf>,

        /// Plan to send from the config directory
        #[arg(long, requires = "config_dir")]
        plan: Option<u8>,
    },
    /// Generate a plan's settings file and send it to the device
    PushSettings {
        /// Plan number (1-4)
        #[arg(long)]
        plan: u8,

        #[arg(long, allow_negative_numbers = true)]
        current: i32,

        #[arg(long, allow_negative_numbers = true)]
        sample_rate: i32,

        #[arg(long, allow_negative_numbers = true)]
        duration: i32,

        #[arg(long, allow_negative_numbers = true)]
        min_temp: i32,

        #[arg(long, allow_negative_numbers = true)]
        max_temp: i32,
    },
    /// Serve files to a pulling peer (device side of a pull)
    Offer {
        /// Files to list and send
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Receive one pushed file (device side of a push)
    Accept {
        /// Directory to save the received file
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// List available serial ports
    ListPorts,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("failed to open serial port {port}: {source}")]
    Port {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("invalid session settings: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid plan settings: {0}")]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::Session(SessionError { error: Error::Cancelled, .. }) => 130,
            _ => 1,
        }
    }
}

fn parse_data_bits(bits: u8) -> Result<DataBits, String> {
    match bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        _ => Err(format!("Invalid data bits: {}. Must be 5, 6, 7, or 8", bits)),
    }
}

fn parse_parity(parity: &str) -> Result<Parity, String> {
    match parity.to_lowercase().as_str() {
        "none" => Ok(Parity::None),
        "odd" => Ok(Parity::Odd),
        "even" => Ok(Parity::Even),
        _ => Err(format!("Invalid parity: {}. Must be 'none', 'odd', or 'even'", parity)),
    }
}

fn parse_stop_bits(bits: u8) -> Result<StopBits, String> {
    match bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        _ => Err(format!("Invalid stop bits: {}. Must be 1 or 2", bits)),
    }
}

fn init_logging(debug: bool) {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install logger: {}", e);
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!("Ctrl-C will not stop the session cleanly: {}", e);
    }

    if let Err(e) = execute(cli, &cancel) {
        error!("{}", e);
        std::process::exit(e.exit_code());
    }
}

fn execute(cli: Cli, cancel: &AtomicBool) -> Result<(), CliError> {
    let role = if cli.initiate { Role::Initiator } else { Role::Responder };

    match &cli.command {
        Commands::ListPorts => list_ports(),
        Commands::Pull { output_dir } => {
            let sink = DirSink::create(output_dir.clone())?;
            info!("Receiving files to: {}", output_dir.display());
            let report = run_session(&cli, Endpoint::Sink(Box::new(sink)), role, TransferMode::FileList, cancel)?;
            info!("Received {} files ({} bytes)", report.files.len(), report.bytes_transferred);
            Ok(())
        }
        Commands::Push { file, index, config_dir, plan } => {
            let (index, path) = match (file, config_dir) {
                (Some(file), _) => (file_index(file, *index)?, file.clone()),
                (None, Some(dir)) => select_settings(dir, *plan)?,
                (None, None) => return Err(CliError::Usage("nothing to push".to_string())),
            };
            info!("Sending {} as index {}", path.display(), index);
            let source = PathSource::new(vec![(index, path)]);
            let report = run_session(&cli, Endpoint::Source(Box::new(source)), role, TransferMode::SingleFile, cancel)?;
            info!("File sent successfully ({} bytes)", report.bytes_transferred);
            Ok(())
        }
        Commands::PushSettings { plan, current, sample_rate, duration, min_temp, max_temp } => {
            let settings = PlanSettings {
                plan: *plan,
                current: *current,
                sample_rate: *sample_rate,
                duration: *duration,
                min_temp: *min_temp,
                max_temp: *max_temp,
            };
            settings.validate()?;
            let source = MemorySource::new().with_file(settings.plan, &settings.filename(), settings.to_csv().into_bytes())?;
            info!("Sending {} for plan {}", settings.filename(), settings.plan);
            let report = run_session(&cli, Endpoint::Source(Box::new(source)), role, TransferMode::SingleFile, cancel)?;
            info!("Settings sent successfully ({} bytes)", report.bytes_transferred);
            Ok(())
        }
        Commands::Offer { files } => {
            let source = PathSource::numbered(files.clone())?;
            let report = run_session(&cli, Endpoint::Source(Box::new(source)), role, TransferMode::FileList, cancel)?;
            info!("Sent {} files ({} bytes)", report.files.len(), report.bytes_transferred);
            Ok(())
        }
        Commands::Accept { output_dir } => {
            let sink = DirSink::create(output_dir.clone())?;
            let report = run_session(&cli, Endpoint::Sink(Box::new(sink)), role, TransferMode::SingleFile, cancel)?;
            for file in &report.files {
                info!("Stored {} (index {}) in {}", file.name, file.index, output_dir.display());
            }
            Ok(())
        }
    }
}

fn list_ports() -> Result<(), CliError> {
    let ports = serial::list_ports()
        .map_err(|e| CliError::Usage(format!("cannot enumerate serial ports: {}", e)))?;
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for (name, description) in ports {
        println!("{:<20} {}", name, description);
    }
    Ok(())
}

fn file_index(file: &Path, index: Option<u8>) -> Result<u8, CliError> {
    if let Some(index) = index {
        return Ok(index);
    }
    file.file_name()
        .and_then(|n| n.to_str())
        .and_then(settings::index_from_filename)
        .ok_or_else(|| CliError::Usage(format!(
            "cannot derive an index from {}; name it setting_N.csv or pass --index",
            file.display()
        )))
}

fn select_settings(dir: &Path, plan: Option<u8>) -> Result<(u8, PathBuf), CliError> {
    let mut found = settings::discover(dir);
    if found.is_empty() {
        return Err(CliError::Usage(format!(
            "no settings files in {} (expected setting_1.csv .. setting_4.csv)",
            dir.display()
        )));
    }

    match plan {
        Some(plan) => found
            .into_iter()
            .find(|(index, _)| *index == plan)
            .ok_or_else(|| CliError::Usage(format!("{} has no {}", dir.display(), settings::filename_for(plan)))),
        None if found.len() == 1 => Ok(found.remove(0)),
        None => {
            let plans: Vec<String> = found.iter().map(|(index, _)| index.to_string()).collect();
            Err(CliError::Usage(format!("several plans available ({}), choose one with --plan", plans.join(", "))))
        }
    }
}

fn run_session(cli: &Cli, endpoint: Endpoint, role: Role, mode: TransferMode, cancel: &AtomicBool)
    -> Result<SessionReport, CliError> {
    let mut config = SessionConfig::new(role, mode);
    config.handshake_timeout = Duration::from_secs(cli.handshake_timeout);
    config.ack_timeout = Duration::from_secs(cli.ack_timeout);
    config.frame_timeout = Duration::from_secs(cli.frame_timeout);
    config.chunk_size = cli.chunk_size;
    config.skip_handshake = cli.no_handshake;
    config.validate()?;

    let port_settings = PortSettings {
        baud_rate: cli.baud,
        data_bits: parse_data_bits(cli.data_bits).map_err(CliError::Usage)?,
        parity: parse_parity(&cli.parity).map_err(CliError::Usage)?,
        stop_bits: parse_stop_bits(cli.stop_bits).map_err(CliError::Usage)?,
    };

    info!("Opening serial port: {}", cli.port);
    info!("Settings: {} baud, {:?}, {:?}, {:?}",
          port_settings.baud_rate, port_settings.data_bits, port_settings.parity, port_settings.stop_bits);
    let port = RealSerialPort::open(&cli.port, &port_settings)
        .map_err(|source| CliError::Port { port: cli.port.clone(), source })?;

    match role {
        _ if cli.no_handshake => {}
        Role::Initiator => info!("Sending handshake..."),
        Role::Responder => info!("Waiting for handshake..."),
    }
    let state = SessionFsm::new(Box::new(port), endpoint, config)?;
    let report = session::run(state, cancel)?;
    log_report(&report);
    Ok(report)
}

fn log_report(report: &SessionReport) {
    match &report.peer {
        Some(peer) => info!("Session done as {} (peer version {}, timestamp {})",
                            report.role, peer.version, peer.timestamp),
        None => info!("Session done as {}", report.role),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serial_settings() {
        assert!(matches!(parse_data_bits(8), Ok(DataBits::Eight)));
        assert!(parse_data_bits(9).is_err());
        assert!(matches!(parse_parity("EVEN"), Ok(Parity::Even)));
        assert!(parse_parity("mark").is_err());
        assert!(matches!(parse_stop_bits(2), Ok(StopBits::Two)));
        assert!(parse_stop_bits(3).is_err());
    }

    #[test]
    fn test_file_index() {
        assert_eq!(file_index(Path::new("/tmp/setting_3.csv"), None).unwrap(), 3);
        assert_eq!(file_index(Path::new("/tmp/plan.csv"), Some(2)).unwrap(), 2);
        assert!(file_index(Path::new("/tmp/plan.csv"), None).is_err());
    }

    #[test]
    fn test_select_settings() {
        let dir = tempfile::tempdir().unwrap();
        assert!(select_settings(dir.path(), None).is_err());

        std::fs::write(dir.path().join("setting_2.csv"), "a").unwrap();
        assert_eq!(select_settings(dir.path(), None).unwrap(), (2, dir.path().join("setting_2.csv")));

        std::fs::write(dir.path().join("setting_4.csv"), "b").unwrap();
        assert!(select_settings(dir.path(), None).is_err());
        assert_eq!(select_settings(dir.path(), Some(4)).unwrap().0, 4);
        assert!(select_settings(dir.path(), Some(1)).is_err());
    }

    #[test]
    fn test_cli_parses_push_settings() {
        let cli = Cli::try_parse_from([
            "usbxfer", "push-settings", "--plan", "2", "--current", "250", "--sample-rate", "1",
            "--duration", "3", "--min-temp", "-20", "--max-temp", "30",
        ]).unwrap();
        assert_eq!(cli.port, "/dev/ttyACM0");
        assert!(matches!(cli.command, Commands::PushSettings { plan: 2, min_temp: -20, .. }));
        assert!(!cli.no_handshake);
    }

    #[test]
    fn test_cli_no_handshake() {
        let cli = Cli::try_parse_from(["usbxfer", "--no-handshake", "push", "setting_1.csv"]).unwrap();
        assert!(cli.no_handshake);
        assert!(Cli::try_parse_from(["usbxfer", "--no-handshake", "--initiate", "push", "setting_1.csv"]).is_err());
    }

    #[test]
    fn test_exit_codes() {
        let cancelled = CliError::Session(SessionError { phase: session::Phase::TransferringFile, error: Error::Cancelled });
        assert_eq!(cancelled.exit_code(), 130);
        assert_eq!(CliError::Usage("bad".to_string()).exit_code(), 1);

        let invalid = CliError::from(SettingsError::TemperatureRange { min: 40, max: 30 });
        assert_eq!(invalid.exit_code(), 1);
        assert_eq!(invalid.to_string(), "invalid plan settings: min temp 40 is above max temp 30");
        assert_eq!(CliError::from(ConfigError::ZeroTimeout("frame timeout")).exit_code(), 1);
    }
}
