mod app;
mod capture;
mod config;
mod display;
mod dsp;
mod snapshot;
mod source;
mod telemetry;
mod waterfall;

use crate::app::{App, StopReason};
use crate::capture::CaptureConfig;
use crate::config::Settings;
use crate::display::MinifbDisplay;
use crate::snapshot::Snapshotter;
use crate::source::{SampleEncoding, SerialSource};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use jiff::Zoned;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "waterfall")]
#[command(about = "Real-time spectral waterfall for serial-attached ADC boards")]
#[command(version = "0.1.0")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Read settings from this file instead of the user config
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the live waterfall window
    Run {
        /// Serial device, e.g. /dev/ttyUSB0
        port: String,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// Capture a fixed number of samples and save a spectrogram PNG
    Capture {
        /// Serial device, e.g. /dev/ttyUSB0
        port: String,

        /// Number of samples to gather
        #[arg(long, default_value_t = capture::DEFAULT_SAMPLES)]
        samples: usize,

        /// FFT window length
        #[arg(long, default_value_t = capture::DEFAULT_WINDOW)]
        window: usize,

        /// Output image (defaults to a timestamped file in the snapshot directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format for the summary
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        overrides: Overrides,
    },

    /// List serial ports
    Ports {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the effective settings
    Config {
        /// Write them to the user config file
        #[arg(long)]
        save: bool,

        #[command(flatten)]
        overrides: Overrides,
    },
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    Text,
    Json,
}

/// Command-line values that take precedence over the config file
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Serial baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Read timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Samples per block (FFT size)
    #[arg(long)]
    block_size: Option<usize>,

    /// Sample rate in Hz (defaults to baud / 10)
    #[arg(long)]
    sample_rate: Option<f32>,

    /// Window width in pixels
    #[arg(long)]
    width: Option<usize>,

    /// Bottom of the dB scale
    #[arg(long, allow_negative_numbers = true)]
    min_db: Option<f32>,

    /// Top of the dB scale
    #[arg(long, allow_negative_numbers = true)]
    max_db: Option<f32>,

    /// Blocks read per scroll step
    #[arg(long)]
    decimation: Option<usize>,

    /// Byte encoding of the samples
    #[arg(long, value_enum)]
    encoding: Option<SampleEncoding>,

    /// Keep the DC component
    #[arg(long)]
    no_dc_removal: bool,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,
}

impl Overrides {
    fn apply(&self, settings: &mut Settings) {
        if let Some(baud) = self.baud {
            settings.baud_rate = baud;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            settings.timeout_ms = timeout_ms;
        }
        if let Some(block_size) = self.block_size {
            settings.block_size = block_size;
        }
        if self.sample_rate.is_some() {
            settings.sample_rate = self.sample_rate;
        }
        if let Some(width) = self.width {
            settings.width = width;
        }
        if let Some(min_db) = self.min_db {
            settings.min_db = min_db;
        }
        if let Some(max_db) = self.max_db {
            settings.max_db = max_db;
        }
        if let Some(decimation) = self.decimation {
            settings.decimation = decimation;
        }
        if let Some(encoding) = self.encoding {
            settings.encoding = encoding;
        }
        if self.no_dc_removal {
            settings.remove_dc = false;
        }
        if let Some(dir) = &self.snapshot_dir {
            settings.snapshot_dir = Some(dir.clone());
        }
    }
}

fn load_settings(path: Option<&PathBuf>, overrides: &Overrides) -> Result<Settings> {
    let mut settings = match path {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::load(),
    };
    overrides.apply(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn run_waterfall(port: &str, settings: &Settings) -> Result<()> {
    let mut app = App::from_settings(settings)?;
    let snapshots = Snapshotter::png(settings.snapshot_dir()?);
    tracing::info!("[snapshot] saving to {}", snapshots.dir().display());

    let mut source = SerialSource::open(
        port,
        settings.baud_rate,
        settings.timeout(),
        settings.block_size,
        settings.encoding,
    )?;
    tracing::info!(
        "[loop] {} Hz sample rate, {:.1} Hz per bin",
        settings.effective_sample_rate(),
        settings.effective_sample_rate() / settings.block_size as f32
    );

    let title = format!("waterfall - {}", source.port_name());
    let mut display = MinifbDisplay::open(&title, settings.width, settings.height())?;

    let summary = app.run(&mut source, &mut display, &snapshots)?;
    tracing::info!(
        "[loop] stopped ({}): {} blocks, {} columns, {} snapshots ({} failed)",
        match summary.reason {
            StopReason::Quit => "quit",
            StopReason::EndOfStream => "end of stream",
        },
        summary.blocks,
        summary.full_cycles,
        summary.snapshots,
        summary.failed_snapshots
    );
    Ok(())
}

fn run_capture(
    port: &str,
    settings: &Settings,
    config: CaptureConfig,
    output: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    config.validate()?;

    let output = match output {
        Some(output) => output,
        None => {
            let dir = settings.snapshot_dir()?;
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let timestamp = Zoned::now().strftime("%Y-%m-%d_%H-%M-%S");
            dir.join(format!("capture_{}.png", timestamp))
        }
    };

    let mut source = SerialSource::open(
        port,
        settings.baud_rate,
        settings.timeout(),
        config.window,
        settings.encoding,
    )?;
    let summary = capture::run(&mut source, &config, &output)?;

    match format {
        OutputFormat::Text => {
            println!("Wrote {}", summary.output.display());
            println!(
                "{} samples over {:.4} s, {} rows x {} bins ({:.1} Hz per bin)",
                summary.samples, summary.duration_secs, summary.rows, summary.bins, summary.bin_hz
            );
            println!("Color scale: {:e} .. {:e}", summary.scale_min, summary.scale_max);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
    }
    Ok(())
}

fn list_ports(format: OutputFormat) -> Result<()> {
    let ports = source::list_ports()?;

    match format {
        OutputFormat::Text => {
            if ports.is_empty() {
                println!("No serial ports found");
                return Ok(());
            }
            println!("{:<30} Type", "Port");
            println!("{}", "-".repeat(60));
            for port in ports {
                println!("{:<30} {}", port.name, port.kind);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ports)?),
    }
    Ok(())
}

fn show_config(settings: &Settings, save: bool) -> Result<()> {
    if save {
        let path = settings.save()?;
        println!("Saved settings to {}", path.display());
    } else if let Some(path) = config::config_path() {
        println!("# {}", path.display());
    }
    print!("{}", toml::to_string_pretty(settings)?);
    Ok(())
}

fn dispatch(cli: Cli) -> Result<()> {
    let config_file = cli.config.as_ref();

    match cli.command {
        Commands::Run { port, overrides } => {
            let settings = load_settings(config_file, &overrides)?;
            run_waterfall(&port, &settings)
        }
        Commands::Capture {
            port,
            samples,
            window,
            output,
            format,
            overrides,
        } => {
            let settings = load_settings(config_file, &overrides)?;
            let config = CaptureConfig {
                samples,
                window,
                sample_rate: settings.effective_sample_rate(),
            };
            run_capture(&port, &settings, config, output, format)
        }
        Commands::Ports { format } => list_ports(format),
        Commands::Config { save, overrides } => {
            let settings = load_settings(config_file, &overrides)?;
            show_config(&settings, save)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    match dispatch(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_take_precedence() {
        let cli = Cli::parse_from([
            "waterfall",
            "run",
            "/dev/ttyUSB0",
            "--baud",
            "2000000",
            "--min-db",
            "-10",
            "--max-db",
            "60",
            "--encoding",
            "offset-unsigned",
            "--no-dc-removal",
        ]);
        let Commands::Run { port, overrides } = cli.command else {
            panic!("expected run");
        };
        assert_eq!(port, "/dev/ttyUSB0");

        let mut settings = Settings::default();
        overrides.apply(&mut settings);
        assert_eq!(settings.baud_rate, 2_000_000);
        assert_eq!(settings.min_db, -10.0);
        assert_eq!(settings.max_db, 60.0);
        assert_eq!(settings.encoding, SampleEncoding::OffsetUnsigned);
        assert!(!settings.remove_dc);
        assert_eq!(settings.block_size, 1024);
        assert_eq!(settings.effective_sample_rate(), 200_000.0);
    }

    #[test]
    fn test_empty_overrides_keep_settings() {
        let mut settings = Settings::default();
        Overrides::default().apply(&mut settings);
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_capture_defaults() {
        let cli = Cli::parse_from(["waterfall", "capture", "/dev/ttyUSB1", "--format", "json"]);
        let Commands::Capture {
            samples,
            window,
            output,
            format,
            ..
        } = cli.command
        else {
            panic!("expected capture");
        };
        assert_eq!(samples, 65536);
        assert_eq!(window, 1024);
        assert!(output.is_none());
        assert!(matches!(format, OutputFormat::Json));
    }
}
