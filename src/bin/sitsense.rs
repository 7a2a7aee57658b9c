//! SitSense CLI - Command-line interface for SitSense Core
//!
//! Commands:
//! - process: Run one pressure grid through the pipeline
//! - replay: Drive the engine from recorded NDJSON frames and sitting events
//! - demo: Emit synthetic frames processed by the engine
//! - config: Print or check engine configuration

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use sitsense_core::demo::DemoFeed;
use sitsense_core::palette::color_of;
use sitsense_core::{
    format_clock, format_threshold, AlertEvent, Clock, FrameReport, ManualClock,
    NormalizationUpdate, PressureGrid, SenseConfig, SenseError, SessionSummary, SitSenseEngine,
    TickReport, SITSENSE_VERSION,
};

/// SitSense - Pressure seat signal processing and sit-duration alerts
#[derive(Parser)]
#[command(name = "sitsense")]
#[command(version = SITSENSE_VERSION)]
#[command(about = "Process pressure-seat frames into heatmaps, posture scores and alerts", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one pressure grid (JSON array of rows) through the pipeline
    Process {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Display grid side length (2-64)
        #[arg(long)]
        resolution: Option<usize>,

        /// Sensitivity (0-1); higher brightens mid-range pressure
        #[arg(long)]
        sensitivity: Option<f64>,

        /// Load a calibration baseline from file
        #[arg(long)]
        calibration: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,
    },

    /// Replay NDJSON frames and sitting events through the engine
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Load a calibration baseline from file
        #[arg(long)]
        load_calibration: Option<PathBuf>,

        /// Save the calibration baseline to file after the replay
        #[arg(long)]
        save_calibration: Option<PathBuf>,

        /// Also emit a record for every ingested frame
        #[arg(long)]
        frames: bool,

        /// Flush output after each record
        #[arg(long, default_value = "true")]
        flush: bool,
    },

    /// Emit synthetic frames processed by the engine (one per second)
    Demo {
        /// Number of frames to generate
        #[arg(short = 'n', long, default_value = "10")]
        frames: u64,

        /// Seed for the generator jitter
        #[arg(long)]
        seed: Option<u64>,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration, or check a configuration file
    Config {
        /// Configuration file to validate
        #[arg(long)]
        check: Option<PathBuf>,
    },
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), SitSenseCliError> {
    match cli.command {
        Commands::Process {
            input,
            resolution,
            sensitivity,
            calibration,
            output_format,
        } => cmd_process(&input, resolution, sensitivity, calibration.as_deref(), output_format),

        Commands::Replay {
            input,
            config,
            load_calibration,
            save_calibration,
            frames,
            flush,
        } => cmd_replay(
            &input,
            config.as_deref(),
            load_calibration.as_deref(),
            save_calibration.as_deref(),
            frames,
            flush,
        ),

        Commands::Demo { frames, seed, config } => cmd_demo(frames, seed, config.as_deref()),

        Commands::Config { check } => cmd_config(check.as_deref()),
    }
}

fn cmd_process(
    input: &Path,
    resolution: Option<usize>,
    sensitivity: Option<f64>,
    calibration: Option<&Path>,
    output_format: OutputFormat,
) -> Result<(), SitSenseCliError> {
    let grid = PressureGrid::from_json(&read_input(input)?)?;

    let mut engine = SitSenseEngine::default();
    if let Some(path) = calibration {
        engine.load_calibration(&fs::read_to_string(path)?)?;
    }
    engine.set_normalization_config(&NormalizationUpdate {
        target_resolution: resolution,
        sensitivity,
    })?;

    let report = engine.ingest(grid);
    let intensities = engine
        .intensities()
        .map(|grid| grid.to_rows())
        .unwrap_or_default();
    let colors = intensities
        .iter()
        .map(|row| row.iter().map(|v| color_of(*v).to_hex()).collect())
        .collect();

    let output = ProcessOutput {
        size: intensities.len(),
        intensities,
        colors,
        right_pct: report.balance.shares.right_pct(),
        back_pct: report.balance.shares.back_pct(),
        report,
    };

    let text = match output_format {
        OutputFormat::Json => serde_json::to_string(&output)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&output)?,
    };
    println!("{}", text);
    Ok(())
}

fn cmd_replay(
    input: &Path,
    config: Option<&Path>,
    load_calibration: Option<&Path>,
    save_calibration: Option<&Path>,
    emit_frames: bool,
    flush: bool,
) -> Result<(), SitSenseCliError> {
    let config = load_config(config)?;
    let clock = ManualClock::new(0);
    let mut engine = SitSenseEngine::with_clock(config, Box::new(clock.clone()));

    if let Some(path) = load_calibration {
        engine.load_calibration(&fs::read_to_string(path)?)?;
    }

    let reader: Box<dyn BufRead> = if input.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            log::warn!("reading replay events from a terminal; end input with Ctrl-D");
        }
        Box::new(BufReader::new(io::stdin()))
    } else {
        Box::new(BufReader::new(fs::File::open(input)?))
    };

    let mut stdout = io::stdout();
    let mut now_ms: u64 = 0;
    let mut next_tick_ms: u64 = 1000;
    let mut events = 0usize;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let event: ReplayEvent = serde_json::from_str(trimmed).map_err(|e| {
            SitSenseCliError::ParseError(format!("Failed to parse event on line {}: {}", index + 1, e))
        })?;

        if event.t_ms < now_ms {
            return Err(SitSenseCliError::ParseError(format!(
                "Event on line {} goes back in time ({}ms < {}ms)",
                index + 1,
                event.t_ms,
                now_ms
            )));
        }

        // 1 Hz ticks between the previous event and this one
        while next_tick_ms <= event.t_ms {
            clock.set_ms(next_tick_ms);
            if let Some(TickReport { alert: Some(alert), .. }) = engine.tick() {
                write_record(&mut stdout, &ReplayRecord::alert(next_tick_ms, alert), flush)?;
            }
            next_tick_ms += 1000;
        }

        now_ms = event.t_ms;
        clock.set_ms(now_ms);
        events += 1;

        if event.reset {
            engine.reset();
        }
        if let Some(sitting) = event.sitting {
            engine.set_sitting(sitting);
        }
        if let Some(rows) = event.matrix {
            match engine.ingest_grid(rows) {
                Ok(report) if emit_frames => {
                    write_record(&mut stdout, &ReplayRecord::frame(now_ms, report), flush)?;
                }
                Ok(_) => {}
                // Dropped frames keep the previous outputs
                Err(e) => log::warn!("line {}: {}", index + 1, e),
            }
        }
        if event.calibrate && !engine.calibrate_from_last() {
            log::warn!("line {}: calibration requested before any frame", index + 1);
        }
    }

    if events == 0 {
        return Err(SitSenseCliError::NoEvents);
    }

    let summary = engine.session_summary();
    write_record(&mut stdout, &ReplayRecord::summary(now_ms, summary), true)?;

    if let Some(path) = save_calibration {
        fs::write(path, engine.save_calibration()?)?;
    }

    Ok(())
}

fn cmd_demo(frames: u64, seed: Option<u64>, config: Option<&Path>) -> Result<(), SitSenseCliError> {
    let config = load_config(config)?;
    let clock = ManualClock::new(0);
    let mut engine = SitSenseEngine::with_clock(config, Box::new(clock.clone()));
    let mut feed = seed.map(DemoFeed::new).unwrap_or_default();
    let mut stdout = io::stdout();

    engine.start();
    for _ in 0..frames {
        let t_ms = clock.now_ms();
        let report = engine.ingest(feed.next_frame());
        write_record(&mut stdout, &ReplayRecord::frame(t_ms, report), false)?;

        clock.advance_secs(1);
        if let Some(TickReport { alert: Some(alert), .. }) = engine.tick() {
            write_record(&mut stdout, &ReplayRecord::alert(clock.now_ms(), alert), false)?;
        }
    }

    let summary = engine.session_summary();
    write_record(&mut stdout, &ReplayRecord::summary(clock.now_ms(), summary), true)?;
    Ok(())
}

fn cmd_config(check: Option<&Path>) -> Result<(), SitSenseCliError> {
    let config = match check {
        Some(path) => SenseConfig::from_json(&fs::read_to_string(path)?)?,
        None => SenseConfig::default(),
    };

    println!("{}", config.to_json()?);

    let t = &config.thresholds;
    eprintln!(
        "soft {} / hard {} (repeat {} / {})",
        format_threshold(t.soft_sec()),
        format_threshold(t.hard_sec()),
        format_threshold(t.repeat_soft_sec()),
        format_threshold(t.repeat_hard_sec())
    );
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SenseConfig, SitSenseCliError> {
    match path {
        Some(path) => Ok(SenseConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(SenseConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, SitSenseCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_record(out: &mut impl Write, record: &ReplayRecord, flush: bool) -> Result<(), SitSenseCliError> {
    writeln!(out, "{}", serde_json::to_string(record)?)?;
    if flush {
        out.flush()?;
    }
    Ok(())
}

// Input and output records

/// One line of replay input. Fields present on the same line apply in the
/// order reset, sitting, matrix, calibrate.
#[derive(Deserialize)]
struct ReplayEvent {
    /// Milliseconds since the start of the recording
    t_ms: u64,
    #[serde(default)]
    sitting: Option<bool>,
    #[serde(default)]
    matrix: Option<Vec<Vec<f64>>>,
    #[serde(default)]
    calibrate: bool,
    #[serde(default)]
    reset: bool,
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum ReplayRecord {
    Frame {
        t_ms: u64,
        #[serde(flatten)]
        report: FrameReport,
    },
    Alert {
        t_ms: u64,
        clock: String,
        #[serde(flatten)]
        alert: AlertEvent,
    },
    Summary {
        t_ms: u64,
        #[serde(flatten)]
        summary: SessionSummary,
    },
}

impl ReplayRecord {
    fn frame(t_ms: u64, report: FrameReport) -> Self {
        ReplayRecord::Frame { t_ms, report }
    }

    fn alert(t_ms: u64, alert: AlertEvent) -> Self {
        ReplayRecord::Alert {
            t_ms,
            clock: format_clock(alert.elapsed),
            alert,
        }
    }

    fn summary(t_ms: u64, summary: SessionSummary) -> Self {
        ReplayRecord::Summary { t_ms, summary }
    }
}

#[derive(Serialize)]
struct ProcessOutput {
    size: usize,
    intensities: Vec<Vec<f64>>,
    colors: Vec<Vec<String>>,
    right_pct: u8,
    back_pct: u8,
    #[serde(flatten)]
    report: FrameReport,
}

// Error types

#[derive(Debug)]
enum SitSenseCliError {
    Io(io::Error),
    Sense(SenseError),
    Json(serde_json::Error),
    NoEvents,
    ParseError(String),
}

impl From<io::Error> for SitSenseCliError {
    fn from(e: io::Error) -> Self {
        SitSenseCliError::Io(e)
    }
}

impl From<SenseError> for SitSenseCliError {
    fn from(e: SenseError) -> Self {
        SitSenseCliError::Sense(e)
    }
}

impl From<serde_json::Error> for SitSenseCliError {
    fn from(e: serde_json::Error) -> Self {
        SitSenseCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<SitSenseCliError> for CliError {
    fn from(e: SitSenseCliError) -> Self {
        match e {
            SitSenseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            SitSenseCliError::Sense(e @ SenseError::Configuration(_)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'sitsense config' to see valid defaults".to_string()),
            },
            SitSenseCliError::Sense(e) => CliError {
                code: "INPUT_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Grids must be rectangular JSON arrays of at least 2x2 finite numbers".to_string()),
            },
            SitSenseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            SitSenseCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No events found in input".to_string(),
                hint: Some("Ensure input is not empty".to_string()),
            },
            SitSenseCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Each line needs t_ms plus any of sitting, matrix, calibrate, reset".to_string()),
            },
        }
    }
}
