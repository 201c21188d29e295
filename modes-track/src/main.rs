//! modes: CLI for Mode S / ADS-B decoding and tracking.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;

use chrono::{DateTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use modes_core::config::{self, Config};
use modes_core::decode_with_policy;
use modes_core::pipeline::{DecodeFailure, DecodePipeline, RawLine};
use modes_core::sbs;
use modes_core::types::icao_to_string;
use modes_core::{ChecksumPolicy, Frame, ModesError, TrackStore};

#[derive(Parser)]
#[command(name = "modes", version, about = "Mode S / ADS-B decoder and tracker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode hex frames from a file and print an aircraft table
    Decode {
        /// File with one frame per line, `-` for stdin
        file: PathBuf,

        /// Print every decoded frame as JSON instead of the summary
        #[arg(long)]
        json: bool,

        /// Checksum policy: ignore or enforce
        #[arg(long, value_parser = parse_policy)]
        checksum: Option<ChecksumPolicy>,
    },

    /// Decode frames on a worker pool and track aircraft positions
    Track {
        /// File with one frame per line, `-` for stdin
        file: PathBuf,

        /// Decoder threads
        #[arg(long, env = "MODES_WORKERS")]
        workers: Option<usize>,

        /// Positions kept per aircraft (0 keeps all)
        #[arg(long)]
        history: Option<usize>,

        /// Checksum policy: ignore or enforce
        #[arg(long, value_parser = parse_policy)]
        checksum: Option<ChecksumPolicy>,
    },

    /// Track aircraft from BaseStation (SBS1) CSV lines
    Sbs {
        /// File with one record per line, `-` for stdin
        file: PathBuf,
    },

    /// Show the configuration
    Config {
        /// Write the current (or default) configuration to the config file
        #[arg(long)]
        init: bool,
    },
}

fn parse_policy(s: &str) -> Result<ChecksumPolicy, String> {
    ChecksumPolicy::parse(s).ok_or_else(|| format!("unknown checksum policy {s:?}"))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let result = config::load_config().and_then(|cfg| match cli.command {
        Commands::Decode {
            file,
            json,
            checksum,
        } => cmd_decode(&file, json, checksum.unwrap_or(cfg.decode.checksum), &cfg),
        Commands::Track {
            file,
            workers,
            history,
            checksum,
        } => {
            let mut cfg = cfg;
            if let Some(w) = workers {
                cfg.pipeline.workers = w;
            }
            if let Some(h) = history {
                cfg.tracking.history_cap = h;
            }
            if let Some(c) = checksum {
                cfg.decode.checksum = c;
            }
            cmd_track(&file, &cfg)
        }
        Commands::Sbs { file } => cmd_sbs(&file, &cfg),
        Commands::Config { init } => cmd_config(&cfg, init),
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn open_input(file: &Path) -> Result<Box<dyn BufRead>, ModesError> {
    if file.to_str() == Some("-") {
        Ok(Box::new(io::stdin().lock()))
    } else {
        let f = std::fs::File::open(file)?;
        Ok(Box::new(io::BufReader::new(f)))
    }
}

/// Non-empty, non-comment lines of the input.
fn input_lines(file: &Path) -> Result<impl Iterator<Item = String>, ModesError> {
    let reader = open_input(file)?;
    Ok(reader.lines().map_while(Result::ok).filter(|l| {
        let t = l.trim();
        !t.is_empty() && !t.starts_with('#')
    }))
}

/// Split an optional `;<epoch seconds>` suffix off a capture line.
fn split_timestamp(line: &str) -> (&str, DateTime<Utc>) {
    if let Some((frame, ts)) = line.trim().rsplit_once(';') {
        if let Ok(secs) = ts.trim().parse::<f64>() {
            let millis = (secs * 1000.0) as i64;
            if let Some(at) = Utc.timestamp_millis_opt(millis).single() {
                return (frame, at);
            }
        }
    }
    (line, Utc::now())
}

/// Decode one capture line, logging the rejection when it fails.
fn decode_line(line: &str, policy: ChecksumPolicy) -> Result<Frame, DecodeFailure> {
    let (raw, at) = split_timestamp(line);
    decode_with_policy(raw, at, policy).map_err(|error| {
        debug!(line = %raw, %error, "line rejected");
        DecodeFailure {
            line: raw.to_string(),
            error,
        }
    })
}

fn cmd_decode(
    file: &Path,
    json: bool,
    policy: ChecksumPolicy,
    cfg: &Config,
) -> Result<(), ModesError> {
    let store = TrackStore::new(cfg.tracker_config());
    let mut total = 0u64;
    let mut decoded = 0u64;

    for line in input_lines(file)? {
        total += 1;
        let Ok(frame) = decode_line(&line, policy) else {
            continue;
        };
        decoded += 1;

        if json {
            match serde_json::to_string(&frame) {
                Ok(s) => println!("{s}"),
                Err(e) => warn!(error = %e, "JSON encoding failed"),
            }
        } else {
            store.apply_frame(&frame);
        }
    }

    if !json {
        println!();
        println!("Frames: {total} read, {decoded} decoded, {} aircraft", store.len());
        println!();
        print_aircraft(&store);
    }
    Ok(())
}

fn cmd_track(file: &Path, cfg: &Config) -> Result<(), ModesError> {
    let store = TrackStore::new(cfg.tracker_config());
    let (pipeline, output) = DecodePipeline::spawn(
        cfg.pipeline.workers,
        cfg.pipeline.queue_capacity,
        cfg.decode.checksum,
    )?;
    info!(
        workers = cfg.pipeline.workers,
        history = cfg.tracking.history_cap,
        checksum = cfg.decode.checksum.as_str(),
        "tracking {}",
        file.display()
    );

    let lines = input_lines(file)?;
    let (counts, positions) = thread::scope(|s| {
        let frames = output.frames;
        let store = &store;
        let consumer = s.spawn(move || {
            let mut positions = 0u64;
            for frame in frames.iter() {
                let had_fix = frame.cpr().is_some();
                if store.apply_frame(&frame).is_some() && had_fix {
                    positions += 1;
                }
            }
            positions
        });
        // failures are already logged by the workers
        let errors = output.errors;
        s.spawn(move || errors.iter().count());

        for line in lines {
            let (raw, at) = split_timestamp(&line);
            if !pipeline.submit(RawLine::new(raw, at)) {
                break;
            }
        }
        let counts = pipeline.shutdown();
        (counts, consumer.join().unwrap_or(0))
    });

    let broken: usize = store
        .snapshot()
        .iter()
        .map(|ac| ac.history.iter().filter(|p| p.track_broken).count())
        .sum();

    println!();
    println!("Track complete: {}", file.display());
    println!(
        "  Lines: {} read, {} decoded, {} rejected",
        counts.lines, counts.frames, counts.errors
    );
    println!("  Position updates: {positions}, track breaks: {broken}");
    println!("  Aircraft: {}", store.len());
    println!();
    print_aircraft(&store);
    Ok(())
}

fn cmd_sbs(file: &Path, cfg: &Config) -> Result<(), ModesError> {
    let store = TrackStore::new(cfg.tracker_config());
    let mut total = 0u64;
    let mut rejected = 0u64;

    for line in input_lines(file)? {
        total += 1;
        match sbs::parse(&line, Utc::now()) {
            Ok(record) => {
                store.apply_sbs(&record);
            }
            Err(e) => {
                rejected += 1;
                debug!(error = %e, %line, "SBS line rejected");
            }
        }
    }

    println!();
    println!("Records: {total} read, {rejected} rejected, {} aircraft", store.len());
    println!();
    print_aircraft(&store);
    Ok(())
}

fn cmd_config(cfg: &Config, init: bool) -> Result<(), ModesError> {
    if init {
        let path = config::save_config(cfg)?;
        println!("Wrote {}", path.display());
        println!();
    }
    print!("{}", config::serialize_config(cfg));
    Ok(())
}

fn print_aircraft(store: &TrackStore) {
    let mut aircraft = store.snapshot();
    if aircraft.is_empty() {
        return;
    }
    aircraft.sort_by_key(|ac| std::cmp::Reverse(ac.num_updates));

    let mut table = Table::new();
    table.set_header(vec![
        "ICAO", "Callsign", "Squawk", "Alt", "Speed (kts)", "Hdg", "VRate", "Lat", "Lon",
        "Track", "Msgs", "Rate",
    ]);

    let dash = || "-".to_string();
    for ac in &aircraft {
        let loc = &ac.location;
        let position = ac.position();
        table.add_row(vec![
            Cell::new(icao_to_string(ac.icao)),
            Cell::new(ac.flight_id.as_deref().unwrap_or("-")),
            Cell::new(ac.squawk.map(|s| format!("{s:04}")).unwrap_or_else(dash)),
            Cell::new(
                loc.altitude
                    .map(|a| format!("{a} {}", loc.altitude_unit))
                    .unwrap_or_else(dash),
            ),
            Cell::new(loc.velocity.map(|v| format!("{v:.0}")).unwrap_or_else(dash)),
            Cell::new(loc.heading.map(|h| format!("{h:.1}")).unwrap_or_else(dash)),
            Cell::new(loc.vertical_rate.map(|v| format!("{v:+}")).unwrap_or_else(dash)),
            Cell::new(position.map(|p| format!("{:.4}", p.0)).unwrap_or_else(dash)),
            Cell::new(position.map(|p| format!("{:.4}", p.1)).unwrap_or_else(dash)),
            Cell::new(ac.history.len()),
            Cell::new(ac.num_updates),
            Cell::new(format!("{:.1}/s", ac.message_rate())),
        ]);
    }

    println!("{table}");
}
