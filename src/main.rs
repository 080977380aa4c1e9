// Replays recorded OCR frames through a scan session.

use cardscan::utils::logger::LOG_TARGET;
use cardscan::{CardDetails, RecognizedText, ScanError, ScanSession, ScannerConfiguration};
use clap::Parser;
use log::{info, warn};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "cardscan", about = "Replay recorded OCR frames through the card scanner")]
struct Cli {
    /// JSON file with an array of frames; each frame is an array of blocks of lines
    #[arg(long)]
    frames: PathBuf,

    /// JSON scanner configuration; omitted fields use defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Delay between delivered frames, to mimic a camera stream
    #[arg(long, default_value_t = 100)]
    frame_interval_ms: u64,

    /// Overrides the configured timeout (0 disables it)
    #[arg(long)]
    timeout_seconds: Option<i64>,

    /// Accept card numbers that fail the Luhn check
    #[arg(long)]
    no_checksum: bool,

    /// Trace every frame
    #[arg(long)]
    debug: bool,
}

enum ScanResult {
    Scanned(CardDetails),
    Failed,
}

fn load_frames(path: &Path) -> Result<Vec<RecognizedText>, ScanError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ScanError::InvalidFrames(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&contents)
        .map_err(|e| ScanError::InvalidFrames(format!("{}: {}", path.display(), e)))
}

fn run(cli: &Cli) -> Result<ScanResult, ScanError> {
    let mut options = match &cli.config {
        Some(path) => ScannerConfiguration::from_json_file(path)?,
        None => ScannerConfiguration::default(),
    };
    if let Some(timeout) = cli.timeout_seconds {
        options.timeout_seconds = timeout;
    }
    if cli.no_checksum {
        options.enforce_checksum = false;
    }
    options.debug |= cli.debug;

    let frames = load_frames(&cli.frames)?;
    info!(target: LOG_TARGET, "Replaying {} frames from {}", frames.len(), cli.frames.display());

    let (result_tx, result_rx) = crossbeam_channel::bounded(1);
    let failed_tx = result_tx.clone();
    let session = ScanSession::start(
        options,
        move |details| {
            let _ = result_tx.send(ScanResult::Scanned(details));
        },
        move || {
            let _ = failed_tx.send(ScanResult::Failed);
        },
    )?;
    let has_deadline = session.options().timeout().is_some();

    let (frame_tx, frame_rx) = crossbeam_channel::unbounded();
    let worker = session.spawn_frame_loop(frame_rx)?;
    for frame in frames {
        if session.is_finalized() || frame_tx.send(frame).is_err() {
            break;
        }
        thread::sleep(Duration::from_millis(cli.frame_interval_ms));
    }
    drop(frame_tx);
    if worker.join().is_err() {
        warn!(target: LOG_TARGET, "Frame loop panicked");
    }

    if let Ok(result) = result_rx.try_recv() {
        return Ok(result);
    }

    if has_deadline {
        // The recording ran out first; wait for the deadline to settle it.
        return Ok(result_rx.recv().unwrap_or(ScanResult::Failed));
    }

    // No deadline and no consensus: report the best effort, as a deadline would.
    let best = session.optimal_card_details();
    session.stop();
    Ok(best.map_or(ScanResult::Failed, ScanResult::Scanned))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "cardscan=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    match run(&cli) {
        Ok(ScanResult::Scanned(details)) => {
            println!("{}", json!({ "status": "scanned", "card_details": details }));
            ExitCode::SUCCESS
        }
        Ok(ScanResult::Failed) => {
            println!("{}", json!({ "status": "failed" }));
            ExitCode::from(1)
        }
        Err(err) => {
            eprintln!("Error scanning card: {}", err);
            ExitCode::from(2)
        }
    }
}
