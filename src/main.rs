use anyhow::{Context, Result};
use clap::Parser;
use segment_recorder::{
    Config, ConversionDispatcher, ConversionOutcome, ConversionPipeline, EncoderPreference,
    EncoderSelector, FfmpegProbe, FfmpegRunner, SegmentRecorder, StreamChunk,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tracing::{info, warn, Level};

const READ_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Parser)]
#[command(name = "segment-recorder")]
#[command(about = "Record a byte stream into rotating segments and convert them to mp4")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/segment-recorder")]
    config: String,

    /// Input file, or `-` for stdin
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Account identifier used in filenames
    #[arg(long)]
    account: Option<String>,

    /// Filename pattern
    #[arg(long)]
    pattern: Option<String>,

    /// Maximum segment size in MB (0 = unlimited)
    #[arg(long)]
    max_filesize: Option<u64>,

    /// Maximum segment duration in minutes (0 = unlimited)
    #[arg(long)]
    max_duration: Option<u64>,

    /// Keep segments as recorded
    #[arg(long)]
    no_convert: bool,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let mut cfg = Config::load(&args.config)?;
    if let Some(account) = args.account {
        cfg.recording.account = account;
    }
    if let Some(pattern) = args.pattern {
        cfg.recording.pattern = pattern;
    }
    if let Some(mb) = args.max_filesize {
        cfg.recording.max_filesize_mb = mb;
    }
    if let Some(min) = args.max_duration {
        cfg.recording.max_duration_min = min;
    }
    if args.no_convert {
        cfg.conversion.enabled = false;
    }

    info!("Segment recorder v{}", env!("CARGO_PKG_VERSION"));
    info!("Pattern: {}", cfg.recording.pattern);
    info!(
        "Rotation: {} MB / {} min, conversion {}",
        cfg.recording.max_filesize_mb,
        cfg.recording.max_duration_min,
        if cfg.conversion.enabled { "enabled" } else { "disabled" }
    );

    let selector = Arc::new(EncoderSelector::new(
        Arc::new(FfmpegProbe::new(&cfg.conversion.ffmpeg_path)),
        EncoderPreference::default(),
    ));
    let runner = Arc::new(FfmpegRunner::new(&cfg.conversion.ffmpeg_path));
    let pipeline = Arc::new(ConversionPipeline::new(selector, runner));
    let dispatcher = Arc::new(ConversionDispatcher::new(pipeline));

    let mut recorder = SegmentRecorder::new(cfg.segment_config());
    if cfg.conversion.enabled {
        recorder = recorder.with_submitter(dispatcher.clone());
    }

    let (tx, rx) = mpsc::channel(64);
    let mut reader = tokio::spawn(read_input(args.input, tx));
    let recording = tokio::spawn(async move { recorder.record(rx).await });

    let interrupted = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, finalizing current segment");
            reader.abort();
            true
        }
        res = &mut reader => {
            res.context("Input reader panicked")??;
            false
        }
    };

    let segments = recording.await.context("Recorder task panicked")??;
    info!("Recorded {} segments", segments.len());

    let outcomes = if interrupted {
        dispatcher.shutdown().await
    } else {
        // Keep the drain alive across Ctrl-C so cancelled jobs are still collected
        let drain = dispatcher.drain();
        tokio::pin!(drain);
        tokio::select! {
            outcomes = &mut drain => outcomes,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, cancelling conversions");
                dispatcher.cancel();
                drain.await
            }
        }
    };

    for outcome in &outcomes {
        match outcome {
            ConversionOutcome::Converted { destination, .. } => {
                info!("  - {}", destination.display())
            }
            ConversionOutcome::Failed { source, .. } | ConversionOutcome::Cancelled { source } => {
                warn!("  - {} (not converted)", source.display())
            }
        }
    }

    Ok(())
}

/// Forward input bytes to the recorder, timing each chunk by wall clock.
async fn read_input(input: String, tx: mpsc::Sender<StreamChunk>) -> Result<()> {
    let mut source: Box<dyn AsyncRead + Unpin + Send> = if input == "-" {
        Box::new(tokio::io::stdin())
    } else {
        Box::new(
            tokio::fs::File::open(&input)
                .await
                .with_context(|| format!("Failed to open input {}", input))?,
        )
    };

    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut last = Instant::now();
    loop {
        let n = source.read(&mut buf).await.context("Failed to read input")?;
        if n == 0 {
            break;
        }

        let now = Instant::now();
        let chunk = StreamChunk {
            bytes: buf[..n].to_vec(),
            duration_secs: now.duration_since(last).as_secs_f64(),
        };
        last = now;

        if tx.send(chunk).await.is_err() {
            break;
        }
    }

    Ok(())
}
