//! dmdfpwm Player - Main entry point
//!
//! Plays a local or remote dMDFPWM container through a set of virtual sinks,
//! writing each sink's signed 8-bit PCM to `<output-dir>/<sink>.pcm`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dmdfpwm_common::{open_source, read_track, Track};
use dmdfpwm_player::codec::dfpwm_factory;
use dmdfpwm_player::sink::{drain_channel, QueueSink, Sink, SinkSet};
use dmdfpwm_player::{Error, PlaybackEvent, PlaybackSynchronizer, PlayerConfig, SinkRouter};
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "dmdfpwm_player=info,dmdfpwm_common=info";

/// Command-line arguments for dmdfpwm-player
#[derive(Parser, Debug)]
#[command(name = "dmdfpwm-player")]
#[command(about = "Multi-channel DFPWM container player")]
#[command(version)]
struct Args {
    /// Container path or http(s) URL
    input: String,

    /// Config file (TOML)
    #[arg(short, long, env = "DMDFPWM_CONFIG")]
    config: Option<PathBuf>,

    /// Sink id to create; repeat for several sinks (overrides config)
    #[arg(short, long = "sink")]
    sinks: Vec<String>,

    /// Directory for per-sink PCM output
    #[arg(short, long, env = "DMDFPWM_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Time units queued before the delivery barrier applies
    #[arg(long)]
    prefill: Option<u32>,

    /// Disable positional routing of unmapped channels
    #[arg(long)]
    no_auto_detect: bool,

    /// Print track information and exit
    #[arg(long)]
    info: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config =
        PlayerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    apply_overrides(&mut config, &args);

    init_tracing(config.logging.level.as_deref());

    info!("Opening {}", args.input);
    let mut source = open_source(&args.input, &config.source_options())
        .await
        .with_context(|| format!("Failed to open {}", args.input))?;

    let track = read_track(source.as_mut())
        .await
        .context("Failed to read container header")?;

    if args.info {
        print_track(&args.input, &track);
        source.close().await.context("Failed to close source")?;
        return Ok(());
    }

    if let Some(dir) = &config.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    }

    let (notifier, drains) = drain_channel();
    let options = config.queue_options(track.samples_per_frame());
    let mut sinks: Vec<Box<dyn Sink>> = Vec::new();
    for id in config.sink_ids(track.channel_count as usize) {
        let writer = sink_writer(config.output_dir.as_ref(), &id)?;
        sinks.push(Box::new(QueueSink::spawn(id, options, writer, notifier.clone())));
    }
    drop(notifier);
    let sinks = SinkSet::new(sinks);

    let router = SinkRouter::new(config.routing());
    let assignment = router.resolve(
        &track.channel_configs,
        track.channel_count as usize,
        &sinks.ids(),
    );

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    tokio::spawn(log_events(events_rx));

    let mut synchronizer = PlaybackSynchronizer::new(
        source,
        Arc::new(track),
        sinks,
        assignment,
        drains,
        &dfpwm_factory(),
        config.playback_settings(),
        cancel.clone(),
    )
    .with_events(events_tx);

    match synchronizer.run().await {
        Ok(report) => {
            let sinks = synchronizer.into_sinks();
            play_out_tail(sinks, &cancel).await;
            info!(
                frames = report.frames_played,
                decode_failures = report.decode_failures,
                "Done"
            );
            Ok(())
        }
        Err(Error::Cancelled) => {
            info!("Playback cancelled");
            Ok(())
        }
        Err(e) => Err(e).context("Playback failed"),
    }
}

fn init_tracing(level: Option<&str>) {
    let fallback = level.unwrap_or(DEFAULT_LOG_FILTER).to_string();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| fallback.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// CLI flags win over file values
fn apply_overrides(config: &mut PlayerConfig, args: &Args) {
    if !args.sinks.is_empty() {
        config.sinks = args.sinks.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = Some(dir.clone());
    }
    if let Some(prefill) = args.prefill {
        config.prefill_frames = prefill;
    }
    if args.no_auto_detect {
        config.auto_detect = false;
    }
}

fn sink_writer(output_dir: Option<&PathBuf>, id: &str) -> Result<Box<dyn Write + Send>> {
    match output_dir {
        Some(dir) => {
            let path = dir.join(format!("{}.pcm", id));
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::sink())),
    }
}

fn print_track(location: &str, track: &Track) {
    println!("{}", location);
    println!("  artist:      {}", track.metadata.artist());
    println!("  title:       {}", track.metadata.title());
    println!("  album:       {}", track.metadata.album());
    for (key, value) in track.metadata.entries() {
        if !matches!(key.as_str(), "artist" | "title" | "album") {
            println!("  {:<12} {}", format!("{}:", key), value);
        }
    }
    println!("  version:     {}", track.version);
    println!("  channels:    {}", track.channel_count);
    for ch in 0..track.channel_count as usize {
        let config = track.channel_config(ch);
        println!(
            "    [{}] {} filter={} bitrate={}",
            ch,
            config.and_then(|c| c.name.as_deref()).unwrap_or("-"),
            config.and_then(|c| c.filter.as_deref()).unwrap_or("-"),
            config
                .and_then(|c| c.bitrate)
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-".to_string()),
        );
    }
    println!("  frame bytes: {}", track.frame_byte_size);
    println!("  frames:      {}", track.total_frames);
    println!("  duration:    {:.1}s", track.duration_secs());
}

/// Wait until every sink has played its queue, or until cancelled
async fn play_out_tail(mut sinks: SinkSet, cancel: &CancellationToken) {
    loop {
        let pending = sinks.pending_samples();
        if pending == 0 {
            break;
        }
        debug!(pending, "Waiting for sinks to play out");

        tokio::select! {
            _ = cancel.cancelled() => {
                sinks.stop_all();
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }
}

async fn log_events(mut rx: mpsc::UnboundedReceiver<PlaybackEvent>) {
    let mut last_decile = 0;
    while let Some(event) = rx.recv().await {
        match event {
            PlaybackEvent::Started {
                total_frames,
                channels,
                sinks,
            } => info!(total_frames, channels, sinks, "Playback started"),
            PlaybackEvent::Progress {
                frame,
                total,
                percent,
            } => {
                let decile = (percent / 10.0) as u32;
                if decile > last_decile {
                    last_decile = decile;
                    info!("Progress {}/{} ({:.0}%)", frame, total, percent);
                }
            }
            PlaybackEvent::DecodeWarning { .. } => {}
            PlaybackEvent::Finished { frames_played } => {
                debug!(frames_played, "All frames delivered");
            }
            PlaybackEvent::Aborted { reason } => debug!(%reason, "Playback aborted"),
        }
    }
}

/// Cancel playback on Ctrl+C or SIGTERM
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping playback");
        },
        _ = terminate => {
            info!("Received terminate signal, stopping playback");
        },
    }

    cancel.cancel();
}
