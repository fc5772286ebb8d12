use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::atomic::Ordering;
use tracing::info;

use meeting_scribe::audio::{CaptureSourceFactory, SignalConditioner, SourceSpec};
use meeting_scribe::recognizer::WhisperProvider;
use meeting_scribe::recorder::{MeetingRecorder, TranscriptNotepad};
use meeting_scribe::session::{ProgressReporter, TranscriptionSession};
use meeting_scribe::Config;

#[derive(Parser)]
#[command(
    name = "meeting-scribe",
    about = "Record meetings and transcribe speech with Whisper",
    version
)]
struct Cli {
    /// Path to a configuration file (defaults to config/meeting-scribe.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Transcribe a single audio file and print a JSON result line
    Transcribe {
        /// Path to a WAV audio file
        file: String,

        /// Stream JSON progress records before the final result
        #[arg(long)]
        progress: bool,

        /// Include word-level timestamps in the result
        #[arg(long)]
        words: bool,
    },

    /// Record from the configured sources until interrupted, appending
    /// transcripts to the notepad file
    Record,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout is reserved for structured results
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Transcribe {
            file,
            progress,
            words,
        } => transcribe(config, &file, progress, words),
        Command::Record => record(config).await,
    }
}

fn transcribe(config: Config, file: &str, progress: bool, words: bool) -> Result<()> {
    let mut session =
        TranscriptionSession::new(Box::new(WhisperProvider), config.model, config.session)
            .context("Failed to load Whisper model")?;

    if progress {
        session = session.with_reporter(ProgressReporter::stdout());
    }

    let result = session.transcribe_file(file, words);
    println!("{}", serde_json::to_string(&result)?);

    Ok(())
}

async fn record(config: Config) -> Result<()> {
    info!("Meeting Scribe v{}", env!("CARGO_PKG_VERSION"));
    info!("Using model: {}", config.model.primary);
    info!("Transcripts will be saved to: {}", config.recorder.notepad_file);
    if config.conditioning.noise_reduction {
        info!("Noise reduction: enabled");
    }
    if config.conditioning.silence_removal {
        info!("Silence removal: enabled");
    }

    let mut sources = Vec::new();
    for spec in &config.recorder.sources {
        let spec = SourceSpec::parse(spec)?;
        sources.push(CaptureSourceFactory::create(&spec, config.audio.sample_rate)?);
    }

    let session = TranscriptionSession::new(
        Box::new(WhisperProvider),
        config.model.clone(),
        config.session.clone(),
    )
    .context("Failed to load Whisper model")?;

    let conditioner = SignalConditioner::new(config.conditioning.clone());
    let notepad = TranscriptNotepad::new(&config.recorder.notepad_file, &config.model.primary);

    let mut recorder =
        MeetingRecorder::new(sources, conditioner, session, notepad, config.recorder)?;

    // Stop between cycles on ctrl-c; an in-flight capture completes first
    let stop = recorder.stop_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Stop requested, finishing current cycle...");
            stop.store(true, Ordering::SeqCst);
        }
    });

    let stats = recorder.run().await?;
    info!(
        "Recorded {} transcript entries over {:.1}s",
        stats.entries_appended, stats.duration_secs
    );

    Ok(())
}
