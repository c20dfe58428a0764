// Murmur Command Line Interface
// Speaks large texts through the chunked synthesizer

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use murmur_core::{ChunkerConfig, LoggingConfig, MurmurConfig};
use murmur_spk::chunker::ChunkAssigner;
use murmur_spk::wav::write_wav;
use murmur_spk::{
    ChunkSizing, EspeakVoice, Segmenter, SentenceSegmenter, TtsChunker, Voice, VoiceRegistry,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const STREAM_POLL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "murmur")]
#[command(about = "Murmur - speak large texts with chunked, parallel synthesis", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, short, global = true)]
    config: Option<String>,

    #[arg(long, short, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize text to a WAV file
    Speak {
        #[command(flatten)]
        source: TextSource,

        /// Output WAV file
        #[arg(long, short)]
        out: PathBuf,

        /// Voice name passed to espeak-ng
        #[arg(long)]
        voice: Option<String>,

        #[command(flatten)]
        chunking: ChunkingArgs,

        /// Write each newly available fragment to this directory as it arrives
        #[arg(long)]
        stream_dir: Option<PathBuf>,
    },

    /// Show how text would be split into chunks, without synthesizing
    Plan {
        #[command(flatten)]
        source: TextSource,

        #[command(flatten)]
        chunking: ChunkingArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// List available voices
    Voices,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct TextSource {
    /// Read text from a file
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// Text given on the command line
    #[arg(long, short)]
    text: Option<String>,
}

impl TextSource {
    async fn read(&self) -> anyhow::Result<String> {
        match (&self.input, &self.text) {
            (Some(path), _) => tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display())),
            (None, Some(text)) => Ok(text.clone()),
            (None, None) => Err(anyhow::anyhow!("Either --input or --text must be provided")),
        }
    }
}

#[derive(Args, Debug, Default)]
struct ChunkingArgs {
    /// Number of synthesis workers
    #[arg(long, short)]
    jobs: Option<usize>,

    /// Steady-state words per chunk
    #[arg(long)]
    chunk_words: Option<usize>,

    /// Use the same chunk size from the start
    #[arg(long)]
    no_grow: bool,
}

impl ChunkingArgs {
    fn apply(&self, config: &mut ChunkerConfig) {
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(words) = self.chunk_words {
            config.chunk_words = words;
            config.initial_chunk_words = config.initial_chunk_words.min(words);
        }
        if self.no_grow {
            config.grow_chunks = false;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.logging, cli.verbose, cli.json_logs);

    match cli.command {
        Commands::Speak {
            source,
            out,
            voice,
            chunking,
            stream_dir,
        } => {
            let text = source.read().await?;
            speak(config, &text, voice, &chunking, &out, stream_dir).await?;
        }
        Commands::Plan {
            source,
            chunking,
            json,
        } => {
            let text = source.read().await?;
            plan(config, &text, &chunking, json)?;
        }
        Commands::Voices => {
            list_voices(&config)?;
        }
    }

    Ok(())
}

/// Defaults, then the config file, then `MURMUR_*` variables
fn load_config(path: Option<&str>) -> anyhow::Result<MurmurConfig> {
    let mut config = match path {
        Some(path) => MurmurConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => MurmurConfig::default(),
    };
    config.apply_env(|key| std::env::var(key).ok());
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn init_logging(logging: &LoggingConfig, verbose: bool, json_logs: bool) {
    let level = if verbose {
        "debug"
    } else {
        logging.level.as_str()
    };
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json_logs || logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn speak(
    mut config: MurmurConfig,
    text: &str,
    voice_name: Option<String>,
    chunking: &ChunkingArgs,
    out: &Path,
    stream_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    chunking.apply(&mut config.chunker);
    if let Some(name) = voice_name {
        config.voice.name = Some(name);
    }

    let voice = EspeakVoice::new(config.voice.clone())?;
    if !voice.is_available() {
        return Err(anyhow::anyhow!("espeak-ng is not installed or not on PATH"));
    }

    if let Some(dir) = &stream_dir {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let chunker = Arc::new(TtsChunker::new(config.chunker.clone())?);
    let first_audio = chunker.first_audio_timeout();
    let started = Instant::now();
    let job_id = chunker.start_synthesis(text, Arc::new(voice))?;
    info!(%job_id, "Speaking {} bytes of text", text.len());

    let mut drain = {
        let chunker = Arc::clone(&chunker);
        tokio::task::spawn_blocking(move || {
            drain_stream(&chunker, stream_dir.as_deref(), first_audio)
        })
    };

    let parts = tokio::select! {
        result = &mut drain => result??,
        _ = tokio::signal::ctrl_c() => {
            warn!(%job_id, "Interrupted, cancelling synthesis");
            let canceller = Arc::clone(&chunker);
            tokio::task::spawn_blocking(move || canceller.cancel()).await?;
            drain.await??
        }
    };

    let audio = chunker.get_all_audio();
    let progress = chunker.progress();
    write_wav(out, &audio).with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "Wrote {} ({:.1}s of audio, {} chunks, {} failed, {} stream parts) in {:.1}s",
        out.display(),
        audio.duration().as_secs_f64(),
        progress.completed,
        progress.failed,
        parts,
        started.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Read fragments in order until the job is done. Returns how many were read.
fn drain_stream(
    chunker: &TtsChunker,
    stream_dir: Option<&Path>,
    first_audio: Duration,
) -> anyhow::Result<usize> {
    if !chunker.wait_for_audio(Some(first_audio)) && !chunker.is_done() {
        chunker.cancel();
        return Err(anyhow::anyhow!(
            "No audio within {}s, giving up",
            first_audio.as_secs()
        ));
    }

    let mut parts = 0;
    for audio in chunker.stream(Some(STREAM_POLL)) {
        if let Some(dir) = stream_dir {
            let path = dir.join(format!("part-{:04}.wav", parts));
            write_wav(&path, &audio)?;
            info!(
                part = parts,
                seconds = audio.duration().as_secs_f64(),
                "Wrote {}",
                path.display()
            );
        }
        parts += 1;
    }
    Ok(parts)
}

fn plan(
    mut config: MurmurConfig,
    text: &str,
    chunking: &ChunkingArgs,
    json: bool,
) -> anyhow::Result<()> {
    chunking.apply(&mut config.chunker);
    config.chunker.validate()?;

    let segmenter = SentenceSegmenter::with_max_bytes(config.chunker.max_text_bytes);
    let sentences = segmenter.split(text)?;
    let sizing = ChunkSizing::from(&config.chunker);
    let assigner = ChunkAssigner::new(sentences, sizing);

    if json {
        let units: Vec<_> = assigner
            .units()
            .map(|unit| {
                json!({
                    "chunk_id": unit.chunk_id,
                    "words": unit.word_count,
                    "sentences": unit.sentences,
                })
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "sizing": sizing, "chunks": units }))?
        );
        return Ok(());
    }

    let mut chunks = 0;
    for unit in assigner.units() {
        println!(
            "[{:>4}] {:>5} words  {}",
            unit.chunk_id,
            unit.word_count,
            preview(&unit.text(), 60)
        );
        chunks += 1;
    }
    println!("{} chunks, {} workers", chunks, config.chunker.jobs);
    Ok(())
}

fn list_voices(config: &MurmurConfig) -> anyhow::Result<()> {
    let espeak = EspeakVoice::new(config.voice.clone())?;
    let (installed, styles) = if espeak.is_available() {
        (espeak.list_voices()?, espeak.list_styles()?)
    } else {
        (Vec::new(), Vec::new())
    };

    let mut registry = VoiceRegistry::new();
    registry.register(Arc::new(espeak));

    for voice in registry.voices() {
        println!(
            "{:<16} {:<10} {:>6} Hz  {}",
            voice.name(),
            voice.backend(),
            voice.sample_rate(),
            if voice.is_available() {
                "available"
            } else {
                "unavailable"
            }
        );
    }

    if !installed.is_empty() {
        println!("\nespeak-ng voices: {}", installed.join(", "));
    }
    if !styles.is_empty() {
        println!("espeak-ng styles: {}", styles.join(", "));
    }
    Ok(())
}

/// First `max_chars` characters of `text`, with an ellipsis when cut
fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
