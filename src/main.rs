use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use hatseye::api::ApiServerBuilder;
use hatseye::config::file;
use hatseye::{
    Config, EncodedImage, GeminiTransport, Reply, SpeechSynthesizer, VisionAssistant,
    WakePhraseMatcher,
};

/// HatsEye - describe what the camera sees, out loud
#[derive(Parser)]
#[command(name = "hatseye", version, about)]
struct Cli {
    /// Config file (defaults to ~/.config/hatseye/config.toml)
    #[arg(short, long, env = "HATSEYE_CONFIG")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API for the web UI
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Directory holding the web UI
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Ask one question about an image
    Ask {
        /// JPEG image to analyze
        #[arg(short, long)]
        image: PathBuf,
        /// Question about the image
        #[arg(default_value = "What is in this image?")]
        question: String,
        /// Write spoken answer (MP3) to this file
        #[arg(long)]
        audio_out: Option<PathBuf>,
    },
    /// Answer questions typed on stdin about the latest camera frame
    Interactive {
        /// Only answer after the wake phrase ("hey hats eye")
        #[arg(long)]
        wake: bool,
        /// Latest-frame JPEG (overrides config)
        #[arg(long)]
        frame: Option<PathBuf>,
        /// Write each spoken answer (MP3) to this file
        #[arg(long)]
        audio_out: Option<PathBuf>,
    },
    /// List candidate models in the order they would be tried
    Models,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,hatseye=info",
        1 => "info,hatseye=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_sources(file::load_config_file_from(path), |key| {
            std::env::var(key).ok()
        }),
        None => Config::load(),
    };

    match cli.command {
        Command::Serve { port, static_dir } => serve(&config, port, static_dir).await,
        Command::Ask {
            image,
            question,
            audio_out,
        } => ask(&config, &image, &question, audio_out.as_deref()).await,
        Command::Interactive {
            wake,
            frame,
            audio_out,
        } => interactive(&config, wake, frame, audio_out.as_deref()).await,
        Command::Models => models(&config).await,
    }
}

/// Build the vision assistant from config
fn build_assistant(config: &Config) -> anyhow::Result<Arc<VisionAssistant>> {
    let key = config
        .api_keys
        .gemini
        .clone()
        .context("GEMINI_API_KEY not set (env or [api_keys] gemini in config)")?;

    let transport = GeminiTransport::new(key)?
        .with_base_url(&config.inference.base_url)
        .with_timeouts(
            config.inference.request_timeout,
            config.inference.catalog_timeout,
        );

    let assistant = VisionAssistant::new(Arc::new(transport))
        .with_policy(config.catalog.clone())
        .with_api_versions(config.inference.api_versions.clone())
        .with_generation(config.inference.generation);

    Ok(Arc::new(assistant))
}

/// Build the speech synthesizer, if voice is enabled and keyed
fn build_tts(config: &Config) -> Option<Arc<SpeechSynthesizer>> {
    if !config.voice.enabled {
        tracing::info!("voice output disabled");
        return None;
    }

    let Some(key) = config.api_keys.elevenlabs.clone() else {
        tracing::info!("no ElevenLabs API key, voice output unavailable");
        return None;
    };

    match new_synthesizer(key, config) {
        Ok(tts) => Some(Arc::new(tts)),
        Err(e) => {
            tracing::warn!(error = %e, "failed to initialize TTS");
            None
        }
    }
}

fn new_synthesizer(key: SecretString, config: &Config) -> hatseye::Result<SpeechSynthesizer> {
    SpeechSynthesizer::new(key, config.voice.voice_id.clone(), config.voice.model.clone())
}

async fn serve(
    config: &Config,
    port: Option<u16>,
    static_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.api_server.port);
    tracing::info!(port, "starting hatseye");

    let mut builder = ApiServerBuilder::new(port)
        .frame_path(config.frame_path.clone())
        .max_image_bytes(config.inference.max_image_bytes)
        .static_dir(static_dir.or_else(|| config.api_server.static_dir.clone()));

    match build_assistant(config) {
        Ok(assistant) => builder = builder.assistant(assistant),
        Err(e) => tracing::warn!("vision unavailable: {e:#}"),
    }
    if let Some(tts) = build_tts(config) {
        builder = builder.tts(tts);
    }

    builder.build().run().await?;
    Ok(())
}

async fn ask(
    config: &Config,
    image: &Path,
    question: &str,
    audio_out: Option<&Path>,
) -> anyhow::Result<()> {
    let assistant = build_assistant(config)?;
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("failed to read {}", image.display()))?;
    let image = EncodedImage::from_jpeg(&bytes, config.inference.max_image_bytes)?;

    let reply = assistant.ask(&image, question).await;
    println!("{}", reply.text);

    if let Some(path) = audio_out {
        speak_to_file(config, &reply, path).await?;
    }
    Ok(())
}

async fn interactive(
    config: &Config,
    wake: bool,
    frame: Option<PathBuf>,
    audio_out: Option<&Path>,
) -> anyhow::Result<()> {
    let assistant = build_assistant(config)?;
    let frame_path = frame
        .or_else(|| config.frame_path.clone())
        .context("no frame file (pass --frame or set HATSEYE_FRAME_PATH)")?;
    let matcher = WakePhraseMatcher::new(config.voice.wake_phrases.clone());

    if wake {
        eprintln!("Wake phrase: \"hey hats eye\", then ask your question. Type \"quit\" to exit.");
    } else {
        eprintln!("Ask a question about what the camera sees. Type \"quit\" to exit.");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut awake = !wake;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line.to_lowercase().as_str(), "quit" | "exit" | "q") {
            break;
        }

        let question = if awake {
            line.to_string()
        } else if matcher.matches(line) {
            match matcher.strip(line) {
                Some(question) => question,
                None => {
                    eprintln!("Listening...");
                    awake = true;
                    continue;
                }
            }
        } else {
            tracing::debug!(input = line, "no wake phrase, ignoring");
            continue;
        };
        awake = !wake;

        let image = match tokio::fs::read(&frame_path).await {
            Ok(bytes) => EncodedImage::from_jpeg(&bytes, config.inference.max_image_bytes),
            Err(e) => Err(e.into()),
        };
        let image = match image {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(path = %frame_path.display(), error = %e, "frame unavailable");
                eprintln!("Could not capture camera frame");
                continue;
            }
        };

        let reply = assistant.ask(&image, &question).await;
        println!("{}", reply.text);

        if let Some(path) = audio_out {
            if let Err(e) = speak_to_file(config, &reply, path).await {
                tracing::warn!("speech failed: {e:#}");
            }
        }
    }

    Ok(())
}

async fn models(config: &Config) -> anyhow::Result<()> {
    let assistant = build_assistant(config)?;
    for candidate in assistant.models().await {
        println!(
            "{:<32} {:<6} {:?}",
            candidate.id,
            format!("{:?}", candidate.tier).to_lowercase(),
            candidate.origin
        );
    }
    Ok(())
}

/// Synthesize a speakable reply and write the MP3 to `path`
async fn speak_to_file(config: &Config, reply: &Reply, path: &Path) -> anyhow::Result<()> {
    let tts = build_tts(config).context("voice output unavailable")?;

    match tts.speak(reply).await? {
        Some(audio) => {
            tokio::fs::write(path, &audio)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(bytes = audio.len(), path = %path.display(), "speech written");
        }
        None => tracing::debug!("reply suppressed, no audio written"),
    }
    Ok(())
}
