//! CLI entrypoint for the conversational voice-assistant pipeline.

use std::path::PathBuf;

use clap::Parser;
use interlocutor::audio::capture::AudioCapture;
use interlocutor::audio::playback::Playback;
use interlocutor::config::Config;
use interlocutor::llm::{HttpLlmClient, LlmStreamer};
use interlocutor::pipeline::Coordinator;
use interlocutor::stt::AsrStage;
use interlocutor::vad::EnergyVad;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "interlocutor", about = "Real-time conversational voice assistant")]
struct Cli {
    /// Path to a TOML config file. Missing file falls back to defaults.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// List available input devices and exit.
    #[arg(long)]
    list_input_devices: bool,

    /// List available output devices and exit.
    #[arg(long)]
    list_output_devices: bool,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    if cli.list_input_devices {
        for name in AudioCapture::list_input_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    if cli.list_output_devices {
        for name in Playback::list_output_devices()? {
            println!("{name}");
        }
        return Ok(());
    }

    let config = Config::load(&cli.config)?;

    let vad = Box::new(EnergyVad::new());
    let transcriber: Box<dyn interlocutor::stt::Transcriber> =
        Box::new(UnimplementedTranscriber);
    let asr = AsrStage::new(transcriber, config.stt.clone(), config.conversation.clone());

    let llm_client = Box::new(HttpLlmClient::new(config.llm.server_url.clone()));
    let llm = LlmStreamer::new(llm_client, config.llm.clone());

    let tts: Box<dyn interlocutor::tts::SpeechSynthesizer> =
        Box::new(UnimplementedSynthesizer {
            sample_rate: config.tts.sample_rate,
        });

    let mut coordinator = Coordinator::new(config, vad, asr, llm, tts);
    let shutdown = CancellationToken::new();

    let ctrl_c_shutdown = shutdown.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        ctrl_c_shutdown.cancel();
    });

    coordinator.run(shutdown).await?;
    Ok(())
}

/// Placeholder `Transcriber` until a real ASR engine is wired in. Kept here
/// (rather than in `src/stt`) so the library crate never ships a fake
/// collaborator as if it were a real one.
struct UnimplementedTranscriber;

impl interlocutor::stt::Transcriber for UnimplementedTranscriber {
    fn transcribe(&mut self, _samples: &[f32], _sample_rate: u32) -> interlocutor::Result<String> {
        Err(interlocutor::PipelineError::Asr(
            "no ASR engine configured; implement `Transcriber` and wire it in `main.rs`".into(),
        ))
    }
}

struct UnimplementedSynthesizer {
    sample_rate: u32,
}

impl interlocutor::tts::SpeechSynthesizer for UnimplementedSynthesizer {
    fn generate_speech_audio(&mut self, _text: &str) -> interlocutor::Result<Vec<f32>> {
        Err(interlocutor::PipelineError::Tts(
            "no TTS engine configured; implement `SpeechSynthesizer` and wire it in `main.rs`".into(),
        ))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
