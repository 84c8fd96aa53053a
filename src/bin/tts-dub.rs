//! Командная строка tts-dub: озвучить сегменты из JSON и собрать дорожку

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;

use tts_dub::tts::HttpSpeechEngine;
use tts_dub::utils::logger::init_logger;
use tts_dub::utils::FfmpegToolkit;
use tts_dub::{DiarizationSpan, DubbingConfig, SegmentOutcome, TimedSegment, TtsDub};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON-массив сегментов с переводом
    #[arg(long)]
    segments: PathBuf,

    /// Оригинальная дорожка, из которой берутся голоса спикеров
    #[arg(long)]
    audio: PathBuf,

    /// Куда записать итоговую дорожку
    #[arg(long)]
    output: PathBuf,

    /// JSON-массив фрагментов диаризации
    #[arg(long)]
    diarization: Option<PathBuf>,

    /// JSON-файл конфигурации
    #[arg(long)]
    config: Option<PathBuf>,

    /// Адрес HTTP-сервера синтеза
    #[arg(long, default_value = "http://127.0.0.1:8020/tts")]
    endpoint: String,

    /// Язык синтеза (переопределяет конфигурацию)
    #[arg(long)]
    language: Option<String>,

    /// Пропустить изменение темпа, подгонять только обрезкой и тишиной
    #[arg(long)]
    radical: bool,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => DubbingConfig::from_json_file(path)?,
        None => DubbingConfig::default(),
    };
    if let Some(language) = args.language {
        config.language = language;
    }
    if args.radical {
        config.reconcile.radical_mode = true;
    }

    let segments: Vec<TimedSegment> = read_json(&args.segments)?;
    let diarization: Option<Vec<DiarizationSpan>> = match &args.diarization {
        Some(path) => Some(read_json(path)?),
        None => None,
    };

    let toolkit = FfmpegToolkit::new(&config.ffmpeg);
    if !toolkit.check_installed() {
        anyhow::bail!("ffmpeg is required but was not found");
    }
    log::info!("Using {}", toolkit.version()?);

    let engine = HttpSpeechEngine::new(args.endpoint)?;
    let dubber = TtsDub::new(config, Box::new(engine), Box::new(toolkit));

    let progress = |fraction: f32| log::info!("Progress: {:.0}%", fraction * 100.0);
    let report = dubber
        .process(
            &segments,
            &args.audio,
            diarization.as_deref(),
            &args.output,
            Some(&progress),
        )
        .await?;

    for segment in &report.segments {
        match &segment.outcome {
            SegmentOutcome::Speech { raw_duration, clip } if segment.deviation_flagged => log::warn!(
                "Segment {} ({}): {:.2}s -> {:.2}s, target {:.2}s",
                segment.index, segment.speaker_id, raw_duration, clip.duration, clip.target_duration
            ),
            SegmentOutcome::Silence { reason, .. } => log::info!(
                "Segment {} ({}): silence, {}",
                segment.index, segment.speaker_id, reason
            ),
            _ => {}
        }
    }

    log::info!(
        "Wrote {} ({} voiced segments, raw {:.2}s, final {:.2}s)",
        report.timeline_path.display(),
        report.speech_segments(),
        report.total_raw_duration,
        report.total_final_duration
    );

    Ok(())
}
