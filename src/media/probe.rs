//! Измерение аудиофайлов без запуска внешних процессов
//!
//! WAV читается через hound (точнее и быстрее), остальные контейнеры
//! через Symphonia.

use std::fs::File;
use std::path::Path;

use hound::WavReader;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{DubError, Result};
use crate::types::AudioInfo;

/// Определить длительность и частоту дискретизации аудиофайла
pub fn probe_file(path: &Path) -> Result<AudioInfo> {
    if !path.exists() {
        return Err(DubError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Audio file not found: {}", path.display()),
        )));
    }

    if is_wav(path) {
        match probe_wav(path) {
            Ok(info) => return Ok(info),
            Err(e) => log::debug!("hound could not read {}: {}, trying symphonia", path.display(), e),
        }
    }

    probe_with_symphonia(path)
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

fn probe_wav(path: &Path) -> Result<AudioInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    // duration() возвращает число семплов на канал
    let frames = reader.duration();

    Ok(AudioInfo {
        duration: frames as f64 / spec.sample_rate as f64,
        sample_rate: spec.sample_rate,
    })
}

fn probe_with_symphonia(path: &Path) -> Result<AudioInfo> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| DubError::AudioProcessing(format!("Unsupported audio format {}: {}", path.display(), e)))?;

    let mut format = probed.format;
    let (track_id, sample_rate, n_frames) = {
        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DubError::AudioProcessing(format!("No audio track in {}", path.display())))?;
        (track.id, track.codec_params.sample_rate, track.codec_params.n_frames)
    };

    let sample_rate = sample_rate
        .ok_or_else(|| DubError::AudioProcessing(format!("Unknown sample rate in {}", path.display())))?;

    // Не все контейнеры хранят число кадров в заголовке
    let frames = match n_frames {
        Some(frames) => frames,
        None => {
            let mut total = 0u64;
            while let Ok(packet) = format.next_packet() {
                if packet.track_id() == track_id {
                    total += packet.dur();
                }
            }
            total
        }
    };

    Ok(AudioInfo {
        duration: frames as f64 / sample_rate as f64,
        sample_rate,
    })
}
