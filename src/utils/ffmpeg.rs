//! Модуль для работы с FFmpeg
//!
//! `FfmpegToolkit` реализует `AudioToolkit` через вызовы `ffmpeg` и `ffprobe`.
//! Все промежуточные файлы - WAV с PCM 16 бит, поэтому склейка идет без
//! перекодирования.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use crate::config::FfmpegConfig;
use crate::error::{DubError, Result};
use crate::media::{self, AudioToolkit, TEMPO_PASS_MAX, TEMPO_PASS_MIN};
use crate::types::AudioInfo;

const PCM_CODEC: &str = "pcm_s16le";

/// Аудио-утилиты на базе FFmpeg
#[derive(Debug, Clone)]
pub struct FfmpegToolkit {
    ffmpeg: String,
    ffprobe: String,
}

impl Default for FfmpegToolkit {
    fn default() -> Self {
        Self::new(&FfmpegConfig::default())
    }
}

impl FfmpegToolkit {
    pub fn new(config: &FfmpegConfig) -> Self {
        Self {
            ffmpeg: config.ffmpeg_path.clone(),
            ffprobe: config.ffprobe_path.clone(),
        }
    }

    /// Проверка наличия FFmpeg
    pub fn check_installed(&self) -> bool {
        Command::new(&self.ffmpeg)
            .arg("-version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }

    /// Получение версии FFmpeg
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.ffmpeg).arg("-version").output()?;
        if !output.status.success() {
            return Err(DubError::AudioProcessing("Failed to get FFmpeg version".to_string()));
        }

        let version_str = String::from_utf8_lossy(&output.stdout);
        Ok(version_str.lines().next().unwrap_or("").to_string())
    }

    /// Запуск команды FFmpeg
    fn run_ffmpeg(&self, args: &[String]) -> Result<()> {
        log::debug!("{} {}", self.ffmpeg, args.join(" "));
        let output = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(args)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DubError::AudioProcessing(format!(
                "FFmpeg command failed with status {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    /// Запуск команды FFprobe
    fn run_ffprobe(&self, args: &[String]) -> Result<String> {
        let output = Command::new(&self.ffprobe).args(args).output()?;

        if !output.status.success() {
            return Err(DubError::AudioProcessing(format!(
                "FFprobe command failed with status: {}",
                output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

impl AudioToolkit for FfmpegToolkit {
    fn extract(
        &self,
        input: &Path,
        start: f64,
        end: f64,
        sample_rate: u32,
        channels: u16,
        output: &Path,
    ) -> Result<()> {
        if end <= start {
            return Err(DubError::AudioProcessing(format!(
                "Empty extraction window {:.3}..{:.3}",
                start, end
            )));
        }

        let args = vec![
            "-ss".to_string(), format!("{:.3}", start.max(0.0)),
            "-t".to_string(), format!("{:.3}", end - start.max(0.0)),
            "-i".to_string(), path_arg(input),
            "-ac".to_string(), channels.to_string(),
            "-ar".to_string(), sample_rate.to_string(),
            "-c:a".to_string(), PCM_CODEC.to_string(),
            path_arg(output),
        ];
        self.run_ffmpeg(&args)
    }

    fn concat(&self, inputs: &[&Path], output: &Path) -> Result<()> {
        if inputs.is_empty() {
            return Err(DubError::AudioProcessing("Nothing to concatenate".to_string()));
        }

        // Создаем временный файл со списком входных файлов
        let temp_dir = tempfile::tempdir()?;
        let list_path = temp_dir.path().join("concat_list.txt");
        let mut list = std::fs::File::create(&list_path)?;
        for input in inputs {
            writeln!(list, "file '{}'", escape_concat_path(input))?;
        }
        drop(list);

        let args = vec![
            "-f".to_string(), "concat".to_string(),
            "-safe".to_string(), "0".to_string(),
            "-i".to_string(), path_arg(&list_path),
            "-c".to_string(), "copy".to_string(),
            path_arg(output),
        ];
        self.run_ffmpeg(&args)
    }

    fn probe(&self, input: &Path) -> Result<AudioInfo> {
        match media::probe_file(input) {
            Ok(info) => Ok(info),
            Err(DubError::Io(e)) => Err(DubError::Io(e)),
            Err(e) => {
                log::debug!("Native probe failed for {}: {}, falling back to ffprobe", input.display(), e);
                let args = vec![
                    "-v".to_string(), "error".to_string(),
                    "-select_streams".to_string(), "a:0".to_string(),
                    "-show_entries".to_string(), "format=duration:stream=sample_rate".to_string(),
                    "-of".to_string(), "json".to_string(),
                    path_arg(input),
                ];
                let stdout = self.run_ffprobe(&args)?;
                parse_ffprobe_json(&stdout)
            }
        }
    }

    fn apply_tempo(&self, input: &Path, ratio: f64, output: &Path) -> Result<()> {
        if !(TEMPO_PASS_MIN..=TEMPO_PASS_MAX).contains(&ratio) {
            return Err(DubError::AudioProcessing(format!(
                "Tempo ratio {:.4} outside of [{}, {}]",
                ratio, TEMPO_PASS_MIN, TEMPO_PASS_MAX
            )));
        }

        let args = vec![
            "-i".to_string(), path_arg(input),
            "-filter:a".to_string(), format!("atempo={:.6}", ratio),
            "-c:a".to_string(), PCM_CODEC.to_string(),
            path_arg(output),
        ];
        self.run_ffmpeg(&args)
    }

    fn generate_silence(&self, duration: f64, sample_rate: u32, output: &Path) -> Result<()> {
        let args = vec![
            "-f".to_string(), "lavfi".to_string(),
            "-i".to_string(), format!("anullsrc=r={}:cl=mono", sample_rate),
            "-t".to_string(), format!("{:.6}", duration),
            "-c:a".to_string(), PCM_CODEC.to_string(),
            path_arg(output),
        ];
        self.run_ffmpeg(&args)
    }

    fn trim(&self, input: &Path, duration: f64, output: &Path) -> Result<()> {
        let args = vec![
            "-i".to_string(), path_arg(input),
            "-t".to_string(), format!("{:.6}", duration),
            "-c:a".to_string(), PCM_CODEC.to_string(),
            path_arg(output),
        ];
        self.run_ffmpeg(&args)
    }
}

/// Экранирование пути для списка concat-демультиплексора
fn escape_concat_path(path: &Path) -> String {
    path_arg(path).replace('\'', "'\\''")
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    sample_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Разбор JSON-вывода ffprobe
fn parse_ffprobe_json(json: &str) -> Result<AudioInfo> {
    let parsed: FfprobeOutput = serde_json::from_str(json)?;

    let duration_str = parsed
        .format
        .and_then(|f| f.duration)
        .ok_or_else(|| DubError::AudioProcessing("ffprobe reported no duration".to_string()))?;
    let duration = duration_str.trim().parse::<f64>().map_err(|_| {
        DubError::AudioProcessing(format!("Failed to parse audio duration: {}", duration_str))
    })?;

    let sample_rate = parsed
        .streams
        .iter()
        .filter_map(|s| s.sample_rate.as_deref())
        .find_map(|rate| rate.trim().parse::<u32>().ok())
        .ok_or_else(|| DubError::AudioProcessing("ffprobe reported no sample rate".to_string()))?;

    Ok(AudioInfo { duration, sample_rate })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ffprobe_json() {
        let json = r#"{
            "programs": [],
            "streams": [{"sample_rate": "24000"}],
            "format": {"duration": "3.251000"}
        }"#;

        let info = parse_ffprobe_json(json).unwrap();
        assert_eq!(info.sample_rate, 24_000);
        assert!((info.duration - 3.251).abs() < 1e-9);
    }

    #[test]
    fn test_parse_ffprobe_json_without_stream() {
        let json = r#"{"streams": [], "format": {"duration": "1.0"}}"#;
        assert!(parse_ffprobe_json(json).is_err());
    }

    #[test]
    fn test_escape_concat_path() {
        let escaped = escape_concat_path(Path::new("/tmp/it's.wav"));
        assert_eq!(escaped, "/tmp/it'\\''s.wav");
    }

    #[test]
    fn test_tempo_out_of_range_rejected() {
        let toolkit = FfmpegToolkit::default();
        let result = toolkit.apply_tempo(Path::new("in.wav"), 4.5, Path::new("out.wav"));
        assert!(matches!(result, Err(DubError::AudioProcessing(_))));
    }
}
