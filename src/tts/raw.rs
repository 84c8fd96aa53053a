//! Сырой синтез сегмента: фрагменты текста озвучиваются по отдельности
//! и склеиваются в один клип. Если движок пишет аудио с другой частотой,
//! клип один раз передискретизируется к частоте таймлайна.

use std::path::{Path, PathBuf};

use crate::error::{DubError, Result};
use crate::media::AudioToolkit;
use crate::tts::{chunk_text, SpeechSynthesizer};
use crate::types::RawClip;
use crate::utils::WorkDir;

/// Адаптер между движком синтеза и конвейером
pub struct RawSynthesizer<'a> {
    engine: &'a dyn SpeechSynthesizer,
    toolkit: &'a dyn AudioToolkit,
    work: &'a WorkDir,
    max_chars: usize,
    sample_rate: u32,
}

impl<'a> RawSynthesizer<'a> {
    pub fn new(
        engine: &'a dyn SpeechSynthesizer,
        toolkit: &'a dyn AudioToolkit,
        work: &'a WorkDir,
        max_chars: usize,
        sample_rate: u32,
    ) -> Self {
        Self {
            engine,
            toolkit,
            work,
            max_chars,
            sample_rate,
        }
    }

    /// Озвучить текст сегмента.
    ///
    /// Неудачные фрагменты пропускаются. Ошибка возвращается, только если
    /// не удался ни один фрагмент или склейка.
    pub async fn synthesize(&self, text: &str, reference: &Path, language: &str) -> Result<RawClip> {
        let chunks = chunk_text(text, self.max_chars);
        if chunks.is_empty() {
            return Err(DubError::Synthesis("nothing to synthesize".to_string()));
        }

        let mut units: Vec<PathBuf> = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let output = self.work.file("chunk", "wav");
            match self.engine.synthesize(chunk, reference, language, &output).await {
                Ok(path) if path.exists() => units.push(path),
                Ok(path) => {
                    log::warn!("Chunk {}/{} reported {} but no file was written", i + 1, chunks.len(), path.display());
                }
                Err(e) => {
                    log::warn!("Chunk {}/{} failed to synthesize: {}", i + 1, chunks.len(), e);
                }
            }
        }

        if units.is_empty() {
            return Err(DubError::Synthesis(format!(
                "all {} chunks failed",
                chunks.len()
            )));
        }

        let raw_path = if units.len() == 1 {
            units[0].clone()
        } else {
            let raw_path = self.work.file("raw", "wav");
            let inputs: Vec<&Path> = units.iter().map(PathBuf::as_path).collect();
            self.toolkit
                .concat(&inputs, &raw_path)
                .map_err(|e| DubError::Synthesis(format!("failed to join chunks: {}", e)))?;
            for unit in &units {
                let _ = std::fs::remove_file(unit);
            }
            raw_path
        };

        let mut info = self
            .toolkit
            .probe(&raw_path)
            .map_err(|e| DubError::Synthesis(format!("failed to measure raw clip: {}", e)))?;

        let raw_path = if info.sample_rate != self.sample_rate {
            log::debug!("Resampling raw clip from {} Hz to {} Hz", info.sample_rate, self.sample_rate);
            let resampled = self.work.file("raw_rs", "wav");
            self.toolkit
                .extract(&raw_path, 0.0, info.duration, self.sample_rate, 1, &resampled)
                .map_err(|e| DubError::Synthesis(format!("failed to resample raw clip: {}", e)))?;
            let _ = std::fs::remove_file(&raw_path);
            info = self
                .toolkit
                .probe(&resampled)
                .map_err(|e| DubError::Synthesis(format!("failed to measure raw clip: {}", e)))?;
            resampled
        } else {
            raw_path
        };

        log::debug!(
            "Raw clip {}: {:.3}s @ {} Hz from {}/{} chunks",
            raw_path.display(),
            info.duration,
            info.sample_rate,
            units.len(),
            chunks.len()
        );

        Ok(RawClip {
            path: raw_path,
            info,
            chunks_synthesized: units.len(),
            chunks_total: chunks.len(),
        })
    }
}
