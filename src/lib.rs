//! Основной файл библиотеки tts-dub
//!
//! Библиотека озвучивает переведенные сегменты речи голосами исходных
//! спикеров и собирает из них дорожку, совпадающую по времени с оригиналом.
//! Движок синтеза и аудио-утилиты подключаются через трейты
//! [`SpeechSynthesizer`] и [`AudioToolkit`].

pub mod config;
pub mod error;
pub mod media;
pub mod progress;
pub mod speaker;
pub mod sync;
pub mod tts;
pub mod types;
pub mod utils;

#[cfg(test)]
mod tests;

use std::path::Path;

pub use crate::config::DubbingConfig;
pub use crate::error::{DubError, Result, SilenceReason};
pub use crate::media::AudioToolkit;
pub use crate::progress::{BroadcastProgress, ProgressObserver};
pub use crate::sync::{DurationReconciler, TimelineAssembler};
pub use crate::tts::SpeechSynthesizer;
pub use crate::types::{DiarizationSpan, SegmentOutcome, SegmentReport, TimedSegment, TimelineReport};

use crate::utils::WorkDir;

/// Основная структура для работы с библиотекой
pub struct TtsDub {
    /// Конфигурация
    config: DubbingConfig,
    /// Движок синтеза речи
    synthesizer: Box<dyn SpeechSynthesizer>,
    /// Аудио-утилиты
    toolkit: Box<dyn AudioToolkit>,
}

impl TtsDub {
    /// Создать экземпляр с указанной конфигурацией, движком и утилитами
    pub fn new(
        config: DubbingConfig,
        synthesizer: Box<dyn SpeechSynthesizer>,
        toolkit: Box<dyn AudioToolkit>,
    ) -> Self {
        Self {
            config,
            synthesizer,
            toolkit,
        }
    }

    pub fn config(&self) -> &DubbingConfig {
        &self.config
    }

    /// Озвучить сегменты и записать итоговую дорожку в `output`.
    ///
    /// `base_audio` - оригинальная дорожка, из которой берутся референсы
    /// голосов. Ошибка возвращается только при невалидной конфигурации,
    /// пустом списке сегментов или сбое итоговой склейки.
    pub async fn process(
        &self,
        segments: &[TimedSegment],
        base_audio: &Path,
        diarization: Option<&[DiarizationSpan]>,
        output: &Path,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<TimelineReport> {
        log::info!("Starting dubbing of {} segments", segments.len());

        self.config.validate()?;

        if !tokio::fs::try_exists(base_audio).await.unwrap_or(false) {
            let error = format!("Input audio file not found: {}", base_audio.display());
            log::error!("{}", error);
            return Err(DubError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, error)));
        }

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let work = WorkDir::new(self.config.work_dir.as_deref(), self.config.cleanup_temp_files)?;
        log::debug!("Working directory: {}", work.path().display());

        let mut assembler = TimelineAssembler::new(
            self.synthesizer.as_ref(),
            self.toolkit.as_ref(),
            &self.config,
            &work,
        );
        if let Some(spans) = diarization {
            assembler = assembler.with_diarization(spans);
        }

        let report = assembler.assemble(segments, base_audio, output, progress).await;

        if let Err(e) = work.cleanup() {
            log::warn!("Failed to clean up working directory: {}", e);
        }

        let report = report?;
        log::info!("Dubbing completed: {}", report.timeline_path.display());
        Ok(report)
    }
}
