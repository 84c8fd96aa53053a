//! # Типы данных дубляжа
//!
//! Сегменты с временными метками, фрагменты диаризации и результаты
//! обработки, которыми обмениваются компоненты конвейера.

use std::path::PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::SilenceReason;

/// Сегмент речи с временными метками, спикером и переводом.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedSegment {
    /// Начало сегмента в секундах
    #[serde(default)]
    pub start: Option<f64>,
    /// Конец сегмента в секундах
    #[serde(default)]
    pub end: Option<f64>,
    /// Идентификатор спикера из диаризации
    #[serde(default)]
    pub speaker_id: String,
    /// Текст на исходном языке
    #[serde(default)]
    pub source_text: String,
    /// Текст на целевом языке, который будет озвучен
    #[serde(default)]
    pub target_text: String,
}

impl TimedSegment {
    pub fn new(start: f64, end: f64, speaker_id: impl Into<String>, target_text: impl Into<String>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            speaker_id: speaker_id.into(),
            source_text: String::new(),
            target_text: target_text.into(),
        }
    }

    /// Окно сегмента, если известны обе границы
    pub fn window(&self) -> Option<(f64, f64)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    pub fn duration(&self) -> Option<f64> {
        self.window().map(|(start, end)| end - start)
    }

    pub fn has_text(&self) -> bool {
        !self.target_text.trim().is_empty()
    }
}

/// Интервал активности спикера, полученный от диаризации
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiarizationSpan {
    pub speaker_id: String,
    pub start: f64,
    pub end: f64,
}

impl DiarizationSpan {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Измеренные параметры аудиофайла
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioInfo {
    /// Длительность в секундах
    pub duration: f64,
    /// Частота дискретизации в Гц
    pub sample_rate: u32,
}

/// Сырой клип сегмента, полученный склейкой всех удачных фрагментов синтеза
#[derive(Debug, Clone, PartialEq)]
pub struct RawClip {
    pub path: PathBuf,
    pub info: AudioInfo,
    /// Сколько фрагментов текста было синтезировано успешно
    pub chunks_synthesized: usize,
    /// Сколько фрагментов текста было всего
    pub chunks_total: usize,
}

/// Клип после подгонки длительности под окно сегмента
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledClip {
    pub path: PathBuf,
    /// Целевая длительность окна
    pub target_duration: f64,
    /// Фактическая длительность файла
    pub duration: f64,
    /// Примененные проходы изменения темпа
    pub tempo_passes: Vec<f64>,
    /// Клип заменен тишиной из-за слишком короткого окна или пустой речи
    pub silent: bool,
    /// Хотя бы один этап завершился ошибкой и был пропущен
    pub degraded: bool,
}

impl ReconciledClip {
    /// Расхождение фактической длительности с целевой
    pub fn deviation(&self) -> f64 {
        self.duration - self.target_duration
    }
}

/// Итог обработки одного сегмента
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SegmentOutcome {
    /// Сегмент озвучен
    Speech {
        raw_duration: f64,
        clip: ReconciledClip,
    },
    /// Сегмент заменен тишиной
    Silence {
        duration: f64,
        reason: SilenceReason,
    },
}

/// Запись отчета по одному сегменту
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentReport {
    pub index: usize,
    pub speaker_id: String,
    pub outcome: SegmentOutcome,
    /// Расхождение больше допустимого (только для озвученных сегментов)
    pub deviation_flagged: bool,
}

/// Результат сборки таймлайна
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineReport {
    /// Итоговая дорожка
    pub timeline_path: PathBuf,
    /// Сумма длительностей сырого синтеза до подгонки
    pub total_raw_duration: f64,
    /// Сумма длительностей всех клипов, включая тишину
    pub total_final_duration: f64,
    /// Количество вставленных пауз между сегментами
    pub silence_fillers: usize,
    pub segments: Vec<SegmentReport>,
}

impl TimelineReport {
    pub fn speech_segments(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s.outcome, SegmentOutcome::Speech { .. }))
            .count()
    }
}
