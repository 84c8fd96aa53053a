//! Модуль обработки ошибок библиотеки tts-dub
//!
//! Здесь два уровня ошибок: `DubError` для условий, которые останавливают весь
//! прогон, и `SilenceReason` для сбоев отдельного сегмента, которые сборщик
//! таймлайна поглощает и заменяет тишиной.

use std::fmt;
use serde::Serialize;
use thiserror::Error;

/// Ошибки библиотеки tts-dub
#[derive(Debug, Error)]
pub enum DubError {
    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка HTTP запроса
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Ошибка обработки аудио (ffmpeg, ffprobe, декодирование)
    #[error("Audio processing error: {0}")]
    AudioProcessing(String),

    /// Ошибка движка синтеза речи
    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Пустой список сегментов
    #[error("No segments to dub")]
    NoSegments,

    /// Не удалось склеить итоговую дорожку
    #[error("Failed to merge timeline: {0}")]
    Merge(String),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(String),
}

impl From<&str> for DubError {
    fn from(s: &str) -> Self {
        DubError::Other(s.to_string())
    }
}

impl From<String> for DubError {
    fn from(s: String) -> Self {
        DubError::Other(s)
    }
}

impl From<hound::Error> for DubError {
    fn from(err: hound::Error) -> Self {
        DubError::AudioProcessing(format!("WAV error: {}", err))
    }
}

/// Тип Result для библиотеки tts-dub
pub type Result<T> = std::result::Result<T, DubError>;

/// Причина, по которой сегмент был заменен тишиной
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SilenceReason {
    /// У сегмента нет текста для озвучки
    EmptyText,
    /// У сегмента нет временных меток
    MissingTimestamps,
    /// Окно сегмента слишком короткое для синтеза
    TooShort,
    /// Нет ни собственного, ни чужого референса голоса
    ReferenceUnavailable,
    /// Ни один фрагмент текста не был синтезирован
    SynthesisFailed(String),
    /// Подгонка длительности не смогла выдать файл
    ReconcileFailed(String),
}

impl fmt::Display for SilenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyText => write!(f, "empty text"),
            Self::MissingTimestamps => write!(f, "missing timestamps"),
            Self::TooShort => write!(f, "window too short for synthesis"),
            Self::ReferenceUnavailable => write!(f, "no usable speaker reference"),
            Self::SynthesisFailed(reason) => write!(f, "synthesis failed: {}", reason),
            Self::ReconcileFailed(reason) => write!(f, "reconciliation failed: {}", reason),
        }
    }
}
