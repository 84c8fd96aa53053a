//! Модуль для работы с TTS
//!
//! Контракт движка синтеза речи с клонированием голоса, разбиение текста
//! на фрагменты и сборка сырого клипа сегмента.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

pub mod chunker;
pub mod http;
pub mod raw;

pub use chunker::chunk_text;
pub use http::HttpSpeechEngine;
pub use raw::RawSynthesizer;

/// Движок синтеза речи, озвучивающий текст голосом из референсного клипа.
///
/// Движок держит модель в памяти и не реентерабелен: конвейер никогда не
/// вызывает его параллельно.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Синтезировать `text` на языке `language` голосом из `reference`
    /// и записать результат в `output`. Возвращает путь к записанному файлу.
    async fn synthesize(
        &self,
        text: &str,
        reference: &Path,
        language: &str,
        output: &Path,
    ) -> Result<PathBuf>;
}
