//! Контракт аудио-утилит, которыми пользуется конвейер дубляжа.
//!
//! Все операции синхронные и блокирующие: реализация на FFmpeg запускает
//! подпроцесс и ждет его завершения. Вызовы никогда не выполняются
//! параллельно, поэтому реализация может хранить состояние.

use std::path::Path;

use crate::error::Result;
use crate::types::AudioInfo;

/// Набор операций над аудиофайлами
pub trait AudioToolkit: Send + Sync {
    /// Вырезать интервал `[start, end]` в моно-файл с заданной частотой дискретизации
    fn extract(
        &self,
        input: &Path,
        start: f64,
        end: f64,
        sample_rate: u32,
        channels: u16,
        output: &Path,
    ) -> Result<()>;

    /// Склеить файлы одного кодека без перекодирования, в указанном порядке
    fn concat(&self, inputs: &[&Path], output: &Path) -> Result<()>;

    /// Измерить длительность и частоту дискретизации
    fn probe(&self, input: &Path) -> Result<AudioInfo>;

    /// Изменить темп без изменения высоты тона. `ratio > 1` ускоряет речь.
    /// Допустимый диапазон одного прохода - [0.5, 4.0].
    fn apply_tempo(&self, input: &Path, ratio: f64, output: &Path) -> Result<()>;

    /// Сгенерировать тишину заданной длительности
    fn generate_silence(&self, duration: f64, sample_rate: u32, output: &Path) -> Result<()>;

    /// Оставить первые `duration` секунд файла
    fn trim(&self, input: &Path, duration: f64, output: &Path) -> Result<()>;
}
