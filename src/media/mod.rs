//! Модуль для работы с аудио
//!
//! Контракт аудио-утилит и измерение аудиофайлов без внешних процессов.

pub mod probe;
pub mod toolkit;

pub use probe::probe_file;
pub use toolkit::AudioToolkit;

/// Диапазон коэффициента темпа, который принимает один проход
pub const TEMPO_PASS_MIN: f64 = 0.5;
pub const TEMPO_PASS_MAX: f64 = 4.0;
