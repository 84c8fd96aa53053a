//! Модуль конфигурации библиотеки tts-dub
//!
//! Этот модуль содержит структуры для настройки выбора референсов,
//! подгонки длительности и внешних утилит.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{DubError, Result};
use crate::tts::chunker::DEFAULT_MAX_CHARS;

/// Настройки выбора референсного клипа для голоса спикера
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReferenceConfig {
    /// Нижняя граница "идеальной" длительности фрагмента диаризации (сек)
    pub ideal_min: f64,
    /// Верхняя граница "идеальной" длительности фрагмента диаризации (сек)
    pub ideal_max: f64,
    /// Минимальная длительность окна, из которого можно вырезать референс (сек)
    pub min_window: f64,
    /// Максимальная длительность вырезаемого референса (сек)
    pub max_clip: f64,
    /// Минимальная длительность пригодного референса (сек)
    pub min_usable: f64,
    /// Директория для хранения референсов между запусками
    pub cache_dir: Option<PathBuf>,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            ideal_min: 4.0,
            ideal_max: 8.0,
            min_window: 2.5,
            max_clip: 12.0,
            min_usable: 0.5,
            cache_dir: None,
        }
    }
}

/// Настройки подгонки длительности синтезированной речи
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Максимальное ускорение речи
    pub speed_cap: f64,
    /// Максимальное замедление речи
    pub speed_floor: f64,
    /// Пропустить изменение темпа и сразу обрезать/дополнить
    pub radical_mode: bool,
    /// Если коэффициент темпа ближе к 1.0, чем это значение, темп не меняется
    pub tempo_noop_band: f64,
    /// Расхождение длительности, ниже которого обрезка/дополнение не выполняются (сек)
    pub pad_trim_tolerance: f64,
    /// Расхождение с целью, о котором стоит предупредить в логе (сек)
    pub deviation_warning: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            speed_cap: 2.0,
            speed_floor: 0.5,
            radical_mode: false,
            tempo_noop_band: 0.01,
            pad_trim_tolerance: 0.005,
            deviation_warning: 0.05,
        }
    }
}

/// Пути к утилитам FFmpeg
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FfmpegConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

/// Конфигурация дубляжа
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DubbingConfig {
    /// Язык синтезируемой речи
    pub language: String,
    /// Частота дискретизации, которую ожидает движок синтеза
    pub sample_rate: u32,
    /// Максимальная длина фрагмента текста для одного вызова синтеза
    pub max_chunk_chars: usize,
    /// Сегменты короче этого значения заменяются тишиной (сек)
    pub min_segment_duration_for_synth: f64,
    /// Выбор референсов
    pub reference: ReferenceConfig,
    /// Подгонка длительности
    pub reconcile: ReconcileConfig,
    /// Внешние утилиты
    pub ffmpeg: FfmpegConfig,
    /// Рабочая директория для промежуточных файлов
    pub work_dir: Option<PathBuf>,
    /// Удалять временные файлы после завершения
    pub cleanup_temp_files: bool,
}

impl Default for DubbingConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            sample_rate: 24_000,
            max_chunk_chars: DEFAULT_MAX_CHARS,
            min_segment_duration_for_synth: 0.25,
            reference: ReferenceConfig::default(),
            reconcile: ReconcileConfig::default(),
            ffmpeg: FfmpegConfig::default(),
            work_dir: None,
            cleanup_temp_files: true,
        }
    }
}

impl DubbingConfig {
    /// Загрузить конфигурацию из JSON-файла. Отсутствующие поля берутся по умолчанию.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            DubError::Configuration(format!("Cannot read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Проверить согласованность значений
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(DubError::Configuration("sample_rate must be positive".to_string()));
        }
        if self.max_chunk_chars == 0 {
            return Err(DubError::Configuration("max_chunk_chars must be positive".to_string()));
        }
        if self.reconcile.speed_cap < 1.0 {
            return Err(DubError::Configuration(format!(
                "speed_cap must be >= 1.0, got {}",
                self.reconcile.speed_cap
            )));
        }
        if self.reconcile.speed_floor <= 0.0 || self.reconcile.speed_floor > 1.0 {
            return Err(DubError::Configuration(format!(
                "speed_floor must be in (0, 1], got {}",
                self.reconcile.speed_floor
            )));
        }
        if self.reference.ideal_min > self.reference.ideal_max {
            return Err(DubError::Configuration(
                "reference.ideal_min must not exceed reference.ideal_max".to_string(),
            ));
        }
        Ok(())
    }
}
