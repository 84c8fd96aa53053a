//! # Референсы голоса спикеров
//!
//! Для каждого спикера один раз за прогон вырезается короткий моно-клип
//! из оригинальной дорожки, которым затем кондиционируется синтез всех его
//! сегментов. Если для спикера клип получить нельзя, используется первый
//! удачный клип другого спикера.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::ReferenceConfig;
use crate::media::AudioToolkit;
use crate::types::{DiarizationSpan, TimedSegment};
use crate::utils::WorkDir;

/// Кэш референсов прогона: спикер -> путь к клипу.
///
/// Каждый ключ записывается один раз и дальше только читается.
#[derive(Debug, Default)]
pub struct ReferenceCache {
    entries: HashMap<String, PathBuf>,
    first_usable: Option<(String, PathBuf)>,
}

impl ReferenceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, speaker_id: &str) -> Option<&Path> {
        self.entries.get(speaker_id).map(PathBuf::as_path)
    }

    /// Запомнить референс спикера. Повторная запись игнорируется.
    pub fn insert(&mut self, speaker_id: &str, path: PathBuf) {
        if self.entries.contains_key(speaker_id) {
            log::warn!("Reference for speaker {} already cached, ignoring {}", speaker_id, path.display());
            return;
        }
        if self.first_usable.is_none() {
            self.first_usable = Some((speaker_id.to_string(), path.clone()));
        }
        self.entries.insert(speaker_id.to_string(), path);
    }

    /// Первый удачный референс другого спикера
    pub fn fallback_for(&self, speaker_id: &str) -> Option<(&str, &Path)> {
        self.first_usable
            .as_ref()
            .filter(|(owner, _)| owner != speaker_id)
            .map(|(owner, path)| (owner.as_str(), path.as_path()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Откуда взят референс для сегмента
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceSource {
    /// Собственный клип спикера
    Own,
    /// Клип другого спикера
    Fallback { from: String },
}

/// Референс, который будет использован для синтеза сегмента
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedReference {
    pub path: PathBuf,
    pub source: ReferenceSource,
}

/// Выбор, извлечение и кэширование референсов спикеров
pub struct SpeakerReferenceManager<'a> {
    toolkit: &'a dyn AudioToolkit,
    work: &'a WorkDir,
    config: &'a ReferenceConfig,
    sample_rate: u32,
    cache: ReferenceCache,
}

impl<'a> SpeakerReferenceManager<'a> {
    pub fn new(
        toolkit: &'a dyn AudioToolkit,
        work: &'a WorkDir,
        config: &'a ReferenceConfig,
        sample_rate: u32,
    ) -> Self {
        Self {
            toolkit,
            work,
            config,
            sample_rate,
            cache: ReferenceCache::new(),
        }
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    /// Получить собственный референс спикера или `None`.
    ///
    /// Удачный результат запоминается на весь прогон. Неудача не
    /// запоминается: следующий сегмент того же спикера может дать
    /// подходящее окно.
    pub fn get_reference(
        &mut self,
        speaker_id: &str,
        segment: &TimedSegment,
        base_audio: &Path,
        spans: Option<&[DiarizationSpan]>,
    ) -> Option<PathBuf> {
        if let Some(path) = self.cache.get(speaker_id) {
            return Some(path.to_path_buf());
        }

        let target = self.reference_path(speaker_id, base_audio);

        if let Some(path) = target.as_deref().filter(|p| p.exists()) {
            if self.is_usable(path) {
                log::info!("Reusing stored reference for speaker {}: {}", speaker_id, path.display());
                self.cache.insert(speaker_id, path.to_path_buf());
                return Some(path.to_path_buf());
            }
            log::warn!("Stored reference for speaker {} is too short, extracting again", speaker_id);
        }

        let (start, end) = match select_window(speaker_id, segment, spans, self.config) {
            Some(window) => window,
            None => {
                log::debug!("No window long enough for a reference of speaker {}", speaker_id);
                return None;
            }
        };

        let output = target.unwrap_or_else(|| self.work.file("ref", "wav"));
        if let Err(e) = self
            .toolkit
            .extract(base_audio, start, end, self.sample_rate, 1, &output)
        {
            log::warn!(
                "Failed to extract reference for speaker {} ({:.2}s-{:.2}s): {}",
                speaker_id, start, end, e
            );
            let _ = std::fs::remove_file(&output);
            return None;
        }

        if !self.is_usable(&output) {
            log::warn!("Reference for speaker {} is shorter than {:.2}s, discarding", speaker_id, self.config.min_usable);
            let _ = std::fs::remove_file(&output);
            return None;
        }

        log::info!(
            "Extracted reference for speaker {} from {:.2}s-{:.2}s",
            speaker_id, start, end
        );
        self.cache.insert(speaker_id, output.clone());
        Some(output)
    }

    /// Собственный референс спикера, а при его отсутствии - первый удачный
    /// референс другого спикера.
    pub fn resolve(
        &mut self,
        speaker_id: &str,
        segment: &TimedSegment,
        base_audio: &Path,
        spans: Option<&[DiarizationSpan]>,
    ) -> Option<ResolvedReference> {
        if let Some(path) = self.get_reference(speaker_id, segment, base_audio, spans) {
            return Some(ResolvedReference {
                path,
                source: ReferenceSource::Own,
            });
        }

        self.cache.fallback_for(speaker_id).map(|(owner, path)| {
            log::info!("Speaker {} has no reference, borrowing voice of speaker {}", speaker_id, owner);
            ResolvedReference {
                path: path.to_path_buf(),
                source: ReferenceSource::Fallback {
                    from: owner.to_string(),
                },
            }
        })
    }

    /// Постоянный путь к референсу, если задан каталог кэша
    fn reference_path(&self, speaker_id: &str, base_audio: &Path) -> Option<PathBuf> {
        let dir = self.config.cache_dir.as_ref()?;
        if let Err(e) = std::fs::create_dir_all(dir) {
            log::warn!("Cannot create reference cache dir {}: {}", dir.display(), e);
            return None;
        }
        Some(dir.join(format!("ref_{}.wav", reference_key(speaker_id, base_audio))))
    }

    fn is_usable(&self, path: &Path) -> bool {
        match self.toolkit.probe(path) {
            Ok(info) => info.duration >= self.config.min_usable,
            Err(e) => {
                log::warn!("Cannot measure reference {}: {}", path.display(), e);
                false
            }
        }
    }
}

/// Ключ постоянного кэша: спикер вместе с идентичностью исходной дорожки
/// (канонический путь, размер и время изменения). Одинаковые `SPEAKER_00`
/// разных записей получают разные ключи.
pub fn reference_key(speaker_id: &str, base_audio: &Path) -> String {
    let path = std::fs::canonicalize(base_audio).unwrap_or_else(|_| base_audio.to_path_buf());
    let (len, modified) = std::fs::metadata(&path)
        .map(|meta| {
            let modified = meta
                .modified()
                .ok()
                .and_then(|time| time.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|since| since.as_nanos())
                .unwrap_or(0);
            (meta.len(), modified)
        })
        .unwrap_or((0, 0));

    let identity = format!("{}|{}|{}|{}", path.display(), len, modified, speaker_id);
    format!("{:x}", md5::compute(identity.as_bytes()))
}

/// Выбрать окно оригинальной дорожки для референса спикера.
///
/// Порядок: самый ранний фрагмент диаризации "идеальной" длины, затем самый
/// длинный достаточно длинный фрагмент (обрезанный до `max_clip`), затем
/// окно самого сегмента.
pub fn select_window(
    speaker_id: &str,
    segment: &TimedSegment,
    spans: Option<&[DiarizationSpan]>,
    config: &ReferenceConfig,
) -> Option<(f64, f64)> {
    if let Some(spans) = spans {
        let own: Vec<&DiarizationSpan> = spans
            .iter()
            .filter(|s| s.speaker_id == speaker_id && s.duration() > 0.0)
            .collect();

        let ideal = own
            .iter()
            .filter(|s| (config.ideal_min..=config.ideal_max).contains(&s.duration()))
            .min_by(|a, b| a.start.total_cmp(&b.start));
        if let Some(span) = ideal {
            return Some((span.start, span.end));
        }

        let longest = own
            .iter()
            .filter(|s| s.duration() >= config.min_window)
            .max_by(|a, b| {
                a.duration()
                    .total_cmp(&b.duration())
                    .then(b.start.total_cmp(&a.start))
            });
        if let Some(span) = longest {
            return Some((span.start, span.end.min(span.start + config.max_clip)));
        }
    }

    let (start, end) = segment.window()?;
    if end - start >= config.min_window {
        Some((start, end.min(start + config.max_clip)))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(speaker: &str, start: f64, end: f64) -> DiarizationSpan {
        DiarizationSpan {
            speaker_id: speaker.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_prefers_earliest_ideal_span() {
        let spans = vec![
            span("S1", 30.0, 36.0),
            span("S1", 10.0, 15.0),
            span("S1", 40.0, 60.0),
            span("S2", 0.0, 5.0),
        ];
        let segment = TimedSegment::new(50.0, 52.0, "S1", "text");

        let window = select_window("S1", &segment, Some(&spans), &ReferenceConfig::default());
        assert_eq!(window, Some((10.0, 15.0)));
    }

    #[test]
    fn test_longest_span_clipped() {
        let spans = vec![span("S1", 0.0, 3.0), span("S1", 20.0, 40.0), span("S1", 50.0, 52.0)];
        let segment = TimedSegment::new(0.0, 1.0, "S1", "text");

        let window = select_window("S1", &segment, Some(&spans), &ReferenceConfig::default());
        assert_eq!(window, Some((20.0, 32.0)));
    }

    #[test]
    fn test_falls_back_to_segment_window() {
        let spans = vec![span("S1", 0.0, 1.0)];
        let segment = TimedSegment::new(5.0, 20.0, "S1", "text");

        let window = select_window("S1", &segment, Some(&spans), &ReferenceConfig::default());
        assert_eq!(window, Some((5.0, 17.0)));
    }

    #[test]
    fn test_short_segment_without_spans_has_no_window() {
        let segment = TimedSegment::new(5.0, 6.0, "S2", "text");
        assert_eq!(select_window("S2", &segment, None, &ReferenceConfig::default()), None);
    }

    #[test]
    fn test_cache_is_write_once() {
        let mut cache = ReferenceCache::new();
        cache.insert("S1", PathBuf::from("a.wav"));
        cache.insert("S1", PathBuf::from("b.wav"));
        cache.insert("S2", PathBuf::from("c.wav"));

        assert_eq!(cache.get("S1"), Some(Path::new("a.wav")));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.fallback_for("S3"), Some(("S1", Path::new("a.wav"))));
        assert_eq!(cache.fallback_for("S1"), None);
    }
}
