//! # Подгонка длительности
//!
//! Сырой клип сегмента приводится к длительности его окна в оригинальной
//! дорожке: сначала ограниченным изменением темпа (цепочкой проходов),
//! затем обрезкой хвоста или дополнением тишиной.
//!
//! Коэффициент темпа ограничивается `[speed_floor, speed_cap]`, чтобы речь
//! оставалась разборчивой. Остаток расхождения сверх этих границ снимается
//! обрезкой/дополнением.

use std::path::{Path, PathBuf};

use crate::config::ReconcileConfig;
use crate::error::Result;
use crate::media::{AudioToolkit, TEMPO_PASS_MAX, TEMPO_PASS_MIN};
use crate::types::ReconciledClip;
use crate::utils::WorkDir;

/// Минимальная длительность сырой речи, которую имеет смысл подгонять
const MIN_RAW_DURATION: f64 = 0.01;
/// Минимальная длительность файла тишины
const MIN_SILENCE_DURATION: f64 = 0.01;

/// Разложить коэффициент темпа на проходы, каждый из которых лежит в
/// `[TEMPO_PASS_MIN, TEMPO_PASS_MAX]`. Произведение проходов равно `ratio`.
///
/// ```
/// use tts_dub::sync::tempo_chain;
/// assert_eq!(tempo_chain(1.5), vec![1.5]);
/// assert_eq!(tempo_chain(10.0), vec![4.0, 2.5]);
/// assert_eq!(tempo_chain(0.125), vec![0.5, 0.5, 0.5]);
/// ```
pub fn tempo_chain(ratio: f64) -> Vec<f64> {
    if !ratio.is_finite() || ratio <= 0.0 {
        return Vec::new();
    }

    let mut passes = Vec::new();
    let mut remainder = ratio;

    while remainder > TEMPO_PASS_MAX {
        passes.push(TEMPO_PASS_MAX);
        remainder /= TEMPO_PASS_MAX;
    }
    while remainder < TEMPO_PASS_MIN {
        passes.push(TEMPO_PASS_MIN);
        remainder /= TEMPO_PASS_MIN;
    }

    // Проход 1.0 ничего не меняет
    if (remainder - 1.0).abs() > 1e-9 {
        passes.push(remainder);
    }

    passes
}

/// Коэффициент темпа, который будет применен: желаемый, ограниченный
/// диапазоном разборчивости.
///
/// При перепутанных границах (`speed_floor > speed_cap`) побеждает `speed_cap`.
pub fn effective_ratio(raw_duration: f64, target_duration: f64, config: &ReconcileConfig) -> f64 {
    (raw_duration / target_duration)
        .max(config.speed_floor)
        .min(config.speed_cap)
}

/// Подгонка длительности клипов
pub struct DurationReconciler<'a> {
    toolkit: &'a dyn AudioToolkit,
    work: &'a WorkDir,
    config: &'a ReconcileConfig,
    min_segment_duration: f64,
}

impl<'a> DurationReconciler<'a> {
    pub fn new(
        toolkit: &'a dyn AudioToolkit,
        work: &'a WorkDir,
        config: &'a ReconcileConfig,
        min_segment_duration: f64,
    ) -> Self {
        Self {
            toolkit,
            work,
            config,
            min_segment_duration,
        }
    }

    /// Привести клип `raw` к длительности `target_duration` и записать в `output`.
    ///
    /// Сбой темпа, обрезки или дополнения не прерывает работу: в `output`
    /// копируется лучший из уже полученных промежуточных файлов, а клип
    /// помечается как `degraded`. Ошибка возвращается, только если файл
    /// получить не удалось совсем.
    pub fn reconcile(
        &self,
        raw: &Path,
        raw_duration: f64,
        target_duration: f64,
        sample_rate: u32,
        output: &Path,
    ) -> Result<ReconciledClip> {
        if target_duration <= self.min_segment_duration || raw_duration <= MIN_RAW_DURATION {
            return self.silence(target_duration, sample_rate, output);
        }

        let ratio = effective_ratio(raw_duration, target_duration, self.config);
        let mut current: PathBuf = raw.to_path_buf();
        let mut tempo_passes = Vec::new();
        let mut degraded = false;

        if self.config.radical_mode {
            log::debug!("Radical mode: skipping tempo, ratio would be {:.3}", ratio);
        } else if (ratio - 1.0).abs() <= self.config.tempo_noop_band {
            log::debug!("Tempo ratio {:.3} is close to 1.0, skipping tempo", ratio);
        } else {
            if ratio < raw_duration / target_duration {
                log::info!(
                    "Desired speedup {:.3} exceeds cap {:.2}, the rest will be trimmed",
                    raw_duration / target_duration,
                    self.config.speed_cap
                );
            }
            for pass in tempo_chain(ratio) {
                let next = self.work.file("tempo", "wav");
                match self.toolkit.apply_tempo(&current, pass, &next) {
                    Ok(()) => {
                        current = next;
                        tempo_passes.push(pass);
                    }
                    Err(e) => {
                        log::warn!("Tempo pass {:.3} failed: {}", pass, e);
                        degraded = true;
                        break;
                    }
                }
            }
        }

        let actual = match self.toolkit.probe(&current) {
            Ok(info) => info.duration,
            Err(e) => {
                log::warn!("Cannot measure {}: {}, copying it unmodified", current.display(), e);
                std::fs::copy(&current, output)?;
                return Ok(ReconciledClip {
                    path: output.to_path_buf(),
                    target_duration,
                    duration: self.measure_or(output, raw_duration),
                    tempo_passes,
                    silent: false,
                    degraded: true,
                });
            }
        };

        let delta = target_duration - actual;
        let adjusted: Result<()> = if delta.abs() < self.config.pad_trim_tolerance {
            std::fs::copy(&current, output).map(|_| ()).map_err(Into::into)
        } else if delta > 0.0 {
            self.pad(&current, delta, sample_rate, output)
        } else {
            self.toolkit.trim(&current, target_duration, output)
        };

        let expected = match adjusted {
            Ok(()) => {
                if delta.abs() < self.config.pad_trim_tolerance {
                    actual
                } else {
                    target_duration
                }
            }
            Err(e) => {
                log::warn!(
                    "Failed to {} clip by {:.3}s: {}, keeping the intermediate",
                    if delta > 0.0 { "pad" } else { "trim" },
                    delta.abs(),
                    e
                );
                degraded = true;
                std::fs::copy(&current, output)?;
                actual
            }
        };

        let duration = self.measure_or(output, expected);
        if (duration - target_duration).abs() > self.config.deviation_warning {
            log::warn!(
                "Reconciled clip is {:.3}s, target {:.3}s (raw {:.3}s)",
                duration, target_duration, raw_duration
            );
        }

        Ok(ReconciledClip {
            path: output.to_path_buf(),
            target_duration,
            duration,
            tempo_passes,
            silent: false,
            degraded,
        })
    }

    /// Клип тишины длиной окна (но не короче минимального файла)
    pub fn silence(&self, target_duration: f64, sample_rate: u32, output: &Path) -> Result<ReconciledClip> {
        let duration = target_duration.max(MIN_SILENCE_DURATION);
        self.toolkit.generate_silence(duration, sample_rate, output)?;

        Ok(ReconciledClip {
            path: output.to_path_buf(),
            target_duration,
            duration: self.measure_or(output, duration),
            tempo_passes: Vec::new(),
            silent: true,
            degraded: false,
        })
    }

    /// Дописать тишину длиной `delta` в конец клипа
    fn pad(&self, input: &Path, delta: f64, sample_rate: u32, output: &Path) -> Result<()> {
        let padding = self.work.file("pad", "wav");
        self.toolkit.generate_silence(delta, sample_rate, &padding)?;
        self.toolkit.concat(&[input, padding.as_path()], output)
    }

    fn measure_or(&self, path: &Path, fallback: f64) -> f64 {
        self.toolkit
            .probe(path)
            .map(|info| info.duration)
            .unwrap_or(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(passes: &[f64]) -> f64 {
        passes.iter().product()
    }

    #[test]
    fn test_chain_within_range_is_single_pass() {
        assert_eq!(tempo_chain(1.5), vec![1.5]);
        assert_eq!(tempo_chain(0.5), vec![0.5]);
        assert_eq!(tempo_chain(4.0), vec![4.0]);
    }

    #[test]
    fn test_chain_for_large_ratio() {
        let passes = tempo_chain(10.0);
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0], 4.0);
        assert!((passes[1] - 2.5).abs() < 1e-12);

        let passes = tempo_chain(16.0);
        assert_eq!(passes, vec![4.0, 4.0]);
    }

    #[test]
    fn test_chain_for_small_ratio() {
        let passes = tempo_chain(0.1);
        assert_eq!(&passes[..3], &[0.5, 0.5, 0.5]);
        assert!((product(&passes) - 0.1).abs() < 1e-12);
        assert!(passes.iter().all(|p| (TEMPO_PASS_MIN..=TEMPO_PASS_MAX).contains(p)));
    }

    #[test]
    fn test_chain_passes_stay_in_range() {
        for ratio in [0.01, 0.3, 0.75, 1.0001, 3.9, 4.1, 17.0, 250.0] {
            let passes = tempo_chain(ratio);
            assert!(!passes.is_empty());
            assert!((product(&passes) - ratio).abs() / ratio < 1e-9);
            assert!(passes.iter().all(|p| (TEMPO_PASS_MIN..=TEMPO_PASS_MAX).contains(p)));
        }
    }

    #[test]
    fn test_chain_for_degenerate_ratios() {
        assert!(tempo_chain(1.0).is_empty());
        assert!(tempo_chain(0.0).is_empty());
        assert!(tempo_chain(-2.0).is_empty());
        assert!(tempo_chain(f64::NAN).is_empty());
    }

    #[test]
    fn test_effective_ratio_is_bounded() {
        let config = ReconcileConfig::default();
        assert_eq!(effective_ratio(4.5, 3.0, &config), 1.5);
        assert_eq!(effective_ratio(10.0, 2.0, &config), 2.0);
        assert_eq!(effective_ratio(1.0, 4.0, &config), 0.5);
    }

    #[test]
    fn test_effective_ratio_with_inverted_bounds() {
        let config = ReconcileConfig {
            speed_floor: 1.5,
            speed_cap: 1.2,
            ..ReconcileConfig::default()
        };
        assert_eq!(effective_ratio(1.0, 1.0, &config), 1.2);
        assert_eq!(effective_ratio(10.0, 1.0, &config), 1.2);
    }
}
