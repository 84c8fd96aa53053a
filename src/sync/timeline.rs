//! # Сборка таймлайна
//!
//! Сегменты обрабатываются строго по возрастанию начала. Между сегментами
//! вставляются паузы, сбой любого этапа заменяет сегмент тишиной, а в конце
//! все клипы склеиваются в одну дорожку без перекодирования.
//!
//! Фатальны только пустой список сегментов, невалидная конфигурация и сбой
//! итоговой склейки.

use std::path::{Path, PathBuf};

use crate::config::DubbingConfig;
use crate::error::{DubError, Result, SilenceReason};
use crate::media::AudioToolkit;
use crate::progress::{self, ProgressObserver};
use crate::speaker::SpeakerReferenceManager;
use crate::sync::DurationReconciler;
use crate::tts::{RawSynthesizer, SpeechSynthesizer};
use crate::types::{DiarizationSpan, SegmentOutcome, SegmentReport, TimedSegment, TimelineReport};
use crate::utils::WorkDir;

/// Разрыв между сегментами, начиная с которого вставляется пауза
const GAP_TOLERANCE: f64 = 0.01;
/// Длительность заглушки, если не получено ни одного клипа
const PLACEHOLDER_DURATION: f64 = 0.01;

/// Клипы и статистика, накопленные за прогон
#[derive(Debug, Default)]
struct Timeline {
    clips: Vec<PathBuf>,
    total_raw: f64,
    total_final: f64,
    fillers: usize,
}

impl Timeline {
    fn push(&mut self, path: PathBuf, duration: f64) {
        self.clips.push(path);
        self.total_final += duration;
    }
}

/// Сборщик итоговой дорожки
pub struct TimelineAssembler<'a> {
    engine: &'a dyn SpeechSynthesizer,
    toolkit: &'a dyn AudioToolkit,
    config: &'a DubbingConfig,
    work: &'a WorkDir,
    references: SpeakerReferenceManager<'a>,
    spans: Option<&'a [DiarizationSpan]>,
}

impl<'a> TimelineAssembler<'a> {
    pub fn new(
        engine: &'a dyn SpeechSynthesizer,
        toolkit: &'a dyn AudioToolkit,
        config: &'a DubbingConfig,
        work: &'a WorkDir,
    ) -> Self {
        Self {
            engine,
            toolkit,
            config,
            work,
            references: SpeakerReferenceManager::new(toolkit, work, &config.reference, config.sample_rate),
            spans: None,
        }
    }

    /// Использовать фрагменты диаризации для выбора референсов
    pub fn with_diarization(mut self, spans: &'a [DiarizationSpan]) -> Self {
        self.spans = Some(spans);
        self
    }

    pub fn references(&self) -> &SpeakerReferenceManager<'a> {
        &self.references
    }

    /// Озвучить сегменты и собрать их в дорожку `output`.
    ///
    /// `progress` вызывается ровно один раз на каждый сегмент, в порядке
    /// обработки, с долей `(i + 1) / n`.
    pub async fn assemble(
        &mut self,
        segments: &[TimedSegment],
        base_audio: &Path,
        output: &Path,
        progress: Option<&dyn ProgressObserver>,
    ) -> Result<TimelineReport> {
        if segments.is_empty() {
            return Err(DubError::NoSegments);
        }
        self.config.validate()?;

        let config: &'a DubbingConfig = self.config;
        let reconciler = DurationReconciler::new(
            self.toolkit,
            self.work,
            &config.reconcile,
            config.min_segment_duration_for_synth,
        );

        let ordered = order_segments(segments);
        let total = ordered.len();
        let mut timeline = Timeline::default();
        let mut reports = Vec::with_capacity(total);
        let mut last_end = 0.0_f64;

        log::info!("Assembling timeline from {} segments", total);

        for (done, (index, segment)) in ordered.into_iter().enumerate() {
            let outcome = self
                .process_segment(segment, base_audio, &reconciler, &mut last_end, &mut timeline)
                .await;

            let deviation_flagged = match &outcome {
                SegmentOutcome::Speech { clip, .. } => {
                    clip.deviation().abs() > config.reconcile.deviation_warning
                }
                SegmentOutcome::Silence { reason, .. } => {
                    log::warn!("Segment {} ({}) replaced with silence: {}", index, segment.speaker_id, reason);
                    false
                }
            };

            reports.push(SegmentReport {
                index,
                speaker_id: segment.speaker_id.clone(),
                outcome,
                deviation_flagged,
            });

            progress::report(progress, done + 1, total);
        }

        self.merge(&timeline, output)?;
        if timeline.clips.is_empty() {
            timeline.total_final += PLACEHOLDER_DURATION;
        }

        let report = TimelineReport {
            timeline_path: output.to_path_buf(),
            total_raw_duration: timeline.total_raw,
            total_final_duration: timeline.total_final,
            silence_fillers: timeline.fillers,
            segments: reports,
        };

        log::info!(
            "Timeline ready: {} of {} segments voiced, {} pauses, raw {:.2}s, final {:.2}s",
            report.speech_segments(),
            total,
            report.silence_fillers,
            report.total_raw_duration,
            report.total_final_duration
        );

        Ok(report)
    }

    async fn process_segment(
        &mut self,
        segment: &TimedSegment,
        base_audio: &Path,
        reconciler: &DurationReconciler<'_>,
        last_end: &mut f64,
        timeline: &mut Timeline,
    ) -> SegmentOutcome {
        let (start, end) = match segment.window() {
            Some(window) if segment.has_text() => window,
            Some((_, end)) => {
                *last_end = last_end.max(end);
                return skipped(SilenceReason::EmptyText);
            }
            None => {
                if let Some(end) = segment.end {
                    *last_end = last_end.max(end);
                }
                return skipped(SilenceReason::MissingTimestamps);
            }
        };

        let start = if start < *last_end {
            log::warn!(
                "Segment at {:.2}s overlaps the previous one ending at {:.2}s, clipping",
                start, last_end
            );
            *last_end
        } else {
            start
        };

        if end <= start {
            return skipped(SilenceReason::TooShort);
        }

        let gap = start - *last_end;
        if gap > GAP_TOLERANCE {
            self.insert_pause(gap, timeline);
        }
        *last_end = end;

        let target = end - start;
        if target <= self.config.min_segment_duration_for_synth {
            return self.silence(reconciler, target, SilenceReason::TooShort, timeline);
        }

        let window = TimedSegment {
            start: Some(start),
            ..segment.clone()
        };
        let reference = match self
            .references
            .resolve(&segment.speaker_id, &window, base_audio, self.spans)
        {
            Some(reference) => reference,
            None => {
                return self.silence(reconciler, target, SilenceReason::ReferenceUnavailable, timeline)
            }
        };

        let synthesizer = RawSynthesizer::new(
            self.engine,
            self.toolkit,
            self.work,
            self.config.max_chunk_chars,
            self.config.sample_rate,
        );
        let raw = match synthesizer
            .synthesize(&segment.target_text, &reference.path, &self.config.language)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                return self.silence(reconciler, target, SilenceReason::SynthesisFailed(e.to_string()), timeline)
            }
        };
        timeline.total_raw += raw.info.duration;

        let clip_path = self.work.file("segment", "wav");
        match reconciler.reconcile(&raw.path, raw.info.duration, target, raw.info.sample_rate, &clip_path) {
            Ok(clip) if clip.silent => {
                timeline.push(clip.path, clip.duration);
                SegmentOutcome::Silence {
                    duration: clip.duration,
                    reason: SilenceReason::SynthesisFailed("synthesized audio is empty".to_string()),
                }
            }
            Ok(clip) => {
                log::info!(
                    "Segment {:.2}s-{:.2}s ({}): raw {:.2}s -> {:.2}s",
                    start, end, segment.speaker_id, raw.info.duration, clip.duration
                );
                timeline.push(clip.path.clone(), clip.duration);
                SegmentOutcome::Speech {
                    raw_duration: raw.info.duration,
                    clip,
                }
            }
            Err(e) => self.silence(reconciler, target, SilenceReason::ReconcileFailed(e.to_string()), timeline),
        }
    }

    /// Пауза между сегментами
    fn insert_pause(&self, gap: f64, timeline: &mut Timeline) {
        let path = self.work.file("gap", "wav");
        match self.toolkit.generate_silence(gap, self.config.sample_rate, &path) {
            Ok(()) => {
                let duration = self.toolkit.probe(&path).map(|info| info.duration).unwrap_or(gap);
                timeline.push(path, duration);
                timeline.fillers += 1;
            }
            Err(e) => log::warn!("Failed to generate {:.3}s pause: {}", gap, e),
        }
    }

    /// Заменить сегмент тишиной длиной его окна
    fn silence(
        &self,
        reconciler: &DurationReconciler<'_>,
        target: f64,
        reason: SilenceReason,
        timeline: &mut Timeline,
    ) -> SegmentOutcome {
        let path = self.work.file("silence", "wav");
        match reconciler.silence(target, self.config.sample_rate, &path) {
            Ok(clip) => {
                timeline.push(clip.path, clip.duration);
                SegmentOutcome::Silence {
                    duration: clip.duration,
                    reason,
                }
            }
            Err(e) => {
                log::warn!("Failed to generate {:.3}s of silence: {}", target, e);
                skipped(reason)
            }
        }
    }

    /// Склеить все клипы в `output`; без клипов записать короткую тишину
    fn merge(&self, timeline: &Timeline, output: &Path) -> Result<()> {
        if timeline.clips.is_empty() {
            log::warn!("No clips produced, writing placeholder silence to {}", output.display());
            return self
                .toolkit
                .generate_silence(PLACEHOLDER_DURATION, self.config.sample_rate, output)
                .map_err(|e| DubError::Merge(e.to_string()));
        }

        let inputs: Vec<&Path> = timeline.clips.iter().map(PathBuf::as_path).collect();
        self.toolkit.concat(&inputs, output).map_err(|e| {
            log::error!("Failed to merge {} clips into {}: {}", inputs.len(), output.display(), e);
            DubError::Merge(e.to_string())
        })
    }
}

fn skipped(reason: SilenceReason) -> SegmentOutcome {
    SegmentOutcome::Silence {
        duration: 0.0,
        reason,
    }
}

/// Упорядочить сегменты по началу, сохраняя исходный порядок равных.
/// Сегмент без начала ставится по своему концу.
fn order_segments(segments: &[TimedSegment]) -> Vec<(usize, &TimedSegment)> {
    let key = |segment: &TimedSegment| segment.start.or(segment.end).unwrap_or(f64::NEG_INFINITY);

    let mut ordered: Vec<(usize, &TimedSegment)> = segments.iter().enumerate().collect();
    ordered.sort_by(|(_, a), (_, b)| key(a).total_cmp(&key(b)));

    if ordered.iter().enumerate().any(|(position, (index, _))| position != *index) {
        log::warn!("Segments are not in chronological order, reordering by start");
    }

    ordered
}
