use std::path::PathBuf;

use super::fakes::{read_wav, write_tone, FakeToolkit, TEST_SAMPLE_RATE};
use crate::config::ReconcileConfig;
use crate::sync::DurationReconciler;
use crate::utils::WorkDir;

const MIN_SEGMENT: f64 = 0.25;
const SAMPLE_TOLERANCE: f64 = 2.0 / TEST_SAMPLE_RATE as f64;

struct Fixture {
    work: WorkDir,
    raw: PathBuf,
    output: PathBuf,
}

/// Рабочая область с сырым клипом заданной длительности
fn fixture(raw_duration: f64) -> Fixture {
    let work = WorkDir::new(None, true).unwrap();
    let raw = work.file("raw", "wav");
    write_tone(&raw, raw_duration, TEST_SAMPLE_RATE).unwrap();
    let output = work.file("out", "wav");
    Fixture { work, raw, output }
}

fn duration_of(path: &std::path::Path) -> f64 {
    let (samples, sample_rate) = read_wav(path).unwrap();
    samples.len() as f64 / sample_rate as f64
}

#[test]
fn test_speedup_within_cap_is_single_pass() {
    let fx = fixture(4.5);
    let toolkit = FakeToolkit::new();
    let config = ReconcileConfig::default();
    let reconciler = DurationReconciler::new(&toolkit, &fx.work, &config, MIN_SEGMENT);

    let clip = reconciler
        .reconcile(&fx.raw, 4.5, 3.0, TEST_SAMPLE_RATE, &fx.output)
        .unwrap();

    assert_eq!(toolkit.tempo_passes(), vec![1.5]);
    assert_eq!(clip.tempo_passes, vec![1.5]);
    assert!((clip.duration - 3.0).abs() < SAMPLE_TOLERANCE);
    assert!((duration_of(&fx.output) - 3.0).abs() < SAMPLE_TOLERANCE);
    assert!(!clip.silent);
    assert!(!clip.degraded);
}

#[test]
fn test_speedup_above_cap_is_trimmed() {
    let fx = fixture(10.0);
    let toolkit = FakeToolkit::new();
    let config = ReconcileConfig::default();
    let reconciler = DurationReconciler::new(&toolkit, &fx.work, &config, MIN_SEGMENT);

    let clip = reconciler
        .reconcile(&fx.raw, 10.0, 2.0, TEST_SAMPLE_RATE, &fx.output)
        .unwrap();

    // Ускорение ограничено 2.0, остаток обрезается
    assert_eq!(toolkit.tempo_passes(), vec![2.0]);
    assert!((clip.duration - 2.0).abs() < SAMPLE_TOLERANCE);
    assert!(!clip.degraded);
}

#[test]
fn test_large_ratio_uses_tempo_chain() {
    let fx = fixture(10.0);
    let toolkit = FakeToolkit::new();
    let config = ReconcileConfig {
        speed_cap: 10.0,
        ..ReconcileConfig::default()
    };
    let reconciler = DurationReconciler::new(&toolkit, &fx.work, &config, MIN_SEGMENT);

    let clip = reconciler
        .reconcile(&fx.raw, 10.0, 1.0, TEST_SAMPLE_RATE, &fx.output)
        .unwrap();

    let passes = toolkit.tempo_passes();
    assert_eq!(passes.len(), 2);
    assert_eq!(passes[0], 4.0);
    assert!((passes[1] - 2.5).abs() < 1e-9);
    assert!((clip.duration - 1.0).abs() < SAMPLE_TOLERANCE);
}

#[test]
fn test_slow_speech_is_padded() {
    let fx = fixture(1.0);
    let toolkit = FakeToolkit::new();
    let config = ReconcileConfig::default();
    let reconciler = DurationReconciler::new(&toolkit, &fx.work, &config, MIN_SEGMENT);

    let clip = reconciler
        .reconcile(&fx.raw, 1.0, 3.0, TEST_SAMPLE_RATE, &fx.output)
        .unwrap();

    // Замедление ограничено 0.5: 1 с -> 2 с, еще 1 с тишины
    assert_eq!(toolkit.tempo_passes(), vec![0.5]);
    assert!((clip.duration - 3.0).abs() < SAMPLE_TOLERANCE);

    let (samples, _) = read_wav(&fx.output).unwrap();
    let tail = &samples[samples.len() - 100..];
    assert!(tail.iter().all(|&s| s == 0), "padding must be silence");
}

#[test]
fn test_matching_duration_is_untouched() {
    let fx = fixture(2.0);
    let toolkit = FakeToolkit::new();
    let config = ReconcileConfig::default();
    let reconciler = DurationReconciler::new(&toolkit, &fx.work, &config, MIN_SEGMENT);

    let clip = reconciler
        .reconcile(&fx.raw, 2.0, 2.0, TEST_SAMPLE_RATE, &fx.output)
        .unwrap();

    assert!(toolkit.tempo_passes().is_empty());
    assert!(clip.tempo_passes.is_empty());
    assert_eq!(read_wav(&fx.raw).unwrap(), read_wav(&fx.output).unwrap());
    assert_eq!(*toolkit.concat_calls.lock(), 0);
}

#[test]
fn test_short_window_becomes_silence() {
    let fx = fixture(1.0);
    let toolkit = FakeToolkit::new();
    let config = ReconcileConfig::default();
    let reconciler = DurationReconciler::new(&toolkit, &fx.work, &config, MIN_SEGMENT);

    let clip = reconciler
        .reconcile(&fx.raw, 1.0, 0.15, TEST_SAMPLE_RATE, &fx.output)
        .unwrap();

    assert!(clip.silent);
    assert!(toolkit.tempo_passes().is_empty());
    assert!((clip.duration - 0.15).abs() < SAMPLE_TOLERANCE);
    let (samples, _) = read_wav(&fx.output).unwrap();
    assert!(samples.iter().all(|&s| s == 0));
}

#[test]
fn test_radical_mode_skips_tempo() {
    let fx = fixture(4.5);
    let toolkit = FakeToolkit::new();
    let config = ReconcileConfig {
        radical_mode: true,
        ..ReconcileConfig::default()
    };
    let reconciler = DurationReconciler::new(&toolkit, &fx.work, &config, MIN_SEGMENT);

    let clip = reconciler
        .reconcile(&fx.raw, 4.5, 3.0, TEST_SAMPLE_RATE, &fx.output)
        .unwrap();

    assert!(toolkit.tempo_passes().is_empty());
    assert!((clip.duration - 3.0).abs() < SAMPLE_TOLERANCE);
}

#[test]
fn test_tempo_failure_keeps_raw_audio() {
    let fx = fixture(4.5);
    let toolkit = FakeToolkit::failing_tempo();
    let config = ReconcileConfig::default();
    let reconciler = DurationReconciler::new(&toolkit, &fx.work, &config, MIN_SEGMENT);

    let clip = reconciler
        .reconcile(&fx.raw, 4.5, 3.0, TEST_SAMPLE_RATE, &fx.output)
        .unwrap();

    assert!(clip.degraded);
    assert!(clip.tempo_passes.is_empty());
    // Без темпа сырой клип все равно обрезается до окна
    assert!((clip.duration - 3.0).abs() < SAMPLE_TOLERANCE);
    assert!(fx.output.exists());
}

#[test]
fn test_pad_failure_copies_intermediate() {
    let fx = fixture(2.0);
    let toolkit = FakeToolkit::failing_concat_into(&fx.output);
    let config = ReconcileConfig {
        radical_mode: true,
        ..ReconcileConfig::default()
    };
    let reconciler = DurationReconciler::new(&toolkit, &fx.work, &config, MIN_SEGMENT);

    let clip = reconciler
        .reconcile(&fx.raw, 2.0, 3.0, TEST_SAMPLE_RATE, &fx.output)
        .unwrap();

    assert!(clip.degraded);
    assert!((clip.duration - 2.0).abs() < SAMPLE_TOLERANCE);
    assert!(clip.deviation() < -0.9);
}
