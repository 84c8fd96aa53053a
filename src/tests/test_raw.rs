use std::path::PathBuf;

use super::fakes::{read_wav, write_tone, FakeSynthesizer, FakeToolkit, TEST_SAMPLE_RATE};
use crate::error::DubError;
use crate::tts::RawSynthesizer;
use crate::utils::WorkDir;

const ONE_SECOND: usize = TEST_SAMPLE_RATE as usize;

fn reference(work: &WorkDir) -> PathBuf {
    let path = work.file("ref", "wav");
    write_tone(&path, 3.0, TEST_SAMPLE_RATE).unwrap();
    path
}

#[tokio::test]
async fn test_failed_chunk_is_skipped() {
    let work = WorkDir::new(None, true).unwrap();
    let toolkit = FakeToolkit::new();
    let engine = FakeSynthesizer::new(1.0).failing_on("BROKEN");
    let reference = reference(&work);
    let synthesizer = RawSynthesizer::new(&engine, &toolkit, &work, 12, TEST_SAMPLE_RATE);

    let raw = synthesizer
        .synthesize("One two. BROKEN yes. Three four.", &reference, "en")
        .await
        .unwrap();

    assert_eq!(engine.texts(), vec!["One two.", "BROKEN yes.", "Three four."]);
    assert_eq!(raw.chunks_synthesized, 2);
    assert_eq!(raw.chunks_total, 3);
    assert!((raw.info.duration - 2.0).abs() < 1e-9);

    // Первый и третий вызовы склеены в порядке фрагментов
    let (samples, _) = read_wav(&raw.path).unwrap();
    assert_eq!(samples.len(), 2 * ONE_SECOND);
    assert!(samples[..ONE_SECOND].iter().all(|&s| s == 100));
    assert!(samples[ONE_SECOND..].iter().all(|&s| s == 300));
}

#[tokio::test]
async fn test_chunk_without_file_is_skipped() {
    let work = WorkDir::new(None, true).unwrap();
    let toolkit = FakeToolkit::new();
    let engine = FakeSynthesizer::new(1.0).without_file_on("EMPTY");
    let reference = reference(&work);
    let synthesizer = RawSynthesizer::new(&engine, &toolkit, &work, 12, TEST_SAMPLE_RATE);

    let raw = synthesizer
        .synthesize("One two. EMPTY yes. Three four.", &reference, "en")
        .await
        .unwrap();

    assert_eq!(engine.call_count(), 3);
    assert_eq!(raw.chunks_synthesized, 2);
    assert!((raw.info.duration - 2.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_all_chunks_failing_is_an_error() {
    let work = WorkDir::new(None, true).unwrap();
    let toolkit = FakeToolkit::new();
    let engine = FakeSynthesizer::new(1.0).failing_on("BROKEN");
    let reference = reference(&work);
    let synthesizer = RawSynthesizer::new(&engine, &toolkit, &work, 12, TEST_SAMPLE_RATE);

    let result = synthesizer
        .synthesize("BROKEN one. BROKEN two.", &reference, "en")
        .await;

    assert_eq!(engine.call_count(), 2);
    assert!(matches!(result, Err(DubError::Synthesis(_))));
}

#[tokio::test]
async fn test_single_chunk_is_not_joined() {
    let work = WorkDir::new(None, true).unwrap();
    let toolkit = FakeToolkit::new();
    let engine = FakeSynthesizer::new(1.5);
    let reference = reference(&work);
    let synthesizer = RawSynthesizer::new(&engine, &toolkit, &work, 180, TEST_SAMPLE_RATE);

    let raw = synthesizer.synthesize("Hello there.", &reference, "en").await.unwrap();

    assert_eq!(*toolkit.concat_calls.lock(), 0);
    assert_eq!(raw.chunks_total, 1);
    assert!((raw.info.duration - 1.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_engine_output_resampled_to_timeline_rate() {
    let work = WorkDir::new(None, true).unwrap();
    let toolkit = FakeToolkit::new();
    let engine = FakeSynthesizer::new(1.0).with_sample_rate(16_000);
    let reference = reference(&work);
    let synthesizer = RawSynthesizer::new(&engine, &toolkit, &work, 180, TEST_SAMPLE_RATE);

    let raw = synthesizer.synthesize("Hello there.", &reference, "en").await.unwrap();

    assert_eq!(raw.info.sample_rate, TEST_SAMPLE_RATE);
    assert!((raw.info.duration - 1.0).abs() < 1e-9);
    let (samples, sample_rate) = read_wav(&raw.path).unwrap();
    assert_eq!(sample_rate, TEST_SAMPLE_RATE);
    assert_eq!(samples.len(), ONE_SECOND);
}
