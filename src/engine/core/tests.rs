use super::*;
use crate::analysis::classifier::{Centroid, NearestCentroidClassifier};
use crate::dispatch::{MailboxChannels, MailboxReceiver, UiMailbox};
use crate::ingest::{ReplaySource, Sample, UnavailableSource};
use std::time::Duration;

fn small_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.window.window_size = 2;
    config.window.channel_count = 2;
    config.ingest.tick_ms = 1;
    config.calibration.duration_ms = 50;
    config.calibration.poll_timeout_ms = 5;
    config
}

fn classifier(config: &AppConfig) -> Arc<dyn Classifier> {
    let len = config.window.input_len();
    Arc::new(
        NearestCentroidClassifier::from_centroids(
            len,
            vec![Centroid {
                label: 0,
                vector: vec![0.0; len],
            }],
        )
        .unwrap(),
    )
}

fn pipeline_with(source: Box<dyn SampleSource>) -> (Pipeline, MailboxReceiver) {
    let config = small_config();
    let classifier = classifier(&config);
    let MailboxChannels { sender, receiver } = UiMailbox::new(8);
    let pipeline = Pipeline::new(config, classifier, source, sender).unwrap();
    (pipeline, receiver)
}

#[test]
fn test_rejects_shape_mismatch() {
    let config = small_config();
    let mut other = config.clone();
    other.window.window_size = 3;
    let MailboxChannels { sender, .. } = UiMailbox::new(8);

    let result = Pipeline::new(
        config,
        classifier(&other),
        Box::new(ReplaySource::new(Vec::new())),
        sender,
    );
    assert!(matches!(
        result,
        Err(PipelineError::ShapeMismatch {
            expected: 6,
            actual: 4
        })
    ));
}

#[test]
fn test_rejects_invalid_config() {
    let mut config = small_config();
    config.smoothing.history_len = 0;
    let classifier = classifier(&config);
    let MailboxChannels { sender, .. } = UiMailbox::new(8);

    let result = Pipeline::new(
        config,
        classifier,
        Box::new(ReplaySource::new(Vec::new())),
        sender,
    );
    assert!(matches!(result, Err(PipelineError::InvalidConfig { .. })));
}

#[test]
fn test_lifecycle_guards() {
    let (pipeline, _ui) = pipeline_with(Box::new(ReplaySource::new(Vec::new())));

    assert_eq!(pipeline.stop(), Err(PipelineError::NotRunning));
    pipeline.start().unwrap();
    assert!(pipeline.is_running());
    assert_eq!(pipeline.start(), Err(PipelineError::AlreadyRunning));
    pipeline.stop().unwrap();
    assert!(!pipeline.is_running());
}

#[test]
fn test_restart_after_stop() {
    let samples: Vec<Sample> = (0..3).map(|ts| Sample::new(ts, vec![0, 0])).collect();
    let (pipeline, _ui) = pipeline_with(Box::new(ReplaySource::new(samples)));

    pipeline.start().unwrap();
    pipeline.stop().unwrap();
    assert_eq!(pipeline.stats().cycles, 2);

    // The replay runs again; the window kept its contents across the restart.
    pipeline.start().unwrap();
    pipeline.stop().unwrap();
    let stats = pipeline.stats();
    assert_eq!(stats.samples_ingested, 6);
    assert_eq!(stats.cycles, 5);
}

#[test]
fn test_unavailable_source_degrades_to_no_samples() {
    let (pipeline, _ui) = pipeline_with(Box::new(UnavailableSource::new("unplugged")));

    pipeline.start().unwrap();
    std::thread::sleep(Duration::from_millis(10));
    pipeline.stop().unwrap();

    let stats = pipeline.stats();
    assert_eq!(stats.samples_ingested, 0);
    assert_eq!(stats.cycles, 0);
}

#[test]
fn test_capture_lifecycle() {
    let (pipeline, _ui) = pipeline_with(Box::new(ReplaySource::new(Vec::new())));

    assert!(matches!(
        pipeline.start_capture("", "x"),
        Err(PipelineError::CaptureRejected { .. })
    ));
    let id = pipeline.start_capture("fist", "").unwrap();
    assert_eq!(id.len(), 8);
    assert!(matches!(
        pipeline.start_capture("fist", "again"),
        Err(PipelineError::CaptureRejected { .. })
    ));

    let capture = pipeline.stop_capture().unwrap();
    assert_eq!(capture.trial_id, id);
    assert_eq!(pipeline.stop_capture(), Err(PipelineError::NoActiveCapture));

    pipeline.start_capture("flexion", "t2").unwrap();
    assert!(pipeline.cancel_capture());
    assert!(!pipeline.cancel_capture());
}

#[test]
fn test_calibration_and_capture_exclude_each_other() {
    let (pipeline, _ui) = pipeline_with(Box::new(ReplaySource::new(Vec::new())));

    pipeline.start_capture("fist", "t1").unwrap();
    assert_eq!(
        pipeline.start_calibration(),
        Err(CalibrationError::CaptureActive)
    );
    pipeline.cancel_capture();

    pipeline.start_calibration().unwrap();
    assert!(pipeline.calibration_active());
    assert_eq!(
        pipeline.start_calibration(),
        Err(CalibrationError::AlreadyInProgress)
    );
    assert!(matches!(
        pipeline.start_capture("fist", "t2"),
        Err(PipelineError::CaptureRejected { .. })
    ));

    let report = pipeline.wait_calibration().unwrap();
    assert_eq!(report.collected, 0);
    assert!(!pipeline.calibration_active());
    assert_eq!(
        pipeline.wait_calibration(),
        Err(CalibrationError::NotInProgress)
    );
}

#[test]
fn test_stop_cancels_calibration() {
    let mut config = small_config();
    config.calibration.duration_ms = 60_000;
    let classifier = classifier(&config);
    let MailboxChannels { sender, .. } = UiMailbox::new(8);
    let pipeline = Pipeline::new(
        config,
        classifier,
        Box::new(ReplaySource::new(Vec::new())),
        sender,
    )
    .unwrap();
    let mut reports = pipeline.subscribe_calibration();

    pipeline.start().unwrap();
    pipeline.start_calibration().unwrap();
    pipeline.stop().unwrap();

    let report = reports.try_recv().unwrap();
    assert!(report.cancelled);
    assert!(!pipeline.calibrator().is_calibrated());
}

#[test]
fn test_waiting_on_calibration_keeps_it_registered() {
    let mut config = small_config();
    config.calibration.duration_ms = 60_000;
    let classifier = classifier(&config);
    let MailboxChannels { sender, .. } = UiMailbox::new(8);
    let pipeline = Arc::new(
        Pipeline::new(
            config,
            classifier,
            Box::new(ReplaySource::new(Vec::new())),
            sender,
        )
        .unwrap(),
    );

    pipeline.start().unwrap();
    pipeline.start_calibration().unwrap();

    let waiter = {
        let pipeline = Arc::clone(&pipeline);
        std::thread::spawn(move || pipeline.wait_calibration())
    };
    std::thread::sleep(Duration::from_millis(50));

    assert!(pipeline.calibration_active());
    assert!(matches!(
        pipeline.start_capture("fist", "t1"),
        Err(PipelineError::CaptureRejected { .. })
    ));
    assert_eq!(
        pipeline.start_calibration(),
        Err(CalibrationError::AlreadyInProgress)
    );

    pipeline.stop().unwrap();
    assert!(!pipeline.calibration_active());

    let report = waiter.join().unwrap().unwrap();
    assert!(report.cancelled);
    assert!(report.profile.is_none());
    assert!(!pipeline.calibrator().is_calibrated());
}
