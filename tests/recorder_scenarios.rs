//! End-to-end recorder scenarios driven through the public API

use gaze_recorder::capture::GazeSample;
use gaze_recorder::config::RecorderConfig;
use gaze_recorder::provider::{ProviderCallback, ProviderCall, ProviderEmitter, ScriptedProvider};
use gaze_recorder::recorder::{
    recorder_channel, GazeRecorder, LogLevel, RecorderEvent, RecorderInput, TrackingState,
};
use gaze_recorder::storage::{JsonFileBackend, MemoryBackend, SessionIndex, SessionStore, StorageBackend};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

fn recorder_with(
    config: RecorderConfig,
    backend: Arc<dyn StorageBackend>,
    script: Vec<Vec<ProviderCallback>>,
) -> (GazeRecorder, UnboundedReceiver<RecorderInput>) {
    let (tx, rx) = recorder_channel();
    let provider = ScriptedProvider::new(ProviderEmitter::new(tx.clone()));
    for batch in script {
        provider.queue_on_start(batch);
    }
    let store = Arc::new(SessionStore::new(backend, "eyeTrackingDB", 1));
    let recorder = GazeRecorder::new(config, store, Box::new(provider), tx);
    (recorder, rx)
}

async fn drain(recorder: &mut GazeRecorder, rx: &mut UnboundedReceiver<RecorderInput>) {
    while let Ok(input) = rx.try_recv() {
        recorder.dispatch(input).await;
    }
}

fn sample(ts: f64, confidence: f64) -> GazeSample {
    GazeSample::new(ts, 640.0, 360.0).with_confidence(confidence)
}

#[tokio::test]
async fn test_buffer_keeps_newest_when_capacity_exceeded() {
    let config = RecorderConfig {
        buffer_capacity: 3,
        ..RecorderConfig::default()
    };
    let (mut recorder, mut rx) = recorder_with(
        config,
        Arc::new(MemoryBackend::new()),
        vec![vec![ProviderCallback::OnCalibrationComplete]],
    );
    recorder.start().await;
    drain(&mut recorder, &mut rx).await;

    for ts in [100.0, 150.0, 200.0, 260.0, 320.0] {
        assert!(recorder.ingest(sample(ts, 1.0)));
    }

    let kept: Vec<f64> = recorder.buffer().all().map(|s| s.timestamp_ms).collect();
    assert_eq!(kept, vec![200.0, 260.0, 320.0]);
    assert_eq!(recorder.buffer_stats().total_evicted, 2);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_calibration_failure_ends_idle() {
    let fail = || vec![ProviderCallback::OnCalibrationFail];
    let (mut recorder, mut rx) = recorder_with(
        RecorderConfig::default(),
        Arc::new(MemoryBackend::new()),
        vec![fail(), fail(), fail(), fail()],
    );

    recorder.start().await;
    assert_eq!(recorder.state(), TrackingState::Calibrating);
    assert_eq!(recorder.calibration_attempts(), 1);

    let mut retries = 0;
    loop {
        drain(&mut recorder, &mut rx).await;
        if !recorder.retry_pending() {
            break;
        }
        assert_eq!(recorder.state(), TrackingState::Recovering);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        let input = rx.recv().await.expect("retry input");
        assert!(matches!(input, RecorderInput::RetryDue(_)));
        recorder.dispatch(input).await;
        retries += 1;
    }

    assert_eq!(retries, 2);
    assert_eq!(recorder.state(), TrackingState::Idle);
    assert_eq!(recorder.calibration_attempts(), 3);

    // Nothing else is scheduled
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(rx.try_recv().is_err());

    // Further starts are refused until a reset
    recorder.start().await;
    assert_eq!(recorder.state(), TrackingState::Idle);
    recorder.dispatch(RecorderInput::Reset).await;
    recorder.start().await;
    assert_eq!(recorder.state(), TrackingState::Calibrating);
}

#[tokio::test]
async fn test_stop_persists_session_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(JsonFileBackend::new(dir.path()));
    let (mut recorder, mut rx) = recorder_with(
        RecorderConfig::default(),
        backend.clone(),
        vec![vec![ProviderCallback::OnCalibrationComplete]],
    );

    recorder.start().await;
    drain(&mut recorder, &mut rx).await;
    for (ts, c) in [(1000.0, 0.9), (2000.0, 0.8), (3000.0, 0.7), (4000.0, 0.6), (5000.0, 0.5)] {
        recorder.ingest(sample(ts, c));
    }
    recorder.dispatch(RecorderInput::Stop).await;
    recorder.flush_saves().await;

    // Read back through a fresh store on the same directory
    let reopened = SessionStore::new(backend, "eyeTrackingDB", 1);
    let sessions = reopened.list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    let record = &sessions[0].record;
    assert_eq!(record.duration, 4.0);
    assert_eq!(record.data_points, 5);
    assert!((record.average_confidence - 0.7).abs() < 1e-9);
    assert_eq!(record.data.len(), 5);
}

#[tokio::test]
async fn test_export_with_empty_buffer_produces_no_file() {
    let export_dir = tempfile::tempdir().unwrap();
    let (mut recorder, _rx) = recorder_with(RecorderConfig::default(), Arc::new(MemoryBackend::new()), vec![]);
    let mut events = recorder.subscribe();

    recorder
        .dispatch(RecorderInput::Export(export_dir.path().to_path_buf()))
        .await;

    assert_eq!(std::fs::read_dir(export_dir.path()).unwrap().count(), 0);
    let warned = std::iter::from_fn(|| events.try_recv().ok()).any(|event| {
        matches!(event, RecorderEvent::Log(ref line)
            if line.level == LogLevel::Warning && line.message == "No data to export")
    });
    assert!(warned);
}

#[tokio::test]
async fn test_export_writes_buffer() {
    let export_dir = tempfile::tempdir().unwrap();
    let (mut recorder, mut rx) = recorder_with(
        RecorderConfig::default(),
        Arc::new(MemoryBackend::new()),
        vec![vec![ProviderCallback::OnCalibrationComplete]],
    );
    recorder.start().await;
    drain(&mut recorder, &mut rx).await;
    recorder.ingest(sample(0.0, 0.4));
    recorder.ingest(sample(100.0, 0.6));

    let path = recorder.export_csv(export_dir.path()).unwrap();
    let content = std::fs::read_to_string(path).unwrap();
    assert_eq!(content.lines().count(), 3);
    assert!(content.starts_with("timestamp,x,y,confidence"));
}

#[tokio::test]
async fn test_next_session_does_not_leak_into_pending_save() {
    let (mut recorder, mut rx) = recorder_with(
        RecorderConfig::default(),
        Arc::new(MemoryBackend::new()),
        vec![
            vec![ProviderCallback::OnCalibrationComplete],
            vec![ProviderCallback::OnCalibrationComplete],
        ],
    );

    recorder.start().await;
    drain(&mut recorder, &mut rx).await;
    recorder.ingest(sample(0.0, 1.0));
    recorder.ingest(sample(100.0, 1.0));

    // Stop and immediately start again before the save completes
    recorder.stop().await;
    recorder.start().await;
    drain(&mut recorder, &mut rx).await;
    recorder.ingest(sample(200.0, 0.0));
    recorder.ingest(sample(300.0, 0.0));
    recorder.ingest(sample(400.0, 0.0));

    recorder.flush_saves().await;
    let sessions = recorder.store().list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].record.data_points, 2);
    assert_eq!(sessions[0].record.average_confidence, 1.0);
    assert_eq!(recorder.buffer().len(), 3);
}

#[tokio::test]
async fn test_run_loop_processes_until_shutdown() {
    let (tx, rx) = recorder_channel();
    let emitter = ProviderEmitter::new(tx.clone());
    let provider = ScriptedProvider::new(emitter.clone());
    provider.queue_on_start(vec![ProviderCallback::OnCalibrationComplete]);
    let calls = provider.call_log();

    let backend = Arc::new(MemoryBackend::new());
    let store = Arc::new(SessionStore::new(backend, "eyeTrackingDB", 1));
    let recorder = GazeRecorder::new(RecorderConfig::default(), store.clone(), Box::new(provider), tx.clone());
    let mut events = recorder.subscribe();
    let handle = tokio::spawn(recorder.run(rx));

    tx.send(RecorderInput::Start).unwrap();
    loop {
        if let RecorderEvent::StateChanged { to: TrackingState::Tracking, .. } = events.recv().await.unwrap() {
            break;
        }
    }
    for i in 0..10 {
        emitter.emit(gaze_recorder::provider::ProviderEvent::SampleReceived(sample(
            i as f64 * 60.0,
            0.5,
        )));
    }
    // Shutdown stops tracking and waits for the save
    tx.send(RecorderInput::Shutdown).unwrap();
    let recorder = handle.await.unwrap();

    assert_eq!(recorder.state(), TrackingState::Idle);
    let sessions = store.list_sessions_by(SessionIndex::Duration).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].record.data_points, 10);
    assert_eq!(calls.lock().last(), Some(&ProviderCall::Stop));
}
