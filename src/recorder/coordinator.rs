//! Gaze recorder
//!
//! Owns the session context, the sample buffer and the provider, and
//! processes every input on a single task. Session saves run as spawned
//! tasks so the loop keeps handling inputs while storage is busy; each save
//! receives an owned snapshot, never a view onto the live buffer.

use crate::capture::buffer::{BufferStats, SampleBuffer};
use crate::capture::throttle::SampleThrottle;
use crate::capture::types::GazeSample;
use crate::config::RecorderConfig;
use crate::export;
use crate::provider::channel::{ProviderEvent, TrackingProvider};
use crate::recorder::error::{RecorderError, RecorderResult};
use crate::recorder::events::{publish_log, LogLevel, RecorderEvent};
use crate::recorder::state::{Effect, SessionContext, TrackingState, Trigger};
use crate::storage::store::SessionStore;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::{JoinHandle, JoinSet};

const EVENT_CAPACITY: usize = 1024;

/// Everything the recorder reacts to
#[derive(Debug)]
pub enum RecorderInput {
    /// Start tracking, or stop if already tracking
    Start,
    Stop,
    /// Drop buffered samples
    Clear,
    /// Zero the calibration attempt counter after retries ran out
    Reset,
    /// Write the buffer as CSV into the given directory
    Export(PathBuf),
    Provider(ProviderEvent),
    /// Calibration retry delay elapsed for the timer of this generation
    RetryDue(u64),
    /// Stop tracking, wait for pending saves and leave the loop
    Shutdown,
}

/// Create the recorder input queue
pub fn recorder_channel() -> (
    mpsc::UnboundedSender<RecorderInput>,
    mpsc::UnboundedReceiver<RecorderInput>,
) {
    mpsc::unbounded_channel()
}

pub struct GazeRecorder {
    config: RecorderConfig,
    context: SessionContext,
    buffer: SampleBuffer,
    throttle: SampleThrottle,
    store: Arc<SessionStore>,
    provider: Box<dyn TrackingProvider>,
    provider_configured: bool,
    inputs: mpsc::UnboundedSender<RecorderInput>,
    events: broadcast::Sender<RecorderEvent>,
    retry_timer: Option<JoinHandle<()>>,
    retry_generation: u64,
    pending_saves: JoinSet<()>,
}

impl GazeRecorder {
    /// Create a recorder. `inputs` is the sending half of the queue the
    /// recorder will be driven from; retry timers post back into it.
    pub fn new(
        config: RecorderConfig,
        store: Arc<SessionStore>,
        provider: Box<dyn TrackingProvider>,
        inputs: mpsc::UnboundedSender<RecorderInput>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            context: SessionContext::new(config.max_recovery_attempts, config.retry_delay()),
            buffer: SampleBuffer::new(config.buffer_capacity),
            throttle: SampleThrottle::new(config.update_interval()),
            config,
            store,
            provider,
            provider_configured: false,
            inputs,
            events,
            retry_timer: None,
            retry_generation: 0,
            pending_saves: JoinSet::new(),
        }
    }

    /// Subscribe to state changes, live samples and log lines
    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> TrackingState {
        self.context.state()
    }

    pub fn calibration_attempts(&self) -> u32 {
        self.context.calibration_attempts()
    }

    /// Read-only access to the live buffer
    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn buffer_stats(&self) -> BufferStats {
        self.buffer.stats()
    }

    pub fn store(&self) -> Arc<SessionStore> {
        self.store.clone()
    }

    /// Session saves spawned but not yet collected
    pub fn pending_saves(&self) -> usize {
        self.pending_saves.len()
    }

    /// True while a calibration retry is scheduled
    pub fn retry_pending(&self) -> bool {
        self.retry_timer.as_ref().is_some_and(|timer| !timer.is_finished())
    }

    /// Process one input. Returns false once the recorder should stop.
    pub async fn dispatch(&mut self, input: RecorderInput) -> bool {
        match input {
            RecorderInput::Start => self.start().await,
            RecorderInput::Stop => self.fire(Trigger::Stop).await,
            RecorderInput::Clear => self.clear(),
            RecorderInput::Reset => self.fire(Trigger::Reset).await,
            RecorderInput::Export(dir) => {
                if let Err(e) = self.export_csv(&dir) {
                    publish_log(&self.events, e.level(), e.to_string());
                }
            }
            RecorderInput::Provider(event) => self.handle_provider_event(event).await,
            RecorderInput::RetryDue(generation) => {
                if generation != self.retry_generation || self.retry_timer.is_none() {
                    tracing::debug!("Ignoring stale calibration retry (generation {})", generation);
                    return true;
                }
                self.retry_timer = None;
                self.fire(Trigger::RetryDue).await;
            }
            RecorderInput::Shutdown => {
                self.shutdown().await;
                return false;
            }
        }
        true
    }

    /// Drive the recorder from its input queue until shutdown
    pub async fn run(mut self, mut inputs: mpsc::UnboundedReceiver<RecorderInput>) -> Self {
        tracing::info!("Recorder started (provider={})", self.provider.id());

        while let Some(input) = inputs.recv().await {
            if !self.dispatch(input).await {
                break;
            }
            self.reap_saves();
        }

        tracing::info!("Recorder stopped");
        self
    }

    /// Start tracking (toggles to stop while tracking)
    pub async fn start(&mut self) {
        if !self.provider_configured && self.context.state() == TrackingState::Idle {
            match self.provider.configure(&self.config.provider).await {
                Ok(()) => {
                    self.provider_configured = true;
                    tracing::info!(
                        "Provider {} configured (transport={})",
                        self.provider.id(),
                        self.config.provider.transport()
                    );
                }
                Err(RecorderError::ProviderUnavailable(reason)) => {
                    self.fire(Trigger::ProviderUnavailable(reason)).await;
                    return;
                }
                Err(RecorderError::ProviderError(message)) => {
                    self.fire(Trigger::ProviderError(message)).await;
                    return;
                }
                Err(e) => {
                    self.fire(Trigger::ProviderError(e.to_string())).await;
                    return;
                }
            }
        }

        self.fire(Trigger::Start).await;
    }

    pub async fn stop(&mut self) {
        self.fire(Trigger::Stop).await;
    }

    /// Drop all buffered samples
    pub fn clear(&mut self) {
        self.buffer.clear();
        publish_log(&self.events, LogLevel::Info, "Data cleared");
    }

    /// Accept a sample if tracking and outside the throttle window
    pub fn ingest(&mut self, sample: GazeSample) -> bool {
        if !self.context.can_ingest() {
            tracing::trace!("Dropping sample while {}", self.context.state());
            return false;
        }
        if !self.throttle.admit(sample.timestamp_ms) {
            return false;
        }

        let evicted = self.buffer.append(sample.clone());
        if evicted > 0 {
            let _ = self.events.send(RecorderEvent::BufferTrimmed { evicted });
        }
        let _ = self.events.send(RecorderEvent::SampleAccepted(sample));
        true
    }

    /// Write the current buffer to a CSV file in `dir`
    pub fn export_csv(&self, dir: &Path) -> RecorderResult<PathBuf> {
        let (path, rows) = export::export_to_dir(dir, self.buffer.all(), Utc::now())?;

        let _ = self.events.send(RecorderEvent::Exported {
            path: path.clone(),
            rows,
        });
        publish_log(
            &self.events,
            LogLevel::Success,
            format!("Exported {} samples to {}", rows, path.display()),
        );
        Ok(path)
    }

    /// Wait for every in-flight session save to finish
    pub async fn flush_saves(&mut self) {
        while let Some(result) = self.pending_saves.join_next().await {
            if let Err(e) = result {
                tracing::warn!("Session save task failed: {}", e);
            }
        }
    }

    async fn shutdown(&mut self) {
        if self.context.state() != TrackingState::Idle {
            self.fire(Trigger::Stop).await;
        }
        self.flush_saves().await;
    }

    /// Collect save tasks that already finished
    pub(crate) fn reap_saves(&mut self) {
        while let Some(result) = self.pending_saves.try_join_next() {
            if let Err(e) = result {
                tracing::warn!("Session save task failed: {}", e);
            }
        }
    }

    async fn handle_provider_event(&mut self, event: ProviderEvent) {
        tracing::trace!("Provider event: {}", event.name());
        match event {
            ProviderEvent::SampleReceived(sample) => {
                self.ingest(sample);
            }
            ProviderEvent::CalibrationComplete => self.fire(Trigger::CalibrationComplete).await,
            ProviderEvent::CalibrationFailed => self.fire(Trigger::CalibrationFailed).await,
            ProviderEvent::CameraDenied => self.fire(Trigger::CameraDenied).await,
            ProviderEvent::ProviderError(message) => self.fire(Trigger::ProviderError(message)).await,
        }
    }

    /// Apply a trigger and carry out its effects. Effects that fail may
    /// produce a follow-up trigger, which is applied in turn.
    async fn fire(&mut self, trigger: Trigger) {
        let mut next = Some(trigger);

        while let Some(trigger) = next.take() {
            let transition = self.context.apply(trigger);

            if transition.changed() {
                tracing::info!(
                    "Tracking state {} -> {} (attempts={})",
                    transition.from,
                    transition.to,
                    self.context.calibration_attempts()
                );
                let _ = self.events.send(RecorderEvent::StateChanged {
                    from: transition.from,
                    to: transition.to,
                });
            }

            for effect in transition.effects {
                if let Some(follow_up) = self.run_effect(effect).await {
                    next = Some(follow_up);
                }
            }
        }
    }

    async fn run_effect(&mut self, effect: Effect) -> Option<Trigger> {
        match effect {
            Effect::ClearBuffer => {
                self.buffer.clear();
                self.throttle.reset();
            }
            Effect::BeginIngestion => {
                self.throttle.reset();
                publish_log(&self.events, LogLevel::Success, "Calibration complete, tracking");
            }
            Effect::StartProvider => {
                publish_log(
                    &self.events,
                    LogLevel::Info,
                    format!(
                        "Starting calibration (attempt {} of {})",
                        self.context.calibration_attempts(),
                        self.context.max_attempts()
                    ),
                );
                match self.provider.start_eye_tracking().await {
                    Ok(()) => {}
                    Err(RecorderError::ProviderUnavailable(reason)) => {
                        return Some(Trigger::ProviderUnavailable(reason))
                    }
                    Err(RecorderError::ProviderError(message)) => {
                        return Some(Trigger::ProviderError(message))
                    }
                    Err(e) => return Some(Trigger::ProviderError(e.to_string())),
                }
            }
            Effect::StopProvider => {
                if !self.provider.is_tracking() {
                    tracing::debug!("Provider {} not running; skipping stop", self.provider.id());
                } else if let Err(e) = self.provider.stop_eye_tracking().await {
                    tracing::warn!("Provider stop failed: {}", e);
                }
            }
            Effect::PersistBuffer => self.persist_buffer(),
            Effect::ScheduleRetry(delay) => self.schedule_retry(delay),
            Effect::CancelRetry => {
                if let Some(timer) = self.retry_timer.take() {
                    timer.abort();
                    tracing::debug!("Calibration retry cancelled");
                }
            }
            Effect::Report(error) => publish_log(&self.events, error.level(), error.to_string()),
        }
        None
    }

    /// Hand an owned snapshot of the buffer to the store and clear the buffer
    fn persist_buffer(&mut self) {
        let snapshot = self.buffer.take_snapshot();
        self.throttle.reset();

        if snapshot.is_empty() {
            publish_log(&self.events, LogLevel::Info, "Tracking stopped; no samples to save");
            return;
        }

        publish_log(
            &self.events,
            LogLevel::Info,
            format!("Tracking stopped; saving {} samples", snapshot.len()),
        );

        let store = self.store.clone();
        let events = self.events.clone();
        self.pending_saves.spawn(async move {
            match store.save_session(snapshot).await {
                Ok(session) => {
                    let summary = session.summary();
                    let _ = events.send(RecorderEvent::SessionSaved(summary));
                    publish_log(
                        &events,
                        LogLevel::Success,
                        format!(
                            "Session saved ({} samples, {:.1}s)",
                            summary.data_points, summary.duration
                        ),
                    );
                }
                Err(e) => {
                    let error = RecorderError::StorageError(e);
                    publish_log(&events, error.level(), format!("Session not saved: {}", error));
                }
            }
        });
    }

    fn schedule_retry(&mut self, delay: Duration) {
        if let Some(timer) = self.retry_timer.take() {
            timer.abort();
        }

        publish_log(
            &self.events,
            LogLevel::Info,
            format!("Retrying calibration in {}ms", delay.as_millis()),
        );

        self.retry_generation += 1;
        let generation = self.retry_generation;
        let inputs = self.inputs.clone();
        self.retry_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = inputs.send(RecorderInput::RetryDue(generation));
        }));
    }
}
