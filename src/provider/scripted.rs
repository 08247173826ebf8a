//! Scripted tracking provider
//!
//! Stands in for the real SDK: every `start_eye_tracking` call replays the
//! next queued batch of callbacks through the emitter. Used by the replay
//! binary and by tests that need a deterministic provider.

use crate::provider::adapter::{ProviderCallback, ProviderEmitter};
use crate::provider::channel::{ProviderOptions, TrackingProvider};
use crate::recorder::error::{RecorderError, RecorderResult};
use async_trait::async_trait;
use parking_lot::Mutex as ParkingMutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Calls the recorder made on the provider, in order
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderCall {
    Configure(ProviderOptions),
    Start,
    Stop,
}

pub struct ScriptedProvider {
    id: String,
    emitter: ProviderEmitter,
    on_start: Arc<ParkingMutex<VecDeque<Vec<ProviderCallback>>>>,
    calls: Arc<ParkingMutex<Vec<ProviderCall>>>,
    unavailable: Option<String>,
    start_error: Option<String>,
    is_tracking: bool,
}

impl ScriptedProvider {
    pub fn new(emitter: ProviderEmitter) -> Self {
        Self {
            id: "scripted".to_string(),
            emitter,
            on_start: Arc::new(ParkingMutex::new(VecDeque::new())),
            calls: Arc::new(ParkingMutex::new(Vec::new())),
            unavailable: None,
            start_error: None,
            is_tracking: false,
        }
    }

    /// Simulate an SDK that failed to load
    pub fn unavailable(mut self, reason: impl Into<String>) -> Self {
        self.unavailable = Some(reason.into());
        self
    }

    /// Simulate an SDK that loads but errors whenever tracking is started
    pub fn failing_start(mut self, message: impl Into<String>) -> Self {
        self.start_error = Some(message.into());
        self
    }

    /// Queue the callbacks fired in response to the next start
    pub fn queue_on_start(&self, callbacks: Vec<ProviderCallback>) {
        self.on_start.lock().push_back(callbacks);
    }

    /// Shared handle to the start queue, for scripts that keep feeding it
    pub fn start_queue(&self) -> Arc<ParkingMutex<VecDeque<Vec<ProviderCallback>>>> {
        self.on_start.clone()
    }

    /// Shared handle to the call log
    pub fn call_log(&self) -> Arc<ParkingMutex<Vec<ProviderCall>>> {
        self.calls.clone()
    }
}

#[async_trait]
impl TrackingProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn configure(&mut self, options: &ProviderOptions) -> RecorderResult<()> {
        self.calls.lock().push(ProviderCall::Configure(options.clone()));
        if let Some(reason) = &self.unavailable {
            return Err(RecorderError::ProviderUnavailable(reason.clone()));
        }

        tracing::debug!(
            "Scripted provider configured (transport={}, preview={})",
            options.transport(),
            options.show_video_preview
        );
        Ok(())
    }

    async fn start_eye_tracking(&mut self) -> RecorderResult<()> {
        if let Some(reason) = &self.unavailable {
            return Err(RecorderError::ProviderUnavailable(reason.clone()));
        }

        self.calls.lock().push(ProviderCall::Start);
        if let Some(message) = &self.start_error {
            return Err(RecorderError::ProviderError(message.clone()));
        }
        self.is_tracking = true;

        let batch = self.on_start.lock().pop_front().unwrap_or_default();
        for callback in batch {
            if !self.emitter.callback(callback) {
                tracing::warn!("Recorder input closed; dropping scripted callbacks");
                break;
            }
        }
        Ok(())
    }

    async fn stop_eye_tracking(&mut self) -> RecorderResult<()> {
        self.calls.lock().push(ProviderCall::Stop);
        self.is_tracking = false;
        Ok(())
    }

    fn is_tracking(&self) -> bool {
        self.is_tracking
    }
}
