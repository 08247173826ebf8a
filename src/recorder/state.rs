//! Tracking lifecycle state machine.
//!
//! Idle → Calibrating → Tracking, with Calibrating → Recovering → Calibrating
//! retries bounded by the attempt counter. Transitions are pure: they update
//! the [`SessionContext`] and return the effects the recorder must carry out.

use crate::recorder::error::RecorderError;
use serde::Serialize;
use std::time::Duration;

/// Default number of calibration attempts before giving up
pub const DEFAULT_MAX_RECOVERY_ATTEMPTS: u32 = 3;

/// Default delay before an automatic calibration retry
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingState {
    Idle,
    Calibrating,
    Tracking,
    Recovering,
}

impl std::fmt::Display for TrackingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingState::Idle => write!(f, "idle"),
            TrackingState::Calibrating => write!(f, "calibrating"),
            TrackingState::Tracking => write!(f, "tracking"),
            TrackingState::Recovering => write!(f, "recovering"),
        }
    }
}

/// Inputs that can move the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    /// User pressed start (toggles to stop while tracking)
    Start,
    Stop,
    CalibrationComplete,
    CalibrationFailed,
    /// Retry delay elapsed
    RetryDue,
    CameraDenied,
    ProviderError(String),
    ProviderUnavailable(String),
    /// Manual intervention after retries ran out
    Reset,
}

/// Work the recorder performs as a result of a transition
#[derive(Debug)]
pub enum Effect {
    ClearBuffer,
    StartProvider,
    StopProvider,
    /// Hand the buffered samples to the store and clear the buffer
    PersistBuffer,
    /// Sample ingestion opens with a fresh throttle window
    BeginIngestion,
    ScheduleRetry(Duration),
    CancelRetry,
    Report(RecorderError),
}

#[derive(Debug)]
pub struct Transition {
    pub from: TrackingState,
    pub to: TrackingState,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Mutable lifecycle state for one recorder
#[derive(Debug, Clone)]
pub struct SessionContext {
    state: TrackingState,
    calibration_attempts: u32,
    max_attempts: u32,
    retry_delay: Duration,
    provider_available: bool,
}

impl SessionContext {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            state: TrackingState::Idle,
            calibration_attempts: 0,
            max_attempts,
            retry_delay,
            provider_available: true,
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn calibration_attempts(&self) -> u32 {
        self.calibration_attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn provider_available(&self) -> bool {
        self.provider_available
    }

    /// Samples are only accepted while tracking
    pub fn can_ingest(&self) -> bool {
        self.state == TrackingState::Tracking
    }

    /// Apply a trigger and return the resulting transition
    pub fn apply(&mut self, trigger: Trigger) -> Transition {
        let from = self.state;
        let effects = match trigger {
            Trigger::Start => self.on_start(),
            Trigger::Stop => self.halt(None),
            Trigger::CalibrationComplete => self.on_calibration_complete(),
            Trigger::CalibrationFailed => self.on_calibration_failed(),
            Trigger::RetryDue => self.on_retry_due(),
            Trigger::CameraDenied => self.halt(Some(RecorderError::CameraDenied)),
            Trigger::ProviderError(message) => self.halt(Some(RecorderError::ProviderError(message))),
            Trigger::ProviderUnavailable(reason) => {
                self.provider_available = false;
                self.halt(Some(RecorderError::ProviderUnavailable(reason)))
            }
            Trigger::Reset => self.on_reset(),
        };

        Transition {
            from,
            to: self.state,
            effects,
        }
    }

    fn on_start(&mut self) -> Vec<Effect> {
        match self.state {
            TrackingState::Tracking => self.halt(None),
            TrackingState::Idle if !self.provider_available => {
                vec![Effect::Report(RecorderError::ProviderUnavailable(
                    "provider failed to load; reload required".to_string(),
                ))]
            }
            TrackingState::Idle if self.calibration_attempts >= self.max_attempts => {
                vec![Effect::Report(RecorderError::RecoveryExhausted {
                    attempts: self.calibration_attempts,
                })]
            }
            TrackingState::Idle => self.begin_calibration(),
            TrackingState::Calibrating | TrackingState::Recovering => Vec::new(),
        }
    }

    fn begin_calibration(&mut self) -> Vec<Effect> {
        self.calibration_attempts += 1;
        self.state = TrackingState::Calibrating;
        vec![Effect::ClearBuffer, Effect::StartProvider]
    }

    fn on_calibration_complete(&mut self) -> Vec<Effect> {
        if self.state != TrackingState::Calibrating {
            return Vec::new();
        }
        self.calibration_attempts = 0;
        self.state = TrackingState::Tracking;
        vec![Effect::BeginIngestion]
    }

    fn on_calibration_failed(&mut self) -> Vec<Effect> {
        if self.state != TrackingState::Calibrating {
            return Vec::new();
        }

        if self.calibration_attempts < self.max_attempts {
            self.state = TrackingState::Recovering;
            vec![
                Effect::Report(RecorderError::CalibrationFailed {
                    attempt: self.calibration_attempts,
                    max: self.max_attempts,
                }),
                Effect::ScheduleRetry(self.retry_delay),
            ]
        } else {
            self.state = TrackingState::Idle;
            vec![
                Effect::StopProvider,
                Effect::Report(RecorderError::RecoveryExhausted {
                    attempts: self.calibration_attempts,
                }),
            ]
        }
    }

    fn on_retry_due(&mut self) -> Vec<Effect> {
        // A stop or error may have landed while the timer was pending
        if self.state != TrackingState::Recovering {
            return Vec::new();
        }
        self.begin_calibration()
    }

    fn on_reset(&mut self) -> Vec<Effect> {
        if self.state == TrackingState::Idle {
            self.calibration_attempts = 0;
        }
        Vec::new()
    }

    /// Return to Idle from wherever we are, with an optional failure report
    fn halt(&mut self, reason: Option<RecorderError>) -> Vec<Effect> {
        let mut effects = match self.state {
            TrackingState::Idle => Vec::new(),
            TrackingState::Tracking => vec![Effect::PersistBuffer, Effect::StopProvider],
            TrackingState::Calibrating => vec![Effect::StopProvider, Effect::ClearBuffer],
            TrackingState::Recovering => vec![Effect::CancelRetry, Effect::StopProvider],
        };
        self.state = TrackingState::Idle;

        if let Some(reason) = reason {
            effects.push(Effect::Report(reason));
        }
        effects
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RECOVERY_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}
