//! Provider adapter
//!
//! Translates the provider's named callbacks and raw result records into
//! [`ProviderEvent`]s and forwards them to the recorder's input queue.

use crate::capture::types::{GazeSample, GazeState, HeadPosition, HeadRotation};
use crate::provider::channel::ProviderEvent;
use crate::recorder::coordinator::RecorderInput;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Gaze result exactly as the provider reports it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawGazeResult {
    /// 0 valid, -1 face lost, 1 uncalibrated
    #[serde(default)]
    pub state: i32,
    #[serde(rename = "docX")]
    pub doc_x: f64,
    #[serde(rename = "docY")]
    pub doc_y: f64,
    /// Milliseconds
    pub time: f64,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(rename = "pupilDiameter", default)]
    pub pupil_diameter: Option<f64>,
    #[serde(rename = "HeadX", default)]
    pub head_x: f64,
    #[serde(rename = "HeadY", default)]
    pub head_y: f64,
    #[serde(rename = "HeadZ", default)]
    pub head_z: f64,
    #[serde(rename = "HeadYaw", default)]
    pub head_yaw: f64,
    #[serde(rename = "HeadPitch", default)]
    pub head_pitch: f64,
    #[serde(rename = "HeadRoll", default)]
    pub head_roll: f64,
}

impl From<RawGazeResult> for GazeSample {
    fn from(raw: RawGazeResult) -> Self {
        let mut sample = GazeSample::new(raw.time, raw.doc_x, raw.doc_y)
            .with_head(
                HeadPosition {
                    x: raw.head_x,
                    y: raw.head_y,
                    z: raw.head_z,
                },
                HeadRotation {
                    yaw: raw.head_yaw,
                    pitch: raw.head_pitch,
                    roll: raw.head_roll,
                },
            )
            .with_state(GazeState::from(raw.state));

        if let Some(confidence) = raw.confidence {
            sample = sample.with_confidence(confidence);
        }
        if let Some(diameter) = raw.pupil_diameter {
            sample = sample.with_pupil_diameter(diameter);
        }
        sample
    }
}

/// Named callbacks fired by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "callback", content = "payload")]
pub enum ProviderCallback {
    OnCalibrationComplete,
    OnCalibrationFail,
    OnCamDenied,
    OnError(String),
    OnResult(RawGazeResult),
}

impl From<ProviderCallback> for ProviderEvent {
    fn from(callback: ProviderCallback) -> Self {
        match callback {
            ProviderCallback::OnCalibrationComplete => ProviderEvent::CalibrationComplete,
            ProviderCallback::OnCalibrationFail => ProviderEvent::CalibrationFailed,
            ProviderCallback::OnCamDenied => ProviderEvent::CameraDenied,
            ProviderCallback::OnError(message) => ProviderEvent::ProviderError(message),
            ProviderCallback::OnResult(raw) => ProviderEvent::SampleReceived(raw.into()),
        }
    }
}

/// Sending half handed to a provider so its callbacks reach the recorder
#[derive(Debug, Clone)]
pub struct ProviderEmitter {
    tx: mpsc::UnboundedSender<RecorderInput>,
}

impl ProviderEmitter {
    pub fn new(tx: mpsc::UnboundedSender<RecorderInput>) -> Self {
        Self { tx }
    }

    /// Translate and forward a raw callback.
    ///
    /// Returns false once the recorder has shut down.
    pub fn callback(&self, callback: ProviderCallback) -> bool {
        self.emit(callback.into())
    }

    pub fn emit(&self, event: ProviderEvent) -> bool {
        self.tx.send(RecorderInput::Provider(event)).is_ok()
    }
}
