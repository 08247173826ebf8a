use serde::{Deserialize, Serialize};

/// Tracking quality reported by the provider alongside each gaze point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum GazeState {
    /// Gaze point is valid
    Valid,
    /// Face tracking lost
    FaceLost,
    /// Provider not calibrated yet
    Uncalibrated,
    /// Tag the provider sent that we don't know about
    Other(i32),
}

impl From<i32> for GazeState {
    fn from(value: i32) -> Self {
        match value {
            0 => GazeState::Valid,
            -1 => GazeState::FaceLost,
            1 => GazeState::Uncalibrated,
            other => GazeState::Other(other),
        }
    }
}

impl From<GazeState> for i32 {
    fn from(value: GazeState) -> Self {
        match value {
            GazeState::Valid => 0,
            GazeState::FaceLost => -1,
            GazeState::Uncalibrated => 1,
            GazeState::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Head rotation in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadRotation {
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// One telemetry reading from the tracking provider.
///
/// Samples are never mutated after the adapter builds them; the buffer,
/// the store and the export all work on copies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GazeSample {
    /// Monotonic timestamp in milliseconds
    pub timestamp_ms: f64,
    /// Screen X position in pixels
    pub x: f64,
    /// Screen Y position in pixels
    pub y: f64,
    /// Tracking confidence in `0.0..=1.0`, when the provider reports one
    pub confidence: Option<f64>,
    pub pupil_diameter: Option<f64>,
    pub head_position: HeadPosition,
    pub head_rotation: HeadRotation,
    pub state: GazeState,
}

impl GazeSample {
    /// Create a valid sample at the given time and screen position
    pub fn new(timestamp_ms: f64, x: f64, y: f64) -> Self {
        Self {
            timestamp_ms,
            x,
            y,
            confidence: None,
            pupil_diameter: None,
            head_position: HeadPosition::default(),
            head_rotation: HeadRotation::default(),
            state: GazeState::Valid,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_pupil_diameter(mut self, diameter: f64) -> Self {
        self.pupil_diameter = Some(diameter);
        self
    }

    pub fn with_head(mut self, position: HeadPosition, rotation: HeadRotation) -> Self {
        self.head_position = position;
        self.head_rotation = rotation;
        self
    }

    pub fn with_state(mut self, state: GazeState) -> Self {
        self.state = state;
        self
    }

    /// Confidence with an absent value counted as zero
    pub fn confidence_or_zero(&self) -> f64 {
        self.confidence.unwrap_or(0.0)
    }
}
