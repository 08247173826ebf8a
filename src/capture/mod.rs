//! Gaze sample capture: sample types, the bounded session buffer and the
//! ingestion throttle.

pub mod buffer;
pub mod throttle;
pub mod types;

pub use buffer::{BufferStats, SampleBuffer, DEFAULT_CAPACITY};
pub use throttle::{SampleThrottle, DEFAULT_UPDATE_INTERVAL};
pub use types::{GazeSample, GazeState, HeadPosition, HeadRotation};
