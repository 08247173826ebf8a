//! Recording lifecycle: state machine, error taxonomy, notifications and the
//! recorder that ties them to the buffer, provider and store.

pub mod coordinator;
pub mod error;
pub mod events;
pub mod state;

pub use coordinator::{recorder_channel, GazeRecorder, RecorderInput};
pub use error::{RecorderError, RecorderResult};
pub use events::{LogLevel, LogLine, RecorderEvent};
pub use state::{SessionContext, TrackingState, Trigger};
