//! External tracking provider boundary
//!
//! The provider is an opaque SDK; this module defines the trait the recorder
//! drives, the adapter that turns its callbacks into events, and a scripted
//! provider used for replay and tests.

pub mod adapter;
pub mod channel;
pub mod scripted;

pub use adapter::{ProviderCallback, ProviderEmitter, RawGazeResult};
pub use channel::{ProviderEvent, ProviderOptions, TrackingProvider, Transport};
pub use scripted::{ProviderCall, ScriptedProvider};
