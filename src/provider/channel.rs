//! Tracking provider trait
//!
//! Defines the interface to the external gaze-tracking provider. The provider
//! itself (camera capture, gaze inference) is opaque; the recorder only tells
//! it to start or stop and consumes the events it emits.

use crate::capture::types::GazeSample;
use crate::recorder::error::RecorderResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Events emitted by the provider, already translated by the adapter
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// Calibration finished and gaze results will follow
    CalibrationComplete,
    /// Calibration did not succeed
    CalibrationFailed,
    /// User declined camera access
    CameraDenied,
    /// Opaque provider failure
    ProviderError(String),
    /// One gaze result
    SampleReceived(GazeSample),
}

impl ProviderEvent {
    /// Short name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ProviderEvent::CalibrationComplete => "calibration-complete",
            ProviderEvent::CalibrationFailed => "calibration-failed",
            ProviderEvent::CameraDenied => "camera-denied",
            ProviderEvent::ProviderError(_) => "provider-error",
            ProviderEvent::SampleReceived(_) => "sample",
        }
    }
}

/// Transport used to reach the provider backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Secure,
    Insecure,
}

impl Transport {
    /// Pick the transport matching the scheme the host page is served over
    pub fn for_page_scheme(scheme: &str) -> Self {
        if scheme.eq_ignore_ascii_case("https") {
            Transport::Secure
        } else {
            Transport::Insecure
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            Transport::Secure => "wss",
            Transport::Insecure => "ws",
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.scheme())
    }
}

/// Options pushed to the provider before tracking starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderOptions {
    pub api_key: Option<String>,
    /// Let the user trigger recalibration by clicking
    pub recalibrate_on_click: bool,
    pub show_video_preview: bool,
    /// Scheme of the page hosting the tracker ("https" or "http")
    pub page_scheme: String,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            recalibrate_on_click: true,
            show_video_preview: true,
            page_scheme: "https".to_string(),
        }
    }
}

impl ProviderOptions {
    pub fn transport(&self) -> Transport {
        Transport::for_page_scheme(&self.page_scheme)
    }
}

/// Trait for tracking providers
///
/// Implementations forward provider callbacks through a
/// [`ProviderEmitter`](crate::provider::adapter::ProviderEmitter) handed to
/// them at construction.
#[async_trait]
pub trait TrackingProvider: Send + Sync {
    /// Provider identifier used in logs
    fn id(&self) -> &str;

    /// Apply options; called once before the first start
    async fn configure(&mut self, options: &ProviderOptions) -> RecorderResult<()>;

    /// Begin calibration followed by tracking
    async fn start_eye_tracking(&mut self) -> RecorderResult<()>;

    /// Stop tracking
    async fn stop_eye_tracking(&mut self) -> RecorderResult<()>;

    /// Check if the provider believes it is tracking
    fn is_tracking(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_follows_page_scheme() {
        assert_eq!(Transport::for_page_scheme("https"), Transport::Secure);
        assert_eq!(Transport::for_page_scheme("HTTPS"), Transport::Secure);
        assert_eq!(Transport::for_page_scheme("http"), Transport::Insecure);
        assert_eq!(Transport::for_page_scheme("file"), Transport::Insecure);
        assert_eq!(Transport::Secure.to_string(), "wss");
    }

    #[test]
    fn test_default_options() {
        let options = ProviderOptions::default();
        assert!(options.recalibrate_on_click);
        assert!(options.show_video_preview);
        assert_eq!(options.transport(), Transport::Secure);
    }

    #[test]
    fn test_options_deserialize_partial() {
        let options: ProviderOptions =
            serde_json::from_str(r#"{"apiKey":"abc","pageScheme":"http"}"#).unwrap();
        assert_eq!(options.api_key.as_deref(), Some("abc"));
        assert_eq!(options.transport(), Transport::Insecure);
        assert!(options.recalibrate_on_click);
    }
}
