//! Script replay
//!
//! Drives a recorder from an NDJSON script of user commands and provider
//! callbacks, with the scripted provider standing in for the real SDK.
//!
//! ```text
//! {"kind":"onStart","events":[{"callback":"OnCalibrationComplete"}]}
//! {"kind":"command","command":"start"}
//! {"kind":"provider","event":{"callback":"OnResult","payload":{"docX":10,"docY":20,"time":1000}}}
//! {"kind":"wait","ms":100}
//! {"kind":"command","command":"stop"}
//! ```

use crate::config::RecorderConfig;
use crate::provider::adapter::{ProviderCallback, ProviderEmitter};
use crate::provider::scripted::ScriptedProvider;
use crate::recorder::coordinator::{recorder_channel, GazeRecorder, RecorderInput};
use crate::recorder::events::RecorderEvent;
use crate::storage::backend::StorageBackend;
use crate::storage::session::{SessionIndex, SessionSummary};
use crate::storage::store::SessionStore;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserCommand {
    Start,
    Stop,
    Clear,
    Reset,
    Export,
}

impl UserCommand {
    fn into_input(self, export_dir: &Path) -> RecorderInput {
        match self {
            UserCommand::Start => RecorderInput::Start,
            UserCommand::Stop => RecorderInput::Stop,
            UserCommand::Clear => RecorderInput::Clear,
            UserCommand::Reset => RecorderInput::Reset,
            UserCommand::Export => RecorderInput::Export(export_dir.to_path_buf()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ScriptStep {
    /// A user request
    Command { command: UserCommand },
    /// A provider callback fired now
    Provider { event: ProviderCallback },
    /// Callbacks the provider fires in response to the next start
    OnStart { events: Vec<ProviderCallback> },
    /// Let time pass (retry timers, pending saves)
    Wait { ms: u64 },
}

/// Parse an NDJSON script. Blank lines and lines starting with `#` are skipped.
pub fn parse_script(reader: impl BufRead) -> anyhow::Result<Vec<ScriptStep>> {
    let mut steps = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read script line {}", index + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let step: ScriptStep = serde_json::from_str(trimmed)
            .with_context(|| format!("Invalid script step on line {}", index + 1))?;
        steps.push(step);
    }
    Ok(steps)
}

/// Replay `steps` against a fresh recorder and return the stored sessions,
/// oldest first.
pub async fn replay(
    config: RecorderConfig,
    backend: Arc<dyn StorageBackend>,
    steps: Vec<ScriptStep>,
) -> anyhow::Result<Vec<SessionSummary>> {
    let (tx, mut rx) = recorder_channel();
    let emitter = ProviderEmitter::new(tx.clone());
    let provider = ScriptedProvider::new(emitter.clone());
    let start_queue = provider.start_queue();

    let store = Arc::new(SessionStore::new(backend, config.db_name.clone(), config.db_version));
    let export_dir = config.export_dir.clone();
    let mut recorder = GazeRecorder::new(config, store.clone(), Box::new(provider), tx.clone());

    let mut events = recorder.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(RecorderEvent::Log(line)) => {
                    println!("[{:?}] {}", line.level, line.message);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!("Log printer skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    for step in steps {
        match step {
            ScriptStep::Command { command } => tx
                .send(command.into_input(&export_dir))
                .context("Recorder input closed")?,
            ScriptStep::Provider { event } => {
                if !emitter.callback(event) {
                    anyhow::bail!("Recorder input closed");
                }
            }
            ScriptStep::OnStart { events } => start_queue.lock().push_back(events),
            ScriptStep::Wait { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
        }
        settle(&mut recorder, &mut rx).await;
    }

    recorder.dispatch(RecorderInput::Shutdown).await;
    drop(recorder);
    printer.await.context("Log printer failed")?;

    let sessions = store.list_sessions_by(SessionIndex::Timestamp).await?;
    Ok(sessions.iter().map(|session| session.summary()).collect())
}

/// Dispatch everything queued so far, including callbacks the provider
/// fires while handling those inputs
async fn settle(recorder: &mut GazeRecorder, inputs: &mut mpsc::UnboundedReceiver<RecorderInput>) {
    while let Ok(input) = inputs.try_recv() {
        recorder.dispatch(input).await;
    }
    tokio::task::yield_now().await;
    recorder.reap_saves();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryBackend;
    use std::io::Cursor;

    const SCRIPT: &str = r#"
# calibrate, record three samples, stop
{"kind":"onStart","events":[{"callback":"OnCalibrationComplete"}]}
{"kind":"command","command":"start"}
{"kind":"provider","event":{"callback":"OnResult","payload":{"docX":1,"docY":2,"time":1000,"confidence":0.5}}}
{"kind":"provider","event":{"callback":"OnResult","payload":{"docX":1,"docY":2,"time":1010,"confidence":0.5}}}
{"kind":"provider","event":{"callback":"OnResult","payload":{"docX":1,"docY":2,"time":1500,"confidence":1.0}}}
{"kind":"provider","event":{"callback":"OnResult","payload":{"docX":1,"docY":2,"time":3000,"confidence":0.0}}}
{"kind":"command","command":"stop"}
"#;

    #[test]
    fn test_parse_script() {
        let steps = parse_script(Cursor::new(SCRIPT)).unwrap();
        assert_eq!(steps.len(), 7);
        assert_eq!(
            steps[1],
            ScriptStep::Command {
                command: UserCommand::Start
            }
        );
        assert!(matches!(steps[0], ScriptStep::OnStart { ref events } if events.len() == 1));
    }

    #[test]
    fn test_parse_error_names_line() {
        let err = parse_script(Cursor::new("{\"kind\":\"command\",\"command\":\"start\"}\nnope\n")).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[tokio::test]
    async fn test_replay_records_session() {
        let steps = parse_script(Cursor::new(SCRIPT)).unwrap();
        let sessions = replay(RecorderConfig::default(), Arc::new(MemoryBackend::new()), steps)
            .await
            .unwrap();

        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].data_points, 3);
        assert_eq!(sessions[0].duration, 2.0);
        assert!((sessions[0].average_confidence - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_settle_collects_finished_saves() {
        let (tx, mut rx) = recorder_channel();
        let provider = ScriptedProvider::new(ProviderEmitter::new(tx.clone()));
        provider.queue_on_start(vec![ProviderCallback::OnCalibrationComplete]);
        let store = Arc::new(SessionStore::new(Arc::new(MemoryBackend::new()), "db", 1));
        let mut recorder = GazeRecorder::new(RecorderConfig::default(), store.clone(), Box::new(provider), tx);

        recorder.start().await;
        settle(&mut recorder, &mut rx).await;
        recorder.ingest(crate::capture::types::GazeSample::new(0.0, 1.0, 1.0));
        recorder.stop().await;
        assert_eq!(recorder.pending_saves(), 1);

        while store.list_sessions().await.unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
        settle(&mut recorder, &mut rx).await;
        assert_eq!(recorder.pending_saves(), 0);
    }
}
