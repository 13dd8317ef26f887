//! What happens when a session completes: save locally, then mirror once.

use std::sync::mpsc::{Receiver, TryRecvError};

use tracing::{info, warn};

use crate::error::LogError;
use crate::mirror::{MirrorOutcome, ResultSink};
use crate::progress_log::{LogHealth, ProgressLog, ResultRecord};
use crate::session::SessionResult;

pub struct Reporter {
    log: ProgressLog,
    sink: Option<Box<dyn ResultSink>>,
}

/// Outcome of reporting one finished session.
#[derive(Debug)]
pub struct Report {
    pub result: SessionResult,
    pub saved: Result<LogHealth, LogError>,
    pending: Option<Receiver<MirrorOutcome>>,
    mirrored: Option<MirrorOutcome>,
}

impl Reporter {
    pub fn new(log: ProgressLog, sink: Option<Box<dyn ResultSink>>) -> Self {
        Self { log, sink }
    }

    pub fn log(&self) -> &ProgressLog {
        &self.log
    }

    /// Persists `result` to the local log and starts a single mirror attempt.
    ///
    /// The local log is authoritative; the mirror result is only polled.
    pub fn report(&self, result: &SessionResult) -> Report {
        let saved = ResultRecord::now(result.wpm, result.accuracy)
            .map_err(LogError::from)
            .and_then(|record| self.log.append(&record));

        match &saved {
            Ok(LogHealth::Quarantined(backup)) => warn!(
                "progress log was corrupted and replaced, old content kept at {}",
                backup.display()
            ),
            Ok(_) => info!(
                "saved result: wpm={}, accuracy={}%",
                result.wpm, result.accuracy
            ),
            Err(e) => warn!("could not save progress to local file: {}", e),
        }

        let pending = self
            .sink
            .as_ref()
            .map(|sink| sink.submit(result.wpm, result.accuracy));

        Report {
            result: *result,
            saved,
            pending,
            mirrored: None,
        }
    }
}

impl Report {
    /// Checks for the mirror outcome without blocking.
    pub fn poll_mirror(&mut self) -> Option<&MirrorOutcome> {
        if self.mirrored.is_none() {
            if let Some(rx) = &self.pending {
                match rx.try_recv() {
                    Ok(outcome) => self.mirrored = Some(outcome),
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => {
                        self.mirrored = Some(MirrorOutcome::Unreachable(
                            "mirror worker exited without a result".to_string(),
                        ))
                    }
                }
                if self.mirrored.is_some() {
                    self.pending = None;
                }
            }
        }
        self.mirrored.as_ref()
    }

    pub fn is_mirror_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Blocking warning shown when the local save failed.
    pub fn save_warning(&self) -> Option<String> {
        self.saved
            .as_ref()
            .err()
            .map(|e| format!("Could not save progress to local file: {}", e))
    }

    pub fn mirror_warning(&self) -> Option<String> {
        self.mirrored.as_ref().and_then(MirrorOutcome::warning)
    }
}
