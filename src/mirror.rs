//! Best-effort copy of a finished result to the ingestion server.
//!
//! One POST per result, on its own thread, bounded by a timeout. Failures
//! are logged and reported back; they are never retried.

use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorOutcome {
    Delivered,
    /// The server answered with a non-200 status.
    Rejected(u16),
    /// Connection refused, timeout, DNS failure and the like.
    Unreachable(String),
}

impl MirrorOutcome {
    /// Non-blocking warning text for the user, if any.
    pub fn warning(&self) -> Option<String> {
        match self {
            MirrorOutcome::Delivered => None,
            MirrorOutcome::Rejected(status) => Some(format!(
                "Dashboard server rejected the result (HTTP {})",
                status
            )),
            MirrorOutcome::Unreachable(_) => Some(
                "Could not send data to the web dashboard. Is the server running?".to_string(),
            ),
        }
    }
}

/// Destination for finished results besides the local log.
pub trait ResultSink: Send + Sync {
    /// Starts one delivery attempt; the outcome arrives on the returned channel.
    fn submit(&self, wpm: f64, accuracy: f64) -> Receiver<MirrorOutcome>;
}

#[derive(Debug, Serialize)]
struct Payload {
    wpm: f64,
    accuracy: f64,
}

#[derive(Debug, Clone)]
pub struct HttpMirror {
    url: String,
    timeout: Duration,
}

impl HttpMirror {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    /// Blocking POST, bounded by the configured timeout.
    pub fn post(&self, wpm: f64, accuracy: f64) -> MirrorOutcome {
        let client = match reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
        {
            Ok(c) => c,
            Err(e) => return MirrorOutcome::Unreachable(e.to_string()),
        };

        match client
            .post(&self.url)
            .json(&Payload { wpm, accuracy })
            .send()
        {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => MirrorOutcome::Delivered,
            Ok(resp) => MirrorOutcome::Rejected(resp.status().as_u16()),
            Err(e) => MirrorOutcome::Unreachable(e.to_string()),
        }
    }
}

impl ResultSink for HttpMirror {
    fn submit(&self, wpm: f64, accuracy: f64) -> Receiver<MirrorOutcome> {
        let (tx, rx) = mpsc::channel();
        let mirror = self.clone();

        thread::spawn(move || {
            let outcome = mirror.post(wpm, accuracy);
            match &outcome {
                MirrorOutcome::Delivered => info!("sent result to {}", mirror.url),
                MirrorOutcome::Rejected(status) => {
                    warn!("failed to send result, server responded with: {}", status)
                }
                MirrorOutcome::Unreachable(reason) => {
                    warn!("could not connect to {}: {}", mirror.url, reason)
                }
            }
            let _ = tx.send(outcome);
        });

        rx
    }
}
