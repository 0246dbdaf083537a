//! Handing session summaries to the external logging endpoint.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use log::{info, warn};

use crate::error::SubmitError;
use crate::models::{SaveState, SessionSummary};

/// Anything that can accept a finished session summary.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(&self, summary: &SessionSummary) -> Result<(), SubmitError>;
}

#[async_trait]
impl<T: Submitter + ?Sized> Submitter for Arc<T> {
    async fn submit(&self, summary: &SessionSummary) -> Result<(), SubmitError> {
        (**self).submit(summary).await
    }
}

/// POSTs the summary as JSON to the configured logging endpoint.
#[derive(Debug, Clone)]
pub struct HttpSubmitter {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl HttpSubmitter {
    pub fn new(endpoint: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
        }
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(&self, summary: &SessionSummary) -> Result<(), SubmitError> {
        let endpoint = self.endpoint.as_deref().ok_or(SubmitError::NoEndpoint)?;

        let resp = self.client.post(endpoint).json(summary).send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(SubmitError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[derive(Debug, Default)]
struct Slot {
    summary: Option<SessionSummary>,
    state: SaveState,
}

/// One-shot delivery latch for a single session's summary.
///
/// Only the first staged summary is kept. At most one submission is in flight
/// at a time, and once one has succeeded every later flush is a no-op. A failed
/// submission leaves the summary staged so it can be flushed again.
#[derive(Debug)]
pub struct SummaryOutbox<S> {
    submitter: S,
    slot: Mutex<Slot>,
}

impl<S: Submitter> SummaryOutbox<S> {
    pub fn new(submitter: S) -> Self {
        Self {
            submitter,
            slot: Mutex::new(Slot::default()),
        }
    }

    /// Returns false when a summary was already staged; the new one is dropped.
    pub fn stage(&self, summary: SessionSummary) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.summary.is_some() {
            return false;
        }
        slot.summary = Some(summary);
        true
    }

    pub fn staged(&self) -> Option<SessionSummary> {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .summary
            .clone()
    }

    pub fn save_state(&self) -> SaveState {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .state
            .clone()
    }

    /// Submits the staged summary unless a submission is already in flight
    /// or has succeeded. Returns the resulting save state.
    pub async fn flush(&self) -> SaveState {
        let summary = {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            if matches!(slot.state, SaveState::Saving | SaveState::Saved) {
                return slot.state.clone();
            }
            let Some(summary) = slot.summary.clone() else {
                return slot.state.clone();
            };
            slot.state = SaveState::Saving;
            summary
        };

        let result = self.submitter.submit(&summary).await;

        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.state = match result {
            Ok(()) => {
                info!("session {} summary saved", summary.session_id);
                SaveState::Saved
            }
            Err(e) => {
                warn!("session {} summary not saved: {}", summary.session_id, e);
                SaveState::Error(e.to_string())
            }
        };
        slot.state.clone()
    }
}
