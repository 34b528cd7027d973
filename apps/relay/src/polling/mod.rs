//! Review status polling.
//!
//! The backend has no push channel, so waiting for a review means asking
//! again on a fixed interval. A poll task stops on its own once it sees
//! `completed`/`failed` or an error, and is aborted when its `PollHandle`
//! is dropped, so a client that goes away leaves no timer behind.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::credentials::Credential;
use crate::models::review::ReviewSnapshot;
use crate::relay::{BackendClient, RelayMethod};

pub mod handlers;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PollError {
    #[error("Backend returned status {status}")]
    Status { status: u16 },

    #[error("Backend unreachable: {0}")]
    Transport(String),

    #[error("Review payload malformed: {0}")]
    Malformed(String),
}

/// Latest thing a poll task knows about its review.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Waiting,
    Observed(ReviewSnapshot),
    Failed(PollError),
}

impl PollState {
    pub fn is_done(&self) -> bool {
        match self {
            PollState::Waiting => false,
            PollState::Observed(snapshot) => snapshot.status.is_terminal(),
            PollState::Failed(_) => true,
        }
    }
}

#[derive(Clone)]
pub struct StatusPoller {
    backend: BackendClient,
    interval: Duration,
}

impl StatusPoller {
    pub fn new(backend: BackendClient, interval: Duration) -> Self {
        Self { backend, interval }
    }

    /// Starts polling `reviews/<id>` right away and then every interval.
    pub fn spawn(&self, review_id: &str, credential: Option<Credential>) -> PollHandle {
        let (tx, rx) = watch::channel(PollState::Waiting);
        let suffix = format!("reviews/{}", review_id.trim_matches('/'));
        let task = tokio::spawn(poll_loop(
            self.backend.clone(),
            suffix,
            credential,
            self.interval,
            tx,
        ));
        PollHandle { rx, task }
    }
}

/// Owner of a running poll. Dropping it stops the poll.
pub struct PollHandle {
    rx: watch::Receiver<PollState>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn latest(&self) -> PollState {
        self.rx.borrow().clone()
    }

    /// Resolves once the poll reaches a terminal status or fails.
    pub async fn wait_done(&mut self) -> PollState {
        loop {
            let state = self.rx.borrow_and_update().clone();
            if state.is_done() {
                return state;
            }
            if self.rx.changed().await.is_err() {
                // task ended without a terminal state (aborted elsewhere)
                return self.rx.borrow().clone();
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn poll_loop(
    backend: BackendClient,
    suffix: String,
    credential: Option<Credential>,
    interval: Duration,
    tx: watch::Sender<PollState>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let state = match fetch_review(&backend, &suffix, credential.as_ref()).await {
            Ok(snapshot) => PollState::Observed(snapshot),
            Err(e) => PollState::Failed(e),
        };
        let done = state.is_done();
        debug!("Polled /{suffix}: {state:?}");

        if tx.send(state).is_err() {
            debug!("Poll receiver for /{suffix} dropped, stopping");
            return;
        }
        if done {
            return;
        }
    }
}

async fn fetch_review(
    backend: &BackendClient,
    suffix: &str,
    credential: Option<&Credential>,
) -> Result<ReviewSnapshot, PollError> {
    let response = backend
        .request(RelayMethod::Get, suffix, None, credential)
        .send()
        .await
        .map_err(|e| PollError::Transport(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(PollError::Status {
            status: status.as_u16(),
        });
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| PollError::Malformed(e.to_string()))?;

    ReviewSnapshot::from_value(body)
        .ok_or_else(|| PollError::Malformed("missing status field".to_string()))
}
