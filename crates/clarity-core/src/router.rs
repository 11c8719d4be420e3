use std::time::Duration;

use futures::{stream, StreamExt};
use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use clarity_client::{is_file_uri, strip_state, LimsClient, LimsError, RoutingAction};

use crate::config::RouterConfig;
use crate::error::Result;

// ─── RoutingOutcome ───────────────────────────────────────────────────────

/// Per-uri fates of one routing call. Exhausted retries land in `failed`;
/// the call itself still returns `Ok` — partial success is the designed
/// outcome, not an error.
#[derive(Debug, Default, Serialize)]
pub struct RoutingOutcome {
    /// Uris accepted by the target step's queue.
    pub routed: Vec<String>,
    /// File uris dropped before submission — files are not routable.
    pub skipped: Vec<String>,
    /// Batches that exhausted their retry budget or failed fatally.
    pub failed: Vec<FailedBatch>,
}

impl RoutingOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_uris(&self) -> impl Iterator<Item = &str> {
        self.failed
            .iter()
            .flat_map(|batch| batch.uris.iter().map(String::as_str))
    }
}

#[derive(Debug, Serialize)]
pub struct FailedBatch {
    pub uris: Vec<String>,
    #[serde(serialize_with = "error_as_string")]
    pub error: LimsError,
}

fn error_as_string<S: Serializer>(error: &LimsError, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

// ─── StepRouter ───────────────────────────────────────────────────────────

/// Moves artifacts into (or out of) a workflow step's queue.
///
/// One request carrying every uri scales its latency with queue depth, and
/// large queues push it past the service timeout even though the operation
/// would eventually succeed server-side. Submitting bounded batches caps
/// per-request latency independent of total volume; each batch succeeds or
/// fails on its own, with transient failures retried under backoff.
pub struct StepRouter<'a, C: LimsClient + ?Sized> {
    client: &'a C,
    config: RouterConfig,
}

enum BatchResult {
    Routed(Vec<String>),
    Failed { uris: Vec<String>, error: LimsError },
}

impl<'a, C: LimsClient + ?Sized> StepRouter<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            config: RouterConfig::default(),
        }
    }

    pub fn with_config(client: &'a C, config: RouterConfig) -> Self {
        Self { client, config }
    }

    /// Enqueue `artifact_uris` into the step at `target_step_uri`.
    pub async fn route(
        &self,
        artifact_uris: &[String],
        target_step_uri: &str,
    ) -> Result<RoutingOutcome> {
        self.submit_all(artifact_uris, target_step_uri, RoutingAction::Assign)
            .await
    }

    /// Remove `artifact_uris` from the step's queue. The artifacts stay in
    /// the system; only the queue membership changes.
    pub async fn unroute(
        &self,
        artifact_uris: &[String],
        target_step_uri: &str,
    ) -> Result<RoutingOutcome> {
        self.submit_all(artifact_uris, target_step_uri, RoutingAction::Unassign)
            .await
    }

    async fn submit_all(
        &self,
        artifact_uris: &[String],
        target_step_uri: &str,
        action: RoutingAction,
    ) -> Result<RoutingOutcome> {
        let mut skipped = Vec::new();
        let mut routable = Vec::new();
        for uri in artifact_uris {
            let clean = strip_state(uri);
            if is_file_uri(&clean) {
                skipped.push(clean);
            } else {
                routable.push(clean);
            }
        }

        let batch_size = self.config.batch_size.max(1);
        let batches: Vec<Vec<String>> = routable
            .chunks(batch_size)
            .map(|chunk| chunk.to_vec())
            .collect();
        let total = batches.len();
        debug!(
            target = target_step_uri,
            action = action.as_str(),
            uris = routable.len(),
            skipped = skipped.len(),
            batches = total,
            "submitting routing batches"
        );

        let submissions: Vec<BatchResult> =
            stream::iter(batches.into_iter().enumerate().map(|(index, batch)| {
                self.submit_batch(index, total, batch, target_step_uri, action)
            }))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut outcome = RoutingOutcome {
            skipped,
            ..RoutingOutcome::default()
        };
        for submission in submissions {
            match submission {
                BatchResult::Routed(uris) => outcome.routed.extend(uris),
                BatchResult::Failed { uris, error } => {
                    outcome.failed.push(FailedBatch { uris, error })
                }
            }
        }
        Ok(outcome)
    }

    /// Submit one batch, retrying transient failures with exponential
    /// backoff. A server-supplied `Retry-After` overrides the computed
    /// delay for that attempt. `NotFound`/`Fatal` fail the batch at once.
    async fn submit_batch(
        &self,
        index: usize,
        total: usize,
        batch: Vec<String>,
        target_step_uri: &str,
        action: RoutingAction,
    ) -> BatchResult {
        let mut delay = Duration::from_millis(self.config.initial_backoff_ms);
        let max_delay = Duration::from_millis(self.config.max_backoff_ms);
        let mut attempt: u32 = 0;

        loop {
            match self
                .client
                .submit_routing(target_step_uri, &batch, action)
                .await
            {
                Ok(()) => {
                    debug!(batch = index + 1, total, size = batch.len(), "batch routed");
                    return BatchResult::Routed(batch);
                }
                Err(error) if error.is_transient() && attempt < self.config.max_retries => {
                    let wait = match &error {
                        LimsError::Transient {
                            retry_after: Some(server_wait),
                            ..
                        } => (*server_wait).min(max_delay),
                        _ => delay,
                    };
                    attempt += 1;
                    warn!(
                        batch = index + 1,
                        total,
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        %error,
                        "transient routing failure, backing off"
                    );
                    tokio::time::sleep(wait).await;
                    delay = delay
                        .mul_f64(self.config.backoff_multiplier)
                        .min(max_delay);
                }
                Err(error) => {
                    warn!(batch = index + 1, total, %error, "batch failed");
                    return BatchResult::Failed { uris: batch, error };
                }
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
