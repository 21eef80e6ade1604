//! Post state machine: Idle -> Validating -> Posting -> Posted | Failed
//!
//! A post is modelled as an explicit request/response pair. Each request
//! carries a correlation token; a response is applied only when it matches
//! the request currently in flight, so a late reply after the operator moved
//! on is discarded instead of touching the new state.

use uuid::Uuid;

use super::running_balance::RunningBalances;
use super::variance::VarianceReport;
use crate::types::*;
use crate::utils::validate_statement_header;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PosterState {
    Idle,
    Validating,
    Posting { token: Uuid },
    Posted { message: Option<String> },
    Failed { reason: String },
}

/// Commit request handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct PostRequest {
    pub token: Uuid,
    pub account_code: String,
    pub batch: ReconciliationBatch,
}

/// Transport's answer to a [`PostRequest`]
#[derive(Debug, Clone, PartialEq)]
pub struct PostResponse {
    pub token: Uuid,
    pub account_code: String,
    /// `Err` for transport failures, `Ok(Rejected)` for service refusals
    pub outcome: ReconcileResult<PostReply>,
}

impl PostResponse {
    pub fn for_request(request: &PostRequest, outcome: ReconcileResult<PostReply>) -> Self {
        Self {
            token: request.token,
            account_code: request.account_code.clone(),
            outcome,
        }
    }
}

/// What applying a response did
#[derive(Debug, Clone, PartialEq)]
pub enum PostResolution {
    Posted {
        message: Option<String>,
        batch: ReconciliationBatch,
    },
    Failed {
        reason: String,
    },
    /// Response did not belong to the request in flight
    Discarded,
}

/// Everything validation looks at
#[derive(Debug, Clone, Copy)]
pub struct PostInput<'a> {
    pub account: &'a BankAccount,
    pub header: &'a StatementHeader,
    pub balances: &'a RunningBalances,
    pub variance: &'a VarianceReport,
}

#[derive(Debug, Clone)]
pub struct ReconciliationPoster {
    state: PosterState,
    in_flight: Option<PostRequest>,
    require_balanced: bool,
}

impl Default for ReconciliationPoster {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ReconciliationPoster {
    pub fn new(require_balanced: bool) -> Self {
        Self {
            state: PosterState::Idle,
            in_flight: None,
            require_balanced,
        }
    }

    pub fn state(&self) -> &PosterState {
        &self.state
    }

    /// Whether a request is awaiting its response; the post action must be disabled
    pub fn is_posting(&self) -> bool {
        matches!(self.state, PosterState::Posting { .. })
    }

    pub fn in_flight(&self) -> Option<&PostRequest> {
        self.in_flight.as_ref()
    }

    /// Validate and build the batch; on success the poster is `Posting`
    ///
    /// Validation failures return the poster to `Idle` without building
    /// anything. While `Posting`, the trigger is refused.
    pub fn begin(&mut self, input: PostInput<'_>) -> ReconcileResult<PostRequest> {
        if self.is_posting() {
            tracing::debug!("post triggered while a post is in flight, ignored");
            return Err(ReconcileError::PostInProgress);
        }

        self.state = PosterState::Validating;
        let batch = match self.validate(input) {
            Ok(batch) => batch,
            Err(err) => {
                tracing::debug!(error = %err, "reconciliation post failed validation");
                self.state = PosterState::Idle;
                return Err(err);
            }
        };

        let request = PostRequest {
            token: Uuid::new_v4(),
            account_code: input.account.code.clone(),
            batch,
        };
        tracing::info!(
            account = %request.account_code,
            token = %request.token,
            statement = request.batch.statement_number,
            lines = request.batch.len(),
            "posting reconciliation batch"
        );
        self.state = PosterState::Posting {
            token: request.token,
        };
        self.in_flight = Some(request.clone());
        Ok(request)
    }

    fn validate(&self, input: PostInput<'_>) -> ReconcileResult<ReconciliationBatch> {
        if input.balances.is_empty() {
            return Err(ReconcileError::Validation(
                "Select at least one entry to reconcile".to_string(),
            ));
        }

        let resolved = validate_statement_header(input.header, input.account)?;

        if self.require_balanced && !input.variance.is_balanced {
            return Err(ReconcileError::Validation(format!(
                "Statement does not balance: variance {}",
                input.variance.variance
            )));
        }

        Ok(ReconciliationBatch {
            lines: input.balances.batch_lines(),
            statement_number: resolved.statement_number,
            statement_date: resolved.statement_date,
            reconciliation_date: resolved.reconciliation_date,
            statement_balance: input.header.statement_balance.clone(),
        })
    }

    /// Apply a transport response
    pub fn resolve(&mut self, response: PostResponse) -> PostResolution {
        let is_current = self.in_flight.as_ref().is_some_and(|request| {
            request.token == response.token && request.account_code == response.account_code
        });
        if !is_current || !self.is_posting() {
            tracing::warn!(
                account = %response.account_code,
                token = %response.token,
                "discarding stale reconciliation response"
            );
            return PostResolution::Discarded;
        }

        let Some(request) = self.in_flight.take() else {
            return PostResolution::Discarded;
        };

        match response.outcome {
            Ok(PostReply::Accepted { message }) => {
                tracing::info!(
                    account = %request.account_code,
                    statement = request.batch.statement_number,
                    "reconciliation posted"
                );
                self.state = PosterState::Posted {
                    message: message.clone(),
                };
                PostResolution::Posted {
                    message,
                    batch: request.batch,
                }
            }
            Ok(PostReply::Rejected { error }) => self.fail(&request, error),
            Err(err) => {
                let reason = match err {
                    ReconcileError::Rejected(message) => message,
                    other => other.to_string(),
                };
                self.fail(&request, reason)
            }
        }
    }

    fn fail(&mut self, request: &PostRequest, reason: String) -> PostResolution {
        tracing::warn!(account = %request.account_code, reason = %reason, "reconciliation post failed");
        self.state = PosterState::Failed {
            reason: reason.clone(),
        };
        PostResolution::Failed { reason }
    }

    /// Forget any in-flight request; its response will be discarded
    pub fn reset(&mut self) {
        if let Some(request) = self.in_flight.take() {
            tracing::debug!(token = %request.token, "abandoning in-flight reconciliation post");
        }
        self.state = PosterState::Idle;
    }
}
