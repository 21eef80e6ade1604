//! Async driver tying a [`ReconciliationSession`] to a [`LedgerService`]

use super::poster::{PostRequest, PostResolution, PostResponse};
use super::session::ReconciliationSession;
use crate::config::ReconciliationConfig;
use crate::traits::LedgerService;
use crate::types::*;

/// Reconciliation front desk for an embedding application
///
/// Posting is split into [`dispatch`](Self::dispatch), [`transmit`](Self::transmit)
/// and [`deliver`](Self::deliver) so a host can run the network round-trip on
/// its own schedule; [`post`](Self::post) does all three in sequence.
pub struct ReconciliationDesk<S: LedgerService> {
    service: S,
    config: ReconciliationConfig,
    session: Option<ReconciliationSession>,
}

impl<S: LedgerService> ReconciliationDesk<S> {
    pub fn new(service: S) -> Self {
        Self::with_config(service, ReconciliationConfig::default())
    }

    pub fn with_config(service: S, config: ReconciliationConfig) -> Self {
        Self {
            service,
            config,
            session: None,
        }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    pub async fn list_accounts(&self) -> ReconcileResult<Vec<BankAccount>> {
        self.service.list_bank_accounts().await
    }

    /// Select a bank account and load its unreconciled entries
    pub async fn open_account(
        &mut self,
        account_code: &str,
    ) -> ReconcileResult<&mut ReconciliationSession> {
        let account = self
            .service
            .list_bank_accounts()
            .await?
            .into_iter()
            .find(|account| account.code == account_code)
            .ok_or_else(|| ReconcileError::AccountNotFound(account_code.to_string()))?;
        let status = self.service.get_reconciliation_status(account_code).await?;
        let entries = self.service.get_unreconciled_entries(account_code).await?;
        tracing::info!(
            account = account_code,
            entries = entries.len(),
            "opened bank account for reconciliation"
        );

        match self.session.as_mut() {
            Some(session) => session.switch_account(account, status, entries)?,
            None => {
                let session = ReconciliationSession::new(account, status, entries, &self.config)?;
                self.session = Some(session);
            }
        }
        self.session_mut()
    }

    pub fn session(&self) -> ReconcileResult<&ReconciliationSession> {
        self.session.as_ref().ok_or(ReconcileError::NoAccountSelected)
    }

    pub fn session_mut(&mut self) -> ReconcileResult<&mut ReconciliationSession> {
        self.session.as_mut().ok_or(ReconcileError::NoAccountSelected)
    }

    /// Reload the active account's snapshot; returns entry ids that disappeared
    pub async fn refresh(&mut self) -> ReconcileResult<Vec<String>> {
        let account_code = self.session()?.account().code.clone();
        let status = self.service.get_reconciliation_status(&account_code).await?;
        let entries = self.service.get_unreconciled_entries(&account_code).await?;

        let session = self.session_mut()?;
        if session.account().code != account_code {
            return Err(ReconcileError::Validation(format!(
                "Active account changed from '{}' during refresh",
                account_code
            )));
        }
        session.refresh(status, entries)
    }

    /// Validate the session and build the commit request
    pub fn dispatch(&mut self) -> ReconcileResult<PostRequest> {
        self.session_mut()?.begin_post()
    }

    /// Send a request to the service; never touches session state
    pub async fn transmit(&self, request: &PostRequest) -> PostResponse {
        let outcome = self
            .service
            .post_reconciliation(&request.account_code, &request.batch)
            .await;
        PostResponse::for_request(request, outcome)
    }

    /// Apply a response, reloading the catalog after a successful post
    pub async fn deliver(&mut self, response: PostResponse) -> ReconcileResult<PostResolution> {
        let resolution = self.session_mut()?.complete_post(response);
        if let PostResolution::Posted { .. } = resolution {
            if let Err(err) = self.refresh().await {
                // batch is already committed
                tracing::warn!(error = %err, "refresh after reconciliation post failed");
            }
        }
        Ok(resolution)
    }

    /// Dispatch, transmit and deliver in one go
    pub async fn post(&mut self) -> ReconcileResult<PostResolution> {
        let request = self.dispatch()?;
        let response = self.transmit(&request).await;
        self.deliver(response).await
    }
}
