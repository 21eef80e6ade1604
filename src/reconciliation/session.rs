//! Reconciliation state for the active bank account

use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use super::catalog::EntryCatalog;
use super::poster::*;
use super::projection::{project, SortDirection, SortField, ViewOptions};
use super::running_balance::{RunningBalanceCalculator, RunningBalances};
use super::selection::SelectionSet;
use super::variance::{VarianceEvaluator, VarianceReport};
use crate::config::ReconciliationConfig;
use crate::types::*;
use crate::utils::validate_account_code;

/// One operator session against one bank account
///
/// All mutation happens through `&mut self` on the host's event loop. The
/// running balance is recomputed eagerly after every change to the
/// selection or the opening balance; sorting and filtering never touch it.
/// The selection is frozen while a post is in flight.
#[derive(Debug, Clone)]
pub struct ReconciliationSession {
    account: BankAccount,
    reconciled_balance: BigDecimal,
    catalog: EntryCatalog,
    selection: SelectionSet,
    view: ViewOptions,
    header: StatementHeader,
    poster: ReconciliationPoster,
    calculator: RunningBalanceCalculator,
    evaluator: VarianceEvaluator,
    balances: RunningBalances,
    needs_refresh: bool,
}

impl ReconciliationSession {
    pub fn new(
        account: BankAccount,
        status: ReconciliationStatus,
        entries: Vec<LedgerEntry>,
        config: &ReconciliationConfig,
    ) -> ReconcileResult<Self> {
        validate_account_code(&account.code)?;
        let catalog = EntryCatalog::new(entries)?;
        let mut session = Self {
            account,
            reconciled_balance: BigDecimal::from(0),
            catalog,
            selection: SelectionSet::new(),
            view: ViewOptions::new(config.default_sort, config.default_direction),
            header: StatementHeader::default(),
            poster: ReconciliationPoster::new(config.require_balanced_post),
            calculator: RunningBalanceCalculator::new(config.line_number_step),
            evaluator: VarianceEvaluator::new(config.balance_tolerance.clone()),
            balances: RunningBalances::default(),
            needs_refresh: false,
        };
        session.apply_status(status);
        session.recompute()?;
        tracing::debug!(
            account = %session.account.code,
            entries = session.catalog.len(),
            "reconciliation session opened"
        );
        Ok(session)
    }

    pub fn account(&self) -> &BankAccount {
        &self.account
    }

    pub fn catalog(&self) -> &EntryCatalog {
        &self.catalog
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn header(&self) -> &StatementHeader {
        &self.header
    }

    pub fn view_options(&self) -> &ViewOptions {
        &self.view
    }

    /// Balance reconciled by earlier statements; the opening balance of this one
    pub fn reconciled_balance(&self) -> &BigDecimal {
        &self.reconciled_balance
    }

    pub fn poster_state(&self) -> &PosterState {
        self.poster.state()
    }

    /// Whether the post action should be enabled
    pub fn can_post(&self) -> bool {
        !self.poster.is_posting() && !self.selection.is_empty()
    }

    /// Set after a successful post until the catalog is reloaded from the service
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh
    }

    // View

    pub fn set_filter(&mut self, filter_text: impl Into<String>) {
        self.view.filter_text = filter_text.into();
    }

    pub fn set_sort(&mut self, sort_field: SortField, direction: SortDirection) {
        self.view.sort_field = sort_field;
        self.view.direction = direction;
    }

    /// Sort by `sort_field`, flipping direction when it is already the sort column
    pub fn sort_by(&mut self, sort_field: SortField) {
        if self.view.sort_field == sort_field {
            self.view.direction = self.view.direction.toggled();
        } else {
            self.view.sort_field = sort_field;
            self.view.direction = SortDirection::Ascending;
        }
    }

    /// Entries in display order after filtering
    pub fn visible_entries(&self) -> Vec<&LedgerEntry> {
        project(&self.catalog, &self.view)
    }

    // Selection

    /// Toggle an entry; returns whether it is now selected
    pub fn toggle(&mut self, entry_id: &str) -> ReconcileResult<bool> {
        self.ensure_not_posting()?;
        if !self.catalog.contains(entry_id) {
            return Err(ReconcileError::EntryNotFound(entry_id.to_string()));
        }
        let selected = self.selection.toggle(entry_id);
        if let Err(err) = self.recompute() {
            self.selection.toggle(entry_id);
            return Err(err);
        }
        tracing::debug!(entry_id, selected, "selection toggled");
        Ok(selected)
    }

    /// Replace the selection with every visible entry, in display order
    pub fn select_all_visible(&mut self) -> ReconcileResult<()> {
        self.ensure_not_posting()?;
        let previous = self.selection.clone();
        let view = project(&self.catalog, &self.view);
        self.selection.select_all(view);
        if let Err(err) = self.recompute() {
            self.selection = previous;
            return Err(err);
        }
        Ok(())
    }

    pub fn clear_selection(&mut self) -> ReconcileResult<()> {
        self.ensure_not_posting()?;
        self.selection.clear();
        self.recompute()
    }

    /// Abandon the reconciliation: clear the selection and the header
    ///
    /// A post in flight is left alone; cancelling does not unsend it.
    pub fn cancel(&mut self) -> ReconcileResult<()> {
        if self.poster.is_posting() {
            return Err(ReconcileError::PostInProgress);
        }
        self.selection.clear();
        self.header = StatementHeader::default();
        self.poster.reset();
        self.recompute()
    }

    // Statement header

    pub fn set_statement_number(&mut self, statement_number: Option<u32>) {
        self.header.statement_number = statement_number;
    }

    pub fn set_statement_date(&mut self, statement_date: Option<NaiveDate>) {
        self.header.statement_date = statement_date;
    }

    pub fn set_statement_balance(&mut self, statement_balance: BigDecimal) {
        self.header.statement_balance = statement_balance;
    }

    pub fn set_reconciliation_date(&mut self, reconciliation_date: Option<NaiveDate>) {
        self.header.reconciliation_date = reconciliation_date;
    }

    /// Statement number the next post will use
    pub fn statement_number(&self) -> ReconcileResult<u32> {
        self.header.resolve_statement_number(&self.account)
    }

    pub fn set_reconciled_balance(&mut self, reconciled_balance: BigDecimal) -> ReconcileResult<()> {
        self.reconciled_balance = reconciled_balance;
        self.recompute()
    }

    // Derived figures

    pub fn running_balances(&self) -> &RunningBalances {
        &self.balances
    }

    /// Running balance of an entry; `None` when it is not selected
    pub fn balance_for(&self, entry_id: &str) -> Option<&BigDecimal> {
        self.balances.balance_for(entry_id)
    }

    pub fn variance(&self) -> VarianceReport {
        self.evaluator.evaluate(
            &self.header.statement_balance,
            &self.balances.closing_balance(),
        )
    }

    // Catalog lifecycle

    /// Install a fresh snapshot from the service
    ///
    /// Selected entries that vanished are evicted before the next recompute.
    pub fn refresh(
        &mut self,
        status: ReconciliationStatus,
        entries: Vec<LedgerEntry>,
    ) -> ReconcileResult<Vec<String>> {
        let evicted = self.catalog.replace(entries)?;
        let dropped = self.selection.retain_existing(&self.catalog);
        if !dropped.is_empty() {
            tracing::debug!(
                account = %self.account.code,
                dropped = dropped.len(),
                "evicted selected entries missing after refresh"
            );
        }
        self.apply_status(status);
        self.needs_refresh = false;
        self.recompute()?;
        Ok(evicted)
    }

    /// Move the session to another account
    ///
    /// Any post in flight keeps running, but its response no longer matches
    /// and will be discarded.
    pub fn switch_account(
        &mut self,
        account: BankAccount,
        status: ReconciliationStatus,
        entries: Vec<LedgerEntry>,
    ) -> ReconcileResult<()> {
        validate_account_code(&account.code)?;
        let catalog = EntryCatalog::new(entries)?;
        tracing::debug!(from = %self.account.code, to = %account.code, "switching account");
        self.account = account;
        self.catalog = catalog;
        self.selection.clear();
        self.header = StatementHeader::default();
        self.view.filter_text.clear();
        self.poster.reset();
        self.needs_refresh = false;
        self.apply_status(status);
        self.recompute()
    }

    // Posting

    /// Validate and build the commit request; the session is then `Posting`
    pub fn begin_post(&mut self) -> ReconcileResult<PostRequest> {
        let variance = self.variance();
        self.poster.begin(PostInput {
            account: &self.account,
            header: &self.header,
            balances: &self.balances,
            variance: &variance,
        })
    }

    /// Apply the response of a request made by [`Self::begin_post`]
    ///
    /// On success the committed entries leave the selection and the catalog,
    /// their values move into the reconciled balance and the account advances
    /// to the posted statement. On failure the selection is left exactly as it
    /// was so the operator can retry.
    pub fn complete_post(&mut self, response: PostResponse) -> PostResolution {
        if response.account_code != self.account.code {
            tracing::warn!(
                response_account = %response.account_code,
                active_account = %self.account.code,
                "discarding reconciliation response for inactive account"
            );
            return PostResolution::Discarded;
        }

        let resolution = self.poster.resolve(response);
        if let PostResolution::Posted { batch, .. } = &resolution {
            let posted_total: BigDecimal = batch
                .entry_ids()
                .filter_map(|id| self.catalog.get(id))
                .map(|entry| &entry.value)
                .sum();
            self.reconciled_balance += posted_total;
            for id in batch.entry_ids() {
                self.selection.remove(id);
            }
            self.catalog.remove_all(batch.entry_ids());
            self.account.last_statement_number = batch.statement_number;
            self.header = StatementHeader::default();
            self.needs_refresh = true;
            if let Err(err) = self.recompute() {
                tracing::warn!(error = %err, "recompute after reconciliation post failed");
            }
        }
        resolution
    }

    fn apply_status(&mut self, status: ReconciliationStatus) {
        self.account.last_statement_number = status.last_statement_number;
        self.reconciled_balance = status.reconciled_balance;
    }

    fn ensure_not_posting(&self) -> ReconcileResult<()> {
        if self.poster.is_posting() {
            return Err(ReconcileError::PostInProgress);
        }
        Ok(())
    }

    fn recompute(&mut self) -> ReconcileResult<()> {
        self.balances =
            self.calculator
                .compute(&self.reconciled_balance, &self.selection, &self.catalog)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn money(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 7, day).unwrap()
    }

    fn session() -> ReconciliationSession {
        let status = ReconciliationStatus {
            last_statement_number: 8,
            reconciled_balance: money("1000.00"),
        };
        ReconciliationSession::new(
            BankAccount::new("1200", "Current account"),
            status,
            vec![
                LedgerEntry::new("1", date(2), money("-50.00")).with_reference("CHQ 100"),
                LedgerEntry::new("2", date(1), money("120.00")).with_reference("Deposit"),
                LedgerEntry::new("3", date(3), money("-20.00")).with_reference("Fee"),
            ],
            &ReconciliationConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_toggle_recomputes_balances() {
        let mut session = session();
        assert!(session.toggle("1").unwrap());
        assert_eq!(session.balance_for("1"), Some(&money("950.00")));
        assert_eq!(session.balance_for("2"), None);

        assert!(session.toggle("2").unwrap());
        assert_eq!(session.running_balances().closing_balance(), money("1070.00"));

        assert!(matches!(
            session.toggle("99"),
            Err(ReconcileError::EntryNotFound(_))
        ));
    }

    #[test]
    fn test_sorting_does_not_reorder_selection() {
        let mut session = session();
        session.toggle("3").unwrap();
        session.toggle("1").unwrap();
        session.set_sort(SortField::Amount, SortDirection::Ascending);

        assert_eq!(session.running_balances().line_number_for("3"), Some(10));
        assert_eq!(session.running_balances().line_number_for("1"), Some(20));
    }

    #[test]
    fn test_select_all_uses_display_order() {
        let mut session = session();
        session.sort_by(SortField::Date);
        let ids: Vec<&str> = session.visible_entries().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "2"]);

        session.select_all_visible().unwrap();
        let ordered: Vec<&str> = session.selection().ordered_ids().collect();
        assert_eq!(ordered, vec!["3", "1", "2"]);
        assert_eq!(session.running_balances().line_number_for("2"), Some(30));
    }

    #[test]
    fn test_select_all_respects_filter() {
        let mut session = session();
        session.toggle("3").unwrap();
        session.set_filter("chq");
        session.select_all_visible().unwrap();
        let ordered: Vec<&str> = session.selection().ordered_ids().collect();
        assert_eq!(ordered, vec!["1"]);
    }

    #[test]
    fn test_opening_balance_change_recomputes() {
        let mut session = session();
        session.toggle("2").unwrap();
        session.set_reconciled_balance(money("0")).unwrap();
        assert_eq!(session.balance_for("2"), Some(&money("120.00")));
    }

    #[test]
    fn test_refresh_evicts_vanished_selection() {
        let mut session = session();
        session.toggle("1").unwrap();
        session.toggle("3").unwrap();

        let evicted = session
            .refresh(
                ReconciliationStatus {
                    last_statement_number: 8,
                    reconciled_balance: money("1000.00"),
                },
                vec![
                    LedgerEntry::new("2", date(1), money("120.00")),
                    LedgerEntry::new("3", date(3), money("-20.00")),
                ],
            )
            .unwrap();
        assert_eq!(evicted, vec!["1".to_string()]);
        assert!(!session.selection().contains("1"));
        assert_eq!(session.running_balances().line_number_for("3"), Some(10));
        assert_eq!(session.running_balances().closing_balance(), money("980.00"));
    }

    #[test]
    fn test_statement_number_defaults_to_next() {
        let mut session = session();
        assert_eq!(session.statement_number(), Ok(9));
        session.set_statement_number(Some(12));
        assert_eq!(session.statement_number(), Ok(12));
    }

    #[test]
    fn test_cancel_clears_selection_and_header() {
        let mut session = session();
        session.toggle("1").unwrap();
        session.set_statement_date(Some(date(31)));
        session.cancel().unwrap();
        assert!(session.selection().is_empty());
        assert_eq!(session.header(), &StatementHeader::default());
    }

    #[test]
    fn test_post_success_advances_account() {
        let mut session = session();
        session.toggle("1").unwrap();
        session.toggle("2").unwrap();
        session.set_statement_date(Some(date(31)));
        session.set_statement_balance(money("1070.00"));
        assert!(session.variance().is_balanced);

        let request = session.begin_post().unwrap();
        assert!(!session.can_post());
        let resolution = session.complete_post(PostResponse::for_request(
            &request,
            Ok(PostReply::Accepted {
                message: Some("Statement 9 reconciled".to_string()),
            }),
        ));

        assert!(matches!(resolution, PostResolution::Posted { .. }));
        assert!(session.selection().is_empty());
        assert_eq!(session.account().last_statement_number, 9);
        assert_eq!(session.reconciled_balance(), &money("1070.00"));
        assert_eq!(session.catalog().len(), 1);
        assert!(session.needs_refresh());
        assert_eq!(session.statement_number(), Ok(10));
    }

    #[test]
    fn test_selection_is_frozen_while_posting() {
        let mut session = session();
        session.toggle("1").unwrap();
        session.toggle("2").unwrap();
        session.set_statement_date(Some(date(31)));
        let request = session.begin_post().unwrap();

        assert_eq!(session.toggle("3"), Err(ReconcileError::PostInProgress));
        assert_eq!(session.toggle("1"), Err(ReconcileError::PostInProgress));
        assert_eq!(session.select_all_visible(), Err(ReconcileError::PostInProgress));
        assert_eq!(session.clear_selection(), Err(ReconcileError::PostInProgress));
        let ordered: Vec<&str> = session.selection().ordered_ids().collect();
        assert_eq!(ordered, vec!["1", "2"]);

        session.complete_post(PostResponse::for_request(
            &request,
            Ok(PostReply::Accepted { message: None }),
        ));
        assert_eq!(session.reconciled_balance(), &money("1070.00"));
        assert!(session.catalog().contains("3"));
        assert!(session.selection().is_empty());
        assert!(session.toggle("3").unwrap());
        assert_eq!(session.balance_for("3"), Some(&money("1050.00")));
    }

    #[test]
    fn test_posted_balance_comes_from_batch() {
        let mut session = session();
        session.toggle("2").unwrap();
        session.set_statement_date(Some(date(31)));
        let request = session.begin_post().unwrap();

        // selection drifts from the batch in flight
        session.selection.insert("3");
        session.recompute().unwrap();

        session.complete_post(PostResponse::for_request(
            &request,
            Ok(PostReply::Accepted { message: None }),
        ));
        assert_eq!(session.reconciled_balance(), &money("1120.00"));
        let ordered: Vec<&str> = session.selection().ordered_ids().collect();
        assert_eq!(ordered, vec!["3"]);
        assert_eq!(session.balance_for("3"), Some(&money("1100.00")));
    }

    #[test]
    fn test_line_number_overflow_leaves_selection_untouched() {
        let config = ReconciliationConfig {
            line_number_step: u32::MAX / 2 + 1,
            ..ReconciliationConfig::default()
        };
        let mut session = ReconciliationSession::new(
            BankAccount::new("1200", "Current account"),
            ReconciliationStatus::default(),
            vec![
                LedgerEntry::new("1", date(1), money("5.00")),
                LedgerEntry::new("2", date(2), money("7.00")),
            ],
            &config,
        )
        .unwrap();

        session.toggle("1").unwrap();
        assert!(matches!(
            session.toggle("2"),
            Err(ReconcileError::Validation(_))
        ));
        let ordered: Vec<&str> = session.selection().ordered_ids().collect();
        assert_eq!(ordered, vec!["1"]);
        assert!(matches!(
            session.select_all_visible(),
            Err(ReconcileError::Validation(_))
        ));
        assert_eq!(session.selection().len(), 1);
        assert_eq!(session.running_balances().closing_balance(), money("5.00"));
    }

    #[test]
    fn test_switch_account_discards_late_response() {
        let mut session = session();
        session.toggle("1").unwrap();
        session.set_statement_date(Some(date(31)));
        let request = session.begin_post().unwrap();

        session
            .switch_account(
                BankAccount::new("1210", "Savings"),
                ReconciliationStatus::default(),
                vec![LedgerEntry::new("s1", date(5), money("10.00"))],
            )
            .unwrap();
        session.toggle("s1").unwrap();

        let resolution = session.complete_post(PostResponse::for_request(
            &request,
            Ok(PostReply::Accepted { message: None }),
        ));
        assert_eq!(resolution, PostResolution::Discarded);
        assert!(session.selection().contains("s1"));
        assert_eq!(session.poster_state(), &PosterState::Idle);
        assert_eq!(session.account().last_statement_number, 0);
    }
}
