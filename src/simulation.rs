use chrono::{Duration, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use tracing::debug;

use crate::accrual::AccrualEngine;
use crate::balloon::{BalloonEngine, TopUpTerms};
use crate::config::{AccountConfig, AmortizationMethod};
use crate::decimal::Money;
use crate::derived::{total_outstanding_debt, DerivedParameters};
use crate::errors::Result;
use crate::events::{HookOutput, WorkflowRequest};
use crate::ledger::{BalanceAddress, LedgerSnapshot};
use crate::lifecycle::LifecycleEngine;
use crate::payments::{IncomingPayment, PaymentProcessor};
use crate::schedule;

/// In-memory host for one loan account. Drives the engines day by day
/// against simulated time and applies their postings, standing in for the
/// ledger platform in tests and scenario runs.
pub struct SimulatedAccount {
    pub config: AccountConfig,
    pub ledger: LedgerSnapshot,
    /// workflow requests emitted so far, oldest first
    pub workflows: Vec<WorkflowRequest>,
    next_overdue_check: Option<NaiveDate>,
    next_delinquency_check: Option<NaiveDate>,
}

impl SimulatedAccount {
    /// open the account and disburse the principal as of the current date
    pub fn open(config: AccountConfig, time_provider: &SafeTimeProvider) -> Result<Self> {
        config.validate()?;
        let today = time_provider.now().date_naive();
        let ledger = LedgerSnapshot::new(&config.denomination, today)
            .with_balance(BalanceAddress::Principal, config.principal);
        debug!(account_id = %config.account_id, %today, "account opened");
        Ok(Self {
            config,
            ledger,
            workflows: Vec::new(),
            next_overdue_check: None,
            next_delinquency_check: None,
        })
    }

    fn apply(&mut self, output: HookOutput) {
        self.ledger.apply_plan(&output.postings);
        self.workflows.extend(output.workflows);
    }

    fn is_repayment_date(&self, date: NaiveDate) -> bool {
        self.config.amortisation_method != AmortizationMethod::NoRepayment
            && self.ledger.elapsed_periods < self.config.total_term
            && schedule::nth_repayment_date(&self.config, self.ledger.elapsed_periods + 1) == date
    }

    fn is_balloon_date(&self, date: NaiveDate) -> bool {
        matches!(
            self.config.amortisation_method,
            AmortizationMethod::InterestOnly
                | AmortizationMethod::NoRepayment
                | AmortizationMethod::MinimumRepaymentWithBalloon
        ) && schedule::balloon_date(&self.config) == date
    }

    /// run one calendar day's scheduled processing
    fn tick(&mut self, date: NaiveDate) {
        let accrual = AccrualEngine::new(&self.config).accrue(&self.ledger, date);
        self.ledger.apply_plan(&accrual.plan);

        if self.is_repayment_date(date) {
            let output = LifecycleEngine::new(&self.config).transfer_due(&self.ledger, date);
            if !output.is_noop() {
                self.apply(output);
                // period count is re-derived from the schedule, not counted
                self.ledger.elapsed_periods = schedule::elapsed_periods(&self.config, date);
                self.ledger.last_due_transfer = Some(date);
                self.next_overdue_check =
                    Some(date + Duration::days(self.config.penalty.repayment_period_days as i64));
            }
        }

        if self.next_overdue_check == Some(date) {
            let output = LifecycleEngine::new(&self.config).check_overdue(&self.ledger, date);
            if !output.is_noop() {
                self.next_delinquency_check =
                    Some(date + Duration::days(self.config.penalty.grace_period_days as i64));
            }
            self.apply(output);
            self.next_overdue_check = None;
        }

        if self.next_delinquency_check == Some(date) {
            let output = LifecycleEngine::new(&self.config).check_delinquency(&self.ledger, date);
            self.apply(output);
            self.next_delinquency_check = None;
        }

        if self.is_balloon_date(date) {
            let output = BalloonEngine::new(&self.config).transfer_balloon(&self.ledger, date);
            self.apply(output);
        }

        self.ledger.as_of = date;
    }

    /// process every day up to the provider's current date
    pub fn advance_to_now(&mut self, time_provider: &SafeTimeProvider) {
        let today = time_provider.now().date_naive();
        let mut date = self.ledger.as_of + Duration::days(1);
        while date <= today {
            self.tick(date);
            date += Duration::days(1);
        }
    }

    /// receive an inbound repayment dated now
    pub fn receive_payment(
        &mut self,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        let payment = IncomingPayment::new(
            amount,
            &self.ledger.denomination,
            time_provider.now().date_naive(),
        );
        let output = PaymentProcessor::new(&self.config).process(&self.ledger, &payment)?;
        self.apply(output);
        Ok(())
    }

    /// re-originate at a larger principal, restarting the schedule
    pub fn top_up(&mut self, terms: &TopUpTerms) -> Result<()> {
        let (config, output) = BalloonEngine::new(&self.config).apply_top_up(&self.ledger, terms)?;
        self.apply(output);
        self.config = config;
        self.ledger.elapsed_periods = 0;
        self.ledger.last_due_transfer = None;
        self.next_overdue_check = None;
        self.next_delinquency_check = None;
        Ok(())
    }

    pub fn derived_parameters(&self) -> DerivedParameters {
        DerivedParameters::compute(&self.config, &self.ledger)
    }

    /// everything owed if the account settled right now
    pub fn total_outstanding_debt(&self) -> Money {
        total_outstanding_debt(&self.ledger)
    }

    pub fn is_closed(&self) -> bool {
        self.workflows
            .iter()
            .any(|w| matches!(w, WorkflowRequest::LoanClosure { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::{SafeTimeProvider, TimeSource};
    use rust_decimal_macros::dec;

    fn time_at(y: i32, m: u32, d: u32) -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(y, m, d, 0, 0, 1).unwrap(),
        ))
    }

    fn no_repayment_config() -> AccountConfig {
        AccountConfig::new(
            Money::from_major(100_000),
            Rate::from_decimal(dec!(0.02)),
            36,
            1,
            NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            AmortizationMethod::NoRepayment,
        )
    }

    #[test]
    fn test_no_repayment_loan_accrues_until_balloon() {
        let time = time_at(2020, 1, 1);
        let control = time.test_control().unwrap();
        let mut account = SimulatedAccount::open(no_repayment_config(), &time).unwrap();

        // three years pass without a single instalment
        control.advance(chrono::Duration::days(1096));
        account.advance_to_now(&time);

        assert_eq!(time.now().date_naive(), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        // 1096 days of 5.47945 daily accrual, then the balloon falls due
        assert_eq!(
            account.ledger.balance(BalanceAddress::PrincipalDue),
            Money::from_major(100_000)
        );
        assert_eq!(
            account.ledger.balance(BalanceAddress::InterestDue),
            Money::from_str_exact("6005.48").unwrap()
        );

        account
            .receive_payment(Money::from_str_exact("106005.48").unwrap(), &time)
            .unwrap();
        assert!(account.total_outstanding_debt().is_zero());
        assert!(account.is_closed());
    }

    #[test]
    fn test_interest_only_cycle_with_missed_payment() {
        let time = time_at(2021, 1, 1);
        let control = time.test_control().unwrap();
        let config = AccountConfig::new(
            Money::from_major(10_000),
            Rate::from_decimal(dec!(0.031)),
            12,
            5,
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            AmortizationMethod::InterestOnly,
        );
        let mut account = SimulatedAccount::open(config, &time).unwrap();

        // through the first repayment day (2021-01-05) and its overdue check
        control.advance(chrono::Duration::days(6));
        account.advance_to_now(&time);

        assert_eq!(account.ledger.elapsed_periods, 1);
        // dues went unpaid and rolled into overdue with the late fee
        assert!(account.ledger.balance(BalanceAddress::InterestDue).is_zero());
        assert!(account
            .ledger
            .balance(BalanceAddress::InterestOverdue)
            .is_positive());
        assert_eq!(
            account.ledger.balance(BalanceAddress::Penalties),
            Money::from_major(15)
        );
        assert!(account
            .workflows
            .iter()
            .any(|w| matches!(w, WorkflowRequest::LoanOverdueRepaymentNotification { .. })));

        // delinquency fires after the grace period
        control.advance(chrono::Duration::days(15));
        account.advance_to_now(&time);
        assert!(account
            .workflows
            .iter()
            .any(|w| matches!(w, WorkflowRequest::LoanMarkDelinquent { .. })));
    }

    #[test]
    fn test_paid_dues_do_not_go_overdue() {
        let time = time_at(2021, 1, 1);
        let control = time.test_control().unwrap();
        let config = AccountConfig::new(
            Money::from_major(10_000),
            Rate::from_decimal(dec!(0.031)),
            12,
            5,
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            AmortizationMethod::InterestOnly,
        );
        let mut account = SimulatedAccount::open(config, &time).unwrap();

        control.advance(chrono::Duration::days(4));
        account.advance_to_now(&time);
        let due = account.ledger.owed_balances();
        assert!(due.is_positive());
        account.receive_payment(due, &time).unwrap();

        control.advance(chrono::Duration::days(2));
        account.advance_to_now(&time);
        assert!(account.ledger.balance(BalanceAddress::InterestOverdue).is_zero());
        assert!(account.ledger.balance(BalanceAddress::Penalties).is_zero());
    }

    #[test]
    fn test_elapsed_periods_follow_the_repayment_schedule() {
        let time = time_at(2021, 1, 1);
        let control = time.test_control().unwrap();
        let config = AccountConfig::new(
            Money::from_major(10_000),
            Rate::from_decimal(dec!(0.031)),
            12,
            5,
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            AmortizationMethod::InterestOnly,
        );
        let mut account = SimulatedAccount::open(config.clone(), &time).unwrap();

        // 100 days in: repayment days jan/feb/mar/apr 5 have passed
        control.advance(chrono::Duration::days(100));
        account.advance_to_now(&time);
        assert_eq!(account.ledger.elapsed_periods, 4);
        assert_eq!(
            account.ledger.elapsed_periods,
            schedule::elapsed_periods(&config, time.now().date_naive())
        );
    }

    #[test]
    fn test_overpayment_then_top_up() {
        let time = time_at(2020, 1, 1);
        let control = time.test_control().unwrap();
        let mut account = SimulatedAccount::open(no_repayment_config(), &time).unwrap();

        control.advance(chrono::Duration::days(30));
        account.advance_to_now(&time);
        account.receive_payment(Money::from_major(2_000), &time).unwrap();
        assert_eq!(
            account.ledger.balance(BalanceAddress::Overpayment),
            -Money::from_major(1_900)
        );

        let terms = TopUpTerms {
            new_principal: Money::from_major(120_000),
            new_rate: Rate::from_decimal(dec!(0.025)),
            new_term: 24,
            effective_date: time.now().date_naive(),
        };
        account.top_up(&terms).unwrap();
        assert_eq!(
            account.ledger.balance(BalanceAddress::Principal),
            Money::from_major(120_000)
        );
        assert_eq!(account.ledger.elapsed_periods, 0);
        assert_eq!(account.config.total_term, 24);
    }
}
