use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::amortization::{strategy_for, PeriodContext};
use crate::config::AccountConfig;
use crate::decimal::Money;
use crate::ledger::{BalanceAddress, LedgerSnapshot};
use crate::schedule;

/// read-only parameters derived from config and balances, the figures a
/// servicing layer displays or quotes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedParameters {
    pub remaining_term: u32,
    pub expected_emi: Money,
    pub remaining_principal: Money,
    pub total_outstanding_debt: Money,
    /// amounts currently due or overdue
    pub outstanding_payments: Money,
    pub next_repayment_date: NaiveDate,
    pub next_overdue_date: NaiveDate,
    /// settle-everything quote including the early repayment fee
    pub total_early_repayment_amount: Money,
    pub expected_balloon_payment_amount: Option<Money>,
}

/// instalments left on the contractual schedule
pub fn remaining_term(config: &AccountConfig, ledger: &LedgerSnapshot) -> u32 {
    config.total_term.saturating_sub(ledger.elapsed_periods)
}

fn period_context(config: &AccountConfig, ledger: &LedgerSnapshot) -> PeriodContext {
    PeriodContext {
        period_number: ledger.elapsed_periods + 1,
        remaining_term: remaining_term(config, ledger).max(1),
        actual_principal: ledger.actual_principal(),
        expected_principal: ledger.expected_principal(),
        interest_accrued: ledger
            .balance(BalanceAddress::AccruedInterest)
            .round_dp(config.precision.fulfilment),
    }
}

/// instalment amount expected at the next repayment day
pub fn expected_emi(config: &AccountConfig, ledger: &LedgerSnapshot) -> Money {
    strategy_for(config.amortisation_method).expected_emi(config, &period_context(config, ledger))
}

/// everything owed if the account settled right now: principal, accrued
/// and pending interest, and all due or overdue amounts
pub fn total_outstanding_debt(ledger: &LedgerSnapshot) -> Money {
    ledger.actual_principal()
        + ledger.balance(BalanceAddress::AccruedInterest)
        + ledger.balance(BalanceAddress::AccruedInterestPendingCapitalisation)
        + ledger.balance(BalanceAddress::AccruedOverdueInterestPendingCapitalisation)
        + ledger.owed_balances()
}

/// quote for settling the whole loan today, early repayment fee included
pub fn total_early_repayment_amount(config: &AccountConfig, ledger: &LedgerSnapshot) -> Money {
    let fee = (ledger.actual_principal() * config.overpayment.fee_rate.as_decimal())
        .round_dp(config.precision.fulfilment)
        .max(Money::ZERO);
    total_outstanding_debt(ledger) + fee
}

/// projected balloon amount, None for fully amortizing products
pub fn expected_balloon_payment_amount(
    config: &AccountConfig,
    ledger: &LedgerSnapshot,
) -> Option<Money> {
    strategy_for(config.amortisation_method)
        .expected_balloon(config, &period_context(config, ledger))
}

impl DerivedParameters {
    pub fn compute(config: &AccountConfig, ledger: &LedgerSnapshot) -> Self {
        let next_repayment_date =
            schedule::next_repayment_date(config.repayment_day, ledger.as_of);
        Self {
            remaining_term: remaining_term(config, ledger),
            expected_emi: expected_emi(config, ledger),
            remaining_principal: ledger.actual_principal(),
            total_outstanding_debt: total_outstanding_debt(ledger),
            outstanding_payments: ledger.owed_balances(),
            next_repayment_date,
            next_overdue_date: next_repayment_date
                + Duration::days(config.penalty.repayment_period_days as i64),
            total_early_repayment_amount: total_early_repayment_amount(config, ledger),
            expected_balloon_payment_amount: expected_balloon_payment_amount(config, ledger),
        }
    }
}
