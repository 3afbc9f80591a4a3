use chrono::{Datelike, NaiveDate};
use tracing::debug;

use crate::config::{AccountConfig, CapitalisationFrequency};
use crate::decimal::Money;
use crate::ledger::{BalanceAddress, LedgerSnapshot, PostingPlan};

/// one day's accrual outcome
#[derive(Debug, Clone, Default)]
pub struct AccrualResult {
    pub plan: PostingPlan,
    /// interest accrued on the actual principal
    pub interest_accrued: Money,
    /// interest accrued on the contractual principal trajectory
    pub expected_interest_accrued: Money,
    pub penalty_accrued: Money,
}

/// Daily interest and penalty accrual. Pure over a ledger snapshot: the
/// caller applies the returned plan.
pub struct AccrualEngine<'a> {
    config: &'a AccountConfig,
}

impl<'a> AccrualEngine<'a> {
    pub fn new(config: &'a AccountConfig) -> Self {
        Self { config }
    }

    fn accrual_base(&self, ledger: &LedgerSnapshot) -> Money {
        let mut base = ledger.actual_principal();
        if self.config.accrual.accrue_interest_on_due_principal {
            base += ledger.balance(BalanceAddress::PrincipalDue);
        }
        base
    }

    fn expected_base(&self, ledger: &LedgerSnapshot) -> Money {
        let mut base = ledger.expected_principal();
        if self.config.accrual.accrue_interest_on_due_principal {
            base += ledger.balance(BalanceAddress::PrincipalDue);
        }
        base
    }

    fn daily_amount(&self, base: Money, rate: crate::decimal::Rate, date: NaiveDate) -> Money {
        let basis = self.config.accrual.days_in_year.basis(date.year());
        let daily = rate.daily_rate(basis, self.config.precision.rate);
        (base * daily.as_decimal()).round_dp(self.config.precision.accrual)
    }

    /// accrue for one day as of `date`
    pub fn accrue(&self, ledger: &LedgerSnapshot, date: NaiveDate) -> AccrualResult {
        let mut result = AccrualResult::default();

        let skip_main = ledger.has_any_flag(&self.config.blocking.accrual)
            || ledger.has_any_flag(&self.config.blocking.penalty);
        if skip_main {
            debug!(account_id = %self.config.account_id, %date, "accrual blocked by flag");
        } else {
            self.accrue_interest(ledger, date, &mut result);
        }

        // penalty accrual continues under penalty-exempt blocking flags
        if ledger.has_any_flag(&self.config.blocking.accrual) {
            debug!(account_id = %self.config.account_id, %date, "penalty accrual blocked by flag");
        } else {
            self.accrue_penalties(ledger, date, &mut result);
        }

        result
    }

    fn accrue_interest(&self, ledger: &LedgerSnapshot, date: NaiveDate, result: &mut AccrualResult) {
        let denomination = &ledger.denomination;
        let gl = &self.config.gl_accounts;
        let capitalising =
            self.config.capitalisation.accrued_interest != CapitalisationFrequency::NoCapitalisation;

        let base = self.accrual_base(ledger);
        if base.is_positive() {
            let accrued = self.daily_amount(base, self.config.annual_rate, date);
            if !accrued.is_zero() {
                let target = if capitalising {
                    BalanceAddress::AccruedInterestPendingCapitalisation
                } else {
                    BalanceAddress::AccruedInterest
                };
                result.plan.transfer(
                    BalanceAddress::InternalContra,
                    target,
                    accrued,
                    denomination,
                    "daily interest accrual",
                );
                result.plan.mirror_external(
                    &gl.interest_income,
                    &gl.accrued_interest_receivable,
                    accrued,
                    denomination,
                    "daily interest accrual",
                );
                result.interest_accrued = accrued;

                if self.config.capitalisation.accrued_interest == CapitalisationFrequency::Daily {
                    let pending = ledger
                        .balance(BalanceAddress::AccruedInterestPendingCapitalisation)
                        + accrued;
                    if pending.is_positive() {
                        result.plan.transfer(
                            BalanceAddress::AccruedInterestPendingCapitalisation,
                            BalanceAddress::PrincipalCapitalisedInterest,
                            pending,
                            denomination,
                            "daily interest capitalisation",
                        );
                    }
                }
            }
        }

        // the expected-trajectory accrual has no income impact, it only
        // feeds the EMI correction bookkeeping
        let expected_base = self.expected_base(ledger);
        if expected_base.is_positive() {
            let expected = self.daily_amount(expected_base, self.config.annual_rate, date);
            if !expected.is_zero() {
                result.plan.transfer(
                    BalanceAddress::InternalContra,
                    BalanceAddress::AccruedExpectedInterest,
                    expected,
                    denomination,
                    "daily expected interest accrual",
                );
                result.expected_interest_accrued = expected;
            }
        }
    }

    fn accrue_penalties(
        &self,
        ledger: &LedgerSnapshot,
        date: NaiveDate,
        result: &mut AccrualResult,
    ) {
        let denomination = &ledger.denomination;
        let gl = &self.config.gl_accounts;

        let mut overdue_base = ledger.balance(BalanceAddress::PrincipalOverdue);
        if self.config.penalty.penalty_compounds_overdue_interest {
            overdue_base += ledger.balance(BalanceAddress::InterestOverdue);
        }
        if !overdue_base.is_positive() {
            return;
        }

        // penalties settle against cash, so they round at fulfilment precision
        let penalty = self
            .daily_amount(overdue_base, self.config.effective_penalty_rate(), date)
            .round_dp(self.config.precision.fulfilment);
        if penalty.is_zero() {
            return;
        }

        let capitalising =
            self.config.capitalisation.overdue_interest != CapitalisationFrequency::NoCapitalisation;
        let target = if capitalising {
            BalanceAddress::AccruedOverdueInterestPendingCapitalisation
        } else {
            BalanceAddress::Penalties
        };
        result.plan.transfer(
            BalanceAddress::InternalContra,
            target,
            penalty,
            denomination,
            "daily penalty accrual",
        );
        result.plan.mirror_external(
            &gl.penalty_income,
            &gl.accrued_interest_receivable,
            penalty,
            denomination,
            "daily penalty accrual",
        );
        result.penalty_accrued = penalty;

        if self.config.capitalisation.overdue_interest == CapitalisationFrequency::Daily {
            let pending = ledger
                .balance(BalanceAddress::AccruedOverdueInterestPendingCapitalisation)
                + penalty;
            if pending.is_positive() {
                result.plan.transfer(
                    BalanceAddress::AccruedOverdueInterestPendingCapitalisation,
                    BalanceAddress::PrincipalCapitalisedPenalties,
                    pending,
                    denomination,
                    "daily penalty capitalisation",
                );
            }
        }
    }
}
