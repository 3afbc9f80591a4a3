use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::amortization::{strategy_for, PeriodContext};
use crate::config::{AccountConfig, AmortizationMethod, CapitalisationFrequency};
use crate::decimal::Money;
use crate::events::{HookOutput, WorkflowRequest};
use crate::ledger::{BalanceAddress, LedgerSnapshot, PostingPlan};
use crate::schedule::{EventName, Recurrence, ScheduledEvent};

/// Repayment-day, overdue and delinquency processing. Pure over a ledger
/// snapshot: the caller applies the returned postings atomically and
/// advances `elapsed_periods` / `last_due_transfer` on success.
pub struct LifecycleEngine<'a> {
    config: &'a AccountConfig,
}

/// zero an address, sending any balance (either sign) to the contra
pub(crate) fn flush(
    plan: &mut PostingPlan,
    address: BalanceAddress,
    balance: Money,
    denomination: &str,
    instruction: &str,
) {
    if balance.is_positive() {
        plan.transfer(address, BalanceAddress::InternalContra, balance, denomination, instruction);
    } else if balance.is_negative() {
        plan.transfer(BalanceAddress::InternalContra, address, balance.abs(), denomination, instruction);
    }
}

/// fold capitalised balances and the overpayment credit back into the
/// booked principal so closing transfers see one address
pub(crate) fn consolidate_principal(working: &mut LedgerSnapshot, plan: &mut PostingPlan) {
    let denomination = working.denomination.clone();
    let mut fold = PostingPlan::new();
    for address in [
        BalanceAddress::PrincipalCapitalisedInterest,
        BalanceAddress::PrincipalCapitalisedPenalties,
    ] {
        let balance = working.balance(address);
        if balance.is_positive() {
            fold.transfer(address, BalanceAddress::Principal, balance, &denomination, "principal consolidation");
        }
    }
    let overpayment = working.balance(BalanceAddress::Overpayment);
    if overpayment.is_negative() {
        fold.transfer(
            BalanceAddress::Principal,
            BalanceAddress::Overpayment,
            overpayment.abs(),
            &denomination,
            "principal consolidation",
        );
    }
    working.apply_plan(&fold);
    plan.extend(fold);
}

impl<'a> LifecycleEngine<'a> {
    pub fn new(config: &'a AccountConfig) -> Self {
        Self { config }
    }

    fn fold_monthly_capitalisation(&self, working: &mut LedgerSnapshot, plan: &mut PostingPlan) {
        let denomination = working.denomination.clone();
        if self.config.capitalisation.accrued_interest == CapitalisationFrequency::Monthly {
            let pending = working.balance(BalanceAddress::AccruedInterestPendingCapitalisation);
            if pending.is_positive() {
                let mut fold = PostingPlan::new();
                fold.transfer(
                    BalanceAddress::AccruedInterestPendingCapitalisation,
                    BalanceAddress::PrincipalCapitalisedInterest,
                    pending,
                    &denomination,
                    "monthly interest capitalisation",
                );
                working.apply_plan(&fold);
                plan.extend(fold);
            }
        }
        if self.config.capitalisation.overdue_interest == CapitalisationFrequency::Monthly {
            let pending =
                working.balance(BalanceAddress::AccruedOverdueInterestPendingCapitalisation);
            if pending.is_positive() {
                let mut fold = PostingPlan::new();
                fold.transfer(
                    BalanceAddress::AccruedOverdueInterestPendingCapitalisation,
                    BalanceAddress::PrincipalCapitalisedPenalties,
                    pending,
                    &denomination,
                    "monthly penalty capitalisation",
                );
                working.apply_plan(&fold);
                plan.extend(fold);
            }
        }
    }

    /// process the monthly repayment day as of `date`
    pub fn transfer_due(&self, ledger: &LedgerSnapshot, date: NaiveDate) -> HookOutput {
        let mut output = HookOutput::new();

        if self.config.amortisation_method == AmortizationMethod::NoRepayment {
            return output;
        }
        if ledger.has_any_flag(&self.config.blocking.due_amount) {
            debug!(account_id = %self.config.account_id, %date, "due transfer blocked by flag");
            return output;
        }
        if ledger.last_due_transfer == Some(date) {
            return output;
        }

        let denomination = ledger.denomination.clone();
        let mut working = ledger.clone();
        self.fold_monthly_capitalisation(&mut working, &mut output.postings);

        let period_number = ledger.elapsed_periods + 1;
        let remaining_term = self.config.total_term.saturating_sub(ledger.elapsed_periods).max(1);
        let strategy = strategy_for(self.config.amortisation_method);

        if remaining_term <= 1 {
            consolidate_principal(&mut working, &mut output.postings);
        }

        // interest component
        let accrued = working.balance(BalanceAddress::AccruedInterest);
        let expected_accrued = working.balance(BalanceAddress::AccruedExpectedInterest);
        let interest_due;
        let mut interest_plan = PostingPlan::new();
        if strategy.uses_accrued_interest() {
            interest_due = accrued.round_dp(self.config.precision.fulfilment).max(Money::ZERO);
            if interest_due.is_positive() {
                interest_plan.transfer(
                    BalanceAddress::AccruedInterest,
                    BalanceAddress::InterestDue,
                    interest_due,
                    &denomination,
                    "interest due transfer",
                );
            }
            // sub-cent accrual residue does not roll into the next period
            flush(
                &mut interest_plan,
                BalanceAddress::AccruedInterest,
                accrued - interest_due,
                &denomination,
                "accrued interest rounding flush",
            );
        } else {
            // scheduled-interest products ignore the daily accrual ledger
            let ctx = PeriodContext {
                period_number,
                remaining_term,
                actual_principal: working.actual_principal(),
                expected_principal: working.expected_principal(),
                interest_accrued: Money::ZERO,
            };
            interest_due = strategy.period_split(self.config, &ctx).interest_due;
            if interest_due.is_positive() {
                interest_plan.transfer(
                    BalanceAddress::InternalContra,
                    BalanceAddress::InterestDue,
                    interest_due,
                    &denomination,
                    "scheduled interest due transfer",
                );
            }
            flush(
                &mut interest_plan,
                BalanceAddress::AccruedInterest,
                accrued,
                &denomination,
                "accrued interest flush",
            );
        }

        // the EMI excess correction tracks interest the contractual
        // trajectory would have charged on top of what actually accrued
        let excess = (expected_accrued - accrued).round_dp(self.config.precision.fulfilment);
        if excess.is_positive() {
            interest_plan.transfer(
                BalanceAddress::InternalContra,
                BalanceAddress::EmiPrincipalExcess,
                excess,
                &denomination,
                "emi principal excess",
            );
        }
        flush(
            &mut interest_plan,
            BalanceAddress::AccruedExpectedInterest,
            expected_accrued,
            &denomination,
            "expected accrued interest flush",
        );
        working.apply_plan(&interest_plan);
        output.postings.extend(interest_plan);

        // principal component
        let ctx = PeriodContext {
            period_number,
            remaining_term,
            actual_principal: working.actual_principal(),
            expected_principal: working.expected_principal(),
            interest_accrued: interest_due,
        };
        let split = strategy.period_split(self.config, &ctx);
        let mut principal_plan = PostingPlan::new();
        if split.principal_due.is_positive() {
            principal_plan.transfer(
                BalanceAddress::Principal,
                BalanceAddress::PrincipalDue,
                split.principal_due,
                &denomination,
                "principal due transfer",
            );
        }

        // the EMI address tracks the current instalment amount
        let emi_delta = split.emi - working.balance(BalanceAddress::Emi);
        flush(
            &mut principal_plan,
            BalanceAddress::Emi,
            -emi_delta,
            &denomination,
            "emi update",
        );
        working.apply_plan(&principal_plan);
        output.postings.extend(principal_plan);

        let overdue_date = date + Duration::days(self.config.penalty.repayment_period_days as i64);
        output.workflows.push(WorkflowRequest::LoanRepaymentNotification {
            account_id: self.config.account_id,
            repayment_amount: working.owed_balances(),
            overdue_date,
        });
        let times = &self.config.schedule_times;
        output.schedule_updates.push(ScheduledEvent {
            name: EventName::CheckOverdue,
            time: times.check_overdue,
            recurrence: Recurrence::Once(overdue_date),
        });
        output.schedule_updates.push(ScheduledEvent {
            name: EventName::CheckDelinquency,
            time: times.check_delinquency,
            recurrence: Recurrence::Once(
                overdue_date + Duration::days(self.config.penalty.grace_period_days as i64),
            ),
        });

        output
    }

    /// roll unpaid dues into overdue and charge the late repayment fee
    pub fn check_overdue(&self, ledger: &LedgerSnapshot, date: NaiveDate) -> HookOutput {
        let mut output = HookOutput::new();

        if ledger.has_any_flag(&self.config.blocking.overdue) {
            debug!(account_id = %self.config.account_id, %date, "overdue check blocked by flag");
            return output;
        }

        let due_principal = ledger.balance(BalanceAddress::PrincipalDue);
        let due_interest = ledger.balance(BalanceAddress::InterestDue);
        if !due_principal.is_positive() && !due_interest.is_positive() {
            return output;
        }

        let denomination = &ledger.denomination;
        if due_principal.is_positive() {
            output.postings.transfer(
                BalanceAddress::PrincipalDue,
                BalanceAddress::PrincipalOverdue,
                due_principal,
                denomination,
                "principal overdue transfer",
            );
        }
        if due_interest.is_positive() {
            output.postings.transfer(
                BalanceAddress::InterestDue,
                BalanceAddress::InterestOverdue,
                due_interest,
                denomination,
                "interest overdue transfer",
            );
        }

        let fee = self.config.penalty.late_repayment_fee;
        if fee.is_positive() {
            let target = if self.config.capitalisation.capitalise_late_repayment_fee {
                BalanceAddress::PrincipalCapitalisedPenalties
            } else {
                BalanceAddress::Penalties
            };
            output.postings.transfer(
                BalanceAddress::InternalContra,
                target,
                fee,
                denomination,
                "late repayment fee",
            );
            output.postings.mirror_external(
                &self.config.gl_accounts.late_fee_income,
                &self.config.gl_accounts.accrued_interest_receivable,
                fee,
                denomination,
                "late repayment fee",
            );
        }

        output.workflows.push(WorkflowRequest::LoanOverdueRepaymentNotification {
            account_id: self.config.account_id,
            repayment_amount: due_principal + due_interest + fee,
            overdue_date: date,
            late_repayment_fee: fee,
        });

        output
    }

    /// flag the account delinquent while overdue balances remain unpaid
    pub fn check_delinquency(&self, ledger: &LedgerSnapshot, date: NaiveDate) -> HookOutput {
        let mut output = HookOutput::new();

        if ledger.has_any_flag(&self.config.blocking.delinquency) {
            debug!(account_id = %self.config.account_id, %date, "delinquency check blocked by flag");
            return output;
        }

        let overdue = ledger.balance(BalanceAddress::PrincipalOverdue)
            + ledger.balance(BalanceAddress::InterestOverdue);
        if overdue.is_positive() {
            output.workflows.push(WorkflowRequest::LoanMarkDelinquent {
                account_id: self.config.account_id,
            });
        }
        output
    }
}
