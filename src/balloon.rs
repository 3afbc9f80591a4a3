use chrono::{Duration, NaiveDate};
use tracing::debug;

use crate::config::{AccountConfig, AmortizationMethod};
use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::events::{HookOutput, WorkflowRequest};
use crate::ledger::{BalanceAddress, LedgerAccount, LedgerSnapshot, Phase, Posting};
use crate::lifecycle::{consolidate_principal, flush};
use crate::schedule::{EventName, Recurrence, ScheduledEvent};

/// terms of a mid-life top-up: the loan re-originates with a fresh
/// principal, rate, term and start date
#[derive(Debug, Clone)]
pub struct TopUpTerms {
    pub new_principal: Money,
    pub new_rate: Rate,
    pub new_term: u32,
    pub effective_date: NaiveDate,
}

fn is_balloon_product(method: AmortizationMethod) -> bool {
    matches!(
        method,
        AmortizationMethod::InterestOnly
            | AmortizationMethod::NoRepayment
            | AmortizationMethod::MinimumRepaymentWithBalloon
    )
}

/// Balloon-date processing and top-up re-origination.
pub struct BalloonEngine<'a> {
    config: &'a AccountConfig,
}

impl<'a> BalloonEngine<'a> {
    pub fn new(config: &'a AccountConfig) -> Self {
        Self { config }
    }

    /// move the whole remaining principal and residual interest into the
    /// due addresses on the balloon date
    pub fn transfer_balloon(&self, ledger: &LedgerSnapshot, date: NaiveDate) -> HookOutput {
        let mut output = HookOutput::new();
        if !is_balloon_product(self.config.amortisation_method) {
            return output;
        }
        if ledger.has_any_flag(&self.config.blocking.due_amount) {
            debug!(account_id = %self.config.account_id, %date, "balloon transfer blocked by flag");
            return output;
        }

        let denomination = ledger.denomination.clone();
        let mut working = ledger.clone();
        consolidate_principal(&mut working, &mut output.postings);

        let mut plan = crate::ledger::PostingPlan::new();
        let principal = working.balance(BalanceAddress::Principal);
        if principal.is_positive() {
            plan.transfer(
                BalanceAddress::Principal,
                BalanceAddress::PrincipalDue,
                principal,
                &denomination,
                "balloon principal transfer",
            );
        }

        let accrued = working.balance(BalanceAddress::AccruedInterest)
            + working.balance(BalanceAddress::AccruedInterestPendingCapitalisation);
        let interest_due = accrued.round_dp(self.config.precision.fulfilment).max(Money::ZERO);
        if interest_due.is_positive() {
            let mut remaining = interest_due;
            for address in [
                BalanceAddress::AccruedInterest,
                BalanceAddress::AccruedInterestPendingCapitalisation,
            ] {
                let available = working.balance(address).max(Money::ZERO);
                let moved = remaining.min(available);
                if moved.is_positive() {
                    plan.transfer(
                        address,
                        BalanceAddress::InterestDue,
                        moved,
                        &denomination,
                        "balloon interest transfer",
                    );
                    remaining -= moved;
                }
            }
            // rounding can leave the final sub-cent to the contra
            if remaining.is_positive() {
                plan.transfer(
                    BalanceAddress::InternalContra,
                    BalanceAddress::InterestDue,
                    remaining,
                    &denomination,
                    "balloon interest rounding",
                );
            }
        }
        working.apply_plan(&plan);
        output.postings.extend(plan);

        let mut residue = crate::ledger::PostingPlan::new();
        for address in [
            BalanceAddress::AccruedInterest,
            BalanceAddress::AccruedInterestPendingCapitalisation,
            BalanceAddress::AccruedExpectedInterest,
        ] {
            flush(
                &mut residue,
                address,
                working.balance(address),
                &denomination,
                "balloon accrual flush",
            );
        }
        working.apply_plan(&residue);
        output.postings.extend(residue);

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

    /// Re-originate the loan at a larger principal. Capitalised amounts and
    /// the overpayment credit are swept into the booked principal, the
    /// difference up to the new principal is disbursed, and the returned
    /// config restarts the term from the effective date.
    pub fn apply_top_up(
        &self,
        ledger: &LedgerSnapshot,
        terms: &TopUpTerms,
    ) -> Result<(AccountConfig, HookOutput)> {
        if ledger.owed_balances().is_positive() {
            return Err(LoanError::AgainstTermsAndConditions {
                message: "cannot top up while amounts are due or overdue".to_string(),
            });
        }

        let denomination = ledger.denomination.clone();
        let mut output = HookOutput::new();
        let mut working = ledger.clone();
        consolidate_principal(&mut working, &mut output.postings);

        let current = working.balance(BalanceAddress::Principal);
        let disbursement = terms.new_principal - current;
        if !disbursement.is_positive() {
            return Err(LoanError::AgainstTermsAndConditions {
                message: format!(
                    "top-up principal {} does not exceed the outstanding {}",
                    terms.new_principal, current
                ),
            });
        }
        output.postings.push(Posting {
            from: LedgerAccount::External(self.config.gl_accounts.repayment_account.clone()),
            to: LedgerAccount::Internal(BalanceAddress::Principal),
            amount: disbursement,
            denomination,
            phase: Phase::Committed,
            details: Default::default(),
        });

        let mut config = self.config.clone();
        config.principal = terms.new_principal;
        config.annual_rate = terms.new_rate;
        config.total_term = terms.new_term;
        config.loan_start_date = terms.effective_date;
        config.validate()?;

        output
            .schedule_updates
            .extend(crate::schedule::declared_schedule(&config, terms.effective_date));

        Ok((config, output))
    }
}
