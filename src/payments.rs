use chrono::NaiveDate;
use tracing::debug;

use crate::amortization::strategy_for;
use crate::config::AccountConfig;
use crate::decimal::Money;
use crate::derived::{total_early_repayment_amount, total_outstanding_debt};
use crate::errors::{LoanError, Result};
use crate::events::{HookOutput, WorkflowRequest};
use crate::ledger::{BalanceAddress, LedgerSnapshot, PostingPlan};
use crate::lifecycle::{consolidate_principal, flush};

/// one inbound repayment posting
#[derive(Debug, Clone)]
pub struct IncomingPayment {
    pub amount: Money,
    pub denomination: String,
    pub value_date: NaiveDate,
    /// accept a value date before the last due transfer (restructuring flows)
    pub backdating_allowed: bool,
}

impl IncomingPayment {
    pub fn new(amount: Money, denomination: &str, value_date: NaiveDate) -> Self {
        Self {
            amount,
            denomination: denomination.to_string(),
            value_date,
            backdating_allowed: false,
        }
    }
}

/// owed addresses in strict settlement order
const ALLOCATION_ORDER: [BalanceAddress; 5] = [
    BalanceAddress::Penalties,
    BalanceAddress::InterestOverdue,
    BalanceAddress::PrincipalOverdue,
    BalanceAddress::InterestDue,
    BalanceAddress::PrincipalDue,
];

/// Validates and allocates inbound repayments. Pure over a snapshot: a
/// rejected payment returns an error and no postings.
pub struct PaymentProcessor<'a> {
    config: &'a AccountConfig,
}

impl<'a> PaymentProcessor<'a> {
    pub fn new(config: &'a AccountConfig) -> Self {
        Self { config }
    }

    fn validate(&self, ledger: &LedgerSnapshot, payment: &IncomingPayment) -> Result<()> {
        if payment.denomination != ledger.denomination {
            return Err(LoanError::WrongDenomination {
                expected: ledger.denomination.clone(),
                actual: payment.denomination.clone(),
            });
        }
        if !payment.amount.is_positive() {
            return Err(LoanError::AgainstTermsAndConditions {
                message: format!("payment amount must be positive, got {}", payment.amount),
            });
        }
        if let Some(last_transfer) = ledger.last_due_transfer {
            if payment.value_date < last_transfer && !payment.backdating_allowed {
                return Err(LoanError::BackdatedPayment {
                    value_date: payment.value_date,
                    last_transfer,
                });
            }
        }

        // the ceiling is the settle-everything quote: total debt plus the
        // early repayment fee on the outstanding principal
        let settlement_quote = total_early_repayment_amount(self.config, ledger);
        if payment.amount > settlement_quote {
            return Err(LoanError::CannotPayMoreThanOwed {
                owed: settlement_quote,
                requested: payment.amount,
            });
        }

        let excess = payment.amount - ledger.owed_balances();
        if excess.is_positive()
            && !strategy_for(self.config.amortisation_method).allows_overpayment()
        {
            return Err(LoanError::OverpaymentNotAllowed {
                product: self.config.amortisation_method.display_name(),
            });
        }
        Ok(())
    }

    /// allocate a repayment through the owed hierarchy; an excess covering
    /// the remaining debt settles the loan, anything smaller becomes an
    /// overpayment net of the overpayment fee
    pub fn process(&self, ledger: &LedgerSnapshot, payment: &IncomingPayment) -> Result<HookOutput> {
        self.validate(ledger, payment)?;

        let denomination = &ledger.denomination;
        let gl = &self.config.gl_accounts;
        let mut output = HookOutput::new();
        let mut remaining = payment.amount;

        for address in ALLOCATION_ORDER {
            if remaining.is_zero() {
                break;
            }
            let owed = ledger.balance(address);
            if !owed.is_positive() {
                continue;
            }
            let applied = remaining.min(owed);
            output.postings.settle(
                address,
                &gl.repayment_account,
                applied,
                denomination,
                "repayment allocation",
            );
            remaining -= applied;
        }

        // excess covering the rest of the debt settles the account; anything
        // smaller is a plain overpayment carrying the 5% fee on the gross
        let debt_after_dues = total_outstanding_debt(ledger) - ledger.owed_balances();
        if remaining.is_positive() && debt_after_dues.is_positive() && remaining >= debt_after_dues
        {
            self.settle_in_full(ledger, remaining - debt_after_dues, &mut output);
        } else if remaining.is_positive() {
            let fee = (remaining * self.config.overpayment.fee_rate.as_decimal())
                .round_dp(self.config.precision.fulfilment);
            let net = remaining - fee;
            debug!(
                account_id = %self.config.account_id,
                overpayment = %remaining,
                fee = %fee,
                "overpayment received"
            );
            if fee.is_positive() {
                output.postings.mirror_external(
                    &gl.repayment_account,
                    &gl.overpayment_fee_income,
                    fee,
                    denomination,
                    "overpayment fee",
                );
            }
            if net.is_positive() {
                // drives the OVERPAYMENT balance negative by the net amount
                output.postings.settle(
                    BalanceAddress::Overpayment,
                    &gl.repayment_account,
                    net,
                    denomination,
                    "overpayment allocation",
                );
            }
        }

        let mut after = ledger.clone();
        after.apply_plan(&output.postings);
        if total_outstanding_debt(&after).is_zero() {
            output.workflows.push(WorkflowRequest::LoanClosure {
                account_id: self.config.account_id,
            });
        }

        Ok(output)
    }

    /// settle the remaining principal and accrued interest in one payment;
    /// the slice above the outstanding debt is the early repayment fee
    fn settle_in_full(&self, ledger: &LedgerSnapshot, fee: Money, output: &mut HookOutput) {
        let denomination = ledger.denomination.clone();
        let gl = &self.config.gl_accounts;
        debug!(
            account_id = %self.config.account_id,
            fee = %fee,
            "early settlement received"
        );
        if fee.is_positive() {
            output.postings.mirror_external(
                &gl.repayment_account,
                &gl.overpayment_fee_income,
                fee,
                &denomination,
                "early repayment fee",
            );
        }

        let mut working = ledger.clone();
        let mut plan = PostingPlan::new();
        consolidate_principal(&mut working, &mut plan);
        for address in [
            BalanceAddress::Principal,
            BalanceAddress::AccruedInterest,
            BalanceAddress::AccruedInterestPendingCapitalisation,
            BalanceAddress::AccruedOverdueInterestPendingCapitalisation,
        ] {
            let balance = working.balance(address);
            if balance.is_positive() {
                plan.settle(
                    address,
                    &gl.repayment_account,
                    balance,
                    &denomination,
                    "early settlement",
                );
            }
        }
        flush(
            &mut plan,
            BalanceAddress::AccruedExpectedInterest,
            working.balance(BalanceAddress::AccruedExpectedInterest),
            &denomination,
            "early settlement flush",
        );
        output.postings.extend(plan);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AmortizationMethod;
    use crate::decimal::Rate;
    use rust_decimal_macros::dec;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config(method: AmortizationMethod) -> AccountConfig {
        AccountConfig::new(
            Money::from_major(100_000),
            Rate::from_decimal(dec!(0.02)),
            36,
            12,
            day(2020, 1, 1),
            method,
        )
    }

    fn owed_ledger() -> LedgerSnapshot {
        LedgerSnapshot::new("USD", day(2020, 3, 13))
            .with_balance(BalanceAddress::Principal, Money::from_major(97_000))
            .with_balance(BalanceAddress::Penalties, Money::from_major(15))
            .with_balance(BalanceAddress::InterestOverdue, Money::from_major(160))
            .with_balance(BalanceAddress::PrincipalOverdue, Money::from_major(1_000))
            .with_balance(BalanceAddress::InterestDue, Money::from_major(158))
            .with_balance(BalanceAddress::PrincipalDue, Money::from_major(1_000))
    }

    #[test]
    fn test_allocation_follows_the_hierarchy() {
        let config = config(AmortizationMethod::DecliningPrincipal);
        let ledger = owed_ledger();
        // enough for penalties, overdue interest and half the overdue principal
        let payment = IncomingPayment::new(Money::from_major(675), "USD", day(2020, 3, 13));
        let output = PaymentProcessor::new(&config).process(&ledger, &payment).unwrap();

        let mut after = ledger.clone();
        after.apply_plan(&output.postings);
        assert_eq!(after.balance(BalanceAddress::Penalties), Money::ZERO);
        assert_eq!(after.balance(BalanceAddress::InterestOverdue), Money::ZERO);
        assert_eq!(after.balance(BalanceAddress::PrincipalOverdue), Money::from_major(500));
        // junior addresses untouched
        assert_eq!(after.balance(BalanceAddress::InterestDue), Money::from_major(158));
        assert_eq!(after.balance(BalanceAddress::PrincipalDue), Money::from_major(1_000));
        assert!(output.workflows.is_empty());
    }

    #[test]
    fn test_exact_payment_clears_all_dues() {
        let config = config(AmortizationMethod::DecliningPrincipal);
        let ledger = owed_ledger();
        let payment = IncomingPayment::new(ledger.owed_balances(), "USD", day(2020, 3, 13));
        let output = PaymentProcessor::new(&config).process(&ledger, &payment).unwrap();

        let mut after = ledger.clone();
        after.apply_plan(&output.postings);
        assert!(after.owed_balances().is_zero());
        assert_eq!(after.balance(BalanceAddress::Overpayment), Money::ZERO);
    }

    #[test]
    fn test_overpayment_charges_fee_and_credits_net() {
        let config = config(AmortizationMethod::NoRepayment);
        let ledger = LedgerSnapshot::new("USD", day(2020, 6, 1))
            .with_balance(BalanceAddress::Principal, Money::from_major(100_000));
        let payment = IncomingPayment::new(Money::from_major(2_000), "USD", day(2020, 6, 1));
        let output = PaymentProcessor::new(&config).process(&ledger, &payment).unwrap();

        let mut after = ledger.clone();
        after.apply_plan(&output.postings);
        // 5% fee on 2000 leaves 1900 reducing the principal
        assert_eq!(after.balance(BalanceAddress::Overpayment), -Money::from_major(1_900));
        assert_eq!(after.actual_principal(), Money::from_major(98_100));
    }

    #[test]
    fn test_flat_interest_rejects_overpayment() {
        let config = config(AmortizationMethod::FlatInterest);
        let ledger = LedgerSnapshot::new("USD", day(2020, 6, 1))
            .with_balance(BalanceAddress::Principal, Money::from_major(100_000))
            .with_balance(BalanceAddress::InterestDue, Money::from_major(100));
        let payment = IncomingPayment::new(Money::from_major(500), "USD", day(2020, 6, 1));
        let error = PaymentProcessor::new(&config).process(&ledger, &payment).unwrap_err();
        assert_eq!(
            error.to_string(),
            "Overpayments are not allowed for flat interest loans"
        );

        // a payment covering exactly the dues still goes through
        let exact = IncomingPayment::new(Money::from_major(100), "USD", day(2020, 6, 1));
        assert!(PaymentProcessor::new(&config).process(&ledger, &exact).is_ok());
    }

    #[test]
    fn test_payment_above_total_debt_is_rejected() {
        let config = config(AmortizationMethod::NoRepayment);
        let ledger = LedgerSnapshot::new("USD", day(2023, 1, 1))
            .with_balance(BalanceAddress::Principal, Money::from_major(100_000))
            .with_balance(
                BalanceAddress::AccruedInterest,
                Money::from_str_exact("6005.4772").unwrap(),
            );
        let payment =
            IncomingPayment::new(Money::from_major(200_000), "USD", day(2023, 1, 1));
        let error = PaymentProcessor::new(&config).process(&ledger, &payment).unwrap_err();
        assert_eq!(error.to_string(), "Cannot pay more than is owed");
    }

    #[test]
    fn test_settlement_at_the_early_repayment_quote_closes_the_loan() {
        use crate::derived::total_early_repayment_amount;

        let config = config(AmortizationMethod::NoRepayment);
        let ledger = LedgerSnapshot::new("USD", day(2020, 6, 1))
            .with_balance(BalanceAddress::Principal, Money::from_major(100_000))
            .with_balance(BalanceAddress::Overpayment, -Money::from_major(1_900))
            .with_balance(
                BalanceAddress::AccruedInterest,
                Money::from_str_exact("158.90405").unwrap(),
            );
        // 98100 principal + 158.90405 accrued + 5% fee on the principal
        let quote = total_early_repayment_amount(&config, &ledger);
        assert_eq!(quote, Money::from_str_exact("103163.90405").unwrap());

        let payment = IncomingPayment::new(quote, "USD", day(2020, 6, 1));
        let output = PaymentProcessor::new(&config).process(&ledger, &payment).unwrap();

        let mut after = ledger.clone();
        after.apply_plan(&output.postings);
        assert!(total_outstanding_debt(&after).is_zero());
        assert_eq!(after.balance(BalanceAddress::Principal), Money::ZERO);
        assert_eq!(after.balance(BalanceAddress::Overpayment), Money::ZERO);
        assert_eq!(after.balance(BalanceAddress::AccruedInterest), Money::ZERO);
        assert_eq!(
            output.workflows,
            vec![WorkflowRequest::LoanClosure { account_id: config.account_id }]
        );
        // the fee slice lands on the fee income account
        let fee_account = crate::ledger::LedgerAccount::External(
            config.gl_accounts.overpayment_fee_income.clone(),
        );
        let fee = output
            .postings
            .postings
            .iter()
            .filter(|p| p.to == fee_account)
            .fold(Money::ZERO, |acc, p| acc + p.amount);
        assert_eq!(fee, Money::from_major(4_905));
    }

    #[test]
    fn test_settlement_covers_dues_before_the_remaining_principal() {
        let config = config(AmortizationMethod::DecliningPrincipal);
        let ledger = owed_ledger();
        let quote = crate::derived::total_early_repayment_amount(&config, &ledger);
        let payment = IncomingPayment::new(quote, "USD", day(2020, 3, 13));
        let output = PaymentProcessor::new(&config).process(&ledger, &payment).unwrap();

        let mut after = ledger.clone();
        after.apply_plan(&output.postings);
        assert!(after.owed_balances().is_zero());
        assert!(total_outstanding_debt(&after).is_zero());
        assert!(matches!(output.workflows[0], WorkflowRequest::LoanClosure { .. }));
    }

    #[test]
    fn test_payment_above_the_settlement_quote_is_rejected() {
        let config = config(AmortizationMethod::NoRepayment);
        let ledger = LedgerSnapshot::new("USD", day(2020, 6, 1))
            .with_balance(BalanceAddress::Principal, Money::from_major(100_000));
        // quote is 105000: the debt plus the 5% early repayment fee
        let over = IncomingPayment::new(
            Money::from_str_exact("105000.01").unwrap(),
            "USD",
            day(2020, 6, 1),
        );
        let error = PaymentProcessor::new(&config).process(&ledger, &over).unwrap_err();
        assert_eq!(error.to_string(), "Cannot pay more than is owed");

        let exact = IncomingPayment::new(Money::from_major(105_000), "USD", day(2020, 6, 1));
        assert!(PaymentProcessor::new(&config).process(&ledger, &exact).is_ok());
    }

    #[test]
    fn test_wrong_denomination_is_rejected() {
        let config = config(AmortizationMethod::DecliningPrincipal);
        let ledger = owed_ledger();
        let payment = IncomingPayment::new(Money::from_major(100), "GBP", day(2020, 3, 13));
        assert!(matches!(
            PaymentProcessor::new(&config).process(&ledger, &payment),
            Err(LoanError::WrongDenomination { .. })
        ));
    }

    #[test]
    fn test_backdated_payment_is_rejected_without_override() {
        let config = config(AmortizationMethod::DecliningPrincipal);
        let mut ledger = owed_ledger();
        ledger.last_due_transfer = Some(day(2020, 3, 12));

        let backdated = IncomingPayment::new(Money::from_major(100), "USD", day(2020, 3, 1));
        assert!(matches!(
            PaymentProcessor::new(&config).process(&ledger, &backdated),
            Err(LoanError::BackdatedPayment { .. })
        ));

        let mut overridden = backdated.clone();
        overridden.backdating_allowed = true;
        assert!(PaymentProcessor::new(&config).process(&ledger, &overridden).is_ok());
    }

    #[test]
    fn test_final_payment_requests_closure() {
        let config = config(AmortizationMethod::DecliningPrincipal);
        let ledger = LedgerSnapshot::new("USD", day(2023, 1, 12))
            .with_balance(BalanceAddress::InterestDue, Money::from_str_exact("14.67").unwrap())
            .with_balance(BalanceAddress::PrincipalDue, Money::from_str_exact("2845.33").unwrap());
        let payment =
            IncomingPayment::new(Money::from_str_exact("2860").unwrap(), "USD", day(2023, 1, 12));
        let output = PaymentProcessor::new(&config).process(&ledger, &payment).unwrap();
        assert!(matches!(output.workflows[0], WorkflowRequest::LoanClosure { .. }));
    }
}
