use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::decimal::Money;

/// named balance addresses within a loan account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalanceAddress {
    /// outstanding principal not yet due
    Principal,
    /// principal due this period, awaiting payment
    PrincipalDue,
    /// due principal unpaid past the repayment period
    PrincipalOverdue,
    /// interest due this period, awaiting payment
    InterestDue,
    /// due interest unpaid past the repayment period
    InterestOverdue,
    /// interest accrued on actual principal
    AccruedInterest,
    /// interest accrued on the contractually-expected principal trajectory
    AccruedExpectedInterest,
    /// interest earmarked to be folded into principal
    AccruedInterestPendingCapitalisation,
    /// overdue interest earmarked to be folded into principal
    AccruedOverdueInterestPendingCapitalisation,
    /// capitalized interest added to principal
    PrincipalCapitalisedInterest,
    /// capitalized penalties added to principal
    PrincipalCapitalisedPenalties,
    /// cumulative net overpayment, negative when overpaid
    Overpayment,
    /// accrued late fees and penalty interest
    Penalties,
    /// current equated-instalment amount
    Emi,
    /// correction term when actual principal diverges from expected
    EmiPrincipalExcess,
    /// accrual-side contra keeping in-account postings double-entry balanced
    InternalContra,
}

/// balance phase; the engine only ever reads and writes committed balances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Phase {
    #[default]
    Committed,
    Pending,
}

/// side of a posting: an in-account address or an external GL account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerAccount {
    Internal(BalanceAddress),
    External(String),
}

pub type InstructionDetails = serde_json::Map<String, serde_json::Value>;

/// one balanced debit/credit movement: `amount` leaves `from` and arrives
/// at `to` in the same denomination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub from: LedgerAccount,
    pub to: LedgerAccount,
    pub amount: Money,
    pub denomination: String,
    pub phase: Phase,
    pub details: InstructionDetails,
}

/// batch of postings the host commits atomically
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostingPlan {
    pub postings: Vec<Posting>,
}

impl PostingPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn push(&mut self, posting: Posting) {
        self.postings.push(posting);
    }

    /// move `amount` between two addresses of the account
    pub fn transfer(
        &mut self,
        from: BalanceAddress,
        to: BalanceAddress,
        amount: Money,
        denomination: &str,
        instruction: &str,
    ) {
        self.push(Posting {
            from: LedgerAccount::Internal(from),
            to: LedgerAccount::Internal(to),
            amount,
            denomination: denomination.to_string(),
            phase: Phase::Committed,
            details: instruction_details(instruction),
        });
    }

    /// settle an owed address: its balance decreases, the external account
    /// receives the funds
    pub fn settle(
        &mut self,
        address: BalanceAddress,
        external_account: &str,
        amount: Money,
        denomination: &str,
        instruction: &str,
    ) {
        self.push(Posting {
            from: LedgerAccount::Internal(address),
            to: LedgerAccount::External(external_account.to_string()),
            amount,
            denomination: denomination.to_string(),
            phase: Phase::Committed,
            details: instruction_details(instruction),
        });
    }

    /// mirror an accrual into a pair of external GL accounts
    pub fn mirror_external(
        &mut self,
        from_account: &str,
        to_account: &str,
        amount: Money,
        denomination: &str,
        instruction: &str,
    ) {
        self.push(Posting {
            from: LedgerAccount::External(from_account.to_string()),
            to: LedgerAccount::External(to_account.to_string()),
            amount,
            denomination: denomination.to_string(),
            phase: Phase::Committed,
            details: instruction_details(instruction),
        });
    }

    pub fn extend(&mut self, other: PostingPlan) {
        self.postings.extend(other.postings);
    }

    /// net signed effect of this plan on one internal address
    pub fn net_effect(&self, address: BalanceAddress) -> Money {
        let target = LedgerAccount::Internal(address);
        self.postings.iter().fold(Money::ZERO, |acc, p| {
            let mut v = acc;
            if p.to == target {
                v += p.amount;
            }
            if p.from == target {
                v -= p.amount;
            }
            v
        })
    }
}

fn instruction_details(instruction: &str) -> InstructionDetails {
    let mut details = InstructionDetails::new();
    details.insert(
        "description".to_string(),
        serde_json::Value::String(instruction.to_string()),
    );
    details
}

/// read-only projection of an account's balances as of one invocation
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub denomination: String,
    pub as_of: NaiveDate,
    /// effective date of the most recent repayment-day transfer, if any
    pub last_due_transfer: Option<NaiveDate>,
    /// completed repayment periods since origination (or last top-up)
    pub elapsed_periods: u32,
    /// flags currently present on the account
    pub flags: Vec<String>,
    balances: HashMap<BalanceAddress, Money>,
}

impl LedgerSnapshot {
    pub fn new(denomination: &str, as_of: NaiveDate) -> Self {
        Self {
            denomination: denomination.to_string(),
            as_of,
            last_due_transfer: None,
            elapsed_periods: 0,
            flags: Vec::new(),
            balances: HashMap::new(),
        }
    }

    pub fn balance(&self, address: BalanceAddress) -> Money {
        self.balances.get(&address).copied().unwrap_or(Money::ZERO)
    }

    pub fn set_balance(&mut self, address: BalanceAddress, amount: Money) {
        self.balances.insert(address, amount);
    }

    pub fn with_balance(mut self, address: BalanceAddress, amount: Money) -> Self {
        self.set_balance(address, amount);
        self
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }

    pub fn has_any_flag(&self, flags: &[String]) -> bool {
        flags.iter().any(|f| self.has_flag(f))
    }

    /// apply a committed plan to this view; internal addresses only, the
    /// host owns external accounts
    pub fn apply_plan(&mut self, plan: &PostingPlan) {
        for posting in &plan.postings {
            if let LedgerAccount::Internal(address) = posting.from {
                let current = self.balance(address);
                self.set_balance(address, current - posting.amount);
            }
            if let LedgerAccount::Internal(address) = posting.to {
                let current = self.balance(address);
                self.set_balance(address, current + posting.amount);
            }
        }
    }

    /// amounts currently due or overdue, in allocation order
    pub fn owed_balances(&self) -> Money {
        self.balance(BalanceAddress::Penalties)
            + self.balance(BalanceAddress::InterestOverdue)
            + self.balance(BalanceAddress::PrincipalOverdue)
            + self.balance(BalanceAddress::InterestDue)
            + self.balance(BalanceAddress::PrincipalDue)
    }

    /// principal actually outstanding: booked principal plus capitalised
    /// amounts, reduced by the (negative) overpayment balance
    pub fn actual_principal(&self) -> Money {
        self.balance(BalanceAddress::Principal)
            + self.balance(BalanceAddress::PrincipalCapitalisedInterest)
            + self.balance(BalanceAddress::PrincipalCapitalisedPenalties)
            + self.balance(BalanceAddress::Overpayment)
    }

    /// principal on the contractual trajectory, blind to overpayments
    pub fn expected_principal(&self) -> Money {
        self.balance(BalanceAddress::Principal)
            + self.balance(BalanceAddress::PrincipalCapitalisedInterest)
            + self.balance(BalanceAddress::PrincipalCapitalisedPenalties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_plan_is_conserved() {
        let mut plan = PostingPlan::new();
        plan.transfer(
            BalanceAddress::InternalContra,
            BalanceAddress::AccruedInterest,
            Money::from_str_exact("5.47945").unwrap(),
            "USD",
            "daily accrual",
        );
        plan.mirror_external(
            "INTEREST_INCOME",
            "ACCRUED_INTEREST_RECEIVABLE",
            Money::from_str_exact("5.47945").unwrap(),
            "USD",
            "daily accrual",
        );

        // every posting is a balanced pair: debits equal credits
        let mut total = Money::ZERO;
        for p in &plan.postings {
            total += p.amount;
            total -= p.amount;
        }
        assert!(total.is_zero());
        assert_eq!(
            plan.net_effect(BalanceAddress::AccruedInterest),
            Money::from_str_exact("5.47945").unwrap()
        );
    }

    #[test]
    fn test_apply_plan_mutates_internal_only() {
        let mut snapshot = LedgerSnapshot::new("USD", day(2024, 1, 1))
            .with_balance(BalanceAddress::Principal, Money::from_major(100_000));

        let mut plan = PostingPlan::new();
        plan.transfer(
            BalanceAddress::Principal,
            BalanceAddress::PrincipalDue,
            Money::from_major(1_000),
            "USD",
            "due transfer",
        );
        plan.settle(
            BalanceAddress::PrincipalDue,
            "REPAYMENT_ACCOUNT",
            Money::from_major(400),
            "USD",
            "repayment",
        );
        snapshot.apply_plan(&plan);

        assert_eq!(snapshot.balance(BalanceAddress::Principal), Money::from_major(99_000));
        assert_eq!(snapshot.balance(BalanceAddress::PrincipalDue), Money::from_major(600));
    }

    #[test]
    fn test_actual_vs_expected_principal() {
        let snapshot = LedgerSnapshot::new("USD", day(2024, 1, 1))
            .with_balance(BalanceAddress::Principal, Money::from_major(100_000))
            .with_balance(BalanceAddress::Overpayment, -Money::from_major(1_900));

        assert_eq!(snapshot.actual_principal(), Money::from_major(98_100));
        assert_eq!(snapshot.expected_principal(), Money::from_major(100_000));
    }
}
