pub mod declining;
pub mod flat;
pub mod interest_only;
pub mod minimum_repayment;
pub mod no_repayment;
pub mod rule78;

use rust_decimal::Decimal;

use crate::config::{AccountConfig, AmortizationMethod};
use crate::decimal::Money;

pub use declining::DecliningPrincipal;
pub use flat::FlatInterest;
pub use interest_only::InterestOnly;
pub use minimum_repayment::MinimumRepaymentWithBalloon;
pub use no_repayment::NoRepayment;
pub use rule78::RuleOf78;

/// inputs a strategy needs to split one period
#[derive(Debug, Clone, Copy)]
pub struct PeriodContext {
    /// 1-based number of the instalment falling due
    pub period_number: u32,
    /// periods left including the current one
    pub remaining_term: u32,
    /// principal actually outstanding (net of overpayments)
    pub actual_principal: Money,
    /// principal on the contractual trajectory (overpayment-blind)
    pub expected_principal: Money,
    /// interest accrued for the period, fulfilment-rounded
    pub interest_accrued: Money,
}

/// the period's expected EMI composition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodSplit {
    /// nominal EMI recorded at the EMI address
    pub emi: Money,
    pub principal_due: Money,
    pub interest_due: Money,
}

/// One amortization policy. Selected once from the account configuration;
/// call sites never re-branch on the method.
pub trait AmortizationStrategy {
    /// nominal EMI for the coming period
    fn expected_emi(&self, config: &AccountConfig, ctx: &PeriodContext) -> Money;

    /// due split for the period falling due
    fn period_split(&self, config: &AccountConfig, ctx: &PeriodContext) -> PeriodSplit;

    /// projected balloon amount, None for fully amortizing methods
    fn expected_balloon(&self, config: &AccountConfig, ctx: &PeriodContext) -> Option<Money>;

    /// whether payments beyond the owed balances are accepted
    fn allows_overpayment(&self) -> bool {
        true
    }

    /// whether the interest component comes from the daily accrual address
    /// rather than the contractual schedule
    fn uses_accrued_interest(&self) -> bool {
        true
    }
}

/// resolve the strategy for a configured method
pub fn strategy_for(method: AmortizationMethod) -> &'static dyn AmortizationStrategy {
    match method {
        AmortizationMethod::DecliningPrincipal => &DecliningPrincipal,
        AmortizationMethod::FlatInterest => &FlatInterest,
        AmortizationMethod::RuleOf78 => &RuleOf78,
        AmortizationMethod::InterestOnly => &InterestOnly,
        AmortizationMethod::NoRepayment => &NoRepayment,
        AmortizationMethod::MinimumRepaymentWithBalloon => &MinimumRepaymentWithBalloon,
    }
}

/// (1 + r)^n
pub(crate) fn compound_factor(monthly_rate: Decimal, periods: u32) -> Decimal {
    let mut factor = Decimal::ONE;
    let base = Decimal::ONE + monthly_rate;
    for _ in 0..periods {
        factor *= base;
    }
    factor
}

/// standard annuity EMI: P * r * (1 + r)^n / ((1 + r)^n - 1)
pub(crate) fn annuity_emi(
    principal: Money,
    monthly_rate: Decimal,
    periods: u32,
    fulfilment_precision: u32,
) -> Money {
    if periods == 0 {
        return principal.round_dp(fulfilment_precision);
    }
    if monthly_rate.is_zero() {
        return (principal / Decimal::from(periods)).round_dp(fulfilment_precision);
    }
    let factor = compound_factor(monthly_rate, periods);
    let emi = principal.as_decimal() * monthly_rate * factor / (factor - Decimal::ONE);
    Money::from_decimal(emi).round_dp(fulfilment_precision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_annuity_emi() {
        // $100k at 12% over 12 months is about $8,884.88
        let emi = annuity_emi(Money::from_major(100_000), dec!(0.01), 12, 2);
        assert_eq!(emi, Money::from_str_exact("8884.88").unwrap());
    }

    #[test]
    fn test_annuity_emi_zero_rate() {
        let emi = annuity_emi(Money::from_major(12_000), Decimal::ZERO, 12, 2);
        assert_eq!(emi, Money::from_major(1_000));
    }

    #[test]
    fn test_strategy_selection_is_closed() {
        assert!(!strategy_for(AmortizationMethod::FlatInterest).allows_overpayment());
        assert!(!strategy_for(AmortizationMethod::RuleOf78).allows_overpayment());
        assert!(strategy_for(AmortizationMethod::DecliningPrincipal).allows_overpayment());
        assert!(strategy_for(AmortizationMethod::NoRepayment).allows_overpayment());
    }
}
