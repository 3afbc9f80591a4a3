use rust_decimal::Decimal;

use crate::config::AccountConfig;
use crate::decimal::Money;

use super::flat::flat_total_interest;
use super::{AmortizationStrategy, PeriodContext, PeriodSplit};

/// Rule of 78: flat total interest front-loaded by the sum-of-digits
/// weighting. Period i of n carries weight (n - i + 1) / (n(n+1)/2).
pub struct RuleOf78;

fn sum_of_digits(term: u32) -> Decimal {
    Decimal::from(term * (term + 1) / 2)
}

/// interest component for one period under the sum-of-digits weighting;
/// the final period takes the remainder so the components sum exactly
pub(crate) fn rule78_interest(config: &AccountConfig, period: u32) -> Money {
    let term = config.total_term;
    let total = flat_total_interest(config);
    if period == term {
        let mut allocated = Money::ZERO;
        for earlier in 1..term {
            allocated += rule78_interest(config, earlier);
        }
        return total - allocated;
    }
    let weight = Decimal::from(term - period + 1) / sum_of_digits(term);
    (total * weight).round_dp(config.precision.fulfilment)
}

impl RuleOf78 {
    fn level_emi(&self, config: &AccountConfig) -> Money {
        let repayable = config.principal + flat_total_interest(config);
        (repayable / Decimal::from(config.total_term)).round_dp(config.precision.fulfilment)
    }
}

impl AmortizationStrategy for RuleOf78 {
    fn expected_emi(&self, config: &AccountConfig, ctx: &PeriodContext) -> Money {
        if ctx.period_number == config.total_term {
            let split = self.period_split(config, ctx);
            return split.emi;
        }
        self.level_emi(config)
    }

    fn period_split(&self, config: &AccountConfig, ctx: &PeriodContext) -> PeriodSplit {
        let term = config.total_term;
        let period = ctx.period_number;
        let interest_due = rule78_interest(config, period);

        if period == term {
            // final instalment clears the principal remainder exactly
            let mut principal_so_far = Money::ZERO;
            for earlier in 1..term {
                principal_so_far += self.level_emi(config) - rule78_interest(config, earlier);
            }
            let principal_due = config.principal - principal_so_far;
            return PeriodSplit {
                emi: principal_due + interest_due,
                principal_due,
                interest_due,
            };
        }

        let emi = self.level_emi(config);
        PeriodSplit {
            emi,
            principal_due: emi - interest_due,
            interest_due,
        }
    }

    fn expected_balloon(&self, _config: &AccountConfig, _ctx: &PeriodContext) -> Option<Money> {
        None
    }

    fn allows_overpayment(&self) -> bool {
        false
    }

    fn uses_accrued_interest(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AmortizationMethod;
    use crate::decimal::Rate;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn config() -> AccountConfig {
        AccountConfig::new(
            Money::from_major(12_000),
            Rate::from_decimal(dec!(0.1)),
            12,
            5,
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            AmortizationMethod::RuleOf78,
        )
    }

    fn ctx(period: u32) -> PeriodContext {
        PeriodContext {
            period_number: period,
            remaining_term: 12 - period + 1,
            actual_principal: Money::from_major(12_000),
            expected_principal: Money::from_major(12_000),
            interest_accrued: Money::ZERO,
        }
    }

    #[test]
    fn test_interest_is_front_loaded() {
        let config = config();
        // 1200 total, weights 12/78 down to 1/78
        assert_eq!(
            rule78_interest(&config, 1),
            Money::from_str_exact("184.62").unwrap()
        );
        let mut previous = rule78_interest(&config, 1);
        for period in 2..=12 {
            let current = rule78_interest(&config, period);
            assert!(current < previous);
            previous = current;
        }
    }

    #[test]
    fn test_interest_sums_to_flat_total() {
        let config = config();
        let mut total = Money::ZERO;
        for period in 1..=12 {
            total += rule78_interest(&config, period);
        }
        assert_eq!(total, Money::from_major(1_200));
    }

    #[test]
    fn test_principal_sums_exactly() {
        let config = config();
        let mut total_principal = Money::ZERO;
        for period in 1..=12 {
            total_principal += RuleOf78.period_split(&config, &ctx(period)).principal_due;
        }
        assert_eq!(total_principal, config.principal);
    }

    #[test]
    fn test_level_emi_until_final_remainder() {
        let config = config();
        let first = RuleOf78.period_split(&config, &ctx(1));
        assert_eq!(first.emi, Money::from_major(1_100));
        assert_eq!(first.interest_due, Money::from_str_exact("184.62").unwrap());
        assert_eq!(first.principal_due, Money::from_str_exact("915.38").unwrap());

        for period in 2..12 {
            assert_eq!(RuleOf78.period_split(&config, &ctx(period)).emi, first.emi);
        }
    }
}
