use crate::config::AccountConfig;
use crate::decimal::Money;

use super::{AmortizationStrategy, PeriodContext, PeriodSplit};

/// Interest-only servicing: each instalment collects the period's accrued
/// interest and no principal. The whole principal falls due at the balloon
/// date.
pub struct InterestOnly;

impl AmortizationStrategy for InterestOnly {
    fn expected_emi(&self, config: &AccountConfig, ctx: &PeriodContext) -> Money {
        if ctx.interest_accrued > Money::ZERO {
            return ctx.interest_accrued;
        }
        // before any accrual, estimate from the nominal monthly rate
        (ctx.actual_principal * config.annual_rate.monthly_rate())
            .round_dp(config.precision.fulfilment)
    }

    fn period_split(&self, _config: &AccountConfig, ctx: &PeriodContext) -> PeriodSplit {
        PeriodSplit {
            emi: ctx.interest_accrued,
            principal_due: Money::ZERO,
            interest_due: ctx.interest_accrued,
        }
    }

    fn expected_balloon(&self, _config: &AccountConfig, ctx: &PeriodContext) -> Option<Money> {
        Some(ctx.actual_principal.max(Money::ZERO))
    }
}
