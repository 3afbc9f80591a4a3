use rust_decimal::Decimal;

use crate::config::{AccountConfig, OverpaymentPreference};
use crate::decimal::Money;

use super::{compound_factor, AmortizationStrategy, PeriodContext, PeriodSplit};

/// Partially amortizing annuity with a balloon. Exactly one of the balloon
/// amount or the EMI is configured; the other is solved from the annuity
/// identity P * f = E * (f - 1) / r + B with f = (1 + r)^n.
pub struct MinimumRepaymentWithBalloon;

impl MinimumRepaymentWithBalloon {
    fn emi_base(&self, config: &AccountConfig, ctx: &PeriodContext) -> Money {
        match config.overpayment.impact_preference {
            OverpaymentPreference::ReduceTerm => ctx.expected_principal,
            OverpaymentPreference::ReduceEmi | OverpaymentPreference::IncreaseEmi => {
                ctx.actual_principal
            }
        }
    }

    /// EMI that leaves exactly `balloon` outstanding after `periods`
    fn solve_emi(
        &self,
        config: &AccountConfig,
        principal: Money,
        balloon: Money,
        periods: u32,
    ) -> Money {
        if periods == 0 {
            return Money::ZERO;
        }
        let rate = config.annual_rate.monthly_rate();
        if rate.is_zero() {
            return ((principal - balloon) / Decimal::from(periods))
                .round_dp(config.precision.fulfilment);
        }
        let factor = compound_factor(rate, periods);
        let emi = (principal.as_decimal() * factor - balloon.as_decimal()) * rate
            / (factor - Decimal::ONE);
        Money::from_decimal(emi).round_dp(config.precision.fulfilment)
    }

    /// balloon left outstanding after `periods` of paying exactly `emi`
    fn solve_balloon(
        &self,
        config: &AccountConfig,
        principal: Money,
        emi: Money,
        periods: u32,
    ) -> Money {
        let rate = config.annual_rate.monthly_rate();
        if rate.is_zero() {
            return (principal - emi * Decimal::from(periods))
                .max(Money::ZERO)
                .round_dp(config.precision.fulfilment);
        }
        let factor = compound_factor(rate, periods);
        let balloon =
            principal.as_decimal() * factor - emi.as_decimal() * (factor - Decimal::ONE) / rate;
        Money::from_decimal(balloon)
            .max(Money::ZERO)
            .round_dp(config.precision.fulfilment)
    }
}

impl AmortizationStrategy for MinimumRepaymentWithBalloon {
    fn expected_emi(&self, config: &AccountConfig, ctx: &PeriodContext) -> Money {
        if let Some(emi) = config.balloon.balloon_emi_amount {
            return emi;
        }
        let balloon = config.balloon.balloon_payment_amount.unwrap_or(Money::ZERO);
        self.solve_emi(config, self.emi_base(config, ctx), balloon, ctx.remaining_term)
    }

    fn period_split(&self, config: &AccountConfig, ctx: &PeriodContext) -> PeriodSplit {
        let emi = self.expected_emi(config, ctx);
        let interest_due = ctx.interest_accrued;
        // EMI below interest floors the principal component at zero
        let principal_due = (emi - interest_due)
            .max(Money::ZERO)
            .min(ctx.actual_principal.max(Money::ZERO));
        PeriodSplit {
            emi,
            principal_due,
            interest_due,
        }
    }

    fn expected_balloon(&self, config: &AccountConfig, ctx: &PeriodContext) -> Option<Money> {
        if let Some(emi) = config.balloon.balloon_emi_amount {
            return Some(self.solve_balloon(
                config,
                ctx.actual_principal.max(Money::ZERO),
                emi,
                ctx.remaining_term,
            ));
        }
        config.balloon.balloon_payment_amount
    }
}
