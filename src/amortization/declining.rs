use crate::config::{AccountConfig, OverpaymentPreference};
use crate::decimal::Money;

use super::{annuity_emi, AmortizationStrategy, PeriodContext, PeriodSplit};

/// Standard reducing-balance EMI. Recomputing the annuity from the current
/// expected principal and remaining term reproduces the origination EMI
/// while the loan is on schedule, and absorbs rate changes and top-ups
/// without a stored schedule.
pub struct DecliningPrincipal;

impl DecliningPrincipal {
    fn emi_base(&self, config: &AccountConfig, ctx: &PeriodContext) -> Money {
        match config.overpayment.impact_preference {
            // EMI stays on the contractual trajectory, term shortens
            OverpaymentPreference::ReduceTerm => ctx.expected_principal,
            // term stays, EMI tracks the actual principal
            OverpaymentPreference::ReduceEmi | OverpaymentPreference::IncreaseEmi => {
                ctx.actual_principal
            }
        }
    }
}

impl AmortizationStrategy for DecliningPrincipal {
    fn expected_emi(&self, config: &AccountConfig, ctx: &PeriodContext) -> Money {
        annuity_emi(
            self.emi_base(config, ctx),
            config.annual_rate.monthly_rate(),
            ctx.remaining_term,
            config.precision.fulfilment,
        )
    }

    fn period_split(&self, config: &AccountConfig, ctx: &PeriodContext) -> PeriodSplit {
        let emi = self.expected_emi(config, ctx);
        let interest_due = ctx.interest_accrued;

        if ctx.remaining_term <= 1 {
            // final instalment clears whatever principal is left
            return PeriodSplit {
                emi,
                principal_due: ctx.actual_principal.max(Money::ZERO),
                interest_due,
            };
        }

        // EMI below interest: principal component floors at zero while the
        // EMI address keeps recording the nominal amount
        let principal_due = (emi - interest_due)
            .max(Money::ZERO)
            .min(ctx.actual_principal.max(Money::ZERO));

        PeriodSplit {
            emi,
            principal_due,
            interest_due,
        }
    }

    fn expected_balloon(&self, _config: &AccountConfig, _ctx: &PeriodContext) -> Option<Money> {
        None
    }
}
