use crate::config::AccountConfig;
use crate::decimal::Money;

use super::{AmortizationStrategy, PeriodContext, PeriodSplit};

/// No scheduled instalments: interest accrues until the balloon date, when
/// principal and capitalised interest fall due in one payment. Voluntary
/// overpayments remain accepted throughout the term.
pub struct NoRepayment;

impl AmortizationStrategy for NoRepayment {
    fn expected_emi(&self, _config: &AccountConfig, _ctx: &PeriodContext) -> Money {
        Money::ZERO
    }

    fn period_split(&self, _config: &AccountConfig, _ctx: &PeriodContext) -> PeriodSplit {
        PeriodSplit {
            emi: Money::ZERO,
            principal_due: Money::ZERO,
            interest_due: Money::ZERO,
        }
    }

    fn expected_balloon(&self, _config: &AccountConfig, ctx: &PeriodContext) -> Option<Money> {
        Some(ctx.actual_principal.max(Money::ZERO))
    }
}
