use rust_decimal::Decimal;

use crate::config::AccountConfig;
use crate::decimal::Money;

use super::{AmortizationStrategy, PeriodContext, PeriodSplit};

/// Flat interest: total interest = principal x rate x term, spread evenly.
/// The EMI is constant for the life of the loan and overpayments are
/// rejected at allocation time.
pub struct FlatInterest;

/// total contractual interest over the whole term
pub(crate) fn flat_total_interest(config: &AccountConfig) -> Money {
    let years = Decimal::from(config.total_term) / Decimal::from(12);
    (config.principal * config.annual_rate.as_decimal() * years)
        .round_dp(config.precision.fulfilment)
}

/// even split with the final period absorbing rounding residue
pub(crate) fn even_component(total: Money, term: u32, period: u32, precision: u32) -> Money {
    let per_period = (total / Decimal::from(term)).round_dp(precision);
    if period == term {
        total - per_period * Decimal::from(term - 1)
    } else {
        per_period
    }
}

impl AmortizationStrategy for FlatInterest {
    fn expected_emi(&self, config: &AccountConfig, ctx: &PeriodContext) -> Money {
        let precision = config.precision.fulfilment;
        even_component(config.principal, config.total_term, ctx.period_number, precision)
            + even_component(
                flat_total_interest(config),
                config.total_term,
                ctx.period_number,
                precision,
            )
    }

    fn period_split(&self, config: &AccountConfig, ctx: &PeriodContext) -> PeriodSplit {
        let precision = config.precision.fulfilment;
        let principal_due =
            even_component(config.principal, config.total_term, ctx.period_number, precision);
        let interest_due = even_component(
            flat_total_interest(config),
            config.total_term,
            ctx.period_number,
            precision,
        );
        PeriodSplit {
            emi: principal_due + interest_due,
            principal_due,
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
