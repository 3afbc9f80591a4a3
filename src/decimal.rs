use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

/// Signed monetary amount. Arithmetic is exact; rounding happens only at the
/// precision boundaries the engine defines (accrual and fulfilment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn from_decimal(d: Decimal) -> Self {
        Money(d)
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(Decimal::from_str(s)?))
    }

    /// create from integer amount (dollars, euros, etc)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// round half-up to the given number of decimal places
    pub fn round_dp(&self, dp: u32) -> Self {
        Money(self.0.round_dp_with_strategy(
            dp,
            rust_decimal::RoundingStrategy::MidpointAwayFromZero,
        ))
    }

    /// render with a fixed number of decimal places, e.g. "120.50"
    pub fn to_string_dp(&self, dp: u32) -> String {
        let mut rounded = self.round_dp(dp).0;
        rounded.rescale(dp);
        rounded.to_string()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money(d)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Money) {
        self.0 -= other.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money(self.0 * other)
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money(self.0 / other)
    }
}

/// annual interest rate expressed as a fraction (0.05 for 5%)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    pub fn from_decimal(d: Decimal) -> Self {
        Rate(d)
    }

    /// create from percentage (e.g., 5 for 5%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(Decimal::from(p) / Decimal::from(100))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// daily rate, rounded to the configured rate precision
    pub fn daily_rate(&self, days_in_year: u32, rate_precision: u32) -> Rate {
        let daily = self.0 / Decimal::from(days_in_year);
        Rate(daily.round_dp_with_strategy(
            rate_precision,
            rust_decimal::RoundingStrategy::MidpointAwayFromZero,
        ))
    }

    /// monthly rate from annual rate, unrounded
    pub fn monthly_rate(&self) -> Decimal {
        self.0 / Decimal::from(12)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl From<Decimal> for Rate {
    fn from(d: Decimal) -> Self {
        Rate(d)
    }
}

impl Add for Rate {
    type Output = Rate;

    fn add(self, other: Rate) -> Rate {
        Rate(self.0 + other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_arithmetic_is_exact() {
        let a = Money::from_str_exact("5.47945").unwrap();
        let b = a + a;
        assert_eq!(b.to_string(), "10.9589");
        assert_eq!(b.round_dp(5), Money::from_str_exact("10.95890").unwrap());
    }

    #[test]
    fn test_rounding_is_half_up() {
        let m = Money::from_str_exact("6005.4772").unwrap();
        assert_eq!(m.round_dp(2), Money::from_str_exact("6005.48").unwrap());

        let midpoint = Money::from_str_exact("1.005").unwrap();
        assert_eq!(midpoint.round_dp(2), Money::from_str_exact("1.01").unwrap());
    }

    #[test]
    fn test_daily_rate_precision() {
        let rate = Rate::from_decimal(dec!(0.02));
        let daily = rate.daily_rate(365, 10);
        assert_eq!(daily.as_decimal(), dec!(0.0000547945));
    }

    #[test]
    fn test_fixed_point_rendering() {
        assert_eq!(Money::from_str_exact("120.5").unwrap().to_string_dp(2), "120.50");
        assert_eq!(Money::from_major(15).to_string_dp(2), "15.00");
        assert_eq!(Money::from_str_exact("6005.4772").unwrap().to_string_dp(2), "6005.48");
    }

    #[test]
    fn test_negative_money() {
        let overpayment = -Money::from_major(1900);
        assert!(overpayment.is_negative());
        assert_eq!(overpayment.abs(), Money::from_major(1900));
        assert_eq!(Money::from_major(100_000) + overpayment, Money::from_major(98_100));
    }
}
