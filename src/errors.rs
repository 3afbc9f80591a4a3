use chrono::NaiveDate;
use thiserror::Error;

use crate::decimal::Money;

/// Failures surfaced by the engine. Domain rejections abort only the
/// triggering invocation; configuration errors fire at validation time,
/// before any balance mutation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoanError {
    #[error("wrong denomination: expected {expected}, got {actual}")]
    WrongDenomination { expected: String, actual: String },

    #[error("Cannot pay more than is owed")]
    CannotPayMoreThanOwed { owed: Money, requested: Money },

    #[error("Overpayments are not allowed for {product} loans")]
    OverpaymentNotAllowed { product: &'static str },

    #[error("insufficient funds: available {available}, requested {requested}")]
    InsufficientFunds { available: Money, requested: Money },

    #[error("backdated posting: value date {value_date} precedes last due transfer on {last_transfer}")]
    BackdatedPayment {
        value_date: NaiveDate,
        last_transfer: NaiveDate,
    },

    #[error("against terms and conditions: {message}")]
    AgainstTermsAndConditions { message: String },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("calculation error: {message}")]
    CalculationError { message: String },
}

pub type Result<T> = std::result::Result<T, LoanError>;
