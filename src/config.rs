use chrono::NaiveDate;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};

/// unique identifier for a loan account
pub type AccountId = Uuid;

/// amortization method, fixed at origination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AmortizationMethod {
    /// standard reducing-balance EMI
    DecliningPrincipal,
    /// interest = principal x rate x term, spread evenly
    FlatInterest,
    /// flat-interest total split by decreasing period weights
    RuleOf78,
    /// interest only until the final period, principal as balloon
    InterestOnly,
    /// no periodic dues, single balloon of principal plus residual interest
    NoRepayment,
    /// fixed EMI or fixed balloon, the other derived by annuity solve
    MinimumRepaymentWithBalloon,
}

impl AmortizationMethod {
    pub fn display_name(&self) -> &'static str {
        match self {
            AmortizationMethod::DecliningPrincipal => "declining principal",
            AmortizationMethod::FlatInterest => "flat interest",
            AmortizationMethod::RuleOf78 => "rule of 78",
            AmortizationMethod::InterestOnly => "interest only",
            AmortizationMethod::NoRepayment => "no repayment",
            AmortizationMethod::MinimumRepaymentWithBalloon => "minimum repayment with balloon",
        }
    }
}

/// balloon sizing and dating parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalloonConfig {
    /// fixed final balloon amount; EMI derived when set
    pub balloon_payment_amount: Option<Money>,
    /// fixed EMI; balloon amount derived when set
    pub balloon_emi_amount: Option<Money>,
    /// days between the final scheduled repayment and the balloon payment
    pub balloon_payment_days_delta: u32,
}

/// how often accrued interest folds into principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum CapitalisationFrequency {
    #[default]
    NoCapitalisation,
    Daily,
    Monthly,
}

/// capitalisation policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapitalisationConfig {
    pub accrued_interest: CapitalisationFrequency,
    pub overdue_interest: CapitalisationFrequency,
    pub capitalise_late_repayment_fee: bool,
}

/// penalty terms applied to overdue balances
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PenaltyConfig {
    pub penalty_rate: Rate,
    /// add the base rate on top of the penalty rate
    pub penalty_includes_base_rate: bool,
    /// accrue penalty interest on overdue interest as well as overdue principal
    pub penalty_compounds_overdue_interest: bool,
    /// flat fee posted when an instalment goes overdue
    pub late_repayment_fee: Money,
    /// days after the due transfer before the overdue check fires
    pub repayment_period_days: u32,
    /// days after the overdue check before the delinquency check fires
    pub grace_period_days: u32,
}

impl Default for PenaltyConfig {
    fn default() -> Self {
        Self {
            penalty_rate: Rate::from_decimal(dec!(0.24)),
            penalty_includes_base_rate: false,
            penalty_compounds_overdue_interest: false,
            late_repayment_fee: Money::from_major(15),
            repayment_period_days: 1,
            grace_period_days: 15,
        }
    }
}

/// what an overpayment does to the remaining schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OverpaymentPreference {
    /// keep EMI constant, shorten the remaining term
    #[default]
    ReduceTerm,
    /// keep term constant, lower the EMI
    ReduceEmi,
    /// keep term constant, raise the EMI
    IncreaseEmi,
}

/// overpayment handling parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverpaymentConfig {
    pub fee_rate: Rate,
    pub impact_preference: OverpaymentPreference,
}

impl Default for OverpaymentConfig {
    fn default() -> Self {
        Self {
            fee_rate: Rate::from_decimal(dec!(0.05)),
            impact_preference: OverpaymentPreference::ReduceTerm,
        }
    }
}

/// rounding precisions shared by accrual and fulfilment
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PrecisionConfig {
    pub rate: u32,
    pub accrual: u32,
    pub fulfilment: u32,
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        Self {
            rate: 10,
            accrual: 5,
            fulfilment: 2,
        }
    }
}

/// day-count basis for the daily rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DaysInYear {
    #[default]
    Fixed365,
    Fixed360,
    Actual,
}

impl DaysInYear {
    pub fn basis(&self, year: i32) -> u32 {
        match self {
            DaysInYear::Fixed365 => 365,
            DaysInYear::Fixed360 => 360,
            DaysInYear::Actual => {
                if (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0) {
                    366
                } else {
                    365
                }
            }
        }
    }
}

/// accrual base settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccrualConfig {
    pub days_in_year: DaysInYear,
    /// include PRINCIPAL_DUE in the accrual base
    pub accrue_interest_on_due_principal: bool,
}

/// flags that silently skip scheduled steps (policy skips, not faults)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockingFlags {
    pub due_amount: Vec<String>,
    pub accrual: Vec<String>,
    pub overdue: Vec<String>,
    pub delinquency: Vec<String>,
    /// flags that block the main accrual but never penalty accrual
    pub penalty: Vec<String>,
}

/// time-of-day for a scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTime {
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl Default for EventTime {
    fn default() -> Self {
        Self {
            hour: 0,
            minute: 0,
            second: 1,
        }
    }
}

/// per-event schedule times from template parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleTimes {
    pub accrue_interest: EventTime,
    pub repayment_day: EventTime,
    pub check_overdue: EventTime,
    pub check_delinquency: EventTime,
    pub balloon_payment: EventTime,
}

/// external GL account names from template parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlAccounts {
    pub interest_income: String,
    pub accrued_interest_receivable: String,
    pub penalty_income: String,
    pub late_fee_income: String,
    pub overpayment_fee_income: String,
    pub repayment_account: String,
}

impl Default for GlAccounts {
    fn default() -> Self {
        Self {
            interest_income: "INTEREST_INCOME".to_string(),
            accrued_interest_receivable: "ACCRUED_INTEREST_RECEIVABLE".to_string(),
            penalty_income: "PENALTY_INCOME".to_string(),
            late_fee_income: "LATE_FEE_INCOME".to_string(),
            overpayment_fee_income: "OVERPAYMENT_FEE_INCOME".to_string(),
            repayment_account: "REPAYMENT_ACCOUNT".to_string(),
        }
    }
}

/// Instance and template parameters resolved at invocation start. Immutable
/// during a hook execution; mid-term changes (repayment day, rate, top-up)
/// produce a new config for subsequent invocations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub account_id: AccountId,
    pub denomination: String,
    pub principal: Money,
    pub annual_rate: Rate,
    /// total term in monthly repayment periods
    pub total_term: u32,
    /// day of month instalments fall due, 1 to 28
    pub repayment_day: u32,
    pub loan_start_date: NaiveDate,
    pub amortisation_method: AmortizationMethod,
    pub balloon: BalloonConfig,
    pub capitalisation: CapitalisationConfig,
    pub penalty: PenaltyConfig,
    pub overpayment: OverpaymentConfig,
    pub precision: PrecisionConfig,
    pub accrual: AccrualConfig,
    pub blocking: BlockingFlags,
    pub schedule_times: ScheduleTimes,
    pub gl_accounts: GlAccounts,
}

impl AccountConfig {
    /// minimal config with template defaults
    pub fn new(
        principal: Money,
        annual_rate: Rate,
        total_term: u32,
        repayment_day: u32,
        loan_start_date: NaiveDate,
        amortisation_method: AmortizationMethod,
    ) -> Self {
        Self {
            account_id: Uuid::new_v4(),
            denomination: "USD".to_string(),
            principal,
            annual_rate,
            total_term,
            repayment_day,
            loan_start_date,
            amortisation_method,
            balloon: BalloonConfig::default(),
            capitalisation: CapitalisationConfig::default(),
            penalty: PenaltyConfig::default(),
            overpayment: OverpaymentConfig::default(),
            precision: PrecisionConfig::default(),
            accrual: AccrualConfig::default(),
            blocking: BlockingFlags::default(),
            schedule_times: ScheduleTimes::default(),
            gl_accounts: GlAccounts::default(),
        }
    }

    pub fn with_balloon(mut self, balloon: BalloonConfig) -> Self {
        self.balloon = balloon;
        self
    }

    pub fn with_capitalisation(mut self, capitalisation: CapitalisationConfig) -> Self {
        self.capitalisation = capitalisation;
        self
    }

    pub fn with_overpayment_preference(mut self, preference: OverpaymentPreference) -> Self {
        self.overpayment.impact_preference = preference;
        self
    }

    /// fails on invalid parameter combinations, before any balance mutation
    pub fn validate(&self) -> Result<()> {
        if !self.principal.is_positive() {
            return Err(LoanError::InvalidConfiguration {
                message: format!("principal must be positive, got {}", self.principal),
            });
        }
        if self.total_term == 0 {
            return Err(LoanError::InvalidConfiguration {
                message: "total term must be at least one period".to_string(),
            });
        }
        if self.repayment_day == 0 || self.repayment_day > 28 {
            return Err(LoanError::InvalidConfiguration {
                message: format!(
                    "repayment day must be between 1 and 28, got {}",
                    self.repayment_day
                ),
            });
        }
        if self.amortisation_method == AmortizationMethod::MinimumRepaymentWithBalloon {
            match (
                self.balloon.balloon_payment_amount,
                self.balloon.balloon_emi_amount,
            ) {
                (None, None) => {
                    return Err(LoanError::InvalidConfiguration {
                        message: "minimum repayment with balloon requires one of \
                                  balloon_payment_amount or balloon_emi_amount"
                            .to_string(),
                    });
                }
                (Some(_), Some(_)) => {
                    return Err(LoanError::InvalidConfiguration {
                        message: "balloon_payment_amount and balloon_emi_amount \
                                  are mutually exclusive"
                            .to_string(),
                    });
                }
                _ => {}
            }
        }
        let fee_rate = self.overpayment.fee_rate.as_decimal();
        if fee_rate < dec!(0) || fee_rate >= dec!(1) {
            return Err(LoanError::InvalidConfiguration {
                message: format!("overpayment fee rate must be in [0, 1), got {}", fee_rate),
            });
        }
        Ok(())
    }

    /// effective penalty rate applied to overdue balances
    pub fn effective_penalty_rate(&self) -> Rate {
        if self.penalty.penalty_includes_base_rate {
            self.penalty.penalty_rate + self.annual_rate
        } else {
            self.penalty.penalty_rate
        }
    }
}
