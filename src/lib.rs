pub mod accrual;
pub mod amortization;
pub mod balloon;
pub mod config;
pub mod decimal;
pub mod derived;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod lifecycle;
pub mod payments;
pub mod schedule;
pub mod simulation;

// re-export key types
pub use accrual::{AccrualEngine, AccrualResult};
pub use amortization::{strategy_for, AmortizationStrategy, PeriodContext, PeriodSplit};
pub use balloon::{BalloonEngine, TopUpTerms};
pub use config::{
    AccountConfig, AccountId, AmortizationMethod, BalloonConfig, CapitalisationConfig,
    CapitalisationFrequency, DaysInYear, GlAccounts, OverpaymentConfig, OverpaymentPreference,
    PenaltyConfig, PrecisionConfig,
};
pub use decimal::{Money, Rate};
pub use derived::DerivedParameters;
pub use errors::{LoanError, Result};
pub use events::{HookOutput, WorkflowRequest};
pub use ledger::{BalanceAddress, LedgerAccount, LedgerSnapshot, Posting, PostingPlan};
pub use lifecycle::LifecycleEngine;
pub use payments::{IncomingPayment, PaymentProcessor};
pub use schedule::{EventName, Recurrence, ScheduledEvent};
pub use simulation::SimulatedAccount;

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
