use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::{AccountConfig, AmortizationMethod, EventTime};

/// named events the engine declares to the host scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventName {
    AccrueInterest,
    RepaymentDaySchedule,
    CheckOverdue,
    CheckDelinquency,
    BalloonPaymentSchedule,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::AccrueInterest => "ACCRUE_INTEREST",
            EventName::RepaymentDaySchedule => "REPAYMENT_DAY_SCHEDULE",
            EventName::CheckOverdue => "CHECK_OVERDUE",
            EventName::CheckDelinquency => "CHECK_DELINQUENCY",
            EventName::BalloonPaymentSchedule => "BALLOON_PAYMENT_SCHEDULE",
        }
    }
}

/// recurrence of a declared event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recurrence {
    Daily,
    MonthlyOnDay(u32),
    Once(NaiveDate),
}

/// one entry of the schedule declared to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub name: EventName,
    pub time: EventTime,
    pub recurrence: Recurrence,
}

/// add calendar months, preserving the day of month (safe for days 1..=28)
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total = date.year() * 12 + date.month0() as i32 + months as i32;
    let year = total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    NaiveDate::from_ymd_opt(year, month, date.day())
        .unwrap_or_else(|| NaiveDate::from_ymd_opt(year, month, 28).unwrap())
}

/// Next occurrence of `repayment_day` at or after `from`: if the day has
/// already passed this month it falls in the next month, otherwise in this
/// one. Used both at origination and after a repayment-day parameter change.
pub fn next_repayment_date(repayment_day: u32, from: NaiveDate) -> NaiveDate {
    if from.day() <= repayment_day {
        NaiveDate::from_ymd_opt(from.year(), from.month(), repayment_day).unwrap()
    } else {
        let rolled = add_months(from, 1);
        NaiveDate::from_ymd_opt(rolled.year(), rolled.month(), repayment_day).unwrap()
    }
}

/// date of the `n`th instalment (1-based) after the loan start date
pub fn nth_repayment_date(config: &AccountConfig, n: u32) -> NaiveDate {
    let day_after_start = config.loan_start_date + Duration::days(1);
    let first = next_repayment_date(config.repayment_day, day_after_start);
    add_months(first, n - 1)
}

/// final scheduled instalment date
pub fn final_repayment_date(config: &AccountConfig) -> NaiveDate {
    nth_repayment_date(config, config.total_term)
}

/// balloon date: final instalment shifted by the configured days delta
pub fn balloon_date(config: &AccountConfig) -> NaiveDate {
    final_repayment_date(config) + Duration::days(config.balloon.balloon_payment_days_delta as i64)
}

/// completed repayment periods as of a date
pub fn elapsed_periods(config: &AccountConfig, as_of: NaiveDate) -> u32 {
    let mut elapsed = 0;
    while elapsed < config.total_term && nth_repayment_date(config, elapsed + 1) <= as_of {
        elapsed += 1;
    }
    elapsed
}

fn has_balloon_schedule(method: AmortizationMethod) -> bool {
    matches!(
        method,
        AmortizationMethod::InterestOnly
            | AmortizationMethod::NoRepayment
            | AmortizationMethod::MinimumRepaymentWithBalloon
    )
}

/// Full schedule declared to the host. Re-invoked after a repayment-day
/// change so dependent check-overdue/check-delinquency/balloon occurrences
/// track the new repayment dates.
pub fn declared_schedule(config: &AccountConfig, as_of: NaiveDate) -> Vec<ScheduledEvent> {
    let times = &config.schedule_times;
    let mut events = vec![ScheduledEvent {
        name: EventName::AccrueInterest,
        time: times.accrue_interest,
        recurrence: Recurrence::Daily,
    }];

    if config.amortisation_method != AmortizationMethod::NoRepayment {
        events.push(ScheduledEvent {
            name: EventName::RepaymentDaySchedule,
            time: times.repayment_day,
            recurrence: Recurrence::MonthlyOnDay(config.repayment_day),
        });

        let next_due = next_repayment_date(config.repayment_day, as_of);
        let overdue = next_due + Duration::days(config.penalty.repayment_period_days as i64);
        events.push(ScheduledEvent {
            name: EventName::CheckOverdue,
            time: times.check_overdue,
            recurrence: Recurrence::Once(overdue),
        });
        events.push(ScheduledEvent {
            name: EventName::CheckDelinquency,
            time: times.check_delinquency,
            recurrence: Recurrence::Once(
                overdue + Duration::days(config.penalty.grace_period_days as i64),
            ),
        });
    }

    if has_balloon_schedule(config.amortisation_method) {
        events.push(ScheduledEvent {
            name: EventName::BalloonPaymentSchedule,
            time: times.balloon_payment,
            recurrence: Recurrence::Once(balloon_date(config)),
        });
    }

    events
}
