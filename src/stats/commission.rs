use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collection::CollectionLog;
use crate::config::Settings;
use crate::decimal::{percent_of, Money};
use crate::stats::CollectionBreakdown;
use crate::types::{CollectionLogType, UserId};

/// working days per collection week, Monday to Saturday
const WORK_DAYS: i64 = 6;

/// payout rule: when the average delinquency is at most `max_mora` percent, the collector
/// receives `payout_percent` percent of the base commission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionBracket {
    #[serde(alias = "maxMora")]
    pub max_mora: Decimal,
    #[serde(alias = "payoutPercent")]
    pub payout_percent: Decimal,
}

impl CommissionBracket {
    pub fn new(max_mora: Decimal, payout_percent: Decimal) -> Self {
        Self {
            max_mora,
            payout_percent,
        }
    }
}

/// payout factor (0..=1) for an average delinquency rate in percent
///
/// first bracket by ascending `max_mora` that covers the rate; past the last bracket the
/// last one applies; no brackets pays nothing
pub fn payout_factor(brackets: &[CommissionBracket], delinquency_rate: Decimal) -> Decimal {
    let mut sorted = brackets.to_vec();
    sorted.sort_by(|a, b| a.max_mora.cmp(&b.max_mora));

    sorted
        .iter()
        .find(|b| delinquency_rate <= b.max_mora)
        .or_else(|| sorted.last())
        .map(|b| b.payout_percent / Decimal::ONE_HUNDRED)
        .unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyDelinquency {
    pub date: NaiveDate,
    pub payments: u32,
    pub missed: u32,
    /// missed visits over all visits, in percent
    pub rate: Decimal,
}

impl DailyDelinquency {
    pub fn visits(&self) -> u32 {
        self.payments + self.missed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyPerformance {
    pub week_start: NaiveDate,
    /// elapsed working days of the week, up to and including the as-of date
    pub days: Vec<DailyDelinquency>,
    /// mean rate over days with at least one visit
    pub average_delinquency: Decimal,
    pub performance_factor: Decimal,
    pub collected_today: Money,
}

fn recorded_by(log: &CollectionLog, collector: Option<UserId>) -> bool {
    collector.map_or(true, |id| log.recorded_by == Some(id))
}

/// delinquency of the week containing `as_of`, for one collector or for everyone
pub fn weekly_performance(
    logs: &[CollectionLog],
    collector: Option<UserId>,
    as_of: NaiveDate,
    brackets: &[CommissionBracket],
) -> WeeklyPerformance {
    let week_start = as_of - Duration::days(as_of.weekday().num_days_from_monday() as i64);

    let relevant: Vec<&CollectionLog> = logs
        .iter()
        .filter(|log| !log.is_deleted() && log.is_visit() && recorded_by(log, collector))
        .collect();

    let mut days = Vec::new();
    let mut rate_sum = Decimal::ZERO;
    let mut active_days = 0u32;

    for offset in 0..WORK_DAYS {
        let date = week_start + Duration::days(offset);
        if date > as_of {
            break;
        }

        let on_day = relevant.iter().filter(|log| log.day() == date);
        let (mut payments, mut missed) = (0u32, 0u32);
        for log in on_day {
            match log.log_type {
                CollectionLogType::Payment => payments += 1,
                CollectionLogType::NoPago => missed += 1,
                CollectionLogType::Opening => {}
            }
        }

        let rate = percent_of(Decimal::from(missed), Decimal::from(payments + missed));
        if payments + missed > 0 {
            rate_sum += rate;
            active_days += 1;
        }
        days.push(DailyDelinquency {
            date,
            payments,
            missed,
            rate,
        });
    }

    let average_delinquency = if active_days > 0 {
        rate_sum / Decimal::from(active_days)
    } else {
        Decimal::ZERO
    };

    let collected_today: Money = relevant
        .iter()
        .filter(|log| log.day() == as_of)
        .map(|log| log.collected_amount())
        .sum();

    WeeklyPerformance {
        week_start,
        days,
        average_delinquency,
        performance_factor: payout_factor(brackets, average_delinquency),
        collected_today,
    }
}

/// which logs a commission report lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTypeFilter {
    #[default]
    All,
    /// payments that are neither virtual nor renewals
    Cash,
    Virtual,
    Renewal,
    NoPay,
}

impl PaymentTypeFilter {
    pub fn matches(&self, log: &CollectionLog) -> bool {
        match self {
            PaymentTypeFilter::All => true,
            PaymentTypeFilter::Cash => log.is_payment() && !log.is_virtual && !log.is_renewal,
            PaymentTypeFilter::Virtual => log.is_virtual,
            PaymentTypeFilter::Renewal => log.is_renewal,
            PaymentTypeFilter::NoPay => log.log_type == CollectionLogType::NoPago,
        }
    }
}

/// date range (inclusive) and recorder selection for commission reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFilter {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub collector: Option<UserId>,
    pub payment_type: PaymentTypeFilter,
}

impl LogFilter {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from,
            to,
            collector: None,
            payment_type: PaymentTypeFilter::All,
        }
    }

    pub fn collector(mut self, collector: UserId) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn payment_type(mut self, payment_type: PaymentTypeFilter) -> Self {
        self.payment_type = payment_type;
        self
    }
}

/// logs of a range, newest first
///
/// openings, deleted logs and zero-amount entries that are not a missed visit or a renewal
/// are left out
pub fn filter_logs<'a>(logs: &'a [CollectionLog], filter: &LogFilter) -> Vec<&'a CollectionLog> {
    let mut selected: Vec<&CollectionLog> = logs
        .iter()
        .filter(|log| log.is_visit() && !log.is_deleted())
        .filter(|log| {
            let has_amount = log.amount.map_or(false, |a| a.is_positive());
            let interaction = log.log_type == CollectionLogType::NoPago || log.is_renewal;
            has_amount || interaction
        })
        .filter(|log| (filter.from..=filter.to).contains(&log.day()))
        .filter(|log| recorded_by(log, filter.collector))
        .filter(|log| filter.payment_type.matches(log))
        .collect();

    selected.sort_by(|a, b| b.date.cmp(&a.date));
    selected
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commission {
    pub breakdown: CollectionBreakdown,
    pub collected: Money,
    pub commission_percentage: Decimal,
    pub base_commission: Money,
    pub performance_factor: Decimal,
    pub final_commission: Money,
}

/// commission on the money collected in a range, scaled by the week's delinquency
pub fn commission(
    logs: &[CollectionLog],
    filter: &LogFilter,
    settings: &Settings,
    as_of: NaiveDate,
) -> Commission {
    let selected = filter_logs(logs, filter);
    let breakdown = CollectionBreakdown::from_logs(selected.iter().copied());
    let collected = breakdown.total();

    let performance = weekly_performance(logs, filter.collector, as_of, &settings.commission_brackets);
    let base_commission = collected.percentage(settings.commission_percentage);
    let final_commission = (base_commission * performance.performance_factor).floor_minor();

    debug!(
        collector = ?filter.collector,
        collected = %collected,
        average_delinquency = %performance.average_delinquency,
        final_commission = %final_commission,
        "computed commission"
    );

    Commission {
        breakdown,
        collected,
        commission_percentage: settings.commission_percentage,
        base_commission,
        performance_factor: performance.performance_factor,
        final_commission,
    }
}
