use chrono::{Duration, Months, NaiveDate};
use tracing::{debug, warn};

use crate::calendar::BusinessCalendar;
use crate::decimal::{Money, Rate};
use crate::interest::compute_total_return;
use crate::loan::{Installment, LoanTerms};
use crate::types::Frequency;

/// installment schedule with its totals
#[derive(Debug, Clone, PartialEq)]
pub struct AmortizationSchedule {
    pub principal: Money,
    pub interest_rate: Rate,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub installments: Vec<Installment>,
    pub total_amount: Money,
    pub total_interest: Money,
}

impl AmortizationSchedule {
    /// generate schedule; invalid terms produce an empty schedule with zero totals
    pub fn generate(terms: &LoanTerms, calendar: Option<&BusinessCalendar>) -> Self {
        let installments = build_installments(terms, calendar);

        let total_amount: Money = installments.iter().map(|i| i.amount).sum();
        let total_interest = if installments.is_empty() {
            Money::ZERO
        } else {
            total_amount.saturating_sub(terms.principal)
        };

        Self {
            principal: terms.principal,
            interest_rate: terms.interest_rate,
            frequency: terms.frequency,
            start_date: terms.start_date,
            installments,
            total_amount,
            total_interest,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.installments.is_empty()
    }

    /// get installment by its 1-based number
    pub fn get_installment(&self, number: u32) -> Option<&Installment> {
        number
            .checked_sub(1)
            .and_then(|idx| self.installments.get(idx as usize))
    }
}

/// installment schedule stepping from `start_date` by `frequency`
///
/// the first installment falls one period after the start date; the rounding
/// remainder is carried by the last installment so the amounts sum exactly
pub fn generate_schedule(
    principal: Money,
    interest_rate: Rate,
    installment_count: u32,
    frequency: Frequency,
    start_date: NaiveDate,
) -> Vec<Installment> {
    let terms = LoanTerms {
        principal,
        interest_rate,
        installment_count,
        frequency,
        start_date,
    };
    build_installments(&terms, None)
}

/// same as [`generate_schedule`], rolling each due date to the next business day
pub fn generate_schedule_with_calendar(
    terms: &LoanTerms,
    calendar: &BusinessCalendar,
) -> Vec<Installment> {
    build_installments(terms, Some(calendar))
}

fn build_installments(terms: &LoanTerms, calendar: Option<&BusinessCalendar>) -> Vec<Installment> {
    let count = terms.installment_count;
    if count == 0 || !terms.principal.is_positive() || terms.interest_rate.is_negative() {
        debug!(
            principal = %terms.principal,
            rate = %terms.interest_rate,
            count,
            "no schedule for degenerate loan terms"
        );
        return Vec::new();
    }

    let total = compute_total_return(terms.principal, terms.interest_rate);
    if !total.is_positive() {
        warn!(principal = %terms.principal, "total repayable out of range");
        return Vec::new();
    }
    let Some(amounts) = split_evenly(total, count) else {
        warn!(total = %total, "total repayable does not fit in minor units");
        return Vec::new();
    };

    let mut installments = Vec::with_capacity(count as usize);
    let mut previous: Option<NaiveDate> = None;

    for (number, amount) in (1..=count).zip(amounts) {
        let Some(nominal) = due_date(terms.start_date, terms.frequency, number) else {
            warn!(number, start = %terms.start_date, "due date out of range");
            return Vec::new();
        };

        let due = match calendar {
            Some(cal) => {
                // never collide with the previous installment after rolling
                let candidate = match previous {
                    Some(prev) if nominal <= prev => prev + Duration::days(1),
                    _ => nominal,
                };
                cal.roll_forward(candidate)
            }
            None => nominal,
        };

        previous = Some(due);
        installments.push(Installment::new(number, due, amount));
    }

    installments
}

/// due date of installment `number` (1-based) for a frequency
///
/// monthly steps keep the start's day of month, clamped to shorter months
pub fn due_date(start: NaiveDate, frequency: Frequency, number: u32) -> Option<NaiveDate> {
    let days = |step: i64| start.checked_add_signed(Duration::days(step * number as i64));
    match frequency {
        Frequency::Daily => days(1),
        Frequency::Weekly => days(7),
        Frequency::Biweekly => days(15),
        Frequency::Monthly => start.checked_add_months(Months::new(number)),
    }
}

/// split `total` into `count` floor-equal parts in minor units, remainder on the last
fn split_evenly(total: Money, count: u32) -> Option<Vec<Money>> {
    let total_minor = total.to_minor()?;
    let n = count as i64;
    let base = total_minor / n;
    let remainder = total_minor - base * n;

    let mut amounts = vec![Money::from_minor(base); count as usize];
    if let Some(last) = amounts.last_mut() {
        *last = Money::from_minor(base + remainder);
    }
    Some(amounts)
}
