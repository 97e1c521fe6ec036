use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::{OverdueCounting, Settings};
use crate::loan::Loan;

/// arrears classification for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DelinquencyBucket {
    /// nothing past due
    Current,
    /// past due but still inside the grace period
    InGrace { days_late: u32 },
    /// past due beyond the grace period
    Overdue { days: u32 },
}

/// days the earliest unpaid installment is past due, before grace
///
/// uses the installment states already on the loan; pass a derived loan
pub fn raw_days_late(loan: &Loan, settings: &Settings, as_of: NaiveDate) -> u32 {
    let Some(earliest) = loan.earliest_unpaid() else {
        return 0;
    };
    if earliest.due_date >= as_of {
        return 0;
    }

    match settings.overdue_counting {
        OverdueCounting::CalendarDays => {
            let days = (as_of - earliest.due_date).num_days();
            u32::try_from(days.max(0)).unwrap_or(u32::MAX)
        }
        OverdueCounting::BusinessDays => loan
            .calendar(settings)
            .business_days_between(earliest.due_date, as_of),
    }
}

/// whole days overdue after the grace period, zero when nothing is unpaid
pub fn days_overdue(loan: &Loan, settings: &Settings, as_of: NaiveDate) -> u32 {
    raw_days_late(loan, settings, as_of).saturating_sub(settings.grace_period_days)
}

pub fn classify(loan: &Loan, settings: &Settings, as_of: NaiveDate) -> DelinquencyBucket {
    let raw = raw_days_late(loan, settings, as_of);
    match raw.saturating_sub(settings.grace_period_days) {
        _ if raw == 0 => DelinquencyBucket::Current,
        0 => DelinquencyBucket::InGrace { days_late: raw },
        days => DelinquencyBucket::Overdue { days },
    }
}
