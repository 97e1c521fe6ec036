use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::collection::CollectionLog;
use crate::config::Settings;
use crate::decimal::Money;
use crate::delinquency::days_overdue;
use crate::loan::{Installment, Loan};
use crate::types::{LoanStatus, LogId};

/// portion of one payment log applied to one installment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub log_id: LogId,
    pub installment_number: u32,
    pub amount: Money,
    pub date: NaiveDate,
    pub is_virtual: bool,
    pub is_renewal: bool,
}

/// installments with paid amounts rebuilt from payment logs
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentApplication {
    pub installments: Vec<Installment>,
    pub allocations: Vec<Allocation>,
    /// money received beyond what the schedule owes
    pub unapplied: Money,
}

/// apply the loan's live payment logs oldest-debt-first
///
/// stored paid amounts are discarded and rebuilt, so the result depends only on the
/// schedule and the logs. `cutoff` limits the logs to those dated on or before it.
pub fn apply_payments(loan: &Loan, logs: &[CollectionLog], cutoff: Option<NaiveDate>) -> PaymentApplication {
    let mut installments: Vec<Installment> = loan
        .installments
        .iter()
        .cloned()
        .map(|mut inst| {
            inst.paid_amount = Money::ZERO;
            inst
        })
        .collect();

    // ascending due date is a correctness invariant: funds never skip older debt
    let mut order: Vec<usize> = (0..installments.len()).collect();
    order.sort_by_key(|&idx| (installments[idx].due_date, installments[idx].number));

    let mut payments: Vec<&CollectionLog> = logs
        .iter()
        .filter(|log| log.loan_id == loan.id && !log.is_deleted() && log.is_payment())
        .filter(|log| cutoff.map_or(true, |c| log.day() <= c))
        .collect();
    payments.sort_by_key(|log| (log.date, log.id));

    let mut allocations = Vec::new();
    let mut unapplied = Money::ZERO;

    for log in payments {
        let mut available = log.collected_amount();

        for &idx in &order {
            if !available.is_positive() {
                break;
            }
            let inst = &mut installments[idx];
            let owed = inst.remaining();
            if !owed.is_positive() {
                continue;
            }

            let applied = available.min(owed);
            inst.paid_amount += applied;
            available -= applied;

            allocations.push(Allocation {
                log_id: log.id,
                installment_number: inst.number,
                amount: applied,
                date: log.day(),
                is_virtual: log.is_virtual,
                is_renewal: log.is_renewal,
            });
        }

        unapplied += available;
    }

    PaymentApplication {
        installments,
        allocations,
        unapplied,
    }
}

/// loan with installment states recomputed from its logs
#[derive(Debug, Clone, PartialEq)]
pub struct LoanView {
    pub loan: Loan,
    pub allocations: Vec<Allocation>,
    pub unapplied: Money,
    pub total_paid: Money,
    pub remaining_balance: Money,
    pub paid_installments: u32,
    pub days_overdue: u32,
    pub as_of: NaiveDate,
}

/// recompute paid amounts, statuses and arrears of a loan as of a date
///
/// only logs dated on or before `as_of` are applied. pure: the input loan is not
/// touched and repeated calls give identical views
pub fn derive_installment_states(
    loan: &Loan,
    logs: &[CollectionLog],
    as_of: NaiveDate,
    settings: &Settings,
) -> LoanView {
    let application = apply_payments(loan, logs, Some(as_of));

    let mut derived = loan.clone();
    derived.installments = application.installments;
    for inst in &mut derived.installments {
        inst.status = inst.status_as_of(as_of);
    }

    if derived.status != LoanStatus::Cancelled {
        let settled = !derived.installments.is_empty()
            && derived.installments.iter().all(|i| i.is_paid());
        derived.status = if settled {
            LoanStatus::Paid
        } else {
            LoanStatus::Active
        };
    }

    let days_overdue = days_overdue(&derived, settings, as_of);

    LoanView {
        total_paid: derived.total_paid(),
        remaining_balance: derived.remaining_balance(),
        paid_installments: derived.paid_installments(),
        allocations: application.allocations,
        unapplied: application.unapplied,
        days_overdue,
        as_of,
        loan: derived,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::types::{Frequency, PaymentStatus};
    use chrono::{NaiveDateTime, Utc};
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(9, 0, 0).unwrap()
    }

    fn loan(count: u32, frequency: Frequency) -> Loan {
        Loan::builder()
            .client(Uuid::new_v4())
            .collector(Uuid::new_v4())
            .principal(Money::from_major(1_000))
            .rate(Rate::ZERO)
            .installments(count)
            .frequency(frequency)
            .start_date(date(2024, 1, 1))
            .build()
            .unwrap()
    }

    fn pay(loan: &Loan, day: NaiveDateTime, amount: i64) -> CollectionLog {
        CollectionLog::payment(loan.id, loan.client_id, day, Money::from_major(amount))
    }

    #[test]
    fn test_funds_never_skip_older_debt() {
        // two installments of 500 due Jan 2 and Jan 3
        let loan = loan(2, Frequency::Daily);
        let logs = vec![pay(&loan, at(2024, 1, 2), 500)];

        let view = derive_installment_states(&loan, &logs, date(2024, 1, 2), &Settings::default());

        assert_eq!(view.loan.installments[0].status, PaymentStatus::Paid);
        assert_eq!(view.loan.installments[1].paid_amount, Money::ZERO);
        assert_eq!(view.loan.installments[1].status, PaymentStatus::Pending);
        assert_eq!(view.loan.status, LoanStatus::Active);
    }

    #[test]
    fn test_partial_payment_spills_across_installments() {
        let loan = loan(4, Frequency::Weekly); // 4 x 250
        let logs = vec![pay(&loan, at(2024, 1, 8), 300), pay(&loan, at(2024, 1, 15), 100)];

        let view = derive_installment_states(&loan, &logs, date(2024, 1, 20), &Settings::default());
        let inst = &view.loan.installments;

        assert_eq!(inst[0].paid_amount, Money::from_major(250));
        assert_eq!(inst[1].paid_amount, Money::from_major(150));
        assert_eq!(inst[1].status, PaymentStatus::Late);
        assert_eq!(inst[2].status, PaymentStatus::Pending);
        assert_eq!(view.total_paid, Money::from_major(400));
        assert_eq!(view.remaining_balance, Money::from_major(600));
        assert_eq!(view.paid_installments, 1);
        assert_eq!(view.allocations.len(), 3);
        assert_eq!(view.allocations[1].installment_number, 2);
        assert_eq!(view.allocations[1].amount, Money::from_major(50));
    }

    #[test]
    fn test_overpayment_is_reported_unapplied() {
        let loan = loan(2, Frequency::Daily);
        let logs = vec![pay(&loan, at(2024, 1, 2), 1_200)];

        let view = derive_installment_states(&loan, &logs, date(2024, 1, 2), &Settings::default());

        assert_eq!(view.loan.status, LoanStatus::Paid);
        assert_eq!(view.unapplied, Money::from_major(200));
        assert_eq!(view.remaining_balance, Money::ZERO);
        assert_eq!(view.days_overdue, 0);
    }

    #[test]
    fn test_ignores_deleted_foreign_and_non_payment_logs() {
        let loan = loan(2, Frequency::Daily);
        let other = Uuid::new_v4();
        let logs = vec![
            pay(&loan, at(2024, 1, 2), 500).deleted(Utc::now()),
            CollectionLog::payment(other, loan.client_id, at(2024, 1, 2), Money::from_major(500)),
            CollectionLog::no_payment(loan.id, loan.client_id, at(2024, 1, 2)),
            CollectionLog::opening(loan.id, loan.client_id, at(2024, 1, 1)),
        ];

        let view = derive_installment_states(&loan, &logs, date(2024, 1, 5), &Settings::default());

        assert_eq!(view.total_paid, Money::ZERO);
        assert!(view.allocations.is_empty());
        assert_eq!(view.days_overdue, 3);
    }

    #[test]
    fn test_stored_paid_amounts_are_not_trusted() {
        let mut loan = loan(2, Frequency::Daily);
        loan.installments[0].paid_amount = Money::from_major(500);
        loan.installments[0].status = PaymentStatus::Paid;

        let view = derive_installment_states(&loan, &[], date(2024, 1, 3), &Settings::default());
        assert_eq!(view.loan.installments[0].status, PaymentStatus::Late);
    }

    #[test]
    fn test_derivation_is_idempotent() {
        let loan = loan(5, Frequency::Daily);
        let logs = vec![pay(&loan, at(2024, 1, 3), 350), pay(&loan, at(2024, 1, 2), 120)];
        let settings = Settings::default();

        let first = derive_installment_states(&loan, &logs, date(2024, 1, 6), &settings);
        let second = derive_installment_states(&loan, &logs, date(2024, 1, 6), &settings);
        assert_eq!(first, second);

        // deriving from an already derived loan changes nothing either
        let again = derive_installment_states(&first.loan, &logs, date(2024, 1, 6), &settings);
        assert_eq!(again.loan, first.loan);
    }

    #[test]
    fn test_cancelled_status_is_preserved() {
        let mut loan = loan(2, Frequency::Daily);
        loan.status = LoanStatus::Cancelled;
        let logs = vec![pay(&loan, at(2024, 1, 2), 1_000)];

        let view = derive_installment_states(&loan, &logs, date(2024, 1, 3), &Settings::default());
        assert_eq!(view.loan.status, LoanStatus::Cancelled);
    }

    #[test]
    fn test_later_payments_do_not_clear_past_arrears() {
        let loan = loan(2, Frequency::Daily);
        let logs = vec![pay(&loan, at(2024, 1, 10), 1_000)];

        let before = derive_installment_states(&loan, &logs, date(2024, 1, 5), &Settings::default());
        assert_eq!(before.total_paid, Money::ZERO);
        assert_eq!(before.loan.status, LoanStatus::Active);
        assert_eq!(before.days_overdue, 3);

        let after = derive_installment_states(&loan, &logs, date(2024, 1, 10), &Settings::default());
        assert_eq!(after.loan.status, LoanStatus::Paid);
        assert_eq!(after.days_overdue, 0);
    }

    #[test]
    fn test_cutoff_limits_logs() {
        let loan = loan(2, Frequency::Daily);
        let logs = vec![pay(&loan, at(2024, 1, 2), 500), pay(&loan, at(2024, 2, 1), 500)];

        let january = apply_payments(&loan, &logs, Some(date(2024, 1, 31)));
        assert_eq!(january.allocations.len(), 1);
        assert_eq!(january.installments[1].paid_amount, Money::ZERO);
    }
}
