use std::collections::BTreeSet;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::calendar::{local_today, BusinessCalendar};
use crate::config::Settings;
use crate::decimal::{Money, Rate};
use crate::errors::{CollectionError, Result};
use crate::payments::AmortizationSchedule;
use crate::types::{ClientId, Frequency, LoanId, LoanStatus, PaymentStatus, UserId};

/// one scheduled repayment unit of a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    /// 1-based, unique within the loan
    pub number: u32,
    pub due_date: NaiveDate,
    pub amount: Money,
    pub paid_amount: Money,
    pub status: PaymentStatus,
}

impl Installment {
    pub fn new(number: u32, due_date: NaiveDate, amount: Money) -> Self {
        Self {
            number,
            due_date,
            amount,
            paid_amount: Money::ZERO,
            status: PaymentStatus::Pending,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.paid_amount >= self.amount
    }

    /// amount still owed on this installment
    pub fn remaining(&self) -> Money {
        self.amount.saturating_sub(self.paid_amount)
    }

    /// status as of a date: PAID, else LATE once the due date has passed, else PENDING
    pub fn status_as_of(&self, as_of: NaiveDate) -> PaymentStatus {
        if self.is_paid() {
            PaymentStatus::Paid
        } else if self.due_date < as_of {
            PaymentStatus::Late
        } else {
            PaymentStatus::Pending
        }
    }
}

/// terms a schedule is generated from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    pub interest_rate: Rate,
    pub installment_count: u32,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
}

/// a microloan and its installment schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub client_id: ClientId,
    /// collector assigned to the route this loan is on
    pub collector_id: Option<UserId>,
    pub principal: Money,
    pub interest_rate: Rate,
    pub installment_count: u32,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub total_amount: Money,
    pub status: LoanStatus,
    pub installments: Vec<Installment>,
    pub custom_holidays: BTreeSet<NaiveDate>,
    pub is_renewal: bool,
}

impl Loan {
    /// create an active loan with a freshly generated schedule
    pub fn originate(
        id: LoanId,
        client_id: ClientId,
        collector_id: Option<UserId>,
        terms: LoanTerms,
        calendar: Option<&BusinessCalendar>,
    ) -> Self {
        let schedule = AmortizationSchedule::generate(&terms, calendar);

        Self {
            id,
            client_id,
            collector_id,
            principal: terms.principal,
            interest_rate: terms.interest_rate,
            installment_count: schedule.installments.len() as u32,
            frequency: terms.frequency,
            start_date: terms.start_date,
            total_amount: schedule.total_amount,
            status: LoanStatus::Active,
            installments: schedule.installments,
            custom_holidays: BTreeSet::new(),
            is_renewal: false,
        }
    }

    /// builder for creating loans
    pub fn builder() -> LoanBuilder {
        LoanBuilder::new()
    }

    pub fn is_active(&self) -> bool {
        self.status == LoanStatus::Active
    }

    /// sum of paid amounts across installments
    pub fn total_paid(&self) -> Money {
        self.installments.iter().map(|i| i.paid_amount).sum()
    }

    /// sum of what is still owed across installments
    pub fn remaining_balance(&self) -> Money {
        self.installments.iter().map(|i| i.remaining()).sum()
    }

    pub fn paid_installments(&self) -> u32 {
        self.installments.iter().filter(|i| i.is_paid()).count() as u32
    }

    /// nominal amount of a regular installment
    pub fn installment_value(&self) -> Money {
        self.installments
            .first()
            .map(|i| i.amount)
            .unwrap_or(Money::ZERO)
    }

    /// due date of the final installment
    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.installments.iter().map(|i| i.due_date).max()
    }

    /// earliest installment (by due date) that is not fully paid
    pub fn earliest_unpaid(&self) -> Option<&Installment> {
        self.installments
            .iter()
            .filter(|i| !i.is_paid())
            .min_by_key(|i| (i.due_date, i.number))
    }

    /// business calendar for this loan: settings country and holidays plus the loan's own
    pub fn calendar(&self, settings: &Settings) -> BusinessCalendar {
        settings
            .calendar()
            .with_custom_holidays(self.custom_holidays.iter().copied())
    }
}

/// builder for loans
#[derive(Debug, Default)]
pub struct LoanBuilder {
    id: Option<LoanId>,
    client_id: Option<ClientId>,
    collector_id: Option<UserId>,
    principal: Option<Money>,
    rate: Option<Rate>,
    installment_count: Option<u32>,
    frequency: Option<Frequency>,
    start_date: Option<NaiveDate>,
    custom_holidays: BTreeSet<NaiveDate>,
    is_renewal: bool,
    settings: Option<Settings>,
}

impl LoanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: LoanId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn client(mut self, client_id: ClientId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    pub fn collector(mut self, collector_id: UserId) -> Self {
        self.collector_id = Some(collector_id);
        self
    }

    pub fn principal(mut self, principal: Money) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn rate(mut self, rate: Rate) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn installments(mut self, count: u32) -> Self {
        self.installment_count = Some(count);
        self
    }

    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    pub fn custom_holidays<I>(mut self, dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        self.custom_holidays.extend(dates);
        self
    }

    pub fn renewal(mut self, is_renewal: bool) -> Self {
        self.is_renewal = is_renewal;
        self
    }

    /// settings decide the country calendar and whether due dates skip non-business days
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// build with system time when no start date was given
    pub fn build(self) -> Result<Loan> {
        let time = SafeTimeProvider::new(hourglass_rs::TimeSource::System);
        self.build_with_time(&time)
    }

    /// build with explicit time provider; the start date defaults to the local today
    pub fn build_with_time(self, time_provider: &SafeTimeProvider) -> Result<Loan> {
        let client_id = self.client_id.ok_or(CollectionError::InvalidConfiguration {
            message: "client is required".to_string(),
        })?;
        let principal = self.principal.ok_or(CollectionError::InvalidConfiguration {
            message: "principal is required".to_string(),
        })?;
        if !principal.is_positive() {
            return Err(CollectionError::InvalidAmount { amount: principal });
        }
        let installment_count = match self.installment_count {
            Some(n) if n > 0 => n,
            _ => {
                return Err(CollectionError::InvalidConfiguration {
                    message: "installment count must be positive".to_string(),
                })
            }
        };

        let settings = self.settings.unwrap_or_default();
        let start_date = self
            .start_date
            .unwrap_or_else(|| local_today(time_provider, settings.country));
        let terms = LoanTerms {
            principal,
            interest_rate: self.rate.unwrap_or(Rate::ZERO),
            installment_count,
            frequency: self.frequency.unwrap_or(Frequency::Daily),
            start_date,
        };

        let calendar = settings
            .calendar()
            .with_custom_holidays(self.custom_holidays.iter().copied());
        let calendar = settings.roll_due_dates.then_some(&calendar);

        let mut loan = Loan::originate(
            self.id.unwrap_or_else(Uuid::new_v4),
            client_id,
            self.collector_id,
            terms,
            calendar,
        );
        loan.custom_holidays = self.custom_holidays;
        loan.is_renewal = self.is_renewal;
        Ok(loan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_installment_status_as_of() {
        let mut inst = Installment::new(1, date(2024, 3, 10), Money::from_major(100));
        assert_eq!(inst.status_as_of(date(2024, 3, 10)), PaymentStatus::Pending);
        assert_eq!(inst.status_as_of(date(2024, 3, 11)), PaymentStatus::Late);

        inst.paid_amount = Money::from_major(100);
        assert_eq!(inst.status_as_of(date(2024, 3, 11)), PaymentStatus::Paid);
    }

    #[test]
    fn test_builder_originates_schedule() {
        let loan = Loan::builder()
            .client(Uuid::new_v4())
            .collector(Uuid::new_v4())
            .principal(Money::from_major(500_000))
            .rate(Rate::from_percentage(20))
            .installments(24)
            .frequency(Frequency::Daily)
            .start_date(date(2024, 1, 1))
            .build()
            .unwrap();

        assert_eq!(loan.status, LoanStatus::Active);
        assert_eq!(loan.total_amount, Money::from_major(600_000));
        assert_eq!(loan.installments.len(), 24);
        assert_eq!(loan.installment_value(), Money::from_major(25_000));
        assert_eq!(loan.remaining_balance(), Money::from_major(600_000));
        assert_eq!(loan.expiry_date(), Some(date(2024, 1, 25)));
    }

    #[test]
    fn test_builder_defaults_start_to_local_today() {
        let time = SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 5, 2, 2, 0, 0).unwrap(),
        ));
        let loan = Loan::builder()
            .client(Uuid::new_v4())
            .principal(Money::from_major(1_000))
            .installments(4)
            .frequency(Frequency::Weekly)
            .build_with_time(&time)
            .unwrap();

        // 02:00 UTC is still May 1st in Colombia
        assert_eq!(loan.start_date, date(2024, 5, 1));
        assert_eq!(loan.installments[0].due_date, date(2024, 5, 8));
    }

    #[test]
    fn test_builder_rejects_bad_terms() {
        let missing_client = Loan::builder()
            .principal(Money::from_major(100))
            .installments(2)
            .build();
        assert!(matches!(missing_client, Err(CollectionError::InvalidConfiguration { .. })));

        let zero_principal = Loan::builder()
            .client(Uuid::new_v4())
            .principal(Money::ZERO)
            .installments(2)
            .build();
        assert!(matches!(zero_principal, Err(CollectionError::InvalidAmount { .. })));

        let zero_count = Loan::builder()
            .client(Uuid::new_v4())
            .principal(Money::from_major(100))
            .installments(0)
            .build();
        assert!(zero_count.is_err());
    }

    #[test]
    fn test_field_route_settings_roll_due_dates() {
        let loan = Loan::builder()
            .client(Uuid::new_v4())
            .principal(Money::from_major(200))
            .installments(2)
            .start_date(date(2024, 6, 1))
            .settings(Settings::field_route(crate::calendar::CountryCode::CO))
            .build()
            .unwrap();

        // the 2nd is a Sunday; the second installment is pushed past the rolled first
        assert_eq!(loan.installments[0].due_date, date(2024, 6, 3));
        assert_eq!(loan.installments[1].due_date, date(2024, 6, 4));
    }

    #[test]
    fn test_earliest_unpaid_uses_due_date() {
        let mut loan = Loan::builder()
            .client(Uuid::new_v4())
            .principal(Money::from_major(300))
            .installments(3)
            .start_date(date(2024, 1, 1))
            .build()
            .unwrap();
        loan.installments[0].paid_amount = loan.installments[0].amount;

        let unpaid = loan.earliest_unpaid().unwrap();
        assert_eq!(unpaid.number, 2);
        assert_eq!(loan.paid_installments(), 1);
    }
}
