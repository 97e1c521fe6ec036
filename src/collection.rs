use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::types::{ClientId, CollectionLogType, Location, LoanId, LogId, Role, UserId};

/// a field-recorded event: payment, missed payment, or loan opening
///
/// logs are append-only; the only mutation is the soft-delete marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionLog {
    pub id: LogId,
    pub loan_id: LoanId,
    pub client_id: ClientId,
    /// local wall-clock time of the visit
    pub date: NaiveDateTime,
    pub log_type: CollectionLogType,
    /// present only for payments
    pub amount: Option<Money>,
    pub is_virtual: bool,
    pub is_renewal: bool,
    pub location: Option<Location>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub recorded_by: Option<UserId>,
    pub notes: Option<String>,
}

impl CollectionLog {
    fn new(
        loan_id: LoanId,
        client_id: ClientId,
        date: NaiveDateTime,
        log_type: CollectionLogType,
        amount: Option<Money>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            loan_id,
            client_id,
            date,
            log_type,
            amount,
            is_virtual: false,
            is_renewal: false,
            location: None,
            deleted_at: None,
            recorded_by: None,
            notes: None,
        }
    }

    /// cash payment received on a visit
    pub fn payment(loan_id: LoanId, client_id: ClientId, date: NaiveDateTime, amount: Money) -> Self {
        Self::new(loan_id, client_id, date, CollectionLogType::Payment, Some(amount))
    }

    /// visit where the client did not pay
    pub fn no_payment(loan_id: LoanId, client_id: ClientId, date: NaiveDateTime) -> Self {
        Self::new(loan_id, client_id, date, CollectionLogType::NoPago, None)
    }

    /// disbursement marker written when a loan is opened
    pub fn opening(loan_id: LoanId, client_id: ClientId, date: NaiveDateTime) -> Self {
        Self::new(loan_id, client_id, date, CollectionLogType::Opening, None)
    }

    pub fn recorded_by(mut self, user_id: UserId) -> Self {
        self.recorded_by = Some(user_id);
        self
    }

    pub fn virtual_transfer(mut self) -> Self {
        self.is_virtual = true;
        self
    }

    pub fn renewal(mut self) -> Self {
        self.is_renewal = true;
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// soft-delete copy of this log
    pub fn deleted(mut self, at: DateTime<Utc>) -> Self {
        self.deleted_at = Some(at);
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_payment(&self) -> bool {
        self.log_type == CollectionLogType::Payment
    }

    /// payments and missed-payment visits; openings are bookkeeping only
    pub fn is_visit(&self) -> bool {
        self.log_type != CollectionLogType::Opening
    }

    /// money this log contributes to collections, zero unless a live payment
    pub fn collected_amount(&self) -> Money {
        if self.is_deleted() || !self.is_payment() {
            return Money::ZERO;
        }
        self.amount.unwrap_or(Money::ZERO).max(Money::ZERO)
    }

    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }
}

/// borrower registry entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub document_id: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub location: Option<Location>,
    pub is_active: bool,
}

impl Client {
    pub fn new(id: ClientId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            document_id: None,
            phone: None,
            address: None,
            location: None,
            is_active: true,
        }
    }
}

/// application user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    /// manager supervising this user
    pub managed_by: Option<UserId>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            managed_by: None,
        }
    }

    pub fn managed_by(mut self, manager: UserId) -> Self {
        self.managed_by = Some(manager);
        self
    }
}
