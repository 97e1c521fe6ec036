use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// unique identifier for a loan
pub type LoanId = Uuid;

/// unique identifier for a client
pub type ClientId = Uuid;

/// unique identifier for an application user (admin, manager, collector)
pub type UserId = Uuid;

/// unique identifier for a collection log
pub type LogId = Uuid;

/// repayment cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    /// every day
    Daily,
    /// every 7 days
    Weekly,
    /// every 15 days
    Biweekly,
    /// same day of every calendar month
    Monthly,
}

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// being collected
    Active,
    /// every installment satisfied
    Paid,
    /// voided, never collected
    Cancelled,
}

/// installment payment status
///
/// derived from paid amount and due date, never trusted from storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Late,
    Paid,
}

impl PaymentStatus {
    /// terminal state, nothing leaves it
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }

    /// legal transitions: PENDING -> PAID | LATE, LATE -> PAID
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        match (self, next) {
            (a, b) if *a == b => true,
            (PaymentStatus::Pending, PaymentStatus::Late) => true,
            (PaymentStatus::Pending, PaymentStatus::Paid) => true,
            (PaymentStatus::Late, PaymentStatus::Paid) => true,
            _ => false,
        }
    }
}

/// kind of field visit recorded by a collector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionLogType {
    /// money received
    Payment,
    /// visit without payment
    NoPago,
    /// loan disbursement marker, not a visit
    Opening,
}

/// application role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Collector,
}

/// display style for amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFormat {
    /// 1.000,00
    #[default]
    Dot,
    /// 1,000.00
    Comma,
}

/// geographic point captured with a visit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paid_is_terminal() {
        assert!(PaymentStatus::Paid.is_terminal());
        assert!(!PaymentStatus::Paid.can_transition_to(PaymentStatus::Late));
        assert!(!PaymentStatus::Paid.can_transition_to(PaymentStatus::Pending));
    }

    #[test]
    fn test_late_can_only_become_paid() {
        assert!(PaymentStatus::Late.can_transition_to(PaymentStatus::Paid));
        assert!(!PaymentStatus::Late.can_transition_to(PaymentStatus::Pending));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Late));
    }

    #[test]
    fn test_serialized_names() {
        assert_eq!(serde_json::to_string(&Frequency::Biweekly).unwrap(), "\"BIWEEKLY\"");
        assert_eq!(serde_json::to_string(&CollectionLogType::NoPago).unwrap(), "\"NO_PAGO\"");
        assert_eq!(serde_json::to_string(&NumberFormat::Comma).unwrap(), "\"comma\"");
    }
}
