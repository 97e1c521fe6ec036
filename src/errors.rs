use thiserror::Error;

use crate::decimal::Money;

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("invalid period: month {month} of {year}")]
    InvalidPeriod {
        year: i32,
        month: u32,
    },

    #[error("invalid {record} record {id}: {field} {reason}")]
    InvalidRecord {
        record: &'static str,
        id: String,
        field: &'static str,
        reason: String,
    },

    #[error("invalid amount: {amount}")]
    InvalidAmount {
        amount: Money,
    },

    #[error("invalid date: {message}")]
    InvalidDate {
        message: String,
    },

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CollectionError>;
