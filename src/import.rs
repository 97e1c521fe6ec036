use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::calendar::CountryCode;
use crate::collection::{Client, CollectionLog, User};
use crate::config::Settings;
use crate::decimal::{Money, Rate};
use crate::errors::{CollectionError, Result};
use crate::loan::{Installment, Loan, LoanTerms};
use crate::types::{CollectionLogType, Frequency, LoanStatus, Location, Role, UserId};

/// canonical records of one data pull
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub loans: Vec<Loan>,
    pub clients: Vec<Client>,
    pub users: Vec<User>,
    pub logs: Vec<CollectionLog>,
}

/// imported snapshot plus the records that could not be read
#[derive(Debug, Default)]
pub struct ImportReport {
    pub snapshot: Snapshot,
    pub rejected: Vec<CollectionError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSnapshot {
    #[serde(default)]
    loans: Vec<serde_json::Value>,
    #[serde(default)]
    clients: Vec<serde_json::Value>,
    #[serde(default, alias = "profiles")]
    users: Vec<serde_json::Value>,
    #[serde(default, alias = "collection_logs", alias = "logs")]
    collection_logs: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInstallment {
    number: u32,
    #[serde(alias = "due_date")]
    due_date: String,
    amount: Decimal,
    #[serde(default, alias = "paid_amount")]
    paid_amount: Option<Decimal>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLoan {
    id: String,
    #[serde(alias = "client_id")]
    client_id: String,
    #[serde(default, alias = "collector_id")]
    collector_id: Option<String>,
    principal: Decimal,
    #[serde(alias = "interest_rate")]
    interest_rate: Decimal,
    #[serde(alias = "total_installments", alias = "installmentCount", alias = "installment_count")]
    total_installments: u32,
    frequency: String,
    #[serde(alias = "start_date", alias = "createdAt", alias = "created_at")]
    start_date: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    installments: Option<Vec<RawInstallment>>,
    #[serde(default, alias = "custom_holidays")]
    custom_holidays: Option<Vec<String>>,
    #[serde(default, alias = "is_renewal")]
    is_renewal: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClient {
    id: String,
    name: String,
    #[serde(default, alias = "document_id")]
    document_id: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default, alias = "is_active")]
    is_active: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    id: String,
    name: String,
    role: String,
    #[serde(default, alias = "managed_by")]
    managed_by: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLog {
    id: String,
    #[serde(alias = "loan_id")]
    loan_id: String,
    #[serde(alias = "client_id")]
    client_id: String,
    date: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    amount: Option<Decimal>,
    #[serde(default, alias = "is_virtual")]
    is_virtual: bool,
    #[serde(default, alias = "is_renewal")]
    is_renewal: bool,
    #[serde(default, alias = "is_opening")]
    is_opening: bool,
    #[serde(default)]
    location: Option<Location>,
    #[serde(default, alias = "deleted_at")]
    deleted_at: Option<String>,
    #[serde(default, alias = "recorded_by")]
    recorded_by: Option<String>,
    #[serde(default)]
    notes: Option<String>,
}

/// read a raw data pull into canonical records
///
/// a malformed document is an error; a malformed record is skipped and reported
pub fn import_snapshot(json: &str, settings: &Settings) -> Result<ImportReport> {
    let raw: RawSnapshot = serde_json::from_str(json)?;
    let mut report = ImportReport::default();

    report.snapshot.loans = collect(raw.loans, "loan", &mut report.rejected, |r: RawLoan| {
        convert_loan(r, settings)
    });
    report.snapshot.clients = collect(raw.clients, "client", &mut report.rejected, convert_client);
    report.snapshot.users = collect(raw.users, "user", &mut report.rejected, convert_user);
    report.snapshot.logs = collect(raw.collection_logs, "log", &mut report.rejected, |r: RawLog| {
        convert_log(r, settings.country)
    });

    debug!(
        loans = report.snapshot.loans.len(),
        clients = report.snapshot.clients.len(),
        users = report.snapshot.users.len(),
        logs = report.snapshot.logs.len(),
        rejected = report.rejected.len(),
        "imported snapshot"
    );
    Ok(report)
}

fn collect<R, T, F>(
    values: Vec<serde_json::Value>,
    record: &'static str,
    rejected: &mut Vec<CollectionError>,
    convert: F,
) -> Vec<T>
where
    R: DeserializeOwned,
    F: Fn(R) -> Result<T>,
{
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        let id = value
            .get("id")
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .unwrap_or_default();

        let converted = serde_json::from_value::<R>(value)
            .map_err(CollectionError::from)
            .and_then(&convert);

        match converted {
            Ok(item) => out.push(item),
            Err(err) => {
                warn!(record, id = %id, error = %err, "rejected record");
                rejected.push(err);
            }
        }
    }
    out
}

fn invalid(record: &'static str, id: &str, field: &'static str, reason: impl Into<String>) -> CollectionError {
    CollectionError::InvalidRecord {
        record,
        id: id.to_string(),
        field,
        reason: reason.into(),
    }
}

/// uuid as given, or a stable name-based uuid for legacy string ids
pub fn parse_id(raw: &str) -> Uuid {
    Uuid::parse_str(raw).unwrap_or_else(|_| Uuid::new_v5(&Uuid::NAMESPACE_OID, raw.as_bytes()))
}

/// reference to another record; blank and placeholder values mean none
fn parse_ref(raw: Option<&str>) -> Option<Uuid> {
    match raw.map(str::trim) {
        None | Some("") | Some("none") | Some("null") => None,
        Some(value) => Some(parse_id(value)),
    }
}

/// local wall-clock time of a timestamp
///
/// offset timestamps are moved into the country's standard time; naive ones are
/// taken as already local
pub fn parse_local_datetime(raw: &str, country: CountryCode) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        let offset = Duration::hours(country.utc_offset_hours() as i64);
        return Some((dt.with_timezone(&Utc) + offset).naive_utc());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

pub fn parse_local_date(raw: &str, country: CountryCode) -> Option<NaiveDate> {
    parse_local_datetime(raw, country).map(|dt| dt.date())
}

fn label(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn parse_frequency(raw: &str) -> Option<Frequency> {
    match label(raw).as_str() {
        "daily" | "diaria" | "diario" => Some(Frequency::Daily),
        "weekly" | "semanal" => Some(Frequency::Weekly),
        "biweekly" | "quincenal" => Some(Frequency::Biweekly),
        "monthly" | "mensual" => Some(Frequency::Monthly),
        _ => None,
    }
}

/// loan status label; arrears ("Mora") is an active loan
pub fn parse_loan_status(raw: &str) -> Option<LoanStatus> {
    match label(raw).as_str() {
        "active" | "activo" | "activa" | "mora" | "default" => Some(LoanStatus::Active),
        "paid" | "pagado" | "pagada" => Some(LoanStatus::Paid),
        "cancelled" | "canceled" | "cancelado" | "cancelada" | "anulado" => Some(LoanStatus::Cancelled),
        _ => None,
    }
}

pub fn parse_role(raw: &str) -> Option<Role> {
    match label(raw).as_str() {
        "admin" | "administrador" => Some(Role::Admin),
        "manager" | "gerente" => Some(Role::Manager),
        "collector" | "cobrador" => Some(Role::Collector),
        _ => None,
    }
}

pub fn parse_log_type(raw: &str) -> Option<CollectionLogType> {
    match label(raw).as_str() {
        "payment" | "pago" => Some(CollectionLogType::Payment),
        "no_pago" | "no_payment" | "nopago" => Some(CollectionLogType::NoPago),
        "opening" | "apertura" => Some(CollectionLogType::Opening),
        _ => None,
    }
}

fn convert_loan(raw: RawLoan, settings: &Settings) -> Result<Loan> {
    let id = raw.id.as_str();
    let frequency = parse_frequency(&raw.frequency)
        .ok_or_else(|| invalid("loan", id, "frequency", format!("unknown label {:?}", raw.frequency)))?;
    let status = match raw.status.as_deref() {
        None => LoanStatus::Active,
        Some(s) => parse_loan_status(s)
            .ok_or_else(|| invalid("loan", id, "status", format!("unknown label {s:?}")))?,
    };
    let start_date = parse_local_date(&raw.start_date, settings.country)
        .ok_or_else(|| invalid("loan", id, "start_date", format!("unparseable {:?}", raw.start_date)))?;

    let mut custom_holidays = BTreeSet::new();
    for day in raw.custom_holidays.unwrap_or_default() {
        let date = NaiveDate::parse_from_str(day.trim(), "%Y-%m-%d")
            .map_err(|e| invalid("loan", id, "custom_holidays", e.to_string()))?;
        custom_holidays.insert(date);
    }

    let terms = LoanTerms {
        principal: Money::from_decimal(raw.principal),
        interest_rate: Rate::from_percent_decimal(raw.interest_rate),
        installment_count: raw.total_installments,
        frequency,
        start_date,
    };

    let schedulable = terms.installment_count > 0
        && terms.principal.is_positive()
        && !terms.interest_rate.is_negative();

    let calendar = settings
        .calendar()
        .with_custom_holidays(custom_holidays.iter().copied());
    let mut loan = Loan::originate(
        parse_id(id),
        parse_id(&raw.client_id),
        parse_ref(raw.collector_id.as_deref()),
        terms,
        settings.roll_due_dates.then_some(&calendar),
    );

    // stored schedules are kept as issued; only generate one when none was stored
    if let Some(stored) = raw.installments.filter(|i| !i.is_empty()) {
        let mut installments = Vec::with_capacity(stored.len());
        for inst in stored {
            let due = parse_local_date(&inst.due_date, settings.country).ok_or_else(|| {
                invalid("loan", id, "installments", format!("unparseable due date {:?}", inst.due_date))
            })?;
            let mut installment = Installment::new(inst.number, due, Money::from_decimal(inst.amount));
            installment.paid_amount = inst.paid_amount.map(Money::from_decimal).unwrap_or(Money::ZERO);
            installments.push(installment);
        }
        installments.sort_by_key(|i| i.number);

        loan.installment_count = installments.len() as u32;
        loan.total_amount = installments.iter().map(|i| i.amount).sum();
        loan.installments = installments;
    } else if schedulable && loan.installments.is_empty() {
        return Err(invalid("loan", id, "principal", "no schedule fits the loan terms"));
    }

    loan.status = status;
    loan.custom_holidays = custom_holidays;
    loan.is_renewal = raw.is_renewal;
    Ok(loan)
}

fn convert_client(raw: RawClient) -> Result<Client> {
    Ok(Client {
        id: parse_id(&raw.id),
        name: raw.name,
        document_id: raw.document_id,
        phone: raw.phone,
        address: raw.address,
        location: raw.location,
        is_active: raw.is_active.unwrap_or(true),
    })
}

fn convert_user(raw: RawUser) -> Result<User> {
    let role = parse_role(&raw.role)
        .ok_or_else(|| invalid("user", &raw.id, "role", format!("unknown label {:?}", raw.role)))?;
    Ok(User {
        id: parse_id(&raw.id),
        name: raw.name,
        role,
        managed_by: parse_ref(raw.managed_by.as_deref()),
    })
}

fn convert_log(raw: RawLog, country: CountryCode) -> Result<CollectionLog> {
    let id = raw.id.as_str();
    let log_type = if raw.is_opening {
        CollectionLogType::Opening
    } else {
        parse_log_type(&raw.kind)
            .ok_or_else(|| invalid("log", id, "type", format!("unknown label {:?}", raw.kind)))?
    };
    let date = parse_local_datetime(&raw.date, country)
        .ok_or_else(|| invalid("log", id, "date", format!("unparseable {:?}", raw.date)))?;

    let amount = match log_type {
        CollectionLogType::Payment => Some(Money::from_decimal(raw.amount.unwrap_or(Decimal::ZERO))),
        _ => None,
    };

    // a deletion marker we cannot read still marks the log as deleted
    let deleted_at = raw.deleted_at.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(|s| {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    });

    let recorded_by: Option<UserId> = parse_ref(raw.recorded_by.as_deref());

    Ok(CollectionLog {
        id: parse_id(id),
        loan_id: parse_id(&raw.loan_id),
        client_id: parse_id(&raw.client_id),
        date,
        log_type,
        amount,
        is_virtual: raw.is_virtual,
        is_renewal: raw.is_renewal,
        location: raw.location,
        deleted_at,
        recorded_by,
        notes: raw.notes,
    })
}
