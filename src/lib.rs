pub mod calendar;
pub mod collection;
pub mod config;
pub mod decimal;
pub mod delinquency;
pub mod enrich;
pub mod errors;
pub mod format;
pub mod import;
pub mod interest;
pub mod loan;
pub mod payments;
pub mod stats;
pub mod types;

// re-export key types
pub use calendar::{local_today, BusinessCalendar, CountryCode};
pub use collection::{Client, CollectionLog, User};
pub use config::{resolve_settings, OverdueCounting, Settings};
pub use decimal::{Money, Rate};
pub use delinquency::{classify, days_overdue, DelinquencyBucket};
pub use enrich::{enrich_logs, EnrichedLog};
pub use errors::{CollectionError, Result};
pub use format::format_currency;
pub use import::{import_snapshot, ImportReport, Snapshot};
pub use interest::{compute_total_return, FlatRate, InterestModel};
pub use loan::{Installment, Loan, LoanBuilder, LoanTerms};
pub use payments::{
    apply_payments, derive_installment_states, generate_schedule, Allocation,
    AmortizationSchedule, LoanView,
};
pub use stats::{
    monthly_stats, monthly_stats_for_all, CollectionBreakdown, GoalPolicy, GoalPolicyKind,
    MonthlyReport, MonthlyStats, YearMonth,
};
pub use types::{
    ClientId, CollectionLogType, Frequency, LoanId, LoanStatus, LogId, NumberFormat,
    PaymentStatus, Role, UserId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
