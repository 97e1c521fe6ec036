use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calendar::{BusinessCalendar, CountryCode};
use crate::collection::User;
use crate::errors::{CollectionError, Result};
use crate::stats::commission::CommissionBracket;
use crate::stats::goal::GoalPolicyKind;
use crate::types::{NumberFormat, Role, UserId};

/// how elapsed days are counted when measuring arrears
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverdueCounting {
    /// every calendar day counts
    #[default]
    CalendarDays,
    /// Sundays and holidays are not counted
    BusinessDays,
}

/// settings of a branch (admin or manager) shared with its collectors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub country: CountryCode,
    /// branch-wide skipped dates, in addition to the country's fixed holidays
    #[serde(alias = "customHolidays")]
    pub custom_holidays: BTreeSet<NaiveDate>,
    pub skip_sundays: bool,
    /// roll generated due dates forward to the next business day
    pub roll_due_dates: bool,
    pub grace_period_days: u32,
    pub overdue_counting: OverdueCounting,
    #[serde(alias = "numberFormat")]
    pub number_format: NumberFormat,
    /// base commission on collected money, in percent
    #[serde(alias = "commissionPercentage")]
    pub commission_percentage: Decimal,
    #[serde(alias = "commissionBrackets")]
    pub commission_brackets: Vec<CommissionBracket>,
    pub goal_policy: GoalPolicyKind,
    #[serde(alias = "companyName")]
    pub company_name: Option<String>,
    #[serde(alias = "contactPhone")]
    pub contact_phone: Option<String>,
    #[serde(alias = "technicalSupportPhone")]
    pub technical_support_phone: Option<String>,
}

impl Default for Settings {
    /// plain calendar arithmetic, no grace, Colombian calendar
    fn default() -> Self {
        Self {
            country: CountryCode::CO,
            custom_holidays: BTreeSet::new(),
            skip_sundays: true,
            roll_due_dates: false,
            grace_period_days: 0,
            overdue_counting: OverdueCounting::CalendarDays,
            number_format: NumberFormat::Dot,
            commission_percentage: dec!(10),
            commission_brackets: Vec::new(),
            goal_policy: GoalPolicyKind::ScheduledInMonth,
            company_name: None,
            contact_phone: None,
            technical_support_phone: None,
        }
    }
}

impl Settings {
    /// field-route preset: due dates and arrears skip Sundays and the country's holidays
    pub fn field_route(country: CountryCode) -> Self {
        let number_format = match country {
            CountryCode::US | CountryCode::CA | CountryCode::MX | CountryCode::PA
            | CountryCode::DO | CountryCode::GT | CountryCode::HN | CountryCode::SV
            | CountryCode::NI => NumberFormat::Comma,
            _ => NumberFormat::Dot,
        };

        Self {
            country,
            roll_due_dates: true,
            overdue_counting: OverdueCounting::BusinessDays,
            number_format,
            commission_brackets: vec![
                CommissionBracket::new(dec!(10), dec!(100)),
                CommissionBracket::new(dec!(20), dec!(80)),
                CommissionBracket::new(dec!(30), dec!(50)),
                CommissionBracket::new(dec!(100), dec!(0)),
            ],
            ..Self::default()
        }
    }

    /// parse and validate settings from json; absent fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.commission_percentage < Decimal::ZERO || self.commission_percentage > dec!(100) {
            return Err(CollectionError::InvalidConfiguration {
                message: format!(
                    "commission percentage {} outside 0..=100",
                    self.commission_percentage
                ),
            });
        }
        for bracket in &self.commission_brackets {
            if bracket.max_mora < Decimal::ZERO || bracket.payout_percent < Decimal::ZERO {
                return Err(CollectionError::InvalidConfiguration {
                    message: format!(
                        "commission bracket ({}%, {}%) has a negative bound",
                        bracket.max_mora, bracket.payout_percent
                    ),
                });
            }
        }
        Ok(())
    }

    /// business calendar for the configured country and branch holidays
    pub fn calendar(&self) -> BusinessCalendar {
        BusinessCalendar {
            country: self.country,
            custom_holidays: self.custom_holidays.clone(),
            skip_sundays: self.skip_sundays,
        }
    }
}

/// settings that apply to a user
///
/// collectors inherit their manager's settings; the technical support phone is global
/// and always comes from the system admin when the admin has one
pub fn resolve_settings(
    user: Option<&User>,
    all_settings: &HashMap<UserId, Settings>,
    system_admin: Option<UserId>,
    defaults: &Settings,
) -> Settings {
    let Some(user) = user else {
        return defaults.clone();
    };

    let mut settings = all_settings.get(&user.id).unwrap_or(defaults);
    if user.role == Role::Collector {
        if let Some(manager_settings) = user.managed_by.and_then(|m| all_settings.get(&m)) {
            settings = manager_settings;
        }
    }

    let mut resolved = settings.clone();
    if let Some(phone) = system_admin
        .and_then(|id| all_settings.get(&id))
        .and_then(|s| s.technical_support_phone.clone())
    {
        resolved.technical_support_phone = Some(phone);
    }
    resolved
}
