use std::collections::BTreeSet;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

/// countries the collection business operates in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CountryCode {
    AR, BO, BR, CL, #[default] CO, EC, GY, PY, PE, SR, UY, VE,
    BZ, CR, SV, GT, HN, NI, PA,
    CA, US, MX,
    DO, CU, HT, JM, TT, BS, BB, LC, VC, GD, AG, DM, KN,
}

impl CountryCode {
    /// display name
    pub fn name(&self) -> &'static str {
        use CountryCode::*;
        match self {
            CO => "Colombia", AR => "Argentina", BO => "Bolivia", BR => "Brasil",
            CL => "Chile", EC => "Ecuador", GY => "Guyana", PY => "Paraguay",
            PE => "Perú", SR => "Surinam", UY => "Uruguay", VE => "Venezuela",
            BZ => "Belice", CR => "Costa Rica", SV => "El Salvador", GT => "Guatemala",
            HN => "Honduras", NI => "Nicaragua", PA => "Panamá", CA => "Canadá",
            US => "EE.UU.", MX => "México", DO => "Rep. Dominicana", CU => "Cuba",
            HT => "Haití", JM => "Jamaica", TT => "Trinidad y T.", BS => "Bahamas",
            BB => "Barbados", LC => "Santa Lucía", VC => "San Vicente", GD => "Granada",
            AG => "Antigua", DM => "Dominica", KN => "San Cristóbal",
        }
    }

    /// standard-time offset from UTC in hours (daylight saving is not modeled)
    pub fn utc_offset_hours(&self) -> i32 {
        use CountryCode::*;
        match self {
            AR | BR | PY | SR | UY => -3,
            BO | CL | GY | VE | DO | TT | BB | LC | VC | GD | AG | DM | KN => -4,
            CO | EC | PE | PA | CA | US | CU | HT | JM | BS => -5,
            BZ | CR | SV | GT | HN | NI | MX => -6,
        }
    }

    /// fixed public holidays as (month, day)
    pub fn fixed_holidays(&self) -> &'static [(u32, u32)] {
        use CountryCode::*;
        match self {
            CO => &[(1, 1), (5, 1), (7, 20), (8, 7), (12, 8), (12, 25)],
            AR => &[(1, 1), (3, 24), (4, 2), (5, 1), (5, 25), (6, 20), (7, 9), (12, 8), (12, 25)],
            BO => &[(1, 1), (1, 22), (5, 1), (6, 21), (8, 6), (11, 2), (12, 25)],
            BR => &[(1, 1), (4, 21), (5, 1), (9, 7), (10, 12), (11, 2), (11, 15), (12, 25)],
            CL => &[
                (1, 1), (5, 1), (5, 21), (6, 21), (7, 16), (8, 15), (9, 18), (9, 19),
                (10, 31), (11, 1), (12, 8), (12, 25),
            ],
            EC => &[(1, 1), (5, 1), (5, 24), (8, 10), (10, 9), (11, 2), (11, 3), (12, 25)],
            GY => &[(1, 1), (2, 23), (5, 1), (5, 26), (8, 1), (12, 25), (12, 26)],
            PY => &[
                (1, 1), (3, 1), (5, 1), (5, 14), (5, 15), (6, 12), (8, 15), (9, 29),
                (12, 8), (12, 25),
            ],
            PE => &[
                (1, 1), (5, 1), (6, 29), (7, 28), (7, 29), (8, 30), (10, 8), (11, 1),
                (12, 8), (12, 25),
            ],
            SR => &[(1, 1), (5, 1), (7, 1), (11, 25), (12, 25), (12, 26)],
            UY => &[(1, 1), (5, 1), (7, 18), (8, 25), (12, 25)],
            VE => &[(1, 1), (4, 19), (5, 1), (6, 24), (7, 5), (7, 24), (10, 12), (12, 25)],
            CA => &[(1, 1), (7, 1), (11, 11), (12, 25), (12, 26)],
            US => &[(1, 1), (7, 4), (11, 11), (12, 25)],
            MX => &[(1, 1), (2, 5), (3, 21), (5, 1), (9, 16), (11, 20), (12, 25)],
            BZ => &[
                (1, 1), (1, 15), (3, 9), (5, 1), (9, 10), (9, 21), (10, 12), (11, 19),
                (12, 25), (12, 26),
            ],
            CR => &[(1, 1), (4, 11), (5, 1), (7, 25), (8, 2), (8, 15), (9, 15), (12, 1), (12, 25)],
            SV => &[(1, 1), (5, 1), (6, 17), (8, 6), (9, 15), (11, 2), (12, 25)],
            GT => &[(1, 1), (5, 1), (6, 30), (9, 15), (10, 20), (11, 1), (12, 25)],
            HN => &[(1, 1), (4, 14), (5, 1), (9, 15), (10, 3), (10, 12), (10, 21), (12, 25)],
            NI => &[(1, 1), (5, 1), (7, 19), (9, 14), (9, 15), (12, 8), (12, 25)],
            PA => &[(1, 1), (1, 9), (5, 1), (11, 3), (11, 5), (11, 10), (11, 28), (12, 8), (12, 25)],
            DO => &[(1, 1), (1, 21), (1, 26), (2, 27), (5, 1), (8, 16), (9, 24), (11, 6), (12, 25)],
            CU => &[(1, 1), (5, 1), (7, 26), (10, 10), (12, 25)],
            HT => &[(1, 1), (1, 2), (5, 1), (5, 18), (10, 17), (11, 18), (12, 25)],
            JM => &[(1, 1), (5, 23), (8, 1), (8, 6), (10, 16), (12, 25), (12, 26)],
            TT => &[(1, 1), (3, 30), (5, 30), (6, 19), (8, 1), (8, 31), (9, 24), (12, 25), (12, 26)],
            BS => &[(1, 1), (7, 10), (12, 25), (12, 26)],
            BB => &[(1, 1), (1, 21), (4, 28), (8, 1), (11, 30), (12, 25), (12, 26)],
            LC => &[(1, 1), (2, 22), (12, 13), (12, 25), (12, 26)],
            VC => &[(1, 1), (3, 14), (10, 27), (12, 25), (12, 26)],
            GD => &[(1, 1), (2, 7), (12, 25), (12, 26)],
            AG => &[(1, 1), (11, 1), (12, 9), (12, 25), (12, 26)],
            DM => &[(1, 1), (11, 3), (11, 4), (12, 25), (12, 26)],
            KN => &[(1, 1), (9, 19), (12, 25), (12, 26)],
        }
    }
}

/// non-collection days for a country plus per-loan custom holidays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessCalendar {
    pub country: CountryCode,
    pub custom_holidays: BTreeSet<NaiveDate>,
    pub skip_sundays: bool,
}

impl BusinessCalendar {
    pub fn new(country: CountryCode) -> Self {
        Self {
            country,
            custom_holidays: BTreeSet::new(),
            skip_sundays: true,
        }
    }

    /// add custom holidays (e.g. the loan's own skipped dates)
    pub fn with_custom_holidays<I>(mut self, dates: I) -> Self
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        self.custom_holidays.extend(dates);
        self
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        let fixed = self
            .country
            .fixed_holidays()
            .iter()
            .any(|&(m, d)| date.month() == m && date.day() == d);
        fixed || self.custom_holidays.contains(&date)
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        if self.skip_sundays && date.weekday() == Weekday::Sun {
            return false;
        }
        !self.is_holiday(date)
    }

    /// first business day on or after `date`
    pub fn roll_forward(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date;
        for _ in 0..366 {
            if self.is_business_day(current) {
                return current;
            }
            current += Duration::days(1);
        }
        current
    }

    /// business days in the half-open range (from, to]
    pub fn business_days_between(&self, from: NaiveDate, to: NaiveDate) -> u32 {
        from.iter_days()
            .skip(1)
            .take_while(|d| *d <= to)
            .filter(|d| self.is_business_day(*d))
            .count() as u32
    }
}

/// today's date in the country's local time
pub fn local_today(time: &SafeTimeProvider, country: CountryCode) -> NaiveDate {
    let offset = Duration::hours(country.utc_offset_hours() as i64);
    (time.now() + offset).date_naive()
}
