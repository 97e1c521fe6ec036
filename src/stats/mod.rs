pub mod commission;
pub mod goal;

use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collection::{Client, CollectionLog, User};
use crate::decimal::{percent_of, Money};
use crate::enrich::UNKNOWN_CLIENT;
use crate::errors::{CollectionError, Result};
use crate::loan::Loan;
use crate::payments::apply_payments;
use crate::types::{ClientId, LoanId, Role, UserId};

pub use commission::{
    commission, filter_logs, payout_factor, weekly_performance, Commission, CommissionBracket,
    DailyDelinquency, LogFilter, PaymentTypeFilter, WeeklyPerformance,
};
pub use goal::{
    GoalOutcome, GoalPolicy, GoalPolicyKind, OutstandingBalance, Portfolio, ScheduledInMonth,
};

/// calendar month, month numbered 1 to 12
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    first: NaiveDate,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first| Self { first })
            .ok_or(CollectionError::InvalidPeriod { year, month })
    }

    /// month containing `date`
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            first: date - chrono::Duration::days(date.day0() as i64),
        }
    }

    pub fn year(&self) -> i32 {
        self.first.year()
    }

    pub fn month(&self) -> u32 {
        self.first.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn last_day(&self) -> NaiveDate {
        self.first
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year() && date.month() == self.month()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

/// collected money split by channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollectionBreakdown {
    pub cash: Money,
    pub virtual_transfer: Money,
    pub renewal: Money,
}

impl CollectionBreakdown {
    /// renewals take precedence over virtual transfers; anything else is cash
    pub fn from_logs<'a, I>(logs: I) -> Self
    where
        I: IntoIterator<Item = &'a CollectionLog>,
    {
        let mut breakdown = Self::default();
        for log in logs {
            let amount = log.collected_amount();
            if log.is_renewal {
                breakdown.renewal += amount;
            } else if log.is_virtual {
                breakdown.virtual_transfer += amount;
            } else {
                breakdown.cash += amount;
            }
        }
        breakdown
    }

    pub fn total(&self) -> Money {
        self.cash + self.virtual_transfer + self.renewal
    }
}

/// one collector's month
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyStats {
    pub collector_id: UserId,
    pub month: u32,
    pub year: i32,
    pub collected_this_month: Money,
    /// part of `collected_this_month` paid on the active loans the goal covers
    pub portfolio_collected: Money,
    pub monthly_goal: Money,
    pub remaining_balance: Money,
    pub total_active_clients: u32,
    pub clients_visited: u32,
    pub missed_clients: Vec<ClientId>,
}

impl MonthlyStats {
    /// visited share of assigned clients, in percent
    pub fn coverage(&self) -> Decimal {
        percent_of(
            Decimal::from(self.clients_visited),
            Decimal::from(self.total_active_clients),
        )
    }

    /// share of the goal collected on the goal's own loans, in percent
    pub fn effectiveness(&self) -> Decimal {
        percent_of(
            self.portfolio_collected.as_decimal(),
            self.monthly_goal.as_decimal(),
        )
    }

    pub fn all_visited(&self) -> bool {
        self.missed_clients.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyReport {
    pub stats: MonthlyStats,
    /// assigned clients without a visit, in loan order
    pub missed_clients: Vec<Client>,
    /// the month's visits on the collector's loans, oldest first
    pub monthly_logs: Vec<CollectionLog>,
    pub breakdown: CollectionBreakdown,
}

/// collection statistics of one collector for one month
pub fn monthly_stats(
    loans: &[Loan],
    logs: &[CollectionLog],
    clients: &[Client],
    period: YearMonth,
    collector_id: UserId,
    policy: &dyn GoalPolicy,
) -> MonthlyReport {
    let assigned: Vec<&Loan> = loans
        .iter()
        .filter(|loan| loan.collector_id == Some(collector_id) && loan.is_active())
        .collect();

    let mut assigned_clients: Vec<ClientId> = Vec::new();
    let mut seen = HashSet::new();
    for loan in &assigned {
        if seen.insert(loan.client_id) {
            assigned_clients.push(loan.client_id);
        }
    }

    let collector_of: HashMap<LoanId, Option<UserId>> =
        loans.iter().map(|loan| (loan.id, loan.collector_id)).collect();

    let mut monthly_logs: Vec<CollectionLog> = logs
        .iter()
        .filter(|log| !log.is_deleted() && log.is_visit() && period.contains(log.day()))
        .filter(|log| collector_of.get(&log.loan_id).copied().flatten() == Some(collector_id))
        .cloned()
        .collect();
    monthly_logs.sort_by_key(|log| (log.date, log.id));

    let visited: HashSet<ClientId> = monthly_logs.iter().map(|log| log.client_id).collect();
    let clients_visited = assigned_clients.iter().filter(|id| visited.contains(*id)).count() as u32;
    let missed: Vec<ClientId> = assigned_clients
        .iter()
        .copied()
        .filter(|id| !visited.contains(id))
        .collect();

    let breakdown = CollectionBreakdown::from_logs(&monthly_logs);
    let collected = breakdown.total();

    let active_ids: HashSet<LoanId> = assigned.iter().map(|loan| loan.id).collect();
    let portfolio_collected: Money = monthly_logs
        .iter()
        .filter(|log| log.is_payment() && active_ids.contains(&log.loan_id))
        .map(CollectionLog::collected_amount)
        .sum();

    // the goal looks at the portfolio as it stood at the end of the month
    let cutoff = period.last_day();
    let portfolio_loans: Vec<Loan> = assigned
        .iter()
        .map(|loan| {
            let mut as_of_month_end = (*loan).clone();
            as_of_month_end.installments = apply_payments(loan, logs, Some(cutoff)).installments;
            as_of_month_end
        })
        .collect();
    let outcome = policy.evaluate(&Portfolio {
        period,
        loans: &portfolio_loans,
        collected: portfolio_collected,
    });

    let client_by_id: HashMap<ClientId, &Client> = clients.iter().map(|c| (c.id, c)).collect();
    let missed_clients: Vec<Client> = missed
        .iter()
        .map(|id| {
            client_by_id
                .get(id)
                .map(|c| (*c).clone())
                .unwrap_or_else(|| Client::new(*id, UNKNOWN_CLIENT))
        })
        .collect();

    let stats = MonthlyStats {
        collector_id,
        month: period.month(),
        year: period.year(),
        collected_this_month: collected,
        portfolio_collected,
        monthly_goal: outcome.monthly_goal,
        remaining_balance: outcome.remaining_balance,
        total_active_clients: assigned_clients.len() as u32,
        clients_visited,
        missed_clients: missed,
    };

    debug!(
        collector = %collector_id,
        period = %period,
        collected = %stats.collected_this_month,
        goal = %stats.monthly_goal,
        coverage = %stats.coverage(),
        "computed monthly stats"
    );

    MonthlyReport {
        stats,
        missed_clients,
        monthly_logs,
        breakdown,
    }
}

/// monthly statistics for every collector among `users`
pub fn monthly_stats_for_all(
    loans: &[Loan],
    logs: &[CollectionLog],
    clients: &[Client],
    users: &[User],
    period: YearMonth,
    policy: &dyn GoalPolicy,
) -> Vec<MonthlyReport> {
    users
        .iter()
        .filter(|user| user.role == Role::Collector)
        .map(|user| monthly_stats(loans, logs, clients, period, user.id, policy))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Rate;
    use crate::types::{Frequency, LoanStatus};
    use chrono::{NaiveDateTime, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        date(y, m, d).and_hms_opt(15, 45, 0).unwrap()
    }

    fn loan(client: ClientId, collector: UserId, start: NaiveDate) -> Loan {
        // 10 weekly installments of 110
        Loan::builder()
            .client(client)
            .collector(collector)
            .principal(Money::from_major(1_000))
            .rate(Rate::from_percentage(10))
            .installments(10)
            .frequency(Frequency::Weekly)
            .start_date(start)
            .build()
            .unwrap()
    }

    struct Route {
        collector: UserId,
        clients: Vec<Client>,
        loans: Vec<Loan>,
    }

    fn route() -> Route {
        let collector = Uuid::new_v4();
        let clients = vec![Client::new(Uuid::new_v4(), "Ana"), Client::new(Uuid::new_v4(), "Luis")];
        let loans = clients
            .iter()
            .map(|c| loan(c.id, collector, date(2024, 3, 25)))
            .collect();
        Route {
            collector,
            clients,
            loans,
        }
    }

    #[test]
    fn test_year_month() {
        assert!(matches!(
            YearMonth::new(2024, 13),
            Err(CollectionError::InvalidPeriod { year: 2024, month: 13 })
        ));
        assert!(YearMonth::new(2024, 0).is_err());

        let feb = YearMonth::new(2024, 2).unwrap();
        assert_eq!(feb.last_day(), date(2024, 2, 29));
        assert!(feb.contains(date(2024, 2, 1)));
        assert!(!feb.contains(date(2023, 2, 1)));
        assert_eq!(YearMonth::from_date(date(2024, 2, 17)), feb);
        assert_eq!(feb.to_string(), "2024-02");
        assert_eq!(YearMonth::new(2024, 12).unwrap().last_day(), date(2024, 12, 31));
    }

    #[test]
    fn test_one_of_two_clients_visited() {
        let route = route();
        let ana = &route.loans[0];
        let logs = vec![CollectionLog::payment(ana.id, ana.client_id, at(2024, 4, 10), Money::from_major(1_000))];

        let report = monthly_stats(
            &route.loans,
            &logs,
            &route.clients,
            YearMonth::new(2024, 4).unwrap(),
            route.collector,
            &ScheduledInMonth,
        );

        assert_eq!(report.stats.collected_this_month, Money::from_major(1_000));
        assert_eq!(report.stats.total_active_clients, 2);
        assert_eq!(report.stats.clients_visited, 1);
        assert_eq!(report.stats.coverage(), dec!(50));
        assert!(!report.stats.all_visited());
        assert_eq!(report.missed_clients.len(), 1);
        assert_eq!(report.missed_clients[0].name, "Luis");
        assert_eq!(report.monthly_logs.len(), 1);
        assert_eq!(report.breakdown.cash, Money::from_major(1_000));
    }

    #[test]
    fn test_goal_and_effectiveness() {
        let route = route();
        // start Mar 25: installments due Apr 1, 8, 15, 22, 29 => 5 x 110 per loan
        let ana = &route.loans[0];
        let logs = vec![CollectionLog::payment(ana.id, ana.client_id, at(2024, 4, 1), Money::from_major(275))];

        let report = monthly_stats(
            &route.loans,
            &logs,
            &route.clients,
            YearMonth::new(2024, 4).unwrap(),
            route.collector,
            &GoalPolicyKind::ScheduledInMonth,
        );

        assert_eq!(report.stats.monthly_goal, Money::from_major(1_100));
        assert_eq!(report.stats.remaining_balance, Money::from_major(825));
        assert_eq!(report.stats.effectiveness(), dec!(25));

        let outstanding = monthly_stats(
            &route.loans,
            &logs,
            &route.clients,
            YearMonth::new(2024, 4).unwrap(),
            route.collector,
            &OutstandingBalance,
        );
        assert_eq!(outstanding.stats.remaining_balance, Money::from_major(1_925));
    }

    #[test]
    fn test_soft_deleted_and_opening_logs_are_ignored() {
        let route = route();
        let ana = &route.loans[0];
        let logs = vec![
            CollectionLog::payment(ana.id, ana.client_id, at(2024, 4, 10), Money::from_major(500)).deleted(Utc::now()),
            CollectionLog::opening(ana.id, ana.client_id, at(2024, 4, 2)),
        ];

        let report = monthly_stats(
            &route.loans,
            &logs,
            &route.clients,
            YearMonth::new(2024, 4).unwrap(),
            route.collector,
            &ScheduledInMonth,
        );

        assert_eq!(report.stats.collected_this_month, Money::ZERO);
        assert_eq!(report.stats.clients_visited, 0);
        assert!(report.monthly_logs.is_empty());
    }

    #[test]
    fn test_historical_month_excludes_later_logs() {
        let route = route();
        let ana = &route.loans[0];
        let logs = vec![
            CollectionLog::no_payment(ana.id, ana.client_id, at(2024, 3, 30)),
            CollectionLog::payment(ana.id, ana.client_id, at(2024, 4, 1), Money::from_major(110)),
        ];

        let march = monthly_stats(
            &route.loans,
            &logs,
            &route.clients,
            YearMonth::new(2024, 3).unwrap(),
            route.collector,
            &OutstandingBalance,
        );

        assert_eq!(march.stats.collected_this_month, Money::ZERO);
        assert_eq!(march.stats.clients_visited, 1);
        // april's payment is not applied to march's balance
        assert_eq!(march.stats.remaining_balance, Money::from_major(2_200));
    }

    #[test]
    fn test_other_collectors_and_inactive_loans() {
        let mut route = route();
        route.loans[1].status = LoanStatus::Paid;
        let stranger = loan(Uuid::new_v4(), Uuid::new_v4(), date(2024, 3, 25));
        let logs = vec![CollectionLog::payment(
            stranger.id,
            stranger.client_id,
            at(2024, 4, 3),
            Money::from_major(110),
        )];
        route.loans.push(stranger);

        let report = monthly_stats(
            &route.loans,
            &logs,
            &route.clients,
            YearMonth::new(2024, 4).unwrap(),
            route.collector,
            &ScheduledInMonth,
        );

        assert_eq!(report.stats.total_active_clients, 1);
        assert_eq!(report.stats.collected_this_month, Money::ZERO);
        assert_eq!(report.stats.monthly_goal, Money::from_major(550));
    }

    #[test]
    fn test_payments_on_settled_loans_do_not_count_toward_the_goal() {
        let mut route = route();
        route.loans[1].status = LoanStatus::Paid;
        let settled = &route.loans[1];
        let logs = vec![CollectionLog::payment(
            settled.id,
            settled.client_id,
            at(2024, 4, 12),
            Money::from_major(1_000),
        )];

        let report = monthly_stats(
            &route.loans,
            &logs,
            &route.clients,
            YearMonth::new(2024, 4).unwrap(),
            route.collector,
            &ScheduledInMonth,
        );

        assert_eq!(report.stats.collected_this_month.to_string(), "1000.00");
        assert_eq!(report.stats.portfolio_collected, Money::ZERO);
        assert_eq!(report.stats.monthly_goal, Money::from_major(550));
        assert_eq!(report.stats.remaining_balance, Money::from_major(550));
        assert_eq!(report.stats.effectiveness(), Decimal::ZERO);
    }

    #[test]
    fn test_no_assigned_clients() {
        let report = monthly_stats(
            &[],
            &[],
            &[],
            YearMonth::new(2024, 4).unwrap(),
            Uuid::new_v4(),
            &ScheduledInMonth,
        );

        assert_eq!(report.stats.coverage(), Decimal::ZERO);
        assert_eq!(report.stats.effectiveness(), Decimal::ZERO);
        assert!(report.stats.all_visited());
    }

    #[test]
    fn test_stats_for_every_collector() {
        let route = route();
        let users = vec![
            User::new(route.collector, "Cobrador", Role::Collector),
            User::new(Uuid::new_v4(), "Jefe", Role::Manager),
        ];

        let reports = monthly_stats_for_all(
            &route.loans,
            &[],
            &route.clients,
            &users,
            YearMonth::new(2024, 4).unwrap(),
            &ScheduledInMonth,
        );

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].stats.collector_id, route.collector);
        assert_eq!(reports[0].stats.missed_clients.len(), 2);
    }
}
