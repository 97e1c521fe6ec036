use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::loan::Loan;
use crate::stats::YearMonth;

/// a collector's active loans for one month, with paid amounts rebuilt as of month end
#[derive(Debug, Clone, Copy)]
pub struct Portfolio<'a> {
    pub period: YearMonth,
    pub loans: &'a [Loan],
    /// money collected on these loans during the month
    pub collected: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalOutcome {
    pub monthly_goal: Money,
    pub remaining_balance: Money,
}

/// strategy deciding what a collector is expected to collect in a month
pub trait GoalPolicy: Send + Sync {
    fn evaluate(&self, portfolio: &Portfolio<'_>) -> GoalOutcome;
}

/// goal is what falls due in the month; remaining is the goal not yet collected
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduledInMonth;

impl GoalPolicy for ScheduledInMonth {
    fn evaluate(&self, portfolio: &Portfolio<'_>) -> GoalOutcome {
        let monthly_goal: Money = portfolio
            .loans
            .iter()
            .flat_map(|loan| &loan.installments)
            .filter(|inst| portfolio.period.contains(inst.due_date))
            .map(|inst| inst.amount)
            .sum();

        GoalOutcome {
            monthly_goal,
            remaining_balance: monthly_goal.saturating_sub(portfolio.collected),
        }
    }
}

/// goal and remaining are both the outstanding balance of the portfolio
#[derive(Debug, Clone, Copy, Default)]
pub struct OutstandingBalance;

impl GoalPolicy for OutstandingBalance {
    fn evaluate(&self, portfolio: &Portfolio<'_>) -> GoalOutcome {
        let outstanding: Money = portfolio.loans.iter().map(Loan::remaining_balance).sum();
        GoalOutcome {
            monthly_goal: outstanding,
            remaining_balance: outstanding,
        }
    }
}

/// goal policy selectable from settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalPolicyKind {
    #[default]
    ScheduledInMonth,
    OutstandingBalance,
}

impl GoalPolicy for GoalPolicyKind {
    fn evaluate(&self, portfolio: &Portfolio<'_>) -> GoalOutcome {
        match self {
            GoalPolicyKind::ScheduledInMonth => ScheduledInMonth.evaluate(portfolio),
            GoalPolicyKind::OutstandingBalance => OutstandingBalance.evaluate(portfolio),
        }
    }
}
