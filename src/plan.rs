use chrono::NaiveDate;
use log::{debug, info, trace};
use std::{collections::HashSet, fmt};

use crate::book::Book;
use crate::interest::{
    blended_annual_return, blended_monthly_return, compound, month_start, MONTH_CAP,
};
use crate::loan::{portfolio_value, Investment, Loan};
use crate::strategy::snowball_order;
use crate::wealth::is_sampled_month;

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanInput {
    pub extra_monthly: f64,
    /// Loan ids that receive the monthly surplus, in order. Loans left out and not
    /// on autopilot are visited after the listed ones.
    pub payoff_order: Vec<String>,
    /// Loans paid down by their minimum payment only.
    pub autopilot_ids: Vec<String>,
    /// Defaults to the longest remaining term among all loans.
    pub horizon_months: Option<u32>,
    pub start_date: NaiveDate,
}

impl PlanInput {
    pub fn new(extra_monthly: f64, start_date: NaiveDate) -> Self {
        Self {
            extra_monthly,
            payoff_order: Vec::new(),
            autopilot_ids: Vec::new(),
            horizon_months: None,
            start_date,
        }
    }

    pub fn with_payoff_order(mut self, order: Vec<String>) -> Self {
        self.payoff_order = order;
        self
    }

    pub fn with_autopilot(mut self, ids: Vec<String>) -> Self {
        self.autopilot_ids = ids;
        self
    }

    pub fn with_horizon(mut self, months: u32) -> Self {
        self.horizon_months = Some(months);
        self
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MilestoneEvent {
    LoanPaidOff { loan_id: String, name: String },
    DebtFree,
}

impl fmt::Display for MilestoneEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MilestoneEvent::LoanPaidOff { name, .. } => write!(f, "{} paid off", name),
            MilestoneEvent::DebtFree => write!(f, "all debt paid off"),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Milestone {
    pub month: u32,
    pub date: NaiveDate,
    pub event: MilestoneEvent,
}

impl fmt::Display for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "month {} ({}): {}", self.month, self.date, self.event)
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoanPosition {
    pub loan_id: String,
    /// Scheduled plus extra payment made this month.
    pub payment: f64,
    pub balance: f64,
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanMonth {
    pub month: u32,
    pub date: NaiveDate,
    pub loans: Vec<LoanPosition>,
    pub invested: f64,
    pub total_debt: f64,
    pub portfolio: f64,
    pub cumulative_interest: f64,
    pub cumulative_invested: f64,
    pub net_wealth: f64,
    pub events: Vec<MilestoneEvent>,
}

impl PlanMonth {
    pub fn position(&self, loan_id: &str) -> Option<&LoanPosition> {
        self.loans.iter().find(|p| p.loan_id == loan_id)
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanSummary {
    pub final_portfolio: f64,
    pub final_debt: f64,
    pub final_net_wealth: f64,
    pub total_interest: f64,
    pub total_invested: f64,
    pub milestones: Vec<Milestone>,
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlanResult {
    pub months: Vec<PlanMonth>,
    pub summary: PlanSummary,
}

impl PlanResult {
    /// Every month of the first year, every sixth month after that and the last one.
    pub fn sampled(&self) -> Vec<&PlanMonth> {
        let horizon = self.months.last().map_or(0, |m| m.month);
        self.months
            .iter()
            .filter(|m| is_sampled_month(m.month, horizon))
            .collect()
    }
}

/// Simulates every loan together with the investment portfolio. Each month all
/// active loans get their minimum, the extra amount plus freed minimums go down
/// the payoff order (autopilot loans excluded), and whatever is left is invested.
pub fn optimal_plan(loans: &[Loan], investments: &[Investment], input: &PlanInput) -> PlanResult {
    let monthly_return = blended_monthly_return(investments);
    let autopilot: HashSet<&str> = input.autopilot_ids.iter().map(String::as_str).collect();
    let horizon = input
        .horizon_months
        .unwrap_or_else(|| {
            loans
                .iter()
                .map(|l| l.remaining_term_months)
                .max()
                .unwrap_or(0)
        })
        .min(MONTH_CAP);

    let mut book = Book::new(loans);
    let surplus_order = book.resolve_order(&input.payoff_order, |id| autopilot.contains(id));
    let every: Vec<usize> = (0..book.accounts().len()).collect();

    let upfront = book.settle(&every, 0);
    let mut freed = book.freed_by(&upfront);
    let mut debt_free = !book.any_active();

    let mut portfolio = portfolio_value(investments);
    let mut cumulative_interest = 0.;
    let mut total_invested = 0.;
    let mut milestones = Vec::new();
    let mut months = Vec::with_capacity(horizon as usize);

    for month in 1..=horizon {
        let date = month_start(input.start_date, month);
        let charges = book.pay_minimums(month);
        cumulative_interest += charges.interest;

        let invested = book.apply_surplus(&surplus_order, input.extra_monthly + freed);

        let newly = book.settle(&every, month);
        freed += book.freed_by(&newly);
        let mut events: Vec<MilestoneEvent> = newly
            .iter()
            .map(|&i| {
                let loan_id = book.accounts()[i].id.clone();
                let name = loans
                    .iter()
                    .find(|l| l.id == loan_id)
                    .map_or_else(|| loan_id.clone(), |l| l.name.clone());
                MilestoneEvent::LoanPaidOff { loan_id, name }
            })
            .collect();
        if !debt_free && !book.any_active() {
            debt_free = true;
            events.push(MilestoneEvent::DebtFree);
        }
        for event in &events {
            debug!("month {}: {}", month, event);
            milestones.push(Milestone {
                month,
                date,
                event: event.clone(),
            });
        }

        portfolio = compound(portfolio, invested, monthly_return);
        total_invested += invested;
        let total_debt = book.total_balance();
        trace!(
            "month {}, invested {:.2}, debt {:.2}, portfolio {:.2}",
            month,
            invested,
            total_debt,
            portfolio
        );

        months.push(PlanMonth {
            month,
            date,
            loans: book
                .accounts()
                .iter()
                .map(|a| LoanPosition {
                    loan_id: a.id.clone(),
                    payment: a.paid_this_month,
                    balance: a.balance,
                })
                .collect(),
            invested,
            total_debt,
            portfolio,
            cumulative_interest,
            cumulative_invested: total_invested,
            net_wealth: portfolio - total_debt,
            events,
        });
    }

    let summary = match months.last() {
        Some(last) => PlanSummary {
            final_portfolio: last.portfolio,
            final_debt: last.total_debt,
            final_net_wealth: last.net_wealth,
            total_interest: last.cumulative_interest,
            total_invested: last.cumulative_invested,
            milestones,
        },
        None => PlanSummary {
            final_portfolio: portfolio,
            final_debt: book.total_balance(),
            final_net_wealth: portfolio - book.total_balance(),
            total_interest: 0.,
            total_invested: 0.,
            milestones,
        },
    };
    info!(
        "plan over {} months: portfolio {:.2}, debt {:.2}, net wealth {:.2}, {} milestones",
        horizon,
        summary.final_portfolio,
        summary.final_debt,
        summary.final_net_wealth,
        summary.milestones.len()
    );

    PlanResult { months, summary }
}

/// Loans worth leaving on minimum payments: those the user pinned with the
/// autopilot priority, and those whose rate is below what the portfolio earns.
pub fn suggest_autopilot(loans: &[Loan], investments: &[Investment]) -> Vec<String> {
    let annual_return = blended_annual_return(investments);
    loans
        .iter()
        .filter(|l| {
            l.is_autopilot_priority() || (l.annual_rate > 0. && l.annual_rate < annual_return)
        })
        .map(|l| l.id.clone())
        .collect()
}

/// Loans not on autopilot, smallest balance first.
pub fn default_payoff_order(loans: &[Loan], autopilot_ids: &[String]) -> Vec<String> {
    snowball_order(loans.iter().filter(|l| !autopilot_ids.contains(&l.id)))
}
