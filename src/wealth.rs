use chrono::NaiveDate;
use log::{debug, info, trace};
use std::{fmt, str::FromStr};

use crate::book::Book;
use crate::error::FinanceError;
use crate::interest::{blended_monthly_return, compound, MONTH_CAP};
use crate::loan::{portfolio_value, Investment, Loan};
use crate::strategy::{avalanche, avalanche_order};

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Recommendation {
    PayLoans,
    Invest,
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recommendation::PayLoans => write!(f, "pay_loans"),
            Recommendation::Invest => write!(f, "invest"),
        }
    }
}

impl FromStr for Recommendation {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pay_loans" => Ok(Recommendation::PayLoans),
            "invest" => Ok(Recommendation::Invest),
            _ => Err(FinanceError::UnknownRecommendation(s.to_string())),
        }
    }
}

/// Months kept when a monthly series is thinned for charting: every month of the
/// first year, every sixth month after that, and the final month.
pub fn is_sampled_month(month: u32, horizon: u32) -> bool {
    month <= 12 || month % 6 == 0 || month == horizon
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WealthComparisonInput {
    /// Loans taking part in the comparison. Loans not listed are left out of both
    /// scenarios.
    pub target_ids: Vec<String>,
    pub extra_monthly: f64,
    /// Monthly decimal return of the portfolio, see [`blended_monthly_return`].
    pub monthly_return: f64,
    /// Defaults to the longest remaining term among the target loans.
    pub horizon_months: Option<u32>,
}

impl WealthComparisonInput {
    pub fn new(target_ids: Vec<String>, extra_monthly: f64, monthly_return: f64) -> Self {
        Self {
            target_ids,
            extra_monthly,
            monthly_return,
            horizon_months: None,
        }
    }

    pub fn with_investments(mut self, investments: &[Investment]) -> Self {
        self.monthly_return = blended_monthly_return(investments);
        self
    }

    pub fn with_horizon(mut self, months: u32) -> Self {
        self.horizon_months = Some(months);
        self
    }
}

/// End state of one scenario at the horizon.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScenarioOutcome {
    pub portfolio: f64,
    pub interest_paid: f64,
    pub total_invested: f64,
    pub remaining_debt: f64,
    /// First month every target loan was paid off, `None` if that never happened
    /// within the horizon.
    pub payoff_month: Option<u32>,
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WealthPoint {
    pub month: u32,
    pub invest_now_portfolio: f64,
    pub invest_now_debt: f64,
    pub pay_down_portfolio: f64,
    pub pay_down_debt: f64,
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WealthComparison {
    pub horizon_months: u32,
    /// Minimums only, with the extra amount invested from the first month.
    pub invest_now: ScenarioOutcome,
    /// Extra amount cascades over the target loans, highest rate first, and only
    /// the remainder is invested.
    pub pay_down: ScenarioOutcome,
    /// Pay-down portfolio minus invest-now portfolio at the horizon.
    pub net_benefit: f64,
    pub recommendation: Recommendation,
    pub timeline: Vec<WealthPoint>,
}

struct Track {
    book: Book,
    order: Vec<usize>,
    pay_down: bool,
    freed: f64,
    outcome: ScenarioOutcome,
}

impl Track {
    fn new(loans: &[&Loan], pay_down: bool) -> Self {
        let mut book = Book::new(loans.iter().copied());
        let order = book.resolve_order(&avalanche_order(loans.iter().copied()), |_| false);
        let upfront = book.settle(&order, 0);
        let freed = book.freed_by(&upfront);
        let outcome = ScenarioOutcome {
            remaining_debt: book.total_balance(),
            payoff_month: (!book.any_active()).then_some(0),
            ..ScenarioOutcome::default()
        };
        Self {
            book,
            order,
            pay_down,
            freed,
            outcome,
        }
    }

    fn step(&mut self, month: u32, extra_monthly: f64, monthly_return: f64) {
        let charges = self.book.pay_minimums(month);
        self.outcome.interest_paid += charges.interest;

        let budget = extra_monthly + self.freed;
        let contribution = if self.pay_down {
            self.book.apply_surplus(&self.order, budget)
        } else {
            budget
        };
        self.outcome.portfolio = compound(self.outcome.portfolio, contribution, monthly_return);
        self.outcome.total_invested += contribution;

        let newly = self.book.settle(&self.order, month);
        self.freed += self.book.freed_by(&newly);
        self.outcome.remaining_debt = self.book.total_balance();
        if self.outcome.payoff_month.is_none() && !self.book.any_active() {
            debug!(
                "{} scenario debt free in month {}",
                if self.pay_down { "pay-down" } else { "invest-now" },
                month
            );
            self.outcome.payoff_month = Some(month);
        }
    }
}

/// Runs the invest-now and pay-down scenarios side by side over the target loans.
/// Loans outside the target set are identical in both scenarios and left out.
pub fn compare_wealth(loans: &[Loan], input: &WealthComparisonInput) -> WealthComparison {
    let targets: Vec<&Loan> = loans
        .iter()
        .filter(|l| input.target_ids.contains(&l.id))
        .collect();
    let horizon = input
        .horizon_months
        .unwrap_or_else(|| {
            targets
                .iter()
                .map(|l| l.remaining_term_months)
                .max()
                .unwrap_or(0)
        })
        .min(MONTH_CAP);

    let mut invest_now = Track::new(&targets, false);
    let mut pay_down = Track::new(&targets, true);
    let mut timeline = Vec::new();

    for month in 1..=horizon {
        invest_now.step(month, input.extra_monthly, input.monthly_return);
        pay_down.step(month, input.extra_monthly, input.monthly_return);
        trace!(
            "month {}, invest-now {:.2}, pay-down {:.2}",
            month,
            invest_now.outcome.portfolio,
            pay_down.outcome.portfolio
        );
        if is_sampled_month(month, horizon) {
            timeline.push(WealthPoint {
                month,
                invest_now_portfolio: invest_now.outcome.portfolio,
                invest_now_debt: invest_now.outcome.remaining_debt,
                pay_down_portfolio: pay_down.outcome.portfolio,
                pay_down_debt: pay_down.outcome.remaining_debt,
            });
        }
    }

    let net_benefit = pay_down.outcome.portfolio - invest_now.outcome.portfolio;
    let recommendation = if net_benefit > 0. {
        Recommendation::PayLoans
    } else {
        Recommendation::Invest
    };
    info!(
        "{} target loans over {} months: net benefit of paying down {:.2}, {}",
        targets.len(),
        horizon,
        net_benefit,
        recommendation
    );

    WealthComparison {
        horizon_months: horizon,
        invest_now: invest_now.outcome,
        pay_down: pay_down.outcome,
        net_benefit,
        recommendation,
        timeline,
    }
}

/// Investing the extra amount for a fixed number of months against the interest
/// the same amount would save under avalanche.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OpportunityCost {
    pub extra_monthly: f64,
    pub months: u32,
    pub invested_value: f64,
    pub investment_earnings: f64,
    /// What the existing portfolio yields per month today.
    pub current_monthly_income: f64,
    pub interest_saved: f64,
    pub months_saved: i64,
    /// Investment earnings minus interest saved; positive means investing wins.
    pub net_benefit: f64,
    pub recommendation: Recommendation,
}

pub fn opportunity_cost(
    loans: &[Loan],
    investments: &[Investment],
    extra_monthly: f64,
    months: u32,
    today: NaiveDate,
) -> OpportunityCost {
    let monthly_return = blended_monthly_return(investments);

    let invested_value =
        (0..months).fold(0., |value, _| compound(value, extra_monthly, monthly_return));
    let investment_earnings = invested_value - extra_monthly * f64::from(months);

    let with_extra = avalanche(loans, extra_monthly, today);
    let without = avalanche(loans, 0., today);
    let interest_saved = without.total_interest - with_extra.total_interest;
    let months_saved = i64::from(without.total_months) - i64::from(with_extra.total_months);

    let net_benefit = investment_earnings - interest_saved;
    OpportunityCost {
        extra_monthly,
        months,
        invested_value,
        investment_earnings,
        current_monthly_income: portfolio_value(investments) * monthly_return,
        interest_saved,
        months_saved,
        net_benefit,
        recommendation: if net_benefit > 0. {
            Recommendation::Invest
        } else {
            Recommendation::PayLoans
        },
    }
}
