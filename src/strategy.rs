use chrono::NaiveDate;
use log::{info, trace};
use std::{fmt, str::FromStr};

use crate::book::Book;
use crate::error::FinanceError;
use crate::interest::{month_start, MONTH_CAP};
use crate::loan::Loan;

/// Tag of a payoff ordering policy, as a saved scenario stores it.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum StrategyKind {
    Snowball,
    Avalanche,
    Custom,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            StrategyKind::Snowball => "snowball",
            StrategyKind::Avalanche => "avalanche",
            StrategyKind::Custom => "custom",
        };
        write!(f, "{}", tag)
    }
}

impl FromStr for StrategyKind {
    type Err = FinanceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "snowball" => Ok(StrategyKind::Snowball),
            "avalanche" => Ok(StrategyKind::Avalanche),
            "custom" => Ok(StrategyKind::Custom),
            _ => Err(FinanceError::UnknownStrategy(s.to_string())),
        }
    }
}

/// A payoff ordering policy. Every variant produces a visiting order that is fed
/// to the same simulation.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strategy {
    /// Smallest current balance first.
    Snowball,
    /// Highest nominal rate first.
    Avalanche,
    /// Caller-supplied loan ids. Loans missing from the list are visited last.
    Custom(Vec<String>),
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::Snowball => StrategyKind::Snowball,
            Strategy::Avalanche => StrategyKind::Avalanche,
            Strategy::Custom(_) => StrategyKind::Custom,
        }
    }

    pub fn order(&self, loans: &[Loan]) -> Vec<String> {
        match self {
            Strategy::Snowball => snowball_order(loans),
            Strategy::Avalanche => avalanche_order(loans),
            Strategy::Custom(order) => order.clone(),
        }
    }

    pub fn run(&self, loans: &[Loan], extra_monthly: f64, today: NaiveDate) -> StrategyResult {
        simulate(loans, extra_monthly, &self.order(loans), today)
    }
}

/// Loan ids by ascending balance. Ties keep input order.
pub fn snowball_order<'a>(loans: impl IntoIterator<Item = &'a Loan>) -> Vec<String> {
    let mut ordered: Vec<&Loan> = loans.into_iter().collect();
    ordered.sort_by(|a, b| a.balance.total_cmp(&b.balance));
    ordered.into_iter().map(|l| l.id.clone()).collect()
}

/// Loan ids by descending nominal rate. Ties keep input order.
pub fn avalanche_order<'a>(loans: impl IntoIterator<Item = &'a Loan>) -> Vec<String> {
    let mut ordered: Vec<&Loan> = loans.into_iter().collect();
    ordered.sort_by(|a, b| b.annual_rate.total_cmp(&a.annual_rate));
    ordered.into_iter().map(|l| l.id.clone()).collect()
}

/// How a simulation stopped.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Outcome {
    /// Every loan reached the paid-off threshold.
    DebtFree,
    /// The month cap was hit with at least one loan still owing.
    MonthCap,
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MonthlySnapshot {
    pub month: u32,
    pub total_balance: f64,
    pub total_interest_paid: f64,
    pub loans_remaining: usize,
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrategyResult {
    /// Loan ids in the order they were paid off, followed by any still owing at the cap.
    pub payoff_order: Vec<String>,
    pub total_months: u32,
    pub total_interest: f64,
    pub total_fees: f64,
    pub total_paid: f64,
    pub debt_free_date: NaiveDate,
    pub outcome: Outcome,
    pub timeline: Vec<MonthlySnapshot>,
}

/// Pays every loan its minimum each month, then cascades `extra_monthly` plus the
/// minimums freed by loans already paid off down `order`.
pub fn simulate(
    loans: &[Loan],
    extra_monthly: f64,
    order: &[String],
    today: NaiveDate,
) -> StrategyResult {
    let mut book = Book::new(loans);
    let visit = book.resolve_order(order, |_| false);

    let mut payoff_order = Vec::with_capacity(visit.len());
    let mut timeline = Vec::new();
    let mut total_interest = 0.;
    let mut total_fees = 0.;
    let mut total_paid = 0.;
    let mut month = 0;

    // loans that start out paid off free their payment from the first month
    let upfront = book.settle(&visit, month);
    let mut freed = book.freed_by(&upfront);
    payoff_order.extend(upfront.iter().map(|&i| book.accounts()[i].id.clone()));

    while book.any_active() && month < MONTH_CAP {
        month += 1;
        let charges = book.pay_minimums(month);
        let budget = extra_monthly + freed;
        let unspent = book.apply_surplus(&visit, budget);

        total_interest += charges.interest;
        total_fees += charges.fees;
        total_paid += charges.paid + (budget - unspent);

        let newly = book.settle(&visit, month);
        freed += book.freed_by(&newly);
        payoff_order.extend(newly.iter().map(|&i| book.accounts()[i].id.clone()));

        let total_balance = book.total_balance();
        trace!(
            "month {}, budget {:.2}, balance {:.2}, interest to date {:.2}",
            month,
            budget,
            total_balance,
            total_interest
        );
        timeline.push(MonthlySnapshot {
            month,
            total_balance,
            total_interest_paid: total_interest,
            loans_remaining: book.active_count(),
        });
    }

    let outcome = if book.any_active() {
        Outcome::MonthCap
    } else {
        Outcome::DebtFree
    };
    for &i in &visit {
        let account = &book.accounts()[i];
        if !account.paid_off {
            payoff_order.push(account.id.clone());
        }
    }

    info!(
        "{} loans: {:?} after {} months, interest {:.2}, fees {:.2}, paid {:.2}",
        visit.len(),
        outcome,
        month,
        total_interest,
        total_fees,
        total_paid
    );

    StrategyResult {
        payoff_order,
        total_months: month,
        total_interest,
        total_fees,
        total_paid,
        debt_free_date: month_start(today, month),
        outcome,
        timeline,
    }
}

pub fn snowball(loans: &[Loan], extra_monthly: f64, today: NaiveDate) -> StrategyResult {
    Strategy::Snowball.run(loans, extra_monthly, today)
}

pub fn avalanche(loans: &[Loan], extra_monthly: f64, today: NaiveDate) -> StrategyResult {
    Strategy::Avalanche.run(loans, extra_monthly, today)
}

pub fn custom(
    loans: &[Loan],
    extra_monthly: f64,
    order: &[String],
    today: NaiveDate,
) -> StrategyResult {
    simulate(loans, extra_monthly, order, today)
}

/// Minimum payments only, visiting loans in input order.
pub fn minimum_only(loans: &[Loan], today: NaiveDate) -> StrategyResult {
    let order: Vec<String> = loans.iter().map(|l| l.id.clone()).collect();
    simulate(loans, 0., &order, today)
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PayoffComparison {
    pub snowball: StrategyResult,
    pub avalanche: StrategyResult,
    pub minimum_only: StrategyResult,
}

impl PayoffComparison {
    pub fn new(loans: &[Loan], extra_monthly: f64, today: NaiveDate) -> Self {
        Self {
            snowball: snowball(loans, extra_monthly, today),
            avalanche: avalanche(loans, extra_monthly, today),
            minimum_only: minimum_only(loans, today),
        }
    }

    /// Interest avoided by `result` relative to paying minimums only.
    pub fn interest_saved(&self, result: &StrategyResult) -> f64 {
        self.minimum_only.total_interest - result.total_interest
    }

    pub fn months_saved(&self, result: &StrategyResult) -> i64 {
        i64::from(self.minimum_only.total_months) - i64::from(result.total_months)
    }

    /// Avalanche unless snowball is strictly cheaper.
    pub fn best(&self) -> StrategyKind {
        if self.avalanche.total_interest <= self.snowball.total_interest {
            StrategyKind::Avalanche
        } else {
            StrategyKind::Snowball
        }
    }
}

/// A named strategy configuration as the application saves it.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scenario {
    pub name: String,
    pub kind: StrategyKind,
    pub extra_monthly: f64,
    pub custom_order: Vec<String>,
}

impl Scenario {
    pub fn new(name: &str, kind: StrategyKind, extra_monthly: f64) -> Self {
        Self {
            name: name.to_string(),
            kind,
            extra_monthly,
            custom_order: Vec::new(),
        }
    }

    pub fn with_custom_order(mut self, order: Vec<String>) -> Self {
        self.custom_order = order;
        self
    }

    pub fn strategy(&self) -> Strategy {
        match self.kind {
            StrategyKind::Snowball => Strategy::Snowball,
            StrategyKind::Avalanche => Strategy::Avalanche,
            StrategyKind::Custom => Strategy::Custom(self.custom_order.clone()),
        }
    }

    pub fn run(&self, loans: &[Loan], today: NaiveDate) -> StrategyResult {
        info!("running scenario {:?} ({})", self.name, self.kind);
        self.strategy().run(loans, self.extra_monthly, today)
    }
}


#[cfg(test)]
mod props {
    use super::{avalanche, simulate, snowball};
    use crate::loan::Loan;
    use chrono::NaiveDate;
    use proptest::collection::vec;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    fn build(specs: &[(u32, u32, u32)]) -> Vec<Loan> {
        specs
            .iter()
            .enumerate()
            .map(|(i, &(balance, rate_bp, payment))| {
                Loan::new(
                    &format!("loan-{i}"),
                    balance as f64,
                    rate_bp as f64 / 100.,
                    payment as f64,
                )
            })
            .collect()
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(32))]

        #[test]
        fn prop_payoff_order_is_a_permutation(
            specs in vec((0u32..200_000, 0u32..2000, 50u32..5000), 0..6),
            extra in 0u32..3000
        ) {
            let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
            let loans = build(&specs);
            for result in [snowball(&loans, extra as f64, today), avalanche(&loans, extra as f64, today)] {
                let mut order = result.payoff_order.clone();
                order.sort();
                let mut expected: Vec<String> = loans.iter().map(|l| l.id.clone()).collect();
                expected.sort();
                prop_assert_eq!(order, expected);
                prop_assert!(result.total_interest >= 0.);
                prop_assert!(result.timeline.iter().all(|s| s.total_balance >= 0.));
            }
        }

        #[test]
        fn prop_extra_payment_never_adds_interest(
            specs in vec((1_000u32..100_000, 0u32..1500, 200u32..3000), 1..5),
            extra in 0u32..3000
        ) {
            let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
            let loans = build(&specs);
            let order = super::avalanche_order(&loans);
            let with_extra = simulate(&loans, extra as f64, &order, today);
            let without = simulate(&loans, 0., &order, today);
            prop_assert!(with_extra.total_interest <= without.total_interest + 1e-6);
            prop_assert!(with_extra.total_months <= without.total_months);
        }
    }
}
