//! Month-by-month simulation of paying down several loans while building an
//! investment portfolio: amortization schedules, snowball / avalanche / custom
//! payoff orderings, invest-versus-pay-down comparisons and a combined plan.
//!
//! Every simulation copies the loan balances into its own working state, so calls
//! are independent and may run in parallel. Loops stop at [`MONTH_CAP`] months.

mod book;
pub mod error;
pub mod interest;
pub mod loan;
pub mod plan;
pub mod strategy;
pub mod wealth;

pub use error::FinanceError;
pub use interest::{
    blended_annual_return, blended_monthly_return, monthly_interest, MONTH_CAP, PAID_OFF_EPSILON,
};
pub use loan::{AmortizationRow, DebtSummary, Investment, Loan, AUTOPILOT_PRIORITY};
pub use plan::{
    default_payoff_order, optimal_plan, suggest_autopilot, Milestone, MilestoneEvent, PlanInput,
    PlanMonth, PlanResult, PlanSummary,
};
pub use strategy::{
    Outcome, PayoffComparison, Scenario, Strategy, StrategyKind, StrategyResult,
};
pub use wealth::{
    compare_wealth, opportunity_cost, OpportunityCost, Recommendation, WealthComparison,
    WealthComparisonInput,
};
