use log::{debug, trace};
use std::fmt;

use crate::book::Account;
use crate::interest::{is_paid_off, monthly_interest, MONTH_CAP};

/// Loan priority the surrounding application uses to mark a loan as
/// minimum-payment-only for good.
pub const AUTOPILOT_PRIORITY: u32 = 9999;

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Loan {
    pub id: String,
    pub name: String,
    pub balance: f64,
    pub annual_rate: f64, // nominal annual rate as percent (i.e., 2.5, 7.0)
    pub monthly_fee: f64,
    pub monthly_payment: f64,
    pub remaining_term_months: u32,
    pub fixed_rate_months: u32, // 0 when the rate is not fixed
    pub rate_after_fixed: Option<f64>,
    pub priority: u32,
}

impl Loan {
    pub fn new(id: &str, balance: f64, annual_rate: f64, monthly_payment: f64) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            balance,
            annual_rate,
            monthly_fee: 0.,
            monthly_payment,
            remaining_term_months: 0,
            fixed_rate_months: 0,
            rate_after_fixed: None,
            priority: 1,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_fee(mut self, monthly_fee: f64) -> Self {
        self.monthly_fee = monthly_fee;
        self
    }

    pub fn with_term(mut self, remaining_term_months: u32) -> Self {
        self.remaining_term_months = remaining_term_months;
        self
    }

    pub fn with_fixed_rate(mut self, months: u32, rate_after: Option<f64>) -> Self {
        self.fixed_rate_months = months;
        self.rate_after_fixed = rate_after;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_autopilot_priority(&self) -> bool {
        self.priority >= AUTOPILOT_PRIORITY
    }

    /// Month-by-month schedule paying only the configured monthly payment, until
    /// the balance is paid off or the month cap is reached. A payment that never
    /// covers the interest runs to the cap without reaching zero.
    pub fn amortization(&self) -> Vec<AmortizationRow> {
        let mut account = Account::from_loan(self);
        let mut schedule = Vec::new();
        let mut month = 0;

        while !is_paid_off(account.balance) && month < MONTH_CAP {
            month += 1;
            let charge = account.pay_scheduled(month);
            trace!(
                "{} month {}, interest {}, principal {}, end bal {}",
                self.id,
                month,
                charge.interest,
                charge.principal,
                account.balance
            );
            schedule.push(AmortizationRow {
                month,
                payment: charge.payment,
                principal: charge.principal,
                interest: charge.interest,
                fees: charge.fee,
                remaining_balance: account.balance,
            });
        }
        debug!("{} amortized over {} months", self.id, month);
        schedule
    }

    /// Whether the scheduled payments clear the balance before the month cap.
    pub fn pays_off_within_cap(&self) -> bool {
        self.amortization()
            .last()
            .map_or(true, |row| is_paid_off(row.remaining_balance))
    }

    pub fn show_amortization(&self) {
        for row in self.amortization() {
            println!("{}", row);
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmortizationRow {
    pub month: u32,
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    pub fees: f64,
    pub remaining_balance: f64,
}

impl fmt::Display for AmortizationRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "month {}, payment {:.2}, principal {:.2}, interest {:.2}, fees {:.2}, remaining balance {:.2}",
            self.month, self.payment, self.principal, self.interest, self.fees, self.remaining_balance
        )
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Investment {
    pub id: String,
    pub current_value: f64,
    pub average_net_return: f64, // annual, percent
}

impl Investment {
    pub fn new(id: &str, current_value: f64, average_net_return: f64) -> Self {
        Self {
            id: id.to_string(),
            current_value,
            average_net_return,
        }
    }
}

/// Sum of the investments' current values.
pub fn portfolio_value(investments: &[Investment]) -> f64 {
    investments.iter().map(|i| i.current_value).sum()
}

/// Headline numbers for a set of loans as they stand today.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebtSummary {
    pub total_debt: f64,
    pub total_monthly_payment: f64,
    pub total_monthly_interest: f64,
    pub longest_term_months: u32,
}

impl DebtSummary {
    pub fn from_loans(loans: &[Loan]) -> Self {
        loans.iter().fold(DebtSummary::default(), |acc, loan| DebtSummary {
            total_debt: acc.total_debt + loan.balance,
            total_monthly_payment: acc.total_monthly_payment + loan.monthly_payment,
            total_monthly_interest: acc.total_monthly_interest
                + monthly_interest(loan.balance, loan.annual_rate),
            longest_term_months: acc.longest_term_months.max(loan.remaining_term_months),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{portfolio_value, DebtSummary, Investment, Loan};
    use crate::interest::MONTH_CAP;
    use test_log::test;

    fn assert_approx(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    #[test]
    fn test_zero_rate_schedule_length() {
        let loan = Loan::new("1", 10000., 0., 2000.);
        let schedule = loan.amortization();
        assert_eq!(schedule.len(), 5);
        assert_eq!(schedule[4].remaining_balance, 0.);
        assert!(loan.pays_off_within_cap());
    }

    #[test]
    fn test_schedule_ends_with_zero_balance() {
        let loan = Loan::new("1", 10000., 5., 5000.);
        let schedule = loan.amortization();
        assert_eq!(schedule.len(), 3);
        let last = schedule.last().unwrap();
        assert_approx(last.remaining_balance, 0., 1e-9);
        // final payment is capped at what is owed
        assert!(last.payment < 5000.);
        assert_approx(last.payment, last.principal + last.interest, 1e-9);
    }

    #[test]
    fn test_first_month_interest() {
        let loan = Loan::new("1", 100000., 6., 2000.);
        let schedule = loan.amortization();
        assert_approx(schedule[0].interest, 500., 1e-9);
        assert_approx(schedule[0].principal, 1500., 1e-9);
        assert_approx(schedule[0].remaining_balance, 98500., 1e-9);
    }

    #[test]
    fn test_fees_in_each_month() {
        let loan = Loan::new("1", 100000., 5., 2000.).with_fee(50.);
        let schedule = loan.amortization();
        assert!(schedule.iter().all(|row| row.fees == 50.));
        assert_approx(
            schedule[0].principal,
            2000. - 50. - 100000. * 5. / 1200.,
            1e-9,
        );
    }

    #[test]
    fn test_rate_switch_after_fixed_period() {
        let loan = Loan::new("1", 12000., 0., 1000.).with_fixed_rate(2, Some(12.));
        let schedule = loan.amortization();
        assert_eq!(schedule[0].interest, 0.);
        assert_eq!(schedule[1].interest, 0.);
        assert_approx(schedule[2].interest, 100., 1e-9);
        assert_approx(schedule[2].remaining_balance, 9100., 1e-9);
        assert!(schedule[3..].iter().all(|row| row.interest > 0.));
    }

    #[test]
    fn test_unreachable_payoff_runs_to_cap() {
        let loan = Loan::new("1", 100000., 12., 500.);
        let schedule = loan.amortization();
        assert_eq!(schedule.len(), MONTH_CAP as usize);
        assert_eq!(schedule.last().unwrap().remaining_balance, 100000.);
        assert!(!loan.pays_off_within_cap());
    }

    #[test]
    fn test_paid_off_loan_has_empty_schedule() {
        let loan = Loan::new("1", 0., 5., 500.);
        assert!(loan.amortization().is_empty());
        assert!(loan.pays_off_within_cap());
    }

    #[test]
    fn test_row_display() {
        let loan = Loan::new("1", 100000., 6., 2000.).with_fee(25.);
        let schedule = loan.amortization();
        assert_eq!(
            schedule[0].to_string(),
            "month 1, payment 2000.00, principal 1475.00, interest 500.00, fees 25.00, remaining balance 98525.00"
        );
    }

    #[test]
    fn test_debt_summary() {
        let loans = vec![
            Loan::new("house", 120000., 6., 1500.).with_term(240),
            Loan::new("car", 24000., 3., 800.).with_term(36),
        ];
        let summary = DebtSummary::from_loans(&loans);
        assert_eq!(summary.total_debt, 144000.);
        assert_eq!(summary.total_monthly_payment, 2300.);
        assert_approx(summary.total_monthly_interest, 600. + 60., 1e-9);
        assert_eq!(summary.longest_term_months, 240);
        assert_eq!(DebtSummary::from_loans(&[]), DebtSummary::default());
    }

    #[test]
    fn test_portfolio_value() {
        let investments = vec![Investment::new("a", 1500., 7.), Investment::new("b", 500., 4.)];
        assert_eq!(portfolio_value(&investments), 2000.);
    }

    #[test]
    fn test_autopilot_priority() {
        assert!(!Loan::new("1", 1., 1., 1.).is_autopilot_priority());
        assert!(Loan::new("1", 1., 1., 1.)
            .with_priority(9999)
            .is_autopilot_priority());
    }
}

#[cfg(test)]
mod props {
    use super::Loan;
    use crate::interest::MONTH_CAP;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_zero_rate_schedule_length(balance in 1u32..1_000_000, payment in 1u32..50_000) {
            let loan = Loan::new("p", balance as f64, 0., payment as f64);
            let schedule = loan.amortization();
            let months = (balance + payment - 1) / payment;
            prop_assert_eq!(schedule.len() as u32, months.min(MONTH_CAP));
            if months <= MONTH_CAP {
                prop_assert_eq!(schedule.last().map(|r| r.remaining_balance), Some(0.));
            }
            prop_assert!(schedule.iter().all(|r| r.remaining_balance >= 0.));
        }
    }
}
