use chrono::{Datelike, Months, NaiveDate};

use crate::loan::Investment;

/// Hard upper bound on simulated months (50 years).
pub const MONTH_CAP: u32 = 600;

/// A balance at or below this amount counts as paid off.
pub const PAID_OFF_EPSILON: f64 = 0.01;

/// Monthly interest charged on `balance` at a nominal annual rate given in percent
/// (i.e., 2.5, 7.0).
pub fn monthly_interest(balance: f64, annual_rate: f64) -> f64 {
    balance * annual_rate / 100. / 12.
}

/// Value-weighted average of the investments' annual net return, as a monthly
/// decimal rate. Returns 0 when the investments hold no value.
pub fn blended_monthly_return(investments: &[Investment]) -> f64 {
    blended_annual_return(investments) / 100. / 12.
}

/// Value-weighted average annual net return in percent.
pub fn blended_annual_return(investments: &[Investment]) -> f64 {
    let total: f64 = investments.iter().map(|i| i.current_value).sum();
    if total <= 0. {
        return 0.;
    }
    investments
        .iter()
        .map(|i| i.current_value * i.average_net_return)
        .sum::<f64>()
        / total
}

/// One month of contribution followed by compounding.
pub fn compound(portfolio: f64, contribution: f64, monthly_return: f64) -> f64 {
    (portfolio + contribution) * (1. + monthly_return)
}

pub(crate) fn is_paid_off(balance: f64) -> bool {
    balance <= PAID_OFF_EPSILON
}

/// First day of the month `months` after the month containing `today`.
/// Saturates at `NaiveDate::MAX`.
pub fn month_start(today: NaiveDate, months: u32) -> NaiveDate {
    today
        .with_day(1)
        .and_then(|first| first.checked_add_months(Months::new(months)))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::{
        blended_annual_return, blended_monthly_return, compound, is_paid_off, month_start,
        monthly_interest,
    };
    use crate::loan::Investment;
    use chrono::NaiveDate;
    use test_log::test;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_monthly_interest() {
        assert_approx(monthly_interest(100000., 6.), 500.);
        assert_eq!(monthly_interest(100000., 0.), 0.);
        assert_eq!(monthly_interest(0., 5.), 0.);
    }

    #[test]
    fn test_blended_return() {
        let investments = vec![
            Investment::new("fund", 30000., 8.),
            Investment::new("loans", 10000., 12.),
        ];
        // (30000 * 8 + 10000 * 12) / 40000 = 9
        assert_approx(blended_annual_return(&investments), 9.);
        assert_approx(blended_monthly_return(&investments), 0.0075);
    }

    #[test]
    fn test_blended_return_without_value() {
        assert_eq!(blended_monthly_return(&[]), 0.);
        let empty = vec![Investment::new("fund", 0., 8.)];
        assert_eq!(blended_monthly_return(&empty), 0.);
    }

    #[test]
    fn test_compound() {
        assert_approx(compound(1000., 100., 0.01), 1111.);
        assert_approx(compound(1000., 0., 0.), 1000.);
    }

    #[test]
    fn test_paid_off_threshold() {
        assert!(is_paid_off(0.));
        assert!(is_paid_off(0.01));
        assert!(!is_paid_off(0.011));
    }

    #[test]
    fn test_month_start() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        assert_eq!(
            month_start(today, 0),
            NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()
        );
        assert_eq!(
            month_start(today, 3),
            NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()
        );
        assert_eq!(
            month_start(today, 600),
            NaiveDate::from_ymd_opt(2076, 10, 1).unwrap()
        );
    }
}

#[cfg(test)]
mod props {
    use super::monthly_interest;
    use proptest::prelude::{prop_assert, proptest};

    proptest! {
        #[test]
        fn prop_monthly_interest_matches_formula(balance in 0u32..5_000_000, rate_bp in 0u32..3000) {
            let balance = balance as f64;
            let rate = rate_bp as f64 / 100.;
            let interest = monthly_interest(balance, rate);
            prop_assert!((interest - balance * rate / 1200.).abs() <= 1e-6);
            prop_assert!(interest >= 0.);
        }
    }
}
