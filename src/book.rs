use log::{debug, trace};
use std::collections::HashMap;

use crate::interest::{is_paid_off, monthly_interest};
use crate::loan::Loan;

/// What one month's scheduled payment did to an account.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub(crate) struct MonthCharge {
    pub payment: f64,
    pub principal: f64,
    pub interest: f64,
    pub fee: f64,
}

/// Mutable copy of one loan for the duration of a single simulation.
#[derive(Clone, Debug)]
pub(crate) struct Account {
    pub id: String,
    pub balance: f64,
    pub minimum: f64,
    pub fee: f64,
    pub paid_off: bool,
    pub paid_this_month: f64,
    rate: f64,
    fixed_rate_months: u32,
    rate_after_fixed: Option<f64>,
}

impl Account {
    pub fn from_loan(loan: &Loan) -> Self {
        Self {
            id: loan.id.clone(),
            balance: loan.balance,
            minimum: loan.monthly_payment,
            fee: loan.monthly_fee,
            paid_off: false,
            paid_this_month: 0.,
            rate: loan.annual_rate,
            fixed_rate_months: loan.fixed_rate_months,
            rate_after_fixed: loan.rate_after_fixed,
        }
    }

    /// Nominal annual rate in effect for the 1-based `month`. Once the fixed period
    /// has run out the post-fixed rate applies for every later month.
    pub fn rate_for(&self, month: u32) -> f64 {
        match self.rate_after_fixed {
            Some(after) if self.fixed_rate_months > 0 && month > self.fixed_rate_months => after,
            _ => self.rate,
        }
    }

    /// Accrues a month of interest and pays the scheduled amount, capped so the
    /// final month never overpays.
    pub fn pay_scheduled(&mut self, month: u32) -> MonthCharge {
        let interest = monthly_interest(self.balance, self.rate_for(month));
        let payment = self.minimum.min(self.balance + interest + self.fee);
        let principal = (payment - interest - self.fee).max(0.);
        self.balance = (self.balance - principal).max(0.);
        self.paid_this_month += payment;
        MonthCharge {
            payment,
            principal,
            interest,
            fee: self.fee,
        }
    }

    /// Pays down principal from `budget` and returns the amount used.
    pub fn pay_extra(&mut self, budget: f64) -> f64 {
        let extra = budget.min(self.balance);
        self.balance = (self.balance - extra).max(0.);
        self.paid_this_month += extra;
        extra
    }

    pub fn is_active(&self) -> bool {
        !self.paid_off && !is_paid_off(self.balance)
    }
}

/// Totals of the scheduled payments made in one month.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub(crate) struct MonthTotals {
    pub interest: f64,
    pub fees: f64,
    pub paid: f64,
}

/// Per-loan working state for one simulation call, with an id to index lookup.
/// Built fresh from the input loans every call and dropped at the end.
#[derive(Clone, Debug, Default)]
pub(crate) struct Book {
    accounts: Vec<Account>,
    index: HashMap<String, usize>,
}

impl Book {
    pub fn new<'a>(loans: impl IntoIterator<Item = &'a Loan>) -> Self {
        let mut book = Book::default();
        for loan in loans {
            if book.index.contains_key(&loan.id) {
                continue;
            }
            book.index.insert(loan.id.clone(), book.accounts.len());
            book.accounts.push(Account::from_loan(loan));
        }
        book
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Turns a caller-supplied id order into account indices. Unknown ids are
    /// ignored, repeated ids are visited once, and accounts the order leaves out
    /// follow in input order unless `excluded` rejects them.
    pub fn resolve_order(&self, order: &[String], excluded: impl Fn(&str) -> bool) -> Vec<usize> {
        let mut seen = vec![false; self.accounts.len()];
        let mut resolved = Vec::with_capacity(self.accounts.len());
        let named = order.iter().filter_map(|id| self.position(id));
        for i in named.chain(0..self.accounts.len()) {
            if seen[i] {
                continue;
            }
            seen[i] = true;
            if !excluded(&self.accounts[i].id) {
                resolved.push(i);
            }
        }
        resolved
    }

    /// Scheduled payment on every active account for the 1-based `month`.
    pub fn pay_minimums(&mut self, month: u32) -> MonthTotals {
        let mut totals = MonthTotals::default();
        for account in self.accounts.iter_mut() {
            account.paid_this_month = 0.;
            if !account.is_active() {
                continue;
            }
            let charge = account.pay_scheduled(month);
            totals.interest += charge.interest;
            totals.fees += charge.fee;
            totals.paid += charge.payment;
        }
        totals
    }

    /// Cascades `budget` down the accounts in `order`, skipping anything already
    /// paid off. Returns the unspent remainder.
    pub fn apply_surplus(&mut self, order: &[usize], mut budget: f64) -> f64 {
        for &i in order {
            if budget <= 0. {
                break;
            }
            let account = &mut self.accounts[i];
            if !account.is_active() {
                continue;
            }
            let used = account.pay_extra(budget);
            trace!("extra {:.2} to {}", used, account.id);
            budget -= used;
        }
        budget.max(0.)
    }

    /// Marks accounts whose balance has dropped to the paid-off threshold,
    /// visiting them in `order`. Returns the newly paid-off indices.
    pub fn settle(&mut self, order: &[usize], month: u32) -> Vec<usize> {
        let mut newly = Vec::new();
        for &i in order {
            let account = &mut self.accounts[i];
            if !account.paid_off && is_paid_off(account.balance) {
                account.paid_off = true;
                debug!("{} paid off in month {}", account.id, month);
                newly.push(i);
            }
        }
        newly
    }

    /// Minimum payments released by the given accounts.
    pub fn freed_by(&self, indices: &[usize]) -> f64 {
        indices.iter().map(|&i| self.accounts[i].minimum).sum()
    }

    pub fn total_balance(&self) -> f64 {
        self.accounts.iter().map(|a| a.balance).sum()
    }

    pub fn active_count(&self) -> usize {
        self.accounts.iter().filter(|a| a.is_active()).count()
    }

    pub fn any_active(&self) -> bool {
        self.accounts.iter().any(Account::is_active)
    }
}

#[cfg(test)]
mod tests {
    use super::Book;
    use crate::loan::Loan;
    use test_log::test;

    fn sample_book() -> Book {
        let loans = vec![
            Loan::new("a", 1000., 0., 100.),
            Loan::new("b", 500., 0., 50.),
            Loan::new("c", 0., 0., 75.),
        ];
        Book::new(&loans)
    }

    #[test]
    fn test_resolve_order_appends_missing() {
        let book = sample_book();
        let order = vec!["b".to_string(), "zz".to_string(), "b".to_string()];
        assert_eq!(book.resolve_order(&order, |_| false), vec![1, 0, 2]);
        assert_eq!(book.resolve_order(&order, |id| id == "a"), vec![1, 2]);
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let loans = vec![Loan::new("a", 1000., 0., 100.), Loan::new("a", 5., 0., 1.)];
        let book = Book::new(&loans);
        assert_eq!(book.accounts().len(), 1);
        assert_eq!(book.accounts()[0].balance, 1000.);
    }

    #[test]
    fn test_settle_and_surplus() {
        let mut book = sample_book();
        let order = book.resolve_order(&[], |_| false);

        let paid = book.settle(&order, 0);
        assert_eq!(paid, vec![2]);
        assert_eq!(book.freed_by(&paid), 75.);

        let totals = book.pay_minimums(1);
        assert_eq!(totals.paid, 150.);
        assert_eq!(totals.interest, 0.);

        let left = book.apply_surplus(&[1, 0], 500.);
        assert_eq!(left, 0.);
        assert_eq!(book.accounts()[1].balance, 0.);
        assert_eq!(book.accounts()[0].balance, 850.);
        assert_eq!(book.accounts()[1].paid_this_month, 500.);

        assert_eq!(book.settle(&order, 1), vec![1]);
        assert_eq!(book.active_count(), 1);
        assert_eq!(book.total_balance(), 850.);
    }

    #[test]
    fn test_fixed_rate_switch() {
        let loan = Loan::new("a", 12000., 3., 100.).with_fixed_rate(2, Some(6.));
        let book = Book::new([&loan]);
        let account = &book.accounts()[0];
        assert_eq!(account.rate_for(1), 3.);
        assert_eq!(account.rate_for(2), 3.);
        assert_eq!(account.rate_for(3), 6.);
        assert_eq!(account.rate_for(400), 6.);

        let no_after = Loan::new("b", 12000., 3., 100.).with_fixed_rate(2, None);
        let book = Book::new([&no_after]);
        assert_eq!(book.accounts()[0].rate_for(3), 3.);
    }
}
