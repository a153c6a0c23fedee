use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FinanceError {
    #[error("unknown strategy kind: {0:?} (expected snowball, avalanche or custom)")]
    UnknownStrategy(String),

    #[error("unknown recommendation: {0:?} (expected invest or pay_loans)")]
    UnknownRecommendation(String),
}
