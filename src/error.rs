//! Error taxonomy shared by every service operation.
//!
//! All failures reach callers as a typed [`CoreError`] wrapped in
//! `anyhow::Error`; callers that need to branch on the kind downcast
//! with `err.downcast_ref::<CoreError>()`.

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CoreError {
    #[error("Entity is locked by an ongoing pickup: {0}")]
    Locked(String),
    #[error("Invalid item selection: {0}")]
    InvalidSelection(String),
    #[error("Invalid lifecycle transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("Insufficient points: balance {balance}, reward costs {cost}")]
    InsufficientPoints { balance: u64, cost: u64 },
    #[error("Reward is out of stock")]
    OutOfStock,
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid item attributes: {0}")]
    InvalidDraft(String),
}
