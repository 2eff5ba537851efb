//! Types for the points wallet

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Balances held for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wallet {
    pub id: u64,

    pub user_id: u64,

    /// Carbon credit balance, in tonnes
    #[serde(default)]
    pub carbon_nft: f64,

    #[serde(default)]
    pub points: i64,

    /// Cash balance in rupiah
    #[serde(default)]
    pub rupiah: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A cash-out request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdrawal {
    pub id: u64,

    pub user_id: u64,

    pub amount: f64,

    /// `pending`, `success` or `failed`
    pub status: String,

    /// E-wallet or bank account the money goes to
    pub target: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Withdrawal {
    pub fn is_pending(&self) -> bool {
        self.status == "pending"
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct WithdrawRequest<'a> {
    pub user_id: u64,
    pub amount: f64,
    pub target: &'a str,
}
