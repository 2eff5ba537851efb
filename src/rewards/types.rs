//! Types for the rewards catalog

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An item users can redeem points for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardCatalogItem {
    pub id: u64,

    pub name: String,

    #[serde(default)]
    pub description: String,

    pub points_required: i64,

    /// Units left; the server rejects redemption at zero
    #[serde(default)]
    pub stock: i64,

    /// `voucher`, `merchandise`, `donation`...
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl RewardCatalogItem {
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Whether `points` is enough to redeem this item
    pub fn affordable(&self, points: i64) -> bool {
        points >= self.points_required
    }
}

/// A reward granted to a user, either for a mission or a redemption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub id: u64,

    pub user_id: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission_id: Option<u64>,

    #[serde(default)]
    pub points: i64,

    #[serde(default)]
    pub asset_type: String,

    #[serde(default)]
    pub asset_amount: f64,

    #[serde(default)]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body of a successful redemption
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RedeemResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct RedeemRequest {
    pub user_id: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn catalog_item_reads_type_field() {
        let item: RewardCatalogItem = serde_json::from_value(json!({
            "id": 3,
            "name": "Tree voucher",
            "description": "Plant one tree",
            "points_required": 150,
            "stock": 0,
            "type": "voucher"
        }))
        .unwrap();

        assert_eq!(item.kind, "voucher");
        assert!(!item.in_stock());
        assert!(item.affordable(150));
        assert!(!item.affordable(149));
    }
}
