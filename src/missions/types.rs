//! Types for missions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A task users can take, prove and have verified for points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mission {
    pub id: u64,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Points awarded on verification
    #[serde(default)]
    pub points: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,

    /// Kind of asset minted on completion, e.g. `NFT` or `Carbon`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_amount: Option<f64>,

    /// How completion is proven, e.g. `photo`, `gps` or `ocr`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Progress of a taken mission, as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MissionStatus {
    Waiting,
    InProgress,
    Completed,
    /// A status this client does not know; kept verbatim
    Other(String),
}

impl MissionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MissionStatus::Waiting => "waiting",
            MissionStatus::InProgress => "in_progress",
            MissionStatus::Completed => "completed",
            MissionStatus::Other(raw) => raw,
        }
    }
}

impl From<String> for MissionStatus {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "waiting" => MissionStatus::Waiting,
            "in_progress" => MissionStatus::InProgress,
            "completed" => MissionStatus::Completed,
            _ => MissionStatus::Other(raw),
        }
    }
}

impl From<MissionStatus> for String {
    fn from(status: MissionStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for MissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mission taken by the signed-in user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserMission {
    pub id: u64,

    #[serde(default)]
    pub user_id: u64,

    pub mission_id: u64,

    pub status: MissionStatus,

    /// Proof submitted for verification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_data: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gps: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a proof submission
#[derive(Serialize)]
pub(crate) struct SubmitProofRequest<'a, P: Serialize + ?Sized> {
    pub proof_data: &'a P,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_status_is_kept_verbatim() {
        let mission: UserMission = serde_json::from_value(json!({
            "id": 3,
            "mission_id": 9,
            "status": "pending",
            "proof_url": "https://cdn.example/p.jpg"
        }))
        .unwrap();

        assert_eq!(mission.status, MissionStatus::Other("pending".to_string()));
        assert_eq!(serde_json::to_value(&mission).unwrap()["status"], "pending");
    }

    #[test]
    fn known_statuses_parse() {
        let status: MissionStatus = serde_json::from_value(json!("in_progress")).unwrap();
        assert_eq!(status, MissionStatus::InProgress);
        assert_eq!(MissionStatus::Completed.to_string(), "completed");
    }
}
