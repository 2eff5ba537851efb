//! Headline numbers for the dashboard view

use serde::Serialize;

use crate::auth::User;
use crate::missions::{MissionStatus, UserMission};
use crate::nfts::Nft;

/// Counts shown on the dashboard, computed from cached collections only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub completed_missions: usize,
    pub in_progress_missions: usize,
    pub owned_nfts: usize,
    pub claimed_nfts: usize,
    pub points: i64,
}

impl DashboardSummary {
    pub fn compute(user: Option<&User>, user_missions: &[UserMission], nfts: &[Nft]) -> Self {
        let count = |status: MissionStatus| {
            user_missions
                .iter()
                .filter(|m| m.status == status)
                .count()
        };

        Self {
            completed_missions: count(MissionStatus::Completed),
            in_progress_missions: count(MissionStatus::InProgress),
            owned_nfts: nfts.len(),
            claimed_nfts: nfts.iter().filter(|n| n.is_claimed()).count(),
            points: user.map(|u| u.points).unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_by_server_status() {
        let missions: Vec<UserMission> = serde_json::from_value(json!([
            { "id": 1, "user_id": 7, "mission_id": 10, "status": "completed" },
            { "id": 2, "user_id": 7, "mission_id": 11, "status": "in_progress" },
            { "id": 3, "user_id": 7, "mission_id": 12, "status": "waiting" },
            { "id": 4, "user_id": 7, "mission_id": 13, "status": "rejected" }
        ]))
        .unwrap();
        let nfts: Vec<Nft> = serde_json::from_value(json!([
            { "id": 1, "status": "claimed" },
            { "id": 2, "status": "unclaimed" }
        ]))
        .unwrap();
        let user: User = serde_json::from_value(json!({
            "id": 7, "name": "Sari", "email": "sari@example.com", "points": 320
        }))
        .unwrap();

        let summary = DashboardSummary::compute(Some(&user), &missions, &nfts);
        assert_eq!(
            summary,
            DashboardSummary {
                completed_missions: 1,
                in_progress_missions: 1,
                owned_nfts: 2,
                claimed_nfts: 1,
                points: 320,
            }
        );
    }

    #[test]
    fn signed_out_summary_is_empty() {
        assert_eq!(DashboardSummary::compute(None, &[], &[]), DashboardSummary::default());
    }
}
