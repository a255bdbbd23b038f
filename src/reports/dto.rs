use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::reports::repo_types::{Report, UrgencyVote};

/// Geographic point of an incident.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Serialize)]
pub struct ReportResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub location: Location,
    pub photo_url: Option<String>,
    pub status: String,
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
    pub assigned_to: Option<Uuid>,
    pub urgency_score: f64,
    pub urgency_votes_count: i32,
    pub urgency_votes: Vec<UrgencyVote>,
}

impl From<Report> for ReportResponse {
    fn from(r: Report) -> Self {
        let Json(urgency_votes) = r.urgency_votes;
        Self {
            id: r.id,
            title: r.title,
            description: r.description,
            category: r.category,
            location: Location {
                lat: r.lat,
                lng: r.lng,
            },
            photo_url: r.photo_url,
            status: r.status,
            created_at: r.created_at,
            updated_at: r.updated_at,
            assigned_to: r.assigned_to,
            urgency_score: r.urgency_score,
            urgency_votes_count: r.urgency_votes_count,
            urgency_votes,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    pub urgency_level: i32,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub ok: bool,
    pub report: ReportResponse,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
    pub deleted: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_response_nests_location() {
        let report = Report {
            id: Uuid::new_v4(),
            title: "Broken streetlight".into(),
            description: None,
            category: "lighting".into(),
            lat: 12.34,
            lng: 56.78,
            photo_url: None,
            status: "new".into(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: None,
            assigned_to: None,
            urgency_score: 0.0,
            urgency_votes_count: 0,
            urgency_votes: Json(Vec::new()),
        };
        let json = serde_json::to_value(ReportResponse::from(report)).unwrap();
        assert_eq!(json["location"]["lat"], 12.34);
        assert_eq!(json["location"]["lng"], 56.78);
        assert_eq!(json["status"], "new");
        assert_eq!(json["urgency_votes_count"], 0);
    }
}
