use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// One voter's urgency rating. A report holds at most one entry per user;
/// a repeat vote overwrites the value in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrgencyVote {
    pub user_id: String,
    pub vote: u8, // 1..=5, validated before it gets here
}

/// Report record in the database. The vote sequence lives in a jsonb column
/// so the per-user ordering is stored and updated as one unit.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Report {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub lat: f64,
    pub lng: f64,
    pub photo_url: Option<String>,
    pub status: String, // open enumeration, admins may set anything
    pub created_at: OffsetDateTime,
    pub updated_at: Option<OffsetDateTime>,
    pub assigned_to: Option<Uuid>,
    pub urgency_score: f64,
    pub urgency_votes_count: i32,
    pub urgency_votes: Json<Vec<UrgencyVote>>,
}

/// Fields accepted from a submission; everything else is server-assigned.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub lat: f64,
    pub lng: f64,
    pub photo_url: Option<String>,
}
