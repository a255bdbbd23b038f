use anyhow::Context;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::reports::repo_types::{NewReport, Report, UrgencyVote};
use crate::reports::urgency::UrgencyTally;

pub async fn create(db: &PgPool, new: NewReport) -> anyhow::Result<Report> {
    let report = sqlx::query_as::<_, Report>(
        r#"
        INSERT INTO reports (title, description, category, lat, lng, photo_url)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, title, description, category, lat, lng, photo_url, status,
                  created_at, updated_at, assigned_to,
                  urgency_score, urgency_votes_count, urgency_votes
        "#,
    )
    .bind(&new.title)
    .bind(&new.description)
    .bind(&new.category)
    .bind(new.lat)
    .bind(new.lng)
    .bind(&new.photo_url)
    .fetch_one(db)
    .await?;
    Ok(report)
}

pub async fn get(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Report>> {
    let report = sqlx::query_as::<_, Report>(
        r#"
        SELECT id, title, description, category, lat, lng, photo_url, status,
               created_at, updated_at, assigned_to,
               urgency_score, urgency_votes_count, urgency_votes
        FROM reports
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(report)
}

pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Report>> {
    let rows = sqlx::query_as::<_, Report>(
        r#"
        SELECT id, title, description, category, lat, lng, photo_url, status,
               created_at, updated_at, assigned_to,
               urgency_score, urgency_votes_count, urgency_votes
        FROM reports
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn update_status(
    db: &PgPool,
    id: Uuid,
    status: &str,
) -> anyhow::Result<Option<Report>> {
    let report = sqlx::query_as::<_, Report>(
        r#"
        UPDATE reports
        SET status = $2, updated_at = now()
        WHERE id = $1
        RETURNING id, title, description, category, lat, lng, photo_url, status,
                  created_at, updated_at, assigned_to,
                  urgency_score, urgency_votes_count, urgency_votes
        "#,
    )
    .bind(id)
    .bind(status)
    .fetch_optional(db)
    .await?;
    Ok(report)
}

/// Assigning a report also moves it to acknowledged.
pub async fn assign(db: &PgPool, id: Uuid, assignee: Uuid) -> anyhow::Result<Option<Report>> {
    let report = sqlx::query_as::<_, Report>(
        r#"
        UPDATE reports
        SET assigned_to = $2, status = 'acknowledged', updated_at = now()
        WHERE id = $1
        RETURNING id, title, description, category, lat, lng, photo_url, status,
                  created_at, updated_at, assigned_to,
                  urgency_score, urgency_votes_count, urgency_votes
        "#,
    )
    .bind(id)
    .bind(assignee)
    .fetch_optional(db)
    .await?;
    Ok(report)
}

/// Hard delete; true when the report existed.
pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM reports WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Folds one urgency vote into a report. The row lock makes the
/// read-aggregate-write indivisible, so concurrent votes on the same report
/// serialize instead of losing updates.
pub async fn merge_vote(
    db: &PgPool,
    id: Uuid,
    user_id: &str,
    value: u8,
) -> anyhow::Result<Option<Report>> {
    let mut tx = db.begin().await.context("begin vote tx")?;

    let row: Option<(f64, i32, Json<Vec<UrgencyVote>>)> = sqlx::query_as(
        r#"
        SELECT urgency_score, urgency_votes_count, urgency_votes
        FROM reports
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((score, count, Json(votes))) = row else {
        return Ok(None);
    };

    let mut tally = UrgencyTally::new(score, count, votes);
    tally.cast(user_id, value)?;

    let report = sqlx::query_as::<_, Report>(
        r#"
        UPDATE reports
        SET urgency_score = $2, urgency_votes_count = $3, urgency_votes = $4,
            updated_at = now()
        WHERE id = $1
        RETURNING id, title, description, category, lat, lng, photo_url, status,
                  created_at, updated_at, assigned_to,
                  urgency_score, urgency_votes_count, urgency_votes
        "#,
    )
    .bind(id)
    .bind(tally.score)
    .bind(tally.count)
    .bind(Json(tally.votes))
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await.context("commit vote tx")?;
    Ok(Some(report))
}
