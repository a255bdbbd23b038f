use axum::{
    extract::{multipart::Field, DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::services::{AdminUser, AuthUser},
    error::ApiError,
    reports::{
        dto::{DeleteResponse, ReportResponse, VoteRequest, VoteResponse},
        repo, services,
        services::SubmissionFields,
    },
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/reports", get(list_reports))
        .route("/reports/:id", get(get_report))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/reports", post(create_report))
        .route("/reports/:id/vote", post(vote_urgency))
        .route("/reports/admin/assign/:id/:user_id", post(assign_report))
        .route("/reports/admin/status/:id/:status", post(update_status))
        .route("/reports/admin/delete/:id", delete(delete_report))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024)) // 20MB
}

#[instrument(skip(state))]
pub async fn list_reports(
    State(state): State<AppState>,
    AuthUser(_identity): AuthUser,
) -> Result<Json<Vec<ReportResponse>>, ApiError> {
    let reports = repo::list(&state.db).await?;
    Ok(Json(reports.into_iter().map(ReportResponse::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_report(
    State(state): State<AppState>,
    AuthUser(_identity): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ReportResponse>, ApiError> {
    let id = parse_report_id(&id)?;
    let report = repo::get(&state.db, id)
        .await?
        .ok_or_else(report_not_found)?;
    Ok(Json(report.into()))
}

/// POST /reports (multipart): title, category, lat, lng required;
/// description and photo optional. Open to unauthenticated callers.
#[instrument(skip(state, mp))]
pub async fn create_report(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<ReportResponse>), ApiError> {
    let mut fields = SubmissionFields::default();
    let mut photo: Option<(Bytes, String)> = None;

    while let Ok(Some(field)) = mp.next_field().await {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("title") => fields.title = Some(text(field).await?),
            Some("description") => fields.description = Some(text(field).await?),
            Some("category") => fields.category = Some(text(field).await?),
            Some("lat") => fields.lat = Some(text(field).await?),
            Some("lng") => fields.lng = Some(text(field).await?),
            Some("photo") => {
                let content_type = field
                    .content_type()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "application/octet-stream".into());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("photo upload failed: {e}")))?;
                photo = Some((data, content_type));
            }
            _ => {}
        }
    }

    let mut new = fields.validate()?;

    // Blob-store trouble must not swallow the report itself.
    if let Some((body, content_type)) = photo {
        match services::store_photo(&state, body, &content_type).await {
            Ok(url) => new.photo_url = Some(url),
            Err(e) => warn!(error = %e, "photo upload failed; storing report without photo"),
        }
    }

    let report = repo::create(&state.db, new).await?;
    info!(report_id = %report.id, category = %report.category, "report submitted");
    Ok((StatusCode::CREATED, Json(report.into())))
}

#[instrument(skip(state, payload))]
pub async fn vote_urgency(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let value = services::validate_urgency(payload.urgency_level)?;
    let id = parse_report_id(&id)?;

    let report = repo::merge_vote(&state.db, id, &identity.subject, value)
        .await?
        .ok_or_else(report_not_found)?;

    info!(report_id = %id, voter = %identity.subject, value = %value, "urgency vote recorded");
    Ok(Json(VoteResponse {
        ok: true,
        report: report.into(),
    }))
}

#[instrument(skip(state))]
pub async fn assign_report(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<Json<ReportResponse>, ApiError> {
    let id = parse_report_id(&id)?;
    let assignee: Uuid = user_id
        .parse()
        .map_err(|_| ApiError::Validation("Invalid assignee id".into()))?;

    let report = repo::assign(&state.db, id, assignee)
        .await?
        .ok_or_else(report_not_found)?;

    info!(report_id = %id, assignee = %assignee, admin = %admin.subject, "report assigned");
    Ok(Json(report.into()))
}

#[instrument(skip(state))]
pub async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path((id, status)): Path<(String, String)>,
) -> Result<Json<ReportResponse>, ApiError> {
    let id = parse_report_id(&id)?;

    let report = repo::update_status(&state.db, id, &status)
        .await?
        .ok_or_else(report_not_found)?;

    info!(report_id = %id, status = %status, admin = %admin.subject, "report status updated");
    Ok(Json(report.into()))
}

#[instrument(skip(state))]
pub async fn delete_report(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let id = parse_report_id(&id)?;

    if !repo::delete(&state.db, id).await? {
        return Err(report_not_found());
    }

    info!(report_id = %id, admin = %admin.subject, "report deleted");
    Ok(Json(DeleteResponse {
        ok: true,
        deleted: id,
    }))
}

async fn text(field: Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::Validation(format!("invalid form field: {e}")))
}

/// Malformed ids behave like absent ones.
fn parse_report_id(raw: &str) -> Result<Uuid, ApiError> {
    raw.parse().map_err(|_| report_not_found())
}

fn report_not_found() -> ApiError {
    ApiError::NotFound("Report not found".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_report_id_reads_as_not_found() {
        let err = parse_report_id("definitely-not-a-uuid").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        // Syntactically valid ids parse fine; absence is the store's call.
        let id = Uuid::new_v4();
        assert_eq!(parse_report_id(&id.to_string()).unwrap(), id);
    }
}
