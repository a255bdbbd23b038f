use anyhow::Context;
use bytes::Bytes;
use uuid::Uuid;

use crate::error::ApiError;
use crate::reports::repo_types::NewReport;
use crate::state::AppState;

/// Raw multipart fields of a submission, before validation.
#[derive(Debug, Default)]
pub struct SubmissionFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
}

impl SubmissionFields {
    /// Checks required fields and coordinate syntax.
    pub fn validate(self) -> Result<NewReport, ApiError> {
        let title = non_empty(self.title)
            .ok_or_else(|| ApiError::Validation("title is required".into()))?;
        let category = non_empty(self.category)
            .ok_or_else(|| ApiError::Validation("category is required".into()))?;
        let lat = parse_coord(self.lat, "lat")?;
        let lng = parse_coord(self.lng, "lng")?;
        let description = non_empty(self.description);
        Ok(NewReport {
            title,
            description,
            category,
            lat,
            lng,
            photo_url: None,
        })
    }
}

fn non_empty(field: Option<String>) -> Option<String> {
    field
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_coord(field: Option<String>, name: &str) -> Result<f64, ApiError> {
    let raw = field.ok_or_else(|| ApiError::Validation(format!("{name} is required")))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ApiError::Validation(format!("{name} must be a number")))
}

/// The rating domain is checked here, before anything touches the store.
pub fn validate_urgency(level: i32) -> Result<u8, ApiError> {
    if !(1..=5).contains(&level) {
        return Err(ApiError::Validation(
            "Urgency level must be between 1 and 5".into(),
        ));
    }
    Ok(level as u8)
}

/// Uploads a submitted photo and returns its URL. Callers treat failure as
/// non-fatal and store the report without a photo.
pub async fn store_photo(
    state: &AppState,
    body: Bytes,
    content_type: &str,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    let key = format!("reports/{}.{}", Uuid::new_v4(), ext);
    state
        .storage
        .put_object(&key, body, content_type)
        .await
        .with_context(|| format!("put_object {}", key))
}

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}
