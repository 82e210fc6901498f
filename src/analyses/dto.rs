use serde::Serialize;
use serde_json::{Map, Value};
use time::{macros::format_description, OffsetDateTime};

use super::repo_types::{AnalysisRecord, Location};
use crate::images::services::data_uri;

pub const HISTORY_LIMIT: i64 = 50;

/// `YYYY-MM-DD HH:MM:SS`, the format history entries carry.
pub fn format_timestamp(ts: OffsetDateTime) -> String {
    ts.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| ts.unix_timestamp().to_string())
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub food_data: Map<String, Value>,
    pub image_base64: String,
    pub original_filename: String,
}

/// A record as the history and detail endpoints present it.
#[derive(Debug, Serialize)]
pub struct AnalysisView {
    #[serde(rename = "_id")]
    pub id: String,
    pub timestamp: String,
    pub original_filename: String,
    pub image_base64: String,
    pub image_preview: String,
    pub food_data: Value,
    pub analysis_date: String,
    pub user_session: Option<String>,
    pub location_data: Option<Location>,
}

impl From<AnalysisRecord> for AnalysisView {
    fn from(r: AnalysisRecord) -> Self {
        let image_preview = data_uri(&r.original_filename, &r.image_base64);
        Self {
            id: r.id.to_string(),
            timestamp: format_timestamp(r.timestamp),
            original_filename: r.original_filename,
            image_base64: r.image_base64,
            image_preview,
            food_data: r.food_data,
            analysis_date: r.analysis_date,
            user_session: r.user_session,
            location_data: r.location_data.map(|j| j.0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub success: bool,
    pub analyses: Vec<AnalysisView>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub analysis: AnalysisView,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use uuid::Uuid;

    #[test]
    fn timestamp_uses_history_format() {
        assert_eq!(
            format_timestamp(datetime!(2024-03-07 09:05:01 UTC)),
            "2024-03-07 09:05:01"
        );
    }

    #[test]
    fn view_stringifies_id_and_adds_preview() {
        let id = Uuid::new_v4();
        let record = AnalysisRecord {
            id,
            timestamp: datetime!(2024-01-02 03:04:05 UTC),
            original_filename: "lunch.png".into(),
            image_base64: "iVBORw0".into(),
            food_data: serde_json::json!({ "food_name": "Salad" }),
            analysis_date: "2024-01-02 03:04:05".into(),
            user_session: None,
            location_data: Some(sqlx::types::Json(Location {
                latitude: 1.5,
                longitude: -2.0,
            })),
        };
        let json = serde_json::to_value(AnalysisView::from(record)).unwrap();
        assert_eq!(json["_id"], id.to_string());
        assert_eq!(json["timestamp"], "2024-01-02 03:04:05");
        assert_eq!(json["image_preview"], "data:image/png;base64,iVBORw0");
        assert_eq!(json["location_data"]["latitude"], 1.5);
        assert!(json.get("id").is_none());
    }
}
