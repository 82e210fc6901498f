use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Coordinates supplied alongside an upload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

/// Stored analysis document.
#[derive(Debug, Clone, FromRow)]
pub struct AnalysisRecord {
    pub id: Uuid,
    #[sqlx(rename = "created_at")]
    pub timestamp: OffsetDateTime,
    pub original_filename: String,
    pub image_base64: String,
    pub food_data: serde_json::Value,
    pub analysis_date: String,
    pub user_session: Option<String>,
    pub location_data: Option<sqlx::types::Json<Location>>,
}

/// Everything needed to insert a record; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub timestamp: OffsetDateTime,
    pub original_filename: String,
    pub image_base64: String,
    pub food_data: serde_json::Value,
    pub user_session: Option<String>,
    pub location_data: Option<Location>,
}
