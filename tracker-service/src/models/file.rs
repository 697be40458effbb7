//! Upload metadata: one row per ingested spreadsheet.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct FileRecord {
    pub file_id: Uuid,
    pub stored_name: String,
    pub original_name: String,
    pub file_size: i64,
    pub content_sha256: String,
    pub card_company_id: Uuid,
    pub user_id: Uuid,
    pub created_utc: DateTime<Utc>,
}

impl FileRecord {
    pub fn new(
        original_name: String,
        file_size: i64,
        content_sha256: String,
        card_company_id: Uuid,
        user_id: Uuid,
    ) -> Self {
        let file_id = Uuid::new_v4();
        Self {
            file_id,
            // Collision-resistant stored name; the original name is kept verbatim.
            stored_name: format!("{}-{}", file_id, original_name),
            original_name,
            file_size,
            content_sha256,
            card_company_id,
            user_id,
            created_utc: Utc::now(),
        }
    }
}
