//! Spending-category reference data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub category_id: Uuid,
    pub category_name: String,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
}

impl Category {
    pub fn new(category_name: String) -> Self {
        Self {
            category_id: Uuid::new_v4(),
            category_name,
            is_active: true,
            created_utc: Utc::now(),
        }
    }
}
