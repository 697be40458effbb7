//! Card transactions, created only by the ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: Uuid,
    pub occurred_utc: DateTime<Utc>,
    pub merchant_name: String,
    pub amount: i64,
    pub card_company_id: Uuid,
    pub category_id: Uuid,
    pub user_id: Uuid,
    /// Set for spreadsheet-sourced rows, null for email-sourced ones.
    pub file_id: Option<Uuid>,
    /// Set for email-sourced rows; unique so re-syncs skip duplicates.
    pub gmail_message_id: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl Transaction {
    /// Build a transaction from a spreadsheet row.
    pub fn from_upload(
        occurred_utc: DateTime<Utc>,
        merchant_name: String,
        amount: i64,
        card_company_id: Uuid,
        category_id: Uuid,
        user_id: Uuid,
        file_id: Uuid,
    ) -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            occurred_utc,
            merchant_name,
            amount,
            card_company_id,
            category_id,
            user_id,
            file_id: Some(file_id),
            gmail_message_id: None,
            created_utc: Utc::now(),
        }
    }

    /// Build a transaction from a parsed notification email.
    pub fn from_email(
        occurred_utc: DateTime<Utc>,
        merchant_name: String,
        amount: i64,
        card_company_id: Uuid,
        category_id: Uuid,
        user_id: Uuid,
        gmail_message_id: String,
    ) -> Self {
        Self {
            transaction_id: Uuid::new_v4(),
            occurred_utc,
            merchant_name,
            amount,
            card_company_id,
            category_id,
            user_id,
            file_id: None,
            gmail_message_id: Some(gmail_message_id),
            created_utc: Utc::now(),
        }
    }
}
