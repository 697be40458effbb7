//! Request/response shapes for transactions, uploads and Gmail sync.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{IssuerCode, Transaction};

#[derive(Debug, Deserialize)]
pub struct TransactionListParams {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    pub card_company_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<Transaction>,
    pub total: i64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub file_id: Uuid,
    pub issuer: IssuerCode,
    pub persisted: usize,
    /// Rows dropped for a bad date or empty merchant name.
    pub skipped: usize,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub count: usize,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Serialize)]
pub struct RecategorizeResponse {
    /// The classifier's raw suggestion; the stored category changes only
    /// when this names an active category.
    pub category: String,
}
