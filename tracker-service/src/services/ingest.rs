//! Ingestion orchestration: spreadsheet uploads, Gmail sync, and
//! recategorization.
//!
//! Structural failures (unreadable workbook, missing reference data,
//! unlinked Gmail) abort the call. Invalid rows are dropped per row and
//! reported only as a count. Classifier failures never abort ingestion;
//! they degrade every affected row to the default category.

use std::sync::Arc;

use serde::Serialize;
use service_core::error::AppError;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{GenaiConfig, GmailConfig};
use crate::models::{Category, FileRecord, IssuerCode, Transaction};
use crate::services::classifier::Categorizer;
use crate::services::database::Database;
use crate::services::gmail::{self, MailError, MailProvider};
use crate::services::providers::ProviderError;
use crate::services::spreadsheet::{self, RawRow, SpreadsheetError};
use crate::utils::normalize;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("acting user {0} does not exist")]
    UnknownUser(Uuid),

    #[error("no card company registered for issuer {0}")]
    UnknownIssuer(IssuerCode),

    #[error("no active category exists; create one before ingesting")]
    NoCategories,

    #[error("an identical file was already uploaded")]
    DuplicateUpload,

    #[error("gmail is not linked for this account; sign in with Google first")]
    GmailNotLinked,

    #[error("transaction {0} not found")]
    TransactionNotFound(Uuid),

    #[error(transparent)]
    Spreadsheet(#[from] SpreadsheetError),

    #[error("mail retrieval failed: {0}")]
    Mail(#[from] MailError),

    #[error("classification failed: {0}")]
    Classifier(#[from] ProviderError),

    #[error(transparent)]
    Storage(AppError),
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnknownUser(_) => AppError::NotFound(anyhow::anyhow!("{}", err)),
            IngestError::UnknownIssuer(_) => AppError::BadRequest(anyhow::anyhow!("{}", err)),
            IngestError::NoCategories => AppError::Conflict(anyhow::anyhow!("{}", err)),
            IngestError::DuplicateUpload => AppError::Conflict(anyhow::anyhow!("{}", err)),
            IngestError::GmailNotLinked => AppError::BadRequest(anyhow::anyhow!("{}", err)),
            IngestError::TransactionNotFound(_) => AppError::NotFound(anyhow::anyhow!("{}", err)),
            IngestError::Spreadsheet(e) => AppError::BadRequest(anyhow::anyhow!("{}", e)),
            IngestError::Mail(e) => AppError::BadGateway(e.to_string()),
            IngestError::Classifier(e) => AppError::BadGateway(e.to_string()),
            IngestError::Storage(e) => e,
        }
    }
}

/// Metadata accompanying an uploaded spreadsheet.
#[derive(Debug, Clone)]
pub struct UploadMeta {
    pub original_name: String,
    pub file_size: i64,
}

/// Outcome of a file ingestion: what was written and what was dropped.
#[derive(Debug, Clone, Serialize)]
pub struct IngestSummary {
    pub file_id: Uuid,
    pub issuer: IssuerCode,
    pub persisted: usize,
    pub skipped: usize,
}

/// A spreadsheet row that survived validation.
struct ValidRow {
    occurred_utc: chrono::DateTime<chrono::Utc>,
    merchant_name: String,
    amount: i64,
}

#[derive(Clone)]
pub struct IngestService {
    db: Database,
    categorizer: Categorizer,
    mail: Arc<dyn MailProvider>,
    genai: GenaiConfig,
    gmail: GmailConfig,
}

impl IngestService {
    pub fn new(
        db: Database,
        categorizer: Categorizer,
        mail: Arc<dyn MailProvider>,
        genai: GenaiConfig,
        gmail: GmailConfig,
    ) -> Self {
        Self {
            db,
            categorizer,
            mail,
            genai,
            gmail,
        }
    }

    // ==================== File upload path ====================

    /// Ingest an uploaded spreadsheet for the acting user.
    pub async fn ingest_file(
        &self,
        bytes: &[u8],
        user_id: Uuid,
        meta: UploadMeta,
    ) -> Result<IngestSummary, IngestError> {
        let rows: Vec<RawRow> = spreadsheet::extract_rows(bytes)?.collect();
        let content_sha256 = hex_digest(bytes);
        self.ingest_rows(user_id, meta, content_sha256, rows).await
    }

    /// Ingest already-extracted rows. Split out of [`ingest_file`] so the
    /// row pipeline can be exercised without crafting workbook bytes.
    pub async fn ingest_rows(
        &self,
        user_id: Uuid,
        meta: UploadMeta,
        content_sha256: String,
        rows: Vec<RawRow>,
    ) -> Result<IngestSummary, IngestError> {
        let user = self
            .db
            .find_user_by_id(user_id)
            .await
            .map_err(IngestError::Storage)?
            .ok_or(IngestError::UnknownUser(user_id))?;

        let issuer = IssuerCode::detect(&meta.original_name);
        let company = self
            .db
            .find_card_company_by_code(issuer.as_str())
            .await
            .map_err(IngestError::Storage)?
            .ok_or(IngestError::UnknownIssuer(issuer))?;

        // Row validation: a usable row has a parseable date and a
        // non-empty merchant name. Everything else is dropped here.
        let total = rows.len();
        let valid: Vec<ValidRow> = rows
            .into_iter()
            .filter_map(|row| {
                let occurred_utc = row.occurred()?;
                let merchant_name = row.merchant()?;
                Some(ValidRow {
                    occurred_utc,
                    merchant_name,
                    amount: row.amount_value(),
                })
            })
            .collect();
        let skipped = total - valid.len();

        if self
            .db
            .find_file_by_user_and_hash(user.user_id, &content_sha256)
            .await
            .map_err(IngestError::Storage)?
            .is_some()
        {
            return Err(IngestError::DuplicateUpload);
        }

        let file = FileRecord::new(
            meta.original_name,
            meta.file_size,
            content_sha256,
            company.card_company_id,
            user.user_id,
        );
        self.db
            .insert_file(&file)
            .await
            .map_err(IngestError::Storage)?;

        let categories = self
            .db
            .list_active_categories()
            .await
            .map_err(IngestError::Storage)?;
        let default_category = categories.first().ok_or(IngestError::NoCategories)?;

        let suggestions = self.suggest_batch(issuer, &valid, &categories).await;

        let transactions: Vec<Transaction> = valid
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let category_id = suggestions
                    .as_ref()
                    .and_then(|names| find_category(&categories, &names[i]))
                    .unwrap_or(default_category)
                    .category_id;
                Transaction::from_upload(
                    row.occurred_utc,
                    row.merchant_name.clone(),
                    row.amount,
                    company.card_company_id,
                    category_id,
                    user.user_id,
                    file.file_id,
                )
            })
            .collect();

        let persisted = self
            .db
            .insert_transactions(&transactions)
            .await
            .map_err(IngestError::Storage)? as usize;

        tracing::info!(
            issuer = %issuer,
            file_id = %file.file_id,
            persisted = persisted,
            skipped = skipped,
            "File ingestion completed"
        );

        Ok(IngestSummary {
            file_id: file.file_id,
            issuer,
            persisted,
            skipped,
        })
    }

    /// Batch classification with full degradation: any failure, including
    /// a line-count mismatch, falls back to the default category for the
    /// whole batch and is logged, never propagated.
    async fn suggest_batch(
        &self,
        issuer: IssuerCode,
        rows: &[ValidRow],
        categories: &[Category],
    ) -> Option<Vec<String>> {
        if !self.genai.enabled || rows.is_empty() {
            return None;
        }

        let merchants: Vec<String> = rows.iter().map(|r| r.merchant_name.clone()).collect();
        let names: Vec<String> = categories.iter().map(|c| c.category_name.clone()).collect();

        match self.categorizer.categorize_batch(&merchants, &names).await {
            Ok(suggestions) if suggestions.len() == merchants.len() => Some(suggestions),
            Ok(suggestions) => {
                tracing::warn!(
                    issuer = %issuer,
                    expected = merchants.len(),
                    received = suggestions.len(),
                    "Classification degraded: batch response line count mismatch, \
                     using default category"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    issuer = %issuer,
                    rows = merchants.len(),
                    error = %e,
                    "Classification degraded: batch call failed, using default category"
                );
                None
            }
        }
    }

    // ==================== Email sync path ====================

    /// Fetch card-notification emails for the user and persist one
    /// transaction per parseable message. Returns the persisted rows in
    /// message order.
    pub async fn sync_email(&self, user_id: Uuid) -> Result<Vec<Transaction>, IngestError> {
        let user = self
            .db
            .find_user_by_id(user_id)
            .await
            .map_err(IngestError::Storage)?
            .ok_or(IngestError::UnknownUser(user_id))?;

        let access_token = user
            .gmail_access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(IngestError::GmailNotLinked)?;

        let message_ids = self
            .mail
            .list_messages(access_token, &self.gmail.search_query, self.gmail.max_results)
            .await?;

        tracing::info!(
            user_id = %user.user_id,
            matched = message_ids.len(),
            "Gmail sync started"
        );

        let categories = self
            .db
            .list_active_categories()
            .await
            .map_err(IngestError::Storage)?;

        let mut persisted = Vec::new();

        for message_id in message_ids {
            let message = self.mail.get_message(access_token, &message_id).await?;

            let body = gmail::extract_body(&message);
            let Some(fields) = gmail::extract_fields(&body) else {
                continue;
            };

            let from = gmail::header(&message, "From").unwrap_or_default();
            let issuer = IssuerCode::detect(from);
            let Some(company) = self
                .db
                .find_card_company_by_code(issuer.as_str())
                .await
                .map_err(IngestError::Storage)?
            else {
                continue;
            };

            let Some(occurred_utc) = gmail::header(&message, "Date")
                .and_then(normalize::date_from_rfc2822)
            else {
                continue;
            };

            let default_category = categories.first().ok_or(IngestError::NoCategories)?;
            let names: Vec<String> =
                categories.iter().map(|c| c.category_name.clone()).collect();

            let category_id = match self
                .categorizer
                .categorize_one(&fields.merchant_name, &names)
                .await
            {
                Ok(suggestion) => find_category(&categories, &suggestion)
                    .unwrap_or(default_category)
                    .category_id,
                Err(e) => {
                    tracing::warn!(
                        issuer = %issuer,
                        message_id = %message_id,
                        error = %e,
                        "Classification degraded: using default category"
                    );
                    default_category.category_id
                }
            };

            let transaction = Transaction::from_email(
                occurred_utc,
                fields.merchant_name,
                fields.amount,
                company.card_company_id,
                category_id,
                user.user_id,
                message.id.clone(),
            );

            if let Some(saved) = self
                .db
                .insert_email_transaction(&transaction)
                .await
                .map_err(IngestError::Storage)?
            {
                persisted.push(saved);
            }
        }

        tracing::info!(
            user_id = %user.user_id,
            persisted = persisted.len(),
            "Gmail sync completed"
        );

        Ok(persisted)
    }

    // ==================== Recategorization ====================

    /// Re-run classification for one stored transaction. The category is
    /// updated only when the suggestion names an active category, but the
    /// raw suggestion is always returned.
    pub async fn recategorize(&self, transaction_id: Uuid) -> Result<String, IngestError> {
        let transaction = self
            .db
            .find_transaction_by_id(transaction_id)
            .await
            .map_err(IngestError::Storage)?
            .ok_or(IngestError::TransactionNotFound(transaction_id))?;

        let categories = self
            .db
            .list_active_categories()
            .await
            .map_err(IngestError::Storage)?;
        if categories.is_empty() {
            return Err(IngestError::NoCategories);
        }

        let names: Vec<String> = categories.iter().map(|c| c.category_name.clone()).collect();
        let suggestion = self
            .categorizer
            .categorize_one(&transaction.merchant_name, &names)
            .await?;

        if let Some(category) = find_category(&categories, &suggestion) {
            self.db
                .update_transaction_category(transaction_id, category.category_id)
                .await
                .map_err(IngestError::Storage)?;
            tracing::info!(
                transaction_id = %transaction_id,
                category = %category.category_name,
                "Transaction recategorized"
            );
        } else {
            tracing::info!(
                transaction_id = %transaction_id,
                suggestion = %suggestion,
                "Classifier suggestion matched no active category; keeping current one"
            );
        }

        Ok(suggestion)
    }
}

fn find_category<'a>(categories: &'a [Category], name: &str) -> Option<&'a Category> {
    categories.iter().find(|c| c.category_name == name)
}

fn hex_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
