//! PostgreSQL database service.
//!
//! Point lookups, filtered lists, single-row writes and the batch insert
//! used by file ingestion, over the five entity tables.

use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::QueryBuilder;
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{CardCompany, Category, FileRecord, Transaction, User};

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Database health check failed: {}", e);
                AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e))
            })?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // ==================== User Operations ====================

    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, password_hash, display_name, google_id,
                               picture_url, provider_code, gmail_access_token,
                               gmail_refresh_token, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.display_name)
        .bind(&user.google_id)
        .bind(&user.picture_url)
        .bind(&user.provider_code)
        .bind(&user.gmail_access_token)
        .bind(&user.gmail_refresh_token)
        .bind(user.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn find_user_by_google_id(&self, google_id: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE google_id = $1")
            .bind(google_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY created_utc")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Partial profile update; absent fields keep their current value.
    pub async fn update_user_profile(
        &self,
        user_id: Uuid,
        email: Option<&str>,
        display_name: Option<&str>,
        password_hash: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email = COALESCE($1, email),
                display_name = COALESCE($2, display_name),
                password_hash = COALESCE($3, password_hash)
            WHERE user_id = $4
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(display_name)
        .bind(password_hash)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Attach a Google identity to an existing (password) account.
    pub async fn attach_google_identity(
        &self,
        user_id: Uuid,
        google_id: &str,
        picture_url: Option<&str>,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET google_id = $1,
                picture_url = COALESCE($2, picture_url),
                provider_code = 'google'
            WHERE user_id = $3
            RETURNING *
            "#,
        )
        .bind(google_id)
        .bind(picture_url)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn update_gmail_tokens(
        &self,
        user_id: Uuid,
        access_token: &str,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE users
            SET gmail_access_token = $1,
                gmail_refresh_token = COALESCE($2, gmail_refresh_token)
            WHERE user_id = $3
            "#,
        )
        .bind(access_token)
        .bind(refresh_token)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== Card Company Operations ====================

    pub async fn insert_card_company(&self, company: &CardCompany) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO card_companies (card_company_id, company_name, company_code,
                                        is_active, created_utc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(company.card_company_id)
        .bind(&company.company_name)
        .bind(&company.company_code)
        .bind(company.is_active)
        .bind(company.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    pub async fn list_active_card_companies(&self) -> Result<Vec<CardCompany>, AppError> {
        sqlx::query_as::<_, CardCompany>(
            "SELECT * FROM card_companies WHERE is_active ORDER BY company_name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn find_card_company_by_id(
        &self,
        card_company_id: Uuid,
    ) -> Result<Option<CardCompany>, AppError> {
        sqlx::query_as::<_, CardCompany>(
            "SELECT * FROM card_companies WHERE card_company_id = $1",
        )
        .bind(card_company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn find_card_company_by_code(
        &self,
        company_code: &str,
    ) -> Result<Option<CardCompany>, AppError> {
        sqlx::query_as::<_, CardCompany>("SELECT * FROM card_companies WHERE company_code = $1")
            .bind(company_code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn update_card_company(
        &self,
        card_company_id: Uuid,
        company_name: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Option<CardCompany>, AppError> {
        sqlx::query_as::<_, CardCompany>(
            r#"
            UPDATE card_companies
            SET company_name = COALESCE($1, company_name),
                is_active = COALESCE($2, is_active)
            WHERE card_company_id = $3
            RETURNING *
            "#,
        )
        .bind(company_name)
        .bind(is_active)
        .bind(card_company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Soft delete: the row is kept because transactions reference it.
    pub async fn deactivate_card_company(&self, card_company_id: Uuid) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE card_companies SET is_active = FALSE WHERE card_company_id = $1")
                .bind(card_company_id)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== Category Operations ====================

    pub async fn insert_category(&self, category: &Category) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO categories (category_id, category_name, is_active, created_utc)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(category.category_id)
        .bind(&category.category_name)
        .bind(category.is_active)
        .bind(category.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    /// Active categories, oldest first, so "the first active category" is
    /// stable across calls.
    pub async fn list_active_categories(&self) -> Result<Vec<Category>, AppError> {
        sqlx::query_as::<_, Category>(
            "SELECT * FROM categories WHERE is_active ORDER BY created_utc",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn find_category_by_id(
        &self,
        category_id: Uuid,
    ) -> Result<Option<Category>, AppError> {
        sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE category_id = $1")
            .bind(category_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn update_category(
        &self,
        category_id: Uuid,
        category_name: Option<&str>,
        is_active: Option<bool>,
    ) -> Result<Option<Category>, AppError> {
        sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET category_name = COALESCE($1, category_name),
                is_active = COALESCE($2, is_active)
            WHERE category_id = $3
            RETURNING *
            "#,
        )
        .bind(category_name)
        .bind(is_active)
        .bind(category_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn deactivate_category(&self, category_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE categories SET is_active = FALSE WHERE category_id = $1")
            .bind(category_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected() > 0)
    }

    // ==================== File Operations ====================

    pub async fn insert_file(&self, file: &FileRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO files (file_id, stored_name, original_name, file_size,
                               content_sha256, card_company_id, user_id, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(file.file_id)
        .bind(&file.stored_name)
        .bind(&file.original_name)
        .bind(file.file_size)
        .bind(&file.content_sha256)
        .bind(file.card_company_id)
        .bind(file.user_id)
        .bind(file.created_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    pub async fn find_file_by_user_and_hash(
        &self,
        user_id: Uuid,
        content_sha256: &str,
    ) -> Result<Option<FileRecord>, AppError> {
        sqlx::query_as::<_, FileRecord>(
            "SELECT * FROM files WHERE user_id = $1 AND content_sha256 = $2",
        )
        .bind(user_id)
        .bind(content_sha256)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    // ==================== Transaction Operations ====================

    /// Batch insert for file ingestion: one statement, so the store's
    /// per-statement atomicity makes the batch all-or-nothing.
    pub async fn insert_transactions(&self, transactions: &[Transaction]) -> Result<u64, AppError> {
        if transactions.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::new(
            "INSERT INTO transactions (transaction_id, occurred_utc, merchant_name, amount, \
             card_company_id, category_id, user_id, file_id, gmail_message_id, created_utc) ",
        );
        builder.push_values(transactions, |mut row, tx| {
            row.push_bind(tx.transaction_id)
                .push_bind(tx.occurred_utc)
                .push_bind(&tx.merchant_name)
                .push_bind(tx.amount)
                .push_bind(tx.card_company_id)
                .push_bind(tx.category_id)
                .push_bind(tx.user_id)
                .push_bind(tx.file_id)
                .push_bind(&tx.gmail_message_id)
                .push_bind(tx.created_utc);
        });

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(result.rows_affected())
    }

    /// Single insert for email sync; an already-ingested Gmail message id
    /// is skipped and yields `None`.
    pub async fn insert_email_transaction(
        &self,
        transaction: &Transaction,
    ) -> Result<Option<Transaction>, AppError> {
        sqlx::query_as::<_, Transaction>(
            r#"
            INSERT INTO transactions (transaction_id, occurred_utc, merchant_name, amount,
                                      card_company_id, category_id, user_id, file_id,
                                      gmail_message_id, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (gmail_message_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(transaction.transaction_id)
        .bind(transaction.occurred_utc)
        .bind(&transaction.merchant_name)
        .bind(transaction.amount)
        .bind(transaction.card_company_id)
        .bind(transaction.category_id)
        .bind(transaction.user_id)
        .bind(transaction.file_id)
        .bind(&transaction.gmail_message_id)
        .bind(transaction.created_utc)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn find_transaction_by_id(
        &self,
        transaction_id: Uuid,
    ) -> Result<Option<Transaction>, AppError> {
        sqlx::query_as::<_, Transaction>("SELECT * FROM transactions WHERE transaction_id = $1")
            .bind(transaction_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn update_transaction_category(
        &self,
        transaction_id: Uuid,
        category_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE transactions SET category_id = $1 WHERE transaction_id = $2")
            .bind(category_id)
            .bind(transaction_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    pub async fn list_transactions(
        &self,
        user_id: Uuid,
        card_company_id: Option<Uuid>,
        category_id: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Transaction>, AppError> {
        sqlx::query_as::<_, Transaction>(
            r#"
            SELECT * FROM transactions
            WHERE user_id = $1
              AND ($2::uuid IS NULL OR card_company_id = $2)
              AND ($3::uuid IS NULL OR category_id = $3)
            ORDER BY occurred_utc DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(user_id)
        .bind(card_company_id)
        .bind(category_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn count_transactions(
        &self,
        user_id: Uuid,
        card_company_id: Option<Uuid>,
        category_id: Option<Uuid>,
    ) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM transactions
            WHERE user_id = $1
              AND ($2::uuid IS NULL OR card_company_id = $2)
              AND ($3::uuid IS NULL OR category_id = $3)
            "#,
        )
        .bind(user_id)
        .bind(card_company_id)
        .bind(category_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }
}
