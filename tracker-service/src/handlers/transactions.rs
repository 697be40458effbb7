use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use service_core::error::AppError;
use uuid::Uuid;

use crate::dtos::transactions::{
    RecategorizeResponse, TransactionListParams, TransactionListResponse,
};
use crate::middleware::AuthUser;
use crate::startup::AppState;

pub async fn list_transactions(
    State(state): State<AppState>,
    user: AuthUser,
    Query(params): Query<TransactionListParams>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * page_size;

    let transactions = state
        .db
        .list_transactions(
            user.user_id,
            params.card_company_id,
            params.category_id,
            page_size as i64,
            offset as i64,
        )
        .await?;

    let total = state
        .db
        .count_transactions(user.user_id, params.card_company_id, params.category_id)
        .await?;

    let total_pages = (total as f64 / page_size as f64).ceil() as u64;

    Ok(Json(TransactionListResponse {
        transactions,
        total,
        page,
        page_size,
        total_pages,
    }))
}

/// Re-run classification for one transaction. The raw suggestion is
/// returned even when it matches no active category and nothing changes.
pub async fn recategorize_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let category = state
        .ingest
        .recategorize(transaction_id)
        .await
        .map_err(AppError::from)?;

    Ok(Json(RecategorizeResponse { category }))
}
