use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use service_core::error::AppError;

use crate::dtos::transactions::SyncResponse;
use crate::middleware::AuthUser;
use crate::startup::AppState;

/// Pull card-notification emails for the authenticated user and persist
/// the transactions they describe.
pub async fn sync_card_emails(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let transactions = state
        .ingest
        .sync_email(user.user_id)
        .await
        .map_err(AppError::from)?;

    Ok(Json(SyncResponse {
        count: transactions.len(),
        transactions,
    }))
}
