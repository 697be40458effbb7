use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::reference::{CreateCardCompanyRequest, UpdateCardCompanyRequest};
use crate::models::{CardCompany, IssuerCode};
use crate::startup::AppState;

pub async fn create_card_company(
    State(state): State<AppState>,
    Json(req): Json<CreateCardCompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let code = IssuerCode::from_code(&req.company_code).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Unsupported issuer code: {}",
            req.company_code
        ))
    })?;

    if state
        .db
        .find_card_company_by_code(code.as_str())
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Card company {} already exists",
            code
        )));
    }

    let company = CardCompany::new(req.company_name, code);
    state.db.insert_card_company(&company).await?;

    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn list_card_companies(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.list_active_card_companies().await?))
}

pub async fn get_card_company(
    State(state): State<AppState>,
    Path(card_company_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let company = state
        .db
        .find_card_company_by_id(card_company_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Card company {} not found", card_company_id))
        })?;
    Ok(Json(company))
}

pub async fn update_card_company(
    State(state): State<AppState>,
    Path(card_company_id): Path<Uuid>,
    Json(req): Json<UpdateCardCompanyRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let company = state
        .db
        .update_card_company(card_company_id, req.company_name.as_deref(), req.is_active)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(anyhow::anyhow!("Card company {} not found", card_company_id))
        })?;
    Ok(Json(company))
}

/// Soft delete: transactions keep a non-nullable reference to the row.
pub async fn delete_card_company(
    State(state): State<AppState>,
    Path(card_company_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.deactivate_card_company(card_company_id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Card company {} not found",
            card_company_id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
