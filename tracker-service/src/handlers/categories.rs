use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::reference::{CreateCategoryRequest, UpdateCategoryRequest};
use crate::models::Category;
use crate::startup::AppState;

pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let category = Category::new(req.category_name);
    state.db.insert_category(&category).await?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.db.list_active_categories().await?))
}

pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let category = state
        .db
        .find_category_by_id(category_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Category {} not found", category_id)))?;
    Ok(Json(category))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(req): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    let category = state
        .db
        .update_category(category_id, req.category_name.as_deref(), req.is_active)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Category {} not found", category_id)))?;
    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.deactivate_category(category_id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "Category {} not found",
            category_id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
