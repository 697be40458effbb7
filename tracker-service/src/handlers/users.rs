use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::users::{CreateUserRequest, UpdateUserRequest};
use crate::models::{User, UserResponse};
use crate::startup::AppState;
use crate::utils::hash_password;

pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    if state.db.find_user_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict(anyhow::anyhow!("Email already exists")));
    }

    let password_hash = hash_password(&req.password)?;
    let user = User::new(req.email, password_hash, req.display_name);
    state.db.insert_user(&user).await?;

    tracing::info!(user_id = %user.user_id, "User registered");

    Ok((StatusCode::CREATED, Json(user.sanitized())))
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let users = state.db.list_users().await?;
    let sanitized: Vec<UserResponse> = users.iter().map(User::sanitized).collect();
    Ok(Json(sanitized))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .db
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User {} not found", user_id)))?;
    Ok(Json(user.sanitized()))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate()?;

    if let Some(email) = &req.email {
        if let Some(existing) = state.db.find_user_by_email(email).await? {
            if existing.user_id != user_id {
                return Err(AppError::Conflict(anyhow::anyhow!("Email already exists")));
            }
        }
    }

    let password_hash = match &req.password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let user = state
        .db
        .update_user_profile(
            user_id,
            req.email.as_deref(),
            req.display_name.as_deref(),
            password_hash.as_deref(),
        )
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User {} not found", user_id)))?;

    Ok(Json(user.sanitized()))
}

pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    if !state.db.delete_user(user_id).await? {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "User {} not found",
            user_id
        )));
    }
    Ok(StatusCode::NO_CONTENT)
}
