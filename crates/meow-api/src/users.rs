use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use meow_types::api::CreateUserRequest;
use meow_types::models::validate_member;

use crate::convert;
use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn create_user(
    State(state): State<AppState>,
    Path(space_id): Path<Uuid>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (name, avatar_color) = validate_member(&req.name, &req.avatar_color).map_err(ApiError::Validation)?;

    let user_id = Uuid::new_v4().to_string();
    let row = blocking(&state, move |db| {
        let space_id = space_id.to_string();
        if db.get_space_by_id(&space_id)?.is_none() {
            return Err(ApiError::NotFound("space"));
        }
        Ok(db.create_user(&user_id, &space_id, &name, &avatar_color)?)
    })
    .await?;

    info!("{} joined space {}", row.name, row.space_id);
    Ok((StatusCode::CREATED, Json(convert::user(row))))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = blocking(&state, move |db| {
        db.get_user_by_id(&user_id.to_string())?.ok_or(ApiError::NotFound("user"))
    })
    .await?;

    Ok(Json(convert::user(row)))
}
