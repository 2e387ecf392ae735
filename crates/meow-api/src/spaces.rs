use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use meow_types::models::{SPACE_CODE_LEN, generate_space_code, normalize_space_code};

use crate::convert;
use crate::error::ApiError;
use crate::state::{AppState, blocking};

pub async fn create_space(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let id = Uuid::new_v4().to_string();

    let row = blocking(&state, move |db| {
        db.create_space(&id, generate_space_code)?
            .ok_or_else(|| ApiError::Conflict("could not allocate a unique space code".into()))
    })
    .await?;

    info!("Created space {} ({})", row.code, row.id);
    Ok((StatusCode::CREATED, Json(convert::space(row))))
}

pub async fn get_space(
    State(state): State<AppState>,
    Path(space_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let row = blocking(&state, move |db| {
        db.get_space_by_id(&space_id.to_string())?.ok_or(ApiError::NotFound("space"))
    })
    .await?;

    Ok(Json(convert::space(row)))
}

pub async fn get_space_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let code = normalize_space_code(&code)
        .ok_or_else(|| ApiError::Validation(format!("space code must be {SPACE_CODE_LEN} letters or digits")))?;

    let row = blocking(&state, move |db| {
        db.get_space_by_code(&code)?.ok_or(ApiError::NotFound("space"))
    })
    .await?;

    Ok(Json(convert::space(row)))
}

