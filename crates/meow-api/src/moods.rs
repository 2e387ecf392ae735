use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use meow_db::models::NewMood;
use meow_types::api::InsertMoodRequest;
use meow_types::events::RealtimeEvent;
use meow_types::models::{MOOD_HISTORY_LIMIT, MoodEntry, clean_note, clean_tags};

use crate::convert;
use crate::error::ApiError;
use crate::state::{AppState, blocking};

#[derive(Debug, Deserialize)]
pub struct MoodQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    MOOD_HISTORY_LIMIT
}

pub async fn insert_mood(
    State(state): State<AppState>,
    Path(space_id): Path<Uuid>,
    Json(req): Json<InsertMoodRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.emoji.trim().is_empty() || req.label.trim().is_empty() {
        return Err(ApiError::Validation("emoji and label are required".into()));
    }

    let mood_id = Uuid::new_v4();
    let user_id = req.user_id;
    let tags = serde_json::to_string(&clean_tags(&req.tags)).map_err(anyhow::Error::from)?;
    let note = clean_note(req.note.as_deref());

    let row = blocking(&state, move |db| {
        let space = space_id.to_string();
        let belongs = db
            .get_user_by_id(&user_id.to_string())?
            .is_some_and(|u| u.space_id == space);
        if !belongs {
            return Err(ApiError::Validation("user does not belong to this space".into()));
        }

        Ok(db.insert_mood(&NewMood {
            id: &mood_id.to_string(),
            user_id: &user_id.to_string(),
            space_id: &space,
            emoji: req.emoji.trim(),
            label: req.label.trim(),
            color: &req.color,
            tags: &tags,
            note: note.as_deref(),
        })?)
    })
    .await?;

    state.dispatcher.broadcast(RealtimeEvent::MoodInserted {
        space_id,
        mood_id,
        user_id,
    });

    Ok((StatusCode::CREATED, Json(convert::mood_entry(row).mood)))
}

pub async fn get_moods(
    State(state): State<AppState>,
    Path(space_id): Path<Uuid>,
    Query(query): Query<MoodQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query.limit.clamp(1, MOOD_HISTORY_LIMIT);

    let rows = blocking(&state, move |db| Ok(db.get_moods(&space_id.to_string(), limit)?)).await?;

    let moods: Vec<MoodEntry> = rows.into_iter().map(convert::mood_entry).collect();
    Ok(Json(moods))
}
