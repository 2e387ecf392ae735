use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

use meow_types::api::UpsertAnswerRequest;
use meow_types::events::RealtimeEvent;
use meow_types::models::{AnswerEntry, Question, parse_options};

use crate::convert;
use crate::error::ApiError;
use crate::state::{AppState, blocking};

#[derive(Debug, Deserialize)]
pub struct AnswerQuery {
    pub question_id: Option<Uuid>,
}

pub async fn get_questions(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = blocking(&state, |db| Ok(db.get_questions()?)).await?;
    let questions: Vec<Question> = rows.into_iter().map(convert::question).collect();
    Ok(Json(questions))
}

/// Answers of a space, newest first. With `question_id`, only that question's answers.
pub async fn get_answers(
    State(state): State<AppState>,
    Path(space_id): Path<Uuid>,
    Query(query): Query<AnswerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = blocking(&state, move |db| {
        let question_id = query.question_id.map(|q| q.to_string());
        Ok(db.get_answers(&space_id.to_string(), question_id.as_deref())?)
    })
    .await?;

    let answers: Vec<AnswerEntry> = rows.into_iter().map(convert::answer_entry).collect();
    Ok(Json(answers))
}

pub async fn upsert_answer(
    State(state): State<AppState>,
    Path(space_id): Path<Uuid>,
    Json(req): Json<UpsertAnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let answer_id = Uuid::new_v4().to_string();
    let UpsertAnswerRequest {
        user_id,
        question_id,
        selected_option_index,
    } = req;

    let row = blocking(&state, move |db| {
        let question = db
            .get_question(&question_id.to_string())?
            .ok_or(ApiError::NotFound("question"))?;
        let option_count = parse_options(&question.options).len();
        if selected_option_index as usize >= option_count {
            return Err(ApiError::Validation(format!(
                "option {selected_option_index} out of range (question has {option_count})"
            )));
        }

        let space = space_id.to_string();
        let belongs = db
            .get_user_by_id(&user_id.to_string())?
            .is_some_and(|u| u.space_id == space);
        if !belongs {
            return Err(ApiError::Validation("user does not belong to this space".into()));
        }

        Ok(db.upsert_answer(
            &answer_id,
            &user_id.to_string(),
            &space,
            &question_id.to_string(),
            selected_option_index,
        )?)
    })
    .await?;

    state.dispatcher.broadcast(RealtimeEvent::AnswerChanged {
        space_id,
        question_id,
        user_id,
    });

    Ok(Json(convert::answer_entry(row).answer))
}
