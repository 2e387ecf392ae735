use std::future::Future;

use uuid::Uuid;

use meow_types::api::{CreateUserRequest, InsertMoodRequest, UpsertAnswerRequest};
use meow_types::models::{
    Answer, AnswerEntry, LATEST_MOODS_LIMIT, MOOD_HISTORY_LIMIT, Mood, MoodEntry, Question, Space, User,
    normalize_space_code,
};

use crate::error::{ClientError, Result};

/// Typed access to the backend tables. One method per backend operation;
/// every future is `Send` so page loads can run on spawned tasks.
pub trait Backend: Send + Sync + 'static {
    /// Create a space with a freshly generated code.
    fn create_space(&self) -> impl Future<Output = Result<Space>> + Send;

    /// Look a space up by invite code. Malformed codes fail with
    /// `Validation` before anything is sent.
    fn get_space_by_code(&self, code: &str) -> impl Future<Output = Result<Space>> + Send;

    fn get_space(&self, space_id: Uuid) -> impl Future<Output = Result<Space>> + Send;

    fn create_user(&self, space_id: Uuid, req: CreateUserRequest) -> impl Future<Output = Result<User>> + Send;

    fn get_user(&self, user_id: Uuid) -> impl Future<Output = Result<User>> + Send;

    fn insert_mood(&self, space_id: Uuid, req: InsertMoodRequest) -> impl Future<Output = Result<Mood>> + Send;

    /// Up to `limit` moods of a space, newest first.
    fn moods(&self, space_id: Uuid, limit: u32) -> impl Future<Output = Result<Vec<MoodEntry>>> + Send;

    fn questions(&self) -> impl Future<Output = Result<Vec<Question>>> + Send;

    /// Answers of a space, newest first, optionally narrowed to one question.
    fn answers(
        &self,
        space_id: Uuid,
        question_id: Option<Uuid>,
    ) -> impl Future<Output = Result<Vec<AnswerEntry>>> + Send;

    /// Insert or overwrite the answer of `req.user_id` to `req.question_id`.
    fn upsert_answer(&self, space_id: Uuid, req: UpsertAnswerRequest) -> impl Future<Output = Result<Answer>> + Send;

    /// Just enough recent moods to find each user's current one.
    fn latest_moods(&self, space_id: Uuid) -> impl Future<Output = Result<Vec<MoodEntry>>> + Send {
        self.moods(space_id, LATEST_MOODS_LIMIT)
    }

    fn mood_history(&self, space_id: Uuid) -> impl Future<Output = Result<Vec<MoodEntry>>> + Send {
        self.moods(space_id, MOOD_HISTORY_LIMIT)
    }

    fn answers_for_question(
        &self,
        space_id: Uuid,
        question_id: Uuid,
    ) -> impl Future<Output = Result<Vec<AnswerEntry>>> + Send {
        self.answers(space_id, Some(question_id))
    }

    fn all_answers(&self, space_id: Uuid) -> impl Future<Output = Result<Vec<AnswerEntry>>> + Send {
        self.answers(space_id, None)
    }
}

/// Normalise an invite code or reject it as `Validation`.
pub fn parse_space_code(code: &str) -> Result<String> {
    normalize_space_code(code)
        .ok_or_else(|| ClientError::Validation(format!("'{}' is not a valid space code", code.trim())))
}
