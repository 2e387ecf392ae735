use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use uuid::Uuid;

use meow_types::api::{CreateUserRequest, InsertMoodRequest, UpsertAnswerRequest};
use meow_types::events::{RealtimeEvent, Table};
use meow_types::models::{
    Answer, AnswerEntry, Author, MOOD_HISTORY_LIMIT, Mood, MoodEntry, Question, QuestionRef, SPACE_CODE_ATTEMPTS,
    Space, User, clean_note, clean_tags, generate_space_code, validate_member,
};

use crate::backend::{Backend, parse_space_code};
use crate::error::{ClientError, Result};
use crate::realtime::{ChangeEvent, ChangeFeed, Subscription};

/// In-process backend with the same rules as the service: code generation,
/// membership checks, tag and note cleanup, history limits and answer
/// upserts. It is also its own [`ChangeFeed`].
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

struct Inner {
    tables: Mutex<Tables>,
    events: broadcast::Sender<RealtimeEvent>,
}

#[derive(Default)]
struct Tables {
    spaces: Vec<Space>,
    users: Vec<User>,
    moods: Vec<Mood>,
    questions: Vec<Question>,
    answers: Vec<Answer>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                tables: Mutex::new(Tables::default()),
                events,
            }),
        }
    }

    /// Seed the question deck.
    pub fn with_questions(self, questions: Vec<Question>) -> Self {
        self.tables().questions = questions;
        self
    }

    /// Insert a mood with an explicit timestamp. Bypasses validation; for
    /// building fixtures with history.
    pub fn insert_mood_at(&self, space_id: Uuid, req: InsertMoodRequest, created_at: DateTime<Utc>) -> Mood {
        let mood = Mood {
            id: Uuid::new_v4(),
            user_id: req.user_id,
            space_id,
            emoji: req.emoji,
            label: req.label,
            color: req.color,
            tags: clean_tags(&req.tags),
            note: clean_note(req.note.as_deref()),
            created_at,
        };
        self.tables().moods.push(mood.clone());
        mood
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.inner.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, event: RealtimeEvent) {
        // No listeners is fine
        let _ = self.inner.events.send(event);
    }
}

impl Tables {
    fn author(&self, user_id: Uuid) -> Option<Author> {
        self.users.iter().find(|u| u.id == user_id).map(|u| Author {
            name: u.name.clone(),
            avatar_color: u.avatar_color.clone(),
        })
    }

    fn member_of(&self, user_id: Uuid, space_id: Uuid) -> bool {
        self.users.iter().any(|u| u.id == user_id && u.space_id == space_id)
    }
}

/// Newest first; later inserts win timestamp ties, matching rowid order.
fn newest_first<T>(items: &mut [(usize, T)], at: impl Fn(&T) -> DateTime<Utc>) {
    items.sort_by(|(ia, a), (ib, b)| at(b).cmp(&at(a)).then(ib.cmp(ia)));
}

impl Backend for MemoryBackend {
    async fn create_space(&self) -> Result<Space> {
        let mut tables = self.tables();
        for _ in 0..SPACE_CODE_ATTEMPTS {
            let code = generate_space_code();
            if tables.spaces.iter().any(|s| s.code == code) {
                debug!("Space code collision on {}", code);
                continue;
            }
            let space = Space {
                id: Uuid::new_v4(),
                code,
                created_at: Utc::now(),
            };
            tables.spaces.push(space.clone());
            return Ok(space);
        }
        Err(ClientError::Conflict("could not generate a unique space code".into()))
    }

    async fn get_space_by_code(&self, code: &str) -> Result<Space> {
        let code = parse_space_code(code)?;
        self.tables()
            .spaces
            .iter()
            .find(|s| s.code == code)
            .cloned()
            .ok_or_else(|| ClientError::NotFound("space".into()))
    }

    async fn get_space(&self, space_id: Uuid) -> Result<Space> {
        self.tables()
            .spaces
            .iter()
            .find(|s| s.id == space_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound("space".into()))
    }

    async fn create_user(&self, space_id: Uuid, req: CreateUserRequest) -> Result<User> {
        let (name, avatar_color) = validate_member(&req.name, &req.avatar_color).map_err(ClientError::Validation)?;

        let mut tables = self.tables();
        if !tables.spaces.iter().any(|s| s.id == space_id) {
            return Err(ClientError::NotFound("space".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            space_id,
            name,
            avatar_color,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: Uuid) -> Result<User> {
        self.tables()
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| ClientError::NotFound("user".into()))
    }

    async fn insert_mood(&self, space_id: Uuid, req: InsertMoodRequest) -> Result<Mood> {
        if req.emoji.trim().is_empty() || req.label.trim().is_empty() {
            return Err(ClientError::Validation("emoji and label are required".into()));
        }
        let mood = {
            let mut tables = self.tables();
            if !tables.member_of(req.user_id, space_id) {
                return Err(ClientError::Validation("user does not belong to this space".into()));
            }
            let mood = Mood {
                id: Uuid::new_v4(),
                user_id: req.user_id,
                space_id,
                emoji: req.emoji.trim().to_string(),
                label: req.label.trim().to_string(),
                color: req.color,
                tags: clean_tags(&req.tags),
                note: clean_note(req.note.as_deref()),
                created_at: Utc::now(),
            };
            tables.moods.push(mood.clone());
            mood
        };

        self.publish(RealtimeEvent::MoodInserted {
            space_id,
            mood_id: mood.id,
            user_id: mood.user_id,
        });
        Ok(mood)
    }

    async fn moods(&self, space_id: Uuid, limit: u32) -> Result<Vec<MoodEntry>> {
        let limit = limit.clamp(1, MOOD_HISTORY_LIMIT) as usize;
        let tables = self.tables();
        let mut rows: Vec<(usize, &Mood)> = tables
            .moods
            .iter()
            .enumerate()
            .filter(|(_, m)| m.space_id == space_id)
            .collect();
        newest_first(&mut rows, |m| m.created_at);

        Ok(rows
            .into_iter()
            .take(limit)
            .map(|(_, m)| MoodEntry {
                mood: m.clone(),
                author: tables.author(m.user_id),
            })
            .collect())
    }

    async fn questions(&self) -> Result<Vec<Question>> {
        Ok(self.tables().questions.clone())
    }

    async fn answers(&self, space_id: Uuid, question_id: Option<Uuid>) -> Result<Vec<AnswerEntry>> {
        let tables = self.tables();
        let mut rows: Vec<(usize, &Answer)> = tables
            .answers
            .iter()
            .enumerate()
            .filter(|(_, a)| a.space_id == space_id && question_id.is_none_or(|q| a.question_id == q))
            .collect();
        newest_first(&mut rows, |a| a.created_at);

        Ok(rows
            .into_iter()
            .map(|(_, a)| AnswerEntry {
                answer: a.clone(),
                author: tables.author(a.user_id),
                question: tables.questions.iter().find(|q| q.id == a.question_id).map(|q| QuestionRef {
                    text: q.text.clone(),
                    options: q.options.clone(),
                }),
            })
            .collect())
    }

    async fn upsert_answer(&self, space_id: Uuid, req: UpsertAnswerRequest) -> Result<Answer> {
        let answer = {
            let mut tables = self.tables();
            let option_count = tables
                .questions
                .iter()
                .find(|q| q.id == req.question_id)
                .map(|q| q.options.len())
                .ok_or_else(|| ClientError::NotFound("question".into()))?;
            if req.selected_option_index as usize >= option_count {
                return Err(ClientError::Validation(format!(
                    "option {} out of range (question has {option_count})",
                    req.selected_option_index
                )));
            }
            if !tables.member_of(req.user_id, space_id) {
                return Err(ClientError::Validation("user does not belong to this space".into()));
            }

            let now = Utc::now();
            let existing = tables
                .answers
                .iter_mut()
                .find(|a| a.user_id == req.user_id && a.question_id == req.question_id);
            match existing {
                Some(answer) => {
                    answer.selected_option_index = req.selected_option_index;
                    answer.created_at = now;
                    answer.clone()
                }
                None => {
                    let answer = Answer {
                        id: Uuid::new_v4(),
                        user_id: req.user_id,
                        space_id,
                        question_id: req.question_id,
                        selected_option_index: req.selected_option_index,
                        created_at: now,
                    };
                    tables.answers.push(answer.clone());
                    answer
                }
            }
        };

        self.publish(RealtimeEvent::AnswerChanged {
            space_id,
            question_id: answer.question_id,
            user_id: answer.user_id,
        });
        Ok(answer)
    }
}

impl ChangeFeed for MemoryBackend {
    async fn subscribe(&self, space_id: Uuid, tables: &[Table]) -> Result<Subscription> {
        let mut events = self.inner.events.subscribe();
        let tables = tables.to_vec();
        let (tx, rx) = mpsc::channel(64);

        let task = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(n)) => {
                        warn!("In-memory feed lagged by {} events", n);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                let Some(change) = ChangeEvent::from_event(&event).filter(|c| c.matches(space_id, &tables)) else {
                    continue;
                };
                if tx.send(change).await.is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::new(rx, task))
    }
}
