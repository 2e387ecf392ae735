use tracing::info;
use uuid::Uuid;

use meow_analytics::{Flashcard, answer_pair, option_text, reveal_deck};
use meow_types::api::UpsertAnswerRequest;
use meow_types::events::Table;
use meow_types::models::{Answer, AnswerEntry, Question};

use crate::backend::Backend;
use crate::context::AppContext;
use crate::error::{ClientError, Result};
use crate::realtime::ChangeFeed;
use crate::refresh::LiveView;
use crate::session::Session;

/// The question currently on screen and who has answered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveQuestion {
    pub question: Question,
    pub mine: Option<u32>,
    pub partner: Option<u32>,
}

impl ActiveQuestion {
    /// Both answers are in, so both are shown.
    pub fn both_answered(&self) -> bool {
        self.mine.is_some() && self.partner.is_some()
    }

    /// Partner's choice as text, hidden until I have answered too.
    pub fn partner_text(&self) -> Option<String> {
        if !self.both_answered() {
            return None;
        }
        self.partner.map(|i| option_text(&self.question.options, i))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QnaView {
    pub questions: Vec<Question>,
    pub active: Option<ActiveQuestion>,
    /// Questions both partners answered.
    pub deck: Vec<Flashcard>,
}

/// `active` defaults to the first question when unset or unknown.
pub fn build(questions: Vec<Question>, answers: &[AnswerEntry], me: Uuid, active: Option<Uuid>) -> QnaView {
    let current = active
        .and_then(|id| questions.iter().find(|q| q.id == id))
        .or_else(|| questions.first());

    let active = current.map(|question| {
        let for_question: Vec<AnswerEntry> = answers
            .iter()
            .filter(|a| a.answer.question_id == question.id)
            .cloned()
            .collect();
        let pair = answer_pair(&for_question, me);
        ActiveQuestion {
            question: question.clone(),
            mine: pair.mine.map(|a| a.answer.selected_option_index),
            partner: pair.partner.map(|a| a.answer.selected_option_index),
        }
    });

    QnaView {
        deck: reveal_deck(answers, me),
        active,
        questions,
    }
}

pub async fn load<B: Backend>(backend: &B, session: &Session, active: Option<Uuid>) -> Result<QnaView> {
    let questions = backend.questions().await?;
    let answers = backend.all_answers(session.space.id).await?;
    Ok(build(questions, &answers, session.user.id, active))
}

/// Record my answer to `question`.
pub async fn answer<B: Backend>(backend: &B, session: &Session, question: &Question, index: u32) -> Result<Answer> {
    if question.option(index).is_none() {
        return Err(ClientError::Validation(format!("option {index} out of range")));
    }
    let req = UpsertAnswerRequest {
        user_id: session.user.id,
        question_id: question.id,
        selected_option_index: index,
    };
    let answer = backend.upsert_answer(session.space.id, req).await?;
    info!("{} answered {:?}", session.user.name, question.text);
    Ok(answer)
}

pub fn open<B: Backend, F: ChangeFeed>(
    ctx: &AppContext<B, F>,
    session: &Session,
    active: Option<Uuid>,
) -> LiveView<QnaView> {
    let backend = ctx.backend();
    let session = session.clone();
    let space_id = session.space.id;
    ctx.live(space_id, &[Table::Answers], move || {
        let backend = backend.clone();
        let session = session.clone();
        async move { load(&*backend, &session, active).await }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::refresh::PageState;
    use crate::storage::MemoryStore;
    use meow_analytics::DayCalendar;
    use meow_types::api::CreateUserRequest;
    use meow_types::models::{Space, User};
    use std::sync::Arc;
    use std::time::Duration;

    fn deck() -> Vec<Question> {
        vec![
            Question {
                id: Uuid::new_v4(),
                text: "Perfect lazy Sunday?".into(),
                options: vec!["Movie marathon".into(), "Long walk outside".into()],
            },
            Question {
                id: Uuid::new_v4(),
                text: "Morning drink?".into(),
                options: vec!["Coffee".into(), "Tea".into()],
            },
        ]
    }

    async fn couple(backend: &MemoryBackend) -> (Space, User, User) {
        let space = backend.create_space().await.unwrap();
        let join = |name: &str| CreateUserRequest {
            name: name.into(),
            avatar_color: "#B5EAD7".into(),
        };
        let a = backend.create_user(space.id, join("Ana")).await.unwrap();
        let b = backend.create_user(space.id, join("Ben")).await.unwrap();
        (space, a, b)
    }

    #[tokio::test]
    async fn reveal_after_both_answer() {
        let backend = MemoryBackend::new().with_questions(deck());
        let (space, a, b) = couple(&backend).await;
        let ana = Session { user: a, space: space.clone() };
        let ben = Session { user: b, space };

        let view = load(&backend, &ana, None).await.unwrap();
        let first = view.active.clone().unwrap();
        assert_eq!(first.question.text, "Perfect lazy Sunday?");
        assert!(!first.both_answered());

        answer(&backend, &ben, &first.question, 1).await.unwrap();
        let view = load(&backend, &ana, None).await.unwrap();
        let active = view.active.unwrap();
        assert_eq!(active.partner, Some(1));
        assert_eq!(active.partner_text(), None);
        assert!(view.deck.is_empty());

        answer(&backend, &ana, &first.question, 0).await.unwrap();
        let view = load(&backend, &ana, None).await.unwrap();
        assert_eq!(view.active.unwrap().partner_text().as_deref(), Some("Long walk outside"));
        assert_eq!(view.deck.len(), 1);
        assert_eq!((view.deck[0].you.as_str(), view.deck[0].partner.as_str()), ("Movie marathon", "Long walk outside"));
    }

    #[tokio::test]
    async fn out_of_range_rejected_locally() {
        let backend = MemoryBackend::new().with_questions(deck());
        let (space, a, _) = couple(&backend).await;
        let session = Session { user: a, space };
        let question = backend.questions().await.unwrap().remove(1);

        let err = answer(&backend, &session, &question, 5).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        let view = load(&backend, &session, Some(question.id)).await.unwrap();
        assert_eq!(view.active.map(|q| q.question.id), Some(question.id));
    }

    #[tokio::test]
    async fn live_page_follows_partner_answers() {
        let backend = Arc::new(MemoryBackend::new().with_questions(deck()));
        let (space, a, b) = couple(&backend).await;
        let ctx = AppContext::new(
            backend.clone(),
            backend.clone(),
            Box::new(MemoryStore::new()),
            DayCalendar::utc(),
            Duration::from_millis(20),
        );
        let ana = Session { user: a, space: space.clone() };
        let ben = Session { user: b, space };

        let page = open(&ctx, &ana, None);
        let question = page.settled().await.ready().and_then(|v| v.active.clone()).unwrap().question;

        let mut updates = page.watch();
        answer(&*backend, &ben, &question, 0).await.unwrap();
        let partner_answered = |s: &PageState<QnaView>| {
            s.ready().and_then(|v| v.active.as_ref()).and_then(|q| q.partner) == Some(0)
        };
        let seen = tokio::time::timeout(Duration::from_secs(2), updates.wait_for(partner_answered)).await;
        assert!(matches!(seen, Ok(Ok(_))));
    }
}
