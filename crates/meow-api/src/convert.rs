//! Row -> wire model conversion. Corrupt stored values are logged and replaced
//! with defaults rather than failing the whole listing.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use meow_db::models::{AnswerRow, MoodRow, QuestionRow, SpaceRow, UserRow};
use meow_types::models::{
    Answer, AnswerEntry, Author, Mood, MoodEntry, Question, QuestionRef, Space, User, parse_options,
};

pub fn parse_id(field: &str, raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", field, raw, e);
        Uuid::default()
    })
}

pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Legacy rows: "YYYY-MM-DD HH:MM:SS" without timezone, taken as UTC
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}': {}", raw, e);
            DateTime::default()
        })
}

fn author(name: Option<String>, avatar_color: Option<String>) -> Option<Author> {
    Some(Author {
        name: name?,
        avatar_color: avatar_color.unwrap_or_default(),
    })
}

pub fn space(row: SpaceRow) -> Space {
    Space {
        id: parse_id("space id", &row.id),
        code: row.code,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn user(row: UserRow) -> User {
    User {
        id: parse_id("user id", &row.id),
        space_id: parse_id("space_id", &row.space_id),
        name: row.name,
        avatar_color: row.avatar_color,
        created_at: parse_timestamp(&row.created_at),
    }
}

pub fn mood_entry(row: MoodRow) -> MoodEntry {
    let tags = serde_json::from_str::<Vec<String>>(&row.tags).unwrap_or_else(|e| {
        warn!("Corrupt tags on mood '{}': {}", row.id, e);
        Vec::new()
    });

    MoodEntry {
        mood: Mood {
            id: parse_id("mood id", &row.id),
            user_id: parse_id("user_id", &row.user_id),
            space_id: parse_id("space_id", &row.space_id),
            emoji: row.emoji,
            label: row.label,
            color: row.color,
            tags,
            note: row.note,
            created_at: parse_timestamp(&row.created_at),
        },
        author: author(row.author_name, row.author_color),
    }
}

pub fn question(row: QuestionRow) -> Question {
    Question {
        id: parse_id("question id", &row.id),
        options: parse_options(&row.options),
        text: row.text,
    }
}

pub fn answer_entry(row: AnswerRow) -> AnswerEntry {
    let question = row.question_text.map(|text| QuestionRef {
        text,
        options: row.question_options.as_deref().map(parse_options).unwrap_or_default(),
    });

    AnswerEntry {
        answer: Answer {
            id: parse_id("answer id", &row.id),
            user_id: parse_id("user_id", &row.user_id),
            space_id: parse_id("space_id", &row.space_id),
            question_id: parse_id("question_id", &row.question_id),
            selected_option_index: u32::try_from(row.selected_option_index).unwrap_or_else(|_| {
                warn!("Corrupt option index {} on answer '{}'", row.selected_option_index, row.id);
                0
            }),
            created_at: parse_timestamp(&row.created_at),
        },
        author: author(row.author_name, row.author_color),
        question,
    }
}
