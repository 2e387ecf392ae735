use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of the human-shareable space code.
pub const SPACE_CODE_LEN: usize = 6;

/// Characters a generated space code is drawn from.
pub const SPACE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Fresh codes tried before giving up on a collision streak.
pub const SPACE_CODE_ATTEMPTS: usize = 5;

/// Longest display name accepted at join time.
pub const NAME_MAX_CHARS: usize = 32;

/// Maximum number of characters kept from a mood note.
pub const NOTE_MAX_CHARS: usize = 60;

/// Maximum number of tags attached to one mood.
pub const MAX_TAGS: usize = 8;

/// Upper bound on moods returned by a single history fetch.
pub const MOOD_HISTORY_LIMIT: u32 = 100;

/// Number of moods fetched when only the latest mood per user is needed.
pub const LATEST_MOODS_LIMIT: u32 = 10;

/// A shared two-person context identified by a short code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: Uuid,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub space_id: Uuid,
    pub name: String,
    pub avatar_color: String,
    pub created_at: DateTime<Utc>,
}

/// One entry of the append-only mood log. The "current" mood of a user is
/// the most recent row, never a separately stored value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mood {
    pub id: Uuid,
    pub user_id: Uuid,
    pub space_id: Uuid,
    pub emoji: String,
    pub label: String,
    pub color: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Display fields of the user who wrote a mood or answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub avatar_color: String,
}

/// A mood joined with its author, as returned by history fetches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodEntry {
    #[serde(flatten)]
    pub mood: Mood,
    #[serde(default)]
    pub author: Option<Author>,
}

impl AsRef<Mood> for Mood {
    fn as_ref(&self) -> &Mood {
        self
    }
}

impl AsRef<Mood> for MoodEntry {
    fn as_ref(&self) -> &Mood {
        &self.mood
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub text: String,
    pub options: Vec<String>,
}

impl Question {
    /// Text of the option at `index`, if the index is in range.
    pub fn option(&self, index: u32) -> Option<&str> {
        self.options.get(index as usize).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: Uuid,
    pub user_id: Uuid,
    pub space_id: Uuid,
    pub question_id: Uuid,
    pub selected_option_index: u32,
    pub created_at: DateTime<Utc>,
}

/// Question text and options embedded into an answer listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRef {
    pub text: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerEntry {
    #[serde(flatten)]
    pub answer: Answer,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub question: Option<QuestionRef>,
}

/// Parse question options stored as serialized text.
///
/// Accepts a JSON array of strings, falls back to a comma separated list,
/// and yields no options for anything else.
pub fn parse_options(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }
    if raw.starts_with('[') {
        return serde_json::from_str::<Vec<String>>(raw).unwrap_or_default();
    }
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Normalize an invite code (trim + uppercase) and check its shape.
/// Returns `None` when it cannot be a valid space code.
pub fn normalize_space_code(code: &str) -> Option<String> {
    let code = code.trim().to_ascii_uppercase();
    let valid = code.len() == SPACE_CODE_LEN && code.chars().all(|c| c.is_ascii_alphanumeric());
    valid.then_some(code)
}

/// Random uppercase alphanumeric space code.
pub fn generate_space_code() -> String {
    let mut rng = rand::rng();
    (0..SPACE_CODE_LEN)
        .map(|_| SPACE_CODE_ALPHABET[rng.random_range(0..SPACE_CODE_ALPHABET.len())] as char)
        .collect()
}

/// Trimmed name and avatar colour for a new member, or why they are rejected.
pub fn validate_member(name: &str, avatar_color: &str) -> Result<(String, String), String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > NAME_MAX_CHARS {
        return Err(format!("name must be 1-{NAME_MAX_CHARS} characters"));
    }
    let avatar_color = avatar_color.trim();
    if avatar_color.is_empty() {
        return Err("avatar_color is required".into());
    }
    Ok((name.to_string(), avatar_color.to_string()))
}

/// Trim a note and cap it at [`NOTE_MAX_CHARS`] characters. Blank notes become `None`.
pub fn clean_note(note: Option<&str>) -> Option<String> {
    let trimmed = note?.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(NOTE_MAX_CHARS).collect())
}

/// Drop blank tags, deduplicate, and keep at most [`MAX_TAGS`].
pub fn clean_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() || out.iter().any(|t| t == tag) {
            continue;
        }
        out.push(tag.to_string());
        if out.len() == MAX_TAGS {
            break;
        }
    }
    out
}
