use tracing::info;

use meow_types::api::InsertMoodRequest;
use meow_types::models::{MAX_TAGS, Mood, clean_note};

use crate::backend::Backend;
use crate::error::{ClientError, Result};
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub emoji: &'static str,
    pub label: &'static str,
    pub color: &'static str,
}

const fn preset(emoji: &'static str, label: &'static str, color: &'static str) -> Preset {
    Preset { emoji, label, color }
}

pub const PRESETS: [Preset; 9] = [
    preset("😊", "Happy", "bg-pastel-yellow"),
    preset("🥰", "Loved", "bg-pastel-pink"),
    preset("😴", "Tired", "bg-pastel-lavender"),
    preset("😤", "Annoyed", "bg-pastel-peach"),
    preset("😢", "Sad", "bg-blue-100"),
    preset("😎", "Cool", "bg-pastel-green"),
    preset("🤒", "Sick", "bg-green-100"),
    preset("🤯", "Stressed", "bg-red-100"),
    preset("🥳", "Excited", "bg-purple-100"),
];

pub const TAGS: [&str; 10] = [
    "work",
    "family",
    "relationship",
    "friends",
    "myself",
    "health",
    "school",
    "money",
    "home",
    "sleep",
];

/// The add-mood form before submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoodDraft {
    preset: Option<Preset>,
    tags: Vec<String>,
    note: String,
}

impl MoodDraft {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the preset at `index` of [`PRESETS`]. Returns false when out of range.
    pub fn select(&mut self, index: usize) -> bool {
        match PRESETS.get(index) {
            Some(p) => {
                self.preset = Some(*p);
                true
            }
            None => false,
        }
    }

    pub fn preset(&self) -> Option<Preset> {
        self.preset
    }

    /// Add `tag`, or remove it if already chosen. Returns whether it is
    /// selected afterwards.
    pub fn toggle_tag(&mut self, tag: &str) -> bool {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
            return false;
        }
        self.tags.push(tag.to_string());
        true
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn set_note(&mut self, note: &str) {
        self.note = note.to_string();
    }

    pub fn can_submit(&self) -> bool {
        self.preset.is_some()
    }

    /// The request this draft submits: note trimmed and capped, at most
    /// [`MAX_TAGS`] tags in selection order.
    pub fn to_request(&self, session: &Session) -> Result<InsertMoodRequest> {
        let preset = self
            .preset
            .ok_or_else(|| ClientError::Validation("pick a mood first".into()))?;

        Ok(InsertMoodRequest {
            user_id: session.user.id,
            emoji: preset.emoji.to_string(),
            label: preset.label.to_string(),
            color: preset.color.to_string(),
            tags: self.tags.iter().take(MAX_TAGS).cloned().collect(),
            note: clean_note(Some(&self.note)),
        })
    }
}

pub async fn submit<B: Backend>(backend: &B, session: &Session, draft: &MoodDraft) -> Result<Mood> {
    let req = draft.to_request(session)?;
    let mood = backend.insert_mood(session.space.id, req).await?;
    info!("{} is feeling {}", session.user.name, mood.label);
    Ok(mood)
}
