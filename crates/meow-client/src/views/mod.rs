//! Page view models. Each module pairs a pure `build` over fetched rows with
//! an async `load` against a [`Backend`](crate::backend::Backend) and an
//! `open` that keeps the page live.

pub mod add_mood;
pub mod calendar;
pub mod dashboard;
pub mod history;
pub mod insights;
pub mod qna;

use uuid::Uuid;

use meow_types::models::MoodEntry;

/// `(mine, partner's)`, each keeping input order. Anyone who is not `me`
/// counts as the partner.
pub(crate) fn split_moods(moods: &[MoodEntry], me: Uuid) -> (Vec<&MoodEntry>, Vec<&MoodEntry>) {
    moods.iter().partition(|m| m.mood.user_id == me)
}
