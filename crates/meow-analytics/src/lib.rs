//! Pure derivations over small mood and answer lists: tones, day bucketing,
//! overlap, streaks and timelines. Nothing here performs I/O or fails.

pub mod aggregate;
pub mod answers;
pub mod days;
pub mod timeline;
pub mod tone;

pub use aggregate::{
    DistributionEntry, OverlapStats, latest_per_user, longest_same_mood_streak, most_frequent_emoji, most_shared_emoji,
    mood_distribution, overlap_percentage, overlap_stats, partner_latest,
};
pub use answers::{AnswerPair, Flashcard, answer_pair, option_text, reveal_deck};
pub use days::{DayCalendar, DayMap, last_n_days, latest_per_day};
pub use timeline::{InsightRange, TimelinePoint, timeline};
pub use tone::{Palette, Tone, mood_score, mood_tone};
