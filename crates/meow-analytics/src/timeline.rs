use chrono::{DateTime, NaiveDate, Utc};

use meow_types::models::Mood;

use crate::days::{DayMap, last_n_days};
use crate::tone::{Tone, mood_tone};

/// Placeholder drawn for a day without a mood.
pub const QUIET_EMOJI: &str = "•";
pub const QUIET_LABEL: &str = "Quiet";

/// Window of days shown on the insights timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsightRange {
    Day,
    #[default]
    Week,
    Month,
}

impl InsightRange {
    pub fn days(self) -> usize {
        match self {
            InsightRange::Day | InsightRange::Week => 7,
            InsightRange::Month => 30,
        }
    }

    /// Day keys covered by this range, oldest first, ending at `today`.
    pub fn keys(self, today: NaiveDate) -> Vec<NaiveDate> {
        last_n_days(today, self.days())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelinePoint {
    pub day: NaiveDate,
    pub emoji: String,
    pub label: String,
    pub tone: Tone,
    pub score: u8,
    /// `None` for quiet days.
    pub logged_at: Option<DateTime<Utc>>,
}

impl TimelinePoint {
    pub fn is_quiet(&self) -> bool {
        self.logged_at.is_none()
    }
}

/// One point per key: that day's mood, or a neutral "Quiet" point.
pub fn timeline<M: AsRef<Mood>>(per_day: &DayMap<'_, M>, keys: &[NaiveDate]) -> Vec<TimelinePoint> {
    keys.iter()
        .map(|day| match per_day.get(day) {
            Some(&m) => {
                let mood = m.as_ref();
                let tone = mood_tone(&mood.label);
                TimelinePoint {
                    day: *day,
                    emoji: mood.emoji.clone(),
                    label: mood.label.clone(),
                    tone,
                    score: tone.score(),
                    logged_at: Some(mood.created_at),
                }
            }
            None => TimelinePoint {
                day: *day,
                emoji: QUIET_EMOJI.to_string(),
                label: QUIET_LABEL.to_string(),
                tone: Tone::Neutral,
                score: Tone::Neutral.score(),
                logged_at: None,
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::days::{DayCalendar, latest_per_day};
    use chrono::TimeZone;
    use uuid::Uuid;

    #[test]
    fn quiet_days_are_neutral() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 7).unwrap();
        let mood = Mood {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            space_id: Uuid::nil(),
            emoji: "🤒".into(),
            label: "Sick".into(),
            color: String::new(),
            tags: vec![],
            note: None,
            created_at: Utc.with_ymd_and_hms(2024, 6, 6, 12, 0, 0).unwrap(),
        };
        let moods = vec![mood];
        let per_day = latest_per_day(&moods, &DayCalendar::utc());

        let points = timeline(&per_day, &InsightRange::Week.keys(today));
        assert_eq!(points.len(), 7);
        assert_eq!(points[5].emoji, "🤒");
        assert_eq!((points[5].tone, points[5].score), (Tone::Low, 0));
        assert!(points[6].is_quiet());
        assert_eq!(points[6].score, 1);
        assert_eq!(InsightRange::Month.keys(today).len(), 30);
    }
}
