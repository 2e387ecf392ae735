use uuid::Uuid;

use meow_analytics::{DayCalendar, latest_per_day, most_frequent_emoji, overlap_percentage};
use meow_types::events::Table;
use meow_types::models::MoodEntry;

use crate::backend::Backend;
use crate::context::AppContext;
use crate::error::Result;
use crate::realtime::ChangeFeed;
use crate::refresh::LiveView;
use crate::session::Session;
use crate::views::split_moods;

const RECENT_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryView {
    pub overlap_pct: u8,
    pub my_top_emoji: Option<String>,
    pub partner_top_emoji: Option<String>,
    pub recent: Vec<MoodEntry>,
}

/// `moods` must be newest first.
pub fn build(moods: &[MoodEntry], me: Uuid, calendar: &DayCalendar) -> HistoryView {
    let (mine, partner) = split_moods(moods, me);
    let overlap_pct = overlap_percentage(&latest_per_day(&mine, calendar), &latest_per_day(&partner, calendar));

    HistoryView {
        overlap_pct,
        my_top_emoji: most_frequent_emoji(&mine).map(str::to_string),
        partner_top_emoji: most_frequent_emoji(&partner).map(str::to_string),
        recent: moods.iter().take(RECENT_COUNT).cloned().collect(),
    }
}

pub async fn load<B: Backend>(backend: &B, session: &Session, calendar: &DayCalendar) -> Result<HistoryView> {
    let moods = backend.mood_history(session.space.id).await?;
    Ok(build(&moods, session.user.id, calendar))
}

pub fn open<B: Backend, F: ChangeFeed>(ctx: &AppContext<B, F>, session: &Session) -> LiveView<HistoryView> {
    let backend = ctx.backend();
    let calendar = ctx.calendar();
    let session = session.clone();
    let space_id = session.space.id;
    ctx.live(space_id, &[Table::Moods], move || {
        let backend = backend.clone();
        let session = session.clone();
        async move { load(&*backend, &session, &calendar).await }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::fixtures::{at, entry, newest_first};

    #[test]
    fn overlap_and_favourites() {
        let (me, you) = (Uuid::new_v4(), Uuid::new_v4());
        let moods = newest_first(vec![
            entry(me, "😊", "Happy", at(1, 9)),
            entry(you, "😊", "Happy", at(1, 10)),
            entry(me, "😢", "Sad", at(2, 9)),
            entry(you, "😴", "Tired", at(2, 10)),
            entry(you, "😴", "Tired", at(3, 10)),
        ]);

        let view = build(&moods, me, &DayCalendar::utc());
        assert_eq!(view.overlap_pct, 50);
        assert_eq!(view.partner_top_emoji.as_deref(), Some("😴"));
        // Tie between 😢 and 😊: the newer one is scanned first
        assert_eq!(view.my_top_emoji.as_deref(), Some("😢"));
        assert_eq!(view.recent.len(), 5);
        assert_eq!(view.recent[0].mood.created_at, at(3, 10));
    }

    #[test]
    fn empty_history() {
        let view = build(&[], Uuid::new_v4(), &DayCalendar::utc());
        assert_eq!(view.overlap_pct, 0);
        assert!(view.my_top_emoji.is_none() && view.recent.is_empty());
    }
}
