use chrono::NaiveDate;
use uuid::Uuid;

use meow_analytics::{
    DayCalendar, DistributionEntry, InsightRange, OverlapStats, TimelinePoint, latest_per_day, mood_distribution,
    overlap_stats, timeline,
};
use meow_types::events::Table;
use meow_types::models::MoodEntry;

use crate::backend::Backend;
use crate::context::AppContext;
use crate::error::Result;
use crate::realtime::ChangeFeed;
use crate::refresh::LiveView;
use crate::session::Session;
use crate::views::split_moods;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsightsView {
    pub range: InsightRange,
    /// Day keys of the timeline, oldest first, ending today.
    pub days: Vec<NaiveDate>,
    pub mine: Vec<TimelinePoint>,
    pub partner: Vec<TimelinePoint>,
    /// My `emoji label` pairs over the whole fetched history.
    pub distribution: Vec<DistributionEntry>,
    pub overlap: OverlapStats,
}

pub fn build(
    moods: &[MoodEntry],
    me: Uuid,
    calendar: &DayCalendar,
    range: InsightRange,
    today: NaiveDate,
) -> InsightsView {
    let (mine, partner) = split_moods(moods, me);
    let (my_days, partner_days) = (latest_per_day(&mine, calendar), latest_per_day(&partner, calendar));
    let days = range.keys(today);

    InsightsView {
        range,
        mine: timeline(&my_days, &days),
        partner: timeline(&partner_days, &days),
        distribution: mood_distribution(&mine),
        overlap: overlap_stats(&my_days, &partner_days),
        days,
    }
}

pub async fn load<B: Backend>(
    backend: &B,
    session: &Session,
    calendar: &DayCalendar,
    range: InsightRange,
) -> Result<InsightsView> {
    let moods = backend.mood_history(session.space.id).await?;
    Ok(build(&moods, session.user.id, calendar, range, calendar.today()))
}

pub fn open<B: Backend, F: ChangeFeed>(
    ctx: &AppContext<B, F>,
    session: &Session,
    range: InsightRange,
) -> LiveView<InsightsView> {
    let backend = ctx.backend();
    let calendar = ctx.calendar();
    let session = session.clone();
    let space_id = session.space.id;
    ctx.live(space_id, &[Table::Moods], move || {
        let backend = backend.clone();
        let session = session.clone();
        async move { load(&*backend, &session, &calendar, range).await }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::fixtures::{at, entry, newest_first};
    use meow_analytics::Tone;

    #[test]
    fn week_of_insights() {
        let (me, you) = (Uuid::new_v4(), Uuid::new_v4());
        let moods = newest_first(vec![
            entry(me, "🥰", "Loved", at(5, 9)),
            entry(you, "🥰", "Loved", at(5, 10)),
            entry(me, "🥰", "Loved", at(6, 9)),
            entry(you, "🥰", "Loved", at(6, 10)),
            entry(me, "🤯", "Stressed", at(7, 9)),
        ]);
        let today = NaiveDate::from_ymd_opt(2024, 6, 7).unwrap();

        let view = build(&moods, me, &DayCalendar::utc(), InsightRange::Week, today);
        assert_eq!(view.days.len(), 7);
        assert_eq!(view.days.last(), Some(&today));

        let last = view.mine.last().unwrap();
        assert_eq!((last.tone, last.score), (Tone::Low, 0));
        assert!(view.partner.last().unwrap().is_quiet());
        assert_eq!(view.mine[4].score, 2);

        assert_eq!(view.overlap.overlap_pct, 100);
        assert_eq!(view.overlap.longest_streak, 2);
        assert_eq!(view.overlap.most_shared.as_deref(), Some("🥰"));

        assert_eq!(view.distribution[0].emoji, "🥰");
        assert_eq!(view.distribution[0].count, 2);
        assert_eq!(view.distribution.len(), 2);
    }

    #[test]
    fn month_range_has_thirty_points() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let view = build(&[], Uuid::new_v4(), &DayCalendar::utc(), InsightRange::Month, today);
        assert_eq!(view.mine.len(), 30);
        assert!(view.mine.iter().all(TimelinePoint::is_quiet));
        assert_eq!(view.overlap.overlap_pct, 0);
    }
}
