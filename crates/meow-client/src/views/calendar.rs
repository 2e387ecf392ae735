use chrono::{Datelike, Days, Months, NaiveDate};
use uuid::Uuid;

use meow_analytics::{DayCalendar, latest_per_day};
use meow_types::events::Table;
use meow_types::models::{MoodEntry, clean_tags};

use crate::backend::Backend;
use crate::context::AppContext;
use crate::error::Result;
use crate::realtime::ChangeFeed;
use crate::refresh::LiveView;
use crate::session::Session;
use crate::views::split_moods;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CalendarMode {
    #[default]
    Month,
    /// Sunday to Saturday.
    Week,
}

/// One day of the grid with each partner's mood of that day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub day: NaiveDate,
    pub mine: Option<MoodEntry>,
    pub partner: Option<MoodEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarView {
    pub mode: CalendarMode,
    pub cursor: NaiveDate,
    pub cells: Vec<DayCell>,
}

/// What the day panel shows for one person.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodDetail {
    pub emoji: String,
    pub label: String,
    pub note: Option<String>,
    pub tags: Vec<String>,
}

impl MoodDetail {
    fn from_entry(entry: &MoodEntry) -> Self {
        Self {
            emoji: entry.mood.emoji.clone(),
            label: entry.mood.label.clone(),
            note: entry.mood.note.clone(),
            tags: clean_tags(&entry.mood.tags),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayDetail {
    pub day: NaiveDate,
    pub mine: Option<MoodDetail>,
    pub partner: Option<MoodDetail>,
}

/// Every day of the month containing `cursor`.
pub fn month_days(cursor: NaiveDate) -> Vec<NaiveDate> {
    let first = cursor.with_day(1).unwrap_or(cursor);
    first.iter_days().take_while(|d| d.month() == first.month()).collect()
}

/// The Sunday-start week containing `cursor`.
pub fn week_days(cursor: NaiveDate) -> Vec<NaiveDate> {
    let back = u64::from(cursor.weekday().num_days_from_sunday());
    let start = cursor.checked_sub_days(Days::new(back)).unwrap_or(cursor);
    start.iter_days().take(7).collect()
}

/// Move the cursor one month or week forward (or back).
pub fn shift(cursor: NaiveDate, mode: CalendarMode, forward: bool) -> NaiveDate {
    let moved = match (mode, forward) {
        (CalendarMode::Month, true) => cursor.checked_add_months(Months::new(1)),
        (CalendarMode::Month, false) => cursor.checked_sub_months(Months::new(1)),
        (CalendarMode::Week, true) => cursor.checked_add_days(Days::new(7)),
        (CalendarMode::Week, false) => cursor.checked_sub_days(Days::new(7)),
    };
    moved.unwrap_or(cursor)
}

pub fn build(
    moods: &[MoodEntry],
    me: Uuid,
    calendar: &DayCalendar,
    mode: CalendarMode,
    cursor: NaiveDate,
) -> CalendarView {
    let (mine, partner) = split_moods(moods, me);
    let (mine, partner) = (latest_per_day(&mine, calendar), latest_per_day(&partner, calendar));

    let days = match mode {
        CalendarMode::Month => month_days(cursor),
        CalendarMode::Week => week_days(cursor),
    };
    let cells = days
        .into_iter()
        .map(|day| DayCell {
            day,
            mine: mine.get(&day).map(|&&m| m.clone()),
            partner: partner.get(&day).map(|&&m| m.clone()),
        })
        .collect();

    CalendarView { mode, cursor, cells }
}

impl CalendarView {
    /// Details for a selected day; `None` if the day is not on the grid.
    pub fn select(&self, day: NaiveDate) -> Option<DayDetail> {
        let cell = self.cells.iter().find(|c| c.day == day)?;
        Some(DayDetail {
            day,
            mine: cell.mine.as_ref().map(MoodDetail::from_entry),
            partner: cell.partner.as_ref().map(MoodDetail::from_entry),
        })
    }
}

pub async fn load<B: Backend>(
    backend: &B,
    session: &Session,
    calendar: &DayCalendar,
    mode: CalendarMode,
    cursor: NaiveDate,
) -> Result<CalendarView> {
    let moods = backend.mood_history(session.space.id).await?;
    Ok(build(&moods, session.user.id, calendar, mode, cursor))
}

pub fn open<B: Backend, F: ChangeFeed>(
    ctx: &AppContext<B, F>,
    session: &Session,
    mode: CalendarMode,
    cursor: NaiveDate,
) -> LiveView<CalendarView> {
    let backend = ctx.backend();
    let calendar = ctx.calendar();
    let session = session.clone();
    let space_id = session.space.id;
    ctx.live(space_id, &[Table::Moods], move || {
        let backend = backend.clone();
        let session = session.clone();
        async move { load(&*backend, &session, &calendar, mode, cursor).await }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::fixtures::{at, entry, newest_first};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn grids() {
        assert_eq!(month_days(date(2024, 2, 17)).len(), 29);
        assert_eq!(month_days(date(2023, 2, 1)).len(), 28);

        // 2024-06-05 is a Wednesday
        let week = week_days(date(2024, 6, 5));
        assert_eq!(week.first(), Some(&date(2024, 6, 2)));
        assert_eq!(week.last(), Some(&date(2024, 6, 8)));
        assert_eq!(week_days(date(2024, 6, 2))[0], date(2024, 6, 2));
    }

    #[test]
    fn cursor_moves() {
        assert_eq!(shift(date(2024, 1, 31), CalendarMode::Month, true), date(2024, 2, 29));
        assert_eq!(shift(date(2024, 1, 3), CalendarMode::Week, false), date(2023, 12, 27));
    }

    #[test]
    fn cells_hold_both_moods() {
        let (me, you) = (Uuid::new_v4(), Uuid::new_v4());
        let mut tagged = entry(me, "😤", "Annoyed", at(4, 20));
        tagged.mood.tags = vec!["work".into(), " ".into(), "work".into(), "sleep".into()];
        let moods = newest_first(vec![
            entry(me, "😊", "Happy", at(4, 8)),
            tagged,
            entry(you, "😴", "Tired", at(4, 9)),
            entry(you, "😎", "Cool", at(6, 9)),
        ]);

        let view = build(&moods, me, &DayCalendar::utc(), CalendarMode::Week, date(2024, 6, 5));
        assert_eq!(view.cells.len(), 7);

        let detail = view.select(date(2024, 6, 4)).unwrap();
        let mine = detail.mine.unwrap();
        assert_eq!(mine.emoji, "😤");
        assert_eq!(mine.tags, ["work", "sleep"]);
        assert_eq!(detail.partner.map(|p| p.emoji), Some("😴".to_string()));

        let quiet = view.select(date(2024, 6, 5)).unwrap();
        assert!(quiet.mine.is_none() && quiet.partner.is_none());
        assert!(view.select(date(2024, 7, 1)).is_none());
    }
}
