use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use uuid::Uuid;

use meow_analytics::{DayCalendar, latest_per_day, latest_per_user, partner_latest};
use meow_types::events::Table;
use meow_types::models::{Mood, MoodEntry};

use crate::backend::Backend;
use crate::context::AppContext;
use crate::error::Result;
use crate::realtime::ChangeFeed;
use crate::refresh::LiveView;
use crate::session::Session;
use crate::views::split_moods;

/// A partner whose latest mood is at most this old counts as recently active.
const RECENTLY_ACTIVE_MINUTES: i64 = 10;

/// One line of my mood diary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyEntry {
    pub day: NaiveDate,
    pub emoji: String,
    /// The note when there is one, else the label.
    pub title: String,
    pub color: String,
    pub logged_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub greeting: &'static str,
    pub mine: Option<Mood>,
    pub partner: Option<MoodEntry>,
    pub partner_recently_active: bool,
    /// My mood of each day, newest day first.
    pub entries: Vec<DailyEntry>,
}

pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Good Morning!",
        12..=17 => "Good Afternoon!",
        _ => "Good Evening!",
    }
}

fn title_of(mood: &Mood) -> String {
    match mood.note.as_deref().map(str::trim) {
        Some(note) if !note.is_empty() => note.to_string(),
        _ => mood.label.clone(),
    }
}

pub fn build(moods: &[MoodEntry], me: Uuid, calendar: &DayCalendar, now: DateTime<Utc>) -> Dashboard {
    let latest = latest_per_user(moods);
    let mine = latest.get(&me).map(|m| m.mood.clone());
    let partner = partner_latest(&latest, me).cloned();
    let partner_recently_active = partner
        .as_ref()
        .is_some_and(|p| now - p.mood.created_at <= Duration::minutes(RECENTLY_ACTIVE_MINUTES));

    let (my_moods, _) = split_moods(moods, me);
    let entries = latest_per_day(&my_moods, calendar)
        .into_iter()
        .rev()
        .map(|(day, m)| DailyEntry {
            day,
            emoji: m.mood.emoji.clone(),
            title: title_of(&m.mood),
            color: m.mood.color.clone(),
            logged_at: m.mood.created_at,
        })
        .collect();

    Dashboard {
        greeting: greeting(now.with_timezone(&calendar.offset()).hour()),
        mine,
        partner,
        partner_recently_active,
        entries,
    }
}

pub async fn load<B: Backend>(backend: &B, session: &Session, calendar: &DayCalendar) -> Result<Dashboard> {
    let moods = backend.mood_history(session.space.id).await?;
    Ok(build(&moods, session.user.id, calendar, Utc::now()))
}

/// The dashboard, reloaded whenever a mood lands in the space.
pub fn open<B: Backend, F: ChangeFeed>(ctx: &AppContext<B, F>, session: &Session) -> LiveView<Dashboard> {
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
