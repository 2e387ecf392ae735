use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Offset, Utc};

use meow_types::models::Mood;

/// Day key -> that day's mood. Keys iterate in calendar order and display as `YYYY-MM-DD`.
pub type DayMap<'a, M> = BTreeMap<NaiveDate, &'a M>;

/// Maps instants to the calendar day they fall on for one fixed UTC offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayCalendar {
    offset: FixedOffset,
}

impl Default for DayCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl DayCalendar {
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// `None` when the offset is outside ±24h.
    pub fn from_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.offset).date_naive()
    }

    pub fn today(&self) -> NaiveDate {
        self.day_of(Utc::now())
    }
}

/// The `n` days ending at `today`, oldest first.
pub fn last_n_days(today: NaiveDate, n: usize) -> Vec<NaiveDate> {
    (0..n)
        .rev()
        .filter_map(|back| today.checked_sub_signed(Duration::days(back as i64)))
        .collect()
}

/// The mood of each day: the latest mood logged that day by timestamp,
/// whatever order `moods` arrives in. Equal timestamps keep the first seen.
pub fn latest_per_day<'a, M: AsRef<Mood>>(moods: &'a [M], calendar: &DayCalendar) -> DayMap<'a, M> {
    let mut map: DayMap<'a, M> = BTreeMap::new();
    for m in moods {
        let at = m.as_ref().created_at;
        map.entry(calendar.day_of(at))
            .and_modify(|current| {
                if at > (*current).as_ref().created_at {
                    *current = m;
                }
            })
            .or_insert(m);
    }
    map
}
