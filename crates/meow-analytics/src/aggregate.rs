use std::collections::HashMap;

use uuid::Uuid;

use meow_types::models::Mood;

use crate::days::DayMap;
use crate::tone::{Tone, mood_tone};

/// How many `emoji label` pairs the distribution keeps.
const DISTRIBUTION_TOP: usize = 8;

/// Each user's most recent mood. For lists already sorted newest first this
/// is the first occurrence per user; equal timestamps keep the first seen.
pub fn latest_per_user<M: AsRef<Mood>>(moods: &[M]) -> HashMap<Uuid, &M> {
    let mut map: HashMap<Uuid, &M> = HashMap::new();
    for m in moods {
        let mood = m.as_ref();
        map.entry(mood.user_id)
            .and_modify(|current| {
                if mood.created_at > (*current).as_ref().created_at {
                    *current = m;
                }
            })
            .or_insert(m);
    }
    map
}

/// The most recent mood of anyone other than `me`.
pub fn partner_latest<'a, M: AsRef<Mood>>(latest: &HashMap<Uuid, &'a M>, me: Uuid) -> Option<&'a M> {
    latest
        .iter()
        .filter(|(user_id, _)| **user_id != me)
        .map(|(_, m)| *m)
        .max_by_key(|m| (*m).as_ref().created_at)
}

/// Share of commonly logged days on which both moods had the same emoji,
/// rounded to a whole percent. 0 when no day was logged by both.
pub fn overlap_percentage<M: AsRef<Mood>>(mine: &DayMap<'_, M>, partner: &DayMap<'_, M>) -> u8 {
    let mut common = 0usize;
    let mut same = 0usize;
    for (day, &m) in mine {
        if let Some(&p) = partner.get(day) {
            common += 1;
            if m.as_ref().emoji == p.as_ref().emoji {
                same += 1;
            }
        }
    }
    percent(same, common)
}

fn percent(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    (part as f64 * 100.0 / whole as f64).round() as u8
}

/// Emoji with the highest count; among tied emoji the one whose first
/// occurrence comes earliest in the input wins.
pub fn most_frequent_emoji<M: AsRef<Mood>>(moods: &[M]) -> Option<&str> {
    first_max(moods.iter().map(|m| m.as_ref().emoji.as_str()))
}

/// Most frequent emoji among days where both users logged the same one.
pub fn most_shared_emoji<'a, M: AsRef<Mood>>(mine: &DayMap<'a, M>, partner: &DayMap<'_, M>) -> Option<&'a str> {
    let shared = mine.iter().filter_map(|(day, &m)| {
        let &p = partner.get(day)?;
        (m.as_ref().emoji == p.as_ref().emoji).then(|| m.as_ref().emoji.as_str())
    });
    first_max(shared)
}

fn first_max<'a>(items: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for item in items {
        match counts.iter_mut().find(|(e, _)| *e == item) {
            Some((_, n)) => *n += 1,
            None => counts.push((item, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (item, n) in counts {
        if best.is_none_or(|(_, top)| n > top) {
            best = Some((item, n));
        }
    }
    best.map(|(item, _)| item)
}

/// Longest run of consecutive calendar days on which both users logged the
/// same emoji. A missing day or a mismatch restarts the run.
pub fn longest_same_mood_streak<M: AsRef<Mood>>(mine: &DayMap<'_, M>, partner: &DayMap<'_, M>) -> u32 {
    let mut best = 0;
    let mut streak = 0;
    let mut prev_day = None;

    for (day, &m) in mine {
        let Some(&p) = partner.get(day) else {
            continue;
        };

        let consecutive = prev_day.and_then(|d: chrono::NaiveDate| d.succ_opt()) == Some(*day);
        if !consecutive {
            streak = 0;
        }
        if m.as_ref().emoji == p.as_ref().emoji {
            streak += 1;
        } else {
            streak = 0;
        }
        best = best.max(streak);
        prev_day = Some(*day);
    }
    best
}

/// The numbers shown on the overlap card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapStats {
    pub overlap_pct: u8,
    pub most_shared: Option<String>,
    pub longest_streak: u32,
}

pub fn overlap_stats<M: AsRef<Mood>>(mine: &DayMap<'_, M>, partner: &DayMap<'_, M>) -> OverlapStats {
    OverlapStats {
        overlap_pct: overlap_percentage(mine, partner),
        most_shared: most_shared_emoji(mine, partner).map(str::to_string),
        longest_streak: longest_same_mood_streak(mine, partner),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionEntry {
    pub emoji: String,
    pub label: String,
    pub count: usize,
    pub tone: Tone,
}

/// Counts of each `emoji label` pair, most common first, capped at eight.
/// Equal counts stay in first-seen order.
pub fn mood_distribution<M: AsRef<Mood>>(moods: &[M]) -> Vec<DistributionEntry> {
    let mut entries: Vec<DistributionEntry> = Vec::new();
    for m in moods {
        let mood = m.as_ref();
        match entries.iter_mut().find(|e| e.emoji == mood.emoji && e.label == mood.label) {
            Some(entry) => entry.count += 1,
            None => entries.push(DistributionEntry {
                emoji: mood.emoji.clone(),
                label: mood.label.clone(),
                count: 1,
                tone: mood_tone(&mood.label),
            }),
        }
    }
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(DISTRIBUTION_TOP);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::days::{DayCalendar, latest_per_day};
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, hour, 0, 0).unwrap()
    }

    fn mood(user: Uuid, emoji: &str, label: &str, when: DateTime<Utc>) -> Mood {
        Mood {
            id: Uuid::new_v4(),
            user_id: user,
            space_id: Uuid::nil(),
            emoji: emoji.into(),
            label: label.into(),
            color: String::new(),
            tags: vec![],
            note: None,
            created_at: when,
        }
    }

    fn split(moods: &[Mood], me: Uuid) -> (Vec<Mood>, Vec<Mood>) {
        moods.iter().cloned().partition(|m| m.user_id == me)
    }

    #[test]
    fn two_day_example() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let moods = vec![
            mood(a, "😊", "Happy", at(1, 9)),
            mood(b, "😊", "Happy", at(1, 10)),
            mood(a, "😢", "Sad", at(2, 9)),
            mood(b, "😴", "Tired", at(2, 10)),
        ];
        let (mine, theirs) = split(&moods, a);
        let cal = DayCalendar::utc();
        let (mine, theirs) = (latest_per_day(&mine, &cal), latest_per_day(&theirs, &cal));

        assert_eq!(overlap_percentage(&mine, &theirs), 50);
        assert_eq!(longest_same_mood_streak(&mine, &theirs), 1);
        assert_eq!(most_shared_emoji(&mine, &theirs), Some("😊"));
    }

    #[test]
    fn overlap_bounds() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let cal = DayCalendar::utc();

        let disjoint = vec![mood(a, "😊", "Happy", at(1, 9)), mood(b, "😊", "Happy", at(2, 9))];
        let (mine, theirs) = split(&disjoint, a);
        assert_eq!(overlap_percentage(&latest_per_day(&mine, &cal), &latest_per_day(&theirs, &cal)), 0);

        let matching = vec![
            mood(a, "😊", "Happy", at(1, 9)),
            mood(b, "😊", "Happy", at(1, 9)),
            mood(a, "😢", "Sad", at(3, 9)),
            mood(b, "😢", "Sad", at(3, 9)),
        ];
        let (mine, theirs) = split(&matching, a);
        assert_eq!(overlap_percentage(&latest_per_day(&mine, &cal), &latest_per_day(&theirs, &cal)), 100);

        let empty: DayMap<'_, Mood> = DayMap::new();
        assert_eq!(overlap_percentage(&empty, &empty), 0);
    }

    #[test]
    fn overlap_rounds_to_whole_percent() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(1, 2), 50);
    }

    #[test]
    fn streak_resets_on_calendar_gap() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut moods = Vec::new();
        // Days 1, 2 match; day 3 nobody; days 4, 5, 6 match
        for day in [1, 2, 4, 5, 6] {
            moods.push(mood(a, "🥰", "Loved", at(day, 8)));
            moods.push(mood(b, "🥰", "Loved", at(day, 9)));
        }
        let (mine, theirs) = split(&moods, a);
        let cal = DayCalendar::utc();
        let streak = longest_same_mood_streak(&latest_per_day(&mine, &cal), &latest_per_day(&theirs, &cal));
        assert_eq!(streak, 3);
    }

    #[test]
    fn streak_breaks_when_partner_skips_a_day() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let moods = vec![
            mood(a, "😊", "Happy", at(1, 8)),
            mood(b, "😊", "Happy", at(1, 8)),
            mood(a, "😊", "Happy", at(2, 8)),
            mood(a, "😊", "Happy", at(3, 8)),
            mood(b, "😊", "Happy", at(3, 8)),
        ];
        let (mine, theirs) = split(&moods, a);
        let cal = DayCalendar::utc();
        let streak = longest_same_mood_streak(&latest_per_day(&mine, &cal), &latest_per_day(&theirs, &cal));
        assert_eq!(streak, 1);
    }

    #[test]
    fn latest_per_user_picks_max_timestamp() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let moods = vec![
            mood(a, "😴", "Tired", at(3, 8)),
            mood(b, "😎", "Cool", at(2, 8)),
            mood(a, "😊", "Happy", at(1, 8)),
            mood(b, "😤", "Annoyed", at(1, 8)),
        ];
        let latest = latest_per_user(&moods);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[&a].emoji, "😴");
        assert_eq!(latest[&b].emoji, "😎");
        assert_eq!(partner_latest(&latest, a).map(|m| m.emoji.as_str()), Some("😎"));

        let none: Vec<Mood> = Vec::new();
        assert!(latest_per_user(&none).is_empty());
    }

    #[test]
    fn frequency_ties_go_to_first_seen() {
        let a = Uuid::new_v4();
        let moods = vec![
            mood(a, "😢", "Sad", at(1, 8)),
            mood(a, "😊", "Happy", at(1, 9)),
            mood(a, "😊", "Happy", at(1, 10)),
            mood(a, "😢", "Sad", at(1, 11)),
        ];
        assert_eq!(most_frequent_emoji(&moods), Some("😢"));

        let none: Vec<Mood> = Vec::new();
        assert_eq!(most_frequent_emoji(&none), None);
    }

    #[test]
    fn distribution_sorted_and_capped() {
        let a = Uuid::new_v4();
        let mut moods = vec![mood(a, "😊", "Happy", at(1, 1)), mood(a, "😊", "Happy", at(1, 2))];
        for (i, e) in ["1", "2", "3", "4", "5", "6", "7", "8"].iter().enumerate() {
            moods.push(mood(a, e, "Okay", at(2, i as u32)));
        }
        let dist = mood_distribution(&moods);
        assert_eq!(dist.len(), 8);
        assert_eq!((dist[0].emoji.as_str(), dist[0].count), ("😊", 2));
        assert_eq!(dist[0].tone, Tone::High);
        assert_eq!(dist[1].emoji, "1");
    }
}
