use chrono::{Datelike, NaiveDateTime, NaiveTime};

use crate::model::{EntryKind, Schedule, ScheduleEntry};

impl Schedule {
    /// Name of the content that should be live at `now`, or `None` when no
    /// entry matches (the caller falls back to its default content).
    pub fn pick(&self, now: NaiveDateTime) -> Option<&str> {
        self.pick_entry(now).map(|e| e.content.as_str())
    }

    /// The matching entry itself, so callers can honor its transition and
    /// fade settings. Two passes: `date` entries for today's calendar date
    /// outrank every `daily` entry; within a pass the first match in list
    /// order wins.
    pub fn pick_entry(&self, now: NaiveDateTime) -> Option<&ScheduleEntry> {
        let t = now.time();
        let today = now.date();

        for entry in &self.entries {
            if entry.kind == EntryKind::Date
                && entry.date == Some(today)
                && in_range(t, entry.start, entry.end)
            {
                return Some(entry);
            }
        }

        let weekday = now.weekday().num_days_from_monday() as u8;
        for entry in &self.entries {
            if entry.kind == EntryKind::Daily
                && entry.weekdays.contains(&weekday)
                && in_range(t, entry.start, entry.end)
            {
                return Some(entry);
            }
        }

        None
    }
}

/// Inclusive-both-ends window membership. A window with `start > end`
/// spans midnight: 22:00..02:00 contains 23:30 and 01:00 but not 12:00.
pub fn in_range(t: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start <= end {
        start <= t && t <= end
    } else {
        t >= start || t <= end
    }
}
