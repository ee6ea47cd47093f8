use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::warn;

use crate::model::prayer::{DailySchedule, Prayer, PrayerWindows};

/// Arrivals ranked at or below this earn a bonus.
pub const BONUS_RANKS: u32 = 10;

/// Finds the prayer whose window contains `now`, walking the schedule in
/// provider order. Windows may overlap; the first match wins.
///
/// Entries are skipped when the name has no window configured, is not one of
/// the five daily prayers, or its time is not `HH:MM`. Window bounds are
/// exclusive.
pub fn match_prayer(
    schedule: &DailySchedule,
    windows: &PrayerWindows,
    date: NaiveDate,
    now: NaiveDateTime,
) -> Option<Prayer> {
    for (name, time) in schedule.iter() {
        let name = name.to_lowercase();
        let Some(window) = windows.get(&name) else {
            continue;
        };
        let Ok(prayer) = name.parse::<Prayer>() else {
            continue;
        };
        let scheduled = match NaiveTime::parse_from_str(time, "%H:%M") {
            Ok(t) => date.and_time(t),
            Err(_) => {
                warn!(prayer = %name, time, "Failed to parse prayer time");
                continue;
            }
        };

        let start = scheduled - Duration::minutes(window.before_minutes);
        let end = scheduled + Duration::minutes(window.after_minutes);

        if now > start && now < end {
            return Some(prayer);
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub prayer_points: u32,
    pub arrival_points: u32,
    pub total_points: u32,
}

/// `rank` is 1-based among arrivals at the same device.
pub fn arrival_bonus(rank: u32) -> u32 {
    if rank <= BONUS_RANKS {
        BONUS_RANKS + 1 - rank
    } else {
        0
    }
}

pub fn score(prayer: Prayer, rank: u32) -> Score {
    let prayer_points = prayer.base_points();
    let arrival_points = arrival_bonus(rank);
    Score {
        prayer_points,
        arrival_points,
        total_points: prayer_points + arrival_points,
    }
}
