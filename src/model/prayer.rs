use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use strum_macros::{Display, EnumString};

/// The five daily prayers a check-in can be tagged with.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Prayer {
    Subuh,
    Dzuhur,
    Ashar,
    Maghrib,
    Isya,
}

impl Prayer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Prayer::Subuh => "subuh",
            Prayer::Dzuhur => "dzuhur",
            Prayer::Ashar => "ashar",
            Prayer::Maghrib => "maghrib",
            Prayer::Isya => "isya",
        }
    }

    /// Points awarded for attending this prayer, before any arrival bonus.
    pub fn base_points(&self) -> u32 {
        match self {
            Prayer::Subuh => 40,
            Prayer::Maghrib | Prayer::Isya => 30,
            Prayer::Dzuhur | Prayer::Ashar => 0,
        }
    }
}

/// Minutes around the scheduled time during which a check-in counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerWindow {
    pub before_minutes: i64,
    pub after_minutes: i64,
}

/// Window configuration keyed by lowercased prayer name.
pub type PrayerWindows = HashMap<String, PrayerWindow>;

/// One locality's prayer times for one date, as `HH:MM` strings.
///
/// Entries keep the order the provider sent them in. Tagging walks them in
/// that order and the first matching window wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DailySchedule {
    entries: Vec<(String, String)>,
}

impl DailySchedule {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, time)| (name.as_str(), time.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for DailySchedule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ScheduleVisitor;

        impl<'de> Visitor<'de> for ScheduleVisitor {
            type Value = DailySchedule;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of prayer names to times")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(8));
                while let Some((name, value)) = map.next_entry::<String, serde_json::Value>()? {
                    // providers mix in non-time fields such as the formatted date
                    if let serde_json::Value::String(time) = value {
                        entries.push((name, time));
                    }
                }
                Ok(DailySchedule { entries })
            }
        }

        deserializer.deserialize_map(ScheduleVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("Maghrib".parse::<Prayer>().unwrap(), Prayer::Maghrib);
        assert_eq!("SUBUH".parse::<Prayer>().unwrap(), Prayer::Subuh);
        assert!("terbit".parse::<Prayer>().is_err());
        assert_eq!(Prayer::Isya.to_string(), "isya");
    }

    #[test]
    fn base_points_per_prayer() {
        assert_eq!(Prayer::Subuh.base_points(), 40);
        assert_eq!(Prayer::Maghrib.base_points(), 30);
        assert_eq!(Prayer::Isya.base_points(), 30);
        assert_eq!(Prayer::Dzuhur.base_points(), 0);
        assert_eq!(Prayer::Ashar.base_points(), 0);
    }

    #[test]
    fn schedule_keeps_document_order_and_drops_non_strings() {
        let schedule: DailySchedule = serde_json::from_str(
            r#"{"tanggal":"Kamis, 20/03/2025","subuh":"04:45","isya":"19:15","dzuhur":"12:05","id":7}"#,
        )
        .unwrap();

        let names: Vec<&str> = schedule.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["tanggal", "subuh", "isya", "dzuhur"]);
        assert_eq!(schedule.len(), 4);
    }
}
