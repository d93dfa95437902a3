use chrono::NaiveTime;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::models::Course;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("invalid time range {0:?}: expected \"HH:MM-HH:MM\"")]
    InvalidTimeFormat(String),
    #[error("invalid time range {0:?}: start must be before end")]
    StartNotBeforeEnd(String),
}

/// One weekly occupied interval of a course. The `day` token is free-form and
/// compared by exact equality; start/end are half-open `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSlot {
    pub day: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn new(day: impl Into<String>, range: &str) -> Result<Self, ScheduleError> {
        let (start, end) = parse_range(range)?;
        if start >= end {
            return Err(ScheduleError::StartNotBeforeEnd(range.to_string()));
        }
        Ok(Self {
            day: day.into(),
            start,
            end,
        })
    }

    /// Same day and intersecting intervals. Slots that exactly abut do not
    /// overlap (strict inequalities, half-open intervals).
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.day == other.day && self.start < other.end && other.start < self.end
    }

    pub fn range_string(&self) -> String {
        format!(
            "{}-{}",
            self.start.format("%H:%M"),
            self.end.format("%H:%M")
        )
    }
}

// Persisted and sent over the wire as a ("Monday", "09:00-10:30") pair.
impl Serialize for TimeSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.day, self.range_string()).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TimeSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (day, range): (String, String) = Deserialize::deserialize(deserializer)?;
        TimeSlot::new(day, &range).map_err(D::Error::custom)
    }
}

fn parse_range(range: &str) -> Result<(NaiveTime, NaiveTime), ScheduleError> {
    let malformed = || ScheduleError::InvalidTimeFormat(range.to_string());
    let (start, end) = range.split_once('-').ok_or_else(malformed)?;
    let start = parse_hhmm(start.trim()).ok_or_else(malformed)?;
    let end = parse_hhmm(end.trim()).ok_or_else(malformed)?;
    Ok((start, end))
}

// Only zero-padded two-digit components are accepted; "9:05" or "09:5" would
// order incorrectly under the original integer comparison scheme.
fn parse_hhmm(text: &str) -> Option<NaiveTime> {
    let (hour, minute) = text.split_once(':')?;
    if hour.len() != 2
        || minute.len() != 2
        || !hour.bytes().all(|b| b.is_ascii_digit())
        || !minute.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    NaiveTime::from_hms_opt(hour.parse().ok()?, minute.parse().ok()?, 0)
}

/// True when any slot of `candidate` overlaps any slot of a course the
/// student already holds.
pub fn has_time_conflict(candidate: &Course, student_courses: &[Course]) -> bool {
    student_courses
        .iter()
        .flat_map(|course| &course.time_slots)
        .any(|held| candidate.time_slots.iter().any(|slot| slot.overlaps(held)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(day: &str, range: &str) -> TimeSlot {
        TimeSlot::new(day, range).unwrap()
    }

    #[test]
    fn test_parse_valid_range() {
        let slot = slot("Monday", "09:30-11:00");
        assert_eq!(slot.start, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(slot.end, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
        assert_eq!(slot.range_string(), "09:30-11:00");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for range in [
            "9:05-10:00",
            "09:5-10:00",
            "09:00-10:0",
            "0900-1000",
            "09:00",
            "09:00-10:00-11:00",
            "ab:cd-ef:gh",
            "24:00-25:00",
            "09:60-10:00",
            "",
        ] {
            assert_eq!(
                TimeSlot::new("Monday", range),
                Err(ScheduleError::InvalidTimeFormat(range.to_string())),
                "range {range:?} should be rejected as malformed"
            );
        }
    }

    #[test]
    fn test_parse_rejects_empty_or_reversed_slot() {
        assert_eq!(
            TimeSlot::new("Monday", "10:00-10:00"),
            Err(ScheduleError::StartNotBeforeEnd("10:00-10:00".to_string()))
        );
        assert_eq!(
            TimeSlot::new("Monday", "11:00-10:00"),
            Err(ScheduleError::StartNotBeforeEnd("11:00-10:00".to_string()))
        );
    }

    #[test]
    fn test_overlaps_is_symmetric() {
        let a = slot("Monday", "09:00-10:30");
        let b = slot("Monday", "10:00-11:00");
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        let c = slot("Monday", "12:00-13:00");
        assert!(!a.overlaps(&c));
        assert!(!c.overlaps(&a));
    }

    #[test]
    fn test_abutting_slots_do_not_overlap() {
        let morning = slot("Monday", "09:00-10:00");
        let next = slot("Monday", "10:00-11:00");
        assert!(!morning.overlaps(&next));
        assert!(!next.overlaps(&morning));
    }

    #[test]
    fn test_different_days_never_overlap() {
        let a = slot("Monday", "09:00-10:00");
        let b = slot("Tuesday", "09:00-10:00");
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_day_tokens_compare_exactly() {
        let a = slot("Monday", "09:00-10:00");
        let b = slot("monday", "09:00-10:00");
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_identical_slots_overlap() {
        let a = slot("Friday", "14:00-16:00");
        assert!(a.overlaps(&a.clone()));
    }

    #[test]
    fn test_containment_overlaps() {
        let outer = slot("Wednesday", "08:00-12:00");
        let inner = slot("Wednesday", "09:00-10:00");
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn test_serde_round_trip_as_pair() {
        let slot = slot("Monday", "09:00-10:30");
        let encoded = serde_json::to_string(&slot).unwrap();
        assert_eq!(encoded, r#"["Monday","09:00-10:30"]"#);
        let decoded: TimeSlot = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, slot);
    }

    #[test]
    fn test_deserialize_rejects_malformed_pair() {
        let err = serde_json::from_str::<TimeSlot>(r#"["Monday","9:5-10"]"#).unwrap_err();
        assert!(err.to_string().contains("HH:MM-HH:MM"));
    }
}
