use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use icalendar::{Calendar, Component, Event, EventLike};

use crate::models::Course;

/// Renders a student's enrolled courses as an iCal feed: one weekly-recurring
/// event per (course, time slot), anchored at the slot's next occurrence on
/// or after the reference date.
#[derive(Clone, Default)]
pub struct ScheduleExporter;

impl ScheduleExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, courses: &[Course], from: NaiveDate) -> Vec<u8> {
        if courses.is_empty() {
            return Vec::new();
        }

        let mut calendar = Calendar::new();
        calendar.name("Course Schedule");

        for course in courses {
            for slot in &course.time_slots {
                // Day tokens are free-form; only recognizable weekday names
                // can be placed on a calendar.
                let Ok(weekday) = slot.day.parse::<Weekday>() else {
                    tracing::warn!(
                        day = %slot.day,
                        course = %course.name,
                        "unrecognized weekday in time slot, skipping"
                    );
                    continue;
                };
                let date = next_occurrence(from, weekday);

                let mut event = Event::new();
                event.summary(&course.name);
                event.starts(NaiveDateTime::new(date, slot.start));
                event.ends(NaiveDateTime::new(date, slot.end));
                event.add_property("RRULE", "FREQ=WEEKLY");
                event.description(&format!(
                    "Instructor: {}\n{}",
                    course.instructor, course.content
                ));
                event.uid(&format!(
                    "{}-{}-{}-course-registry",
                    course.id,
                    slot.day.to_lowercase(),
                    slot.start.format("%H%M")
                ));
                calendar.push(event);
            }
        }

        calendar.to_string().into_bytes()
    }
}

fn next_occurrence(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (weekday.num_days_from_monday() + 7 - from.weekday().num_days_from_monday()) % 7;
    from + Duration::days(ahead as i64)
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::schedule::TimeSlot;

    fn course(name: &str, slots: &[(&str, &str)]) -> Course {
        Course {
            id: Uuid::new_v4(),
            name: name.to_string(),
            instructor: "Dr. Rahimi".to_string(),
            capacity: 30,
            content: "Weekly lecture".to_string(),
            time_slots: slots
                .iter()
                .map(|(day, range)| TimeSlot::new(*day, range).unwrap())
                .collect(),
            enrolled: vec![],
        }
    }

    #[test]
    fn test_next_occurrence() {
        // 2025-11-24 is a Monday.
        let monday = NaiveDate::from_ymd_opt(2025, 11, 24).unwrap();
        assert_eq!(next_occurrence(monday, Weekday::Mon), monday);
        assert_eq!(
            next_occurrence(monday, Weekday::Wed),
            NaiveDate::from_ymd_opt(2025, 11, 26).unwrap()
        );
        let sunday = NaiveDate::from_ymd_opt(2025, 11, 30).unwrap();
        assert_eq!(
            next_occurrence(sunday, Weekday::Mon),
            NaiveDate::from_ymd_opt(2025, 12, 1).unwrap()
        );
    }

    #[test]
    fn test_generate_weekly_events() {
        let exporter = ScheduleExporter::new();
        let courses = vec![course("Algorithms", &[("Monday", "09:00-10:30")])];
        let from = NaiveDate::from_ymd_opt(2025, 11, 24).unwrap();
        let body = String::from_utf8(exporter.generate(&courses, from)).unwrap();
        assert!(body.contains("BEGIN:VEVENT"));
        assert!(body.contains("Algorithms"));
        assert!(body.contains("RRULE:FREQ=WEEKLY"));
        assert!(body.contains("Dr. Rahimi"));
    }

    #[test]
    fn test_generate_skips_unknown_day() {
        let exporter = ScheduleExporter::new();
        let courses = vec![course(
            "Algorithms",
            &[("Someday", "09:00-10:30"), ("Friday", "14:00-16:00")],
        )];
        let from = NaiveDate::from_ymd_opt(2025, 11, 24).unwrap();
        let body = String::from_utf8(exporter.generate(&courses, from)).unwrap();
        let events = body.matches("BEGIN:VEVENT").count();
        assert_eq!(events, 1);
    }

    #[test]
    fn test_generate_empty() {
        let exporter = ScheduleExporter::new();
        let from = NaiveDate::from_ymd_opt(2025, 11, 24).unwrap();
        assert!(exporter.generate(&[], from).is_empty());
    }
}
