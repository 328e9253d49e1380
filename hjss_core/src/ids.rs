//! Identifier generation for learners, lessons and bookings.
//!
//! Generators own their counters and are passed explicitly to whatever mints
//! ids, so tests can run several independent schools side by side.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Source of fresh entity identifiers
pub trait IdGenerator {
    fn learner_id(&mut self, date_of_birth: NaiveDate) -> String;

    /// Reference for a lesson held on `date`
    fn lesson_ref(&mut self, date: NaiveDate) -> String;

    fn booking_id(&mut self) -> String;
}

/// Counter-based generator producing readable, reproducible ids.
///
/// - learners: `HJSS-20170314-000`
/// - lessons: `mon-06-05-2024-SLT1`
/// - bookings: `BK-0001`
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SequentialIds {
    next_learner: u32,
    next_lesson: u32,
    next_booking: u32,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn learner_id(&mut self, date_of_birth: NaiveDate) -> String {
        let id = format!(
            "HJSS-{}-{:03}",
            date_of_birth.format("%Y%m%d"),
            self.next_learner
        );
        self.next_learner += 1;
        id
    }

    fn lesson_ref(&mut self, date: NaiveDate) -> String {
        self.next_lesson += 1;
        format!(
            "{}-{:02}-{:02}-{}-SLT{}",
            weekday_abbrev(date),
            date.day(),
            date.month(),
            date.year(),
            self.next_lesson
        )
    }

    fn booking_id(&mut self) -> String {
        self.next_booking += 1;
        format!("BK-{:04}", self.next_booking)
    }
}

/// Generator for globally unique ids (v4 UUIDs).
///
/// Lesson refs keep the weekday and date prefix so they stay readable.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn learner_id(&mut self, date_of_birth: NaiveDate) -> String {
        format!("HJSS-{}-{}", date_of_birth.format("%Y%m%d"), Uuid::new_v4())
    }

    fn lesson_ref(&mut self, date: NaiveDate) -> String {
        format!(
            "{}-{}-{}",
            weekday_abbrev(date),
            date.format("%d-%m-%Y"),
            Uuid::new_v4()
        )
    }

    fn booking_id(&mut self) -> String {
        format!("BK-{}", Uuid::new_v4())
    }
}

fn weekday_abbrev(date: NaiveDate) -> String {
    date.weekday().to_string().to_lowercase()
}
