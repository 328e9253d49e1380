//! Core domain types for the HJSS booking system.
//!
//! This module defines the entities the booking engine works on:
//! - Grade levels and learner details
//! - Lessons and their occupant slots
//! - Bookings and the status transition table
//! - Reviews left after attendance

use crate::{BookingError, Error};
use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Grade Levels
// ============================================================================

/// Swimming grade, 1 (beginner) through 5
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct GradeLevel(u8);

impl GradeLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;
    pub const LOWEST: GradeLevel = GradeLevel(Self::MIN);

    pub fn new(value: u8) -> Result<Self, Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(Error::Validation(format!(
                "Grade level must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// The grade one step up, or `None` at the top grade
    pub fn next(self) -> Option<Self> {
        if self.0 < Self::MAX {
            Some(Self(self.0 + 1))
        } else {
            None
        }
    }

    /// All grades in ascending order
    pub fn all() -> impl Iterator<Item = GradeLevel> {
        (Self::MIN..=Self::MAX).map(GradeLevel)
    }
}

impl TryFrom<u8> for GradeLevel {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        GradeLevel::new(value)
    }
}

impl From<GradeLevel> for u8 {
    fn from(grade: GradeLevel) -> Self {
        grade.0
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Learner
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "other" | "others" => Ok(Gender::Other),
            _ => Err(Error::Validation(format!(
                "Gender must be 'Male', 'Female', or 'Other', got '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        };
        f.write_str(s)
    }
}

/// A registered learner and their booking history.
///
/// Every booking id the learner has ever held sits in exactly one of
/// `booked`, `attended` or `cancelled`. The sets are only mutated by the
/// booking engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Learner {
    id: String,
    name: String,
    gender: Gender,
    date_of_birth: NaiveDate,
    emergency_contact: String,
    grade: GradeLevel,
    booked: BTreeSet<String>,
    attended: BTreeSet<String>,
    cancelled: BTreeSet<String>,
}

impl Learner {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        gender: Gender,
        date_of_birth: NaiveDate,
        emergency_contact: impl Into<String>,
        grade: GradeLevel,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            gender,
            date_of_birth,
            emergency_contact: emergency_contact.into(),
            grade,
            booked: BTreeSet::new(),
            attended: BTreeSet::new(),
            cancelled: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn gender(&self) -> Gender {
        self.gender
    }

    pub fn date_of_birth(&self) -> NaiveDate {
        self.date_of_birth
    }

    pub fn emergency_contact(&self) -> &str {
        &self.emergency_contact
    }

    pub fn grade(&self) -> GradeLevel {
        self.grade
    }

    pub fn booked(&self) -> &BTreeSet<String> {
        &self.booked
    }

    pub fn attended(&self) -> &BTreeSet<String> {
        &self.attended
    }

    pub fn cancelled(&self) -> &BTreeSet<String> {
        &self.cancelled
    }

    /// Which history set holds this booking id, if any
    pub fn history_status(&self, booking_id: &str) -> Option<BookingStatus> {
        if self.booked.contains(booking_id) {
            Some(BookingStatus::Booked)
        } else if self.attended.contains(booking_id) {
            Some(BookingStatus::Attended)
        } else if self.cancelled.contains(booking_id) {
            Some(BookingStatus::Cancelled)
        } else {
            None
        }
    }

    pub(crate) fn record_booked(&mut self, booking_id: &str) {
        self.booked.insert(booking_id.to_string());
    }

    pub(crate) fn record_attended(&mut self, booking_id: &str) {
        self.booked.remove(booking_id);
        self.attended.insert(booking_id.to_string());
    }

    pub(crate) fn record_cancelled(&mut self, booking_id: &str) {
        self.booked.remove(booking_id);
        self.cancelled.insert(booking_id.to_string());
    }

    pub(crate) fn forget(&mut self, booking_id: &str) {
        self.booked.remove(booking_id);
        self.attended.remove(booking_id);
        self.cancelled.remove(booking_id);
    }

    pub(crate) fn promote_to(&mut self, grade: GradeLevel) {
        debug_assert_eq!(self.grade.next(), Some(grade));
        self.grade = grade;
    }
}

// ============================================================================
// Lesson
// ============================================================================

/// Lesson availability, always derived from the occupant slots
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Available,
    FullyBooked,
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LessonStatus::Available => f.write_str("Available"),
            LessonStatus::FullyBooked => f.write_str("Fully Booked"),
        }
    }
}

/// A scheduled lesson with a fixed number of occupant slots.
///
/// Capacity is the slot count and never changes after creation, so the
/// occupied count can never exceed it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Lesson {
    lesson_ref: String,
    date: NaiveDate,
    weekday: Weekday,
    start_time: NaiveTime,
    end_time: NaiveTime,
    coach: String,
    grade: GradeLevel,
    slots: Vec<Option<String>>,
}

impl Lesson {
    pub fn new(
        lesson_ref: impl Into<String>,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        coach: impl Into<String>,
        grade: GradeLevel,
        capacity: usize,
    ) -> Result<Self, Error> {
        let lesson_ref = lesson_ref.into();
        if capacity == 0 {
            return Err(Error::Schedule(format!(
                "Lesson {} must have a positive capacity",
                lesson_ref
            )));
        }
        if end_time <= start_time {
            return Err(Error::Schedule(format!(
                "Lesson {} ends before it starts",
                lesson_ref
            )));
        }

        Ok(Self {
            lesson_ref,
            date,
            weekday: date.weekday(),
            start_time,
            end_time,
            coach: coach.into(),
            grade,
            slots: vec![None; capacity],
        })
    }

    pub fn lesson_ref(&self) -> &str {
        &self.lesson_ref
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn weekday(&self) -> Weekday {
        self.weekday
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    /// Display form of the time slot, e.g. "16:00 - 17:00"
    pub fn time_slot(&self) -> String {
        format!(
            "{} - {}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }

    pub fn coach(&self) -> &str {
        &self.coach
    }

    pub fn grade(&self) -> GradeLevel {
        self.grade
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn free_slots(&self) -> usize {
        self.capacity() - self.occupied()
    }

    pub fn occupants(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().filter_map(|s| s.as_deref())
    }

    pub fn has_occupant(&self, booking_id: &str) -> bool {
        self.occupants().any(|id| id == booking_id)
    }

    /// Current availability, recomputed from the slots on every call
    pub fn status(&self) -> LessonStatus {
        if self.occupied() >= self.capacity() {
            LessonStatus::FullyBooked
        } else {
            LessonStatus::Available
        }
    }

    /// Place a booking id into the first empty slot
    pub(crate) fn occupy(&mut self, booking_id: &str) -> Result<(), BookingError> {
        match self.slots.iter_mut().find(|s| s.is_none()) {
            Some(slot) => {
                *slot = Some(booking_id.to_string());
                Ok(())
            }
            None => Err(BookingError::LessonFull(self.lesson_ref.clone())),
        }
    }

    /// Empty the slot holding this booking id. Returns false if it held none.
    pub(crate) fn release(&mut self, booking_id: &str) -> bool {
        match self
            .slots
            .iter_mut()
            .find(|s| s.as_deref() == Some(booking_id))
        {
            Some(slot) => {
                *slot = None;
                true
            }
            None => false,
        }
    }
}

// ============================================================================
// Booking
// ============================================================================

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Booked,
    Cancelled,
    Attended,
}

/// An operation requested against an existing booking
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BookingAction {
    Change,
    Cancel,
    Attend,
}

/// Every legal transition. Anything not listed here is rejected.
const TRANSITIONS: &[(BookingStatus, BookingAction, BookingStatus)] = &[
    (BookingStatus::Booked, BookingAction::Change, BookingStatus::Booked),
    (BookingStatus::Booked, BookingAction::Cancel, BookingStatus::Cancelled),
    (BookingStatus::Booked, BookingAction::Attend, BookingStatus::Attended),
];

impl BookingStatus {
    /// Look up the status reached by applying `action`, if the transition exists
    pub fn apply(self, action: BookingAction) -> Option<BookingStatus> {
        TRANSITIONS
            .iter()
            .find(|(from, act, _)| *from == self && *act == action)
            .map(|(_, _, to)| *to)
    }

    pub fn is_terminal(self) -> bool {
        !TRANSITIONS.iter().any(|(from, _, _)| *from == self)
    }

    /// Booked and Attended bookings keep their lesson place; Cancelled ones give it up
    pub fn holds_slot(self) -> bool {
        self != BookingStatus::Cancelled
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingStatus::Booked => "Booked",
            BookingStatus::Cancelled => "Cancelled",
            BookingStatus::Attended => "Attended",
        };
        f.write_str(s)
    }
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BookingAction::Change => "changed",
            BookingAction::Cancel => "cancelled",
            BookingAction::Attend => "attended",
        };
        f.write_str(s)
    }
}

/// A learner's booking against one lesson
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Booking {
    id: String,
    learner_id: String,
    lesson_ref: String,
    status: BookingStatus,
}

impl Booking {
    pub(crate) fn new(
        id: impl Into<String>,
        learner_id: impl Into<String>,
        lesson_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            learner_id: learner_id.into(),
            lesson_ref: lesson_ref.into(),
            status: BookingStatus::Booked,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn learner_id(&self) -> &str {
        &self.learner_id
    }

    pub fn lesson_ref(&self) -> &str {
        &self.lesson_ref
    }

    pub fn status(&self) -> BookingStatus {
        self.status
    }

    pub(crate) fn repoint(&mut self, lesson_ref: &str) {
        self.lesson_ref = lesson_ref.to_string();
    }

    pub(crate) fn set_status(&mut self, status: BookingStatus) {
        self.status = status;
    }
}

// ============================================================================
// Review
// ============================================================================

/// Feedback left by a learner on a lesson they attended
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Review {
    pub booking_id: String,
    pub learner_id: String,
    pub lesson_ref: String,
    pub coach: String,
    pub lesson_date: NaiveDate,
    pub rating: u8,
    pub text: String,
}
