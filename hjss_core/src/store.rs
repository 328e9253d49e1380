//! In-memory entity stores.
//!
//! Stores are plain values constructed by the caller and handed to the
//! booking engine and scheduler. Lookup misses are reported as `None` and
//! translated into booking errors by the engine.

use crate::{Booking, BookingStatus, GradeLevel, Learner, Lesson, Review};
use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An entity with a stable key
pub trait Entity {
    fn key(&self) -> &str;
}

impl Entity for Learner {
    fn key(&self) -> &str {
        self.id()
    }
}

impl Entity for Lesson {
    fn key(&self) -> &str {
        self.lesson_ref()
    }
}

impl Entity for Booking {
    fn key(&self) -> &str {
        self.id()
    }
}

/// Keyed collection of entities
pub trait Repository<T: Entity> {
    fn find_by_id(&self, id: &str) -> Option<&T>;

    fn find_by_id_mut(&mut self, id: &str) -> Option<&mut T>;

    /// Insert an entity, replacing any entity with the same key
    fn add(&mut self, entity: T);

    fn remove(&mut self, id: &str) -> Option<T>;

    fn all(&self) -> Box<dyn Iterator<Item = &T> + '_>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn filter_by<P>(&self, predicate: P) -> Vec<&T>
    where
        P: Fn(&T) -> bool,
    {
        self.all().filter(|e| predicate(e)).collect()
    }
}

/// `BTreeMap`-backed repository, iterated in key order
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct InMemoryRepository<T> {
    items: BTreeMap<String, T>,
}

impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
        }
    }
}

impl<T: Entity> Repository<T> for InMemoryRepository<T> {
    fn find_by_id(&self, id: &str) -> Option<&T> {
        self.items.get(id)
    }

    fn find_by_id_mut(&mut self, id: &str) -> Option<&mut T> {
        self.items.get_mut(id)
    }

    fn add(&mut self, entity: T) {
        self.items.insert(entity.key().to_string(), entity);
    }

    fn remove(&mut self, id: &str) -> Option<T> {
        self.items.remove(id)
    }

    fn all(&self) -> Box<dyn Iterator<Item = &T> + '_> {
        Box::new(self.items.values())
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Every entity the school tracks
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchoolStore {
    pub learners: InMemoryRepository<Learner>,
    pub lessons: InMemoryRepository<Lesson>,
    pub bookings: InMemoryRepository<Booking>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl SchoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn learner(&self, id: &str) -> Option<&Learner> {
        self.learners.find_by_id(id)
    }

    pub fn lesson(&self, lesson_ref: &str) -> Option<&Lesson> {
        self.lessons.find_by_id(lesson_ref)
    }

    pub fn booking(&self, id: &str) -> Option<&Booking> {
        self.bookings.find_by_id(id)
    }

    /// Lessons sorted for timetable display: date, start time, then ref
    pub fn timetable(&self) -> Vec<&Lesson> {
        self.sorted_lessons(|_| true)
    }

    pub fn lessons_by_grade(&self, grade: GradeLevel) -> Vec<&Lesson> {
        self.sorted_lessons(|l| l.grade() == grade)
    }

    /// Coach names match case-insensitively
    pub fn lessons_by_coach(&self, coach: &str) -> Vec<&Lesson> {
        self.sorted_lessons(|l| l.coach().eq_ignore_ascii_case(coach.trim()))
    }

    pub fn lessons_by_weekday(&self, weekday: Weekday) -> Vec<&Lesson> {
        self.sorted_lessons(|l| l.weekday() == weekday)
    }

    /// Lessons dated within `start..=end`
    pub fn lessons_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<&Lesson> {
        self.sorted_lessons(|l| l.date() >= start && l.date() <= end)
    }

    pub fn bookings_for_learner(&self, learner_id: &str) -> Vec<&Booking> {
        self.bookings.filter_by(|b| b.learner_id() == learner_id)
    }

    pub fn bookings_with_status(&self, status: BookingStatus) -> Vec<&Booking> {
        self.bookings.filter_by(|b| b.status() == status)
    }

    pub fn reviews_for_coach(&self, coach: &str) -> Vec<&Review> {
        self.reviews
            .iter()
            .filter(|r| r.coach.eq_ignore_ascii_case(coach.trim()))
            .collect()
    }

    fn sorted_lessons<P>(&self, predicate: P) -> Vec<&Lesson>
    where
        P: Fn(&Lesson) -> bool,
    {
        let mut lessons = self.lessons.filter_by(predicate);
        lessons.sort_by(|a, b| {
            (a.date(), a.start_time(), a.lesson_ref()).cmp(&(
                b.date(),
                b.start_time(),
                b.lesson_ref(),
            ))
        });
        lessons
    }
}
