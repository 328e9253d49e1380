//! Booking engine: the booking state machine.
//!
//! Every operation follows the same shape:
//! 1. Look up every entity it touches and run every rule against them
//! 2. Only then mutate, in an order where nothing after the first write can fail
//!
//! A rejected call therefore leaves the store exactly as it was.

use crate::store::{Repository, SchoolStore};
use crate::{rules, Booking, BookingAction, BookingError, BookingStatus, GradeLevel, IdGenerator};

/// Result of marking a booking attended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttendOutcome {
    /// The booking moved to Attended on this call
    Attended {
        lesson_ref: String,
        promoted_to: Option<GradeLevel>,
    },
    /// The booking was already Attended; nothing changed
    AlreadyAttended { lesson_ref: String },
}

impl AttendOutcome {
    pub fn lesson_ref(&self) -> &str {
        match self {
            AttendOutcome::Attended { lesson_ref, .. } => lesson_ref,
            AttendOutcome::AlreadyAttended { lesson_ref } => lesson_ref,
        }
    }

    pub fn promoted_to(&self) -> Option<GradeLevel> {
        match self {
            AttendOutcome::Attended { promoted_to, .. } => *promoted_to,
            AttendOutcome::AlreadyAttended { .. } => None,
        }
    }
}

/// Applies booking operations to an injected store
pub struct BookingEngine<'a, G: IdGenerator + ?Sized> {
    store: &'a mut SchoolStore,
    ids: &'a mut G,
}

impl<'a, G: IdGenerator + ?Sized> BookingEngine<'a, G> {
    pub fn new(store: &'a mut SchoolStore, ids: &'a mut G) -> Self {
        Self { store, ids }
    }

    pub fn store(&self) -> &SchoolStore {
        self.store
    }

    /// Book `learner_id` onto `lesson_ref` and return the new booking id
    pub fn create(&mut self, learner_id: &str, lesson_ref: &str) -> Result<String, BookingError> {
        let result = self.try_create(learner_id, lesson_ref);
        logged("create", result)
    }

    /// Move a Booked booking onto another lesson
    pub fn update(&mut self, booking_id: &str, new_lesson_ref: &str) -> Result<(), BookingError> {
        let result = self.try_update(booking_id, new_lesson_ref);
        logged("update", result)
    }

    pub fn cancel(&mut self, booking_id: &str) -> Result<(), BookingError> {
        let result = self.try_cancel(booking_id);
        logged("cancel", result)
    }

    /// Mark a booking attended, promoting the learner where earned.
    ///
    /// Attending an already attended booking is reported, not rejected.
    pub fn attend(&mut self, booking_id: &str) -> Result<AttendOutcome, BookingError> {
        let result = self.try_attend(booking_id);
        logged("attend", result)
    }

    /// Remove a booking record entirely, freeing its slot if still held
    pub fn delete(&mut self, booking_id: &str) -> Result<Booking, BookingError> {
        let result = self.try_delete(booking_id);
        logged("delete", result)
    }

    pub fn booking(&self, booking_id: &str) -> Option<&Booking> {
        self.store.booking(booking_id)
    }

    pub fn bookings_for_learner(&self, learner_id: &str) -> Vec<&Booking> {
        self.store.bookings_for_learner(learner_id)
    }

    /// Lessons the learner currently holds a Booked booking for
    pub fn active_lesson_refs(&self, learner_id: &str) -> Vec<&str> {
        self.store
            .bookings
            .filter_by(|b| b.learner_id() == learner_id && b.status() == BookingStatus::Booked)
            .into_iter()
            .map(|b| b.lesson_ref())
            .collect()
    }

    fn try_create(&mut self, learner_id: &str, lesson_ref: &str) -> Result<String, BookingError> {
        let SchoolStore {
            learners,
            lessons,
            bookings,
            ..
        } = &mut *self.store;

        let learner = learners
            .find_by_id_mut(learner_id)
            .ok_or_else(|| BookingError::LearnerNotFound(learner_id.to_string()))?;
        let lesson = lessons
            .find_by_id_mut(lesson_ref)
            .ok_or_else(|| BookingError::LessonNotFound(lesson_ref.to_string()))?;

        rules::check_available(lesson)?;
        rules::check_eligibility(learner, lesson)?;
        rules::check_not_already_booked(learner, lesson_ref, &*bookings)?;

        let booking_id = self.ids.booking_id();
        lesson.occupy(&booking_id)?;
        learner.record_booked(&booking_id);
        bookings.add(Booking::new(booking_id.clone(), learner_id, lesson_ref));

        tracing::info!(
            "Booked {} onto {} as {} ({}/{} slots taken)",
            learner_id,
            lesson_ref,
            booking_id,
            lesson.occupied(),
            lesson.capacity()
        );
        Ok(booking_id)
    }

    fn try_update(&mut self, booking_id: &str, new_lesson_ref: &str) -> Result<(), BookingError> {
        let SchoolStore {
            learners,
            lessons,
            bookings,
            ..
        } = &mut *self.store;

        let booking = bookings
            .find_by_id(booking_id)
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;
        let next = rules::check_transition(booking, BookingAction::Change)?;
        let old_lesson_ref = booking.lesson_ref().to_string();
        let learner_id = booking.learner_id().to_string();

        let new_lesson = lessons
            .find_by_id(new_lesson_ref)
            .ok_or_else(|| BookingError::LessonNotFound(new_lesson_ref.to_string()))?;
        let learner = learners
            .find_by_id(&learner_id)
            .ok_or_else(|| BookingError::LearnerNotFound(learner_id.clone()))?;

        if old_lesson_ref == new_lesson_ref {
            return Err(BookingError::DuplicateBooking {
                learner_id,
                lesson_ref: new_lesson_ref.to_string(),
            });
        }
        rules::check_available(new_lesson)?;
        rules::check_eligibility(learner, new_lesson)?;
        rules::check_not_already_booked(learner, new_lesson_ref, &*bookings)?;

        let booking = bookings
            .find_by_id_mut(booking_id)
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;
        let new_lesson = lessons
            .find_by_id_mut(new_lesson_ref)
            .ok_or_else(|| BookingError::LessonNotFound(new_lesson_ref.to_string()))?;

        // Occupy first: it is the only step that can fail.
        new_lesson.occupy(booking_id)?;
        if let Some(old_lesson) = lessons.find_by_id_mut(&old_lesson_ref) {
            old_lesson.release(booking_id);
        }
        booking.repoint(new_lesson_ref);
        booking.set_status(next);

        tracing::info!(
            "Moved booking {} from {} to {}",
            booking_id,
            old_lesson_ref,
            new_lesson_ref
        );
        Ok(())
    }

    fn try_cancel(&mut self, booking_id: &str) -> Result<(), BookingError> {
        let SchoolStore {
            learners,
            lessons,
            bookings,
            ..
        } = &mut *self.store;

        let booking = bookings
            .find_by_id_mut(booking_id)
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;
        let next = rules::check_transition(booking, BookingAction::Cancel)?;
        let learner = learners
            .find_by_id_mut(booking.learner_id())
            .ok_or_else(|| BookingError::LearnerNotFound(booking.learner_id().to_string()))?;

        if let Some(lesson) = lessons.find_by_id_mut(booking.lesson_ref()) {
            lesson.release(booking_id);
        }
        learner.record_cancelled(booking_id);
        booking.set_status(next);

        tracing::info!(
            "Cancelled booking {} on {}",
            booking_id,
            booking.lesson_ref()
        );
        Ok(())
    }

    fn try_attend(&mut self, booking_id: &str) -> Result<AttendOutcome, BookingError> {
        let SchoolStore {
            learners,
            lessons,
            bookings,
            ..
        } = &mut *self.store;

        let booking = bookings
            .find_by_id_mut(booking_id)
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;

        if booking.status() == BookingStatus::Attended {
            tracing::debug!("Booking {} already attended", booking_id);
            return Ok(AttendOutcome::AlreadyAttended {
                lesson_ref: booking.lesson_ref().to_string(),
            });
        }

        let next = rules::check_transition(booking, BookingAction::Attend)?;
        let lesson = lessons
            .find_by_id(booking.lesson_ref())
            .ok_or_else(|| BookingError::LessonNotFound(booking.lesson_ref().to_string()))?;
        let learner = learners
            .find_by_id_mut(booking.learner_id())
            .ok_or_else(|| BookingError::LearnerNotFound(booking.learner_id().to_string()))?;

        let promoted_to = rules::promotion_check(learner, lesson);
        learner.record_attended(booking_id);
        if let Some(grade) = promoted_to {
            learner.promote_to(grade);
            tracing::info!("Learner {} promoted to grade {}", learner.id(), grade);
        }
        booking.set_status(next);

        tracing::info!("Booking {} attended", booking_id);
        Ok(AttendOutcome::Attended {
            lesson_ref: booking.lesson_ref().to_string(),
            promoted_to,
        })
    }

    fn try_delete(&mut self, booking_id: &str) -> Result<Booking, BookingError> {
        let SchoolStore {
            learners,
            lessons,
            bookings,
            ..
        } = &mut *self.store;

        let booking = bookings
            .remove(booking_id)
            .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;

        if let Some(lesson) = lessons.find_by_id_mut(booking.lesson_ref()) {
            lesson.release(booking_id);
        }
        if let Some(learner) = learners.find_by_id_mut(booking.learner_id()) {
            learner.forget(booking_id);
        }

        tracing::warn!("Deleted booking {} ({})", booking_id, booking.status());
        Ok(booking)
    }
}

fn logged<T>(operation: &str, result: Result<T, BookingError>) -> Result<T, BookingError> {
    if let Err(ref e) = result {
        tracing::debug!("Rejected {}: {}", operation, e);
    }
    result
}
