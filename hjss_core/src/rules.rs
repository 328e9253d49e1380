//! Eligibility and capacity rules.
//!
//! Pure predicates over entity snapshots. None of these mutate anything; the
//! booking engine runs them all before committing a change.

use crate::store::Repository;
use crate::{
    Booking, BookingAction, BookingError, BookingStatus, GradeLevel, Learner, Lesson,
    LessonStatus,
};

pub fn is_lesson_available(lesson: &Lesson) -> bool {
    lesson.status() == LessonStatus::Available
}

pub fn check_available(lesson: &Lesson) -> Result<(), BookingError> {
    if is_lesson_available(lesson) {
        Ok(())
    } else {
        Err(BookingError::LessonFull(lesson.lesson_ref().to_string()))
    }
}

/// A learner may book at their own grade or exactly one grade above
pub fn check_eligibility(learner: &Learner, lesson: &Lesson) -> Result<(), BookingError> {
    let current = learner.grade();
    let target = lesson.grade();

    if target == current || Some(target) == current.next() {
        Ok(())
    } else {
        Err(BookingError::IneligibleGrade {
            lesson_ref: lesson.lesson_ref().to_string(),
            learner_grade: current.value(),
            lesson_grade: target.value(),
        })
    }
}

/// Reject a second active booking by the same learner on the same lesson
pub fn check_not_already_booked<R>(
    learner: &Learner,
    lesson_ref: &str,
    bookings: &R,
) -> Result<(), BookingError>
where
    R: Repository<Booking>,
{
    let duplicate = learner
        .booked()
        .iter()
        .filter_map(|id| bookings.find_by_id(id))
        .any(|b| b.lesson_ref() == lesson_ref);

    if duplicate {
        Err(BookingError::DuplicateBooking {
            learner_id: learner.id().to_string(),
            lesson_ref: lesson_ref.to_string(),
        })
    } else {
        Ok(())
    }
}

/// Grade reached by attending `lesson`, if attendance earns a promotion
pub fn promotion_check(learner: &Learner, lesson: &Lesson) -> Option<GradeLevel> {
    let next = learner.grade().next()?;
    (lesson.grade() == next).then_some(next)
}

/// Status a booking moves to under `action`, per the transition table
pub fn check_transition(
    booking: &Booking,
    action: BookingAction,
) -> Result<BookingStatus, BookingError> {
    booking
        .status()
        .apply(action)
        .ok_or_else(|| BookingError::InvalidTransition {
            booking_id: booking.id().to_string(),
            status: booking.status().to_string(),
            action: action.to_string(),
        })
}
