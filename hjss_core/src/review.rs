//! Lesson reviews.
//!
//! Reviews sit outside the booking state machine: they read a booking that
//! has already been attended and never change it.

use crate::store::SchoolStore;
use crate::{BookingError, BookingStatus, Error, Result, Review};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Record a learner's review of an attended lesson
pub fn add_review(
    store: &mut SchoolStore,
    booking_id: &str,
    rating: u8,
    text: &str,
) -> Result<()> {
    let booking = store
        .booking(booking_id)
        .ok_or_else(|| BookingError::BookingNotFound(booking_id.to_string()))?;

    if booking.status() != BookingStatus::Attended {
        return Err(BookingError::InvalidTransition {
            booking_id: booking_id.to_string(),
            status: booking.status().to_string(),
            action: "reviewed".to_string(),
        }
        .into());
    }
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(Error::Validation(format!(
            "Rating must be between {} and {}, got {}",
            MIN_RATING, MAX_RATING, rating
        )));
    }
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::Validation("Review text cannot be empty".into()));
    }
    if store.reviews.iter().any(|r| r.booking_id == booking_id) {
        return Err(Error::Validation(format!(
            "Booking {} has already been reviewed",
            booking_id
        )));
    }

    let lesson = store
        .lesson(booking.lesson_ref())
        .ok_or_else(|| BookingError::LessonNotFound(booking.lesson_ref().to_string()))?;

    let review = Review {
        booking_id: booking_id.to_string(),
        learner_id: booking.learner_id().to_string(),
        lesson_ref: lesson.lesson_ref().to_string(),
        coach: lesson.coach().to_string(),
        lesson_date: lesson.date(),
        rating,
        text: text.to_string(),
    };

    tracing::info!(
        "Review for {} ({}): {} stars",
        review.lesson_ref,
        review.coach,
        rating
    );
    store.reviews.push(review);
    Ok(())
}
