//! Error types for the hjss_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Logical kind of a booking rule rejection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LearnerNotFound,
    LessonNotFound,
    BookingNotFound,
    LessonFull,
    IneligibleGrade,
    DuplicateBooking,
    InvalidTransition,
}

/// Business-rule rejection raised by the booking engine.
///
/// These are never transient: retrying the same call against the same
/// state produces the same rejection.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("Learner not found: {0}")]
    LearnerNotFound(String),

    #[error("Lesson not found: {0}")]
    LessonNotFound(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("Lesson {0} is fully booked")]
    LessonFull(String),

    #[error("Learner at grade {learner_grade} is not eligible for grade {lesson_grade} lesson {lesson_ref}")]
    IneligibleGrade {
        lesson_ref: String,
        learner_grade: u8,
        lesson_grade: u8,
    },

    #[error("Learner {learner_id} has already booked lesson {lesson_ref}")]
    DuplicateBooking {
        learner_id: String,
        lesson_ref: String,
    },

    #[error("Booking {booking_id} is {status} and cannot be {action}")]
    InvalidTransition {
        booking_id: String,
        status: String,
        action: String,
    },
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::LearnerNotFound(_) => ErrorKind::LearnerNotFound,
            BookingError::LessonNotFound(_) => ErrorKind::LessonNotFound,
            BookingError::BookingNotFound(_) => ErrorKind::BookingNotFound,
            BookingError::LessonFull(_) => ErrorKind::LessonFull,
            BookingError::IneligibleGrade { .. } => ErrorKind::IneligibleGrade,
            BookingError::DuplicateBooking { .. } => ErrorKind::DuplicateBooking,
            BookingError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
        }
    }
}

/// Core error type for hjss_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Booking rule rejection
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Lesson schedule generation error
    #[error("Schedule error: {0}")]
    Schedule(String),

    /// Input validation error (registration, reviews)
    #[error("Validation error: {0}")]
    Validation(String),

    /// State snapshot error
    #[error("State error: {0}")]
    State(String),
}

impl Error {
    /// The booking rule kind, if this error is a booking rejection
    pub fn booking_kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Booking(e) => Some(e.kind()),
            _ => None,
        }
    }
}
