#![forbid(unsafe_code)]

//! Core domain model and business logic for the Hatfield Junior Swimming
//! School booking system.
//!
//! This crate provides:
//! - Domain types (learners, lessons, bookings, reviews)
//! - Booking engine and its rules
//! - Timetable generation
//! - Registration, reviews and monthly reports
//! - Persistence (JSON state snapshot, CSV reports)

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod ids;
pub mod store;
pub mod rules;
pub mod engine;
pub mod scheduler;
pub mod registration;
pub mod review;
pub mod report;
pub mod state;

// Re-export commonly used types
pub use error::{BookingError, Error, ErrorKind, Result};
pub use types::*;
pub use config::Config;
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use store::{InMemoryRepository, Repository, SchoolStore};
pub use engine::{AttendOutcome, BookingEngine};
pub use scheduler::{
    AssignmentPolicy, DateWindow, RandomAssignment, RotatingAssignment, Scheduler,
    SessionTemplate, WeeklyTemplate,
};
pub use registration::{register_learner, NewLearner};
pub use review::add_review;
pub use state::SchoolState;
