//! Monthly learner and coach reports, with CSV export.

use crate::store::{Repository, SchoolStore};
use crate::{BookingStatus, Error, Result};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One booking line inside a learner's monthly report
#[derive(Clone, Debug, PartialEq)]
pub struct LessonLine {
    pub booking_id: String,
    pub lesson_ref: String,
    pub date: NaiveDate,
    pub coach: String,
    pub grade: u8,
    pub status: BookingStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LearnerMonthlyReport {
    pub learner_id: String,
    pub name: String,
    pub grade: u8,
    pub lessons: Vec<LessonLine>,
}

impl LearnerMonthlyReport {
    pub fn count(&self, status: BookingStatus) -> usize {
        self.lessons.iter().filter(|l| l.status == status).count()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CoachMonthlyReport {
    pub coach: String,
    pub reviews: usize,
    pub average_rating: f64,
}

#[derive(Debug, Serialize)]
struct LearnerCsvRow<'a> {
    learner_id: &'a str,
    name: &'a str,
    grade: u8,
    booked: usize,
    cancelled: usize,
    attended: usize,
}

#[derive(Debug, Serialize)]
struct CoachCsvRow<'a> {
    coach: &'a str,
    reviews: usize,
    average_rating: String,
}

fn check_month(month: u32) -> Result<()> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "Month must be between 1 and 12, got {}",
            month
        )))
    }
}

fn in_month(date: NaiveDate, year: i32, month: u32) -> bool {
    date.year() == year && date.month() == month
}

/// Every learner with their bookings on lessons held in `year`/`month`
pub fn learner_monthly_report(
    store: &SchoolStore,
    year: i32,
    month: u32,
) -> Result<Vec<LearnerMonthlyReport>> {
    check_month(month)?;

    let report = store
        .learners
        .all()
        .map(|learner| {
            let mut lessons: Vec<LessonLine> = store
                .bookings_for_learner(learner.id())
                .into_iter()
                .filter_map(|booking| {
                    let lesson = store.lesson(booking.lesson_ref())?;
                    in_month(lesson.date(), year, month).then(|| LessonLine {
                        booking_id: booking.id().to_string(),
                        lesson_ref: lesson.lesson_ref().to_string(),
                        date: lesson.date(),
                        coach: lesson.coach().to_string(),
                        grade: lesson.grade().value(),
                        status: booking.status(),
                    })
                })
                .collect();
            lessons.sort_by(|a, b| (a.date, &a.lesson_ref).cmp(&(b.date, &b.lesson_ref)));

            LearnerMonthlyReport {
                learner_id: learner.id().to_string(),
                name: learner.name().to_string(),
                grade: learner.grade().value(),
                lessons,
            }
        })
        .collect();

    Ok(report)
}

/// Average rating per coach for lessons held in `year`/`month`, by coach name
pub fn coach_monthly_report(
    store: &SchoolStore,
    year: i32,
    month: u32,
) -> Result<Vec<CoachMonthlyReport>> {
    check_month(month)?;

    let mut totals: BTreeMap<&str, (u32, usize)> = BTreeMap::new();
    for review in store
        .reviews
        .iter()
        .filter(|r| in_month(r.lesson_date, year, month))
    {
        let entry = totals.entry(review.coach.as_str()).or_default();
        entry.0 += u32::from(review.rating);
        entry.1 += 1;
    }

    Ok(totals
        .into_iter()
        .map(|(coach, (sum, count))| CoachMonthlyReport {
            coach: coach.to_string(),
            reviews: count,
            average_rating: f64::from(sum) / count as f64,
        })
        .collect())
}

/// Write learner summaries as CSV, returning the number of rows
pub fn write_learner_report_csv(path: &Path, report: &[LearnerMonthlyReport]) -> Result<usize> {
    let rows = report.iter().map(|r| LearnerCsvRow {
        learner_id: &r.learner_id,
        name: &r.name,
        grade: r.grade,
        booked: r.count(BookingStatus::Booked),
        cancelled: r.count(BookingStatus::Cancelled),
        attended: r.count(BookingStatus::Attended),
    });
    write_csv(path, rows)
}

/// Write coach averages as CSV, returning the number of rows
pub fn write_coach_report_csv(path: &Path, report: &[CoachMonthlyReport]) -> Result<usize> {
    let rows = report.iter().map(|r| CoachCsvRow {
        coach: &r.coach,
        reviews: r.reviews,
        average_rating: format!("{:.2}", r.average_rating),
    });
    write_csv(path, rows)
}

fn write_csv<R, I>(path: &Path, rows: I) -> Result<usize>
where
    R: Serialize,
    I: IntoIterator<Item = R>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(path)?;
    let mut count = 0;
    for row in rows {
        writer.serialize(row)?;
        count += 1;
    }
    writer.flush()?;

    tracing::info!("Wrote {} report rows to {:?}", count, path);
    Ok(count)
}
