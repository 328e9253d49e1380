//! Lesson scheduler: turns a weekly template into dated lessons.
//!
//! Which coach teaches a session, at what grade and for how many learners is
//! decided by an injected [`AssignmentPolicy`]. The scheduler only walks the
//! calendar and mints references.

use crate::store::{Repository, SchoolStore};
use crate::{Error, GradeLevel, IdGenerator, Lesson, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

// ============================================================================
// Weekly Template
// ============================================================================

/// Sessions held on one weekday
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionTemplate {
    pub weekday: Weekday,
    pub sessions: u32,
    /// Start of the first session; later sessions follow back to back
    pub first_start: NaiveTime,
}

/// The school's repeating week
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WeeklyTemplate {
    #[serde(default = "default_days")]
    pub days: Vec<SessionTemplate>,

    #[serde(default = "default_lesson_minutes")]
    pub lesson_minutes: u32,
}

impl Default for WeeklyTemplate {
    fn default() -> Self {
        Self {
            days: default_days(),
            lesson_minutes: default_lesson_minutes(),
        }
    }
}

fn default_days() -> Vec<SessionTemplate> {
    let afternoon = NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default();
    let saturday = NaiveTime::from_hms_opt(14, 0, 0).unwrap_or_default();

    vec![
        SessionTemplate {
            weekday: Weekday::Mon,
            sessions: 3,
            first_start: afternoon,
        },
        SessionTemplate {
            weekday: Weekday::Wed,
            sessions: 3,
            first_start: afternoon,
        },
        SessionTemplate {
            weekday: Weekday::Fri,
            sessions: 3,
            first_start: afternoon,
        },
        SessionTemplate {
            weekday: Weekday::Sat,
            sessions: 2,
            first_start: saturday,
        },
    ]
}

fn default_lesson_minutes() -> u32 {
    60
}

impl WeeklyTemplate {
    /// Check the template describes at least one session and no session
    /// runs past midnight
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.lesson_minutes == 0 {
            errors.push("lesson_minutes must be positive".to_string());
        }
        if self.days.iter().all(|d| d.sessions == 0) {
            errors.push("template has no sessions".to_string());
        }

        for (i, day) in self.days.iter().enumerate() {
            if self.days[..i].iter().any(|d| d.weekday == day.weekday) {
                errors.push(format!("{} is listed more than once", day.weekday));
            }
            let span = i64::from(day.sessions)
                .checked_mul(i64::from(self.lesson_minutes))
                .and_then(Duration::try_minutes);
            let wraps = match span {
                Some(span) => day.first_start.overflowing_add_signed(span).1 != 0,
                None => true,
            };
            if wraps {
                errors.push(format!("{} sessions run past midnight", day.weekday));
            }
        }

        errors
    }

    fn sessions_on(&self, weekday: Weekday) -> Option<&SessionTemplate> {
        self.days.iter().find(|d| d.weekday == weekday)
    }
}

/// Inclusive range of dates to schedule
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(Error::Schedule(format!(
                "Window end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// `weeks_before` weeks before `today` through `weeks_after` weeks after
    pub fn around(today: NaiveDate, weeks_before: u32, weeks_after: u32) -> Result<Self> {
        let shift = |weeks: u32, forward: bool| {
            let span = Duration::try_weeks(i64::from(weeks))?;
            if forward {
                today.checked_add_signed(span)
            } else {
                today.checked_sub_signed(span)
            }
        };
        match (shift(weeks_before, false), shift(weeks_after, true)) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => Err(Error::Schedule(format!(
                "Window of {} weeks before and {} weeks after {} is out of range",
                weeks_before, weeks_after, today
            ))),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

// ============================================================================
// Assignment Policies
// ============================================================================

/// Supplies coach, target grade and capacity for each generated session
pub trait AssignmentPolicy {
    fn coach(&mut self, date: NaiveDate, session: u32) -> String;

    fn grade(&mut self, date: NaiveDate, session: u32) -> GradeLevel;

    fn capacity(&mut self, date: NaiveDate, session: u32) -> usize;
}

/// Random coach and grade per session, fixed capacity
pub struct RandomAssignment {
    rng: StdRng,
    coaches: Vec<String>,
    capacity: usize,
}

impl RandomAssignment {
    /// Pass a seed for a reproducible timetable
    pub fn new(coaches: Vec<String>, capacity: usize, seed: Option<u64>) -> Result<Self> {
        if coaches.is_empty() {
            return Err(Error::Schedule("at least one coach is required".into()));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            rng,
            coaches,
            capacity,
        })
    }
}

impl AssignmentPolicy for RandomAssignment {
    fn coach(&mut self, _date: NaiveDate, _session: u32) -> String {
        self.coaches
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or_default()
    }

    fn grade(&mut self, _date: NaiveDate, _session: u32) -> GradeLevel {
        let value = self.rng.gen_range(GradeLevel::MIN..=GradeLevel::MAX);
        GradeLevel::new(value).unwrap_or(GradeLevel::LOWEST)
    }

    fn capacity(&mut self, _date: NaiveDate, _session: u32) -> usize {
        self.capacity
    }
}

/// Deterministic policy: coaches rotate, grades cycle 1 through 5
pub struct RotatingAssignment {
    coaches: Vec<String>,
    capacity: usize,
    next_coach: usize,
    next_grade: u8,
}

impl RotatingAssignment {
    pub fn new(coaches: Vec<String>, capacity: usize) -> Result<Self> {
        if coaches.is_empty() {
            return Err(Error::Schedule("at least one coach is required".into()));
        }
        Ok(Self {
            coaches,
            capacity,
            next_coach: 0,
            next_grade: GradeLevel::MIN,
        })
    }
}

impl AssignmentPolicy for RotatingAssignment {
    fn coach(&mut self, _date: NaiveDate, _session: u32) -> String {
        let coach = self.coaches[self.next_coach % self.coaches.len()].clone();
        self.next_coach += 1;
        coach
    }

    fn grade(&mut self, _date: NaiveDate, _session: u32) -> GradeLevel {
        let grade = GradeLevel::new(self.next_grade).unwrap_or(GradeLevel::LOWEST);
        self.next_grade = if self.next_grade >= GradeLevel::MAX {
            GradeLevel::MIN
        } else {
            self.next_grade + 1
        };
        grade
    }

    fn capacity(&mut self, _date: NaiveDate, _session: u32) -> usize {
        self.capacity
    }
}

// ============================================================================
// Scheduler
// ============================================================================

pub struct Scheduler {
    template: WeeklyTemplate,
}

impl Scheduler {
    pub fn new(template: WeeklyTemplate) -> Result<Self> {
        let errors = template.validate();
        if !errors.is_empty() {
            return Err(Error::Schedule(errors.join("; ")));
        }
        Ok(Self { template })
    }

    pub fn template(&self) -> &WeeklyTemplate {
        &self.template
    }

    /// Create every templated session in `window` and add it to `store`.
    ///
    /// Returns the new lesson references in calendar order. Nothing is added
    /// if any session is rejected.
    pub fn generate<P, G>(
        &self,
        window: DateWindow,
        policy: &mut P,
        ids: &mut G,
        store: &mut SchoolStore,
    ) -> Result<Vec<String>>
    where
        P: AssignmentPolicy + ?Sized,
        G: IdGenerator + ?Sized,
    {
        let length = Duration::minutes(i64::from(self.template.lesson_minutes));
        let mut lessons = Vec::new();

        for date in window.days() {
            let Some(day) = self.template.sessions_on(date.weekday()) else {
                continue;
            };

            for session in 0..day.sessions {
                let start = day.first_start + length * session as i32;
                let lesson = Lesson::new(
                    ids.lesson_ref(date),
                    date,
                    start,
                    start + length,
                    policy.coach(date, session),
                    policy.grade(date, session),
                    policy.capacity(date, session),
                )?;
                lessons.push(lesson);
            }
        }

        let refs: Vec<String> = lessons.iter().map(|l| l.lesson_ref().to_string()).collect();
        for lesson in lessons {
            store.lessons.add(lesson);
        }

        tracing::info!(
            "Scheduled {} lessons from {} to {}",
            refs.len(),
            window.start(),
            window.end()
        );
        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SequentialIds;

    fn coaches() -> Vec<String> {
        vec!["Mason".into(), "Ava".into(), "Liam".into()]
    }

    // Monday 6 May 2024 through Sunday 12 May 2024
    fn one_week() -> DateWindow {
        DateWindow::new(
            NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
            NaiveDate::from_ymd_opt(2024, 5, 12).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_default_week_produces_eleven_lessons() {
        let scheduler = Scheduler::new(WeeklyTemplate::default()).unwrap();
        let mut policy = RotatingAssignment::new(coaches(), 4).unwrap();
        let mut ids = SequentialIds::new();
        let mut store = SchoolStore::new();

        let refs = scheduler
            .generate(one_week(), &mut policy, &mut ids, &mut store)
            .unwrap();

        assert_eq!(refs.len(), 11);
        assert_eq!(store.lessons.len(), 11);
        assert_eq!(refs[0], "mon-06-05-2024-SLT1");
        assert_eq!(refs[10], "sat-11-05-2024-SLT11");

        let monday = store.lessons_by_weekday(Weekday::Mon);
        let slots: Vec<_> = monday.iter().map(|l| l.time_slot()).collect();
        assert_eq!(
            slots,
            vec!["16:00 - 17:00", "17:00 - 18:00", "18:00 - 19:00"]
        );

        let saturday = store.lessons_by_weekday(Weekday::Sat);
        assert_eq!(saturday.len(), 2);
        assert_eq!(saturday[0].time_slot(), "14:00 - 15:00");
        assert!(store.lessons_by_weekday(Weekday::Sun).is_empty());
    }

    #[test]
    fn test_refs_are_unique_across_runs() {
        let scheduler = Scheduler::new(WeeklyTemplate::default()).unwrap();
        let mut policy = RotatingAssignment::new(coaches(), 4).unwrap();
        let mut ids = SequentialIds::new();
        let mut store = SchoolStore::new();

        scheduler
            .generate(one_week(), &mut policy, &mut ids, &mut store)
            .unwrap();
        scheduler
            .generate(one_week(), &mut policy, &mut ids, &mut store)
            .unwrap();

        assert_eq!(store.lessons.len(), 22);
    }

    #[test]
    fn test_rotating_assignment_cycles() {
        let mut policy = RotatingAssignment::new(coaches(), 4).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();

        let grades: Vec<u8> = (0..6).map(|i| policy.grade(date, i).value()).collect();
        assert_eq!(grades, vec![1, 2, 3, 4, 5, 1]);

        let names: Vec<String> = (0..4).map(|i| policy.coach(date, i)).collect();
        assert_eq!(names, vec!["Mason", "Ava", "Liam", "Mason"]);
    }

    #[test]
    fn test_seeded_random_assignment_is_reproducible() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let mut a = RandomAssignment::new(coaches(), 4, Some(7)).unwrap();
        let mut b = RandomAssignment::new(coaches(), 4, Some(7)).unwrap();

        for session in 0..20 {
            assert_eq!(a.coach(date, session), b.coach(date, session));
            assert_eq!(a.grade(date, session), b.grade(date, session));
        }
        assert_eq!(a.capacity(date, 0), 4);
    }

    #[test]
    fn test_zero_capacity_adds_nothing() {
        let scheduler = Scheduler::new(WeeklyTemplate::default()).unwrap();
        let mut policy = RotatingAssignment::new(coaches(), 0).unwrap();
        let mut ids = SequentialIds::new();
        let mut store = SchoolStore::new();

        let result = scheduler.generate(one_week(), &mut policy, &mut ids, &mut store);

        assert!(matches!(result, Err(Error::Schedule(_))));
        assert!(store.lessons.is_empty());
    }

    #[test]
    fn test_invalid_templates() {
        let late = WeeklyTemplate {
            days: vec![SessionTemplate {
                weekday: Weekday::Mon,
                sessions: 3,
                first_start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            }],
            lesson_minutes: 60,
        };
        assert!(Scheduler::new(late).is_err());

        let empty = WeeklyTemplate {
            days: vec![],
            lesson_minutes: 60,
        };
        assert!(Scheduler::new(empty).is_err());

        assert!(RandomAssignment::new(vec![], 4, None).is_err());
    }

    #[test]
    fn test_oversized_template_is_rejected_not_panicking() {
        let huge = WeeklyTemplate {
            days: vec![SessionTemplate {
                weekday: Weekday::Tue,
                sessions: u32::MAX,
                first_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            }],
            lesson_minutes: u32::MAX,
        };
        let errors = huge.validate();
        assert_eq!(errors, vec!["Tue sessions run past midnight".to_string()]);
        assert!(matches!(Scheduler::new(huge), Err(Error::Schedule(_))));
    }

    #[test]
    fn test_window_validation() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        assert!(DateWindow::new(today, today - Duration::days(1)).is_err());

        let window = DateWindow::around(today, 4, 2).unwrap();
        assert_eq!(window.start(), NaiveDate::from_ymd_opt(2024, 4, 17).unwrap());
        assert_eq!(window.end(), NaiveDate::from_ymd_opt(2024, 5, 29).unwrap());
        assert_eq!(window.days().count(), 43);

        assert!(matches!(
            DateWindow::around(today, u32::MAX, 2),
            Err(Error::Schedule(_))
        ));
    }
}
