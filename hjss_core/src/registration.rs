//! Learner registration.
//!
//! Input arrives as raw strings from the CLI; everything is checked before a
//! learner id is minted.

use crate::store::{Repository, SchoolStore};
use crate::{Error, Gender, GradeLevel, IdGenerator, Learner, Result};
use chrono::{Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// UK mobile: +44 or 0, then 7 and nine more digits
static UK_MOBILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+44|0)7\d{9}$").expect("UK mobile pattern compiles"));

/// Youngest and oldest accepted ages, in whole years
pub const MIN_AGE_YEARS: u32 = 5;
pub const MAX_AGE_YEARS: u32 = 10;

/// Unvalidated registration details
#[derive(Clone, Debug)]
pub struct NewLearner {
    pub name: String,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub emergency_contact: String,
    pub grade: u8,
}

/// Registration details that passed validation
#[derive(Clone, Debug)]
pub struct ValidatedLearner {
    name: String,
    gender: Gender,
    date_of_birth: NaiveDate,
    emergency_contact: String,
    grade: GradeLevel,
}

impl NewLearner {
    /// Validate against the school's intake rules as of `today`
    pub fn validate(&self, today: NaiveDate) -> Result<ValidatedLearner> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Please provide a valid name".into()));
        }

        let gender: Gender = self.gender.parse()?;
        check_age(self.date_of_birth, today)?;

        let contact: String = self
            .emergency_contact
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if !UK_MOBILE.is_match(&contact) {
            return Err(Error::Validation(format!(
                "'{}' is not a valid UK mobile number (e.g. +447123456789)",
                self.emergency_contact
            )));
        }

        let grade = GradeLevel::new(self.grade)?;

        Ok(ValidatedLearner {
            name: name.to_string(),
            gender,
            date_of_birth: self.date_of_birth,
            emergency_contact: contact,
            grade,
        })
    }
}

/// Accept learners aged 5 through 10 on `today`
fn check_age(date_of_birth: NaiveDate, today: NaiveDate) -> Result<()> {
    let youngest = today.checked_sub_months(Months::new(MIN_AGE_YEARS * 12));
    let too_old = today.checked_sub_months(Months::new((MAX_AGE_YEARS + 1) * 12));

    match (youngest, too_old) {
        (Some(youngest), Some(too_old)) if date_of_birth <= youngest && date_of_birth > too_old => {
            Ok(())
        }
        _ => Err(Error::Validation(format!(
            "Learners must be aged {} to {}; date of birth {} is outside that range",
            MIN_AGE_YEARS, MAX_AGE_YEARS, date_of_birth
        ))),
    }
}

/// Validate and store a new learner, returning the learner id
pub fn register_learner<G>(
    store: &mut SchoolStore,
    ids: &mut G,
    form: &NewLearner,
    today: NaiveDate,
) -> Result<String>
where
    G: IdGenerator + ?Sized,
{
    let valid = form.validate(today)?;
    let id = ids.learner_id(valid.date_of_birth);

    store.learners.add(Learner::new(
        id.clone(),
        valid.name,
        valid.gender,
        valid.date_of_birth,
        valid.emergency_contact,
        valid.grade,
    ));

    tracing::info!("Registered learner {} at grade {}", id, valid.grade);
    Ok(id)
}
