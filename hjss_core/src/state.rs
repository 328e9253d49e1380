//! School state persistence with file locking.
//!
//! The CLI keeps the whole school (store plus id counters) in one JSON
//! snapshot. Reads take a shared lock; writes go through a locked temp file
//! that is renamed over the original.

use crate::store::{Repository, SchoolStore};
use crate::{Error, Result, SequentialIds};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Everything the CLI persists between invocations
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SchoolState {
    pub store: SchoolStore,
    #[serde(default)]
    pub ids: SequentialIds,
}

impl SchoolState {
    /// Load state from a file with shared locking
    ///
    /// Returns an empty school if the file doesn't exist. A file that exists
    /// but cannot be parsed is an error: bookings are never silently dropped.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No state file found at {:?}, starting empty", path);
            return Ok(Self::default());
        }

        let file = File::open(path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        let state: SchoolState = serde_json::from_str(&contents).map_err(|e| {
            Error::State(format!("State file {:?} is corrupt: {}", path, e))
        })?;

        for problem in state.audit() {
            tracing::warn!("State file {:?}: {}", path, problem);
        }

        tracing::debug!("Loaded school state from {:?}", path);
        Ok(state)
    }

    /// Save state to a file with exclusive locking
    ///
    /// Atomically writes state by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::State(format!("State path {:?} has no parent", path)))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string_pretty(self)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved school state to {:?}", path);
        Ok(())
    }

    /// Load state, modify it, and save it back
    ///
    /// Nothing is written when the closure fails.
    pub fn update<T, F>(path: &Path, f: F) -> Result<T>
    where
        F: FnOnce(&mut SchoolState) -> Result<T>,
    {
        let mut state = Self::load(path)?;
        let value = f(&mut state)?;
        state.save(path)?;
        Ok(value)
    }

    /// Cross-check lessons, bookings and learner histories
    ///
    /// Returns a description of every inconsistency; empty means sound.
    pub fn audit(&self) -> Vec<String> {
        audit_store(&self.store)
    }
}

pub fn audit_store(store: &SchoolStore) -> Vec<String> {
    let mut problems = Vec::new();

    for lesson in store.lessons.all() {
        if lesson.occupied() > lesson.capacity() {
            problems.push(format!(
                "lesson {} holds {} of {} places",
                lesson.lesson_ref(),
                lesson.occupied(),
                lesson.capacity()
            ));
        }
        for occupant in lesson.occupants() {
            match store.booking(occupant) {
                Some(b) if b.status().holds_slot() && b.lesson_ref() == lesson.lesson_ref() => {}
                _ => problems.push(format!(
                    "lesson {} holds a slot for {} which is not booked there",
                    lesson.lesson_ref(),
                    occupant
                )),
            }
        }
    }

    for booking in store.bookings.all() {
        let Some(learner) = store.learner(booking.learner_id()) else {
            problems.push(format!(
                "booking {} names unknown learner {}",
                booking.id(),
                booking.learner_id()
            ));
            continue;
        };
        let Some(lesson) = store.lesson(booking.lesson_ref()) else {
            problems.push(format!(
                "booking {} names unknown lesson {}",
                booking.id(),
                booking.lesson_ref()
            ));
            continue;
        };

        let holds_slot = lesson.has_occupant(booking.id());
        if holds_slot != booking.status().holds_slot() {
            problems.push(format!(
                "booking {} is {} but {} a slot in {}",
                booking.id(),
                booking.status(),
                if holds_slot { "holds" } else { "does not hold" },
                lesson.lesson_ref()
            ));
        }

        if learner.history_status(booking.id()) != Some(booking.status()) {
            problems.push(format!(
                "learner {} history disagrees with booking {} ({})",
                learner.id(),
                booking.id(),
                booking.status()
            ));
        }
    }

    for learner in store.learners.all() {
        let sets = [learner.booked(), learner.attended(), learner.cancelled()];
        for (i, set) in sets.iter().enumerate() {
            for id in set.iter() {
                if sets[i + 1..].iter().any(|other| other.contains(id)) {
                    problems.push(format!(
                        "learner {} lists booking {} under two statuses",
                        learner.id(),
                        id
                    ));
                }
                if store.booking(id).is_none() {
                    problems.push(format!(
                        "learner {} lists unknown booking {}",
                        learner.id(),
                        id
                    ));
                }
            }
        }
    }

    problems
}
