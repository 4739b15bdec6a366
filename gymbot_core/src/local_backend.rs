//! File-backed backend used by the CLI and the tests.
//!
//! A single JSON file holds every table; reads take a shared lock, writes go
//! through a temp file and an atomic rename. A fresh file is seeded with the
//! built-in catalog so the bot is usable without any setup.

use crate::backend::Backend;
use crate::catalog::seed_catalog;
use crate::{
    CycleDay, Error, Exercise, MuscleGroup, NewCycleDay, NewWorkout, Result, TrainingCycle,
    UserRecord, Workout,
};
use chrono::NaiveDate;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

// ============================================================================
// Storage rows
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
struct CycleRow {
    id: i64,
    user: i64,
    name: String,
    length: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct CycleDayRow {
    id: i64,
    cycle: i64,
    day_number: u32,
    is_training_day: bool,
    muscle_groups: Vec<i64>,
    default_exercises: Vec<i64>,
    title: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct WorkoutRow {
    id: i64,
    user: i64,
    date: NaiveDate,
    is_from_plan: bool,
    muscle_groups: Vec<i64>,
    cycle_day: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct SetRow {
    id: i64,
    workout: i64,
    exercise: i64,
    reps: u32,
    weight: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Db {
    next_id: i64,
    users: Vec<UserRecord>,
    muscle_groups: Vec<MuscleGroup>,
    exercises: Vec<Exercise>,
    cycles: Vec<CycleRow>,
    cycle_days: Vec<CycleDayRow>,
    workouts: Vec<WorkoutRow>,
    sets: Vec<SetRow>,
}

impl Db {
    fn seeded() -> Self {
        let seed = seed_catalog();
        let max_seed_id = seed
            .muscle_groups
            .iter()
            .map(|g| g.id)
            .chain(seed.exercises.iter().map(|e| e.id))
            .max()
            .unwrap_or(0);

        Self {
            next_id: max_seed_id + 1,
            users: Vec::new(),
            muscle_groups: seed.muscle_groups.clone(),
            exercises: seed.exercises.clone(),
            cycles: Vec::new(),
            cycle_days: Vec::new(),
            workouts: Vec::new(),
            sets: Vec::new(),
        }
    }

    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn cycle_with_days(&self, row: &CycleRow) -> TrainingCycle {
        let mut days: Vec<CycleDay> = self
            .cycle_days
            .iter()
            .filter(|d| d.cycle == row.id)
            .map(|d| CycleDay {
                id: d.id,
                day_number: d.day_number,
                is_training_day: d.is_training_day,
                muscle_groups: d.muscle_groups.clone(),
                default_exercises: d.default_exercises.clone(),
                title: d.title.clone(),
            })
            .collect();
        days.sort_by_key(|d| d.day_number);

        TrainingCycle {
            id: row.id,
            name: row.name.clone(),
            length: row.length,
            days,
        }
    }

    fn workout_with_sets(&self, row: &WorkoutRow) -> Workout {
        Workout {
            id: row.id,
            date: row.date,
            is_from_plan: row.is_from_plan,
            muscle_groups: row.muscle_groups.clone(),
            cycle_day: row.cycle_day,
            sets: self
                .sets
                .iter()
                .filter(|s| s.workout == row.id)
                .map(|s| crate::LoggedSet {
                    id: s.id,
                    exercise: s.exercise,
                    reps: s.reps,
                    weight: s.weight,
                })
                .collect(),
        }
    }
}

// ============================================================================
// Backend implementation
// ============================================================================

/// Durable single-file backend
#[derive(Clone, Debug)]
pub struct LocalBackend {
    path: PathBuf,
}

impl LocalBackend {
    /// Open (and seed, if new) the database at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let backend = Self { path: path.into() };
        if !backend.path.exists() {
            tracing::info!("Seeding new local backend at {:?}", backend.path);
            backend.write(&Db::seeded())?;
        }
        Ok(backend)
    }

    fn read(&self) -> Result<Db> {
        let file = File::open(&self.path)
            .map_err(|e| Error::Backend(format!("open {:?}: {}", self.path, e)))?;
        file.lock_shared()
            .map_err(|e| Error::Backend(format!("lock {:?}: {}", self.path, e)))?;

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        let read = reader.read_to_string(&mut contents);
        let _ = file.unlock();
        read.map_err(|e| Error::Backend(format!("read {:?}: {}", self.path, e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| Error::Backend(format!("parse {:?}: {}", self.path, e)))
    }

    fn write(&self, db: &Db) -> Result<()> {
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Backend("backend path missing parent".into()))?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;
        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(db)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }
        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    fn update<R>(&self, f: impl FnOnce(&mut Db) -> Result<R>) -> Result<R> {
        let mut db = self.read()?;
        let out = f(&mut db)?;
        self.write(&db)?;
        Ok(out)
    }
}

impl Backend for LocalBackend {
    fn authenticate_or_create_user(&self, id: i64, username: &str) -> Result<UserRecord> {
        self.update(|db| {
            if let Some(user) = db.users.iter().find(|u| u.id == id) {
                return Ok(user.clone());
            }
            let user = UserRecord {
                id,
                username: if username.is_empty() {
                    None
                } else {
                    Some(username.to_string())
                },
                current_cycle: None,
            };
            db.users.push(user.clone());
            tracing::info!("Created user {}", id);
            Ok(user)
        })
    }

    fn get_user(&self, id: i64) -> Result<UserRecord> {
        let db = self.read()?;
        db.users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("user {}", id)))
    }

    fn set_current_cycle(&self, user: i64, cycle: i64) -> Result<()> {
        self.update(|db| {
            if !db.cycles.iter().any(|c| c.id == cycle) {
                return Err(Error::NotFound(format!("training cycle {}", cycle)));
            }
            let record = db
                .users
                .iter_mut()
                .find(|u| u.id == user)
                .ok_or_else(|| Error::NotFound(format!("user {}", user)))?;
            record.current_cycle = Some(cycle);
            Ok(())
        })
    }

    fn list_muscle_groups(&self) -> Result<Vec<MuscleGroup>> {
        let mut groups = self.read()?.muscle_groups;
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    fn list_exercises(&self) -> Result<Vec<Exercise>> {
        let mut exercises = self.read()?.exercises;
        exercises.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(exercises)
    }

    fn create_training_cycle(&self, name: &str, length: u32, owner: i64) -> Result<i64> {
        self.update(|db| {
            if !db.users.iter().any(|u| u.id == owner) {
                return Err(Error::NotFound(format!("user {}", owner)));
            }
            let id = db.allocate_id();
            db.cycles.push(CycleRow {
                id,
                user: owner,
                name: name.to_string(),
                length,
            });
            tracing::info!("Created training cycle {} for user {}", id, owner);
            Ok(id)
        })
    }

    fn create_cycle_day(&self, day: &NewCycleDay) -> Result<i64> {
        self.update(|db| {
            if !db.cycles.iter().any(|c| c.id == day.cycle) {
                return Err(Error::NotFound(format!("training cycle {}", day.cycle)));
            }
            if db
                .cycle_days
                .iter()
                .any(|d| d.cycle == day.cycle && d.day_number == day.day_number)
            {
                return Err(Error::Backend(format!(
                    "cycle {} already has a day {}",
                    day.cycle, day.day_number
                )));
            }
            let id = db.allocate_id();
            db.cycle_days.push(CycleDayRow {
                id,
                cycle: day.cycle,
                day_number: day.day_number,
                is_training_day: day.is_training_day,
                muscle_groups: day.muscle_groups.clone(),
                default_exercises: day.default_exercises.clone(),
                title: day.title.clone(),
            });
            Ok(id)
        })
    }

    fn list_training_cycles(&self, owner: i64) -> Result<Vec<TrainingCycle>> {
        let db = self.read()?;
        Ok(db
            .cycles
            .iter()
            .filter(|c| c.user == owner)
            .map(|c| db.cycle_with_days(c))
            .collect())
    }

    fn get_training_cycle(&self, id: i64) -> Result<TrainingCycle> {
        let db = self.read()?;
        db.cycles
            .iter()
            .find(|c| c.id == id)
            .map(|c| db.cycle_with_days(c))
            .ok_or_else(|| Error::NotFound(format!("training cycle {}", id)))
    }

    fn delete_training_cycle(&self, id: i64) -> Result<()> {
        self.update(|db| {
            let before = db.cycles.len();
            db.cycles.retain(|c| c.id != id);
            if db.cycles.len() == before {
                return Err(Error::NotFound(format!("training cycle {}", id)));
            }

            // Cascade days; workouts keep running but lose the back-reference
            let day_ids: Vec<i64> = db
                .cycle_days
                .iter()
                .filter(|d| d.cycle == id)
                .map(|d| d.id)
                .collect();
            db.cycle_days.retain(|d| d.cycle != id);
            for workout in db.workouts.iter_mut() {
                if workout.cycle_day.is_some_and(|d| day_ids.contains(&d)) {
                    workout.cycle_day = None;
                }
            }
            for user in db.users.iter_mut() {
                if user.current_cycle == Some(id) {
                    user.current_cycle = None;
                }
            }
            tracing::info!("Deleted training cycle {}", id);
            Ok(())
        })
    }

    fn list_cycle_days(&self, cycle: i64) -> Result<Vec<CycleDay>> {
        Ok(self.get_training_cycle(cycle)?.days)
    }

    fn create_workout(&self, workout: &NewWorkout) -> Result<i64> {
        self.update(|db| {
            if !db.users.iter().any(|u| u.id == workout.user) {
                return Err(Error::NotFound(format!("user {}", workout.user)));
            }
            let id = db.allocate_id();
            db.workouts.push(WorkoutRow {
                id,
                user: workout.user,
                date: chrono::Local::now().date_naive(),
                is_from_plan: workout.is_from_plan,
                muscle_groups: workout.muscle_groups.clone(),
                cycle_day: workout.cycle_day,
            });
            tracing::info!("Created workout {} for user {}", id, workout.user);
            Ok(id)
        })
    }

    fn get_workout(&self, id: i64) -> Result<Workout> {
        let db = self.read()?;
        db.workouts
            .iter()
            .find(|w| w.id == id)
            .map(|w| db.workout_with_sets(w))
            .ok_or_else(|| Error::NotFound(format!("workout {}", id)))
    }

    fn list_workouts(&self, owner: i64) -> Result<Vec<Workout>> {
        let db = self.read()?;
        let mut workouts: Vec<Workout> = db
            .workouts
            .iter()
            .filter(|w| w.user == owner)
            .map(|w| db.workout_with_sets(w))
            .collect();
        // Newest first; id breaks ties within a day
        workouts.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(workouts)
    }

    fn create_logged_set(
        &self,
        workout: i64,
        exercise: i64,
        reps: u32,
        weight: f64,
    ) -> Result<i64> {
        self.update(|db| {
            if !db.workouts.iter().any(|w| w.id == workout) {
                return Err(Error::NotFound(format!("workout {}", workout)));
            }
            if !db.exercises.iter().any(|e| e.id == exercise) {
                return Err(Error::NotFound(format!("exercise {}", exercise)));
            }
            let id = db.allocate_id();
            db.sets.push(SetRow {
                id,
                workout,
                exercise,
                reps,
                weight,
            });
            Ok(id)
        })
    }
}

/// Location of the backend file under a data directory
pub fn backend_path(data_dir: &Path) -> PathBuf {
    data_dir.join("backend.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> (tempfile::TempDir, LocalBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::open(temp_dir.path().join("backend.json")).unwrap();
        (temp_dir, backend)
    }

    #[test]
    fn test_open_seeds_catalog() {
        let (_tmp, backend) = backend();

        let groups = backend.list_muscle_groups().unwrap();
        let exercises = backend.list_exercises().unwrap();
        assert!(!groups.is_empty());
        assert!(!exercises.is_empty());

        // Ordered lists
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_authenticate_is_idempotent() {
        let (_tmp, backend) = backend();

        let first = backend.authenticate_or_create_user(42, "lifter").unwrap();
        let second = backend.authenticate_or_create_user(42, "renamed").unwrap();

        assert_eq!(first.id, 42);
        // get_or_create keeps the original username
        assert_eq!(second.username.as_deref(), Some("lifter"));
    }

    #[test]
    fn test_cycle_roundtrip_and_day_ordering() {
        let (_tmp, backend) = backend();
        backend.authenticate_or_create_user(1, "u").unwrap();

        let cycle = backend.create_training_cycle("Split", 2, 1).unwrap();
        for (number, training) in [(2u32, false), (1u32, true)] {
            backend
                .create_cycle_day(&NewCycleDay {
                    cycle,
                    day_number: number,
                    is_training_day: training,
                    muscle_groups: vec![],
                    default_exercises: vec![],
                    title: None,
                })
                .unwrap();
        }

        let loaded = backend.get_training_cycle(cycle).unwrap();
        assert_eq!(loaded.length, 2);
        assert_eq!(loaded.days.len(), 2);
        assert_eq!(loaded.days[0].day_number, 1);
        assert_eq!(loaded.days[1].day_number, 2);
    }

    #[test]
    fn test_duplicate_day_number_rejected() {
        let (_tmp, backend) = backend();
        backend.authenticate_or_create_user(1, "u").unwrap();
        let cycle = backend.create_training_cycle("Split", 2, 1).unwrap();

        let day = NewCycleDay {
            cycle,
            day_number: 1,
            is_training_day: false,
            muscle_groups: vec![],
            default_exercises: vec![],
            title: None,
        };
        backend.create_cycle_day(&day).unwrap();
        assert!(backend.create_cycle_day(&day).is_err());
    }

    #[test]
    fn test_delete_cycle_clears_references() {
        let (_tmp, backend) = backend();
        backend.authenticate_or_create_user(1, "u").unwrap();

        let cycle = backend.create_training_cycle("Split", 1, 1).unwrap();
        backend.set_current_cycle(1, cycle).unwrap();
        let day = backend
            .create_cycle_day(&NewCycleDay {
                cycle,
                day_number: 1,
                is_training_day: true,
                muscle_groups: vec![1],
                default_exercises: vec![],
                title: None,
            })
            .unwrap();
        let workout = backend
            .create_workout(&NewWorkout {
                user: 1,
                is_from_plan: true,
                muscle_groups: vec![1],
                cycle_day: Some(day),
            })
            .unwrap();

        backend.delete_training_cycle(cycle).unwrap();

        assert!(matches!(
            backend.get_training_cycle(cycle),
            Err(Error::NotFound(_))
        ));
        assert_eq!(backend.get_user(1).unwrap().current_cycle, None);
        assert_eq!(backend.get_workout(workout).unwrap().cycle_day, None);
    }

    #[test]
    fn test_logged_sets_attach_to_workout() {
        let (_tmp, backend) = backend();
        backend.authenticate_or_create_user(1, "u").unwrap();

        let workout = backend
            .create_workout(&NewWorkout {
                user: 1,
                is_from_plan: false,
                muscle_groups: vec![3],
                cycle_day: None,
            })
            .unwrap();

        backend.create_logged_set(workout, 1, 8, 60.0).unwrap();
        backend.create_logged_set(workout, 1, 6, 62.5).unwrap();

        let loaded = backend.get_workout(workout).unwrap();
        assert_eq!(loaded.sets.len(), 2);
        assert_eq!(loaded.sets[0].reps, 8);
    }

    #[test]
    fn test_stale_ids_are_not_found() {
        let (_tmp, backend) = backend();
        backend.authenticate_or_create_user(1, "u").unwrap();

        assert!(matches!(
            backend.delete_training_cycle(9999),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            backend.get_workout(9999),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            backend.create_logged_set(9999, 1, 8, 60.0),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_data_survives_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("backend.json");

        {
            let backend = LocalBackend::open(&path).unwrap();
            backend.authenticate_or_create_user(1, "u").unwrap();
            backend.create_training_cycle("Split", 3, 1).unwrap();
        }

        let reopened = LocalBackend::open(&path).unwrap();
        let cycles = reopened.list_training_cycles(1).unwrap();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].name, "Split");
    }
}
