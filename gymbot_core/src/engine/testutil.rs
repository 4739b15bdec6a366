//! Shared harness for conversation-flow tests: a real engine over a
//! tempdir-backed local backend whose operations can be failed on demand.

use super::{Action, Command, Engine, Event, Reply};
use crate::backend::Backend;
use crate::local_backend::LocalBackend;
use crate::session::SessionStore;
use crate::{
    Config, CycleDay, Error, Exercise, MuscleGroup, NewCycleDay, NewWorkout, Result,
    TrainingCycle, UserRecord, Workout,
};
use std::collections::HashSet;
use std::sync::Mutex;

pub(super) const USER: i64 = 42;

/// Delegates to a LocalBackend unless the named operation is scripted to fail
pub(super) struct ToggleBackend {
    inner: LocalBackend,
    failing: Mutex<HashSet<&'static str>>,
}

impl ToggleBackend {
    pub fn new(inner: LocalBackend) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.failing.lock().unwrap().remove(op);
    }

    fn gate(&self, op: &'static str) -> Result<()> {
        if self.failing.lock().unwrap().contains(op) {
            return Err(Error::Backend(format!("scripted failure: {}", op)));
        }
        Ok(())
    }
}

impl Backend for ToggleBackend {
    fn authenticate_or_create_user(&self, id: i64, username: &str) -> Result<UserRecord> {
        self.gate("authenticate_or_create_user")?;
        self.inner.authenticate_or_create_user(id, username)
    }

    fn get_user(&self, id: i64) -> Result<UserRecord> {
        self.gate("get_user")?;
        self.inner.get_user(id)
    }

    fn set_current_cycle(&self, user: i64, cycle: i64) -> Result<()> {
        self.gate("set_current_cycle")?;
        self.inner.set_current_cycle(user, cycle)
    }

    fn list_muscle_groups(&self) -> Result<Vec<MuscleGroup>> {
        self.gate("list_muscle_groups")?;
        self.inner.list_muscle_groups()
    }

    fn list_exercises(&self) -> Result<Vec<Exercise>> {
        self.gate("list_exercises")?;
        self.inner.list_exercises()
    }

    fn create_training_cycle(&self, name: &str, length: u32, owner: i64) -> Result<i64> {
        self.gate("create_training_cycle")?;
        self.inner.create_training_cycle(name, length, owner)
    }

    fn create_cycle_day(&self, day: &NewCycleDay) -> Result<i64> {
        self.gate("create_cycle_day")?;
        self.inner.create_cycle_day(day)
    }

    fn list_training_cycles(&self, owner: i64) -> Result<Vec<TrainingCycle>> {
        self.gate("list_training_cycles")?;
        self.inner.list_training_cycles(owner)
    }

    fn get_training_cycle(&self, id: i64) -> Result<TrainingCycle> {
        self.gate("get_training_cycle")?;
        self.inner.get_training_cycle(id)
    }

    fn delete_training_cycle(&self, id: i64) -> Result<()> {
        self.gate("delete_training_cycle")?;
        self.inner.delete_training_cycle(id)
    }

    fn list_cycle_days(&self, cycle: i64) -> Result<Vec<CycleDay>> {
        self.gate("list_cycle_days")?;
        self.inner.list_cycle_days(cycle)
    }

    fn create_workout(&self, workout: &NewWorkout) -> Result<i64> {
        self.gate("create_workout")?;
        self.inner.create_workout(workout)
    }

    fn get_workout(&self, id: i64) -> Result<Workout> {
        self.gate("get_workout")?;
        self.inner.get_workout(id)
    }

    fn list_workouts(&self, owner: i64) -> Result<Vec<Workout>> {
        self.gate("list_workouts")?;
        self.inner.list_workouts(owner)
    }

    fn create_logged_set(
        &self,
        workout: i64,
        exercise: i64,
        reps: u32,
        weight: f64,
    ) -> Result<i64> {
        self.gate("create_logged_set")?;
        self.inner.create_logged_set(workout, exercise, reps, weight)
    }
}

pub(super) struct Harness {
    pub engine: Engine<ToggleBackend>,
    _tmp: tempfile::TempDir,
}

/// Engine with a zero-TTL catalog cache (so scripted catalog failures bite
/// immediately) and small pages to exercise navigation
pub(super) fn harness() -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let backend =
        ToggleBackend::new(LocalBackend::open(tmp.path().join("backend.json")).unwrap());
    backend.authenticate_or_create_user(USER, "tester").unwrap();

    let store = SessionStore::open(tmp.path().join("sessions")).unwrap();
    let mut config = Config::default();
    config.bot.page_size = 3;
    config.bot.catalog_ttl_secs = 0;

    Harness {
        engine: Engine::new(backend, store, &config),
        _tmp: tmp,
    }
}

impl Harness {
    pub fn backend(&self) -> &ToggleBackend {
        &self.engine.backend
    }

    pub fn command(&self, command: Command) -> Vec<Reply> {
        self.engine
            .handle(USER, "tester", Event::Command(command))
            .unwrap()
    }

    pub fn text(&self, text: &str) -> Vec<Reply> {
        self.engine
            .handle(USER, "tester", Event::Text(text.into()))
            .unwrap()
    }

    pub fn callback(&self, action: Action) -> Vec<Reply> {
        self.engine
            .handle(USER, "tester", Event::Callback(action))
            .unwrap()
    }

    pub fn session(&self) -> Option<crate::Session> {
        self.engine.store.get(USER).unwrap()
    }

    /// Id of the seeded muscle group with this name
    pub fn group_id(&self, name: &str) -> i64 {
        self.backend()
            .list_muscle_groups()
            .unwrap()
            .into_iter()
            .find(|g| g.name == name)
            .unwrap()
            .id
    }

    /// Id of the seeded exercise with this name
    pub fn exercise_id(&self, name: &str) -> i64 {
        self.backend()
            .list_exercises()
            .unwrap()
            .into_iter()
            .find(|e| e.name == name)
            .unwrap()
            .id
    }
}

/// All reply text flattened into one string for contains-style assertions
pub(super) fn transcript(replies: &[Reply]) -> String {
    replies
        .iter()
        .map(|r| r.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
