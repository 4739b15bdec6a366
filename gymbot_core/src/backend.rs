//! The CRUD backend the conversation engine talks to.
//!
//! The real service lives elsewhere; the engine only sees this trait. Calls
//! block the current step (one message is handled to completion at a time
//! per user) and every operation can fail - callers translate failures into
//! user-facing messages, never crashes.

use crate::{
    CycleDay, Exercise, MuscleGroup, NewCycleDay, NewWorkout, Result, TrainingCycle, UserRecord,
    Workout,
};

/// Request/response operations over the backend entities.
///
/// Responses are already normalized into one typed DTO per entity; no call
/// site ever sees the transport shape.
pub trait Backend {
    /// Look up or create the user for an incoming chat identity
    fn authenticate_or_create_user(&self, id: i64, username: &str) -> Result<UserRecord>;

    fn get_user(&self, id: i64) -> Result<UserRecord>;

    fn set_current_cycle(&self, user: i64, cycle: i64) -> Result<()>;

    fn list_muscle_groups(&self) -> Result<Vec<MuscleGroup>>;

    fn list_exercises(&self) -> Result<Vec<Exercise>>;

    /// Create a plan shell; days are added one by one afterwards
    fn create_training_cycle(&self, name: &str, length: u32, owner: i64) -> Result<i64>;

    fn create_cycle_day(&self, day: &NewCycleDay) -> Result<i64>;

    fn list_training_cycles(&self, owner: i64) -> Result<Vec<TrainingCycle>>;

    fn get_training_cycle(&self, id: i64) -> Result<TrainingCycle>;

    fn delete_training_cycle(&self, id: i64) -> Result<()>;

    fn list_cycle_days(&self, cycle: i64) -> Result<Vec<CycleDay>>;

    fn create_workout(&self, workout: &NewWorkout) -> Result<i64>;

    fn get_workout(&self, id: i64) -> Result<Workout>;

    /// Workouts for a user, newest first
    fn list_workouts(&self, owner: i64) -> Result<Vec<Workout>>;

    fn create_logged_set(&self, workout: i64, exercise: i64, reps: u32, weight: f64)
        -> Result<i64>;
}
