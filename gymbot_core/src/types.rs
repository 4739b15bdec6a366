//! Core domain types for the gym bot.
//!
//! This module defines the fundamental types used throughout the system:
//! - Normalized backend entities (users, catalog, plans, workouts)
//! - Request payloads for backend writes
//! - Conversation session drafts and their state tags

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Backend Entities
// ============================================================================

/// A bot user as known to the backend
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: Option<String>,
    pub current_cycle: Option<i64>,
}

/// A muscle group from the reference catalog
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MuscleGroup {
    pub id: i64,
    pub name: String,
}

/// An exercise from the reference catalog
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Exercise {
    pub id: i64,
    pub name: String,
    pub muscle_group: i64,
}

/// A named, fixed-length training plan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrainingCycle {
    pub id: i64,
    pub name: String,
    pub length: u32,
    pub days: Vec<CycleDay>,
}

/// One day within a training plan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CycleDay {
    pub id: i64,
    pub day_number: u32,
    pub is_training_day: bool,
    pub muscle_groups: Vec<i64>,
    pub default_exercises: Vec<i64>,
    pub title: Option<String>,
}

/// A logged training session
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Workout {
    pub id: i64,
    pub date: NaiveDate,
    pub is_from_plan: bool,
    pub muscle_groups: Vec<i64>,
    pub cycle_day: Option<i64>,
    pub sets: Vec<LoggedSet>,
}

/// One exercise performance record (weight x reps) within a workout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggedSet {
    pub id: i64,
    pub exercise: i64,
    pub reps: u32,
    pub weight: f64,
}

// ============================================================================
// Backend Write Payloads
// ============================================================================

/// Payload for creating one day of a plan
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewCycleDay {
    pub cycle: i64,
    pub day_number: u32,
    pub is_training_day: bool,
    pub muscle_groups: Vec<i64>,
    pub default_exercises: Vec<i64>,
    pub title: Option<String>,
}

/// Payload for creating a workout
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewWorkout {
    pub user: i64,
    pub is_from_plan: bool,
    pub muscle_groups: Vec<i64>,
    pub cycle_day: Option<i64>,
}

// ============================================================================
// Session Drafts
// ============================================================================

/// In-progress conversation state, persisted whole between messages
///
/// Exactly one flow can be active per user. Starting a new flow overwrites
/// whatever draft was left behind by an abandoned one.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "flow", rename_all = "snake_case")]
pub enum Session {
    PlanWizard(PlanDraft),
    WorkoutLogger(WorkoutDraft),
}

/// State tag for the plan-creation flow
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanState {
    AwaitName,
    AwaitLength,
    AwaitDayType,
    AwaitMuscleGroups,
    AwaitExercises,
    AwaitTitle,
    ConfirmDay,
}

/// Accumulated plan-creation input
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlanDraft {
    pub state: PlanState,
    pub name: String,
    pub length: u32,
    pub current_day: u32,
    pub days: Vec<DayDraft>,
    /// Muscle groups toggled so far for the day being built
    pub picked_groups: Vec<i64>,
    /// Exercises toggled so far for the day being built
    pub picked_exercises: Vec<i64>,
    /// Exercise ids selectable for the day being built
    pub available: Vec<i64>,
    pub page: usize,
}

impl PlanDraft {
    pub fn new() -> Self {
        Self {
            state: PlanState::AwaitName,
            name: String::new(),
            length: 0,
            current_day: 0,
            days: Vec::new(),
            picked_groups: Vec::new(),
            picked_exercises: Vec::new(),
            available: Vec::new(),
            page: 0,
        }
    }

    /// Reset the per-day scratch fields before building the next day
    pub fn reset_day_scratch(&mut self) {
        self.picked_groups.clear();
        self.picked_exercises.clear();
        self.available.clear();
        self.page = 0;
    }
}

impl Default for PlanDraft {
    fn default() -> Self {
        Self::new()
    }
}

/// One drafted day, appended as the wizard walks through the plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DayDraft {
    pub day_number: u32,
    pub is_training_day: bool,
    pub muscle_groups: Vec<i64>,
    pub default_exercises: Vec<i64>,
    pub title: Option<String>,
}

impl DayDraft {
    pub fn rest(day_number: u32) -> Self {
        Self {
            day_number,
            is_training_day: false,
            muscle_groups: Vec::new(),
            default_exercises: Vec::new(),
            title: None,
        }
    }
}

/// State tag for the workout-logging flow
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutState {
    ChooseSource,
    AwaitPlanDay,
    AwaitMuscleGroups,
    ChooseExercise,
    AwaitWeight,
    AwaitReps,
}

/// A selectable plan day offered while starting a workout from a plan
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DayOption {
    pub label: String,
    pub cycle_day: i64,
    pub title: Option<String>,
    pub muscle_groups: Vec<i64>,
    pub default_exercises: Vec<i64>,
}

/// Accumulated workout-logging input
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutDraft {
    pub state: WorkoutState,
    /// Backend workout id, set once the workout row exists
    pub workout_id: Option<i64>,
    pub picked_groups: Vec<i64>,
    /// Exercise ids selectable in the exercise picker
    pub available: Vec<i64>,
    pub page: usize,
    /// Plan days offered in AwaitPlanDay, keyed by label
    pub day_options: Vec<DayOption>,
    /// Exercise chosen but not yet logged
    pub pending_exercise: Option<i64>,
    /// Weight entered but awaiting a rep count
    pub pending_weight: Option<f64>,
}

impl WorkoutDraft {
    pub fn new() -> Self {
        Self {
            state: WorkoutState::ChooseSource,
            workout_id: None,
            picked_groups: Vec::new(),
            available: Vec::new(),
            page: 0,
            day_options: Vec::new(),
            pending_exercise: None,
            pending_weight: None,
        }
    }
}

impl Default for WorkoutDraft {
    fn default() -> Self {
        Self::new()
    }
}
