//! Human-readable rendering of plans and workouts.
//!
//! Pure functions: callers resolve ids to catalog entries and pass them in,
//! so nothing here touches the backend.

use crate::{CycleDay, DayDraft, Exercise, MuscleGroup, Workout};
use crate::catalog::{exercise_name, group_names};
use std::collections::BTreeSet;

/// Render a weight without trailing zeros
///
/// Integral floats render without a decimal part, others with up to two
/// decimals: `12.0 -> "12"`, `12.50 -> "12.5"`, `12.34 -> "12.34"`.
pub fn trim_zeros(weight: f64) -> String {
    let mut s = format!("{:.2}", weight);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s
}

/// A day record reduced to what the summary needs
///
/// Lets the same renderer serve drafts (mid-wizard) and persisted cycle days.
#[derive(Clone, Debug)]
pub struct DayLine<'a> {
    pub day_number: u32,
    pub is_training_day: bool,
    pub muscle_groups: &'a [i64],
    pub title: Option<&'a str>,
}

impl<'a> From<&'a DayDraft> for DayLine<'a> {
    fn from(day: &'a DayDraft) -> Self {
        Self {
            day_number: day.day_number,
            is_training_day: day.is_training_day,
            muscle_groups: &day.muscle_groups,
            title: day.title.as_deref(),
        }
    }
}

impl<'a> From<&'a CycleDay> for DayLine<'a> {
    fn from(day: &'a CycleDay) -> Self {
        Self {
            day_number: day.day_number,
            is_training_day: day.is_training_day,
            muscle_groups: &day.muscle_groups,
            title: day.title.as_deref(),
        }
    }
}

/// Render one line of a plan summary
pub fn day_summary(day: &DayLine<'_>, groups: &[MuscleGroup]) -> String {
    if !day.is_training_day {
        return format!("Day {}: Rest", day.day_number);
    }

    let names = group_names(groups, day.muscle_groups).join(", ");
    match day.title {
        Some(title) => format!("Day {}: Training - {} ({})", day.day_number, names, title),
        None => format!("Day {}: Training - {}", day.day_number, names),
    }
}

/// Render a full plan summary.
///
/// Duplicate records for the same `(day_number, is_training_day, group set)`
/// collapse into one line; days render in ascending order.
pub fn plan_summary<'a, I>(name: &str, days: I, groups: &[MuscleGroup]) -> String
where
    I: IntoIterator<Item = DayLine<'a>>,
{
    let mut seen: BTreeSet<(u32, bool, BTreeSet<i64>)> = BTreeSet::new();
    let mut unique: Vec<DayLine<'a>> = Vec::new();

    for day in days {
        let key = (
            day.day_number,
            day.is_training_day,
            day.muscle_groups.iter().copied().collect(),
        );
        if seen.insert(key) {
            unique.push(day);
        }
    }

    unique.sort_by_key(|d| d.day_number);

    let mut out = format!("Plan \"{}\":", name);
    for day in &unique {
        out.push('\n');
        out.push_str(&day_summary(day, groups));
    }
    out
}

/// Header shared by workout summaries and history labels
///
/// `title` is the originating cycle day's title when the workout came from a
/// plan; custom workouts get a "(custom)" suffix.
pub fn workout_header(workout: &Workout, title: Option<&str>, groups: &[MuscleGroup]) -> String {
    let what = match title {
        Some(t) if workout.is_from_plan => t.to_string(),
        _ => group_names(groups, &workout.muscle_groups).join(", "),
    };

    let date = workout.date.format("%d.%m.%Y");
    if workout.is_from_plan {
        format!("{} - {}", date, what)
    } else {
        format!("{} - {} (custom)", date, what)
    }
}

/// Render a full workout summary.
///
/// Sets are grouped under their exercise in first-seen order, one
/// `weight kg x reps` line per set.
pub fn workout_summary(
    workout: &Workout,
    title: Option<&str>,
    groups: &[MuscleGroup],
    exercises: &[Exercise],
) -> String {
    let mut out = workout_header(workout, title, groups);

    if workout.sets.is_empty() {
        out.push_str("\nNo sets logged.");
        return out;
    }

    let mut order: Vec<i64> = Vec::new();
    for set in &workout.sets {
        if !order.contains(&set.exercise) {
            order.push(set.exercise);
        }
    }

    for exercise_id in order {
        out.push_str(&format!("\n{}:", exercise_name(exercises, exercise_id)));
        for set in workout.sets.iter().filter(|s| s.exercise == exercise_id) {
            out.push_str(&format!("\n  {} kg x {}", trim_zeros(set.weight), set.reps));
        }
    }
    out
}

/// One-line, bounded label for a workout in the history list
pub fn history_label(
    workout: &Workout,
    title: Option<&str>,
    groups: &[MuscleGroup],
    max_chars: usize,
) -> String {
    let header = workout_header(workout, title, groups);
    if header.chars().count() <= max_chars {
        return header;
    }
    let mut label: String = header.chars().take(max_chars.saturating_sub(1)).collect();
    label.push('…');
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LoggedSet;
    use chrono::NaiveDate;

    fn groups() -> Vec<MuscleGroup> {
        vec![
            MuscleGroup { id: 1, name: "Back".into() },
            MuscleGroup { id: 2, name: "Chest".into() },
        ]
    }

    fn exercises() -> Vec<Exercise> {
        vec![
            Exercise { id: 1, name: "Pull-up".into(), muscle_group: 1 },
            Exercise { id: 2, name: "Bench Press".into(), muscle_group: 2 },
        ]
    }

    fn workout(is_from_plan: bool, sets: Vec<LoggedSet>) -> Workout {
        Workout {
            id: 1,
            date: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            is_from_plan,
            muscle_groups: vec![2],
            cycle_day: None,
            sets,
        }
    }

    #[test]
    fn test_trim_zeros() {
        assert_eq!(trim_zeros(12.0), "12");
        assert_eq!(trim_zeros(12.50), "12.5");
        assert_eq!(trim_zeros(12.34), "12.34");
        assert_eq!(trim_zeros(0.0), "0");
    }

    #[test]
    fn test_day_summary_variants() {
        let rest = DayDraft::rest(2);
        assert_eq!(day_summary(&DayLine::from(&rest), &groups()), "Day 2: Rest");

        let training = DayDraft {
            day_number: 1,
            is_training_day: true,
            muscle_groups: vec![1, 2],
            default_exercises: vec![],
            title: Some("Pull day".into()),
        };
        assert_eq!(
            day_summary(&DayLine::from(&training), &groups()),
            "Day 1: Training - Back, Chest (Pull day)"
        );
    }

    #[test]
    fn test_plan_summary_dedups_identical_days() {
        let a = DayDraft {
            day_number: 1,
            is_training_day: true,
            muscle_groups: vec![1, 2],
            default_exercises: vec![],
            title: None,
        };
        // Same day, groups arrived in a different order
        let b = DayDraft {
            day_number: 1,
            is_training_day: true,
            muscle_groups: vec![2, 1],
            default_exercises: vec![],
            title: None,
        };
        let rest = DayDraft::rest(2);

        let days = vec![rest.clone(), a.clone(), b.clone()];
        let summary = plan_summary("Split", days.iter().map(DayLine::from), &groups());

        let day1_lines = summary.lines().filter(|l| l.starts_with("Day 1")).count();
        assert_eq!(day1_lines, 1);

        // Sorted ascending despite arrival order
        let lines: Vec<&str> = summary.lines().collect();
        assert!(lines[1].starts_with("Day 1"));
        assert!(lines[2].starts_with("Day 2"));
    }

    #[test]
    fn test_workout_summary_custom() {
        let sets = vec![LoggedSet { id: 1, exercise: 2, reps: 8, weight: 60.0 }];
        let summary = workout_summary(&workout(false, sets), None, &groups(), &exercises());

        assert!(summary.contains("Chest (custom)"));
        assert!(summary.contains("Bench Press:"));
        assert!(summary.contains("60 kg x 8"));
    }

    #[test]
    fn test_workout_summary_groups_sets_in_first_seen_order() {
        let sets = vec![
            LoggedSet { id: 1, exercise: 2, reps: 8, weight: 60.0 },
            LoggedSet { id: 2, exercise: 1, reps: 10, weight: 0.0 },
            LoggedSet { id: 3, exercise: 2, reps: 6, weight: 62.5 },
        ];
        let summary = workout_summary(&workout(false, sets), None, &groups(), &exercises());

        let bench = summary.find("Bench Press:").unwrap();
        let pullup = summary.find("Pull-up:").unwrap();
        assert!(bench < pullup);

        // Both bench sets land under one block
        let bench_block = &summary[bench..pullup];
        assert!(bench_block.contains("60 kg x 8"));
        assert!(bench_block.contains("62.5 kg x 6"));
    }

    #[test]
    fn test_plan_title_used_for_plan_workouts_only() {
        let w = Workout { is_from_plan: true, ..workout(true, vec![]) };
        assert_eq!(
            workout_header(&w, Some("Push day"), &groups()),
            "14.03.2025 - Push day"
        );

        let custom = workout(false, vec![]);
        assert_eq!(
            workout_header(&custom, Some("Push day"), &groups()),
            "14.03.2025 - Chest (custom)"
        );
    }

    #[test]
    fn test_history_label_truncates_with_ellipsis() {
        let w = workout(false, vec![]);
        let full = workout_header(&w, None, &groups());

        let label = history_label(&w, None, &groups(), 12);
        assert_eq!(label.chars().count(), 12);
        assert!(label.ends_with('…'));

        let untouched = history_label(&w, None, &groups(), 200);
        assert_eq!(untouched, full);
    }
}
