//! Workout-logging flow: pick a source, then log sets until finished.

use super::{Action, Engine, Reply};
use crate::backend::Backend;
use crate::catalog::{exercise_name, group_names};
use crate::format::{trim_zeros, workout_summary};
use crate::paging::paginate;
use crate::{DayOption, Error, NewWorkout, Result, Session, WorkoutDraft, WorkoutState};

const SOURCE_OPTIONS: [&str; 2] = ["From my plan", "Custom workout"];

impl<B: Backend> Engine<B> {
    /// Entry point for `/startworkout`; overwrites any abandoned draft
    pub(super) fn start_workout(&self, user_id: i64) -> Result<Vec<Reply>> {
        let draft = WorkoutDraft::new();
        self.save_workout(user_id, &draft)?;
        tracing::info!("User {} started the workout logger", user_id);
        Ok(vec![source_prompt()])
    }

    pub(super) fn workout_text(
        &self,
        user_id: i64,
        mut draft: WorkoutDraft,
        text: &str,
    ) -> Result<Vec<Reply>> {
        match draft.state {
            WorkoutState::ChooseSource => self.workout_source(user_id, draft, text),
            WorkoutState::AwaitPlanDay => self.workout_plan_day(user_id, draft, text),
            WorkoutState::AwaitMuscleGroups => self.workout_muscle_groups(user_id, draft, text),

            // Button-driven; typed text just re-shows the picker
            WorkoutState::ChooseExercise => Ok(vec![
                Reply::text("Use the buttons to pick an exercise."),
                self.exercise_picker(&draft),
            ]),

            WorkoutState::AwaitWeight => {
                match text.replace(',', ".").parse::<f64>() {
                    Ok(weight) if weight.is_finite() && weight >= 0.0 => {
                        draft.pending_weight = Some(weight);
                        draft.state = WorkoutState::AwaitReps;
                        self.save_workout(user_id, &draft)?;
                        Ok(vec![Reply::text("How many reps?")])
                    }
                    _ => Ok(vec![Reply::text("Send the weight in kg, like 52.5.")]),
                }
            }

            WorkoutState::AwaitReps => match text.parse::<u32>() {
                Ok(reps) if reps >= 1 => self.workout_log_set(user_id, draft, reps),
                _ => Ok(vec![Reply::text(
                    "Send the rep count as a positive whole number.",
                )]),
            },
        }
    }

    pub(super) fn workout_callback(
        &self,
        user_id: i64,
        mut draft: WorkoutDraft,
        action: Action,
    ) -> Result<Vec<Reply>> {
        if draft.state != WorkoutState::ChooseExercise {
            return Ok(vec![Reply::text("That button is no longer active.")]);
        }

        match action {
            Action::PickExercise(id) => {
                if !draft.available.contains(&id) {
                    return Ok(vec![Reply::text("That button is no longer active.")]);
                }
                let exercises = self.exercises();
                draft.pending_exercise = Some(id);
                draft.pending_weight = None;
                draft.state = WorkoutState::AwaitWeight;
                self.save_workout(user_id, &draft)?;
                Ok(vec![Reply::text(format!(
                    "Weight for {}, kg?",
                    exercise_name(&exercises, id)
                ))])
            }

            // Navigation re-renders the picker; nothing else moves
            Action::NextPage => self.workout_turn_page(user_id, draft, 1),
            Action::PrevPage => self.workout_turn_page(user_id, draft, -1),

            Action::FinishWorkout => self.workout_finish(user_id, draft),

            _ => Ok(vec![Reply::text("That button is no longer active.")]),
        }
    }

    // ------------------------------------------------------------------------
    // Step handlers
    // ------------------------------------------------------------------------

    fn workout_source(
        &self,
        user_id: i64,
        mut draft: WorkoutDraft,
        text: &str,
    ) -> Result<Vec<Reply>> {
        match text.to_lowercase().as_str() {
            "from my plan" => {
                let user = match self.backend.get_user(user_id) {
                    Ok(user) => user,
                    Err(Error::NotFound(_)) => {
                        self.store.clear(user_id)?;
                        return Ok(vec![Reply::text(
                            "Say /start first so I know who you are.",
                        )]);
                    }
                    Err(e) => {
                        tracing::warn!("get_user failed: {}", e);
                        return Ok(vec![
                            Reply::text("The training service is unavailable right now."),
                            source_prompt(),
                        ]);
                    }
                };

                let Some(cycle_id) = user.current_cycle else {
                    self.store.clear(user_id)?;
                    return Ok(vec![Reply::text(
                        "You don't have a current plan. Pick one with /myplans.",
                    )]);
                };

                let days = match self.backend.list_cycle_days(cycle_id) {
                    Ok(days) => days,
                    Err(Error::NotFound(_)) => {
                        self.store.clear(user_id)?;
                        return Ok(vec![Reply::text(
                            "Your current plan no longer exists. Pick another with /myplans.",
                        )]);
                    }
                    Err(e) => {
                        tracing::warn!("list_cycle_days failed: {}", e);
                        return Ok(vec![
                            Reply::text("The training service is unavailable right now."),
                            source_prompt(),
                        ]);
                    }
                };

                let training_days: Vec<_> =
                    days.into_iter().filter(|d| d.is_training_day).collect();
                if training_days.is_empty() {
                    self.store.clear(user_id)?;
                    return Ok(vec![Reply::text(
                        "Your plan has no training days, nothing to pick from.",
                    )]);
                }

                let groups = self.muscle_groups();
                if groups.is_empty() && training_days.iter().any(|d| d.title.is_none()) {
                    // Labels need group names; catalog failure is recoverable
                    return Ok(vec![
                        Reply::text("Can't load the muscle groups right now. Try again."),
                        source_prompt(),
                    ]);
                }

                draft.day_options = training_days
                    .iter()
                    .map(|day| DayOption {
                        label: match &day.title {
                            Some(title) => {
                                format!("Day {}: {}", day.day_number, title)
                            }
                            None => format!(
                                "Day {}: {}",
                                day.day_number,
                                group_names(&groups, &day.muscle_groups).join(", ")
                            ),
                        },
                        cycle_day: day.id,
                        title: day.title.clone(),
                        muscle_groups: day.muscle_groups.clone(),
                        default_exercises: day.default_exercises.clone(),
                    })
                    .collect();
                draft.state = WorkoutState::AwaitPlanDay;
                self.save_workout(user_id, &draft)?;
                Ok(vec![self.plan_day_prompt(&draft)])
            }

            "custom workout" => {
                let groups = self.muscle_groups();
                if groups.is_empty() {
                    return Ok(vec![
                        Reply::text("Can't load the muscle groups right now. Try again."),
                        source_prompt(),
                    ]);
                }
                draft.picked_groups.clear();
                draft.state = WorkoutState::AwaitMuscleGroups;
                self.save_workout(user_id, &draft)?;
                Ok(vec![self.workout_group_prompt(&draft)])
            }

            _ => Ok(vec![
                Reply::text("Please pick one of the options."),
                source_prompt(),
            ]),
        }
    }

    fn workout_plan_day(
        &self,
        user_id: i64,
        mut draft: WorkoutDraft,
        text: &str,
    ) -> Result<Vec<Reply>> {
        let matched = draft
            .day_options
            .iter()
            .find(|o| o.label.eq_ignore_ascii_case(text))
            .cloned();
        let Some(option) = matched else {
            return Ok(vec![
                Reply::text("That's not one of the days."),
                self.plan_day_prompt(&draft),
            ]);
        };

        let new_workout = NewWorkout {
            user: user_id,
            is_from_plan: true,
            muscle_groups: option.muscle_groups.clone(),
            cycle_day: Some(option.cycle_day),
        };
        let workout_id = match self.backend.create_workout(&new_workout) {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!("create_workout failed: {}", e);
                self.store.clear(user_id)?;
                return Ok(vec![Reply::text(
                    "Couldn't start the workout. Try /startworkout again.",
                )]);
            }
        };

        let exercises = self.exercises();
        let available: Vec<i64> = option
            .default_exercises
            .iter()
            .copied()
            .filter(|id| exercises.iter().any(|e| e.id == *id))
            .collect();
        if available.is_empty() {
            self.store.clear(user_id)?;
            return Ok(vec![Reply::text(
                "No exercises are linked to that day, so there is nothing to log.",
            )]);
        }

        draft.workout_id = Some(workout_id);
        draft.available = available;
        draft.page = 0;
        draft.state = WorkoutState::ChooseExercise;
        self.save_workout(user_id, &draft)?;
        Ok(vec![self.exercise_picker(&draft)])
    }

    fn workout_muscle_groups(
        &self,
        user_id: i64,
        mut draft: WorkoutDraft,
        text: &str,
    ) -> Result<Vec<Reply>> {
        if text.eq_ignore_ascii_case("done") {
            if draft.picked_groups.is_empty() {
                draft.state = WorkoutState::ChooseSource;
                self.save_workout(user_id, &draft)?;
                return Ok(vec![
                    Reply::text("You haven't picked any muscle groups."),
                    source_prompt(),
                ]);
            }

            let new_workout = NewWorkout {
                user: user_id,
                is_from_plan: false,
                muscle_groups: draft.picked_groups.clone(),
                cycle_day: None,
            };
            let workout_id = match self.backend.create_workout(&new_workout) {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!("create_workout failed: {}", e);
                    self.store.clear(user_id)?;
                    return Ok(vec![Reply::text(
                        "Couldn't start the workout. Try /startworkout again.",
                    )]);
                }
            };

            let exercises = self.exercises();
            draft.available = exercises
                .iter()
                .filter(|e| draft.picked_groups.contains(&e.muscle_group))
                .map(|e| e.id)
                .collect();
            draft.workout_id = Some(workout_id);
            draft.page = 0;
            draft.state = WorkoutState::ChooseExercise;
            self.save_workout(user_id, &draft)?;

            let mut replies = Vec::new();
            if draft.available.is_empty() {
                replies.push(Reply::text(
                    "No exercises for those groups yet; you can still finish the workout.",
                ));
            }
            replies.push(self.exercise_picker(&draft));
            return Ok(replies);
        }

        let groups = self.muscle_groups();
        if groups.is_empty() {
            return Ok(vec![
                Reply::text("Can't load the muscle groups right now. Try again."),
                self.workout_group_prompt(&draft),
            ]);
        }

        match groups.iter().find(|g| g.name.eq_ignore_ascii_case(text)) {
            Some(group) => {
                if draft.picked_groups.contains(&group.id) {
                    return Ok(vec![
                        Reply::text(format!("{} is already on the list.", group.name)),
                        self.workout_group_prompt(&draft),
                    ]);
                }
                let name = group.name.clone();
                draft.picked_groups.push(group.id);
                self.save_workout(user_id, &draft)?;
                Ok(vec![
                    Reply::text(format!("Added {}.", name)),
                    self.workout_group_prompt(&draft),
                ])
            }
            None => Ok(vec![
                Reply::text("I don't know that muscle group."),
                self.workout_group_prompt(&draft),
            ]),
        }
    }

    /// Submit one logged set, then hand control back to the picker.
    ///
    /// A failed write restarts the weight/reps pair rather than reps alone.
    fn workout_log_set(
        &self,
        user_id: i64,
        mut draft: WorkoutDraft,
        reps: u32,
    ) -> Result<Vec<Reply>> {
        let workout_id = draft.workout_id.ok_or_else(|| {
            Error::Protocol("logging a set without an active workout".into())
        })?;
        let exercise = draft.pending_exercise.ok_or_else(|| {
            Error::Protocol("logging a set without a chosen exercise".into())
        })?;
        let weight = draft.pending_weight.ok_or_else(|| {
            Error::Protocol("logging a set without a weight".into())
        })?;

        if let Err(e) = self
            .backend
            .create_logged_set(workout_id, exercise, reps, weight)
        {
            tracing::warn!("create_logged_set failed: {}", e);
            draft.pending_weight = None;
            draft.state = WorkoutState::AwaitWeight;
            self.save_workout(user_id, &draft)?;
            return Ok(vec![Reply::text(
                "Couldn't save that set. Let's enter it again - weight in kg?",
            )]);
        }

        let exercises = self.exercises();
        let logged = Reply::text(format!(
            "Logged {}: {} kg x {}.",
            exercise_name(&exercises, exercise),
            trim_zeros(weight),
            reps
        ));

        draft.pending_exercise = None;
        draft.pending_weight = None;
        draft.state = WorkoutState::ChooseExercise;
        self.save_workout(user_id, &draft)?;
        Ok(vec![logged, self.exercise_picker(&draft)])
    }

    fn workout_turn_page(
        &self,
        user_id: i64,
        mut draft: WorkoutDraft,
        step: i64,
    ) -> Result<Vec<Reply>> {
        let shown = paginate(&draft.available, draft.page as i64 + step, self.page_size);
        draft.page = shown.page;
        self.save_workout(user_id, &draft)?;
        Ok(vec![self.exercise_picker(&draft)])
    }

    fn workout_finish(&self, user_id: i64, draft: WorkoutDraft) -> Result<Vec<Reply>> {
        let workout_id = draft.workout_id.ok_or_else(|| {
            Error::Protocol("finishing a workout that was never created".into())
        })?;

        let replies = match self.backend.get_workout(workout_id) {
            Ok(workout) => {
                let title = workout
                    .cycle_day
                    .and_then(|day| {
                        draft
                            .day_options
                            .iter()
                            .find(|o| o.cycle_day == day)
                            .and_then(|o| o.title.clone())
                    });
                let groups = self.muscle_groups();
                let exercises = self.exercises();
                let summary =
                    workout_summary(&workout, title.as_deref(), &groups, &exercises);
                vec![Reply::text(format!("Workout saved.\n{}", summary))]
            }
            Err(e) => {
                tracing::warn!("get_workout failed after finish: {}", e);
                vec![Reply::text(
                    "Workout saved, but the summary is unavailable right now. See /history later.",
                )]
            }
        };

        tracing::info!("User {} finished workout {}", user_id, workout_id);
        self.store.clear(user_id)?;
        Ok(replies)
    }

    // ------------------------------------------------------------------------
    // Prompts
    // ------------------------------------------------------------------------

    fn save_workout(&self, user_id: i64, draft: &WorkoutDraft) -> Result<()> {
        self.store
            .set(user_id, &Session::WorkoutLogger(draft.clone()))
    }

    fn plan_day_prompt(&self, draft: &WorkoutDraft) -> Reply {
        Reply::text("Which day are you training?")
            .with_keyboard(draft.day_options.iter().map(|o| o.label.clone()))
    }

    fn workout_group_prompt(&self, draft: &WorkoutDraft) -> Reply {
        let groups = self.muscle_groups();
        let text = if draft.picked_groups.is_empty() {
            "Pick the muscle groups you'll train, one at a time, then send Done.".to_string()
        } else {
            format!(
                "Picked so far: {}. Add more or send Done.",
                group_names(&groups, &draft.picked_groups).join(", ")
            )
        };

        let mut keyboard: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();
        keyboard.push("Done".into());
        Reply::text(text).with_keyboard(keyboard)
    }

    fn exercise_picker(&self, draft: &WorkoutDraft) -> Reply {
        let exercises = self.exercises();
        let shown = paginate(&draft.available, draft.page as i64, self.page_size);

        let text = if draft.available.is_empty() {
            "No exercises to pick from; finish whenever you're ready.".to_string()
        } else {
            format!(
                "Pick an exercise (page {}/{}):",
                shown.page + 1,
                shown.total_pages
            )
        };

        let mut reply = Reply::text(text);
        for id in shown.items {
            reply = reply.with_button(exercise_name(&exercises, *id), Action::PickExercise(*id));
        }
        if shown.has_prev() {
            reply = reply.with_button("« Prev", Action::PrevPage);
        }
        if shown.has_next() {
            reply = reply.with_button("Next »", Action::NextPage);
        }
        reply.with_button("Finish workout", Action::FinishWorkout)
    }
}

fn source_prompt() -> Reply {
    Reply::text("Where does this workout come from?").with_keyboard(SOURCE_OPTIONS)
}
