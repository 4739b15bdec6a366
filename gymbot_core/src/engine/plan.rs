//! Plan-creation flow: name, length, then one day at a time.

use super::{Action, Engine, Reply};
use crate::backend::Backend;
use crate::catalog::{exercise_name, group_names};
use crate::format::{day_summary, plan_summary, DayLine};
use crate::paging::paginate;
use crate::{DayDraft, NewCycleDay, PlanDraft, PlanState, Result, Session};

const DAY_TYPE_OPTIONS: [&str; 2] = ["Training", "Rest day"];

impl<B: Backend> Engine<B> {
    /// Entry point for `/createplan`; overwrites any abandoned draft
    pub(super) fn start_plan(&self, user_id: i64) -> Result<Vec<Reply>> {
        let draft = PlanDraft::new();
        self.save_plan(user_id, &draft)?;
        tracing::info!("User {} started the plan wizard", user_id);
        Ok(vec![Reply::text(
            "Let's build a new plan. What should it be called?",
        )])
    }

    pub(super) fn plan_text(
        &self,
        user_id: i64,
        mut draft: PlanDraft,
        text: &str,
    ) -> Result<Vec<Reply>> {
        match draft.state {
            PlanState::AwaitName => {
                if text.is_empty() {
                    return Ok(vec![Reply::text(
                        "A plan needs a name. What should it be called?",
                    )]);
                }
                draft.name = truncate_chars(text, self.title_max_chars);
                draft.state = PlanState::AwaitLength;
                self.save_plan(user_id, &draft)?;
                Ok(vec![Reply::text(format!(
                    "How many days will \"{}\" run?",
                    draft.name
                ))])
            }

            PlanState::AwaitLength => match text.parse::<u32>() {
                Ok(length) if length >= 1 => {
                    draft.length = length;
                    draft.current_day = 1;
                    draft.days.clear();
                    draft.state = PlanState::AwaitDayType;
                    self.save_plan(user_id, &draft)?;
                    Ok(vec![day_type_prompt(1)])
                }
                _ => Ok(vec![Reply::text(
                    "Send the plan length as a positive number of days.",
                )]),
            },

            PlanState::AwaitDayType => self.plan_day_type(user_id, draft, text),
            PlanState::AwaitMuscleGroups => self.plan_muscle_groups(user_id, draft, text),
            PlanState::AwaitExercises => self.plan_exercises(user_id, draft, text),

            PlanState::AwaitTitle => {
                let title = if text == "-" || text.is_empty() {
                    None
                } else {
                    Some(truncate_chars(text, self.title_max_chars))
                };
                let current_day = draft.current_day;
                let day = draft
                    .days
                    .iter_mut()
                    .rev()
                    .find(|d| d.day_number == current_day)
                    .ok_or_else(|| {
                        crate::Error::Protocol(format!(
                            "awaiting a title but day {} was never drafted",
                            current_day
                        ))
                    })?;
                day.title = title;
                draft.state = PlanState::ConfirmDay;
                self.save_plan(user_id, &draft)?;
                Ok(vec![self.confirm_day_prompt(&draft)])
            }

            // Button-driven; typed text just re-shows the choice
            PlanState::ConfirmDay => Ok(vec![self.confirm_day_prompt(&draft)]),
        }
    }

    pub(super) fn plan_callback(
        &self,
        user_id: i64,
        mut draft: PlanDraft,
        action: Action,
    ) -> Result<Vec<Reply>> {
        if draft.state != PlanState::ConfirmDay {
            return Ok(vec![Reply::text("That button is no longer active.")]);
        }

        match action {
            Action::KeepDay => self.proceed_next_day(user_id, draft),
            Action::RedoDay => {
                let day = draft.current_day;
                draft.days.retain(|d| d.day_number != day);
                draft.reset_day_scratch();
                draft.state = PlanState::AwaitDayType;
                self.save_plan(user_id, &draft)?;
                Ok(vec![
                    Reply::text(format!("Scrapped day {}.", day)),
                    day_type_prompt(day),
                ])
            }
            _ => Ok(vec![Reply::text("That button is no longer active.")]),
        }
    }

    // ------------------------------------------------------------------------
    // Step handlers
    // ------------------------------------------------------------------------

    fn plan_day_type(
        &self,
        user_id: i64,
        mut draft: PlanDraft,
        text: &str,
    ) -> Result<Vec<Reply>> {
        match text.to_lowercase().as_str() {
            "rest day" => {
                draft.days.push(DayDraft::rest(draft.current_day));
                draft.state = PlanState::ConfirmDay;
                self.save_plan(user_id, &draft)?;
                Ok(vec![self.confirm_day_prompt(&draft)])
            }
            "training" => {
                let groups = self.muscle_groups();
                if groups.is_empty() {
                    // Catalog fetch failed; stay on this step
                    return Ok(vec![
                        Reply::text("Can't load the muscle groups right now. Try again."),
                        day_type_prompt(draft.current_day),
                    ]);
                }
                draft.reset_day_scratch();
                draft.state = PlanState::AwaitMuscleGroups;
                self.save_plan(user_id, &draft)?;
                Ok(vec![self.group_prompt(&draft)])
            }
            _ => Ok(vec![
                Reply::text("Please pick one of the options."),
                day_type_prompt(draft.current_day),
            ]),
        }
    }

    fn plan_muscle_groups(
        &self,
        user_id: i64,
        mut draft: PlanDraft,
        text: &str,
    ) -> Result<Vec<Reply>> {
        if text.eq_ignore_ascii_case("done") {
            if draft.picked_groups.is_empty() {
                draft.state = PlanState::AwaitDayType;
                self.save_plan(user_id, &draft)?;
                return Ok(vec![
                    Reply::text("You haven't picked any muscle groups."),
                    day_type_prompt(draft.current_day),
                ]);
            }

            let exercises = self.exercises();
            if exercises.is_empty() {
                // Catalog fetch failed; stay on this step
                return Ok(vec![
                    Reply::text("Can't load the exercises right now. Try again."),
                    self.group_prompt(&draft),
                ]);
            }
            let available: Vec<i64> = exercises
                .iter()
                .filter(|e| draft.picked_groups.contains(&e.muscle_group))
                .map(|e| e.id)
                .collect();

            if available.is_empty() {
                // Nothing to offer: keep the day as training-without-defaults
                draft.days.push(DayDraft {
                    day_number: draft.current_day,
                    is_training_day: true,
                    muscle_groups: draft.picked_groups.clone(),
                    default_exercises: Vec::new(),
                    title: None,
                });
                let mut replies = vec![Reply::text(
                    "No exercises cover those groups yet; saving the day without defaults.",
                )];
                replies.extend(self.proceed_next_day(user_id, draft)?);
                return Ok(replies);
            }

            draft.available = available;
            draft.picked_exercises.clear();
            draft.page = 0;
            draft.state = PlanState::AwaitExercises;
            self.save_plan(user_id, &draft)?;
            return Ok(vec![self.exercise_page_prompt(&draft)]);
        }

        let groups = self.muscle_groups();
        if groups.is_empty() {
            return Ok(vec![
                Reply::text("Can't load the muscle groups right now. Try again."),
                self.group_prompt(&draft),
            ]);
        }

        match groups.iter().find(|g| g.name.eq_ignore_ascii_case(text)) {
            Some(group) => {
                if draft.picked_groups.contains(&group.id) {
                    return Ok(vec![
                        Reply::text(format!("{} is already on the list.", group.name)),
                        self.group_prompt(&draft),
                    ]);
                }
                let name = group.name.clone();
                draft.picked_groups.push(group.id);
                self.save_plan(user_id, &draft)?;
                Ok(vec![
                    Reply::text(format!("Added {}.", name)),
                    self.group_prompt(&draft),
                ])
            }
            None => Ok(vec![
                Reply::text("I don't know that muscle group."),
                self.group_prompt(&draft),
            ]),
        }
    }

    fn plan_exercises(
        &self,
        user_id: i64,
        mut draft: PlanDraft,
        text: &str,
    ) -> Result<Vec<Reply>> {
        let lower = text.to_lowercase();

        if lower == "done" {
            if draft.picked_exercises.is_empty() {
                return Ok(vec![
                    Reply::text("Pick at least one exercise first."),
                    self.exercise_page_prompt(&draft),
                ]);
            }
            draft.days.push(DayDraft {
                day_number: draft.current_day,
                is_training_day: true,
                muscle_groups: draft.picked_groups.clone(),
                default_exercises: draft.picked_exercises.clone(),
                title: None,
            });
            draft.state = PlanState::AwaitTitle;
            self.save_plan(user_id, &draft)?;
            return Ok(vec![Reply::text(format!(
                "Give day {} a title, or send \"-\" to skip.",
                draft.current_day
            ))]);
        }

        if lower == "next page" || lower == "next" {
            return self.plan_turn_page(user_id, draft, 1);
        }
        if lower == "prev page" || lower == "prev" {
            return self.plan_turn_page(user_id, draft, -1);
        }

        let exercises = self.exercises();
        if exercises.is_empty() {
            return Ok(vec![
                Reply::text("Can't load the exercises right now. Try again."),
                self.exercise_page_prompt(&draft),
            ]);
        }

        let matched = exercises
            .iter()
            .find(|e| draft.available.contains(&e.id) && e.name.eq_ignore_ascii_case(text));
        match matched {
            Some(exercise) => {
                if draft.picked_exercises.contains(&exercise.id) {
                    return Ok(vec![
                        Reply::text(format!("{} is already on the list.", exercise.name)),
                        self.exercise_page_prompt(&draft),
                    ]);
                }
                let name = exercise.name.clone();
                draft.picked_exercises.push(exercise.id);
                self.save_plan(user_id, &draft)?;
                Ok(vec![
                    Reply::text(format!("Added {}.", name)),
                    self.exercise_page_prompt(&draft),
                ])
            }
            None => Ok(vec![
                Reply::text("That exercise isn't in today's list."),
                self.exercise_page_prompt(&draft),
            ]),
        }
    }

    /// Page navigation keeps all selections; only the page index moves
    fn plan_turn_page(
        &self,
        user_id: i64,
        mut draft: PlanDraft,
        step: i64,
    ) -> Result<Vec<Reply>> {
        let shown = paginate(&draft.available, draft.page as i64 + step, self.page_size);
        draft.page = shown.page;
        self.save_plan(user_id, &draft)?;
        Ok(vec![self.exercise_page_prompt(&draft)])
    }

    /// Advance to the next day, or finalize once the plan is full
    fn proceed_next_day(&self, user_id: i64, mut draft: PlanDraft) -> Result<Vec<Reply>> {
        draft.current_day += 1;
        if draft.current_day > draft.length {
            return self.finalize_plan(user_id, draft);
        }
        draft.reset_day_scratch();
        draft.state = PlanState::AwaitDayType;
        self.save_plan(user_id, &draft)?;
        Ok(vec![day_type_prompt(draft.current_day)])
    }

    /// Persist the finished draft: the cycle first, then each day.
    ///
    /// All-or-nothing: if a day write fails the cycle is deleted again, so a
    /// plan never half-exists.
    fn finalize_plan(&self, user_id: i64, draft: PlanDraft) -> Result<Vec<Reply>> {
        let cycle_id =
            match self
                .backend
                .create_training_cycle(&draft.name, draft.length, user_id)
            {
                Ok(id) => id,
                Err(e) => {
                    tracing::warn!("create_training_cycle failed: {}", e);
                    self.store.clear(user_id)?;
                    return Ok(vec![Reply::text(
                        "Couldn't save the plan. Nothing was created; try /createplan again.",
                    )]);
                }
            };

        for day in &draft.days {
            let new_day = NewCycleDay {
                cycle: cycle_id,
                day_number: day.day_number,
                is_training_day: day.is_training_day,
                muscle_groups: day.muscle_groups.clone(),
                default_exercises: day.default_exercises.clone(),
                title: day.title.clone(),
            };
            if let Err(e) = self.backend.create_cycle_day(&new_day) {
                tracing::warn!("create_cycle_day {} failed: {}", day.day_number, e);
                if let Err(rollback) = self.backend.delete_training_cycle(cycle_id) {
                    tracing::warn!("rollback of cycle {} failed: {}", cycle_id, rollback);
                }
                self.store.clear(user_id)?;
                return Ok(vec![Reply::text(format!(
                    "Couldn't save day {}. The plan was not created; try /createplan again.",
                    day.day_number
                ))]);
            }
        }

        tracing::info!(
            "User {} finalized plan {} ({} days)",
            user_id,
            cycle_id,
            draft.days.len()
        );

        let groups = self.muscle_groups();
        let summary = plan_summary(&draft.name, draft.days.iter().map(DayLine::from), &groups);
        self.store.clear(user_id)?;
        Ok(vec![Reply::text(format!(
            "{}\n\nPlan saved! Manage it with /myplans.",
            summary
        ))])
    }

    // ------------------------------------------------------------------------
    // Prompts
    // ------------------------------------------------------------------------

    fn save_plan(&self, user_id: i64, draft: &PlanDraft) -> Result<()> {
        self.store.set(user_id, &Session::PlanWizard(draft.clone()))
    }

    fn group_prompt(&self, draft: &PlanDraft) -> Reply {
        let groups = self.muscle_groups();
        let text = if draft.picked_groups.is_empty() {
            format!(
                "Day {}: pick the muscle groups one at a time, then send Done.",
                draft.current_day
            )
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

    fn exercise_page_prompt(&self, draft: &PlanDraft) -> Reply {
        let exercises = self.exercises();
        let shown = paginate(&draft.available, draft.page as i64, self.page_size);

        let mut keyboard: Vec<String> = shown
            .items
            .iter()
            .map(|id| exercise_name(&exercises, *id))
            .collect();
        if shown.has_prev() {
            keyboard.push("Prev page".into());
        }
        if shown.has_next() {
            keyboard.push("Next page".into());
        }
        keyboard.push("Done".into());

        Reply::text(format!(
            "Exercises for day {} (page {}/{}): pick some, then send Done. Picked: {}.",
            draft.current_day,
            shown.page + 1,
            shown.total_pages,
            draft.picked_exercises.len()
        ))
        .with_keyboard(keyboard)
    }

    fn confirm_day_prompt(&self, draft: &PlanDraft) -> Reply {
        let groups = self.muscle_groups();
        let line = draft
            .days
            .iter()
            .rev()
            .find(|d| d.day_number == draft.current_day)
            .map(|d| day_summary(&DayLine::from(d), &groups))
            .unwrap_or_else(|| format!("Day {}", draft.current_day));

        Reply::text(format!("{}\nKeep this day?", line))
            .with_button("Keep", Action::KeepDay)
            .with_button("Redo", Action::RedoDay)
    }
}

fn day_type_prompt(day: u32) -> Reply {
    Reply::text(format!("Day {}: training or rest?", day)).with_keyboard(DAY_TYPE_OPTIONS)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
