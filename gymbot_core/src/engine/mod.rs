//! The conversation engine.
//!
//! Incoming events are dispatched by a single router keyed on the state tag
//! stored in the user's session draft. Each handler validates the input,
//! mutates the draft (or calls the backend), persists the whole draft, and
//! returns the next prompt. Every failure path ends in a message to the
//! user; only session-store failures propagate as errors.

mod plan;
#[cfg(test)]
mod testutil;
mod workout;

use crate::backend::Backend;
use crate::catalog::CatalogCache;
use crate::format::{history_label, plan_summary, workout_summary, DayLine};
use crate::paging::paginate;
use crate::session::SessionStore;
use crate::{Config, Error, Exercise, MuscleGroup, Result, Session, Workout};
use std::collections::HashMap;
use std::time::Duration;

// ============================================================================
// Bot surface
// ============================================================================

/// Flow entry points and utility commands
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    CreatePlan,
    MyPlans,
    CurrentPlan,
    StartWorkout,
    History,
}

impl Command {
    /// Parse a leading-slash command, e.g. `/createplan`
    pub fn parse(input: &str) -> Option<Command> {
        match input.trim() {
            "/start" => Some(Command::Start),
            "/help" => Some(Command::Help),
            "/createplan" => Some(Command::CreatePlan),
            "/myplans" => Some(Command::MyPlans),
            "/currentplan" => Some(Command::CurrentPlan),
            "/startworkout" => Some(Command::StartWorkout),
            "/history" => Some(Command::History),
            _ => None,
        }
    }
}

/// Inline actions, carried as an action tag plus an optional id payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Keep the day just drafted and move on
    KeepDay,
    /// Drop the day just drafted and rebuild it
    RedoDay,
    PrevPage,
    NextPage,
    PickExercise(i64),
    FinishWorkout,
    ShowPlan(i64),
    UsePlan(i64),
    DeletePlan(i64),
    ShowWorkout(i64),
    HistoryPage(i64),
}

impl Action {
    /// Wire encoding: `tag` or `tag:id`
    pub fn encode(&self) -> String {
        match self {
            Action::KeepDay => "day_keep".into(),
            Action::RedoDay => "day_redo".into(),
            Action::PrevPage => "page_prev".into(),
            Action::NextPage => "page_next".into(),
            Action::PickExercise(id) => format!("pick:{}", id),
            Action::FinishWorkout => "finish".into(),
            Action::ShowPlan(id) => format!("plan_show:{}", id),
            Action::UsePlan(id) => format!("plan_use:{}", id),
            Action::DeletePlan(id) => format!("plan_del:{}", id),
            Action::ShowWorkout(id) => format!("workout_show:{}", id),
            Action::HistoryPage(page) => format!("history:{}", page),
        }
    }

    /// Parse the wire encoding back; unknown tags or bad payloads are None
    pub fn parse(data: &str) -> Option<Action> {
        match data {
            "day_keep" => return Some(Action::KeepDay),
            "day_redo" => return Some(Action::RedoDay),
            "page_prev" => return Some(Action::PrevPage),
            "page_next" => return Some(Action::NextPage),
            "finish" => return Some(Action::FinishWorkout),
            _ => {}
        }

        let (tag, payload) = data.split_once(':')?;
        let id: i64 = payload.parse().ok()?;
        match tag {
            "pick" => Some(Action::PickExercise(id)),
            "plan_show" => Some(Action::ShowPlan(id)),
            "plan_use" => Some(Action::UsePlan(id)),
            "plan_del" => Some(Action::DeletePlan(id)),
            "workout_show" => Some(Action::ShowWorkout(id)),
            "history" => Some(Action::HistoryPage(id)),
            _ => None,
        }
    }
}

/// One incoming user interaction
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Command(Command),
    Text(String),
    Callback(Action),
}

/// An inline button under a reply
#[derive(Clone, Debug, PartialEq)]
pub struct Button {
    pub label: String,
    pub action: Action,
}

/// One outgoing message: text, an optional one-shot keyboard of suggested
/// answers, and optional inline action buttons
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Reply {
    pub text: String,
    pub keyboard: Vec<String>,
    pub buttons: Vec<Button>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Vec::new(),
            buttons: Vec::new(),
        }
    }

    pub fn with_keyboard<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keyboard = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_button(mut self, label: impl Into<String>, action: Action) -> Self {
        self.buttons.push(Button {
            label: label.into(),
            action,
        });
        self
    }
}

// ============================================================================
// Engine
// ============================================================================

/// The conversation state machine over a backend, a session store and the
/// catalog cache
pub struct Engine<B: Backend> {
    backend: B,
    store: SessionStore,
    catalog: CatalogCache,
    page_size: usize,
    title_max_chars: usize,
    history_label_chars: usize,
}

impl<B: Backend> Engine<B> {
    pub fn new(backend: B, store: SessionStore, config: &Config) -> Self {
        Self {
            backend,
            store,
            catalog: CatalogCache::new(Duration::from_secs(config.bot.catalog_ttl_secs)),
            page_size: config.bot.page_size,
            title_max_chars: config.bot.title_max_chars,
            history_label_chars: config.bot.history_label_chars,
        }
    }

    /// Handle one incoming event for one user, to completion
    pub fn handle(&self, user_id: i64, username: &str, event: Event) -> Result<Vec<Reply>> {
        tracing::debug!("User {} event: {:?}", user_id, event);
        match event {
            Event::Command(command) => self.handle_command(user_id, username, command),
            Event::Text(text) => self.handle_text(user_id, text.trim()),
            Event::Callback(action) => self.handle_callback(user_id, action),
        }
    }

    fn handle_command(&self, user_id: i64, username: &str, command: Command) -> Result<Vec<Reply>> {
        match command {
            Command::Start => Ok(self.cmd_start(user_id, username)),
            Command::Help => Ok(vec![Reply::text(HELP_TEXT)]),
            Command::CreatePlan => self.start_plan(user_id),
            Command::MyPlans => Ok(self.cmd_my_plans(user_id)),
            Command::CurrentPlan => Ok(self.cmd_current_plan(user_id)),
            Command::StartWorkout => self.start_workout(user_id),
            Command::History => Ok(self.cmd_history(user_id, 0)),
        }
    }

    fn handle_text(&self, user_id: i64, text: &str) -> Result<Vec<Reply>> {
        match self.store.get(user_id)? {
            Some(Session::PlanWizard(draft)) => self.plan_text(user_id, draft, text),
            Some(Session::WorkoutLogger(draft)) => self.workout_text(user_id, draft, text),
            None => Ok(vec![Reply::text(
                "I wasn't expecting that. See /help for what I can do.",
            )]),
        }
    }

    fn handle_callback(&self, user_id: i64, action: Action) -> Result<Vec<Reply>> {
        match action {
            // Stateless actions work with or without an active flow
            Action::ShowPlan(id) => Ok(self.cmd_show_plan(id)),
            Action::UsePlan(id) => Ok(self.cmd_use_plan(user_id, id)),
            Action::DeletePlan(id) => Ok(self.cmd_delete_plan(id)),
            Action::ShowWorkout(id) => Ok(self.cmd_show_workout(user_id, id)),
            Action::HistoryPage(page) => Ok(self.cmd_history(user_id, page)),

            Action::KeepDay | Action::RedoDay => match self.store.get(user_id)? {
                Some(Session::PlanWizard(draft)) => self.plan_callback(user_id, draft, action),
                _ => Ok(stale_button()),
            },

            Action::PickExercise(_)
            | Action::PrevPage
            | Action::NextPage
            | Action::FinishWorkout => match self.store.get(user_id)? {
                Some(Session::WorkoutLogger(draft)) => {
                    self.workout_callback(user_id, draft, action)
                }
                _ => Ok(stale_button()),
            },
        }
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    fn cmd_start(&self, user_id: i64, username: &str) -> Vec<Reply> {
        match self.backend.authenticate_or_create_user(user_id, username) {
            Ok(user) => {
                let name = user.username.unwrap_or_else(|| "Gym rat".into());
                vec![Reply::text(format!("Hello, {}! Ready to train?", name))]
            }
            Err(e) => {
                tracing::warn!("auth-user failed for {}: {}", user_id, e);
                vec![Reply::text("Error while creating user")]
            }
        }
    }

    fn cmd_my_plans(&self, user_id: i64) -> Vec<Reply> {
        let cycles = match self.backend.list_training_cycles(user_id) {
            Ok(cycles) => cycles,
            Err(e) => return vec![backend_trouble(&e)],
        };
        if cycles.is_empty() {
            return vec![Reply::text(
                "You have no plans yet. Build one with /createplan.",
            )];
        }

        let current = self
            .backend
            .get_user(user_id)
            .ok()
            .and_then(|u| u.current_cycle);

        cycles
            .iter()
            .map(|cycle| {
                let marker = if current == Some(cycle.id) {
                    " (current)"
                } else {
                    ""
                };
                Reply::text(format!(
                    "{} ({} days){}",
                    cycle.name, cycle.length, marker
                ))
                .with_button("Show", Action::ShowPlan(cycle.id))
                .with_button("Make current", Action::UsePlan(cycle.id))
                .with_button("Delete", Action::DeletePlan(cycle.id))
            })
            .collect()
    }

    fn cmd_current_plan(&self, user_id: i64) -> Vec<Reply> {
        let user = match self.backend.get_user(user_id) {
            Ok(user) => user,
            Err(Error::NotFound(_)) => {
                return vec![Reply::text("Say /start first so I know who you are.")]
            }
            Err(e) => return vec![backend_trouble(&e)],
        };

        let Some(cycle_id) = user.current_cycle else {
            return vec![Reply::text(
                "You don't have a current plan. Pick one with /myplans.",
            )];
        };

        self.cmd_show_plan(cycle_id)
    }

    fn cmd_show_plan(&self, cycle_id: i64) -> Vec<Reply> {
        match self.backend.get_training_cycle(cycle_id) {
            Ok(cycle) => {
                let groups = self.muscle_groups();
                vec![Reply::text(plan_summary(
                    &cycle.name,
                    cycle.days.iter().map(DayLine::from),
                    &groups,
                ))]
            }
            Err(Error::NotFound(_)) => vec![Reply::text("That plan no longer exists.")],
            Err(e) => vec![backend_trouble(&e)],
        }
    }

    fn cmd_use_plan(&self, user_id: i64, cycle_id: i64) -> Vec<Reply> {
        match self.backend.set_current_cycle(user_id, cycle_id) {
            Ok(()) => vec![Reply::text(
                "Done, that's your current plan. Start a session with /startworkout.",
            )],
            Err(Error::NotFound(_)) => vec![Reply::text("That plan no longer exists.")],
            Err(e) => vec![backend_trouble(&e)],
        }
    }

    fn cmd_delete_plan(&self, cycle_id: i64) -> Vec<Reply> {
        match self.backend.delete_training_cycle(cycle_id) {
            Ok(()) => vec![Reply::text("Plan deleted.")],
            Err(Error::NotFound(_)) => vec![Reply::text("That plan no longer exists.")],
            Err(e) => vec![backend_trouble(&e)],
        }
    }

    fn cmd_history(&self, user_id: i64, page: i64) -> Vec<Reply> {
        let workouts = match self.backend.list_workouts(user_id) {
            Ok(workouts) => workouts,
            Err(e) => return vec![backend_trouble(&e)],
        };
        if workouts.is_empty() {
            return vec![Reply::text(
                "No workouts yet. Log one with /startworkout.",
            )];
        }

        let titles = self.day_titles(user_id);
        let groups = self.muscle_groups();
        let shown = paginate(&workouts, page, self.page_size);

        let mut reply = Reply::text(format!(
            "Your workouts ({}/{}):",
            shown.page + 1,
            shown.total_pages
        ));
        for workout in shown.items {
            let label = history_label(
                workout,
                self.title_for(workout, &titles),
                &groups,
                self.history_label_chars,
            );
            reply = reply.with_button(label, Action::ShowWorkout(workout.id));
        }
        if shown.has_prev() {
            reply = reply.with_button("« Prev", Action::HistoryPage(shown.page as i64 - 1));
        }
        if shown.has_next() {
            reply = reply.with_button("Next »", Action::HistoryPage(shown.page as i64 + 1));
        }
        vec![reply]
    }

    fn cmd_show_workout(&self, user_id: i64, workout_id: i64) -> Vec<Reply> {
        match self.backend.get_workout(workout_id) {
            Ok(workout) => {
                let titles = self.day_titles(user_id);
                let groups = self.muscle_groups();
                let exercises = self.exercises();
                vec![Reply::text(workout_summary(
                    &workout,
                    self.title_for(&workout, &titles),
                    &groups,
                    &exercises,
                ))]
            }
            Err(Error::NotFound(_)) => vec![Reply::text("That workout no longer exists.")],
            Err(e) => vec![backend_trouble(&e)],
        }
    }

    // ------------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------------

    fn muscle_groups(&self) -> Vec<MuscleGroup> {
        self.catalog
            .muscle_groups(|| self.backend.list_muscle_groups())
    }

    fn exercises(&self) -> Vec<Exercise> {
        self.catalog.exercises(|| self.backend.list_exercises())
    }

    /// Titles of the user's plan days, for resolving plan-derived workout
    /// headers. Best-effort: an unreachable backend just loses the titles.
    fn day_titles(&self, user_id: i64) -> HashMap<i64, String> {
        let mut titles = HashMap::new();
        if let Ok(cycles) = self.backend.list_training_cycles(user_id) {
            for cycle in cycles {
                for day in cycle.days {
                    if let Some(title) = day.title {
                        titles.insert(day.id, title);
                    }
                }
            }
        }
        titles
    }

    fn title_for<'a>(
        &self,
        workout: &Workout,
        titles: &'a HashMap<i64, String>,
    ) -> Option<&'a str> {
        workout
            .cycle_day
            .and_then(|day| titles.get(&day))
            .map(String::as_str)
    }
}

fn stale_button() -> Vec<Reply> {
    vec![Reply::text("That button is no longer active.")]
}

fn backend_trouble(e: &Error) -> Reply {
    tracing::warn!("Backend call failed: {}", e);
    Reply::text("The training service is unavailable right now. Try again in a moment.")
}

const HELP_TEXT: &str = "\
/start - introduce yourself to the bot
/help - this message
/createplan - build a new training plan
/myplans - list and manage your plans
/currentplan - show the plan you're following
/startworkout - log a training session
/history - browse past workouts";
