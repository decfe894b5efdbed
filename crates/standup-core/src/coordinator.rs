//! Session coordinator: the popup's single entry point
//!
//! Owns the engines and the per-popup state (celebration flag, active pick,
//! search query, tick generations). The UI calls one method per user action
//! and gets back an [`Update`]: the view to render plus the [`Cmd`]s to run.
//!
//! ## Scheduling
//!
//! The shell owns the real timers. Every armed tick or reveal carries a
//! generation number; starting a new timer or pick bumps it, so a callback
//! from a superseded session is recognized and ignored.

use crate::backlog::BacklogEngine;
use crate::cmd::Cmd;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::picker::{PickSession, PickerEngine};
use crate::rng::PickRng;
use crate::roster::{Participant, ParticipantKey, RosterEngine};
use crate::store::SharedStore;
use crate::time::Clock;
use crate::timer::{TimerEngine, TimerState};
use crate::view::{ParticipantView, PickerView, SessionView, Update};
use std::collections::HashSet;
use std::sync::Arc;

/// Render callback
pub type Renderer = Box<dyn FnMut(&SessionView)>;

#[derive(Debug, Clone)]
struct ActivePick {
    session: PickSession,
    generation: u64,
    revealed: bool,
}

/// How a roster change affects the celebration flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RosterChange {
    /// Spoken flags changed
    Flags,
    /// Participants were added or removed
    Membership,
}

/// Glues the engines to the UI
pub struct SessionCoordinator {
    config: Arc<SessionConfig>,
    clock: Arc<dyn Clock>,
    roster: RosterEngine,
    backlog: BacklogEngine,
    timer: TimerEngine,
    picker: PickerEngine,
    rng: PickRng,
    celebrated: bool,
    active_pick: Option<ActivePick>,
    timer_generation: u64,
    picker_generation: u64,
    search_generation: u64,
    search_query: String,
    renderers: Vec<Renderer>,
}

impl SessionCoordinator {
    /// Rehydrate a session from the store
    ///
    /// Call [`recover`](Self::recover) once afterwards to pick up a timer
    /// that was running when the popup closed.
    pub fn open(store: SharedStore, clock: Arc<dyn Clock>, config: SessionConfig) -> Self {
        let config = Arc::new(config);
        let roster = RosterEngine::load(store.clone(), config.clone());
        let backlog = BacklogEngine::load(store.clone(), config.clone());
        let timer = TimerEngine::new(store, clock.clone(), config.clone());
        let picker = PickerEngine::new(config.clone());
        // a round that was already complete should not celebrate again on reopen
        let celebrated = roster.all_spoken();

        tracing::debug!(
            participants = roster.len(),
            backlog = backlog.len(),
            celebrated,
            "session opened"
        );

        Self {
            config,
            clock,
            roster,
            backlog,
            timer,
            picker,
            rng: PickRng::from_time(),
            celebrated,
            active_pick: None,
            timer_generation: 0,
            picker_generation: 0,
            search_generation: 0,
            search_query: String::new(),
            renderers: Vec::new(),
        }
    }

    /// Replace the random source (seeded runs and tests)
    pub fn with_rng(mut self, rng: PickRng) -> Self {
        self.rng = rng;
        self
    }

    /// Register a render callback, invoked after every state change
    pub fn on_render(&mut self, renderer: impl FnMut(&SessionView) + 'static) {
        self.renderers.push(Box::new(renderer));
    }

    /// Configuration in effect
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current roster
    pub fn participants(&self) -> &[Participant] {
        self.roster.participants()
    }

    /// Restore the timer after the popup becomes active
    pub fn recover(&mut self) -> Update {
        let cmd = match self.timer.recover_on_load() {
            TimerState::Running => self.arm_tick(),
            TimerState::Expired | TimerState::Idle => Cmd::None,
        };
        self.emit(cmd)
    }

    /// Build the current view
    pub fn view(&self) -> SessionView {
        let matches: HashSet<ParticipantKey> = self
            .roster
            .search(&self.search_query)
            .into_iter()
            .map(Participant::key)
            .collect();
        let participants: Vec<ParticipantView> = self
            .roster
            .participants()
            .iter()
            .map(|p| ParticipantView::new(p, matches.contains(&p.key())))
            .collect();
        let visible_count = participants.iter().filter(|p| p.visible).count();

        SessionView {
            visible_count,
            participants,
            search_query: self.search_query.clone(),
            spoken_count: self.roster.spoken_count(),
            all_spoken: self.roster.all_spoken(),
            backlog: self.backlog.items().cloned().collect(),
            backlog_completed: self.backlog.completed_count(),
            timer: self.timer.query_remaining(),
            picker: self
                .active_pick
                .as_ref()
                .map(|a| PickerView::new(&a.session, a.revealed, a.generation)),
            persistence_degraded: self.roster.is_degraded()
                || self.backlog.is_degraded()
                || self.timer.is_degraded(),
        }
    }

    fn emit(&mut self, cmd: Cmd) -> Update {
        let view = self.view();
        for render in &mut self.renderers {
            render(&view);
        }
        Update { view, cmd }
    }

    fn celebration(&mut self, change: RosterChange) -> Cmd {
        if !self.roster.all_spoken() {
            if change == RosterChange::Membership && self.celebrated {
                tracing::debug!("round reopened by roster change");
                self.celebrated = false;
            }
            return Cmd::None;
        }
        if self.celebrated {
            return Cmd::None;
        }
        self.celebrated = true;
        tracing::info!(participants = self.roster.len(), "everyone has spoken");
        Cmd::batch([
            Cmd::Celebrate,
            Cmd::notify("🎉 All team members have spoken! 🎉"),
        ])
    }

    // ----- roster -----

    /// Add a participant
    pub fn add_participant(&mut self, first_name: &str, last_name: &str) -> Result<Update> {
        self.roster.add(first_name, last_name)?;
        let cmd = Cmd::batch([
            Cmd::notify(format!("{} {} added", first_name.trim(), last_name.trim())),
            self.celebration(RosterChange::Membership),
        ]);
        Ok(self.emit(cmd))
    }

    /// Remove a participant; confirmation is the UI's job
    pub fn remove_participant(&mut self, key: &ParticipantKey) -> Update {
        let removed = self.roster.get(key).map(Participant::full_name);
        self.roster.remove(key);
        let cmd = match removed {
            Some(name) => Cmd::batch([
                Cmd::notify(format!("{} removed", name)),
                self.celebration(RosterChange::Membership),
            ]),
            None => Cmd::None,
        };
        self.emit(cmd)
    }

    /// Flip a participant's spoken flag
    pub fn toggle_participant(&mut self, key: &ParticipantKey) -> Update {
        self.roster.toggle_spoken(key);
        let cmd = self.celebration(RosterChange::Flags);
        self.emit(cmd)
    }

    /// Shuffle the speaking order
    pub fn shuffle_roster(&mut self) -> Update {
        self.roster.shuffle(&mut self.rng);
        self.emit(Cmd::None)
    }

    /// Start a new round
    pub fn reset_round(&mut self) -> Update {
        self.roster.reset_all_spoken();
        self.celebrated = false;
        self.emit(Cmd::None)
    }

    /// Replace the roster from JSON import text
    pub fn import_roster(&mut self, text: &str) -> Result<Update> {
        self.roster.import_json(text)?;
        self.celebrated = false;
        Ok(self.emit(Cmd::notify("Team list imported successfully")))
    }

    /// Roster as pretty-printed JSON for download
    pub fn export_roster(&self) -> Result<String> {
        self.roster.export_json()
    }

    /// Filter the visible participants by name
    ///
    /// A non-empty query asks the shell to clear it again after
    /// `search_clear_ms` without further typing.
    pub fn search_roster(&mut self, query: &str) -> Update {
        self.search_query = query.trim().to_string();
        self.search_generation += 1;
        let cmd = if self.search_query.is_empty() {
            Cmd::None
        } else {
            Cmd::ScheduleSearchClear {
                delay_ms: self.config.search_clear_ms,
                generation: self.search_generation,
            }
        };
        self.emit(cmd)
    }

    /// The search went idle: show everyone again
    ///
    /// Ignored when the user typed since the clear was scheduled.
    pub fn clear_search(&mut self, generation: u64) -> Update {
        if generation != self.search_generation || self.search_query.is_empty() {
            tracing::debug!(generation, "stale search clear ignored");
            return Update {
                view: self.view(),
                cmd: Cmd::None,
            };
        }
        self.search_query.clear();
        self.emit(Cmd::None)
    }

    // ----- timer -----

    fn arm_tick(&mut self) -> Cmd {
        self.timer_generation += 1;
        Cmd::ArmTimerTick {
            interval_ms: self.config.tick_interval_ms,
            generation: self.timer_generation,
        }
    }

    /// Start a countdown, replacing any running one
    pub fn start_timer(&mut self, minutes: i64) -> Result<Update> {
        self.timer.start(minutes)?;
        let cmd = self.arm_tick();
        Ok(self.emit(cmd))
    }

    /// Start a countdown from the minutes input text
    pub fn start_timer_from_input(&mut self, input: &str) -> Result<Update> {
        self.timer.start_from_input(input)?;
        let cmd = self.arm_tick();
        Ok(self.emit(cmd))
    }

    /// Stop and clear the countdown
    pub fn stop_timer(&mut self) -> Update {
        self.timer.stop();
        // invalidate any tick still in flight
        self.timer_generation += 1;
        self.emit(Cmd::CancelTimerTick)
    }

    /// Periodic refresh from the shell
    ///
    /// Ticks from a superseded timer are ignored and produce no render.
    pub fn tick_timer(&mut self, generation: u64) -> Update {
        if generation != self.timer_generation {
            tracing::debug!(generation, current = self.timer_generation, "stale tick ignored");
            return Update {
                view: self.view(),
                cmd: Cmd::None,
            };
        }
        let cmd = match self.timer.state() {
            TimerState::Running => Cmd::None,
            TimerState::Expired | TimerState::Idle => Cmd::CancelTimerTick,
        };
        self.emit(cmd)
    }

    /// Next value for the minutes input after pressing - or +
    pub fn adjust_timer_minutes(&self, current: &str, increase: bool) -> i64 {
        let step = self.config.minutes_step;
        self.timer
            .adjust_minutes(current, if increase { step } else { -step })
    }

    // ----- picker -----

    /// Spin the picker
    pub fn run_picker(&mut self) -> Result<Update> {
        let session = self.picker.pick(self.roster.participants(), &mut self.rng)?;
        self.picker_generation += 1;
        self.active_pick = Some(ActivePick {
            session,
            generation: self.picker_generation,
            revealed: false,
        });
        let cmd = Cmd::ScheduleReveal {
            delay_ms: self.config.reveal_delay_ms,
            generation: self.picker_generation,
        };
        Ok(self.emit(cmd))
    }

    /// The reel has stopped: show the winner
    pub fn finish_picker(&mut self, generation: u64) -> Update {
        let pending = matches!(
            &self.active_pick,
            Some(active) if active.generation == generation && !active.revealed
        );
        if !pending {
            tracing::debug!(generation, "stale reveal ignored");
            return Update {
                view: self.view(),
                cmd: Cmd::None,
            };
        }
        if let Some(active) = self.active_pick.as_mut() {
            active.revealed = true;
        }
        self.emit(Cmd::None)
    }

    /// Dismiss the picker without changing the roster
    pub fn close_picker(&mut self) -> Update {
        self.active_pick = None;
        self.emit(Cmd::CancelReveal)
    }

    /// Mark the revealed winner as spoken and close the picker
    pub fn commit_picker_winner(&mut self) -> Result<Update> {
        let active = self.active_pick.as_ref().ok_or(Error::NoActivePick)?;
        if !active.revealed {
            return Err(Error::validation("The picker is still spinning"));
        }
        let winner = active.session.winner.clone();
        if !self.roster.set_spoken(&winner.key(), true) {
            self.active_pick = None;
            return Err(Error::validation(format!(
                "{} is no longer on the roster",
                winner.full_name()
            )));
        }

        self.active_pick = None;
        let cmd = Cmd::batch([
            Cmd::CancelReveal,
            Cmd::notify(format!("{} marked as spoken", winner.first_name)),
            self.celebration(RosterChange::Flags),
        ]);
        Ok(self.emit(cmd))
    }

    // ----- backlog -----

    /// Park a follow-up topic
    pub fn add_backlog_item(&mut self, text: &str) -> Result<Update> {
        let now = self.clock.now_ms();
        let added = self.backlog.add(text, now)?.text.clone();
        Ok(self.emit(Cmd::notify(format!("\"{}\" added to Part B", added))))
    }

    /// Remove a follow-up topic
    pub fn remove_backlog_item(&mut self, id: &str) -> Update {
        let cmd = match self.backlog.remove(id) {
            Some(item) => Cmd::notify(format!("\"{}\" removed from Part B", item.text)),
            None => Cmd::None,
        };
        self.emit(cmd)
    }

    /// Flip a topic's completed flag
    pub fn toggle_backlog_item(&mut self, id: &str) -> Update {
        self.backlog.toggle(id);
        self.emit(Cmd::None)
    }

    /// Remove every completed topic
    pub fn clear_completed_backlog(&mut self) -> Update {
        let cmd = match self.backlog.clear_completed() {
            0 => Cmd::notify("No completed items to clear"),
            n => Cmd::notify(format!("{} completed item(s) cleared", n)),
        };
        self.emit(cmd)
    }
}
