//! Read-only snapshots handed to the renderer

use crate::backlog::BacklogItem;
use crate::cmd::Cmd;
use crate::picker::PickSession;
use crate::roster::Participant;
use crate::timer::TimerReading;
use serde::{Deserialize, Serialize};

/// A participant as the list shows it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantView {
    pub first_name: String,
    pub last_name: String,
    pub spoken: bool,
    pub initials: String,
    /// Matches the current search query
    pub visible: bool,
}

impl ParticipantView {
    pub(crate) fn new(participant: &Participant, visible: bool) -> Self {
        Self {
            first_name: participant.first_name.clone(),
            last_name: participant.last_name.clone(),
            spoken: participant.spoken,
            initials: participant.initials(),
            visible,
        }
    }

    /// "First Last"
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// The picker overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickerView {
    pub reel: Vec<String>,
    pub winner_slot_index: usize,
    pub winner: String,
    /// The reel has stopped and the winner is shown
    pub revealed: bool,
    /// Pass to `finish_picker` when the reveal delay elapses
    pub generation: u64,
}

impl PickerView {
    pub(crate) fn new(session: &PickSession, revealed: bool, generation: u64) -> Self {
        Self {
            reel: session.reel.iter().map(Participant::full_name).collect(),
            winner_slot_index: session.winner_slot_index,
            winner: session.winner.full_name(),
            revealed,
            generation,
        }
    }
}

/// Everything the popup renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub participants: Vec<ParticipantView>,
    pub search_query: String,
    pub spoken_count: usize,
    pub visible_count: usize,
    pub all_spoken: bool,
    pub backlog: Vec<BacklogItem>,
    pub backlog_completed: usize,
    pub timer: TimerReading,
    pub picker: Option<PickerView>,
    /// Recent changes may not survive closing the popup
    pub persistence_degraded: bool,
}

impl SessionView {
    /// "spoken/total" counter text
    pub fn spoken_counter(&self) -> String {
        format!("{}/{}", self.spoken_count, self.participants.len())
    }

    /// "completed/total" counter text for the backlog
    pub fn backlog_counter(&self) -> String {
        format!("{}/{}", self.backlog_completed, self.backlog.len())
    }
}

/// Result of a coordinator call
#[derive(Debug, Clone)]
pub struct Update {
    /// Fresh view to render
    pub view: SessionView,
    /// Effects for the shell
    pub cmd: Cmd,
}
