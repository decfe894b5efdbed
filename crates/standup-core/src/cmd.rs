//! Commands (side effects) the popup shell carries out after an update

use serde::{Deserialize, Serialize};

/// A command for the UI shell
///
/// The core never sleeps or touches the screen. It asks the shell to arm
/// timers and show things, and the shell calls back into the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cmd {
    /// No operation
    None,

    /// Batch multiple commands
    Batch(Vec<Cmd>),

    /// Call `tick_timer(generation)` every `interval_ms`, replacing any
    /// previously armed tick
    ArmTimerTick { interval_ms: u64, generation: u64 },

    /// Stop calling `tick_timer`
    CancelTimerTick,

    /// Call `finish_picker(generation)` once after `delay_ms`, replacing any
    /// pending reveal
    ScheduleReveal { delay_ms: u64, generation: u64 },

    /// Drop the pending reveal, if any
    CancelReveal,

    /// Call `clear_search(generation)` once after `delay_ms`, replacing any
    /// pending clear
    ScheduleSearchClear { delay_ms: u64, generation: u64 },

    /// Everyone has spoken: play the celebration
    Celebrate,

    /// Show a short message (toast)
    Notify { message: String },
}

impl Cmd {
    /// Create an empty command
    pub fn none() -> Self {
        Cmd::None
    }

    /// Create a batch of commands
    pub fn batch(cmds: impl IntoIterator<Item = Cmd>) -> Self {
        // Flatten nested batches and filter out None
        let mut flattened: Vec<Cmd> = cmds
            .into_iter()
            .flat_map(|cmd| match cmd {
                Cmd::None => vec![],
                Cmd::Batch(inner) => inner,
                other => vec![other],
            })
            .collect();

        match flattened.len() {
            0 => Cmd::None,
            1 => flattened.pop().unwrap_or(Cmd::None),
            _ => Cmd::Batch(flattened),
        }
    }

    /// Create a notification command
    pub fn notify(message: impl Into<String>) -> Self {
        Cmd::Notify {
            message: message.into(),
        }
    }

    /// Check if this is a None command
    pub fn is_none(&self) -> bool {
        matches!(self, Cmd::None)
    }

    /// Iterate over the leaf commands
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Cmd> + '_> {
        match self {
            Cmd::None => Box::new(std::iter::empty()),
            Cmd::Batch(cmds) => Box::new(cmds.iter().flat_map(|c| c.iter())),
            other => Box::new(std::iter::once(other)),
        }
    }

    /// Check if any leaf command matches
    pub fn contains(&self, predicate: impl Fn(&Cmd) -> bool) -> bool {
        self.iter().any(predicate)
    }
}

impl Default for Cmd {
    fn default() -> Self {
        Cmd::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_batch() {
        let cmd = Cmd::batch(vec![Cmd::None, Cmd::Celebrate, Cmd::None]);

        // Should flatten to single command
        assert_eq!(cmd, Cmd::Celebrate);
        assert!(Cmd::batch(vec![Cmd::None]).is_none());
    }

    #[test]
    fn test_cmd_batch_nested() {
        let cmd = Cmd::batch(vec![
            Cmd::batch(vec![Cmd::notify("a"), Cmd::notify("b")]),
            Cmd::CancelReveal,
        ]);

        if let Cmd::Batch(cmds) = &cmd {
            assert_eq!(cmds.len(), 3);
        } else {
            panic!("Expected Batch");
        }
        assert!(cmd.contains(|c| matches!(c, Cmd::CancelReveal)));
        assert_eq!(cmd.iter().count(), 3);
    }
}
