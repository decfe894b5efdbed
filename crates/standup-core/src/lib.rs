//! Standup Core - Session state engine for a stand-up meeting popup
//!
//! This crate provides everything the popup needs besides drawing:
//! - Roster of participants with spoken flags, import and export
//! - "Part B" backlog of follow-up topics
//! - Countdown timer rebuilt from the wall clock after the popup reopens
//! - Random speaker picker with a slot-machine reel
//! - A coordinator that turns UI actions into views and shell commands
//!
//! ## Architecture
//!
//! ```text
//! UI shell ──action──> SessionCoordinator ──> RosterEngine / BacklogEngine
//!    ^                        │          └──> TimerEngine / PickerEngine
//!    │                        v                       │
//!    └──── Update { view, cmd } <───────── PersistentStore
//! ```
//!
//! The only I/O is the [`PersistentStore`] trait. Storage failures never fail
//! an operation; the session keeps working in memory and reports
//! `persistence_degraded` in its view.

mod backlog;
mod cmd;
mod config;
pub mod coordinator;
mod error;
mod picker;
mod rng;
mod roster;
pub mod store;
pub mod time;
mod timer;
mod view;

pub use backlog::{BacklogEngine, BacklogItem};
pub use cmd::Cmd;
pub use config::{DefaultMember, SessionConfig, StorageKeys};
pub use coordinator::{Renderer, SessionCoordinator};
pub use error::{Error, Result};
pub use picker::{PickSession, PickerEngine};
pub use rng::PickRng;
pub use roster::{Participant, ParticipantKey, RosterEngine};
pub use store::{MemoryStore, PersistentStore, SharedStore, UnavailableStore};
pub use time::{format_countdown, Clock, ManualClock, Millis, SystemClock};
pub use timer::{parse_minutes, Band, TimerEngine, TimerReading, TimerSession, TimerState};
pub use view::{ParticipantView, PickerView, SessionView, Update};
