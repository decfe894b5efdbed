//! Console stand-in for the popup.
//!
//! Reads one command per line, prints the session after every change and
//! carries out the commands the core asks for (ticks, reveal delay, toasts).
//! State lives in a native_db file under the user data directory, so quitting
//! and starting again behaves like closing and reopening the popup.
//!
//! Set `RUST_LOG=debug` to see the engine logs.

use standup_core::{
    Cmd, Error, ParticipantKey, SessionConfig, SessionCoordinator, SessionView, SharedStore,
    SystemClock, TimerState, Update,
};
use standup_db::KvStore;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
commands:
  list | add FIRST LAST | rm FIRST LAST | toggle FIRST LAST
  shuffle | reset | search [TEXT] | import FILE | export FILE
  timer [MINUTES] | stop | + | -
  pick | accept | close
  topic TEXT | done ID | drop ID | clear
  help | quit";

struct Tick {
    interval: Duration,
    generation: u64,
    due: Instant,
}

/// One-shot callback
struct Deadline {
    generation: u64,
    due: Instant,
}

impl Deadline {
    fn after(delay_ms: u64, generation: u64) -> Self {
        Self {
            generation,
            due: Instant::now() + Duration::from_millis(delay_ms),
        }
    }
}

/// Pending callbacks the core has asked for
#[derive(Default)]
struct Effects {
    tick: Option<Tick>,
    reveal: Option<Deadline>,
    search_clear: Option<Deadline>,
}

impl Effects {
    fn apply(&mut self, cmd: &Cmd) {
        for cmd in cmd.iter() {
            match cmd {
                Cmd::ArmTimerTick {
                    interval_ms,
                    generation,
                } => {
                    let interval = Duration::from_millis(*interval_ms);
                    self.tick = Some(Tick {
                        interval,
                        generation: *generation,
                        due: Instant::now() + interval,
                    });
                }
                Cmd::CancelTimerTick => self.tick = None,
                Cmd::ScheduleReveal {
                    delay_ms,
                    generation,
                } => self.reveal = Some(Deadline::after(*delay_ms, *generation)),
                Cmd::CancelReveal => self.reveal = None,
                Cmd::ScheduleSearchClear {
                    delay_ms,
                    generation,
                } => self.search_clear = Some(Deadline::after(*delay_ms, *generation)),
                Cmd::Celebrate => println!("*** Everyone has spoken! ***"),
                Cmd::Notify { message } => println!(">> {}", message),
                Cmd::None | Cmd::Batch(_) => {}
            }
        }
    }

    fn next_due(&self) -> Option<Instant> {
        [
            self.tick.as_ref().map(|t| t.due),
            self.reveal.as_ref().map(|r| r.due),
            self.search_clear.as_ref().map(|c| c.due),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// Fire whatever is due
    fn run_due(&mut self, session: &mut SessionCoordinator) {
        let now = Instant::now();
        if let Some(reveal) = self.reveal.as_ref().filter(|r| r.due <= now) {
            let generation = reveal.generation;
            self.reveal = None;
            let update = session.finish_picker(generation);
            if let Some(picker) = &update.view.picker {
                println!("The picker stopped on {} (accept / close)", picker.winner);
            }
            self.apply(&update.cmd);
        }
        if let Some(clear) = self.search_clear.as_ref().filter(|c| c.due <= now) {
            let generation = clear.generation;
            self.search_clear = None;
            let searching = !session.view().search_query.is_empty();
            let update = session.clear_search(generation);
            if searching && update.view.search_query.is_empty() {
                print_view(&update.view);
            }
        }
        if let Some(tick) = self.tick.as_mut().filter(|t| t.due <= now) {
            tick.due = now + tick.interval;
            let generation = tick.generation;
            let update = session.tick_timer(generation);
            if update.view.timer.state == TimerState::Expired {
                println!("Time's up! ({})", update.view.timer.display);
            }
            self.apply(&update.cmd);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .try_init();
}

fn database_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("standup").join("session.db"))
}

fn open_store() -> SharedStore {
    if let Some(path) = database_path() {
        match KvStore::open(&path) {
            Ok(store) => {
                info!(path = %path.display(), "using on-disk store");
                match store.keys() {
                    Ok(keys) => debug!(?keys, "saved session found"),
                    Err(err) => warn!(error = %err, "cannot list saved keys"),
                }
                return Arc::new(store);
            }
            Err(err) => warn!(error = %err, "cannot open on-disk store"),
        }
    }
    match KvStore::in_memory() {
        Ok(store) => Arc::new(store),
        Err(err) => {
            warn!(error = %err, "running without storage");
            Arc::new(standup_core::UnavailableStore)
        }
    }
}

fn print_view(view: &SessionView) {
    println!();
    println!("Participants {}", view.spoken_counter());
    for p in view.participants.iter().filter(|p| p.visible) {
        let mark = if p.spoken { "x" } else { " " };
        println!("  [{}] {:<3} {}", mark, p.initials, p.full_name());
    }
    if !view.search_query.is_empty() {
        println!("  ({} match \"{}\")", view.visible_count, view.search_query);
    }
    println!("Part B {}", view.backlog_counter());
    for item in &view.backlog {
        let mark = if item.completed { "x" } else { " " };
        println!("  [{}] {} ({})", mark, item.text, item.id);
    }
    println!("Timer {} {:?} {:?}", view.timer.display, view.timer.state, view.timer.band);
    if view.persistence_degraded {
        println!("(changes may not be saved)");
    }
}

fn two_names(args: &str) -> Option<(&str, &str)> {
    let mut parts = args.split_whitespace();
    Some((parts.next()?, parts.next()?))
}

/// Run one console command
///
/// Returns `None` for commands that do not touch the session.
fn dispatch(
    session: &mut SessionCoordinator,
    minutes: &mut String,
    line: &str,
) -> Result<Option<Update>, Box<dyn std::error::Error>> {
    let (command, args) = match line.split_once(' ') {
        Some((command, args)) => (command, args.trim()),
        None => (line, ""),
    };
    let update = match command {
        "list" => Some(Update {
            view: session.view(),
            cmd: Cmd::None,
        }),
        "add" => {
            let (first, last) = two_names(args).unwrap_or((args, ""));
            Some(session.add_participant(first, last)?)
        }
        "rm" | "toggle" => {
            let (first, last) = two_names(args)
                .ok_or_else(|| Error::validation("Usage: rm|toggle FIRST LAST"))?;
            let key = ParticipantKey::new(first, last);
            Some(if command == "rm" {
                session.remove_participant(&key)
            } else {
                session.toggle_participant(&key)
            })
        }
        "shuffle" => Some(session.shuffle_roster()),
        "reset" => Some(session.reset_round()),
        "search" => Some(session.search_roster(args)),
        "import" => {
            let text = std::fs::read_to_string(args)?;
            Some(session.import_roster(&text)?)
        }
        "export" => {
            std::fs::write(args, session.export_roster()?)?;
            println!(">> Roster written to {}", args);
            None
        }
        "timer" => {
            if !args.is_empty() {
                *minutes = args.to_string();
            }
            Some(session.start_timer_from_input(minutes)?)
        }
        "stop" => Some(session.stop_timer()),
        "+" | "-" => {
            *minutes = session
                .adjust_timer_minutes(minutes, command == "+")
                .to_string();
            println!(">> Minutes: {}", minutes);
            None
        }
        "pick" => {
            let update = session.run_picker()?;
            println!("Spinning...");
            Some(update)
        }
        "accept" => Some(session.commit_picker_winner()?),
        "close" => Some(session.close_picker()),
        "topic" => Some(session.add_backlog_item(args)?),
        "done" => Some(session.toggle_backlog_item(args)),
        "drop" => Some(session.remove_backlog_item(args)),
        "clear" => Some(session.clear_completed_backlog()),
        "help" => {
            println!("{}", HELP);
            None
        }
        other => return Err(format!("Unknown command: {} (try help)", other).into()),
    };
    Ok(update)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let store = open_store();
    let config = SessionConfig::default();
    let mut minutes = String::from("5");
    let mut session = SessionCoordinator::open(store, Arc::new(SystemClock), config);

    let mut effects = Effects::default();
    let update = session.recover();
    print_view(&update.view);
    effects.apply(&update.cmd);
    println!("{}", HELP);

    let (tx, rx) = mpsc::channel::<String>();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    loop {
        print!("> ");
        io::stdout().flush()?;

        let line = loop {
            let received = match effects.next_due() {
                Some(due) => rx.recv_timeout(due.saturating_duration_since(Instant::now())),
                None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            };
            match received {
                Ok(line) => break Some(line),
                Err(RecvTimeoutError::Timeout) => effects.run_due(&mut session),
                Err(RecvTimeoutError::Disconnected) => break None,
            }
        };

        let Some(line) = line else { break };
        let line = line.trim();
        if line == "quit" || line == "exit" {
            break;
        }
        if line.is_empty() {
            continue;
        }

        match dispatch(&mut session, &mut minutes, line) {
            Ok(Some(update)) => {
                print_view(&update.view);
                effects.apply(&update.cmd);
            }
            Ok(None) => {}
            Err(err) => {
                let user_error = err
                    .downcast_ref::<Error>()
                    .is_some_and(Error::is_user_error);
                if !user_error {
                    warn!(error = %err, command = line, "command failed");
                }
                println!("!! {}", err);
            }
        }
    }

    info!("popup closed");
    Ok(())
}
