use std::fmt;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::gesture::SwipeDirection;
use super::timers::{Timer, TimerQueue};

pub const ROUND_SECONDS: u32 = 10;
pub const COUNTDOWN_HIDE_AT: u32 = 5;
pub const INSTRUCTION_MS: u64 = 3000;
pub const TICK_MS: u64 = 1000;
pub const INACTIVITY_THRESHOLD_MS: u64 = 2000;
pub const INACTIVITY_POLL_MS: u64 = 500;
pub const FREEZE_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            Side::Left
        } else {
            Side::Right
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("Gauche"),
            Side::Right => f.write_str("Droite"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Won,
    Lost,
}

impl Verdict {
    /// A frozen screen at the buzzer always loses, whatever side it is on.
    pub fn judge(state: &RoundState) -> Self {
        if !state.is_frozen() && state.current == state.target {
            Verdict::Won
        } else {
            Verdict::Lost
        }
    }

    pub fn is_win(self) -> bool {
        self == Verdict::Won
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Won => f.write_str("Gagné !"),
            Verdict::Lost => f.write_str("Perdu !"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Instructing,
    Running,
    Frozen,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundState {
    pub target: Side,
    pub current: Side,
    pub seconds_remaining: u32,
    pub phase: Phase,
    pub last_input_ms: u64,
}

impl RoundState {
    pub fn new(target: Side, at: u64) -> Self {
        Self {
            target,
            current: Side::Left,
            seconds_remaining: ROUND_SECONDS,
            phase: Phase::Instructing,
            last_input_ms: at,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.phase == Phase::Frozen
    }

    pub fn is_ended(&self) -> bool {
        self.phase == Phase::Ended
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Timer(Timer),
    Swipe(SwipeDirection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Schedule { at: u64, timer: Timer },
    CancelAll,
    Finish(Verdict),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: RoundState,
    pub commands: Vec<Command>,
}

impl Transition {
    #[cfg(test)]
    pub fn verdict(&self) -> Option<Verdict> {
        self.commands.iter().find_map(|c| match c {
            Command::Finish(v) => Some(*v),
            _ => None,
        })
    }
}

/// Applies one event to the round. Events that don't fit the current phase leave it untouched.
pub fn step(state: RoundState, at: u64, event: Event) -> Transition {
    let mut next = state;
    let mut commands = Vec::new();

    match (state.phase, event) {
        (Phase::Ended, _) => (),
        (Phase::Instructing, Event::Timer(Timer::InstructionDismiss)) => {
            next.phase = Phase::Running;
            next.last_input_ms = at;
            commands.push(Command::Schedule {
                at: at + TICK_MS,
                timer: Timer::CountdownTick,
            });
            commands.push(Command::Schedule {
                at,
                timer: Timer::InactivityPoll,
            });
        }
        (Phase::Running | Phase::Frozen, Event::Timer(Timer::CountdownTick)) => {
            next.seconds_remaining = state.seconds_remaining.saturating_sub(1);
            if next.seconds_remaining == 0 {
                let verdict = Verdict::judge(&next);
                next.phase = Phase::Ended;
                commands.push(Command::CancelAll);
                commands.push(Command::Finish(verdict));
            } else {
                commands.push(Command::Schedule {
                    at: at + TICK_MS,
                    timer: Timer::CountdownTick,
                });
            }
        }
        (Phase::Running, Event::Timer(Timer::InactivityPoll)) => {
            if at.saturating_sub(state.last_input_ms) >= INACTIVITY_THRESHOLD_MS {
                next.phase = Phase::Frozen;
                commands.push(Command::Schedule {
                    at: at + FREEZE_MS,
                    timer: Timer::Unfreeze,
                });
            }
            commands.push(Command::Schedule {
                at: at + INACTIVITY_POLL_MS,
                timer: Timer::InactivityPoll,
            });
        }
        (Phase::Frozen, Event::Timer(Timer::InactivityPoll)) => {
            commands.push(Command::Schedule {
                at: at + INACTIVITY_POLL_MS,
                timer: Timer::InactivityPoll,
            });
        }
        (Phase::Frozen, Event::Timer(Timer::Unfreeze)) => {
            next.phase = Phase::Running;
            next.current = state.current.toggled();
            next.last_input_ms = at;
        }
        (Phase::Running, Event::Swipe(_)) => {
            next.current = state.current.toggled();
            next.last_input_ms = at;
        }
        _ => (),
    }

    Transition {
        state: next,
        commands,
    }
}

/// Owns one round: its state, its pending timers and the swipes it was fed.
#[derive(Debug, Clone)]
pub struct RoundController {
    state: RoundState,
    timers: TimerQueue,
    verdict: Option<Verdict>,
    swipes: Vec<(u64, SwipeDirection)>,
    started_at: DateTime<Utc>,
}

impl RoundController {
    pub fn new<R: Rng + ?Sized>(rng: &mut R, at: u64) -> Self {
        Self::with_target(Side::random(rng), at)
    }

    pub fn with_target(target: Side, at: u64) -> Self {
        let mut timers = TimerQueue::default();
        timers.schedule(at + INSTRUCTION_MS, Timer::InstructionDismiss);
        info!(%target, at, "round created");
        Self {
            state: RoundState::new(target, at),
            timers,
            verdict: None,
            swipes: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn tick(&mut self, at: u64, event: Event) -> Option<Verdict> {
        if let Event::Swipe(direction) = event {
            if !self.state.is_ended() {
                self.swipes.push((at, direction));
            }
        }

        let before = self.state;
        let Transition { state, commands } = step(before, at, event);
        self.state = state;

        if before.phase != state.phase {
            debug!(at, from = ?before.phase, to = ?state.phase, "phase change");
        }
        if before.current != state.current {
            debug!(at, side = %state.current, "side toggled");
        }

        for command in commands {
            match command {
                Command::Schedule { at, timer } => self.timers.schedule(at, timer),
                Command::CancelAll => {
                    let cancelled = self.timers.cancel_all();
                    debug!(cancelled, "timers cancelled at round end");
                }
                Command::Finish(verdict) => {
                    info!(at, target = %state.target, current = %state.current, ?verdict, "round ended");
                    self.verdict = Some(verdict);
                }
            }
        }

        self.verdict
    }

    /// Fires every timer due at or before `now`, each at its own due time.
    pub fn advance(&mut self, now: u64) -> Option<Verdict> {
        while let Some((at, timer)) = self.timers.pop_due(now) {
            self.tick(at, Event::Timer(timer));
        }
        self.verdict
    }

    pub fn swipe(&mut self, at: u64, direction: SwipeDirection) -> Option<Verdict> {
        self.advance(at);
        self.tick(at, Event::Swipe(direction))
    }

    /// Runs the remaining timers until the round ends. None if it was torn down.
    pub fn run_to_end(&mut self) -> Option<Verdict> {
        self.advance(u64::MAX)
    }

    pub fn teardown(&mut self) -> usize {
        let cancelled = self.timers.cancel_all();
        if cancelled > 0 {
            debug!(cancelled, "round torn down");
        }
        cancelled
    }

    #[cfg(test)]
    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn target(&self) -> Side {
        self.state.target
    }

    pub fn current(&self) -> Side {
        self.state.current
    }

    pub fn seconds_remaining(&self) -> u32 {
        self.state.seconds_remaining
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.verdict
    }

    pub fn swipes(&self) -> &[(u64, SwipeDirection)] {
        &self.swipes
    }

    /// Wall-clock time the round was created at.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn next_due(&self) -> Option<u64> {
        self.timers.next_due()
    }

    #[cfg(test)]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn countdown_visible(&self) -> bool {
        self.state.phase == Phase::Running && self.state.seconds_remaining > COUNTDOWN_HIDE_AT
    }

    pub fn page_visible(&self) -> bool {
        self.state.phase == Phase::Running
    }
}
