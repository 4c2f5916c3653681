use std::time::Duration;

use chrono::{DateTime, Local};

use crate::board::{Board, Category};
use crate::config::GameConfig;
use crate::difficulty::DifficultyClock;
use crate::error::{GameError, Result};
use crate::high_score::HighScoreStore;
use crate::random::{RandomSelector, RandomSource};
use crate::timer::{Timer, TimerHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Running,
    Ended,
}

impl SessionPhase {
    fn of(ended: bool) -> Self {
        if ended {
            SessionPhase::Ended
        } else {
            SessionPhase::Running
        }
    }
}

/// Mutable counters of the current session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    pub score: u32,
    pub misses: u32,
    pub ended: bool,
    pub current_delay: Duration,
}

impl SessionState {
    fn fresh(config: &GameConfig) -> Self {
        Self {
            score: 0,
            misses: 0,
            ended: false,
            current_delay: config.initial_delay(),
        }
    }
}

/// Read-only view handed to renderers and observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub board: Board,
    pub score: u32,
    pub misses: u32,
    pub max_misses: u32,
    pub ended: bool,
    pub high_score: u32,
    pub high_score_set_at: Option<DateTime<Local>>,
    pub current_delay: Duration,
}

impl SessionSnapshot {
    pub fn phase(&self) -> SessionPhase {
        SessionPhase::of(self.ended)
    }

    pub fn misses_left(&self) -> u32 {
        self.max_misses.saturating_sub(self.misses)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Hit {
        cell: usize,
        category: Category,
        points: u32,
        new_high_score: bool,
    },
    Missed {
        cell: usize,
    },
    GameOver {
        final_score: u32,
    },
    Reset,
    HighScoreCleared,
}

/// Notified after every state change
pub trait SessionObserver {
    fn on_event(&mut self, event: &SessionEvent, snapshot: &SessionSnapshot);
}

impl<F: FnMut(&SessionEvent, &SessionSnapshot)> SessionObserver for F {
    fn on_event(&mut self, event: &SessionEvent, snapshot: &SessionSnapshot) {
        self(event, snapshot)
    }
}

/// Drives one session: spawns, hits, misses, game over and reset.
///
/// The controller owns its ports. It keeps at most one timer request alive
/// and always cancels the old request before arming a new one. Contract
/// violations are returned as errors and leave every field untouched.
pub struct SessionController<T: Timer, H: HighScoreStore, R: RandomSource> {
    config: GameConfig,
    selector: RandomSelector,
    clock: DifficultyClock,
    timer: T,
    store: H,
    rng: R,
    board: Board,
    state: SessionState,
    high_score: u32,
    pending: Option<TimerHandle>,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl<T: Timer, H: HighScoreStore, R: RandomSource> SessionController<T, H, R> {
    /// Validates `config`, reads the high score, builds the first board and
    /// arms the timer for the initial delay.
    pub fn new(config: GameConfig, timer: T, store: H, mut rng: R) -> Result<Self> {
        config.validate()?;

        let selector = RandomSelector::new(config.num_cells);
        let active = selector.select_any(&mut rng)?;
        let board = Board::new(config.num_cells, active, &mut rng)?;
        let high_score = store.read();

        let mut controller = Self {
            config,
            selector,
            clock: DifficultyClock::from_config(&config),
            timer,
            store,
            rng,
            board,
            state: SessionState::fresh(&config),
            high_score,
            pending: None,
            observers: Vec::new(),
        };
        controller.rearm();
        log::debug!(
            "session started: {} cells, active {}, high score {}",
            config.num_cells,
            active,
            high_score
        );
        Ok(controller)
    }

    /// The active cell was not tapped in time.
    pub fn on_timer_expired(&mut self) -> Result<()> {
        self.require_running("on_timer_expired")?;

        let missed = self.board.active_id();
        let misses = self.state.misses + 1;

        if misses >= self.config.max_misses {
            self.state.misses = self.config.max_misses;
            self.state.ended = true;
            self.cancel_pending();
            log::info!("game over with score {}", self.state.score);
            self.publish(SessionEvent::Missed { cell: missed });
            self.publish(SessionEvent::GameOver {
                final_score: self.state.score,
            });
            return Ok(());
        }

        let board = self.next_board()?;
        self.state.misses = misses;
        self.spawn(board);
        log::debug!(
            "missed cell {} ({}/{}), next delay {:?}",
            missed,
            misses,
            self.config.max_misses,
            self.state.current_delay
        );
        self.publish(SessionEvent::Missed { cell: missed });
        Ok(())
    }

    /// Returns `Ok(true)` for a hit. Taps on inactive cells are ignored.
    pub fn on_cell_tapped(&mut self, id: usize) -> Result<bool> {
        self.require_running("on_cell_tapped")?;

        if id != self.board.active_id() {
            return Ok(false);
        }

        let category = self.board.active_cell().category;
        let points = category.points();
        let board = self.next_board()?;

        self.state.score = self.state.score.saturating_add(points);
        let new_high_score = self.state.score > self.high_score;
        if new_high_score {
            self.high_score = self.state.score;
            self.store.write(self.state.score);
            log::info!("new high score {}", self.state.score);
        }

        self.spawn(board);
        log::debug!(
            "hit cell {} ({}, +{}), next delay {:?}",
            id,
            category,
            points,
            self.state.current_delay
        );
        self.publish(SessionEvent::Hit {
            cell: id,
            category,
            points,
            new_high_score,
        });
        Ok(true)
    }

    /// Starts over after game over. Any cell may become active.
    pub fn reset(&mut self) -> Result<()> {
        if !self.state.ended {
            return Err(GameError::SessionRunning { operation: "reset" });
        }

        let active = self.selector.select_any(&mut self.rng)?;
        let board = Board::new(self.config.num_cells, active, &mut self.rng)?;

        self.board = board;
        self.state = SessionState::fresh(&self.config);
        self.rearm();
        log::debug!("session reset, active {}", active);
        self.publish(SessionEvent::Reset);
        Ok(())
    }

    /// Cancels every pending timer request. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.timer.cancel_all();
        self.pending = None;
    }

    /// Routes an expired timer request to [`Self::on_timer_expired`].
    ///
    /// Returns `Ok(true)` when a miss was processed. Handles the controller
    /// did not arm are dropped.
    pub fn poll_timer(&mut self) -> Result<bool> {
        while let Some(handle) = self.timer.take_expired() {
            if self.pending == Some(handle) {
                self.pending = None;
                self.on_timer_expired()?;
                return Ok(true);
            }
            log::debug!("dropping stale timer {:?}", handle);
        }
        Ok(false)
    }

    /// Writes 0 to the store. Allowed in any phase.
    pub fn clear_high_score(&mut self) {
        self.high_score = 0;
        self.store.write(0);
        self.publish(SessionEvent::HighScoreCleared);
    }

    pub fn subscribe<O: SessionObserver + 'static>(&mut self, observer: O) {
        self.observers.push(Box::new(observer));
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            board: self.board.clone(),
            score: self.state.score,
            misses: self.state.misses,
            max_misses: self.config.max_misses,
            ended: self.state.ended,
            high_score: self.high_score,
            high_score_set_at: self.store.achieved_at(),
            current_delay: self.state.current_delay,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        SessionPhase::of(self.state.ended)
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn pending_timer(&self) -> Option<TimerHandle> {
        self.pending
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn store(&self) -> &H {
        &self.store
    }

    fn require_running(&self, operation: &'static str) -> Result<()> {
        if self.state.ended {
            return Err(GameError::SessionEnded { operation });
        }
        Ok(())
    }

    fn next_board(&mut self) -> Result<Board> {
        let active = self
            .selector
            .select_next(&mut self.rng, self.board.active_id())?;
        Ok(Board::new(self.config.num_cells, active, &mut self.rng)?)
    }

    fn spawn(&mut self, board: Board) {
        self.board = board;
        self.state.current_delay = self.clock.next(self.state.current_delay);
        self.rearm();
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.timer.cancel(handle);
        }
    }

    fn rearm(&mut self) {
        self.cancel_pending();
        self.pending = Some(self.timer.schedule(self.state.current_delay));
    }

    fn publish(&mut self, event: SessionEvent) {
        if self.observers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for observer in self.observers.iter_mut() {
            observer.on_event(&event, &snapshot);
        }
    }
}
