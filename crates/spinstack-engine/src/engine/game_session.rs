use std::time::Duration;

use rand::Rng;

use crate::{
    ActionError, GameOverError,
    core::{
        movement::Direction,
        piece::{Piece, PieceKind},
    },
};

use super::{
    game_state::GameState,
    piece_buffer::PieceSeed,
    scoring::{self, LockResult, ScoreKeeper},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum SessionState {
    Playing,
    Paused,
    GameOver,
}

/// A running game: the rules state plus gravity, pause and game-over
/// tracking.
///
/// Time advances in frames; the falling piece moves down one row every
/// `100 + max(0, 900 - 100 * level)` milliseconds worth of frames.
///
/// # Example
///
/// ```
/// use spinstack_engine::{GameSession, SessionState};
///
/// let mut session = GameSession::new(60);
/// for _ in 0..60 {
///     session.increment_frame();
/// }
/// assert_eq!(session.session_state(), SessionState::Playing);
/// assert_eq!(session.duration().as_secs(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct GameSession {
    state: GameState,
    session_state: SessionState,
    game_over_reason: Option<GameOverError>,
    fps: u64,
    total_frames: u64,
    drop_frames: u64,
}

fn drop_frames(level: usize, fps: u64) -> u64 {
    (scoring::drop_interval_millis(level) * fps / 1000).max(1)
}

impl GameSession {
    #[must_use]
    pub fn new(fps: u64) -> Self {
        Self::from_state(fps, GameState::new())
    }

    #[must_use]
    pub fn with_seed(fps: u64, seed: PieceSeed) -> Self {
        Self::from_state(fps, GameState::with_seed(seed))
    }

    #[must_use]
    pub fn from_state(fps: u64, state: GameState) -> Self {
        let fps = fps.max(1);
        let drop_frames = drop_frames(state.scores().level(), fps);
        Self {
            state,
            session_state: SessionState::Playing,
            game_over_reason: None,
            fps,
            total_frames: 0,
            drop_frames,
        }
    }

    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    #[must_use]
    pub fn scores(&self) -> &ScoreKeeper {
        self.state.scores()
    }

    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.session_state
    }

    #[must_use]
    pub fn game_over_reason(&self) -> Option<GameOverError> {
        self.game_over_reason
    }

    #[must_use]
    pub fn fps(&self) -> u64 {
        self.fps
    }

    #[must_use]
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Returns the played time, excluding pauses.
    #[must_use]
    pub fn duration(&self) -> Duration {
        const NANOS_PER_SEC: u64 = 1_000_000_000;
        let secs = self.total_frames / self.fps;
        let nanos = (self.total_frames % self.fps) * NANOS_PER_SEC / self.fps;
        Duration::new(secs, u32::try_from(nanos).unwrap_or(0))
    }

    pub fn toggle_pause(&mut self) {
        self.session_state = match self.session_state {
            SessionState::Playing => SessionState::Paused,
            SessionState::Paused => SessionState::Playing,
            SessionState::GameOver => SessionState::GameOver,
        };
    }

    #[must_use]
    pub fn falling_piece(&self) -> Piece {
        self.state.falling_piece()
    }

    #[must_use]
    pub fn held_piece(&self) -> Option<PieceKind> {
        self.state.held_piece()
    }

    pub fn next_pieces(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.state.next_pieces()
    }

    /// Advances one frame and applies gravity when the drop timer runs out.
    ///
    /// Returns the lock result if gravity locked the piece.
    pub fn increment_frame(&mut self) -> Option<LockResult> {
        if !self.session_state.is_playing() {
            return None;
        }
        self.total_frames += 1;
        self.drop_frames = self.drop_frames.saturating_sub(1);
        if self.drop_frames > 0 {
            return None;
        }
        self.drop_frames = drop_frames(self.scores().level(), self.fps);
        if self.state.soft_drop().is_ok() {
            return None;
        }
        Some(self.lock_piece())
    }

    fn ensure_playing(&self) -> Result<(), ActionError> {
        if self.session_state.is_playing() {
            Ok(())
        } else {
            Err(ActionError::NotPlaying)
        }
    }

    pub fn move_piece(&mut self, direction: Direction) -> Result<(), ActionError> {
        self.ensure_playing()?;
        Ok(self.state.move_piece(direction)?)
    }

    pub fn rotate_piece(&mut self) -> Result<(), ActionError> {
        self.ensure_playing()?;
        Ok(self.state.rotate_piece()?)
    }

    pub fn rotate_piece_left(&mut self) -> Result<(), ActionError> {
        self.ensure_playing()?;
        Ok(self.state.rotate_piece_left()?)
    }

    pub fn soft_drop(&mut self) -> Result<(), ActionError> {
        self.ensure_playing()?;
        Ok(self.state.soft_drop()?)
    }

    pub fn hold_piece(&mut self) -> Result<(), ActionError> {
        self.ensure_playing()?;
        Ok(self.state.hold_piece()?)
    }

    /// Drops and locks the falling piece.
    ///
    /// Ends the session if the lock tops out.
    pub fn hard_drop(&mut self) -> Result<LockResult, ActionError> {
        self.ensure_playing()?;
        let (lock, result) = self.state.hard_drop();
        self.finish_lock(result);
        Ok(lock)
    }

    /// Pushes garbage rows into the board; ends the session on overflow.
    pub fn inject_garbage<R>(&mut self, count: usize, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        if self.session_state.is_game_over() || count == 0 {
            return;
        }
        let result = self.state.inject_garbage(count, rng);
        self.finish_lock(result);
    }

    fn lock_piece(&mut self) -> LockResult {
        let (lock, result) = self.state.lock_piece();
        self.finish_lock(result);
        lock
    }

    fn finish_lock(&mut self, result: Result<(), GameOverError>) {
        if let Err(reason) = result {
            self.session_state = SessionState::GameOver;
            self.game_over_reason = Some(reason);
        }
    }
}
