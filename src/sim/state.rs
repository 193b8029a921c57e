//! Game state and core simulation types
//!
//! The level owns its walls, mines and balls. They are thrown away and
//! regenerated as a whole on every level start or retry.

use glam::DVec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::maze::{self, CellPos, LevelParams, Maze, MazeError, Mine, Wall};
use super::modes::{GameModeConfig, PrecisionTracker, progress_score};
use crate::cell_center;
use crate::consts::*;
use crate::settings::{Difficulty, Settings};

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Game is paused, balls frozen
    Paused,
    /// Every player reached the goal; waiting for the next level
    LevelComplete,
    /// Run ended (out of lives or out of time)
    GameOver,
}

/// Ball colors per player slot
pub const PLAYER_COLORS: [[u8; 3]; MAX_PLAYERS] = [[255, 0, 0], [0, 120, 255]];

/// A ball entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ball {
    pub pos: DVec2,
    pub vel: DVec2,
    pub radius: f64,
    /// Tilt sensitivity multiplier
    pub sensitivity: f64,
    pub color: [u8; 3],
    /// World extent the ball is kept inside
    pub bounds: DVec2,
}

impl Ball {
    pub fn new(pos: DVec2, bounds: DVec2) -> Self {
        Self {
            pos,
            vel: DVec2::ZERO,
            radius: BALL_RADIUS,
            sensitivity: 1.0,
            color: PLAYER_COLORS[0],
            bounds,
        }
    }

    /// Move to `pos` at rest
    pub fn reset_to(&mut self, pos: DVec2) {
        self.pos = pos;
        self.vel = DVec2::ZERO;
    }
}

/// One local player and their ball
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    pub ball: Ball,
    /// Reached the goal this level
    pub finished: bool,
    /// Level time at which the goal was reached
    pub finish_time: Option<f64>,
    /// Score earned this level
    pub level_score: u64,
    /// Sum of level scores this run
    pub total_score: u64,
    /// Touching a wall at the end of the last frame
    touching_wall: bool,
    /// Velocity saved while paused
    paused_vel: DVec2,
}

impl Player {
    fn new(name: String, slot: usize, start: DVec2, bounds: DVec2, sensitivity: f64) -> Self {
        let mut ball = Ball::new(start, bounds);
        ball.sensitivity = sensitivity;
        ball.color = PLAYER_COLORS[slot % MAX_PLAYERS];
        Self {
            name,
            ball,
            finished: false,
            finish_time: None,
            level_score: 0,
            total_score: 0,
            touching_wall: false,
            paused_vel: DVec2::ZERO,
        }
    }

    fn reset_for_level(&mut self, start: DVec2) {
        self.ball.reset_to(start);
        self.finished = false;
        self.finish_time = None;
        self.level_score = 0;
        self.touching_wall = false;
        self.paused_vel = DVec2::ZERO;
    }

    /// Record a wall contact; true only on the frame contact begins
    pub(crate) fn note_wall_contact(&mut self, collided: bool) -> bool {
        let began = collided && !self.touching_wall;
        self.touching_wall = collided;
        began
    }
}

/// Flat result handed to the persistence layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub player_name: String,
    pub level: u32,
    pub time_seconds: f64,
    pub score: u64,
    pub game_mode: String,
}

/// Things that happened during a tick, for audio/UI collaborators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A ball started touching a wall
    WallHit { player: usize },
    /// A ball triggered a mine
    MineHit { player: usize },
    /// The shared life pool lost a life
    LifeLost { lives_left: u8 },
    /// A player reached the goal
    PlayerFinished { player: usize, score: u64 },
    /// Every player reached the goal
    LevelComplete { level: u32 },
    /// Extra countdown seconds for finishing a level
    BonusTime { seconds: f64 },
    /// Countdown hit zero
    TimeUp,
    GameOver,
}

/// HUD values for the renderer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hud {
    pub level: u32,
    /// Elapsed seconds (count-up modes) or seconds left (count-down modes)
    pub timer: f64,
    pub lives: u8,
    pub max_lives: u8,
    /// Precision bonus accrued so far this level
    pub precision: u64,
    /// Run score per player
    pub scores: Vec<u64>,
    pub phase: GamePhase,
}

/// Everything fixed for a run before it starts
#[derive(Debug, Clone)]
pub struct GameSetup {
    pub config: GameModeConfig,
    pub difficulty: Difficulty,
    /// One name per player (1 or 2)
    pub player_names: Vec<String>,
    pub sensitivity: f64,
    /// World extent in pixels
    pub world: DVec2,
}

impl GameSetup {
    pub fn from_settings(settings: &Settings, config: GameModeConfig, players: usize) -> Self {
        let players = players.clamp(1, MAX_PLAYERS);
        Self {
            config,
            difficulty: settings.difficulty,
            player_names: (0..players)
                .map(|slot| settings.player_name(slot).to_string())
                .collect(),
            sensitivity: settings.sensitivity,
            world: DVec2::new(WORLD_WIDTH, WORLD_HEIGHT),
        }
    }
}

/// Complete game state for one run
#[derive(Debug, Clone)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    pub(crate) rng: Pcg32,
    pub config: GameModeConfig,
    pub difficulty: Difficulty,
    pub world: DVec2,
    /// Current level (1-based)
    pub level: u32,
    /// Shared life pool
    pub lives: u8,
    pub max_lives: u8,
    /// HUD timer: elapsed seconds, or seconds left in count-down modes
    pub timer: f64,
    /// Seconds spent playing this level (pauses excluded)
    pub level_time: f64,
    /// Seconds spent on completed levels this run
    pub total_time: f64,
    pub levels_completed: u32,
    pub phase: GamePhase,
    pub players: Vec<Player>,
    /// Current maze grid
    pub maze: Maze,
    pub walls: Vec<Wall>,
    pub mines: Vec<Mine>,
    pub start: DVec2,
    pub goal: DVec2,
    pub goal_radius: f64,
    /// World position of the maze's top-left corner
    pub origin: DVec2,
    pub precision: PrecisionTracker,
    /// Seconds left during which mines are ignored after a hit
    pub mine_grace: f64,
    /// Bonus seconds granted by the last completed level
    pub last_bonus: Option<f64>,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) records: Vec<ScoreRecord>,
}

impl GameState {
    /// Create a run and generate its first level
    pub fn new(seed: u64, setup: &GameSetup) -> Result<Self, MazeError> {
        let players = setup.player_names.len().clamp(1, MAX_PLAYERS);
        let names: Vec<String> = (0..players)
            .map(|slot| {
                setup
                    .player_names
                    .get(slot)
                    .cloned()
                    .unwrap_or_else(|| format!("Player {}", slot + 1))
            })
            .collect();

        let mut state = Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            config: setup.config,
            difficulty: setup.difficulty,
            world: setup.world,
            level: 1,
            lives: setup.config.initial_lives,
            max_lives: setup.config.initial_lives,
            timer: 0.0,
            level_time: 0.0,
            total_time: 0.0,
            levels_completed: 0,
            phase: GamePhase::Playing,
            players: names
                .into_iter()
                .enumerate()
                .map(|(slot, name)| {
                    Player::new(name, slot, DVec2::ZERO, setup.world, setup.sensitivity)
                })
                .collect(),
            maze: Maze::new(0, 0, 0),
            walls: Vec::new(),
            mines: Vec::new(),
            start: DVec2::ZERO,
            goal: DVec2::ZERO,
            goal_radius: GOAL_RADIUS,
            origin: DVec2::ZERO,
            precision: PrecisionTracker::default(),
            mine_grace: 0.0,
            last_bonus: None,
            events: Vec::new(),
            records: Vec::new(),
        };

        state.start_game()?;
        Ok(state)
    }

    pub fn is_multiplayer(&self) -> bool {
        self.players.len() > 1
    }

    /// Restart the run from level 1 with full lives
    pub fn start_game(&mut self) -> Result<(), MazeError> {
        self.level = 1;
        self.total_time = 0.0;
        self.levels_completed = 0;
        self.lives = self.config.initial_lives;
        self.max_lives = self.lives;
        for player in &mut self.players {
            player.total_score = 0;
        }
        log::info!(
            "Starting {} run ({} player(s), {})",
            self.config.mode.display_name(),
            self.players.len(),
            self.difficulty.as_str()
        );
        self.init_level()
    }

    /// Generate the current level from scratch and reset per-level state
    pub fn init_level(&mut self) -> Result<(), MazeError> {
        let params = LevelParams {
            level: self.level,
            world: self.world,
            difficulty: self.difficulty,
            mine_policy: self.config.mine_policy,
            mine_percentage: self.config.mine_percentage,
        };
        let layout = maze::generate(&params, &mut self.rng)?;

        // Keep the hole inside its cell on small mazes
        self.goal_radius = GOAL_RADIUS.min(f64::from(layout.cell_size) * 0.35);
        self.start = layout.start;
        self.goal = layout.goal;
        self.origin = layout.origin;
        self.walls = layout.walls;
        self.mines = layout.mines;
        self.maze = layout.maze;

        for player in &mut self.players {
            player.reset_for_level(self.start);
        }

        self.level_time = 0.0;
        self.precision = PrecisionTracker::default();
        self.mine_grace = 0.0;
        self.last_bonus = None;
        self.timer = self.config.level_start_time(&mut self.rng);
        self.phase = GamePhase::Playing;

        log::info!(
            "Level {}: {}x{} maze, {} mines, timer {:.0}s",
            self.level,
            self.maze.cols(),
            self.maze.rows(),
            self.mines.len(),
            self.timer
        );
        Ok(())
    }

    /// Throw the current level away and regenerate it
    pub fn retry_level(&mut self) -> Result<(), MazeError> {
        match self.phase {
            GamePhase::Playing | GamePhase::Paused => self.init_level(),
            _ => Ok(()),
        }
    }

    /// Move on after a completed level
    pub fn advance_level(&mut self) -> Result<(), MazeError> {
        if self.phase != GamePhase::LevelComplete {
            return Ok(());
        }
        self.level += 1;
        self.init_level()
    }

    /// Pause or resume; balls keep their velocity across the pause
    pub fn toggle_pause(&mut self) {
        match self.phase {
            GamePhase::Playing => {
                for player in &mut self.players {
                    player.paused_vel = player.ball.vel;
                    player.ball.vel = DVec2::ZERO;
                }
                self.phase = GamePhase::Paused;
                log::info!("Paused at {:.1}s", self.level_time);
            }
            GamePhase::Paused => {
                for player in &mut self.players {
                    player.ball.vel = player.paused_vel;
                }
                self.phase = GamePhase::Playing;
                log::info!("Resumed");
            }
            _ => {}
        }
    }

    /// End the run, crediting unfinished players in multiplayer with partial progress
    pub(crate) fn game_over(&mut self) {
        self.phase = GamePhase::GameOver;
        if self.is_multiplayer() {
            for i in 0..self.players.len() {
                if self.players[i].finished {
                    continue;
                }
                let score = progress_score(self.start, self.goal, self.players[i].ball.pos);
                self.players[i].level_score = score;
                self.players[i].total_score += score;
                let record = self.record_for(i, self.level_time);
                self.records.push(record);
            }
        }
        for player in &mut self.players {
            player.ball.vel = DVec2::ZERO;
        }
        self.events.push(GameEvent::GameOver);
        log::info!(
            "Game over on level {} after {} completed level(s)",
            self.level,
            self.levels_completed
        );
    }

    pub(crate) fn record_for(&self, player: usize, time_seconds: f64) -> ScoreRecord {
        let p = &self.players[player];
        ScoreRecord {
            player_name: p.name.clone(),
            level: self.level,
            time_seconds,
            score: p.level_score,
            game_mode: self.config.mode.as_str().to_string(),
        }
    }

    /// Events since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Score records produced since the last call
    pub fn take_records(&mut self) -> Vec<ScoreRecord> {
        std::mem::take(&mut self.records)
    }

    /// World-space center of a maze cell
    pub fn cell_center(&self, pos: CellPos) -> DVec2 {
        self.origin + cell_center(pos.row, pos.col, self.maze.cell_size())
    }

    /// Maze cell under a world-space point
    pub fn cell_at(&self, p: DVec2) -> Option<CellPos> {
        if self.maze.is_empty() {
            return None;
        }
        let local = (p - self.origin) / f64::from(self.maze.cell_size());
        if local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let pos = CellPos::new(local.y as usize, local.x as usize);
        self.maze.get(pos).map(|_| pos)
    }

    /// Renderer-facing HUD snapshot
    pub fn hud(&self) -> Hud {
        Hud {
            level: self.level,
            timer: self.timer,
            lives: self.lives,
            max_lives: self.max_lives,
            precision: self.precision.points(PRECISION_POINTS_PER_SEC),
            scores: self.players.iter().map(|p| p.total_score).collect(),
            phase: self.phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::modes::{GameMode, ModeTable};

    pub(crate) fn setup(mode: GameMode, players: usize) -> GameSetup {
        let table = ModeTable::default();
        GameSetup::from_settings(&Settings::default(), *table.get(mode), players)
    }

    #[test]
    fn test_new_game_starts_at_level_one() {
        let state = GameState::new(12345, &setup(GameMode::Normal, 1)).unwrap();
        assert_eq!(state.level, 1);
        assert_eq!(state.lives, 3);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.players.len(), 1);
        assert_eq!(state.players[0].ball.pos, state.start);
        assert_eq!(state.timer, 0.0);
        assert!(state.mines.is_empty());
        assert!(state.maze.is_fully_connected());
        assert!(state.goal_radius <= GOAL_RADIUS);
    }

    #[test]
    fn test_player_names_and_colors() {
        let state = GameState::new(1, &setup(GameMode::Normal, 2)).unwrap();
        assert_eq!(state.players[0].name, "Player");
        assert_eq!(state.players[1].name, "Player 2");
        assert_eq!(state.players[1].ball.color, PLAYER_COLORS[1]);
        assert!(state.is_multiplayer());

        // Player count is capped
        let state = GameState::new(1, &setup(GameMode::Normal, 5)).unwrap();
        assert_eq!(state.players.len(), MAX_PLAYERS);
    }

    #[test]
    fn test_minefield_level_has_mines() {
        let state = GameState::new(7, &setup(GameMode::Minefield, 1)).unwrap();
        assert!(!state.mines.is_empty());
        assert!(state.mines.iter().all(|m| m.cell != CellPos::ORIGIN));
    }

    #[test]
    fn test_countdown_modes_start_with_time() {
        let state = GameState::new(3, &setup(GameMode::TimeAttack, 1)).unwrap();
        assert_eq!(state.timer, 300.0);

        let state = GameState::new(3, &setup(GameMode::Elimination, 1)).unwrap();
        assert!((30.0..=80.0).contains(&state.timer));
    }

    #[test]
    fn test_elimination_start_timer_over_many_levels() {
        let mut state = GameState::new(99, &setup(GameMode::Elimination, 1)).unwrap();
        for _ in 0..1000 {
            state.init_level().unwrap();
            assert!((30.0..=80.0).contains(&state.timer), "timer {}", state.timer);
        }
    }

    #[test]
    fn test_pause_restores_velocity() {
        let mut state = GameState::new(5, &setup(GameMode::Normal, 1)).unwrap();
        state.players[0].ball.vel = DVec2::new(12.0, -3.0);

        state.toggle_pause();
        assert_eq!(state.phase, GamePhase::Paused);
        assert_eq!(state.players[0].ball.vel, DVec2::ZERO);

        state.toggle_pause();
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.players[0].ball.vel, DVec2::new(12.0, -3.0));
    }

    #[test]
    fn test_retry_regenerates_level() {
        let mut state = GameState::new(5, &setup(GameMode::Normal, 1)).unwrap();
        state.players[0].ball.pos = DVec2::new(500.0, 500.0);
        state.level_time = 12.0;
        state.retry_level().unwrap();
        assert_eq!(state.level, 1);
        assert_eq!(state.level_time, 0.0);
        assert_eq!(state.players[0].ball.pos, state.start);
    }

    #[test]
    fn test_advance_only_after_completion() {
        let mut state = GameState::new(5, &setup(GameMode::Normal, 1)).unwrap();
        state.advance_level().unwrap();
        assert_eq!(state.level, 1);

        state.phase = GamePhase::LevelComplete;
        state.advance_level().unwrap();
        assert_eq!(state.level, 2);
        assert_eq!(state.phase, GamePhase::Playing);
    }

    #[test]
    fn test_multiplayer_game_over_credits_progress() {
        let mut state = GameState::new(5, &setup(GameMode::TimeAttack, 2)).unwrap();
        let (start, goal) = (state.start, state.goal);
        state.players[0].ball.pos = start + (goal - start) * 0.5;

        state.game_over();
        let records = state.take_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].score, 500);
        assert_eq!(records[1].score, 0);
        assert_eq!(records[0].game_mode, "timeattack");
        assert_eq!(state.drain_events(), vec![GameEvent::GameOver]);
    }

    #[test]
    fn test_single_player_game_over_has_no_record() {
        let mut state = GameState::new(5, &setup(GameMode::Normal, 1)).unwrap();
        state.game_over();
        assert!(state.take_records().is_empty());
        assert_eq!(state.phase, GamePhase::GameOver);
    }

    #[test]
    fn test_cell_lookup() {
        let state = GameState::new(5, &setup(GameMode::Normal, 1)).unwrap();
        assert_eq!(state.cell_at(state.start), Some(CellPos::ORIGIN));
        assert_eq!(state.cell_center(CellPos::ORIGIN), state.start);
        assert_eq!(state.cell_at(state.goal), Some(state.maze.goal()));
        assert_eq!(state.cell_at(DVec2::new(5.0, 5.0)), None);
    }

    #[test]
    fn test_wall_contact_edges() {
        let mut state = GameState::new(5, &setup(GameMode::Normal, 1)).unwrap();
        let player = &mut state.players[0];
        assert!(player.note_wall_contact(true));
        assert!(!player.note_wall_contact(true));
        assert!(!player.note_wall_contact(false));
        assert!(player.note_wall_contact(true));
    }
}
