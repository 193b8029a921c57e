//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (walls sorted, players by slot)
//! - No rendering or platform dependencies

pub mod collision;
pub mod maze;
pub mod modes;
pub mod physics;
pub mod state;
pub mod tick;

pub use collision::{CollisionResult, ball_wall_collision, reflect_velocity};
pub use maze::{CellPos, LevelParams, Maze, MazeError, MazeLayout, Mine, MinePolicy, Side, Wall};
pub use modes::{GameMode, GameModeConfig, ModeTable, TimerDirection, UnknownMode};
pub use physics::step_frame;
pub use state::{
    Ball, GameEvent, GamePhase, GameSetup, GameState, Hud, Player, ScoreRecord, PLAYER_COLORS,
};
pub use tick::{TickInput, tick};
