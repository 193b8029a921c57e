//! Gravity Maze - tilt-controlled maze game core
//!
//! Core modules:
//! - `sim`: Simulation (maze generation, ball physics, game rules)
//! - `input`: Tilt/keyboard input shaping at the simulation boundary
//! - `settings`: Player preferences
//! - `highscores`: Leaderboard ranking of finished runs

pub mod highscores;
pub mod input;
pub mod settings;
pub mod sim;

pub use highscores::Leaderboard;
pub use settings::{Difficulty, Settings};

/// Game configuration constants
pub mod consts {
    /// Target frame rate of the simulation loop
    pub const FPS: u32 = 60;
    /// Fixed frame timestep
    pub const FRAME_DT: f64 = 1.0 / FPS as f64;
    /// Physics sub-steps per frame (keeps fast balls from tunneling through walls)
    pub const SUBSTEPS: u32 = 4;
    /// Maximum frames simulated per wall-clock update to prevent spiral of death
    pub const MAX_FRAMES_PER_UPDATE: u32 = 5;

    /// Default world dimensions (virtual pixels)
    pub const WORLD_WIDTH: f64 = 1280.0;
    pub const WORLD_HEIGHT: f64 = 720.0;

    /// Maze margins (top is larger to leave room for the HUD)
    pub const MAZE_MARGIN: i32 = 60;
    pub const MAZE_MARGIN_TOP: i32 = 120;
    /// Wall thickness in pixels
    pub const WALL_THICKNESS: i32 = 10;
    /// Smallest cell size any level may use
    pub const MIN_CELL_SIZE: u32 = 40;
    /// Cell size shrink per level
    pub const CELL_SHRINK_PER_LEVEL: u32 = 4;

    /// Ball defaults
    pub const BALL_RADIUS: f64 = 10.0;
    /// Tilt of 1 g accelerates at this many pixels/s²
    pub const GRAVITY: f64 = 980.0;
    /// Per-frame velocity damping
    pub const FRICTION: f64 = 0.98;
    /// Energy kept after a wall bounce
    pub const WALL_RESTITUTION: f64 = 0.9;
    /// Energy kept after bouncing off the world edge
    pub const BOUNDS_RESTITUTION: f64 = 0.5;

    /// Goal hole radius (shrunk on small cells so it never overlaps walls)
    pub const GOAL_RADIUS: f64 = 30.0;

    /// Mine footprint radius
    pub const MINE_SIZE: f64 = 15.0;
    /// Seconds after a mine hit during which mines are ignored
    pub const MINE_GRACE_SECS: f64 = 0.5;

    /// Seconds of precision penalty after touching a wall
    pub const PRECISION_PENALTY_SECS: f64 = 3.0;
    /// Precision points per clean second
    pub const PRECISION_POINTS_PER_SEC: f64 = 10.0;

    /// Maximum local players
    pub const MAX_PLAYERS: usize = 2;
}

use glam::DVec2;

/// Center of a grid cell in maze-local pixels
#[inline]
pub fn cell_center(row: usize, col: usize, cell_size: u32) -> DVec2 {
    let cs = f64::from(cell_size);
    DVec2::new(col as f64 * cs + cs / 2.0, row as f64 * cs + cs / 2.0)
}
