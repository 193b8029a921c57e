//! Game modes and their rules
//!
//! Each mode is a fixed record of parameters: which way the timer runs, how
//! many lives the run starts with, whether and how mines are placed, and how a
//! finished level is scored. The table is built once and handed out by
//! reference.

use std::fmt;
use std::str::FromStr;

use glam::DVec2;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::maze::MinePolicy;

/// Which way the level timer runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerDirection {
    /// Elapsed time, used for scoring
    Up,
    /// Time left; reaching zero ends the run
    Down,
}

/// Selectable game modes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GameMode {
    #[default]
    Normal,
    Minefield,
    TimeAttack,
    Elimination,
}

impl GameMode {
    pub const ALL: [GameMode; 4] = [
        GameMode::Normal,
        GameMode::Minefield,
        GameMode::TimeAttack,
        GameMode::Elimination,
    ];

    /// Stable identifier used in score records
    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Normal => "normal",
            GameMode::Minefield => "minefield",
            GameMode::TimeAttack => "timeattack",
            GameMode::Elimination => "elimination",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            GameMode::Normal => "Normal",
            GameMode::Minefield => "Minefield",
            GameMode::TimeAttack => "Time Attack",
            GameMode::Elimination => "Elimination",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            GameMode::Normal => "Classic mode with precision system",
            GameMode::Minefield => "Avoid the invisible mines!",
            GameMode::TimeAttack => "Complete as many levels as possible in 5 minutes",
            GameMode::Elimination => "Time is running out! Complete levels to gain more time",
        }
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown game mode '{0}'")]
pub struct UnknownMode(pub String);

impl FromStr for GameMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "normal" => Ok(GameMode::Normal),
            "minefield" => Ok(GameMode::Minefield),
            "timeattack" => Ok(GameMode::TimeAttack),
            "elimination" => Ok(GameMode::Elimination),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// Static rules for one mode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameModeConfig {
    pub mode: GameMode,
    pub timer_direction: TimerDirection,
    pub has_lives: bool,
    pub initial_lives: u8,
    pub mine_policy: MinePolicy,
    /// Fraction of cells that get a mine under `MinePolicy::Scattered`
    pub mine_percentage: f64,
    /// Award precision bonus points for clean navigation
    pub track_precision: bool,
    /// Roll a fresh countdown each level and a bonus on completion
    pub random_time_on_level: bool,
    pub random_time_min: u32,
    pub random_time_max: u32,
    /// Countdown length for count-down modes, in seconds
    pub initial_time: Option<f64>,
}

impl GameModeConfig {
    const BASE: GameModeConfig = GameModeConfig {
        mode: GameMode::Normal,
        timer_direction: TimerDirection::Up,
        has_lives: true,
        initial_lives: 3,
        mine_policy: MinePolicy::None,
        mine_percentage: 0.15,
        track_precision: false,
        random_time_on_level: false,
        random_time_min: 30,
        random_time_max: 80,
        initial_time: None,
    };

    /// Countdown a fresh level starts with (zero for count-up modes)
    pub fn level_start_time<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        match self.timer_direction {
            TimerDirection::Up => 0.0,
            TimerDirection::Down if self.random_time_on_level => self.roll_random_time(rng),
            TimerDirection::Down => self.initial_time.unwrap_or(60.0),
        }
    }

    /// Bonus seconds for finishing a level, if the mode grants any
    pub fn level_bonus_time<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<f64> {
        self.random_time_on_level.then(|| self.roll_random_time(rng))
    }

    /// Whole seconds in `[random_time_min, random_time_max]`
    fn roll_random_time<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let lo = self.random_time_min.min(self.random_time_max);
        let hi = self.random_time_min.max(self.random_time_max);
        f64::from(rng.random_range(lo..=hi))
    }
}

/// Rules for every mode, built once at startup
#[derive(Debug, Clone)]
pub struct ModeTable {
    configs: [GameModeConfig; 4],
}

impl Default for ModeTable {
    fn default() -> Self {
        let base = GameModeConfig::BASE;
        Self {
            configs: [
                GameModeConfig {
                    mode: GameMode::Normal,
                    track_precision: true,
                    ..base
                },
                GameModeConfig {
                    mode: GameMode::Minefield,
                    mine_policy: MinePolicy::Scattered,
                    mine_percentage: 0.15,
                    ..base
                },
                GameModeConfig {
                    mode: GameMode::TimeAttack,
                    timer_direction: TimerDirection::Down,
                    initial_time: Some(300.0),
                    ..base
                },
                GameModeConfig {
                    mode: GameMode::Elimination,
                    timer_direction: TimerDirection::Down,
                    random_time_on_level: true,
                    random_time_min: 30,
                    random_time_max: 80,
                    initial_time: Some(60.0),
                    ..base
                },
            ],
        }
    }
}

impl ModeTable {
    pub fn get(&self, mode: GameMode) -> &GameModeConfig {
        &self.configs[mode as usize]
    }
}

/// Score for finishing a level in `level_time` seconds
pub fn level_score(level: u32, level_time: f64, precision_bonus: u64) -> u64 {
    let time = level_time.max(0.1);
    (f64::from(level) * 1000.0 / time).floor() as u64 + precision_bonus
}

/// Partial credit for a player who ran out of time or lives before the goal
pub fn progress_score(start: DVec2, goal: DVec2, current: DVec2) -> u64 {
    let start_distance = start.distance(goal);
    if start_distance <= 0.0 {
        return 0;
    }
    let current_distance = current.distance(goal);
    let fraction = ((start_distance - current_distance) / start_distance).clamp(0.0, 1.0);
    (1000.0 * fraction).floor() as u64
}

/// Precision bonus: clean seconds outside the post-collision penalty window
#[derive(Debug, Clone, Default)]
pub struct PrecisionTracker {
    /// Wall hits this level
    pub wall_collisions: u32,
    /// Seconds the ball has moved without a recent wall hit
    clean_time: f64,
    /// Level clock value at which the current penalty ends
    penalty_until: f64,
}

impl PrecisionTracker {
    /// Advance by one frame. `clock` is the level time at the end of the frame.
    pub fn update(&mut self, collided: bool, clock: f64, dt: f64, penalty_secs: f64) {
        if collided {
            self.wall_collisions += 1;
            self.penalty_until = clock + penalty_secs;
        } else if clock > self.penalty_until {
            self.clean_time += dt;
        }
    }

    pub fn points(&self, points_per_sec: f64) -> u64 {
        (self.clean_time * points_per_sec + 1e-9).floor() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_mode_table() {
        let table = ModeTable::default();
        for mode in GameMode::ALL {
            assert_eq!(table.get(mode).mode, mode);
            assert_eq!(table.get(mode).initial_lives, 3);
        }

        let normal = table.get(GameMode::Normal);
        assert!(normal.track_precision);
        assert_eq!(normal.mine_policy, MinePolicy::None);
        assert_eq!(normal.timer_direction, TimerDirection::Up);

        let minefield = table.get(GameMode::Minefield);
        assert_eq!(minefield.mine_policy, MinePolicy::Scattered);
        assert_eq!(minefield.mine_percentage, 0.15);

        let time_attack = table.get(GameMode::TimeAttack);
        assert_eq!(time_attack.timer_direction, TimerDirection::Down);
        assert_eq!(time_attack.initial_time, Some(300.0));

        let elimination = table.get(GameMode::Elimination);
        assert!(elimination.random_time_on_level);
        assert_eq!((elimination.random_time_min, elimination.random_time_max), (30, 80));
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("minefield".parse::<GameMode>(), Ok(GameMode::Minefield));
        assert_eq!("Time-Attack".parse::<GameMode>(), Ok(GameMode::TimeAttack));
        assert_eq!("time_attack".parse::<GameMode>(), Ok(GameMode::TimeAttack));
        let err = "chess".parse::<GameMode>().unwrap_err();
        assert_eq!(err, UnknownMode("chess".to_string()));
        assert_eq!(err.to_string(), "unknown game mode 'chess'");
        for mode in GameMode::ALL {
            assert_eq!(mode.as_str().parse::<GameMode>(), Ok(mode));
        }
    }

    #[test]
    fn test_level_score() {
        assert_eq!(level_score(1, 10.0, 0), 100);
        assert_eq!(level_score(3, 5.0, 0), 600);
        assert_eq!(level_score(2, 3.0, 25), 666 + 25);
        // Division guard
        assert_eq!(level_score(1, 0.0, 0), 10_000);
    }

    #[test]
    fn test_progress_score() {
        let start = DVec2::new(0.0, 0.0);
        let goal = DVec2::new(100.0, 0.0);
        assert_eq!(progress_score(start, goal, start), 0);
        assert_eq!(progress_score(start, goal, DVec2::new(50.0, 0.0)), 500);
        assert_eq!(progress_score(start, goal, goal), 1000);
        // Moving away never goes negative
        assert_eq!(progress_score(start, goal, DVec2::new(-50.0, 0.0)), 0);
        assert_eq!(progress_score(goal, goal, goal), 0);
    }

    #[test]
    fn test_timer_start_values() {
        let table = ModeTable::default();
        let mut rng = Pcg32::seed_from_u64(1);
        assert_eq!(table.get(GameMode::Normal).level_start_time(&mut rng), 0.0);
        assert_eq!(table.get(GameMode::TimeAttack).level_start_time(&mut rng), 300.0);
        assert!(table.get(GameMode::Normal).level_bonus_time(&mut rng).is_none());
    }

    #[test]
    fn test_elimination_start_time_in_range() {
        let config = *ModeTable::default().get(GameMode::Elimination);
        let mut rng = Pcg32::seed_from_u64(2024);
        for _ in 0..1000 {
            let t = config.level_start_time(&mut rng);
            assert!((30.0..=80.0).contains(&t), "{} out of range", t);
            assert_eq!(t.fract(), 0.0);
            let bonus = config.level_bonus_time(&mut rng).unwrap();
            assert!((30.0..=80.0).contains(&bonus));
        }
    }

    #[test]
    fn test_precision_tracker() {
        let mut p = PrecisionTracker::default();
        let dt = 0.5;
        let mut clock = 0.0;

        // 2 clean seconds
        for _ in 0..4 {
            clock += dt;
            p.update(false, clock, dt, 3.0);
        }
        assert_eq!(p.points(10.0), 20);

        // Hit, then 3 seconds of penalty earn nothing
        clock += dt;
        p.update(true, clock, dt, 3.0);
        for _ in 0..6 {
            clock += dt;
            p.update(false, clock, dt, 3.0);
        }
        assert_eq!(p.points(10.0), 20);

        // Penalty over
        clock += dt;
        p.update(false, clock, dt, 3.0);
        assert_eq!(p.points(10.0), 25);
        assert_eq!(p.wall_collisions, 1);
    }
}
