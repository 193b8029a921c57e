//! Gravity Maze headless runner
//!
//! Plays the game without a window. The ball is steered either by an
//! autopilot that follows the shortest route to the goal, or by accelerometer
//! lines (`X:0.1g,Y:-0.2g,Z:1.0g`) piped in on stdin.

use std::io::BufRead;
use std::path::Path;
use std::time::{Duration, Instant};

use clap::Parser;
use glam::DVec2;

use gravity_maze::consts::*;
use gravity_maze::highscores::{DEFAULT_TOP, Leaderboard};
use gravity_maze::input::{KeyState, TiltFeed, combine, orient, parse_sample};
use gravity_maze::settings::Settings;
use gravity_maze::sim::{
    GameEvent, GameMode, GamePhase, GameSetup, GameState, ModeTable, TickInput, tick,
};

const SETTINGS_PATH: &str = "settings.json";
const LEADERBOARD_PATH: &str = "leaderboard.json";

/// Give up on a level after this many simulated seconds
const LEVEL_TIMEOUT_SECS: f64 = 600.0;

/// Autopilot cruise speed in pixels/s
const AUTOPILOT_SPEED: f64 = 140.0;
/// Tilt per pixel/s of velocity error
const AUTOPILOT_GAIN: f64 = 0.01;

/// Play Gravity Maze headless, steered by an autopilot or a piped accelerometer
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Game mode: normal, minefield, timeattack or elimination
    #[arg(default_value = "normal")]
    mode: GameMode,

    /// Local players sharing the maze
    #[arg(
        short,
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u8).range(1..=MAX_PLAYERS as i64)
    )]
    players: u8,

    /// Stop after this many completed levels
    #[arg(short, long, default_value_t = 3)]
    levels: u32,

    /// Run seed (defaults to the current time)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Read accelerometer lines from stdin instead of using the autopilot
    #[arg(long)]
    stdin: bool,

    /// Pace the simulation to wall-clock time
    #[arg(long)]
    realtime: bool,
}

impl Args {
    fn seed(&self) -> u64 {
        self.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0)
        })
    }
}

/// Spawn a thread forwarding accelerometer lines from stdin
fn stdin_feed(settings: &Settings) -> TiltFeed {
    let (tx, feed) = TiltFeed::channel();
    let settings = settings.clone();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_sample(&line) {
                Ok(sample) => {
                    if tx.send(orient(sample.planar(), &settings)).is_err() {
                        break;
                    }
                }
                Err(e) => log::debug!("Skipping sensor line: {}", e),
            }
        }
    });
    feed
}

/// Tilt that steers a ball along the shortest open route to the goal
fn autopilot(state: &GameState, player: usize) -> DVec2 {
    let ball = &state.players[player].ball;
    let Some(here) = state.cell_at(ball.pos) else {
        return DVec2::ZERO;
    };
    let target = state
        .maze
        .path(here, state.maze.goal())
        .and_then(|path| path.get(1).copied())
        .map(|next| state.cell_center(next))
        .unwrap_or(state.goal);

    let desired = (target - ball.pos).clamp_length_max(AUTOPILOT_SPEED);
    ((desired - ball.vel) * AUTOPILOT_GAIN).clamp(DVec2::splat(-1.0), DVec2::splat(1.0))
}

/// Fixed-timestep driver
struct Runner {
    state: GameState,
    accumulator: f64,
    feed: Option<TiltFeed>,
    keys: KeyState,
}

impl Runner {
    /// Run simulation frames for `elapsed` seconds of wall time
    fn update(&mut self, elapsed: f64) {
        self.accumulator += elapsed.min(0.1);

        let mut frames = 0;
        while self.accumulator >= FRAME_DT && frames < MAX_FRAMES_PER_UPDATE {
            let input = self.gather_input();
            tick(&mut self.state, &input, FRAME_DT);
            self.accumulator -= FRAME_DT;
            frames += 1;
        }
    }

    fn gather_input(&mut self) -> TickInput {
        let mut input = TickInput::default();
        match self.feed.as_mut() {
            Some(feed) => input.tilt[0] = combine(feed.latest(), &self.keys),
            None => {
                for player in 0..self.state.players.len() {
                    input.tilt[player] = autopilot(&self.state, player);
                }
            }
        }
        input
    }
}

fn log_event(state: &GameState, event: &GameEvent) {
    match event {
        GameEvent::WallHit { player } => log::trace!("Player {} hit a wall", player + 1),
        GameEvent::MineHit { player } => log::info!("Player {} hit a mine!", player + 1),
        GameEvent::LifeLost { lives_left } => log::info!("Lives left: {}", lives_left),
        GameEvent::PlayerFinished { player, score } => {
            log::info!("{} reached the goal (+{})", state.players[*player].name, score)
        }
        GameEvent::LevelComplete { level } => log::info!("Level {} complete", level),
        GameEvent::BonusTime { seconds } => log::info!("+{:.0}s on the clock", seconds),
        GameEvent::TimeUp => log::info!("Time's up!"),
        GameEvent::GameOver => log::info!("Game over"),
    }
}

fn main() {
    env_logger::init();

    let opts = Args::parse();
    let seed = opts.seed();

    let settings = Settings::load(Path::new(SETTINGS_PATH));
    let table = ModeTable::default();
    let setup =
        GameSetup::from_settings(&settings, *table.get(opts.mode), usize::from(opts.players));

    let state = match GameState::new(seed, &setup) {
        Ok(state) => state,
        Err(e) => {
            log::error!("Could not build the first level: {}", e);
            std::process::exit(1);
        }
    };
    log::info!(
        "Gravity Maze starting: {} (seed {})",
        opts.mode.description(),
        seed
    );

    let mut leaderboard = Leaderboard::load(Path::new(LEADERBOARD_PATH));
    let mut runner = Runner {
        state,
        accumulator: 0.0,
        feed: opts.stdin.then(|| stdin_feed(&settings)),
        keys: KeyState::default(),
    };

    let mut last = Instant::now();
    loop {
        let elapsed = if opts.realtime {
            std::thread::sleep(Duration::from_secs_f64(FRAME_DT));
            let now = Instant::now();
            let elapsed = now.duration_since(last).as_secs_f64();
            last = now;
            elapsed
        } else {
            FRAME_DT
        };
        runner.update(elapsed);

        let state = &mut runner.state;
        for event in state.drain_events() {
            log_event(state, &event);
        }
        for record in state.take_records() {
            let rank = leaderboard.add(record);
            if rank <= DEFAULT_TOP {
                log::info!("New high score, rank {}", rank);
            }
        }

        match state.phase {
            GamePhase::GameOver => break,
            GamePhase::LevelComplete if state.levels_completed >= opts.levels => break,
            GamePhase::LevelComplete => {
                if let Err(e) = state.advance_level() {
                    log::error!("Could not build level {}: {}", state.level + 1, e);
                    break;
                }
            }
            GamePhase::Playing if state.level_time > LEVEL_TIMEOUT_SECS => {
                log::warn!("Level {} timed out, giving up", state.level);
                break;
            }
            _ => {}
        }
    }

    let hud = runner.state.hud();
    println!(
        "Reached level {} in {:.1}s, scores {:?}",
        hud.level,
        runner.state.total_time + runner.state.level_time,
        hud.scores
    );
    for (i, entry) in leaderboard.top(DEFAULT_TOP, Some(opts.mode)).iter().enumerate() {
        println!(
            "{:>2}. {:<12} level {:>2}  {:>6.1}s  {:>6}",
            i + 1,
            entry.player_name,
            entry.level,
            entry.time_seconds,
            entry.score
        );
    }

    if let Err(e) = leaderboard.save(Path::new(LEADERBOARD_PATH)) {
        log::warn!("Could not save high scores: {}", e);
    }
}
