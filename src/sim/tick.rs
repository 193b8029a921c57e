//! Per-frame simulation tick
//!
//! Advances every ball through one rendered frame, then applies the mode's
//! rules: precision tracking, mines, the level timer and the goal.

use glam::DVec2;

use super::collision::ball_circle_overlap;
use super::modes::{TimerDirection, level_score};
use super::physics::step_frame;
use super::state::{GameEvent, GamePhase, GameState};
use crate::consts::*;

/// Input commands for a single frame
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Combined tilt + keyboard acceleration per player, roughly in [-1, 1]
    pub tilt: [DVec2; MAX_PLAYERS],
    /// Pause toggle
    pub pause: bool,
}

impl TickInput {
    /// Input for a single player
    pub fn single(tilt: DVec2) -> Self {
        let mut input = Self::default();
        input.tilt[0] = tilt;
        input
    }
}

/// Advance the game state by one frame of `dt` seconds
pub fn tick(state: &mut GameState, input: &TickInput, dt: f64) {
    if input.pause {
        state.toggle_pause();
        if state.phase == GamePhase::Paused {
            return;
        }
    }

    // Don't tick unless actively playing
    if state.phase != GamePhase::Playing {
        return;
    }

    state.level_time += dt;

    // --- PHYSICS ---
    let mut any_collision = false;
    for (i, player) in state.players.iter_mut().enumerate() {
        if player.finished {
            continue;
        }
        let collided = step_frame(&mut player.ball, input.tilt[i], dt, &state.walls, SUBSTEPS);
        if player.note_wall_contact(collided) {
            state.events.push(GameEvent::WallHit { player: i });
        }
        any_collision |= collided;
    }

    // --- PRECISION ---
    if state.config.track_precision && !state.is_multiplayer() {
        state.precision.update(
            any_collision,
            state.level_time,
            dt,
            PRECISION_PENALTY_SECS,
        );
    }

    // --- MINES ---
    if state.mine_grace > 0.0 {
        state.mine_grace = (state.mine_grace - dt).max(0.0);
    } else if check_mines(state) {
        return;
    }

    // --- TIMER ---
    match state.config.timer_direction {
        TimerDirection::Up => state.timer = state.level_time,
        TimerDirection::Down => {
            state.timer -= dt;
            if state.timer <= 0.0 {
                state.timer = 0.0;
                state.events.push(GameEvent::TimeUp);
                state.game_over();
                return;
            }
        }
    }

    // --- GOAL ---
    check_goal(state);
}

/// Trigger at most one mine this frame. Returns true if the run ended.
fn check_mines(state: &mut GameState) -> bool {
    let hit = state
        .players
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.finished)
        .find_map(|(i, p)| {
            state
                .mines
                .iter()
                .position(|m| ball_circle_overlap(p.ball.pos, m.pos, p.ball.radius + m.size))
                .map(|mine| (i, mine))
        });

    let Some((player, mine)) = hit else {
        return false;
    };

    state.mines.remove(mine);
    state.mine_grace = MINE_GRACE_SECS;
    state.events.push(GameEvent::MineHit { player });
    log::debug!("Player {} hit a mine, {} left", player + 1, state.mines.len());

    if state.config.has_lives {
        state.lives = state.lives.saturating_sub(1);
        state.events.push(GameEvent::LifeLost {
            lives_left: state.lives,
        });
        if state.lives == 0 {
            state.game_over();
            return true;
        }
    }

    let start = state.start;
    state.players[player].ball.reset_to(start);
    false
}

/// Score players who reached the goal and complete the level once all have
fn check_goal(state: &mut GameState) {
    let precision_bonus = if state.config.track_precision && !state.is_multiplayer() {
        state.precision.points(PRECISION_POINTS_PER_SEC)
    } else {
        0
    };

    for i in 0..state.players.len() {
        let player = &mut state.players[i];
        if player.finished || !ball_circle_overlap(player.ball.pos, state.goal, state.goal_radius)
        {
            continue;
        }

        let score = level_score(state.level, state.level_time, precision_bonus);
        player.finished = true;
        player.finish_time = Some(state.level_time);
        player.ball.vel = DVec2::ZERO;
        player.level_score = score;
        player.total_score += score;

        let record = state.record_for(i, state.level_time);
        state.records.push(record);
        state.events.push(GameEvent::PlayerFinished { player: i, score });
        log::info!(
            "{} finished level {} in {:.2}s for {} points",
            state.players[i].name,
            state.level,
            state.level_time,
            score
        );
    }

    if state.players.iter().all(|p| p.finished) {
        complete_level(state);
    }
}

fn complete_level(state: &mut GameState) {
    state.total_time += state.level_time;
    state.levels_completed += 1;

    if let Some(bonus) = state.config.level_bonus_time(&mut state.rng) {
        state.timer += bonus;
        state.last_bonus = Some(bonus);
        state.events.push(GameEvent::BonusTime { seconds: bonus });
        log::info!("Bonus time: +{:.0}s", bonus);
    }

    state.events.push(GameEvent::LevelComplete { level: state.level });
    state.phase = GamePhase::LevelComplete;
}
