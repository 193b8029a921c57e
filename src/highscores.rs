//! High score leaderboard
//!
//! Keeps every finished record in rank order: score descending, then time
//! ascending. Stored as JSON by whoever owns the file.

use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::modes::GameMode;
use crate::sim::state::ScoreRecord;

/// Entries shown by default on the leaderboard screen
pub const DEFAULT_TOP: usize = 10;

#[derive(Debug, Error)]
pub enum LeaderboardError {
    #[error("leaderboard file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("leaderboard file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Rank order between two records
fn rank_order(a: &ScoreRecord, b: &ScoreRecord) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| a.time_seconds.total_cmp(&b.time_seconds))
}

/// High score leaderboard
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Leaderboard {
    entries: Vec<ScoreRecord>,
}

impl Leaderboard {
    /// Create empty leaderboard
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a record in rank order.
    /// Returns its rank within its mode (1-indexed).
    pub fn add(&mut self, record: ScoreRecord) -> usize {
        let pos = self
            .entries
            .iter()
            .position(|e| rank_order(&record, e) == Ordering::Less)
            .unwrap_or(self.entries.len());
        let rank = self.entries[..pos]
            .iter()
            .filter(|e| e.game_mode == record.game_mode)
            .count()
            + 1;
        log::debug!(
            "{} scored {} on level {} ({}), rank {}",
            record.player_name,
            record.score,
            record.level,
            record.game_mode,
            rank
        );
        self.entries.insert(pos, record);
        rank
    }

    /// Best records, optionally limited to one mode
    pub fn top(&self, limit: usize, mode: Option<GameMode>) -> Vec<&ScoreRecord> {
        self.entries
            .iter()
            .filter(|e| mode.is_none_or(|m| e.game_mode == m.as_str()))
            .take(limit)
            .collect()
    }

    /// Rank a score would reach among a mode's records (1-indexed), None if
    /// it would fall outside the top `limit`
    pub fn potential_rank(
        &self,
        score: u64,
        time_seconds: f64,
        mode: GameMode,
        limit: usize,
    ) -> Option<usize> {
        let probe = ScoreRecord {
            player_name: String::new(),
            level: 0,
            time_seconds,
            score,
            game_mode: mode.as_str().to_string(),
        };
        let rank = self
            .entries
            .iter()
            .filter(|e| e.game_mode == probe.game_mode)
            .take_while(|e| rank_order(&probe, e) != Ordering::Less)
            .count()
            + 1;
        (score > 0 && rank <= limit).then_some(rank)
    }

    /// Check if a score would make a mode's top `limit`
    pub fn qualifies(&self, score: u64, time_seconds: f64, mode: GameMode, limit: usize) -> bool {
        self.potential_rank(score, time_seconds, mode, limit).is_some()
    }

    /// Get the top score (if any)
    pub fn top_score(&self, mode: Option<GameMode>) -> Option<u64> {
        self.top(1, mode).first().map(|e| e.score)
    }

    pub fn to_json(&self) -> Result<String, LeaderboardError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a stored leaderboard, re-sorting in case the file was edited
    pub fn from_json(json: &str) -> Result<Self, LeaderboardError> {
        let mut board: Leaderboard = serde_json::from_str(json)?;
        board.entries.sort_by(rank_order);
        Ok(board)
    }

    /// Load from disk, starting fresh if the file is missing or unreadable
    pub fn load(path: &Path) -> Self {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(_) => {
                log::info!("No high scores found, starting fresh");
                return Self::new();
            }
        };
        match Self::from_json(&json) {
            Ok(board) => {
                log::info!("Loaded {} high scores", board.len());
                board
            }
            Err(e) => {
                log::warn!("Ignoring leaderboard at {}: {}", path.display(), e);
                Self::new()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), LeaderboardError> {
        std::fs::write(path, self.to_json()?)?;
        log::info!("High scores saved ({} entries)", self.entries.len());
        Ok(())
    }
}
