//! Maze generation
//!
//! Randomized depth-first backtracking over a rectangular grid, followed by a
//! repair pass that joins any cell the carve left unvisited. The grid is then
//! turned into deduplicated wall rectangles, mines and a goal position, all in
//! world pixels.

use std::collections::{BTreeSet, VecDeque};

use glam::DVec2;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cell_center;
use crate::consts::*;
use crate::settings::Difficulty;

/// Carve attempts before giving up on a level
pub const MAX_GENERATION_ATTEMPTS: u32 = 3;

/// Side of a cell, in the order walls are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Top = 0,
    Right = 1,
    Bottom = 2,
    Left = 3,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Right, Side::Bottom, Side::Left];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Right => Side::Left,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
        }
    }
}

/// Grid coordinate of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellPos {
    pub row: usize,
    pub col: usize,
}

impl CellPos {
    /// Where the carve always starts and where the ball spawns
    pub const ORIGIN: CellPos = CellPos { row: 0, col: 0 };

    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Chessboard distance (0 = same cell, 1 = one of the 8 neighbors)
    pub fn chebyshev(self, other: CellPos) -> usize {
        self.row.abs_diff(other.row).max(self.col.abs_diff(other.col))
    }
}

/// One grid cell. Walls are `[top, right, bottom, left]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub visited: bool,
    pub walls: [bool; 4],
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            visited: false,
            walls: [true; 4],
        }
    }
}

impl Cell {
    #[inline]
    pub fn has_wall(&self, side: Side) -> bool {
        self.walls[side.index()]
    }

    pub fn wall_count(&self) -> usize {
        self.walls.iter().filter(|&&w| w).count()
    }

    /// A dead-end has exactly one opening
    pub fn is_dead_end(&self) -> bool {
        self.wall_count() == 3
    }
}

/// Axis-aligned wall rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Wall {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Wall {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Top-left corner
    #[inline]
    pub fn top_left(&self) -> DVec2 {
        DVec2::new(f64::from(self.x), f64::from(self.y))
    }

    /// Bottom-right corner
    #[inline]
    pub fn bottom_right(&self) -> DVec2 {
        DVec2::new(
            f64::from(self.x + self.width),
            f64::from(self.y + self.height),
        )
    }
}

/// A mine sitting in the middle of a cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mine {
    /// Center in world pixels
    pub pos: DVec2,
    /// Footprint radius (the ball triggers it within `ball.radius + size`)
    pub size: f64,
    /// Animation phase in radians, cosmetic only
    pub phase: f64,
    /// Cell the mine was placed in
    pub cell: CellPos,
}

/// How a level's mines are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MinePolicy {
    #[default]
    None,
    /// Half of the dead-ends
    DeadEnds,
    /// A fraction of all cells, never two within each other's 3x3 block
    Scattered,
}

#[derive(Debug, Error)]
pub enum MazeError {
    #[error("maze area {width}x{height} cannot hold a single {cell_size}px cell")]
    AreaTooSmall {
        width: i64,
        height: i64,
        cell_size: u32,
    },
    #[error("maze still disconnected after {attempts} generation attempts")]
    Disconnected { attempts: u32 },
}

/// Rectangular grid of cells, row-major
#[derive(Debug, Clone)]
pub struct Maze {
    cols: usize,
    rows: usize,
    cell_size: u32,
    grid: Vec<Cell>,
}

impl Maze {
    /// Fully walled grid with nothing visited
    pub fn new(cols: usize, rows: usize, cell_size: u32) -> Self {
        Self {
            cols,
            rows,
            cell_size,
            grid: vec![Cell::default(); cols * rows],
        }
    }

    /// Grid filling as much of `width` x `height` pixels as whole cells allow
    pub fn with_area(width: i64, height: i64, cell_size: u32) -> Result<Self, MazeError> {
        let cs = i64::from(cell_size);
        let cols = if cs > 0 { width.max(0) / cs } else { 0 };
        let rows = if cs > 0 { height.max(0) / cs } else { 0 };
        if cols <= 0 || rows <= 0 {
            return Err(MazeError::AreaTooSmall {
                width,
                height,
                cell_size,
            });
        }
        Ok(Self::new(cols as usize, rows as usize, cell_size))
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// Pixel width of the whole grid
    pub fn width_px(&self) -> i32 {
        self.cols as i32 * self.cell_size as i32
    }

    /// Pixel height of the whole grid
    pub fn height_px(&self) -> i32 {
        self.rows as i32 * self.cell_size as i32
    }

    /// The far corner from the start
    pub fn goal(&self) -> CellPos {
        CellPos::new(self.rows - 1, self.cols - 1)
    }

    #[inline]
    fn index(&self, pos: CellPos) -> usize {
        pos.row * self.cols + pos.col
    }

    pub fn get(&self, pos: CellPos) -> Option<&Cell> {
        if pos.row < self.rows && pos.col < self.cols {
            self.grid.get(self.index(pos))
        } else {
            None
        }
    }

    /// Cell at `pos`. Panics if out of bounds.
    pub fn cell(&self, pos: CellPos) -> &Cell {
        &self.grid[self.index(pos)]
    }

    fn cell_mut(&mut self, pos: CellPos) -> &mut Cell {
        let i = self.index(pos);
        &mut self.grid[i]
    }

    pub fn positions(&self) -> impl Iterator<Item = CellPos> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| CellPos::new(row, col)))
    }

    /// Adjacent cell on `side`, if inside the grid
    pub fn neighbor(&self, pos: CellPos, side: Side) -> Option<CellPos> {
        match side {
            Side::Top if pos.row > 0 => Some(CellPos::new(pos.row - 1, pos.col)),
            Side::Right if pos.col + 1 < self.cols => Some(CellPos::new(pos.row, pos.col + 1)),
            Side::Bottom if pos.row + 1 < self.rows => Some(CellPos::new(pos.row + 1, pos.col)),
            Side::Left if pos.col > 0 => Some(CellPos::new(pos.row, pos.col - 1)),
            _ => None,
        }
    }

    fn unvisited_neighbors(&self, pos: CellPos) -> Vec<(CellPos, Side)> {
        Side::ALL
            .into_iter()
            .filter_map(|side| self.neighbor(pos, side).map(|n| (n, side)))
            .filter(|&(n, _)| !self.cell(n).visited)
            .collect()
    }

    /// Clear the wall on `side` of `pos` and the matching wall of its neighbor
    pub fn remove_wall(&mut self, pos: CellPos, side: Side) {
        let Some(other) = self.neighbor(pos, side) else {
            return;
        };
        self.cell_mut(pos).walls[side.index()] = false;
        self.cell_mut(other).walls[side.opposite().index()] = false;
    }

    /// Whether the ball can pass from `pos` through `side`
    pub fn is_open(&self, pos: CellPos, side: Side) -> bool {
        !self.cell(pos).has_wall(side) && self.neighbor(pos, side).is_some()
    }

    /// Randomized depth-first backtracker starting at `start`.
    ///
    /// Each cell shuffles its unvisited neighbors on entry and descends into
    /// them one by one, skipping any a deeper branch already reached. An
    /// explicit stack stands in for recursion so grid size never hits a
    /// call-depth limit.
    pub fn carve<R: Rng + ?Sized>(&mut self, start: CellPos, rng: &mut R) {
        let mut stack: Vec<(CellPos, Vec<(CellPos, Side)>)> = Vec::new();

        self.cell_mut(start).visited = true;
        let mut pending = self.unvisited_neighbors(start);
        pending.shuffle(rng);
        stack.push((start, pending));

        while let Some(frame) = stack.last_mut() {
            let current = frame.0;
            let Some((next, side)) = frame.1.pop() else {
                stack.pop();
                continue;
            };
            if self.cell(next).visited {
                continue;
            }

            self.remove_wall(current, side);
            self.cell_mut(next).visited = true;

            let mut pending = self.unvisited_neighbors(next);
            pending.shuffle(rng);
            stack.push((next, pending));
        }
    }

    /// Join every unvisited cell to a visited neighbor (checked up, left,
    /// down, right). Scans repeat until nothing is left unvisited. Returns how
    /// many cells were joined.
    pub fn repair_connectivity(&mut self) -> usize {
        const ORDER: [Side; 4] = [Side::Top, Side::Left, Side::Bottom, Side::Right];

        let mut repaired = 0;
        loop {
            let mut progress = false;
            let mut stranded = false;

            for pos in self.positions().collect::<Vec<_>>() {
                if self.cell(pos).visited {
                    continue;
                }
                let anchor = ORDER.into_iter().find(|&side| {
                    self.neighbor(pos, side)
                        .is_some_and(|n| self.cell(n).visited)
                });
                match anchor {
                    Some(side) => {
                        self.remove_wall(pos, side);
                        self.cell_mut(pos).visited = true;
                        repaired += 1;
                        progress = true;
                    }
                    None => stranded = true,
                }
            }

            if !stranded || !progress {
                break;
            }
        }
        repaired
    }

    /// Breadth-first reachability over open sides
    pub fn reachable_from(&self, start: CellPos) -> Vec<bool> {
        let mut seen = vec![false; self.grid.len()];
        if self.get(start).is_none() {
            return seen;
        }
        let mut queue = VecDeque::from([start]);
        seen[self.index(start)] = true;

        while let Some(pos) = queue.pop_front() {
            for side in Side::ALL {
                if !self.is_open(pos, side) {
                    continue;
                }
                if let Some(next) = self.neighbor(pos, side) {
                    let i = self.index(next);
                    if !seen[i] {
                        seen[i] = true;
                        queue.push_back(next);
                    }
                }
            }
        }
        seen
    }

    /// Every cell can be reached from the start
    pub fn is_fully_connected(&self) -> bool {
        self.reachable_from(CellPos::ORIGIN).iter().all(|&r| r)
    }

    /// Shortest open path between two cells, both ends included
    pub fn path(&self, from: CellPos, to: CellPos) -> Option<Vec<CellPos>> {
        self.get(from)?;
        self.get(to)?;

        let mut came_from: Vec<Option<CellPos>> = vec![None; self.grid.len()];
        let mut seen = vec![false; self.grid.len()];
        let mut queue = VecDeque::from([from]);
        seen[self.index(from)] = true;

        while let Some(pos) = queue.pop_front() {
            if pos == to {
                let mut path = vec![to];
                let mut cursor = to;
                while let Some(prev) = came_from[self.index(cursor)] {
                    path.push(prev);
                    cursor = prev;
                }
                path.reverse();
                return Some(path);
            }
            for side in Side::ALL {
                if !self.is_open(pos, side) {
                    continue;
                }
                if let Some(next) = self.neighbor(pos, side) {
                    let i = self.index(next);
                    if !seen[i] {
                        seen[i] = true;
                        came_from[i] = Some(pos);
                        queue.push_back(next);
                    }
                }
            }
        }
        None
    }

    /// Wall rectangles in maze-local pixels.
    ///
    /// Interior walls are seen from both cells they separate, so they go
    /// through a set first.
    pub fn walls(&self) -> Vec<Wall> {
        let cs = self.cell_size as i32;
        let t = WALL_THICKNESS;
        let mut walls = BTreeSet::new();

        for pos in self.positions() {
            let x = pos.col as i32 * cs;
            let y = pos.row as i32 * cs;
            let cell = self.cell(pos);
            if cell.has_wall(Side::Top) {
                walls.insert(Wall::new(x, y, cs, t));
            }
            if cell.has_wall(Side::Right) {
                walls.insert(Wall::new(x + cs, y, t, cs));
            }
            if cell.has_wall(Side::Bottom) {
                walls.insert(Wall::new(x, y + cs, cs, t));
            }
            if cell.has_wall(Side::Left) {
                walls.insert(Wall::new(x, y, t, cs));
            }
        }
        walls.into_iter().collect()
    }

    /// Dead-end cells other than the start and goal
    pub fn dead_ends(&self) -> Vec<CellPos> {
        let goal = self.goal();
        self.positions()
            .filter(|&p| p != CellPos::ORIGIN && p != goal)
            .filter(|&p| self.cell(p).is_dead_end())
            .collect()
    }
}

/// Cell size for a level: shrinks 4px per level down to the floor
pub fn cell_size_for(level: u32, difficulty: Difficulty) -> u32 {
    let shrink = level.saturating_sub(1).saturating_mul(CELL_SHRINK_PER_LEVEL);
    difficulty
        .base_cell_size()
        .saturating_sub(shrink)
        .max(MIN_CELL_SIZE)
}

/// Mines in half the dead-ends (at least one if any exist)
pub fn place_mines_in_dead_ends<R: Rng + ?Sized>(maze: &Maze, rng: &mut R) -> Vec<CellPos> {
    let mut dead_ends = maze.dead_ends();
    let count = (dead_ends.len() / 2).max(1).min(dead_ends.len());
    dead_ends.shuffle(rng);
    dead_ends.truncate(count);
    dead_ends
}

/// Mines spread over the grid.
///
/// Aims for `max(1, floor(cells * percentage))`. A candidate is rejected when
/// an accepted mine already sits in its 3x3 block, so the real count can be
/// lower than the target.
pub fn place_mines_scattered<R: Rng + ?Sized>(
    maze: &Maze,
    percentage: f64,
    rng: &mut R,
) -> Vec<CellPos> {
    let total = maze.len();
    let target = ((total as f64 * percentage).floor().max(0.0) as usize).max(1);
    let goal = maze.goal();

    let mut candidates: Vec<CellPos> = maze
        .positions()
        .filter(|&p| p != CellPos::ORIGIN && p != goal)
        .collect();
    candidates.shuffle(rng);

    let mut accepted: Vec<CellPos> = Vec::with_capacity(target);
    for candidate in candidates {
        if accepted.len() >= target {
            break;
        }
        if accepted.iter().all(|m| m.chebyshev(candidate) > 1) {
            accepted.push(candidate);
        }
    }
    accepted
}

/// Inputs for generating one level
#[derive(Debug, Clone, Copy)]
pub struct LevelParams {
    pub level: u32,
    /// World extent in pixels
    pub world: DVec2,
    pub difficulty: Difficulty,
    pub mine_policy: MinePolicy,
    pub mine_percentage: f64,
}

/// Everything a level needs from generation, in world pixels
#[derive(Debug, Clone)]
pub struct MazeLayout {
    pub maze: Maze,
    pub walls: Vec<Wall>,
    pub mines: Vec<Mine>,
    /// Center of the start cell
    pub start: DVec2,
    /// Center of the goal cell
    pub goal: DVec2,
    pub cell_size: u32,
    /// World position of the maze's top-left corner
    pub origin: DVec2,
}

impl MazeLayout {
    /// World-space center of a cell
    pub fn cell_center(&self, pos: CellPos) -> DVec2 {
        self.origin + cell_center(pos.row, pos.col, self.cell_size)
    }

    /// Cell containing a world-space point
    pub fn cell_at(&self, p: DVec2) -> Option<CellPos> {
        let local = (p - self.origin) / f64::from(self.cell_size);
        if local.x < 0.0 || local.y < 0.0 {
            return None;
        }
        let pos = CellPos::new(local.y as usize, local.x as usize);
        self.maze.get(pos).map(|_| pos)
    }
}

/// Generate a fully connected maze for a level
pub fn generate<R: Rng + ?Sized>(
    params: &LevelParams,
    rng: &mut R,
) -> Result<MazeLayout, MazeError> {
    let cell_size = cell_size_for(params.level, params.difficulty);
    let avail_w = params.world.x as i64 - i64::from(MAZE_MARGIN) * 2;
    let avail_h = params.world.y as i64 - i64::from(MAZE_MARGIN_TOP + MAZE_MARGIN);

    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let mut maze = Maze::with_area(avail_w, avail_h, cell_size)?;
        maze.carve(CellPos::ORIGIN, rng);

        let repaired = maze.repair_connectivity();
        if repaired > 0 {
            log::warn!("Repair pass joined {} stranded cells", repaired);
        }
        if !maze.is_fully_connected() {
            log::error!(
                "Level {} maze disconnected on attempt {}, regenerating",
                params.level,
                attempt
            );
            continue;
        }

        let origin = DVec2::new(f64::from(MAZE_MARGIN), f64::from(MAZE_MARGIN_TOP));
        let walls: Vec<Wall> = maze
            .walls()
            .into_iter()
            .map(|w| w.offset(MAZE_MARGIN, MAZE_MARGIN_TOP))
            .collect();

        let mine_cells = match params.mine_policy {
            MinePolicy::None => Vec::new(),
            MinePolicy::DeadEnds => place_mines_in_dead_ends(&maze, rng),
            MinePolicy::Scattered => place_mines_scattered(&maze, params.mine_percentage, rng),
        };
        let mines = mine_cells
            .into_iter()
            .map(|cell| Mine {
                pos: origin + cell_center(cell.row, cell.col, cell_size),
                size: MINE_SIZE,
                phase: rng.random_range(0.0..std::f64::consts::TAU),
                cell,
            })
            .collect::<Vec<_>>();

        let goal_cell = maze.goal();
        let layout = MazeLayout {
            start: origin + cell_center(0, 0, cell_size),
            goal: origin + cell_center(goal_cell.row, goal_cell.col, cell_size),
            walls,
            mines,
            cell_size,
            origin,
            maze,
        };

        log::debug!(
            "Level {}: {}x{} cells of {}px, {} walls, {} mines",
            params.level,
            layout.maze.cols(),
            layout.maze.rows(),
            cell_size,
            layout.walls.len(),
            layout.mines.len()
        );
        return Ok(layout);
    }

    Err(MazeError::Disconnected {
        attempts: MAX_GENERATION_ATTEMPTS,
    })
}
