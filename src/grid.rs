use ahash::AHashSet;
use serde::{Deserialize, Serialize};

/// One grid-aligned coordinate. `x` is the column, `y` the row (growing downward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn manhattan(self, other: Cell) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Canonical exploration order. Every tie-break in the crate follows it.
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn reverse(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn is_reverse_of(self, other: Direction) -> bool {
        self.reverse() == other
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Position in [`Direction::ALL`]; used as the Q-table column.
    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }
}

/// Pure geometry of the playing field. Holds no game state of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridWorld {
    pub width: i32,
    pub height: i32,
}

impl GridWorld {
    pub fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    pub fn step(&self, cell: Cell, dir: Direction) -> Cell {
        cell.step(dir)
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// True iff `cell` matches a body segment other than the head.
    ///
    /// With `exclude_tail` the last segment is skipped because it vacates its
    /// cell on the same tick the head advances. A pending growth keeps the tail
    /// duplicated at `body[len - 2]`, so that case stays occupied on its own.
    pub fn occupied(&self, cell: Cell, body: &[Cell], exclude_tail: bool) -> bool {
        let end = if exclude_tail { body.len().saturating_sub(1) } else { body.len() };
        body.get(1..end).is_some_and(|segs| segs.contains(&cell))
    }

    /// Wall or body (tail excluded): moving the head here ends the episode.
    pub fn is_lethal(&self, cell: Cell, body: &[Cell]) -> bool {
        !self.in_bounds(cell) || self.occupied(cell, body, true)
    }

    /// Number of free cells between `cell` and the nearest wall.
    pub fn wall_clearance(&self, cell: Cell) -> i32 {
        cell.x.min(cell.y).min(self.width - 1 - cell.x).min(self.height - 1 - cell.y)
    }

    pub fn area(&self) -> usize {
        (self.width.max(0) * self.height.max(0)) as usize
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Cell::new(x, y)))
    }
}

/// Hash index over body cells for searches that test membership many times per tick.
/// Unlike [`GridWorld::occupied`] the head is included.
#[derive(Debug, Clone, Default)]
pub struct Occupancy {
    cells: AHashSet<Cell>,
}

impl Occupancy {
    /// With `exclude_tail` the last segment is left out unless it is also the head.
    /// A duplicated tail (growth pending) is still indexed through its twin.
    pub fn from_body(body: &[Cell], exclude_tail: bool) -> Self {
        let mut end = body.len();
        if exclude_tail && end > 1 {
            end -= 1;
        }
        Self { cells: body[..end].iter().copied().collect() }
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cells.contains(&cell)
    }
}
