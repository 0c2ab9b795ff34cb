use crate::grid::{Cell, Direction};

/// Snake body, head first. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SnakeState {
    body: Vec<Cell>,
    direction: Direction,
    // direction actually travelled on the last walk
    heading: Direction,
}

impl SnakeState {
    /// Fresh snake of length 1.
    pub fn new(head: Cell, direction: Direction) -> Self {
        Self::with_length(head, direction, 1)
    }

    /// Straight snake with its segments trailing behind `head`.
    pub fn with_length(head: Cell, direction: Direction, length: usize) -> Self {
        let back = direction.reverse();
        let mut body = Vec::with_capacity(length.max(1));
        body.push(head);
        for i in 1..length {
            body.push(body[i - 1].step(back));
        }
        Self { body, direction, heading: direction }
    }

    /// Arbitrary body for scenario setup. Falls back to a lone head at the origin if `body` is empty.
    pub fn from_body(body: Vec<Cell>, direction: Direction) -> Self {
        let body = if body.is_empty() { vec![Cell::new(0, 0)] } else { body };
        Self { body, direction, heading: direction }
    }

    pub fn head(&self) -> Cell {
        self.body[0]
    }

    pub fn tail(&self) -> Cell {
        self.body[self.body.len() - 1]
    }

    pub fn body(&self) -> &[Cell] {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.body.contains(&cell)
    }

    /// True while the tail is duplicated, i.e. a `grow` has not been walked off yet.
    pub fn growth_pending(&self) -> bool {
        let n = self.body.len();
        n > 1 && self.body[n - 1] == self.body[n - 2]
    }

    /// Sets the direction for the next walk. A reversal of either the pending
    /// direction or the last travelled one is silently ignored.
    pub fn turn(&mut self, dir: Direction) -> bool {
        if dir.is_reverse_of(self.direction) || dir.is_reverse_of(self.heading) {
            return false;
        }
        self.direction = dir;
        true
    }

    /// Every segment takes its predecessor's cell, then the head advances one cell.
    pub fn walk(&mut self) {
        for i in (1..self.body.len()).rev() {
            self.body[i] = self.body[i - 1];
        }
        self.body[0] = self.body[0].step(self.direction);
        self.heading = self.direction;
    }

    /// Appends a copy of the tail; the next walk turns it into a real trailing segment.
    pub fn grow(&mut self) {
        let tail = self.tail();
        self.body.push(tail);
    }
}
