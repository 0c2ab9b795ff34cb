use crate::grid::{Cell, Direction, GridWorld, Occupancy};
use ahash::AHashSet;
use std::collections::VecDeque;

/// Bounded breadth-first flood fill: how many free cells can be reached from
/// `start`, counting `start` itself, stopping at `cap`.
///
/// The body blocks except for its tail, which will have moved by the time the
/// head gets anywhere near it. This is a room-to-manoeuvre heuristic rather
/// than an exact free-area count; the result equals `min(region, cap)`.
pub fn reachable_count(start: Cell, body: &[Cell], grid: &GridWorld, cap: usize) -> usize {
    let blocked = Occupancy::from_body(body, true);
    reachable_with(start, &blocked, grid, cap)
}

fn reachable_with(start: Cell, blocked: &Occupancy, grid: &GridWorld, cap: usize) -> usize {
    if cap == 0 || !grid.in_bounds(start) || blocked.contains(start) {
        return 0;
    }
    let mut seen = AHashSet::new();
    seen.insert(start);
    let mut queue = VecDeque::from([start]);
    let mut count = 0;
    while let Some(cell) = queue.pop_front() {
        count += 1;
        if count >= cap {
            break;
        }
        for d in Direction::ALL {
            let n = grid.step(cell, d);
            if grid.in_bounds(n) && !blocked.contains(n) && seen.insert(n) {
                queue.push_back(n);
            }
        }
    }
    count
}
