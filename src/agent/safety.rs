use crate::grid::{Cell, Direction, GridWorld};
use crate::snake::SnakeState;

/// Moves that are neither a reversal nor an immediate wall/body hit, in canonical order.
pub fn safe_moves(snake: &SnakeState, grid: &GridWorld) -> Vec<Direction> {
    let head = snake.head();
    Direction::ALL
        .into_iter()
        .filter(|d| !d.is_reverse_of(snake.direction()))
        .filter(|&d| !grid.is_lethal(grid.step(head, d), snake.body()))
        .collect()
}

/// Free neighbours of `cell`. The current head counts as blocked, so this also
/// works for a candidate cell next to it.
pub fn escape_routes(cell: Cell, body: &[Cell], grid: &GridWorld) -> usize {
    Direction::ALL
        .into_iter()
        .map(|d| grid.step(cell, d))
        .filter(|&n| body.first() != Some(&n) && !grid.is_lethal(n, body))
        .count()
}
