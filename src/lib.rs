//! Snake with interchangeable decision agents: reflex and model-based
//! heuristics, BFS pathfinding, utility scoring and tabular Q-learning.

pub mod agent;
pub mod config;
pub mod game;
pub mod grid;
pub mod persist;
pub mod session;
pub mod snake;
pub mod train;
