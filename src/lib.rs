//! Breadth-first solver for box-pushing puzzles.
//!
//! Two variants share one engine: [`PlainLayout`] moves any box in any
//! direction, [`PusherLayout`] adds a pusher that has to walk behind a box
//! before it can push it.

pub mod engine;
pub mod error;
pub mod frontier;
pub mod generate;
pub mod grid;
pub mod layout;
pub mod levels;
pub mod moves;
pub mod point;
pub mod reach;
pub mod rules;

pub use engine::{Engine, EngineState, SearchConfig, SearchMode, Stats, StopReason};
pub use error::{Role, SearchError};
pub use frontier::{Frontier, NodeId};
pub use grid::{Board, Grid, LayeredGrid};
pub use layout::{Layout, PlainLayout, PusherLayout};
pub use levels::{LevelError, Levels, Puzzle};
pub use moves::{Candidate, MoveSpec};
pub use point::{ALL_DIRECTIONS, Direction, Point};
pub use reach::has_path;
pub use rules::{Context, Pipeline, Rule};
