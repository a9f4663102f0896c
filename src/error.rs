use crate::point::Point;
use std::fmt;

/// Which layout a configuration error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Start,
    Goal,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Start => write!(f, "start"),
            Role::Goal => write!(f, "goal"),
        }
    }
}

/// Configuration errors. These are raised when an engine is built or when a
/// query is made, never while a search is in progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// Two boxes (or the pusher and a box) share a cell.
    OverlappingLayout { role: Role },
    /// A box or the pusher sits outside the grid or on an obstacle.
    InvalidLayout { role: Role, point: Point },
    /// The goal does not have as many boxes as the start.
    BoxCountMismatch { expected: usize, found: usize },
    /// Grid bounds with `min > max`.
    InvalidBounds { min: Point, max: Point },
    /// Not enough free cells to place the requested layout.
    NotEnoughSpace { requested: usize, available: usize },
    /// The worker pool could not be created.
    ThreadPool(String),
}

impl fmt::Display for SearchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchError::OverlappingLayout { role } => {
                write!(f, "{} layout has overlapping pieces", role)
            }
            SearchError::InvalidLayout { role, point } => {
                write!(f, "{} layout has a piece on invalid cell {}", role, point)
            }
            SearchError::BoxCountMismatch { expected, found } => write!(
                f,
                "goal has {} boxes but the start has {}",
                found, expected
            ),
            SearchError::InvalidBounds { min, max } => {
                write!(f, "invalid grid bounds: {} .. {}", min, max)
            }
            SearchError::NotEnoughSpace {
                requested,
                available,
            } => write!(
                f,
                "cannot place {} pieces on {} free cells",
                requested, available
            ),
            SearchError::ThreadPool(msg) => write!(f, "failed to build worker pool: {}", msg),
        }
    }
}

impl std::error::Error for SearchError {}

impl From<rayon::ThreadPoolBuildError> for SearchError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        SearchError::ThreadPool(err.to_string())
    }
}
