use crate::point::{ALL_DIRECTIONS, Direction};
use std::fmt;

/// A candidate transition: push box `box_index` one cell in `direction`.
///
/// This is only a description; `Layout::apply` materializes the successor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MoveSpec {
    pub box_index: usize,
    pub direction: Direction,
}

impl MoveSpec {
    pub fn new(box_index: usize, direction: Direction) -> Self {
        MoveSpec {
            box_index,
            direction,
        }
    }

    /// All `4 * box_count` moves, box index ascending, then direction order.
    pub fn all(box_count: usize) -> impl Iterator<Item = MoveSpec> {
        (0..box_count).flat_map(|box_index| {
            ALL_DIRECTIONS
                .iter()
                .map(move |&direction| MoveSpec::new(box_index, direction))
        })
    }
}

impl fmt::Display for MoveSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "box #{} {}", self.box_index + 1, self.direction)
    }
}

/// A move together with the layout it starts from and the layout it produces.
/// This is what the validity rules look at.
#[derive(Debug, Clone)]
pub struct Candidate<'a, L> {
    pub origin: &'a L,
    pub spec: MoveSpec,
    pub result: L,
}
