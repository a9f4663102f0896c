use crate::error::SearchError;
use crate::point::Point;
use rustc_hash::FxHashSet;
use std::fmt;

/// Anything that can tell whether a cell may be occupied.
pub trait Grid: Sync {
    fn is_valid(&self, pos: Point) -> bool;
}

/// A rectangular grid with inclusive bounds and a fixed set of obstacles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    min: Point,
    max: Point,
    obstacles: FxHashSet<Point>,
}

impl Board {
    /// Create a board spanning `min..=max` on both axes.
    pub fn new(
        min: Point,
        max: Point,
        obstacles: impl IntoIterator<Item = Point>,
    ) -> Result<Self, SearchError> {
        if min.x > max.x || min.y > max.y {
            return Err(SearchError::InvalidBounds { min, max });
        }
        Ok(Board {
            min,
            max,
            obstacles: obstacles.into_iter().collect(),
        })
    }

    /// An obstacle-free `width` x `height` board with its origin at `(0, 0)`.
    pub fn open(width: i32, height: i32) -> Result<Self, SearchError> {
        Self::new(
            Point::new(0, 0),
            Point::new(width - 1, height - 1),
            std::iter::empty(),
        )
    }

    pub fn min(&self) -> Point {
        self.min
    }

    pub fn max(&self) -> Point {
        self.max
    }

    /// True if `pos` lies within the bounds, ignoring obstacles.
    pub fn contains(&self, pos: Point) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }

    pub fn is_obstacle(&self, pos: Point) -> bool {
        self.obstacles.contains(&pos)
    }

    /// Every valid cell in row-major order.
    pub fn free_cells(&self) -> Vec<Point> {
        let mut cells = Vec::new();
        for y in self.min.y..=self.max.y {
            for x in self.min.x..=self.max.x {
                let pos = Point::new(x, y);
                if !self.is_obstacle(pos) {
                    cells.push(pos);
                }
            }
        }
        cells
    }
}

impl Grid for Board {
    fn is_valid(&self, pos: Point) -> bool {
        self.contains(pos) && !self.is_obstacle(pos)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in self.min.y..=self.max.y {
            let mut line = String::new();
            for x in self.min.x..=self.max.x {
                line.push(if self.is_obstacle(Point::new(x, y)) { '#' } else { ' ' });
            }
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

/// A grid with extra, temporary obstacles on top of a base grid. Used to ask
/// reachability questions with the current boxes treated as walls.
pub struct LayeredGrid<'a, G: ?Sized> {
    base: &'a G,
    overlay: &'a [Point],
}

impl<'a, G: Grid + ?Sized> LayeredGrid<'a, G> {
    pub fn new(base: &'a G, overlay: &'a [Point]) -> Self {
        LayeredGrid { base, overlay }
    }
}

impl<G: Grid + ?Sized> Grid for LayeredGrid<'_, G> {
    fn is_valid(&self, pos: Point) -> bool {
        self.base.is_valid(pos) && !self.overlay.contains(&pos)
    }
}
