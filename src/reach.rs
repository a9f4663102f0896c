use crate::grid::Grid;
use crate::point::Point;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;

/// Returns true if `end` can be reached from `start` by unit steps over valid
/// cells of `grid`.
///
/// The search stops as soon as `end` shows up as a neighbour. `end` has to be
/// a valid cell itself, otherwise nothing can stand on it and the answer is
/// false. `start` is not checked: a query from a cell the caller already
/// occupies is allowed.
pub fn has_path<G: Grid + ?Sized>(grid: &G, start: Point, end: Point) -> bool {
    if start == end {
        return true;
    }
    if !grid.is_valid(end) {
        return false;
    }

    let mut visited = FxHashSet::default();
    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(pos) = queue.pop_front() {
        for next in pos.neighbors() {
            if next == end {
                return true;
            }
            if grid.is_valid(next) && visited.insert(next) {
                queue.push_back(next);
            }
        }
    }

    false
}

/// Flood-fill of every cell reachable from `start`, `start` included.
pub fn reachable_from<G: Grid + ?Sized>(grid: &G, start: Point) -> FxHashSet<Point> {
    let mut visited = FxHashSet::default();
    let mut stack = vec![start];
    visited.insert(start);

    while let Some(pos) = stack.pop() {
        for next in pos.neighbors() {
            if grid.is_valid(next) && visited.insert(next) {
                stack.push(next);
            }
        }
    }

    visited
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Board, LayeredGrid};
    use proptest::prelude::*;

    fn row(obstacles: &[i32]) -> Board {
        Board::new(
            Point::new(0, 0),
            Point::new(2, 0),
            obstacles.iter().map(|&x| Point::new(x, 0)),
        )
        .unwrap()
    }

    #[test]
    fn test_blocked_row() {
        let board = row(&[1]);
        assert!(!has_path(&board, Point::new(0, 0), Point::new(2, 0)));
    }

    #[test]
    fn test_open_row() {
        let board = row(&[]);
        assert!(has_path(&board, Point::new(0, 0), Point::new(2, 0)));
    }

    #[test]
    fn test_same_cell() {
        let board = row(&[]);
        assert!(has_path(&board, Point::new(1, 0), Point::new(1, 0)));
    }

    #[test]
    fn test_invalid_target_is_unreachable() {
        let board = row(&[2]);
        // (2, 0) is adjacent to (1, 0) but is an obstacle.
        assert!(!has_path(&board, Point::new(0, 0), Point::new(2, 0)));
        // Outside the bounds.
        assert!(!has_path(&board, Point::new(0, 0), Point::new(-1, 0)));
    }

    #[test]
    fn test_boxes_block_path() {
        let board = Board::open(3, 3).unwrap();
        let wall = [Point::new(1, 0), Point::new(1, 1), Point::new(1, 2)];
        let layered = LayeredGrid::new(&board, &wall);
        assert!(!has_path(&layered, Point::new(0, 0), Point::new(2, 2)));
        assert!(has_path(&board, Point::new(0, 0), Point::new(2, 2)));
    }

    #[test]
    fn test_path_around_obstacle() {
        let board = Board::new(
            Point::new(0, 0),
            Point::new(2, 2),
            [Point::new(1, 0), Point::new(1, 1)],
        )
        .unwrap();
        assert!(has_path(&board, Point::new(0, 0), Point::new(2, 0)));
    }

    #[test]
    fn test_reachable_from() {
        let board = row(&[1]);
        let region = reachable_from(&board, Point::new(0, 0));
        assert_eq!(region.len(), 1);
        assert!(region.contains(&Point::new(0, 0)));

        let board = Board::open(2, 2).unwrap();
        assert_eq!(reachable_from(&board, Point::new(0, 0)).len(), 4);
    }

    #[test]
    fn test_board_on_coordinate_limits() {
        let board = Board::new(
            Point::new(i32::MAX - 2, i32::MIN),
            Point::new(i32::MAX, i32::MIN + 1),
            [],
        )
        .unwrap();
        let corner = Point::new(i32::MAX, i32::MIN);
        assert!(has_path(&board, corner, Point::new(i32::MAX - 2, i32::MIN + 1)));
        assert_eq!(reachable_from(&board, corner).len(), 6);
    }

    proptest! {
        #[test]
        fn has_path_is_symmetric(
            mask in 0u32..(1 << 16),
            ax in 0i32..4, ay in 0i32..4,
            bx in 0i32..4, by in 0i32..4,
        ) {
            let a = Point::new(ax, ay);
            let b = Point::new(bx, by);
            let obstacles = (0..16)
                .filter(|i| mask & (1 << i) != 0)
                .map(|i| Point::new(i % 4, i / 4))
                .filter(|&p| p != a && p != b);
            let board = Board::new(Point::new(0, 0), Point::new(3, 3), obstacles).unwrap();
            prop_assert_eq!(has_path(&board, a, b), has_path(&board, b, a));
            prop_assert_eq!(
                has_path(&board, a, b),
                reachable_from(&board, a).contains(&b)
            );
        }
    }
}
