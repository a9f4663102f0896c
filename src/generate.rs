use crate::error::SearchError;
use crate::grid::Board;
use crate::layout::{PlainLayout, PusherLayout};
use crate::point::Point;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

fn pick_cells(board: &Board, count: usize, seed: u64) -> Result<Vec<Point>, SearchError> {
    let mut cells = board.free_cells();
    if cells.len() < count {
        return Err(SearchError::NotEnoughSpace {
            requested: count,
            available: cells.len(),
        });
    }
    // Use a seeded PRNG so the same seed always gives the same layout
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (picked, _) = cells.partial_shuffle(&mut rng, count);
    Ok(picked.to_vec())
}

/// `boxes` boxes on distinct random free cells of `board`.
pub fn random_layout(board: &Board, boxes: usize, seed: u64) -> Result<PlainLayout, SearchError> {
    Ok(PlainLayout::new(pick_cells(board, boxes, seed)?))
}

/// Like `random_layout`, plus a pusher on another free cell.
pub fn random_pusher_layout(
    board: &Board,
    boxes: usize,
    seed: u64,
) -> Result<PusherLayout, SearchError> {
    let mut cells = pick_cells(board, boxes + 1, seed)?;
    let pusher = cells.pop().ok_or(SearchError::NotEnoughSpace {
        requested: boxes + 1,
        available: 0,
    })?;
    Ok(PusherLayout::new(cells, pusher))
}
