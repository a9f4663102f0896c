use crate::grid::{Grid, LayeredGrid};
use crate::moves::MoveSpec;
use crate::point::Point;
use crate::reach::has_path;
use crate::rules::{NoOverlap, NotEquivalent, NotVisited, Pipeline, PusherCanReach, WithinGrid};
use smallvec::SmallVec;
use std::fmt;

pub type Boxes = SmallVec<[Point; 8]>;

/// Order-independent hash of a box multiset.
pub fn boxes_hash(boxes: &[Point]) -> u64 {
    boxes
        .iter()
        .fold(0u64, |acc, pos| acc.wrapping_add(pos.mix()))
}

/// Multiset equality of two box lists.
pub fn same_boxes(a: &[Point], b: &[Point]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if a == b {
        return true;
    }
    let mut a: Boxes = a.iter().copied().collect();
    let mut b: Boxes = b.iter().copied().collect();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

fn has_duplicates(boxes: &[Point]) -> bool {
    boxes
        .iter()
        .enumerate()
        .any(|(i, pos)| boxes[i + 1..].contains(pos))
}

/// A search state: where the boxes are, and anything else a variant tracks.
///
/// Box order is only an enumeration order. Two layouts with the same boxes
/// listed differently are the same state and hash the same.
pub trait Layout: Clone + PartialEq + fmt::Debug + fmt::Display + Send + Sync {
    fn boxes(&self) -> &[Point];

    /// Hash of the box multiset. Cached at construction.
    fn box_hash(&self) -> u64;

    fn pusher(&self) -> Option<Point> {
        None
    }

    fn box_count(&self) -> usize {
        self.boxes().len()
    }

    /// Every single-box move from this layout, legal or not.
    fn candidate_moves(&self) -> impl Iterator<Item = MoveSpec> {
        MoveSpec::all(self.box_count())
    }

    /// Materialize the layout produced by `spec`. `None` if the moved box
    /// would leave the `i32` coordinate range.
    ///
    /// Panics if `spec.box_index` is out of range.
    fn apply(&self, spec: MoveSpec) -> Option<Self>;

    fn is_overlapping(&self) -> bool;

    /// The first piece that is not on a valid cell of `grid`, if any.
    fn invalid_point<G: Grid + ?Sized>(&self, grid: &G) -> Option<Point>;

    fn is_valid<G: Grid + ?Sized>(&self, grid: &G) -> bool {
        self.invalid_point(grid).is_none()
    }

    fn same_boxes(&self, other: &Self) -> bool {
        self.box_hash() == other.box_hash() && same_boxes(self.boxes(), other.boxes())
    }

    /// True if `self` and `other` are the same search state for duplicate
    /// detection and goal tests. May be weaker than `==`.
    fn matches<G: Grid + ?Sized>(&self, other: &Self, grid: &G) -> bool;

    /// The validity rules a successor of this variant has to pass.
    fn pipeline<G: Grid>() -> Pipeline<Self, G>;
}

/// Boxes only. Any box may move in any direction as long as it stays on the
/// grid and does not land on another box.
#[derive(Debug, Clone)]
pub struct PlainLayout {
    boxes: Boxes,
    hash: u64,
}

impl PlainLayout {
    pub fn new(boxes: impl IntoIterator<Item = Point>) -> Self {
        let boxes: Boxes = boxes.into_iter().collect();
        let hash = boxes_hash(&boxes);
        PlainLayout { boxes, hash }
    }
}

impl PartialEq for PlainLayout {
    fn eq(&self, other: &Self) -> bool {
        self.same_boxes(other)
    }
}

impl Eq for PlainLayout {}

impl Layout for PlainLayout {
    fn boxes(&self) -> &[Point] {
        &self.boxes
    }

    fn box_hash(&self) -> u64 {
        self.hash
    }

    fn apply(&self, spec: MoveSpec) -> Option<Self> {
        assert!(
            spec.box_index < self.boxes.len(),
            "invalid box index: {}",
            spec.box_index
        );
        let old = self.boxes[spec.box_index];
        let new = old.step(spec.direction)?;
        let mut boxes = self.boxes.clone();
        boxes[spec.box_index] = new;
        let hash = self
            .hash
            .wrapping_sub(old.mix())
            .wrapping_add(new.mix());
        Some(PlainLayout { boxes, hash })
    }

    fn is_overlapping(&self) -> bool {
        has_duplicates(&self.boxes)
    }

    fn invalid_point<G: Grid + ?Sized>(&self, grid: &G) -> Option<Point> {
        self.boxes.iter().copied().find(|&pos| !grid.is_valid(pos))
    }

    fn matches<G: Grid + ?Sized>(&self, other: &Self, _grid: &G) -> bool {
        self == other
    }

    fn pipeline<G: Grid>() -> Pipeline<Self, G> {
        Pipeline::new()
            .with(WithinGrid)
            .with(NoOverlap)
            .with(NotVisited)
    }
}

impl fmt::Display for PlainLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "boxes [")?;
        for (i, pos) in self.boxes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", pos)?;
        }
        write!(f, "]")
    }
}

/// Boxes plus the pusher. A box only moves when the pusher walks up behind it
/// and pushes; the pusher then stands where the box was.
#[derive(Debug, Clone)]
pub struct PusherLayout {
    layout: PlainLayout,
    pusher: Point,
}

impl PusherLayout {
    pub fn new(boxes: impl IntoIterator<Item = Point>, pusher: Point) -> Self {
        PusherLayout {
            layout: PlainLayout::new(boxes),
            pusher,
        }
    }

    /// The cell the pusher has to stand on to perform `spec`.
    pub fn push_cell(&self, spec: MoveSpec) -> Option<Point> {
        self.layout.boxes[spec.box_index].step(spec.direction.reverse())
    }

    /// True if the pusher can walk from where it stands to `target` without
    /// crossing a box.
    pub fn can_walk_to<G: Grid + ?Sized>(&self, grid: &G, target: Point) -> bool {
        let layered = LayeredGrid::new(grid, self.boxes());
        has_path(&layered, self.pusher, target)
    }
}

impl PartialEq for PusherLayout {
    fn eq(&self, other: &Self) -> bool {
        self.pusher == other.pusher && self.layout == other.layout
    }
}

impl Eq for PusherLayout {}

impl Layout for PusherLayout {
    fn boxes(&self) -> &[Point] {
        self.layout.boxes()
    }

    fn box_hash(&self) -> u64 {
        self.layout.box_hash()
    }

    fn pusher(&self) -> Option<Point> {
        Some(self.pusher)
    }

    fn apply(&self, spec: MoveSpec) -> Option<Self> {
        let layout = self.layout.apply(spec)?;
        Some(PusherLayout {
            layout,
            pusher: self.layout.boxes[spec.box_index],
        })
    }

    fn is_overlapping(&self) -> bool {
        self.layout.is_overlapping() || self.layout.boxes.contains(&self.pusher)
    }

    fn invalid_point<G: Grid + ?Sized>(&self, grid: &G) -> Option<Point> {
        self.layout
            .invalid_point(grid)
            .or_else(|| (!grid.is_valid(self.pusher)).then_some(self.pusher))
    }

    /// Same boxes, and the pushers stand in the same walkable region.
    fn matches<G: Grid + ?Sized>(&self, other: &Self, grid: &G) -> bool {
        if !self.same_boxes(other) {
            return false;
        }
        self.pusher == other.pusher || other.can_walk_to(grid, self.pusher)
    }

    fn pipeline<G: Grid>() -> Pipeline<Self, G> {
        Pipeline::new()
            .with(WithinGrid)
            .with(NoOverlap)
            .with(PusherCanReach)
            .with(NotEquivalent)
    }
}

impl fmt::Display for PusherLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pusher {} {}", self.pusher, self.layout)
    }
}
