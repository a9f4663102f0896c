use crate::frontier::Frontier;
use crate::grid::Grid;
use crate::layout::{Layout, PusherLayout};
use crate::moves::Candidate;

/// Shared, read-only search state a rule may consult.
pub struct Context<'a, L, G> {
    pub grid: &'a G,
    pub frontier: &'a Frontier<L>,
}

impl<L, G> Clone for Context<'_, L, G> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<L, G> Copy for Context<'_, L, G> {}

/// One predicate of the validity pipeline.
///
/// Rules must not mutate shared state: in parallel mode they run on many
/// workers against the same `Context`.
pub trait Rule<L, G>: Send + Sync {
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &Context<'_, L, G>, candidate: &Candidate<'_, L>) -> bool;
}

/// An ordered conjunction of rules. Evaluation stops at the first rule that
/// fails.
pub struct Pipeline<L, G> {
    rules: Vec<Box<dyn Rule<L, G>>>,
}

impl<L, G> Pipeline<L, G> {
    pub fn new() -> Self {
        Pipeline { rules: Vec::new() }
    }

    pub fn with(mut self, rule: impl Rule<L, G> + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Name of the first rule that rejects `candidate`, or `None` if every
    /// rule accepts it.
    pub fn rejected_by(
        &self,
        ctx: &Context<'_, L, G>,
        candidate: &Candidate<'_, L>,
    ) -> Option<&'static str> {
        self.rules
            .iter()
            .find(|rule| !rule.check(ctx, candidate))
            .map(|rule| rule.name())
    }

    pub fn check(&self, ctx: &Context<'_, L, G>, candidate: &Candidate<'_, L>) -> bool {
        self.rejected_by(ctx, candidate).is_none()
    }
}

impl<L, G> Default for Pipeline<L, G> {
    fn default() -> Self {
        Self::new()
    }
}

/// Every piece of the successor lies on a valid cell.
pub struct WithinGrid;

impl<L: Layout, G: Grid> Rule<L, G> for WithinGrid {
    fn name(&self) -> &'static str {
        "within-grid"
    }

    fn check(&self, ctx: &Context<'_, L, G>, candidate: &Candidate<'_, L>) -> bool {
        candidate.result.is_valid(ctx.grid)
    }
}

/// No two pieces of the successor share a cell.
pub struct NoOverlap;

impl<L: Layout, G: Grid> Rule<L, G> for NoOverlap {
    fn name(&self) -> &'static str {
        "no-overlap"
    }

    fn check(&self, _ctx: &Context<'_, L, G>, candidate: &Candidate<'_, L>) -> bool {
        !candidate.result.is_overlapping()
    }
}

/// The successor is not already indexed (exact equality).
pub struct NotVisited;

impl<L: Layout, G: Grid> Rule<L, G> for NotVisited {
    fn name(&self) -> &'static str {
        "not-visited"
    }

    fn check(&self, ctx: &Context<'_, L, G>, candidate: &Candidate<'_, L>) -> bool {
        ctx.frontier
            .find(&candidate.result, |prior| prior == &candidate.result)
            .is_none()
    }
}

/// Nothing equivalent to the successor is already indexed. For pusher
/// layouts, a prior layout with the same boxes and a pusher reachable from
/// the new pusher counts as the same state.
pub struct NotEquivalent;

impl<L: Layout, G: Grid> Rule<L, G> for NotEquivalent {
    fn name(&self) -> &'static str {
        "not-equivalent"
    }

    fn check(&self, ctx: &Context<'_, L, G>, candidate: &Candidate<'_, L>) -> bool {
        ctx.frontier
            .find(&candidate.result, |prior| {
                candidate.result.matches(prior, ctx.grid)
            })
            .is_none()
    }
}

/// The pusher can get behind the box without walking through any box.
pub struct PusherCanReach;

impl<G: Grid> Rule<PusherLayout, G> for PusherCanReach {
    fn name(&self) -> &'static str {
        "pusher-can-reach"
    }

    fn check(
        &self,
        ctx: &Context<'_, PusherLayout, G>,
        candidate: &Candidate<'_, PusherLayout>,
    ) -> bool {
        let origin = candidate.origin;
        match origin.push_cell(candidate.spec) {
            Some(cell) => origin.pusher() == Some(cell) || origin.can_walk_to(ctx.grid, cell),
            None => false,
        }
    }
}
