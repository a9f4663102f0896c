use crate::error::{Role, SearchError};
use crate::frontier::{Frontier, NodeId};
use crate::grid::Grid;
use crate::layout::Layout;
use crate::moves::{Candidate, MoveSpec};
use crate::rules::{Context, Pipeline};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// How the candidates of one BFS level are evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Evaluate a level on a worker pool and merge the results at the end of
    /// the level. Duplicate checks only see layouts from earlier levels, so
    /// two equivalent successors found in the same level may both be
    /// indexed. Path lengths are unaffected.
    #[default]
    Parallel,
    /// Evaluate one candidate at a time and index it immediately. The index
    /// never holds duplicates.
    Strict,
}

#[derive(Debug, Clone, Default)]
pub struct SearchConfig {
    pub mode: SearchMode,
    /// Worker count for `SearchMode::Parallel`; `None` uses rayon's default.
    pub threads: Option<usize>,
    /// Stop between levels once at least this many layouts are indexed.
    pub max_layouts: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    GoalFound(NodeId),
    Exhausted,
    Cancelled,
    LimitReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Stopped(StopReason),
}

#[derive(Debug, Clone, Default)]
pub struct Stats {
    /// BFS levels fully expanded.
    pub levels: usize,
    pub layouts_expanded: usize,
    pub candidates_checked: usize,
    pub layouts_indexed: usize,
    pub elapsed: Duration,
}

struct Expansion<L> {
    parent: NodeId,
    accepted: Vec<L>,
    checked: usize,
}

fn expand<L: Layout, G: Grid>(
    ctx: &Context<'_, L, G>,
    pipeline: &Pipeline<L, G>,
    parent: NodeId,
) -> Expansion<L> {
    let origin = ctx.frontier.layout(parent);
    let mut accepted = Vec::new();
    let mut checked = 0;

    for spec in origin.candidate_moves() {
        checked += 1;
        let Some(result) = origin.apply(spec) else {
            trace!(%parent, %spec, "candidate leaves the coordinate range");
            continue;
        };
        let candidate = Candidate {
            origin,
            spec,
            result,
        };
        match pipeline.rejected_by(ctx, &candidate) {
            None => accepted.push(candidate.result),
            Some(rule) => trace!(%parent, %spec, rule, "candidate rejected"),
        }
    }

    Expansion {
        parent,
        accepted,
        checked,
    }
}

/// Level-by-level breadth-first search over layouts.
///
/// Every layout of depth `d` is expanded before any layout of depth `d + 1`,
/// so the first time a goal is indexed it is at its shortest depth.
pub struct Engine<'g, L, G> {
    grid: &'g G,
    pipeline: Pipeline<L, G>,
    frontier: Frontier<L>,
    root: NodeId,
    config: SearchConfig,
    pool: Option<rayon::ThreadPool>,
    state: EngineState,
    stats: Stats,
    cancel: Arc<AtomicBool>,
}

impl<'g, L: Layout, G: Grid> Engine<'g, L, G> {
    pub fn new(grid: &'g G, start: L) -> Result<Self, SearchError> {
        Self::with_config(grid, start, SearchConfig::default())
    }

    pub fn with_config(grid: &'g G, start: L, config: SearchConfig) -> Result<Self, SearchError> {
        Self::with_pipeline(grid, start, config, L::pipeline())
    }

    /// Build an engine with a custom set of validity rules.
    pub fn with_pipeline(
        grid: &'g G,
        start: L,
        config: SearchConfig,
        pipeline: Pipeline<L, G>,
    ) -> Result<Self, SearchError> {
        if let Some(point) = start.invalid_point(grid) {
            return Err(SearchError::InvalidLayout {
                role: Role::Start,
                point,
            });
        }
        if start.is_overlapping() {
            return Err(SearchError::OverlappingLayout { role: Role::Start });
        }

        let pool = match config.mode {
            SearchMode::Parallel => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(config.threads.unwrap_or(0))
                    .build()?,
            ),
            SearchMode::Strict => None,
        };

        let mut frontier = Frontier::new();
        let root = frontier.add(start, None);

        Ok(Engine {
            grid,
            pipeline,
            frontier,
            root,
            config,
            pool,
            state: EngineState::Idle,
            stats: Stats {
                layouts_indexed: 1,
                ..Stats::default()
            },
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn start(&self) -> &L {
        self.frontier.layout(self.root)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn frontier(&self) -> &Frontier<L> {
        &self.frontier
    }

    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    /// Setting the returned flag stops the search before the next level.
    pub fn cancel_token(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Explore every reachable layout.
    pub fn run(&mut self) -> StopReason {
        self.search(None)
    }

    /// Search until a layout satisfying `goal` is indexed. Layouts indexed by
    /// earlier queries are checked first.
    pub fn run_until(&mut self, goal: impl Fn(&L) -> bool) -> Option<NodeId> {
        if let Some((id, _)) = self.frontier.iter().find(|&(_, layout)| goal(layout)) {
            return Some(id);
        }
        let goal: &dyn Fn(&L) -> bool = &goal;
        match self.search(Some(goal)) {
            StopReason::GoalFound(id) => Some(id),
            _ => None,
        }
    }

    pub fn has_path(&mut self, end: &L) -> Result<bool, SearchError> {
        Ok(self.locate(end)?.is_some())
    }

    /// Shortest sequence of layouts from the start to `end`, both included.
    /// Empty if `end` cannot be reached.
    pub fn find_path(&mut self, end: &L) -> Result<Vec<L>, SearchError> {
        Ok(self
            .locate(end)?
            .map(|id| self.path_to(id))
            .unwrap_or_default())
    }

    /// Shortest sequence of layouts from the start to the first layout
    /// satisfying `goal`. Empty if there is none.
    pub fn find_path_where(&mut self, goal: impl Fn(&L) -> bool) -> Vec<L> {
        self.run_until(goal)
            .map(|id| self.path_to(id))
            .unwrap_or_default()
    }

    pub fn path_to(&self, id: NodeId) -> Vec<L> {
        self.frontier.path_to(id).into_iter().cloned().collect()
    }

    fn check_goal(&self, end: &L) -> Result<(), SearchError> {
        let expected = self.start().box_count();
        if end.box_count() != expected {
            return Err(SearchError::BoxCountMismatch {
                expected,
                found: end.box_count(),
            });
        }
        if let Some(point) = end.invalid_point(self.grid) {
            return Err(SearchError::InvalidLayout {
                role: Role::Goal,
                point,
            });
        }
        if end.is_overlapping() {
            return Err(SearchError::OverlappingLayout { role: Role::Goal });
        }
        Ok(())
    }

    fn locate(&mut self, end: &L) -> Result<Option<NodeId>, SearchError> {
        self.check_goal(end)?;
        let grid = self.grid;
        if let Some(id) = self.frontier.find(end, |prior| prior.matches(end, grid)) {
            return Ok(Some(id));
        }
        let goal: &dyn Fn(&L) -> bool = &|layout: &L| layout.matches(end, grid);
        match self.search(Some(goal)) {
            StopReason::GoalFound(id) => Ok(Some(id)),
            _ => Ok(None),
        }
    }

    fn search(&mut self, goal: Option<&dyn Fn(&L) -> bool>) -> StopReason {
        if let EngineState::Stopped(StopReason::Exhausted) = self.state {
            return StopReason::Exhausted;
        }
        self.state = EngineState::Running;
        let started = Instant::now();

        let reason = loop {
            if self.cancel.load(Ordering::Relaxed) {
                break StopReason::Cancelled;
            }
            if self
                .config
                .max_layouts
                .is_some_and(|max| self.frontier.len() >= max)
            {
                break StopReason::LimitReached;
            }

            let level: Vec<NodeId> = std::iter::from_fn(|| self.frontier.next()).collect();
            if level.is_empty() {
                break StopReason::Exhausted;
            }

            let before = self.frontier.len();
            let found = match self.config.mode {
                SearchMode::Parallel => self.expand_parallel(&level, goal),
                SearchMode::Strict => self.expand_strict(&level, goal),
            };
            self.stats.levels += 1;
            self.stats.layouts_expanded += level.len();
            self.stats.layouts_indexed = self.frontier.len();
            debug!(
                level = self.stats.levels,
                expanded = level.len(),
                inserted = self.frontier.len() - before,
                indexed = self.frontier.len(),
                "level complete"
            );

            if let Some(id) = found {
                break StopReason::GoalFound(id);
            }
        };

        self.stats.elapsed += started.elapsed();
        self.state = EngineState::Stopped(reason);
        info!(
            ?reason,
            levels = self.stats.levels,
            indexed = self.frontier.len(),
            "search stopped"
        );
        reason
    }

    /// Evaluate the whole level against the index as it stood before the
    /// level, then merge every worker's successors.
    fn expand_parallel(
        &mut self,
        level: &[NodeId],
        goal: Option<&dyn Fn(&L) -> bool>,
    ) -> Option<NodeId> {
        let ctx = Context {
            grid: self.grid,
            frontier: &self.frontier,
        };
        let pipeline = &self.pipeline;
        let expand_all = || {
            level
                .par_iter()
                .map(|&id| expand(&ctx, pipeline, id))
                .collect::<Vec<_>>()
        };
        let expansions = match &self.pool {
            Some(pool) => pool.install(expand_all),
            None => expand_all(),
        };

        let mut found = None;
        for expansion in expansions {
            self.stats.candidates_checked += expansion.checked;
            for layout in expansion.accepted {
                let id = self.frontier.add(layout, Some(expansion.parent));
                if found.is_none() && goal.is_some_and(|goal| goal(self.frontier.layout(id))) {
                    found = Some(id);
                }
            }
        }
        found
    }

    /// Evaluate candidates one at a time, indexing each accepted successor
    /// before the next candidate is checked.
    fn expand_strict(
        &mut self,
        level: &[NodeId],
        goal: Option<&dyn Fn(&L) -> bool>,
    ) -> Option<NodeId> {
        let mut found = None;
        for &parent in level {
            let specs: Vec<MoveSpec> = self.frontier.layout(parent).candidate_moves().collect();
            for spec in specs {
                self.stats.candidates_checked += 1;
                let accepted = {
                    let ctx = Context {
                        grid: self.grid,
                        frontier: &self.frontier,
                    };
                    let origin = self.frontier.layout(parent);
                    let Some(result) = origin.apply(spec) else {
                        trace!(%parent, %spec, "candidate leaves the coordinate range");
                        continue;
                    };
                    let candidate = Candidate {
                        origin,
                        spec,
                        result,
                    };
                    match self.pipeline.rejected_by(&ctx, &candidate) {
                        None => Some(candidate.result),
                        Some(rule) => {
                            trace!(%parent, %spec, rule, "candidate rejected");
                            None
                        }
                    }
                };
                if let Some(layout) = accepted {
                    let id = self.frontier.add(layout, Some(parent));
                    if found.is_none() && goal.is_some_and(|goal| goal(self.frontier.layout(id))) {
                        found = Some(id);
                    }
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Board;
    use crate::layout::{PlainLayout, PusherLayout};
    use crate::point::Point;
    use crate::rules::{NoOverlap, WithinGrid};

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    fn strict() -> SearchConfig {
        SearchConfig {
            mode: SearchMode::Strict,
            ..SearchConfig::default()
        }
    }

    #[test]
    fn test_single_box_corner_to_corner() {
        let board = Board::open(3, 3).unwrap();
        let mut engine = Engine::new(&board, PlainLayout::new([p(0, 0)])).unwrap();
        let path = engine.find_path(&PlainLayout::new([p(2, 2)])).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], PlainLayout::new([p(0, 0)]));
        assert_eq!(path[4], PlainLayout::new([p(2, 2)]));
        assert!(matches!(engine.state(), EngineState::Stopped(StopReason::GoalFound(_))));
    }

    #[test]
    fn test_path_steps_are_single_moves() {
        let board = Board::open(4, 3).unwrap();
        let mut engine = Engine::new(&board, PlainLayout::new([p(0, 0), p(3, 2)])).unwrap();
        let path = engine
            .find_path(&PlainLayout::new([p(3, 0), p(0, 2)]))
            .unwrap();
        // Each box drops to the nearer goal cell: two moves apiece.
        assert_eq!(path.len(), 5);
        for pair in path.windows(2) {
            let moved: i32 = pair[0]
                .boxes()
                .iter()
                .zip(pair[1].boxes())
                .map(|(a, b)| (a.x - b.x).abs() + (a.y - b.y).abs())
                .sum();
            assert_eq!(moved, 1);
        }
    }

    #[test]
    fn test_start_is_goal() {
        let board = Board::open(2, 2).unwrap();
        let mut engine = Engine::new(&board, PlainLayout::new([p(1, 1)])).unwrap();
        let path = engine.find_path(&PlainLayout::new([p(1, 1)])).unwrap();
        assert_eq!(path, vec![PlainLayout::new([p(1, 1)])]);
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn test_unreachable_goal() {
        // The obstacle splits the row.
        let board = Board::new(p(0, 0), p(2, 0), [p(1, 0)]).unwrap();
        let mut engine = Engine::new(&board, PlainLayout::new([p(0, 0)])).unwrap();
        assert!(engine.find_path(&PlainLayout::new([p(2, 0)])).unwrap().is_empty());
        assert!(!engine.has_path(&PlainLayout::new([p(2, 0)])).unwrap());
        assert_eq!(engine.state(), EngineState::Stopped(StopReason::Exhausted));
        assert_eq!(engine.frontier_size(), 1);
    }

    #[test]
    fn test_invalid_start_rejected() {
        let board = Board::open(2, 2).unwrap();
        let overlapping = Engine::new(&board, PlainLayout::new([p(1, 1), p(1, 1)]));
        assert!(matches!(
            overlapping,
            Err(SearchError::OverlappingLayout { role: Role::Start })
        ));
        let outside = Engine::new(&board, PlainLayout::new([p(5, 5)]));
        assert!(matches!(
            outside,
            Err(SearchError::InvalidLayout {
                role: Role::Start,
                ..
            })
        ));
        let pusher_on_box = Engine::new(&board, PusherLayout::new([p(0, 0)], p(0, 0)));
        assert!(pusher_on_box.is_err());
    }

    #[test]
    fn test_invalid_goal_rejected() {
        let board = Board::open(3, 3).unwrap();
        let mut engine = Engine::new(&board, PlainLayout::new([p(0, 0), p(1, 0)])).unwrap();
        assert_eq!(
            engine.find_path(&PlainLayout::new([p(2, 2)])),
            Err(SearchError::BoxCountMismatch {
                expected: 2,
                found: 1
            })
        );
        assert!(matches!(
            engine.find_path(&PlainLayout::new([p(2, 2), p(2, 2)])),
            Err(SearchError::OverlappingLayout { role: Role::Goal })
        ));
        assert!(matches!(
            engine.has_path(&PlainLayout::new([p(2, 2), p(3, 2)])),
            Err(SearchError::InvalidLayout {
                role: Role::Goal,
                ..
            })
        ));
        // Nothing was searched.
        assert_eq!(engine.state(), EngineState::Idle);
    }

    #[test]
    fn test_run_explores_everything() {
        let board = Board::open(3, 3).unwrap();
        let mut engine =
            Engine::with_config(&board, PlainLayout::new([p(0, 0), p(1, 0)]), strict()).unwrap();
        assert_eq!(engine.run(), StopReason::Exhausted);
        // Two indistinguishable boxes on nine cells.
        assert_eq!(engine.frontier_size(), 36);
        assert_eq!(engine.stats().layouts_expanded, 36);
        assert_eq!(engine.stats().candidates_checked, 36 * 8);
    }

    #[test]
    fn test_strict_index_has_no_duplicates() {
        let board = Board::open(3, 3).unwrap();
        let mut engine =
            Engine::with_config(&board, PusherLayout::new([p(1, 1)], p(0, 0)), strict()).unwrap();
        engine.run();
        let frontier = engine.frontier();
        for (id, layout) in frontier.iter() {
            let equivalent = frontier
                .find_equal_or_equivalent(layout, |prior| prior.matches(layout, &board))
                .count();
            assert_eq!(equivalent, 1, "{} {} has an equivalent twin", id, layout);
        }
    }

    #[test]
    fn test_parallel_level_can_index_siblings_twice() {
        // (1, 0) and (0, 1) both reach (1, 1) in the same level. Parallel
        // mode checks each against the index as it stood before the level.
        let board = Board::open(3, 3).unwrap();
        let start = PlainLayout::new([p(0, 0)]);
        let center = PlainLayout::new([p(1, 1)]);

        let config = SearchConfig {
            threads: Some(2),
            ..SearchConfig::default()
        };
        let mut parallel = Engine::with_config(&board, start.clone(), config).unwrap();
        parallel.run();
        let twins = parallel
            .frontier()
            .find_equal_or_equivalent(&center, |prior| prior == &center)
            .count();
        assert_eq!(twins, 2);
        assert!(parallel.frontier_size() > 9);

        let mut strict = Engine::with_config(&board, start, strict()).unwrap();
        strict.run();
        let twins = strict
            .frontier()
            .find_equal_or_equivalent(&center, |prior| prior == &center)
            .count();
        assert_eq!(twins, 1);
        assert_eq!(strict.frontier_size(), 9);
    }

    #[test]
    fn test_board_at_coordinate_limit() {
        let board = Board::new(p(i32::MAX - 2, 0), p(i32::MAX, 0), []).unwrap();
        let mut engine = Engine::new(&board, PlainLayout::new([p(i32::MAX, 0)])).unwrap();
        let path = engine
            .find_path(&PlainLayout::new([p(i32::MAX - 2, 0)]))
            .unwrap();
        assert_eq!(path.len(), 3);

        let mut engine =
            Engine::new(&board, PusherLayout::new([p(i32::MAX - 1, 0)], p(i32::MAX, 0))).unwrap();
        assert_eq!(engine.run(), StopReason::Exhausted);
        assert_eq!(engine.frontier_size(), 2);
    }

    #[test]
    fn test_parent_links_follow_levels() {
        let board = Board::open(3, 3).unwrap();
        let mut engine = Engine::new(&board, PlainLayout::new([p(1, 1), p(0, 0)])).unwrap();
        engine.run();
        let frontier = engine.frontier();
        for (id, _) in frontier.iter().skip(1) {
            let parent = frontier.parent(id).unwrap();
            assert_eq!(frontier.depth(id), frontier.depth(parent) + 1);
            assert!(frontier.children(parent).contains(&id));
        }
    }

    #[test]
    fn test_resume_after_goal() {
        let board = Board::open(4, 1).unwrap();
        let mut engine =
            Engine::with_config(&board, PlainLayout::new([p(0, 0)]), strict()).unwrap();
        assert_eq!(engine.find_path(&PlainLayout::new([p(1, 0)])).unwrap().len(), 2);
        assert_eq!(engine.find_path(&PlainLayout::new([p(3, 0)])).unwrap().len(), 4);
        // Already indexed: answered without searching further.
        let levels = engine.stats().levels;
        assert!(engine.has_path(&PlainLayout::new([p(2, 0)])).unwrap());
        assert_eq!(engine.stats().levels, levels);
    }

    #[test]
    fn test_find_path_where() {
        let board = Board::open(3, 3).unwrap();
        let mut engine = Engine::new(&board, PlainLayout::new([p(0, 0)])).unwrap();
        let path = engine.find_path_where(|layout| layout.boxes()[0].x == 2);
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn test_cancel_before_search() {
        let board = Board::open(5, 5).unwrap();
        let mut engine = Engine::new(&board, PlainLayout::new([p(0, 0)])).unwrap();
        engine.cancel_token().store(true, Ordering::Relaxed);
        assert!(!engine.has_path(&PlainLayout::new([p(4, 4)])).unwrap());
        assert_eq!(engine.state(), EngineState::Stopped(StopReason::Cancelled));
        assert_eq!(engine.frontier_size(), 1);
    }

    #[test]
    fn test_layout_limit() {
        let board = Board::open(5, 5).unwrap();
        let config = SearchConfig {
            max_layouts: Some(3),
            ..strict()
        };
        let mut engine = Engine::with_config(&board, PlainLayout::new([p(0, 0)]), config).unwrap();
        assert_eq!(engine.run(), StopReason::LimitReached);
        // Level 1 adds (1, 0) and (0, 1); the limit is checked between levels.
        assert_eq!(engine.frontier_size(), 3);
    }

    #[test]
    fn test_custom_pipeline_without_dedup() {
        // Without duplicate detection the search still finds the shortest path.
        let board = Board::open(3, 1).unwrap();
        let pipeline = Pipeline::new().with(WithinGrid).with(NoOverlap);
        let mut engine = Engine::with_pipeline(
            &board,
            PlainLayout::new([p(0, 0)]),
            strict(),
            pipeline,
        )
        .unwrap();
        assert_eq!(engine.find_path(&PlainLayout::new([p(2, 0)])).unwrap().len(), 3);
    }

    #[test]
    fn test_pusher_simple_push() {
        // Row: pusher, box, free, free. Two pushes to the right.
        let board = Board::open(4, 1).unwrap();
        let mut engine = Engine::new(&board, PusherLayout::new([p(1, 0)], p(0, 0))).unwrap();
        let path = engine.find_path(&PusherLayout::new([p(3, 0)], p(2, 0))).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[2].pusher(), Some(p(2, 0)));
    }

    #[test]
    fn test_pusher_cannot_pull() {
        // The box is against the left edge; it can never move back.
        let board = Board::open(4, 1).unwrap();
        let mut engine = Engine::new(&board, PusherLayout::new([p(1, 0)], p(0, 0))).unwrap();
        assert!(!engine.has_path(&PusherLayout::new([p(0, 0)], p(1, 0))).unwrap());
    }

    #[test]
    fn test_pusher_goal_matches_any_reachable_pusher() {
        let board = Board::open(3, 3).unwrap();
        let mut engine =
            Engine::with_config(&board, PusherLayout::new([p(1, 1)], p(0, 0)), strict()).unwrap();
        // Same box, pusher elsewhere in the same region: no push needed.
        let path = engine.find_path(&PusherLayout::new([p(1, 1)], p(2, 2))).unwrap();
        assert_eq!(path.len(), 1);
    }

    #[test]
    fn test_parallel_and_strict_agree() {
        let board = Board::new(p(0, 0), p(4, 3), [p(2, 1), p(2, 2)]).unwrap();
        let start = PusherLayout::new([p(1, 1), p(3, 2)], p(0, 0));
        let goal = PusherLayout::new([p(1, 2), p(3, 1)], p(4, 3));

        let mut strict_engine = Engine::with_config(&board, start.clone(), strict()).unwrap();
        let strict_len = strict_engine.find_path(&goal).unwrap().len();

        for threads in [1, 2, 4] {
            let config = SearchConfig {
                threads: Some(threads),
                ..SearchConfig::default()
            };
            let mut engine = Engine::with_config(&board, start.clone(), config).unwrap();
            assert_eq!(engine.find_path(&goal).unwrap().len(), strict_len);
        }
    }
}
