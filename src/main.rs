use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use sokoban_bfs::{
    Direction, Engine, EngineState, Layout, Levels, MoveSpec, Puzzle, SearchConfig, SearchMode,
    StopReason,
};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Variant {
    Plain,
    Pusher,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Parallel,
    Strict,
}

impl From<Mode> for SearchMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Parallel => SearchMode::Parallel,
            Mode::Strict => SearchMode::Strict,
        }
    }
}

/// The move that turns `prev` into `next`, if they differ by one box step.
fn describe_step<L: Layout>(prev: &L, next: &L) -> Option<MoveSpec> {
    let box_index = prev
        .boxes()
        .iter()
        .zip(next.boxes())
        .position(|(a, b)| a != b)?;
    let (from, to) = (prev.boxes()[box_index], next.boxes()[box_index]);
    let direction = match (to.x - from.x, to.y - from.y) {
        (0, -1) => Direction::Up,
        (0, 1) => Direction::Down,
        (-1, 0) => Direction::Left,
        (1, 0) => Direction::Right,
        _ => return None,
    };
    Some(MoveSpec::new(box_index, direction))
}

fn print_solution<L: Layout>(puzzle: &Puzzle, solution: &[L]) {
    let Some(first) = solution.first() else {
        return;
    };
    println!("\nStarting position:\n{}", puzzle.render(first));
    let total = solution.len() - 1;
    for (count, pair) in solution.windows(2).enumerate() {
        let step = describe_step(&pair[0], &pair[1])
            .map(|spec| spec.to_string())
            .unwrap_or_else(|| "?".to_string());
        println!(
            "Move {} ({}/{}):\n{}",
            step,
            count + 1,
            total,
            puzzle.render(&pair[1])
        );
    }
}

struct LevelStats {
    solved: bool,
    steps: usize,
    layouts: usize,
    elapsed_ms: u128,
}

struct SolveOpts {
    level_num: usize,
    config: SearchConfig,
    print_solution: bool,
    explore: bool,
}

fn solve_level_helper<L: Layout>(
    puzzle: &Puzzle,
    start: L,
    opts: SolveOpts,
) -> anyhow::Result<LevelStats> {
    let mut engine = Engine::with_config(&puzzle.board, start, opts.config)
        .with_context(|| format!("level {} has an invalid start", opts.level_num))?;

    let started = Instant::now();
    let solution = if opts.explore {
        let reason = engine.run();
        info!(level = opts.level_num, ?reason, "exploration finished");
        Vec::new()
    } else {
        engine.find_path_where(|layout| puzzle.is_solved(layout))
    };
    let elapsed_ms = started.elapsed().as_millis();
    let layouts = engine.frontier_size();

    let solved_char = match (opts.explore, solution.is_empty(), engine.state()) {
        (true, _, _) => '-',
        (false, false, _) => 'Y',
        (false, true, EngineState::Stopped(StopReason::Exhausted)) => 'X',
        (false, true, _) => 'N',
    };
    let steps = solution.len().saturating_sub(1);

    println!(
        "level: {:<3}  solved: {}  steps: {:<5}  layouts: {:<12}  elapsed: {} ms",
        opts.level_num, solved_char, steps, layouts, elapsed_ms
    );

    if opts.print_solution {
        print_solution(puzzle, &solution);
    }

    Ok(LevelStats {
        solved: !solution.is_empty(),
        steps,
        layouts,
        elapsed_ms,
    })
}

fn solve_level(puzzle: &Puzzle, opts: SolveOpts, variant: Variant) -> anyhow::Result<LevelStats> {
    match variant {
        Variant::Plain => solve_level_helper(puzzle, puzzle.plain_start(), opts),
        Variant::Pusher => solve_level_helper(puzzle, puzzle.pusher_start(), opts),
    }
}

#[derive(Parser)]
#[command(name = "sokoban-bfs")]
#[command(about = "Breadth-first box-pushing puzzle solver", long_about = None)]
struct Args {
    /// Path to the levels file (XSB format)
    #[arg(value_name = "FILE")]
    levels_file: String,

    /// Level number to solve (1-indexed), or start of range
    #[arg(value_name = "LEVEL")]
    level_start: usize,

    /// Optional end of level range (inclusive, 1-indexed)
    #[arg(value_name = "LEVEL_END")]
    level_end: Option<usize>,

    /// Puzzle variant: free-moving boxes, or boxes pushed by a pusher
    #[arg(short, long, value_enum, default_value = "pusher")]
    variant: Variant,

    /// How each BFS level is evaluated
    #[arg(short, long, value_enum, default_value = "parallel")]
    mode: Mode,

    /// Worker threads for parallel mode (defaults to one per core)
    #[arg(short, long)]
    threads: Option<usize>,

    /// Stop once this many layouts have been indexed
    #[arg(short = 'n', long)]
    max_layouts: Option<usize>,

    /// Print the solution step-by-step
    #[arg(short, long)]
    print_solution: bool,

    /// Explore every reachable layout instead of solving
    #[arg(long)]
    explore: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let args = Args::parse();

    let levels = Levels::from_file(&args.levels_file)
        .with_context(|| format!("error loading levels from {}", args.levels_file))?;

    let level_end = args.level_end.unwrap_or(args.level_start);

    if args.level_start == 0 {
        bail!("level numbers must be at least 1");
    }
    if level_end < args.level_start {
        bail!("level end must be >= level start");
    }
    if level_end > levels.len() {
        bail!(
            "level {} not found (file contains {} levels)",
            level_end,
            levels.len()
        );
    }
    let num_levels = level_end - args.level_start + 1;
    if args.print_solution && num_levels > 1 {
        bail!("solution printing only supported when solving a single level");
    }

    let mut total_solved = 0;
    let mut total_steps = 0;
    let mut total_layouts = 0;
    let mut total_time_ms = 0;

    for level_num in args.level_start..=level_end {
        let puzzle = levels
            .get(level_num - 1)
            .with_context(|| format!("level {} missing", level_num))?;
        let opts = SolveOpts {
            level_num,
            config: SearchConfig {
                mode: args.mode.into(),
                threads: args.threads,
                max_layouts: args.max_layouts,
            },
            print_solution: args.print_solution,
            explore: args.explore,
        };
        let stats = solve_level(puzzle, opts, args.variant)?;

        if stats.solved {
            total_solved += 1;
        }
        total_steps += stats.steps;
        total_layouts += stats.layouts;
        total_time_ms += stats.elapsed_ms;
    }

    if num_levels > 1 {
        println!("---");
        println!(
            "solved: {:>3}/{:<3}        steps: {:<5}  layouts: {:<12}  elapsed: {} ms",
            total_solved, num_levels, total_steps, total_layouts, total_time_ms
        );
    }

    Ok(())
}
