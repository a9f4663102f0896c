use crate::grid::Board;
use crate::layout::{Layout, PlainLayout, PusherLayout};
use crate::point::Point;
use crate::reach::reachable_from;
use rustc_hash::FxHashSet;
use std::fmt;
use std::fs;
use std::io;

/// Error type for level parsing operations.
#[derive(Debug)]
pub enum LevelError {
    /// IO error when reading from file
    Io(io::Error),
    /// Invalid level content
    InvalidLevel(String),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Io(err) => write!(f, "IO error: {}", err),
            LevelError::InvalidLevel(msg) => write!(f, "Invalid level: {}", msg),
        }
    }
}

impl std::error::Error for LevelError {}

impl From<io::Error> for LevelError {
    fn from(err: io::Error) -> Self {
        LevelError::Io(err)
    }
}

impl From<String> for LevelError {
    fn from(err: String) -> Self {
        LevelError::InvalidLevel(err)
    }
}

/// A single puzzle: the board, where the boxes and pusher start, and the
/// cells the boxes have to end up on.
///
/// Only the floor the pusher can walk to is valid on `board`; walls and any
/// blank cells outside them are obstacles.
#[derive(Debug, Clone)]
pub struct Puzzle {
    pub board: Board,
    pub boxes: Vec<Point>,
    pub pusher: Point,
    pub goals: Vec<Point>,
    walls: FxHashSet<Point>,
}

impl Puzzle {
    /// Parse a board from text format.
    ///
    /// Characters:
    /// - `#` = Wall
    /// - ` `, `-`, `_` = Floor (empty space)
    /// - `.` = Goal (target location for boxes)
    /// - `$` = Box
    /// - `@` = Pusher
    /// - `*` = Box on goal
    /// - `+` = Pusher on goal
    pub fn from_text(text: &str) -> Result<Self, String> {
        let lines: Vec<&str> = text.lines().collect();

        if lines.is_empty() {
            return Err("Empty board".to_string());
        }

        let height = lines.len();
        let width = lines
            .iter()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        if width == 0 {
            return Err("Empty board".to_string());
        }

        let mut walls = Vec::new();
        let mut boxes = Vec::new();
        let mut goals = Vec::new();
        let mut pusher = None;

        for (y, line) in lines.iter().enumerate() {
            for (x, ch) in line.chars().enumerate() {
                let pos = Point::new(x as i32, y as i32);
                match ch {
                    '#' => walls.push(pos),
                    ' ' | '-' | '_' => {}
                    '.' => goals.push(pos),
                    '$' => boxes.push(pos),
                    '*' => {
                        boxes.push(pos);
                        goals.push(pos);
                    }
                    '@' | '+' => {
                        if pusher.is_some() {
                            return Err("Multiple pushers found".to_string());
                        }
                        pusher = Some(pos);
                        if ch == '+' {
                            goals.push(pos);
                        }
                    }
                    _ => {
                        return Err(format!(
                            "Invalid character '{}' at position ({}, {})",
                            ch, x, y
                        ));
                    }
                }
            }
        }

        let pusher = pusher.ok_or("No pusher found on board")?;

        // Validate that the number of goals matches the number of boxes
        if goals.len() != boxes.len() {
            return Err(format!(
                "Goal count ({}) does not match box count ({})",
                goals.len(),
                boxes.len()
            ));
        }

        let (min, max) = (Point::new(0, 0), Point::new(width as i32 - 1, height as i32 - 1));
        let walled =
            Board::new(min, max, walls.iter().copied()).map_err(|err| err.to_string())?;

        // Flood-fill from the pusher; everything it can't walk to is outside
        let inside = reachable_from(&walled, pusher);
        if let Some(pos) = boxes.iter().chain(&goals).find(|pos| !inside.contains(*pos)) {
            return Err(format!("Cell {} is outside the pusher's area", pos));
        }
        let outside = walled
            .free_cells()
            .into_iter()
            .filter(|pos| !inside.contains(pos));
        let board = Board::new(min, max, walls.iter().copied().chain(outside))
            .map_err(|err| err.to_string())?;

        Ok(Puzzle {
            board,
            boxes,
            pusher,
            goals,
            walls: walls.into_iter().collect(),
        })
    }

    pub fn plain_start(&self) -> PlainLayout {
        PlainLayout::new(self.boxes.iter().copied())
    }

    pub fn pusher_start(&self) -> PusherLayout {
        PusherLayout::new(self.boxes.iter().copied(), self.pusher)
    }

    /// True if every goal cell holds a box.
    pub fn is_solved<L: Layout>(&self, layout: &L) -> bool {
        let boxes: FxHashSet<Point> = layout.boxes().iter().copied().collect();
        self.goals.iter().all(|goal| boxes.contains(goal))
    }

    /// Draw the board with `layout` on it.
    pub fn render<L: Layout>(&self, layout: &L) -> String {
        let boxes: FxHashSet<Point> = layout.boxes().iter().copied().collect();
        let goals: FxHashSet<Point> = self.goals.iter().copied().collect();
        let (min, max) = (self.board.min(), self.board.max());

        let mut out = String::new();
        for y in min.y..=max.y {
            let mut line = String::new();
            for x in min.x..=max.x {
                let pos = Point::new(x, y);
                let is_goal = goals.contains(&pos);
                let ch = if layout.pusher() == Some(pos) {
                    if is_goal { '+' } else { '@' }
                } else if boxes.contains(&pos) {
                    if is_goal { '*' } else { '$' }
                } else if self.walls.contains(&pos) {
                    '#'
                } else if is_goal {
                    '.'
                } else {
                    ' '
                };
                line.push(ch);
            }
            // Trim trailing spaces to match original input format
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

/// A collection of levels in XSB format.
#[derive(Debug)]
pub struct Levels {
    levels: Vec<Puzzle>,
}

impl Levels {
    /// Parse XSB-formatted levels from a string.
    ///
    /// The XSB format uses:
    /// - Lines starting with `;` as level separators/comments
    /// - Standard Sokoban characters (#, @, $, ., *, +, space)
    /// - Empty lines between levels (optional)
    pub fn from_text(contents: &str) -> Result<Self, LevelError> {
        let mut levels = Vec::new();
        let mut current_level = String::new();

        for line in contents.lines() {
            let is_separator = line.trim_start().starts_with(';') || line.trim().is_empty();
            if is_separator {
                if !current_level.is_empty() {
                    levels.push(Puzzle::from_text(current_level.trim_end())?);
                    current_level.clear();
                }
                continue;
            }

            current_level.push_str(line);
            current_level.push('\n');
        }

        // Don't forget the last level if file doesn't end with empty line
        if !current_level.is_empty() {
            levels.push(Puzzle::from_text(current_level.trim_end())?);
        }

        Ok(Levels { levels })
    }

    /// Parse XSB-formatted levels from a text file.
    pub fn from_file(path: &str) -> Result<Self, LevelError> {
        let contents = fs::read_to_string(path)?;
        Self::from_text(&contents)
    }

    /// Get the nth level (0-indexed).
    pub fn get(&self, index: usize) -> Option<&Puzzle> {
        self.levels.get(index)
    }

    /// Get the number of levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
