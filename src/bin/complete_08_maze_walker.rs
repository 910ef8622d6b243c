//! Right-hand maze walker
//!
//! Reads a text maze where `#` marks the walkable path and one of `^ > v <`
//! marks the starting cell and heading, then prints the moves taken by a
//! walker that prefers going straight, then right, then left.
//!
//! Run with: cargo run --bin complete_08_maze_walker -- maze.txt

use anyhow::Context;
use clap::Parser;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, trace};
use tracing_subscriber::EnvFilter;

// =============================================================================
// Milestone 1: Headings and moves
// =============================================================================

/// Compass heading of the walker, ordered clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    North,
    East,
    South,
    West,
}

impl Heading {
    pub fn from_glyph(glyph: u8) -> Option<Self> {
        match glyph {
            b'^' => Some(Heading::North),
            b'>' => Some(Heading::East),
            b'v' => Some(Heading::South),
            b'<' => Some(Heading::West),
            _ => None,
        }
    }

    pub fn turn_right(self) -> Self {
        match self {
            Heading::North => Heading::East,
            Heading::East => Heading::South,
            Heading::South => Heading::West,
            Heading::West => Heading::North,
        }
    }

    pub fn turn_left(self) -> Self {
        match self {
            Heading::North => Heading::West,
            Heading::West => Heading::South,
            Heading::South => Heading::East,
            Heading::East => Heading::North,
        }
    }
}

/// A single move taken by the walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Forward,
    RightThenForward,
    LeftThenForward,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Move::Forward => "Step forward",
            Move::RightThenForward => "Turn right and step forward",
            Move::LeftThenForward => "Turn left and step forward",
        };
        f.write_str(text)
    }
}

pub const COMPLETION_LINE: &str = "You're free!";

// =============================================================================
// Milestone 2: Loading and validating the grid
// =============================================================================

const PATH: u8 = b'#';
const OPEN: u8 = b'.';
const NEWLINE: u8 = b'\n';

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("Row {row} has {found} columns. It should have {expected}.")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("File contains extraneous symbol {symbol:?} at row {row}, column {column}")]
    ExtraneousSymbol {
        symbol: char,
        row: usize,
        column: usize,
    },

    #[error("Maze has no starting position (expected one of ^ > v <)")]
    MissingStart,

    #[error("Maze has a second starting position at row {row}, column {column}")]
    MultipleStarts { row: usize, column: usize },
}

impl GridError {
    pub fn ragged_row(row: usize, found: usize, expected: usize) -> Self {
        Self::RaggedRow {
            row,
            found,
            expected,
        }
    }

    pub fn extraneous_symbol(symbol: u8, row: usize, column: usize) -> Self {
        Self::ExtraneousSymbol {
            symbol: symbol as char,
            row,
            column,
        }
    }
}

/// Maze stored as the raw file bytes. Rows keep their newline, so moving one
/// row up or down is a jump of `stride = columns + 1` bytes.
#[derive(Debug, Clone)]
pub struct Grid {
    cells: Vec<u8>,
    stride: usize,
    start: usize,
    heading: Heading,
}

impl Grid {
    /// Validate the raw bytes in a single pass and locate the start marker.
    pub fn parse(cells: Vec<u8>) -> Result<Self, GridError> {
        let mut expected_width: Option<usize> = None;
        let mut width = 0;
        let mut row = 1;
        let mut start: Option<(usize, Heading)> = None;

        for (offset, &byte) in cells.iter().enumerate() {
            if byte == NEWLINE {
                check_width(row, width, &mut expected_width)?;
                row += 1;
                width = 0;
                continue;
            }

            width += 1;
            match byte {
                PATH | OPEN => {}
                glyph => {
                    let Some(heading) = Heading::from_glyph(glyph) else {
                        return Err(GridError::extraneous_symbol(glyph, row, width));
                    };
                    if start.is_some() {
                        return Err(GridError::MultipleStarts { row, column: width });
                    }
                    start = Some((offset, heading));
                }
            }
        }

        // Final row without a trailing newline.
        if width > 0 {
            check_width(row, width, &mut expected_width)?;
        }

        let (start, heading) = start.ok_or(GridError::MissingStart)?;
        let stride = expected_width.unwrap_or(0) + 1;

        Ok(Grid {
            cells,
            stride,
            start,
            heading,
        })
    }

    /// Size of the raw maze, newlines included.
    pub fn byte_len(&self) -> usize {
        self.cells.len()
    }

    pub fn columns(&self) -> usize {
        self.stride - 1
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn is_path(&self, offset: usize) -> bool {
        self.cells.get(offset) == Some(&PATH)
    }

    /// Offset of the adjacent cell in `heading`, if it lies inside the buffer.
    /// East and west are not clipped at row edges; the newline byte between
    /// rows is never a path cell.
    pub fn neighbor(&self, offset: usize, heading: Heading) -> Option<usize> {
        let next = match heading {
            Heading::North => offset.checked_sub(self.stride)?,
            Heading::East => offset + 1,
            Heading::South => offset + self.stride,
            Heading::West => offset.checked_sub(1)?,
        };
        (next < self.cells.len()).then_some(next)
    }
}

fn check_width(row: usize, width: usize, expected: &mut Option<usize>) -> Result<(), GridError> {
    match *expected {
        None => {
            *expected = Some(width);
            Ok(())
        }
        Some(columns) if columns == width => Ok(()),
        Some(columns) => Err(GridError::ragged_row(row, width, columns)),
    }
}

// =============================================================================
// Milestone 3: Walking the maze
// =============================================================================

pub struct Walker<'a> {
    grid: &'a Grid,
    position: usize,
    heading: Heading,
}

impl<'a> Walker<'a> {
    pub fn new(grid: &'a Grid) -> Self {
        Walker {
            grid,
            position: grid.start(),
            heading: grid.heading(),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    /// Apply one round of the straight/right/left rule. Returns `None` when
    /// no neighbouring path cell exists; the walker then stays put.
    pub fn step(&mut self) -> Option<Move> {
        let candidates = [
            (self.heading, Move::Forward),
            (self.heading.turn_right(), Move::RightThenForward),
            (self.heading.turn_left(), Move::LeftThenForward),
        ];

        for (heading, taken) in candidates {
            if let Some(next) = self.grid.neighbor(self.position, heading) {
                if self.grid.is_path(next) {
                    self.position = next;
                    self.heading = heading;
                    return Some(taken);
                }
            }
        }
        None
    }
}

/// Walk the grid for as many rounds as the maze has bytes, writing each move
/// and then the completion line to `out`. Returns the number of moves taken.
pub fn traverse<W: Write>(grid: &Grid, out: &mut W) -> io::Result<usize> {
    let mut walker = Walker::new(grid);
    let mut moves = 0;

    for round in 0..grid.byte_len() {
        let Some(taken) = walker.step() else {
            continue;
        };
        trace!(
            round,
            position = walker.position(),
            heading = ?walker.heading(),
            "{}",
            taken
        );
        writeln!(out, "{}", taken)?;
        moves += 1;
    }

    writeln!(out, "{}", COMPLETION_LINE)?;
    debug!(moves, rounds = grid.byte_len(), "traversal finished");
    Ok(moves)
}

// =============================================================================
// Command line
// =============================================================================

/// Walk a text maze, printing every move until the walker is free
#[derive(Parser, Debug)]
#[command(name = "complete_08_maze_walker", version)]
struct Cli {
    /// Enable verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Maze file: rows of `#` and `.` with one of `^ > v <` as the start
    maze: PathBuf,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(verbose >= 2)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let bytes = fs::read(&cli.maze)
        .with_context(|| format!("failed to read maze file {}", cli.maze.display()))?;
    let grid = Grid::parse(bytes)?;
    info!(
        columns = grid.columns(),
        start = grid.start(),
        heading = ?grid.heading(),
        "loaded maze {}",
        cli.maze.display()
    );

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    traverse(&grid, &mut out)?;
    out.flush()?;
    Ok(())
}

fn main() {
    let cli = Cli::try_parse().unwrap_or_else(|err| {
        let code = if err.use_stderr() { 1 } else { 0 };
        let _ = err.print();
        std::process::exit(code);
    });
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

// =============================================================================
// Tests
// =============================================================================
