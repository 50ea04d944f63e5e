use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::api::ApiClient;

pub const MIN_SIZE: u8 = 5;
pub const MAX_SIZE: u8 = 15;
pub const DEFAULT_SIZE: u8 = 10;
pub const DEFAULT_TOPIC: &str = "MongoDB";

/// How long an evaluated pair stays highlighted before it is cleared.
pub const CLEAR_DELAY: Duration = Duration::from_secs(1);

pub fn clamp_size(size: i64) -> u8 {
    size.clamp(MIN_SIZE as i64, MAX_SIZE as i64) as u8
}

/// A 0-indexed grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
}

impl Cell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Placement of one word, as sent by the backend (1-indexed `[row, col]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub word: String,
    pub start: [usize; 2],
    pub end: [usize; 2],
    pub direction: String,
}

impl Answer {
    /// Start and end converted to grid cells; `None` if either uses a 0 coordinate.
    pub fn endpoints(&self) -> Option<(Cell, Cell)> {
        Some((to_cell(self.start)?, to_cell(self.end)?))
    }

    /// True when `{a, b}` is this answer's endpoint pair, in either order.
    ///
    /// The direction label is not consulted.
    pub fn matches(&self, a: Cell, b: Cell) -> bool {
        match self.endpoints() {
            Some((start, end)) => (a == start && b == end) || (a == end && b == start),
            None => false,
        }
    }

    /// Cells from start to end along a straight line (row, column or 45° diagonal).
    ///
    /// Returns an empty path when the endpoints are not aligned.
    pub fn path(&self) -> Vec<Cell> {
        let Some((start, end)) = self.endpoints() else {
            return Vec::new();
        };

        let d_row = end.row as isize - start.row as isize;
        let d_col = end.col as isize - start.col as isize;
        let aligned = d_row == 0 || d_col == 0 || d_row.abs() == d_col.abs();
        if !aligned {
            return Vec::new();
        }

        let steps = d_row.abs().max(d_col.abs());
        let (step_row, step_col) = (d_row.signum(), d_col.signum());

        (0..=steps)
            .map(|i| {
                Cell::new(
                    (start.row as isize + i * step_row) as usize,
                    (start.col as isize + i * step_col) as usize,
                )
            })
            .collect()
    }
}

fn to_cell(coord: [usize; 2]) -> Option<Cell> {
    Some(Cell::new(coord[0].checked_sub(1)?, coord[1].checked_sub(1)?))
}

/// Splits the backend's grid string into rows (on `'\n'`) and cells (on `' '`),
/// discarding empty tokens.
pub fn parse_grid(raw: &str) -> Vec<Vec<String>> {
    raw.split('\n')
        .map(|row| {
            row.split(' ')
                .filter(|cell| !cell.is_empty())
                .map(str::to_string)
                .collect()
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSearchPuzzle {
    grid: Vec<Vec<String>>,
    answers: Vec<Answer>,
}

impl WordSearchPuzzle {
    pub fn new(grid: Vec<Vec<String>>, answers: Vec<Answer>) -> Self {
        Self { grid, answers }
    }

    pub fn from_parts(raw_grid: &str, answers: Vec<Answer>) -> Self {
        Self::new(parse_grid(raw_grid), answers)
    }

    pub fn grid(&self) -> &[Vec<String>] {
        &self.grid
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn cell(&self, cell: Cell) -> Option<&str> {
        self.grid
            .get(cell.row)
            .and_then(|row| row.get(cell.col))
            .map(String::as_str)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.cell(cell).is_some()
    }

    /// Whether every answer's endpoints land on a cell of the grid.
    pub fn answers_in_bounds(&self) -> bool {
        self.answers.iter().all(|answer| match answer.endpoints() {
            Some((start, end)) => self.contains(start) && self.contains(end),
            None => false,
        })
    }

    pub fn find_answer(&self, a: Cell, b: Cell) -> Option<&Answer> {
        self.answers.iter().find(|answer| answer.matches(a, b))
    }
}

/// Identifies one scheduled selection clear. Only the most recent ticket is honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectOutcome {
    /// No puzzle, or the cell is off the grid.
    Ignored,
    Selected,
    Deselected,
    /// A pair was completed and checked. `matched` carries the answer's word,
    /// whether or not it had been found before.
    Evaluated {
        matched: Option<String>,
        ticket: ClearTicket,
    },
}

/// State of the word-search view: current puzzle, found words and cell selection.
#[derive(Debug, Default)]
pub struct WordSearchBoard {
    puzzle: Option<WordSearchPuzzle>,
    found: Vec<String>,
    selection: Vec<Cell>,
    pending_clear: Option<ClearTicket>,
    epoch: u64,
    loading: bool,
    status: Option<String>,
}

impl WordSearchBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn puzzle(&self) -> Option<&WordSearchPuzzle> {
        self.puzzle.as_ref()
    }

    pub fn found_words(&self) -> &[String] {
        &self.found
    }

    pub fn selection(&self) -> &[Cell] {
        &self.selection
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Last generation failure, if any.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn is_selected(&self, cell: Cell) -> bool {
        self.selection.contains(&cell)
    }

    pub fn is_found(&self, word: &str) -> bool {
        self.found.iter().any(|w| w == word)
    }

    /// Cells covered by found words whose endpoints are aligned.
    pub fn found_cells(&self) -> HashSet<Cell> {
        let Some(puzzle) = &self.puzzle else {
            return HashSet::new();
        };

        puzzle
            .answers()
            .iter()
            .filter(|answer| self.is_found(&answer.word))
            .flat_map(Answer::path)
            .collect()
    }

    /// `(found, total)`
    pub fn progress(&self) -> (usize, usize) {
        let total = self.puzzle.as_ref().map_or(0, |p| p.answers().len());
        (self.found.len(), total)
    }

    pub fn is_complete(&self) -> bool {
        let (found, total) = self.progress();
        total > 0 && found == total
    }

    /// Marks a generation as started. Returns `false` if one is already running.
    pub fn begin_generate(&mut self) -> bool {
        if self.loading {
            return false;
        }
        self.loading = true;
        self.status = None;
        true
    }

    pub fn finish_generate<E: fmt::Display>(&mut self, result: Result<WordSearchPuzzle, E>) {
        self.loading = false;
        match result {
            Ok(puzzle) => self.load(puzzle),
            Err(e) => {
                error!(error = %e, "error fetching word search");
                self.status = Some(format!("No se pudo generar la sopa de letras: {e}"));
            }
        }
    }

    pub async fn generate(&mut self, client: &ApiClient, topic: &str, size: u8) {
        if self.begin_generate() {
            let result = client.word_search(topic, size).await;
            self.finish_generate(result);
        }
    }

    /// Replaces the puzzle, resetting found words and selection and
    /// invalidating any scheduled clear.
    pub fn load(&mut self, puzzle: WordSearchPuzzle) {
        info!(
            rows = puzzle.grid().len(),
            answers = puzzle.answers().len(),
            "loaded word search"
        );
        self.puzzle = Some(puzzle);
        self.found.clear();
        self.selection.clear();
        self.cancel_pending_clear();
    }

    pub fn select_cell(&mut self, cell: Cell) -> SelectOutcome {
        let on_grid = self.puzzle.as_ref().is_some_and(|p| p.contains(cell));
        if !on_grid {
            return SelectOutcome::Ignored;
        }

        // A new click after an evaluated pair starts a fresh selection.
        if self.pending_clear.is_some() {
            self.cancel_pending_clear();
            self.selection.clear();
        }

        match *self.selection.as_slice() {
            [] => {
                self.selection.push(cell);
                SelectOutcome::Selected
            }
            [first] if first == cell => {
                self.selection.clear();
                SelectOutcome::Deselected
            }
            [first] => {
                self.selection.push(cell);

                let matched = self
                    .puzzle
                    .as_ref()
                    .and_then(|p| p.find_answer(first, cell))
                    .map(|a| a.word.clone());
                if let Some(word) = &matched {
                    if !self.is_found(word) {
                        info!(word = %word, "word found");
                        self.found.push(word.clone());
                    }
                }

                self.epoch += 1;
                let ticket = ClearTicket(self.epoch);
                self.pending_clear = Some(ticket);
                SelectOutcome::Evaluated { matched, ticket }
            }
            _ => {
                // Unreachable while pending_clear tracks every completed pair.
                self.selection.clear();
                self.selection.push(cell);
                SelectOutcome::Selected
            }
        }
    }

    /// Clears the selection if `ticket` is still the current one.
    pub fn clear_selection(&mut self, ticket: ClearTicket) -> bool {
        if self.pending_clear != Some(ticket) {
            return false;
        }
        self.pending_clear = None;
        self.selection.clear();
        true
    }

    pub fn pending_clear(&self) -> Option<ClearTicket> {
        self.pending_clear
    }

    fn cancel_pending_clear(&mut self) {
        self.pending_clear = None;
        self.epoch += 1;
    }
}
