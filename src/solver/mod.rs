use thiserror::Error;

use crate::board::{Board, ParseError};

mod domains;
use domains::Domains;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SolveError {
    #[error("puzzle has no solution")]
    NoSolution,
}

/// Everything that can go wrong when solving a packed configuration string.
/// Parse failures and unsolvable puzzles stay distinguishable for the caller.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Solve(#[from] SolveError),
}

/// Finds the first complete assignment consistent with all row, column and
/// inequality constraints, under row-major variable order and ascending value
/// order. Returns [SolveError::NoSolution] if the search exhausts all branches.
pub fn solve(board: &Board) -> Result<Board, SolveError> {
    let mut board = *board;
    let Some(mut domains) = Domains::from_board(&board) else {
        return Err(SolveError::NoSolution);
    };
    if search(&mut board, &mut domains) {
        assert!(board.is_filled());
        assert!(!board.has_conflicts());
        Ok(board)
    } else {
        Err(SolveError::NoSolution)
    }
}

/// Parses `config`, solves it and serializes the solution back into the
/// packed configuration format.
pub fn solve_str(config: &str) -> Result<String, Error> {
    let board: Board = config.parse()?;
    let solved = solve(&board)?;
    Ok(solved.to_config_str())
}

// Invariant:
//  - When `search` returns false, `board` and `domains` are unchanged. Any
//    changes made during the call have been undone via checkpoint/restore.
fn search(board: &mut Board, domains: &mut Domains) -> bool {
    let Some((row, col)) = board.first_unassigned() else {
        // No unassigned cells left. The puzzle is fully solved.
        return true;
    };
    for value in domains.candidates(row, col) {
        if !board.is_consistent(row, col, value) {
            continue;
        }
        board.set_value(row, col, Some(value));
        let checkpoint = domains.checkpoint();
        if domains.assign(board, row, col, value) && search(board, domains) {
            return true;
        }
        domains.restore(checkpoint);
        board.set_value(row, col, None);
    }
    // Every candidate for this cell dead-ends. Backtrack in the caller.
    false
}
