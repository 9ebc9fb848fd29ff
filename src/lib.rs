mod board;
mod solver;

pub use board::{Board, Inequality, ParseError};
pub use solver::{solve, solve_str, Error, SolveError};
