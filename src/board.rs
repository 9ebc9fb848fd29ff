use itertools::Itertools;
use std::fmt;
use std::num::NonZeroU8;
use std::str::FromStr;
use thiserror::Error;

pub const MAX_N: usize = 9;
pub const MAX_CELLS: usize = MAX_N * MAX_N;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("configuration string length {0} does not match any board size")]
    InvalidLength(usize),

    #[error("configuration string describes a {0}x{0} board but the maximum side length is 9")]
    BoardTooLarge(usize),

    #[error("unexpected character {character:?} at position {position}")]
    InvalidCharacter { character: char, position: usize },
}

/// An inequality constraint on the edge between two adjacent cells.
/// For an edge (A, B), [Inequality::LessThan] means value(A) < value(B)
/// once both cells are assigned.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Inequality {
    None,
    LessThan,
    GreaterThan,
}

impl Inequality {
    pub fn holds(self, left: NonZeroU8, right: NonZeroU8) -> bool {
        match self {
            Inequality::None => true,
            Inequality::LessThan => left < right,
            Inequality::GreaterThan => left > right,
        }
    }

    fn from_symbol(symbol: u8, position: usize) -> Result<Self, ParseError> {
        match symbol {
            b'-' => Ok(Inequality::None),
            b'<' => Ok(Inequality::LessThan),
            b'>' => Ok(Inequality::GreaterThan),
            _ => Err(ParseError::InvalidCharacter {
                character: symbol as char,
                position,
            }),
        }
    }

    fn symbol(self) -> char {
        match self {
            Inequality::None => '-',
            Inequality::LessThan => '<',
            Inequality::GreaterThan => '>',
        }
    }
}

/// A [Board] is an NxN futoshiki board with N <= 9.
/// Each cell can contain a value in 1..=N or be empty, and each pair of
/// horizontally or vertically adjacent cells can carry an [Inequality].
/// The edge/inequality structure is fixed at parse time, only cell values change.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Board {
    n: usize,
    // 0 means the cell is empty. Cells are ordered by rows, first left-to-right, then top-to-bottom.
    cells: [u8; MAX_CELLS],
    // horizontal_ineqs[index(row, col)] constrains (row, col) vs (row, col+1); only col < n-1 is meaningful.
    horizontal_ineqs: [Inequality; MAX_CELLS],
    // vertical_ineqs[index(row, col)] constrains (row, col) vs (row+1, col); only row < n-1 is meaningful.
    vertical_ineqs: [Inequality; MAX_CELLS],
}

/// Returns the side length N such that `len == 3*N*N - 2*N`, i.e. the
/// length of a packed configuration string for an NxN board.
fn side_len(len: usize) -> Result<usize, ParseError> {
    for n in 1.. {
        let expected = 3 * n * n - 2 * n;
        if expected == len {
            return if n <= MAX_N {
                Ok(n)
            } else {
                Err(ParseError::BoardTooLarge(n))
            };
        }
        if expected > len {
            return Err(ParseError::InvalidLength(len));
        }
    }
    unreachable!()
}

impl Board {
    fn new_empty(n: usize) -> Self {
        assert!((1..=MAX_N).contains(&n));
        Self {
            n,
            cells: [0; MAX_CELLS],
            horizontal_ineqs: [Inequality::None; MAX_CELLS],
            vertical_ineqs: [Inequality::None; MAX_CELLS],
        }
    }

    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        assert!(row < self.n && col < self.n);
        row * self.n + col
    }

    #[inline]
    pub fn value(&self, row: usize, col: usize) -> Option<NonZeroU8> {
        NonZeroU8::new(self.cells[self.index(row, col)])
    }

    #[inline]
    pub(crate) fn set_value(&mut self, row: usize, col: usize, value: Option<NonZeroU8>) {
        self.cells[self.index(row, col)] = value.map_or(0, NonZeroU8::get);
    }

    /// The inequality on the edge between (row, col) and (row, col+1). Requires col < n-1.
    #[inline]
    pub fn horizontal_ineq(&self, row: usize, col: usize) -> Inequality {
        assert!(col + 1 < self.n);
        self.horizontal_ineqs[self.index(row, col)]
    }

    /// The inequality on the edge between (row, col) and (row+1, col). Requires row < n-1.
    #[inline]
    pub fn vertical_ineq(&self, row: usize, col: usize) -> Inequality {
        assert!(row + 1 < self.n);
        self.vertical_ineqs[self.index(row, col)]
    }

    /// The other N-1 cells sharing the row of (row, col).
    pub fn row_peers(&self, row: usize, col: usize) -> impl Iterator<Item = (usize, usize)> {
        (0..self.n).filter(move |&j| j != col).map(move |j| (row, j))
    }

    /// The other N-1 cells sharing the column of (row, col).
    pub fn col_peers(&self, row: usize, col: usize) -> impl Iterator<Item = (usize, usize)> {
        (0..self.n).filter(move |&i| i != row).map(move |i| (i, col))
    }

    /// Checks whether placing `value` at (row, col) conflicts with any currently
    /// assigned row/column peer or violates an incident inequality edge whose
    /// neighbor is assigned. Unassigned neighbors impose no constraint yet.
    pub fn is_consistent(&self, row: usize, col: usize, value: NonZeroU8) -> bool {
        for (r, c) in self.row_peers(row, col).chain(self.col_peers(row, col)) {
            if self.value(r, c) == Some(value) {
                return false;
            }
        }
        if col > 0 {
            if let Some(left) = self.value(row, col - 1) {
                if !self.horizontal_ineq(row, col - 1).holds(left, value) {
                    return false;
                }
            }
        }
        if col + 1 < self.n {
            if let Some(right) = self.value(row, col + 1) {
                if !self.horizontal_ineq(row, col).holds(value, right) {
                    return false;
                }
            }
        }
        if row > 0 {
            if let Some(above) = self.value(row - 1, col) {
                if !self.vertical_ineq(row - 1, col).holds(above, value) {
                    return false;
                }
            }
        }
        if row + 1 < self.n {
            if let Some(below) = self.value(row + 1, col) {
                if !self.vertical_ineq(row, col).holds(value, below) {
                    return false;
                }
            }
        }
        true
    }

    /// The first empty cell in row-major order, or `None` if the board is full.
    pub fn first_unassigned(&self) -> Option<(usize, usize)> {
        (0..self.n)
            .cartesian_product(0..self.n)
            .find(|&(row, col)| self.value(row, col).is_none())
    }

    pub fn is_filled(&self) -> bool {
        self.first_unassigned().is_none()
    }

    pub fn has_conflicts(&self) -> bool {
        (0..self.n).cartesian_product(0..self.n).any(|(row, col)| {
            self.value(row, col)
                .is_some_and(|value| !self.is_consistent(row, col, value))
        })
    }

    /// Serializes the board back into the packed configuration format.
    /// Empty cells become '0' and inequality edges keep their original symbol,
    /// so `s.parse::<Board>()?.to_config_str() == s` for any valid `s`.
    pub fn to_config_str(&self) -> String {
        let mut out = String::with_capacity(3 * self.n * self.n - 2 * self.n);
        for row in 0..self.n {
            for col in 0..self.n {
                out.push(char::from(b'0' + self.cells[self.index(row, col)]));
                if col + 1 < self.n {
                    out.push(self.horizontal_ineq(row, col).symbol());
                }
            }
            if row + 1 < self.n {
                for col in 0..self.n {
                    out.push(self.vertical_ineq(row, col).symbol());
                }
            }
        }
        out
    }
}

impl FromStr for Board {
    type Err = ParseError;

    /// Parses the packed configuration format: per row, N cell digits ('0' = empty)
    /// interleaved with N-1 horizontal inequality symbols; between consecutive rows,
    /// N vertical inequality symbols. Total length must be 3*N*N - 2*N.
    fn from_str(s: &str) -> Result<Self, ParseError> {
        let n = side_len(s.len())?;
        let mut board = Board::new_empty(n);
        let bytes = s.as_bytes();
        let mut pos = 0;
        for row in 0..n {
            for col in 0..n {
                let digit = bytes[pos];
                match digit {
                    b'0'..=b'9' if usize::from(digit - b'0') <= n => {
                        board.cells[board.index(row, col)] = digit - b'0';
                    }
                    _ => {
                        return Err(ParseError::InvalidCharacter {
                            character: digit as char,
                            position: pos,
                        })
                    }
                }
                pos += 1;
                if col + 1 < n {
                    board.horizontal_ineqs[board.index(row, col)] =
                        Inequality::from_symbol(bytes[pos], pos)?;
                    pos += 1;
                }
            }
            if row + 1 < n {
                for col in 0..n {
                    board.vertical_ineqs[board.index(row, col)] =
                        Inequality::from_symbol(bytes[pos], pos)?;
                    pos += 1;
                }
            }
        }
        debug_assert_eq!(pos, s.len());
        Ok(board)
    }
}

impl fmt::Display for Board {
    /// Renders the board with '_' for empty cells and the inequality symbols
    /// between cells, leaving a blank where there is no constraint.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.n {
            let mut line = String::new();
            for col in 0..self.n {
                if col > 0 {
                    let symbol = match self.horizontal_ineq(row, col - 1) {
                        Inequality::None => ' ',
                        ineq => ineq.symbol(),
                    };
                    line.push(' ');
                    line.push(symbol);
                    line.push(' ');
                }
                line.push(match self.cells[self.index(row, col)] {
                    0 => '_',
                    value => char::from(b'0' + value),
                });
            }
            writeln!(f, "{}", line.trim_end())?;
            if row + 1 < self.n {
                let mut line = String::new();
                for col in 0..self.n {
                    if col > 0 {
                        line.push_str("   ");
                    }
                    line.push(match self.vertical_ineq(row, col) {
                        Inequality::None => ' ',
                        ineq => ineq.symbol(),
                    });
                }
                writeln!(f, "{}", line.trim_end())?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({})", self.to_config_str())
    }
}
