use bitvec::prelude::*;
use std::num::NonZeroU8;

use crate::board::{Board, Inequality, MAX_CELLS, MAX_N};

/// A position in the trail. Restoring to a checkpoint undoes every domain
/// mutation recorded after it, so checkpoints nest with the recursion.
pub struct Checkpoint(usize);

/// Per-cell candidate domains for a board being solved.
///
/// Stores MAX_N bits per cell (row-major, like [Board]). If a bit is set, the
/// value is still considered possible for that cell. Every mutation records the
/// cell's prior bit mask on a trail so [Domains::restore] is an exact inverse.
pub struct Domains {
    n: usize,
    candidates: BitArr!(for MAX_CELLS * MAX_N),
    trail: Vec<(u16, u16)>,
}

impl Domains {
    /// Builds the domains for `board`: a singleton for every given cell,
    /// {1..=N} for every empty cell, then one forward-checking pass from every
    /// given. Returns `None` if the givens already contradict each other or
    /// the pass empties some cell's domain, i.e. the puzzle is unsolvable.
    pub fn from_board(board: &Board) -> Option<Self> {
        let n = board.n();
        let mut domains = Self {
            n,
            candidates: BitArray::ZERO,
            trail: Vec::new(),
        };
        let full = (1u16 << n) - 1;
        for row in 0..n {
            for col in 0..n {
                let mask = match board.value(row, col) {
                    Some(value) => value_bit(value),
                    None => full,
                };
                domains.set_mask(domains.index(row, col), mask);
            }
        }
        for row in 0..n {
            for col in 0..n {
                if let Some(value) = board.value(row, col) {
                    if !board.is_consistent(row, col, value) {
                        return None;
                    }
                    if !domains.prune_after_assign(board, row, col, value) {
                        return None;
                    }
                }
            }
        }
        // The initial pruning is part of the base state and never rolled back.
        domains.trail.clear();
        Some(domains)
    }

    #[inline]
    fn index(&self, row: usize, col: usize) -> usize {
        row * self.n + col
    }

    #[inline]
    fn mask(&self, cell: usize) -> u16 {
        self.candidates[cell * MAX_N..(cell + 1) * MAX_N].load_le()
    }

    #[inline]
    fn set_mask(&mut self, cell: usize, mask: u16) {
        self.candidates[cell * MAX_N..(cell + 1) * MAX_N].store_le(mask);
    }

    /// The candidate values still possible for (row, col), in ascending order.
    /// The returned iterator snapshots the domain, so the store may be mutated
    /// while iterating.
    pub fn candidates(&self, row: usize, col: usize) -> impl Iterator<Item = NonZeroU8> {
        let mask = self.mask(self.index(row, col));
        (1..=self.n as u8)
            .filter(move |value| mask & (1 << (value - 1)) != 0)
            .map(|value| NonZeroU8::new(value).unwrap())
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.trail.len())
    }

    /// Undoes all narrowings and removals recorded since `checkpoint`,
    /// restoring the prior domains exactly.
    pub fn restore(&mut self, checkpoint: Checkpoint) {
        while self.trail.len() > checkpoint.0 {
            let (cell, prior) = self.trail.pop().unwrap();
            self.set_mask(usize::from(cell), prior);
        }
    }

    /// Tentatively sets domain(row, col) = {value}, recording the prior domain
    /// for rollback.
    pub fn narrow(&mut self, row: usize, col: usize, value: NonZeroU8) {
        let cell = self.index(row, col);
        let prior = self.mask(cell);
        self.trail.push((cell as u16, prior));
        self.set_mask(cell, value_bit(value));
    }

    /// Narrows (row, col) to `value` and forward-prunes the domains of all
    /// affected cells. Returns `false` if some unassigned cell's domain became
    /// empty, meaning the current branch is infeasible. The caller is expected
    /// to [Self::restore] to a checkpoint taken before this call in that case.
    pub fn assign(&mut self, board: &Board, row: usize, col: usize, value: NonZeroU8) -> bool {
        self.narrow(row, col, value);
        self.prune_after_assign(board, row, col, value)
    }

    // Removes `value` from all unassigned row/column peers of (row, col) and
    // prunes inequality neighbors down to the values the bound still allows.
    // Assigned cells are never touched, so given singletons stay immutable.
    fn prune_after_assign(
        &mut self,
        board: &Board,
        row: usize,
        col: usize,
        value: NonZeroU8,
    ) -> bool {
        for (r, c) in board.row_peers(row, col).chain(board.col_peers(row, col)) {
            if board.value(r, c).is_none() && !self.remove(self.index(r, c), value) {
                return false;
            }
        }

        let v = u16::from(value.get());
        let keep_greater = !((1u16 << v) - 1);
        let keep_less = (1u16 << (v - 1)) - 1;
        let keep_for = |ineq_from_here: Inequality| match ineq_from_here {
            Inequality::None => None,
            Inequality::LessThan => Some(keep_greater),
            Inequality::GreaterThan => Some(keep_less),
        };
        let keep_for_rev = |ineq_to_here: Inequality| match ineq_to_here {
            Inequality::None => None,
            Inequality::LessThan => Some(keep_less),
            Inequality::GreaterThan => Some(keep_greater),
        };

        if col + 1 < self.n {
            if let Some(keep) = keep_for(board.horizontal_ineq(row, col)) {
                if !self.prune_neighbor(board, row, col + 1, keep) {
                    return false;
                }
            }
        }
        if col > 0 {
            if let Some(keep) = keep_for_rev(board.horizontal_ineq(row, col - 1)) {
                if !self.prune_neighbor(board, row, col - 1, keep) {
                    return false;
                }
            }
        }
        if row + 1 < self.n {
            if let Some(keep) = keep_for(board.vertical_ineq(row, col)) {
                if !self.prune_neighbor(board, row + 1, col, keep) {
                    return false;
                }
            }
        }
        if row > 0 {
            if let Some(keep) = keep_for_rev(board.vertical_ineq(row - 1, col)) {
                if !self.prune_neighbor(board, row - 1, col, keep) {
                    return false;
                }
            }
        }
        true
    }

    // Removes `value` from the domain of `cell` if present. Returns `false`
    // if the domain is now empty.
    fn remove(&mut self, cell: usize, value: NonZeroU8) -> bool {
        let prior = self.mask(cell);
        let new = prior & !value_bit(value);
        if new != prior {
            self.trail.push((cell as u16, prior));
            self.set_mask(cell, new);
        }
        new != 0
    }

    // Intersects the domain of an unassigned neighbor with `keep`. Returns
    // `false` if the domain is now empty.
    fn prune_neighbor(&mut self, board: &Board, row: usize, col: usize, keep: u16) -> bool {
        if board.value(row, col).is_some() {
            return true;
        }
        let cell = self.index(row, col);
        let prior = self.mask(cell);
        let new = prior & keep;
        if new != prior {
            self.trail.push((cell as u16, prior));
            self.set_mask(cell, new);
        }
        new != 0
    }
}

#[inline]
fn value_bit(value: NonZeroU8) -> u16 {
    1 << (value.get() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(value: u8) -> NonZeroU8 {
        NonZeroU8::new(value).unwrap()
    }

    fn candidate_values(domains: &Domains, row: usize, col: usize) -> Vec<u8> {
        domains.candidates(row, col).map(NonZeroU8::get).collect()
    }

    fn all_masks(domains: &Domains) -> Vec<u16> {
        (0..domains.n * domains.n).map(|cell| domains.mask(cell)).collect()
    }

    #[test]
    fn reset_gives_singletons_for_givens_and_full_domains_for_blanks() {
        let board: Board = "1-0--0-0".parse().unwrap();
        let domains = Domains::from_board(&board).unwrap();
        assert_eq!(vec![1], candidate_values(&domains, 0, 0));
        // forward checking already removed 1 from the peers of the given
        assert_eq!(vec![2], candidate_values(&domains, 0, 1));
        assert_eq!(vec![2], candidate_values(&domains, 1, 0));
        assert_eq!(vec![1, 2], candidate_values(&domains, 1, 1));
    }

    #[test]
    fn initial_pruning_applies_inequality_bounds() {
        // (0,0) > (0,1) = 2, so (0,0) can only be 3. Row uniqueness alone
        // would still leave {1, 3}.
        let board: Board = "0>2-0---0-0-0---0-0-0".parse().unwrap();
        let domains = Domains::from_board(&board).unwrap();
        assert_eq!(vec![3], candidate_values(&domains, 0, 0));
        assert_eq!(vec![1, 3], candidate_values(&domains, 0, 2));
    }

    #[test]
    fn contradictory_givens_yield_no_domains() {
        let board: Board = "1-1--0-0".parse().unwrap();
        assert!(Domains::from_board(&board).is_none());
    }

    #[test]
    fn emptied_domain_yields_no_domains() {
        // (1,0) shares its column with the given 1 and its row with the
        // given 2, leaving it no candidates.
        let board: Board = "1-0--0-2".parse().unwrap();
        assert!(Domains::from_board(&board).is_none());
    }

    #[test]
    fn narrow_and_restore_are_exact_inverses() {
        let board: Board = "0-0-0---0-0-0---0-0-0".parse().unwrap();
        let mut domains = Domains::from_board(&board).unwrap();
        let initial = all_masks(&domains);

        let outer = domains.checkpoint();
        domains.narrow(1, 1, nz(2));
        assert_eq!(vec![2], candidate_values(&domains, 1, 1));
        let after_narrow = all_masks(&domains);

        let inner = domains.checkpoint();
        let mut board_with_assignment = board;
        board_with_assignment.set_value(0, 0, Some(nz(1)));
        assert!(domains.assign(&board_with_assignment, 0, 0, nz(1)));
        assert_ne!(after_narrow, all_masks(&domains));

        domains.restore(inner);
        assert_eq!(after_narrow, all_masks(&domains));
        domains.restore(outer);
        assert_eq!(initial, all_masks(&domains));
    }

    #[test]
    fn domains_only_shrink_under_assign() {
        let board: Board = "0<0-0---0-0-0---0-0-0".parse().unwrap();
        let mut domains = Domains::from_board(&board).unwrap();
        let before = all_masks(&domains);

        let mut assigned = board;
        assigned.set_value(0, 0, Some(nz(1)));
        assert!(domains.assign(&assigned, 0, 0, nz(1)));
        let after = all_masks(&domains);
        for (new, old) in after.iter().zip(&before) {
            assert_eq!(*new, new & old);
        }
    }

    #[test]
    fn assign_prunes_inequality_neighbor() {
        let board: Board = "0<0-0---0-0-0---0-0-0".parse().unwrap();
        let mut domains = Domains::from_board(&board).unwrap();
        let mut assigned = board;
        assigned.set_value(0, 0, Some(nz(2)));
        assert!(domains.assign(&assigned, 0, 0, nz(2)));
        // (0,1) must be greater than 2
        assert_eq!(vec![3], candidate_values(&domains, 0, 1));
    }

    #[test]
    fn assign_reports_infeasible_branch() {
        let board: Board = "0<0-0---0-0-0---0-0-0".parse().unwrap();
        let mut domains = Domains::from_board(&board).unwrap();
        let checkpoint = domains.checkpoint();
        let before = all_masks(&domains);
        let mut assigned = board;
        assigned.set_value(0, 0, Some(nz(3)));
        // (0,1) would have to be greater than 3 on a 3x3 board
        assert!(!domains.assign(&assigned, 0, 0, nz(3)));
        domains.restore(checkpoint);
        assert_eq!(before, all_masks(&domains));
    }
}
