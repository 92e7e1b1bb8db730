//! Opening book lookup contract.
//!
//! The engine only depends on the lookup interface; book storage and
//! parsing live outside the core. [`EmptyBook`] is the default
//! implementation and never answers.

use crate::board::{Board, Point};

/// Read-only opening book.
pub trait OpeningBook: Send + Sync {
    /// A book move for the current position, or None on a miss. The
    /// returned move must be legal for the side to move.
    fn lookup(&self, board: &Board) -> Option<Point>;
}

/// A book with no entries.
pub struct EmptyBook;

impl OpeningBook for EmptyBook {
    fn lookup(&self, _board: &Board) -> Option<Point> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rules;

    #[test]
    fn empty_book_always_misses() {
        let board = Board::new(9, Rules::default());
        assert_eq!(EmptyBook.lookup(&board), None);
    }
}
