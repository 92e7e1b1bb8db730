//! Move filters.
//!
//! A filter returns a set of moves to remove from consideration. The
//! same protocol serves two scopes: the root filter runs once before a
//! search and prunes root moves; the tree filter is consulted at every
//! expansion. The default filter composes independently toggleable
//! checks: unconditionally safe territory, losing ladder defenses,
//! failing ladder chases, and first-line moves in empty areas.

use crate::board::{Board, Color, Point, PointState, STRIDE};
use crate::ladder::read_ladder;
use crate::safety::unconditional_safe_points;

/// Removes moves from consideration for the side to move.
pub trait MoveFilter {
    fn get(&mut self, board: &Board) -> Vec<Point>;
}

/// Creates per-thread filter instances (the tree filter runs inside
/// worker threads).
pub trait MoveFilterFactory: Send + Sync {
    fn create(&self) -> Box<dyn MoveFilter + Send>;
}

/// Toggles for [`DefaultMoveFilter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveFilterParam {
    pub check_safety: bool,
    pub check_ladders: bool,
    pub check_offensive_ladders: bool,
    pub min_ladder_length: usize,
    pub filter_first_line: bool,
}

impl Default for MoveFilterParam {
    fn default() -> Self {
        MoveFilterParam {
            check_safety: true,
            check_ladders: true,
            check_offensive_ladders: true,
            min_ladder_length: 6,
            filter_first_line: true,
        }
    }
}

/// The default root/tree filter.
pub struct DefaultMoveFilter {
    param: MoveFilterParam,
}

impl DefaultMoveFilter {
    pub fn new(param: MoveFilterParam) -> Self {
        DefaultMoveFilter { param }
    }
}

impl MoveFilter for DefaultMoveFilter {
    fn get(&mut self, board: &Board) -> Vec<Point> {
        let to_play = board.to_play();
        let opp = to_play.opponent();
        let own_state: PointState = to_play.into();
        let opp_state: PointState = opp.into();
        let mut filtered: Vec<Point> = Vec::new();
        let mut push = |filtered: &mut Vec<Point>, p: Point| {
            if !filtered.contains(&p) {
                filtered.push(p);
            }
        };

        // Moves inside settled territory. Moves in own safe territory
        // are kept when they touch opponent stones: capturing inside is
        // still needed for area scoring.
        if self.param.check_safety {
            let own_safe = unconditional_safe_points(board, to_play);
            let opp_safe = unconditional_safe_points(board, opp);
            for p in board.points() {
                if !board.is_empty(p) || !board.is_legal(p, to_play) {
                    continue;
                }
                let has_opp_neighbors = board.num_neighbors(p, opp) > 0;
                if opp_safe[p] || (own_safe[p] && !has_opp_neighbors) {
                    push(&mut filtered, p);
                }
            }
        }

        // Defending an own block caught in a long losing ladder.
        if self.param.check_ladders {
            for a in board.block_anchors().collect::<Vec<_>>() {
                if board.color_at(a) == own_state && board.in_atari(a) {
                    let reading = read_ladder(board, a, to_play);
                    if reading.captured
                        && reading.sequence.len() >= self.param.min_ladder_length
                    {
                        push(&mut filtered, board.the_liberty(a));
                    }
                }
            }
        }

        // Chasing a big two-liberty block through a ladder that fails.
        if self.param.check_offensive_ladders {
            for a in board.block_anchors().collect::<Vec<_>>() {
                if board.color_at(a) == opp_state
                    && board.num_stones(a) >= 5
                    && board.num_liberties(a) == 2
                {
                    let reading = read_ladder(board, a, to_play);
                    if !reading.captured
                        && reading.sequence.len() >= self.param.min_ladder_length
                        && !reading.sequence.is_empty()
                    {
                        push(&mut filtered, reading.sequence[0]);
                    }
                }
            }
        }

        // First-line moves with no stone anywhere near.
        if self.param.filter_first_line {
            for p in board.points() {
                if board.is_empty(p) && board.line(p) == 1 && in_empty_area(board, p, 4) {
                    push(&mut filtered, p);
                }
            }
        }

        filtered
    }
}

/// True if no stone lies within Manhattan distance `dist` of `pt`.
fn in_empty_area(board: &Board, pt: Point, dist: isize) -> bool {
    let row = (pt / STRIDE) as isize;
    let col = (pt % STRIDE) as isize;
    let size = board.size() as isize;
    for dr in -dist..=dist {
        let budget = dist - dr.abs();
        for dc in -budget..=budget {
            let r = row + dr;
            let c = col + dc;
            if r < 1 || r > size || c < 1 || c > size {
                continue;
            }
            let q = (r * STRIDE as isize + c) as Point;
            if board.color_at(q).is_stone() {
                return false;
            }
        }
    }
    true
}

/// Factory for [`DefaultMoveFilter`] instances sharing one parameter
/// set.
pub struct DefaultMoveFilterFactory {
    pub param: MoveFilterParam,
}

impl DefaultMoveFilterFactory {
    pub fn new(param: MoveFilterParam) -> Self {
        DefaultMoveFilterFactory { param }
    }
}

impl MoveFilterFactory for DefaultMoveFilterFactory {
    fn create(&self) -> Box<dyn MoveFilter + Send> {
        Box::new(DefaultMoveFilter::new(self.param.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::parse_coord;
    use crate::rules::Rules;

    fn pt(s: &str) -> Point {
        parse_coord(s, 9).expect("coordinate")
    }

    fn setup(black: &[&str], white: &[&str], to_play: Color) -> Board {
        let mut b = Board::new(9, Rules::default());
        for m in black {
            b.setup_stone(Color::Black, pt(m)).unwrap();
        }
        for m in white {
            b.setup_stone(Color::White, pt(m)).unwrap();
        }
        b.set_to_play(to_play);
        b
    }

    fn filter() -> DefaultMoveFilter {
        DefaultMoveFilter::new(MoveFilterParam::default())
    }

    #[test]
    fn losing_ladder_defense_is_filtered() {
        // Black D4 in atari; the escape at E4 dies in a long ladder.
        let b = setup(&["D4"], &["C4", "D5", "D3", "E5"], Color::Black);
        let filtered = filter().get(&b);
        assert!(
            filtered.contains(&pt("E4")),
            "ladder escape should be filtered, got {filtered:?}"
        );
    }

    #[test]
    fn short_capture_is_not_filtered_as_ladder() {
        // Black A1 in atari, but the loss takes only a move or two: the
        // min-ladder-length gate keeps the defense.
        let b = setup(&["A1"], &["A2", "B2", "C1"], Color::Black);
        let filtered = filter().get(&b);
        assert!(!filtered.contains(&pt("B1")));
    }

    #[test]
    fn moves_in_opponent_safe_territory_are_filtered() {
        // White owns an unconditionally alive edge group with a
        // three-point eye space A1-C1 and a second eye at E1. Black
        // moves inside the big eye are legal but pointless.
        let b = setup(
            &[],
            &["A2", "B2", "C2", "D2", "E2", "F2", "F1", "D1"],
            Color::Black,
        );
        let mut f = DefaultMoveFilter::new(MoveFilterParam {
            filter_first_line: false,
            ..MoveFilterParam::default()
        });
        let filtered = f.get(&b);
        assert!(filtered.contains(&pt("B1")), "got {filtered:?}");
    }

    #[test]
    fn first_line_in_empty_area_is_filtered() {
        let b = setup(&["E5"], &[], Color::White);
        let filtered = filter().get(&b);
        // A1 is far from the lone stone.
        assert!(filtered.contains(&pt("A1")));
        // E1 is within Manhattan distance 4 of E5.
        assert!(!filtered.contains(&pt("E1")));
    }

    #[test]
    fn toggles_disable_checks() {
        let b = setup(&["E5"], &[], Color::White);
        let mut f = DefaultMoveFilter::new(MoveFilterParam {
            check_safety: false,
            check_ladders: false,
            check_offensive_ladders: false,
            filter_first_line: false,
            ..MoveFilterParam::default()
        });
        assert!(f.get(&b).is_empty());
    }
}
