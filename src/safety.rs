//! Benson-style unconditional life.
//!
//! Implements the classic fixpoint: a chain stays alive while it has two
//! vital regions; a region stays while every chain on its border is
//! alive. A region is a maximal connected component of points not held
//! by the color; it is vital to a bordering chain when every empty point
//! of the region is a liberty of that chain.
//!
//! The solver reports the point set that is unconditionally safe for a
//! color: the stones of the surviving chains plus the points of their
//! vital regions (including dead opponent stones inside).

use crate::board::{neighbors, Board, Color, Point, PointState, GRID_LEN};

struct Region {
    points: Vec<Point>,
    empty_points: Vec<Point>,
    /// Anchors of the color's chains on the region border.
    border_chains: Vec<Point>,
}

/// Points unconditionally safe for `color`, indexed by grid point.
pub fn unconditional_safe_points(board: &Board, color: Color) -> Vec<bool> {
    let own: PointState = color.into();

    // Collect the color's chains.
    let mut chains: Vec<Point> = board
        .block_anchors()
        .filter(|&a| board.color_at(a) == own)
        .collect();

    // Partition everything else into regions.
    let mut regions: Vec<Region> = Vec::new();
    let mut region_of = vec![usize::MAX; GRID_LEN];
    for start in board.points() {
        if board.color_at(start) == own || region_of[start] != usize::MAX {
            continue;
        }
        let idx = regions.len();
        let mut region = Region {
            points: Vec::new(),
            empty_points: Vec::new(),
            border_chains: Vec::new(),
        };
        let mut stack = vec![start];
        region_of[start] = idx;
        while let Some(p) = stack.pop() {
            region.points.push(p);
            if board.is_empty(p) {
                region.empty_points.push(p);
            }
            for n in neighbors(p) {
                match board.color_at(n) {
                    PointState::Border => {}
                    s if s == own => {
                        let a = board.anchor(n);
                        if !region.border_chains.contains(&a) {
                            region.border_chains.push(a);
                        }
                    }
                    _ => {
                        if region_of[n] == usize::MAX {
                            region_of[n] = idx;
                            stack.push(n);
                        }
                    }
                }
            }
        }
        regions.push(region);
    }

    // Vitality: every empty point of the region is a liberty of the
    // chain.
    let vital = |region: &Region, chain: Point| -> bool {
        !region.empty_points.is_empty()
            && region
                .empty_points
                .iter()
                .all(|&p| board.is_liberty_of(p, chain))
    };

    // Benson fixpoint.
    let mut region_alive: Vec<bool> = regions.iter().map(|_| true).collect();
    loop {
        let mut changed = false;
        chains.retain(|&chain| {
            let vital_count = regions
                .iter()
                .enumerate()
                .filter(|(i, r)| {
                    region_alive[*i] && r.border_chains.contains(&chain) && vital(r, chain)
                })
                .count();
            if vital_count < 2 {
                changed = true;
                false
            } else {
                true
            }
        });
        for (i, r) in regions.iter().enumerate() {
            if region_alive[i]
                && !r
                    .border_chains
                    .iter()
                    .all(|a| chains.contains(a))
            {
                region_alive[i] = false;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // Safe points: alive stones plus their vital regions.
    let mut safe = vec![false; GRID_LEN];
    for &chain in &chains {
        for s in board.block_stones(chain) {
            safe[s] = true;
        }
        for (i, r) in regions.iter().enumerate() {
            if region_alive[i] && r.border_chains.contains(&chain) && vital(r, chain) {
                for &p in &r.points {
                    safe[p] = true;
                }
            }
        }
    }
    safe
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::parse_coord;
    use crate::rules::Rules;

    fn pt(s: &str) -> Point {
        parse_coord(s, 9).expect("coordinate")
    }

    fn setup(black: &[&str], white: &[&str]) -> Board {
        let mut b = Board::new(9, Rules::default());
        for m in black {
            b.setup_stone(Color::Black, pt(m)).unwrap();
        }
        for m in white {
            b.setup_stone(Color::White, pt(m)).unwrap();
        }
        b
    }

    /// A corner chain with two separate one-point eyes at A1 and C1.
    fn two_eye_group() -> Board {
        setup(&["A2", "B2", "C2", "D2", "B1", "D1"], &[])
    }

    #[test]
    fn two_eyes_are_unconditionally_alive() {
        let b = two_eye_group();
        let safe = unconditional_safe_points(&b, Color::Black);
        for m in ["A1", "C1", "A2", "B2", "C2", "D2", "B1", "D1"] {
            assert!(safe[pt(m)], "{m} should be safe");
        }
        // The open board is not part of the safe set.
        assert!(!safe[pt("E5")]);
        assert!(!safe[pt("E1")]);
    }

    #[test]
    fn single_big_eye_is_not_alive() {
        // One two-point eye space (A1, B1): not unconditional life.
        let b = setup(&["A2", "B2", "C2", "C1"], &[]);
        let safe = unconditional_safe_points(&b, Color::Black);
        assert!(!safe[pt("A1")]);
        assert!(!safe[pt("A2")]);
    }

    #[test]
    fn empty_board_has_no_safety() {
        let b = Board::new(9, Rules::default());
        let safe = unconditional_safe_points(&b, Color::Black);
        assert!(b.points().all(|p| !safe[p]));
    }

    #[test]
    fn dead_opponent_stone_inside_eye_is_safe_territory() {
        // White throw-in at A1 does not disturb black's life when both
        // eyes are real... use a second eye at C1 and a white stone in
        // the A1 eye.
        let mut b = two_eye_group();
        b.setup_stone(Color::White, pt("A1")).unwrap();
        let safe = unconditional_safe_points(&b, Color::Black);
        // A1 region now has no empty point, so it is no longer vital:
        // the group has only one eye left and loses its certificate.
        assert!(!safe[pt("B2")]);
    }

    #[test]
    fn opponent_safety_is_computed_independently() {
        let b = two_eye_group();
        let safe_white = unconditional_safe_points(&b, Color::White);
        assert!(b.points().all(|p| !safe_white[p]));
    }
}
