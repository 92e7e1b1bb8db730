//! 3x3 playout patterns.
//!
//! The classic MoGo-style hane/cut/side patterns, matched in the
//! neighborhood of the last moves during playouts and scanned globally by
//! the prior knowledge. Each pattern is a 9-character stencil around an
//! empty center, written relative to the side to move:
//!
//! - `X`: own stone, `O`: opponent stone, `.`: empty, `#`: off board
//! - `x`: not own, `o`: not opponent, `?`: anything
//!
//! All eight spatial symmetries of every stencil are expanded into a
//! 65536-entry bitset indexed by a 16-bit code of the eight neighbors
//! (2 bits each, relative to the side to move), so matching is a single
//! table lookup. Because the neighbor code is relative, one table serves
//! both colors.

use std::sync::OnceLock;

use crate::board::{all_neighbors, Board, Color, Point, PointState};

/// Pattern stencils, row by row from the upper left:
/// positions 0..9 = NW N NE / W center E / SW S SE.
const PAT3_SRC: &[&str] = &[
    // hane pattern - enclosing hane
    "XOX...???",
    // hane pattern - non-cutting hane
    "XO....?.?",
    // hane pattern - magari
    "XO?X..x.?",
    // generic pattern - katatsuke or diagonal attachment
    ".O.X.....",
    // cut1 pattern (kiri) - unprotected cut
    "XO?O.o?o?",
    // cut1 pattern (kiri) - peeped cut
    "XO?O.X???",
    // cut2 pattern (de)
    "?X?O.Oooo",
    // cut keima
    "OX?o.O???",
    // side pattern - chase
    "X.?O.?##?",
    // side pattern - block side cut
    "OX?X.O###",
    // side pattern - block side connection
    "?X?x.O###",
    // side pattern - sagari
    "?XOx.x###",
    // side pattern - cut
    "?OXX.O###",
];

/// Neighbor codes, 2 bits each: own, opponent, empty, border.
const CODE_OWN: u16 = 0;
const CODE_OPP: u16 = 1;
const CODE_EMPTY: u16 = 2;
const CODE_BORDER: u16 = 3;

/// Stencil position of each neighbor in board delta order
/// (N, E, S, W, NE, SE, SW, NW).
const STENCIL_POS: [usize; 8] = [1, 5, 7, 3, 2, 8, 6, 0];

static PAT3SET: OnceLock<Box<[u8; 8192]>> = OnceLock::new();

/// 16-bit neighborhood code of `pt` relative to `color`.
#[inline]
pub fn env16(board: &Board, pt: Point, color: Color) -> u16 {
    let own: PointState = color.into();
    let opp: PointState = color.opponent().into();
    let mut code = 0u16;
    for (i, n) in all_neighbors(pt).into_iter().enumerate() {
        let c = match board.color_at(n) {
            PointState::Empty => CODE_EMPTY,
            PointState::Border => CODE_BORDER,
            s if s == own => CODE_OWN,
            s if s == opp => CODE_OPP,
            _ => unreachable!(),
        };
        code |= c << (2 * i);
    }
    code
}

/// True if the empty point `pt` matches a playout pattern for the side
/// to move.
#[inline]
pub fn pat3_match(board: &Board, pt: Point) -> bool {
    pat3_match_for(board, pt, board.to_play())
}

/// True if the empty point `pt` matches a playout pattern for `color`.
#[inline]
pub fn pat3_match_for(board: &Board, pt: Point, color: Color) -> bool {
    let set = PAT3SET.get_or_init(build_pat3set);
    let code = env16(board, pt, color);
    set[(code >> 3) as usize] & (1 << (code & 7)) != 0
}

/// Grid index transforms for the eight symmetries of a 3x3 stencil.
fn transform(grid: &[u8; 9], which: usize) -> [u8; 9] {
    // Map destination index -> source index.
    const ROT90: [usize; 9] = [6, 3, 0, 7, 4, 1, 8, 5, 2];
    const MIRROR: [usize; 9] = [2, 1, 0, 5, 4, 3, 8, 7, 6];
    let mut out = *grid;
    for _ in 0..(which % 4) {
        let prev = out;
        for (dst, &src) in ROT90.iter().enumerate() {
            out[dst] = prev[src];
        }
    }
    if which >= 4 {
        let prev = out;
        for (dst, &src) in MIRROR.iter().enumerate() {
            out[dst] = prev[src];
        }
    }
    out
}

/// Codes a stencil character may stand for.
fn allowed_codes(c: u8) -> &'static [u16] {
    match c {
        b'X' => &[CODE_OWN],
        b'O' => &[CODE_OPP],
        b'.' => &[CODE_EMPTY],
        b'#' => &[CODE_BORDER],
        b'x' => &[CODE_OPP, CODE_EMPTY, CODE_BORDER],
        b'o' => &[CODE_OWN, CODE_EMPTY, CODE_BORDER],
        b'?' => &[CODE_OWN, CODE_OPP, CODE_EMPTY, CODE_BORDER],
        _ => unreachable!("bad stencil char"),
    }
}

fn build_pat3set() -> Box<[u8; 8192]> {
    let mut set = Box::new([0u8; 8192]);
    for src in PAT3_SRC {
        let grid: [u8; 9] = src.as_bytes().try_into().expect("stencil is 9 chars");
        for which in 0..8 {
            let g = transform(&grid, which);
            debug_assert_eq!(g[4], b'.');
            // Expand wildcards over the 8 neighbor positions.
            let mut codes = vec![0u16];
            for (i, &pos) in STENCIL_POS.iter().enumerate() {
                let mut next = Vec::with_capacity(codes.len() * 4);
                for &c in allowed_codes(g[pos]) {
                    for &base in &codes {
                        next.push(base | c << (2 * i));
                    }
                }
                codes = next;
            }
            for code in codes {
                set[(code >> 3) as usize] |= 1 << (code & 7);
            }
        }
    }
    set
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

    #[test]
    fn enclosing_hane_matches_for_black() {
        // Around E4: NW=D5 black, N=E5 white, NE=F5 black, rest empty.
        let b = setup(&["D5", "F5"], &["E5"]);
        assert!(pat3_match_for(&b, pt("E4"), Color::Black));
        assert!(!pat3_match_for(&b, pt("E4"), Color::White));
    }

    #[test]
    fn pattern_matches_under_rotation() {
        // The same hane shape rotated: stones to the south of E4.
        let b = setup(&["D3", "F3"], &["E3"]);
        assert!(pat3_match_for(&b, pt("E4"), Color::Black));
    }

    #[test]
    fn pattern_is_color_symmetric() {
        // Swap the colors of the hane shape; now white matches.
        let b = setup(&["E5"], &["D5", "F5"]);
        assert!(pat3_match_for(&b, pt("E4"), Color::White));
        assert!(!pat3_match_for(&b, pt("E4"), Color::Black));
    }

    #[test]
    fn empty_neighborhood_matches_nothing() {
        let b = Board::new(9, Rules::default());
        assert!(!pat3_match_for(&b, pt("E4"), Color::Black));
        assert!(!pat3_match_for(&b, pt("A1"), Color::Black));
    }

    #[test]
    fn env16_distinguishes_colors() {
        let b = setup(&["E5"], &["D4"]);
        let black_code = env16(&b, pt("E4"), Color::Black);
        let white_code = env16(&b, pt("E4"), Color::White);
        assert_ne!(black_code, white_code);
    }
}
