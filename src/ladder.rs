//! Ladder reading.
//!
//! Reads out forced capture races on low-liberty blocks: the attacker
//! fills liberties, the defender extends or counter-captures, until the
//! prey either reaches three liberties (escape) or runs out (capture).
//! Used by the move filters to drop hopeless ladder defenses and failing
//! chases, and by the prior knowledge for ladder bonuses.

use crate::board::{neighbors, Board, Color, Point, PointState};

/// Hard cap on reading depth; an unresolved ladder counts as escape.
const MAX_LADDER_DEPTH: usize = 200;

/// Result of reading one ladder.
#[derive(Debug, Clone)]
pub struct LadderReading {
    /// True if the prey block is captured with best play.
    pub captured: bool,
    /// Principal line of the reading, first move first.
    pub sequence: Vec<Point>,
}

/// Read the ladder on the block at `prey` with `to_move` playing first.
/// `to_move` may be either the owner of the block (defense) or the
/// opponent (chase).
pub fn read_ladder(board: &Board, prey: Point, to_move: Color) -> LadderReading {
    let prey_color = board
        .color_at(prey)
        .color()
        .expect("ladder prey must be a stone");
    let mut bd = board.clone();
    bd.set_to_play(to_move);
    if to_move == prey_color {
        let (escaped, line) = defender_escapes(&mut bd, prey, 0);
        LadderReading {
            captured: !escaped,
            sequence: line,
        }
    } else {
        let (captured, line) = attacker_captures(&mut bd, prey, 0);
        LadderReading {
            captured,
            sequence: line,
        }
    }
}

/// Attacker to move: try to fill the prey's liberties.
/// Returns (captured, principal line).
fn attacker_captures(bd: &mut Board, prey: Point, depth: usize) -> (bool, Vec<Point>) {
    if bd.color_at(prey) == PointState::Empty {
        return (true, Vec::new());
    }
    let libs: Vec<Point> = bd.liberties(bd.anchor(prey)).collect();
    if libs.len() >= 3 || depth > MAX_LADDER_DEPTH {
        return (false, Vec::new());
    }
    let attacker = bd.to_play();
    let mut best_escape: Option<Vec<Point>> = None;
    for &cand in &libs {
        if !bd.is_legal(cand, attacker) {
            continue;
        }
        if bd.play(cand).is_err() {
            continue;
        }
        if bd.color_at(prey) == PointState::Empty {
            bd.undo();
            return (true, vec![cand]);
        }
        let (escaped, line) = defender_escapes(bd, prey, depth + 1);
        bd.undo();
        let mut full = vec![cand];
        full.extend(line);
        if !escaped {
            return (true, full);
        }
        if best_escape.as_ref().map_or(true, |b| full.len() > b.len()) {
            best_escape = Some(full);
        }
    }
    (false, best_escape.unwrap_or_default())
}

/// Defender to move: extend or counter-capture.
/// Returns (escaped, principal line).
fn defender_escapes(bd: &mut Board, prey: Point, depth: usize) -> (bool, Vec<Point>) {
    if bd.color_at(prey) == PointState::Empty {
        return (false, Vec::new());
    }
    let anchor = bd.anchor(prey);
    let libs: Vec<Point> = bd.liberties(anchor).collect();
    if libs.len() >= 3 || depth > MAX_LADDER_DEPTH {
        return (true, Vec::new());
    }
    let defender = bd.to_play();
    let opp: PointState = defender.opponent().into();

    // Counter-capturing an adjacent attacker block in atari comes first.
    let mut candidates: Vec<Point> = Vec::new();
    let stones: Vec<Point> = bd.block_stones(anchor).collect();
    for &s in &stones {
        for n in neighbors(s) {
            if bd.color_at(n) == opp && bd.occupied_in_atari(n) {
                let lib = bd.the_liberty(n);
                if !candidates.contains(&lib) {
                    candidates.push(lib);
                }
            }
        }
    }
    for &lib in &libs {
        if !candidates.contains(&lib) {
            candidates.push(lib);
        }
    }

    let mut best_resistance: Vec<Point> = Vec::new();
    for cand in candidates {
        if !bd.is_legal(cand, defender) {
            continue;
        }
        if bd.play(cand).is_err() {
            continue;
        }
        let (captured, line) = attacker_captures(bd, prey, depth + 1);
        bd.undo();
        let mut full = vec![cand];
        full.extend(line);
        if !captured {
            return (true, full);
        }
        if full.len() > best_resistance.len() {
            best_resistance = full;
        }
    }
    (false, best_resistance)
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

    /// Classic ladder: black D4 in atari, the escape at E4 runs into the
    /// white net and dies against the edge.
    fn ladder_position() -> Board {
        setup(&["D4"], &["C4", "D5", "D3", "E5"])
    }

    #[test]
    fn losing_ladder_is_read_as_captured() {
        let b = ladder_position();
        let reading = read_ladder(&b, pt("D4"), Color::Black);
        assert!(reading.captured);
        assert!(
            reading.sequence.len() >= 6,
            "expected a long chase, got {:?}",
            reading.sequence
        );
        assert_eq!(reading.sequence[0], pt("E4"));
    }

    #[test]
    fn ladder_with_open_escape_is_not_captured() {
        // Without the net stone at E5 the prey runs free.
        let b = setup(&["D4"], &["C4", "D5", "D3"]);
        let reading = read_ladder(&b, pt("D4"), Color::Black);
        assert!(!reading.captured);
    }

    #[test]
    fn attacker_first_capture_of_atari_block() {
        // White prey at A1 with a single liberty; black captures at once.
        let b = setup(&["A2"], &["A1"]);
        let reading = read_ladder(&b, pt("A1"), Color::Black);
        assert!(reading.captured);
        assert_eq!(reading.sequence, vec![pt("B1")]);
    }

    #[test]
    fn three_liberty_block_escapes_immediately() {
        let b = setup(&["E5"], &["E6"]);
        let reading = read_ladder(&b, pt("E5"), Color::White);
        assert!(!reading.captured);
    }

    #[test]
    fn counter_capture_saves_the_prey() {
        // Black E5/E4 is in atari at E6, but the white stone E3 is in
        // atari too; capturing it gains breathing room.
        let b = setup(
            &["E5", "E4", "F3", "D3"],
            &["D4", "D5", "F4", "F5", "E3"],
        );
        assert!(b.in_atari(pt("E5")));
        assert!(b.occupied_in_atari(pt("E3")));
        let reading = read_ladder(&b, pt("E5"), Color::Black);
        assert!(!reading.captured);
        assert_eq!(reading.sequence[0], pt("E2"));
    }
}
