//! Board-level integration tests: liberties, undo round trips, hashing,
//! ko and super-ko, and area scoring.

use sente::board::{neighbors, parse_coord, Board, Color, IllegalMove, Point, PASS};
use sente::rules::{handicap_points, Rules};

/// Parse a sequence of moves and apply them, alternating from black.
fn setup_position(size: usize, rules: Rules, moves: &[&str]) -> Board {
    let mut board = Board::new(size, rules);
    for mv in moves {
        let pt = parse_coord(mv, size).unwrap_or_else(|| panic!("bad coordinate {mv}"));
        board
            .play(pt)
            .unwrap_or_else(|e| panic!("illegal move {mv}: {e}"));
    }
    board
}

fn pt(s: &str, size: usize) -> Point {
    parse_coord(s, size).expect("coordinate")
}

// =====================================================================
// Liberties
// =====================================================================

#[test]
fn liberty_counts_match_a_fresh_recount() {
    let board = setup_position(
        9,
        Rules::chinese(),
        &["D4", "E4", "D5", "E5", "C4", "F4", "E3", "D3", "F5", "F3", "E6", "G4"],
    );
    for anchor in board.block_anchors().collect::<Vec<_>>() {
        let mut recount: Vec<Point> = Vec::new();
        for stone in board.block_stones(anchor).collect::<Vec<_>>() {
            for n in neighbors(stone) {
                if board.is_empty(n) && !recount.contains(&n) {
                    recount.push(n);
                }
            }
        }
        assert_eq!(
            board.num_liberties(anchor),
            recount.len(),
            "anchor {anchor} liberty mismatch"
        );
    }
}

// =====================================================================
// Undo round trips
// =====================================================================

#[test]
fn every_legal_move_round_trips_bit_identically() {
    let mut board = setup_position(
        9,
        Rules::chinese(),
        &["D4", "E4", "D5", "E5", "C4", "F4", "E3", "D3"],
    );
    let hash = board.hash();
    let hash_to_play = board.hash_with_to_play();
    let to_play = board.to_play();
    let legal: Vec<Point> = board
        .points()
        .filter(|&p| board.is_legal(p, to_play))
        .collect();
    assert!(!legal.is_empty());
    for mv in legal {
        board.play(mv).unwrap();
        assert!(board.undo(), "undo after {mv}");
        assert_eq!(board.hash(), hash, "hash differs after undoing {mv}");
        assert_eq!(board.hash_with_to_play(), hash_to_play);
        assert!(board.check_consistency(), "blocks differ after undoing {mv}");
    }
    // Pass round-trips too.
    board.play(PASS).unwrap();
    assert!(board.undo());
    assert_eq!(board.hash_with_to_play(), hash_to_play);
}

#[test]
fn undo_through_a_capture_restores_everything() {
    let mut board = Board::new(9, Rules::chinese());
    for (color, mv) in [
        (Color::Black, "D4"),
        (Color::White, "D5"),
        (Color::Black, "C5"),
        (Color::White, "H8"),
        (Color::Black, "E5"),
        (Color::White, "H7"),
    ] {
        board.play_as(color, pt(mv, 9)).unwrap();
    }
    let hash = board.hash();
    board.play_as(Color::Black, pt("D6", 9)).unwrap();
    assert!(board.last_move_info().is_capture);
    assert!(board.undo());
    assert_eq!(board.hash(), hash);
    assert_eq!(board.num_liberties(pt("D5", 9)), 1);
    assert!(board.check_consistency());
}

// =====================================================================
// Hashing
// =====================================================================

#[test]
fn incremental_hash_equals_position_rebuilt_from_stones() {
    // A sequence with a capture: the incremental hash of the final
    // position must equal the hash of the same stones set up directly.
    let board = setup_position(
        9,
        Rules::chinese(),
        &["D4", "D5", "C5", "E5", "E4", "D6", "D3", "C4", "B4", "B5", "C3"],
    );
    let mut rebuilt = Board::new(9, Rules::chinese());
    for p in board.points() {
        if let Some(color) = board.color_at(p).color() {
            rebuilt.setup_stone(color, p).unwrap();
        }
    }
    assert_eq!(board.hash(), rebuilt.hash());
}

#[test]
fn hash_distinguishes_side_to_move() {
    let mut board = Board::new(9, Rules::chinese());
    board.play(pt("E5", 9)).unwrap();
    let stones_only = board.hash();
    let white_to_play = board.hash_with_to_play();
    board.set_to_play(Color::Black);
    assert_ne!(board.hash_with_to_play(), white_to_play);
    assert_eq!(board.hash(), stones_only);
}

// =====================================================================
// Ko and super-ko
// =====================================================================

/// Build the textbook ko around D3 on a 5x5 board: black's capture at
/// D2 takes the white stone at D3 and opens the ko.
fn ko_board(rules: Rules) -> Board {
    setup_position(
        5,
        rules,
        &["C3", "D3", "D4", "C2", "E3", "D1", "A5", "E2", "D2"],
    )
}

#[test]
fn simple_ko_blocks_immediate_recapture_only() {
    let mut board = ko_board(Rules::japanese());
    let d3 = pt("D3", 5);
    assert!(!board.is_legal(d3, Color::White));
    assert_eq!(board.play(d3), Err(IllegalMove::Ko));
    // After a ko threat exchange the recapture is open again.
    board.play(pt("B4", 5)).unwrap();
    board.play(pt("B5", 5)).unwrap();
    assert!(board.is_legal(d3, Color::White));
    board.play(d3).unwrap();
}

#[test]
fn positional_superko_still_blocks_after_ko_is_disturbed() {
    let mut board = ko_board(Rules::chinese());
    // Hand the move back and forth: the simple-ko point is gone, the
    // hash history still forbids recreating the earlier position.
    board.set_to_play(Color::Black);
    board.set_to_play(Color::White);
    assert_eq!(board.ko_point(), 0);
    assert_eq!(board.play(pt("D3", 5)), Err(IllegalMove::Repetition));
}

// =====================================================================
// Scoring
// =====================================================================

#[test]
fn final_score_is_a_result_string() {
    let mut board = Board::new(9, Rules::chinese());
    board.setup_stone(Color::Black, pt("E5", 9)).unwrap();
    board.setup_stone(Color::White, pt("E4", 9)).unwrap();
    board.setup_stone(Color::White, pt("D5", 9)).unwrap();
    let s = board.score_string();
    assert!(
        s.starts_with("B+") || s.starts_with("W+"),
        "unexpected score string {s}"
    );
    // The numeric part parses.
    let num: f32 = s[2..].parse().expect("numeric score");
    assert!(num > 0.0);
}

#[test]
fn two_passes_on_empty_board_score_komi_for_white() {
    let mut board = Board::new(9, Rules::chinese());
    board.play(PASS).unwrap();
    board.play(PASS).unwrap();
    assert_eq!(board.consecutive_passes(), 2);
    assert_eq!(board.area_score(), -7.5);
    assert_eq!(board.score_string(), "W+7.5");
}

#[test]
fn filled_playout_scores_whole_board() {
    // Black wall splits a 5x5 board; each side owns its region.
    let mut board = Board::new(5, Rules::chinese());
    for m in ["C1", "C2", "C3", "C4", "C5"] {
        board.setup_stone(Color::Black, pt(m, 5)).unwrap();
    }
    for m in ["D1", "D2", "D3", "D4", "D5"] {
        board.setup_stone(Color::White, pt(m, 5)).unwrap();
    }
    // Black: 5 stones + 10 territory; white: 5 + 5; komi 7.5.
    assert_eq!(board.area_score(), 15.0 - 10.0 - 7.5);
}

// =====================================================================
// Handicap tables
// =====================================================================

#[test]
fn nineteen_by_nineteen_five_stone_set() {
    let points = handicap_points(19, 5).unwrap();
    assert_eq!(points.len(), 5);
    let mut set = points.clone();
    set.sort_unstable();
    set.dedup();
    assert_eq!(set.len(), 5, "handicap points must be distinct");
    for expected in [(4, 4), (16, 16), (4, 16), (16, 4), (10, 10)] {
        assert!(points.contains(&expected), "missing {expected:?}");
    }
}

// =====================================================================
// Rules
// =====================================================================

#[test]
fn suicide_depends_on_rules() {
    let build = |rules: Rules| {
        let mut b = Board::new(9, rules);
        for m in ["A2", "B2", "C1"] {
            b.setup_stone(Color::Black, pt(m, 9)).unwrap();
        }
        b.setup_stone(Color::White, pt("A1", 9)).unwrap();
        b.set_to_play(Color::White);
        b
    };
    // White B1 merges with A1 into a block with no liberties.
    let mut forbidden = build(Rules::chinese());
    assert_eq!(forbidden.play(pt("B1", 9)), Err(IllegalMove::Suicide));
    let mut allowed = build(Rules::tromp_taylor());
    assert!(allowed.play(pt("B1", 9)).is_ok());
    assert!(allowed.is_empty(pt("A1", 9)));
    assert!(allowed.is_empty(pt("B1", 9)));
}

#[test]
fn game_length_ceiling_rejects_runaway_games() {
    let mut board = Board::new(3, Rules::japanese());
    let mut result = Ok(());
    for _ in 0..(10 * 9 + 1) {
        result = board.play(PASS);
        if result.is_err() {
            break;
        }
    }
    assert_eq!(result, Err(IllegalMove::GameTooLong));
}
