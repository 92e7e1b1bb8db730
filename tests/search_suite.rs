//! Search-level integration tests: determinism, tactical competence,
//! pass and resign behavior, and subtree reuse through the player.

use std::time::Duration;

use sente::board::{parse_coord, str_coord, Board, Color, Point, PASS};
use sente::player::{GenMove, Player};
use sente::playout::{DefaultPolicyFactory, PlayoutParam};
use sente::prior::DefaultPriorKnowledgeFactory;
use sente::rules::Rules;
use sente::search::{SearchConfig, UctSearch};

fn pt(s: &str, size: usize) -> Point {
    parse_coord(s, size).expect("coordinate")
}

fn deterministic_config(seed: u64) -> SearchConfig {
    SearchConfig {
        deterministic: true,
        seed,
        max_nodes: 30_000,
        early_abort: false,
        ..SearchConfig::default()
    }
}

fn make_search(config: SearchConfig, with_prior: bool) -> UctSearch {
    let mut search = UctSearch::new(
        config,
        Box::new(DefaultPolicyFactory::new(PlayoutParam::default())),
    );
    if with_prior {
        search.set_prior_knowledge(Box::new(DefaultPriorKnowledgeFactory::new(
            PlayoutParam::default(),
        )));
    }
    search
}

fn quick_player(size: usize, seed: u64, games: u64) -> Player {
    let mut player = Player::new(size, Rules::chinese(), deterministic_config(seed));
    player.config.max_games = games;
    player.config.max_time = Duration::from_secs(3600);
    player.config.resign_min_games = u64::MAX;
    player
}

// =====================================================================
// Determinism
// =====================================================================

#[test]
fn fixed_seed_single_thread_is_reproducible() {
    // Two fresh engines on the same empty board, same seed: identical
    // counts and identical selected move.
    let board = Board::new(9, Rules::chinese());
    let run = || {
        let mut search = make_search(deterministic_config(1), true);
        let result = search.search(&board, 400, Duration::from_secs(3600), &[], false);
        (result.best_move, search.move_values())
    };
    let (move_a, values_a) = run();
    let (move_b, values_b) = run();
    assert_eq!(move_a, move_b);
    assert_eq!(values_a.len(), values_b.len());
    for (a, b) in values_a.iter().zip(values_b.iter()) {
        assert_eq!(a.mv, b.mv);
        assert_eq!(a.count, b.count);
        assert_eq!(a.mean.to_bits(), b.mean.to_bits());
        assert_eq!(a.rave_count.to_bits(), b.rave_count.to_bits());
    }
}

#[test]
fn genmove_on_empty_board_stays_off_the_first_line() {
    // The root filter removes lonely first-line moves, so the opening
    // move lands somewhere sensible.
    let mut player = quick_player(9, 1, 400);
    match player.genmove(Color::Black) {
        GenMove::Move(mv) => {
            assert!(player.board().line(mv) >= 2, "played {}", str_coord(mv, 9));
        }
        other => panic!("expected a move, got {other:?}"),
    }
}

// =====================================================================
// Tactical competence
// =====================================================================

#[test]
fn search_takes_the_big_capture() {
    // A six-stone white block in atari at F5: black should capture.
    let mut board = Board::new(9, Rules::chinese());
    for m in ["C4", "C5", "C6", "D7", "E7", "F7", "D3", "E3", "F3", "G4", "G5", "G6"] {
        board.setup_stone(Color::Black, pt(m, 9)).unwrap();
    }
    for m in ["D4", "D5", "D6", "E4", "E5", "E6", "F4", "F6"] {
        board.setup_stone(Color::White, pt(m, 9)).unwrap();
    }
    assert!(board.in_atari(pt("D4", 9)));
    assert_eq!(board.the_liberty(pt("D4", 9)), pt("F5", 9));
    let mut search = make_search(deterministic_config(7), true);
    let result = search.search(&board, 400, Duration::from_secs(3600), &[], false);
    // Capturing wins everything: the search sees a huge value and the
    // capture leads the visit ranking.
    assert!(result.value > 0.9, "value {}", result.value);
    let values = search.move_values();
    let rank = values
        .iter()
        .position(|v| v.mv == pt("F5", 9))
        .expect("capture is a root child");
    assert!(rank <= 1, "capture ranked {rank}");
    // The knowledge pipeline singled the capture out.
    let f5 = values.iter().find(|v| v.mv == pt("F5", 9)).unwrap();
    assert!(f5.count > 0);
}

#[test]
fn multithreaded_search_agrees_on_a_forced_capture() {
    let mut board = Board::new(9, Rules::chinese());
    for m in ["C4", "C5", "C6", "D7", "E7", "F7", "D3", "E3", "F3", "G4", "G5", "G6"] {
        board.setup_stone(Color::Black, pt(m, 9)).unwrap();
    }
    for m in ["D4", "D5", "D6", "E4", "E5", "E6", "F4", "F6"] {
        board.setup_stone(Color::White, pt(m, 9)).unwrap();
    }
    let config = SearchConfig {
        num_threads: 2,
        seed: 7,
        max_nodes: 30_000,
        early_abort: false,
        ..SearchConfig::default()
    };
    let mut search = make_search(config, true);
    let result = search.search(&board, 800, Duration::from_secs(3600), &[], false);
    assert!(result.value > 0.85, "value {}", result.value);
    let rank = search
        .move_values()
        .iter()
        .position(|v| v.mv == pt("F5", 9))
        .expect("capture is a root child");
    assert!(rank <= 2, "capture ranked {rank}");
}

// =====================================================================
// Pass and resign behavior
// =====================================================================

#[test]
fn winning_side_may_pass_but_never_throws_the_game() {
    // Black owns the whole 5x5 board behind a living wall. Passing wins
    // outright, and any non-pass answer must stay legal.
    let mut player = quick_player(5, 3, 200);
    {
        let board = player.board_mut();
        for m in ["A2", "B2", "C2", "D2", "E2", "B1", "D1", "C4"] {
            board.setup_stone(Color::Black, pt(m, 5)).unwrap();
        }
    }
    assert!(player.board().area_score() > 0.0);
    match player.genmove(Color::Black) {
        GenMove::Resign => panic!("winning side resigned"),
        GenMove::Pass => {}
        GenMove::Move(mv) => {
            assert_ne!(mv, PASS);
        }
    }
}

/// White owns the board; black has one floating stone and the komi
/// against it.
fn lost_position(player: &mut Player) {
    let board = player.board_mut();
    for m in ["A2", "B2", "C2", "D2", "E2", "B4", "D4", "B1", "D1"] {
        board.setup_stone(Color::White, pt(m, 5)).unwrap();
    }
    board.setup_stone(Color::Black, pt("C5", 5)).unwrap();
}

#[test]
fn hopeless_position_triggers_resign() {
    let mut player = quick_player(5, 9, 300);
    player.config.resign_threshold = 0.35;
    player.config.resign_min_games = 100;
    lost_position(&mut player);
    assert_eq!(player.genmove(Color::Black), GenMove::Resign);
}

#[test]
fn resign_needs_the_minimum_game_count() {
    let mut player = quick_player(5, 9, 300);
    player.config.resign_threshold = 0.25;
    player.config.resign_min_games = u64::MAX;
    lost_position(&mut player);
    assert_ne!(player.genmove(Color::Black), GenMove::Resign);
}

// =====================================================================
// Subtree reuse
// =====================================================================

#[test]
fn reused_tree_carries_earlier_work_forward() {
    let mut player = quick_player(5, 5, 300);
    let first = player.genmove(Color::Black);
    let GenMove::Move(first_mv) = first else {
        panic!("expected a move, got {first:?}");
    };
    let reply = player
        .board()
        .points()
        .filter(|&p| p != first_mv)
        .find(|&p| player.board().is_legal(p, Color::White))
        .expect("white reply");
    player.play(Color::White, reply).unwrap();
    // The follow-up search starts from the reused subtree and still
    // produces a sane answer.
    match player.genmove(Color::Black) {
        GenMove::Move(mv) => assert!(player.board().move_count() == 3 && mv != PASS),
        GenMove::Pass => {}
        GenMove::Resign => panic!("unexpected resign"),
    }
}

// =====================================================================
// Mercy rule
// =====================================================================

#[test]
fn mercy_rule_shortens_lopsided_playouts() {
    // With the mercy rule on, searching a hugely lopsided position is
    // still accurate: black is far ahead and knows it.
    let mut board = Board::new(9, Rules::chinese());
    for row in ["3", "4", "5", "6", "7"] {
        for col in ["B", "C", "D", "E", "F", "G", "H"] {
            board
                .setup_stone(Color::Black, pt(&format!("{col}{row}"), 9))
                .unwrap();
        }
    }
    let mut search = make_search(deterministic_config(11), false);
    let result = search.search(&board, 200, Duration::from_secs(3600), &[], false);
    assert!(result.value > 0.8, "black should be winning, got {}", result.value);
}
