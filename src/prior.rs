//! Default prior knowledge.
//!
//! Initializes the children of a freshly expanded node with virtual
//! (value, count) pairs. The heuristic probes the playout policy once to
//! see whether it has a tactical answer, scans the board globally for
//! pattern matches and atari-setting moves, adds a locality bonus by
//! common-fate-graph distance from the last move, and folds in ladder
//! knowledge: capturing a laddered block is encouraged, running a doomed
//! ladder is discouraged.

use crate::board::{neighbors, Board, Color, Point, PointState, GRID_LEN, PASS};
use crate::knowledge::{MoveInfo, PriorKnowledge, PriorKnowledgeFactory};
use crate::ladder::read_ladder;
use crate::patterns::pat3_match_for;
use crate::playout::{
    would_be_self_atari, DefaultPlayoutPolicy, PlayoutMoveType, PlayoutParam, PlayoutPolicy,
};

/// Largest self-atari that may still be a nakade shape.
const NAKADE_LIMIT: usize = 3;

/// Blend a prior into a move, count-weighted (an existing prior is
/// merged, not overwritten).
fn add_prior(m: &mut MoveInfo, value: f32, count: f32) {
    if m.prior_count <= 0.0 {
        m.prior_value = value;
        m.prior_count = count;
    } else {
        let total = m.prior_count + count;
        m.prior_value = (m.prior_value * m.prior_count + value * count) / total;
        m.prior_count = total;
    }
}

fn set_prior(m: &mut MoveInfo, value: f32, count: f32) {
    m.prior_value = value;
    m.prior_count = count;
}

/// Does playing `p` put any opponent block into atari?
fn sets_atari(board: &Board, p: Point, color: Color) -> bool {
    let opp: PointState = color.opponent().into();
    neighbors(p)
        .iter()
        .any(|&n| board.color_at(n) == opp && board.num_liberties(n) == 2)
}

/// Crude test for a nakade-sized eye space around `p`.
fn in_small_eye_space(board: &Board, p: Point, attacker: Color) -> bool {
    let attacker_state: PointState = attacker.into();
    let mut size = 1 + board.num_neighbors(p, attacker) + board.num_empty_neighbors(p);
    if size > NAKADE_LIMIT {
        return false;
    }
    for n in neighbors(p) {
        if board.is_empty(n) || board.color_at(n) == attacker_state {
            size += board.num_neighbors(n, attacker) + board.num_empty_neighbors(n);
            size -= 1;
            if size > NAKADE_LIMIT {
                return false;
            }
        }
    }
    true
}

/// Self-ataris that are almost never worth trying: too many stones, or
/// not a nakade attempt.
fn bad_self_atari(board: &Board, p: Point, color: Color) -> bool {
    if !would_be_self_atari(board, p, color) {
        return false;
    }
    let mut stones = 1;
    let own: PointState = color.into();
    let mut seen: Vec<Point> = Vec::new();
    for n in neighbors(p) {
        if board.color_at(n) == own {
            let a = board.anchor(n);
            if !seen.contains(&a) {
                seen.push(a);
                stones += board.num_stones(n);
            }
        }
    }
    if stones > NAKADE_LIMIT {
        return true;
    }
    !in_small_eye_space(board, p, color)
}

/// Common-fate-graph distances from `start`: stepping onto a stone of
/// the block costs nothing, everything else costs one.
pub fn cfg_distances(board: &Board, start: Point, max_dist: u8) -> Vec<u8> {
    let mut dist = vec![u8::MAX; GRID_LEN];
    let mut queue = std::collections::VecDeque::new();
    dist[start] = 0;
    queue.push_back(start);
    while let Some(p) = queue.pop_front() {
        for n in neighbors(p) {
            if board.color_at(n) == PointState::Border {
                continue;
            }
            let step = if board.color_at(n).is_stone()
                && board.color_at(n) == board.color_at(p)
            {
                0
            } else {
                1
            };
            let d = dist[p].saturating_add(step);
            if d < dist[n] && d <= max_dist {
                dist[n] = d;
                if step == 0 {
                    queue.push_front(n);
                } else {
                    queue.push_back(n);
                }
            }
        }
    }
    dist
}

/// The default prior knowledge, probing its own playout policy.
pub struct DefaultPriorKnowledge {
    policy: DefaultPlayoutPolicy,
}

impl DefaultPriorKnowledge {
    pub fn new(param: PlayoutParam) -> Self {
        DefaultPriorKnowledge {
            policy: DefaultPlayoutPolicy::new(param),
        }
    }

    fn ladder_knowledge(&self, board: &Board, moves: &mut [MoveInfo]) {
        let to_play = board.to_play();
        let own: PointState = to_play.into();
        let opp: PointState = to_play.opponent().into();
        for a in board.block_anchors().collect::<Vec<_>>() {
            if board.color_at(a) == opp
                && board.num_liberties(a) == 2
                && board.num_stones(a) >= 2
            {
                let reading = read_ladder(board, a, to_play);
                if reading.captured && !reading.sequence.is_empty() {
                    let capture = reading.sequence[0];
                    if let Some(m) = moves.iter_mut().find(|m| m.mv == capture) {
                        add_prior(m, 1.0, 3.0);
                    }
                }
            } else if board.color_at(a) == own && board.in_atari(a) {
                let reading = read_ladder(board, a, to_play);
                if reading.captured {
                    let escape = board.the_liberty(a);
                    if let Some(m) = moves.iter_mut().find(|m| m.mv == escape) {
                        add_prior(m, 0.1, 3.0);
                    }
                }
            }
        }
    }
}

impl PriorKnowledge for DefaultPriorKnowledge {
    fn process_position(
        &mut self,
        board: &Board,
        moves: &mut [MoveInfo],
        rng: &mut fastrand::Rng,
    ) {
        let to_play = board.to_play();

        // Probe the policy: does it have a tactical answer here?
        self.policy.start_playout(board, rng);
        let _probe = self.policy.generate_move(board, rng);
        let probe_type = self.policy.move_type();
        let is_full_board_random =
            matches!(probe_type, PlayoutMoveType::Random | PlayoutMoveType::Pass);
        let equivalent: Vec<Point> = self.policy.equivalent_best_moves().to_vec();
        self.policy.end_playout();

        // Global pattern and atari scan.
        let mut is_pattern = vec![false; moves.len()];
        let mut is_atari = vec![false; moves.len()];
        let mut any_heuristic = false;
        for (i, m) in moves.iter().enumerate() {
            if m.mv == PASS {
                continue;
            }
            if pat3_match_for(board, m.mv, to_play) {
                is_pattern[i] = true;
                any_heuristic = true;
            }
            if sets_atari(board, m.mv, to_play) {
                is_atari[i] = true;
                any_heuristic = true;
            }
        }

        let is_small = board.size() < 15;
        let default_count = if is_small { 9.0 } else { 18.0 };

        for (i, m) in moves.iter_mut().enumerate() {
            if m.mv == PASS {
                set_prior(m, 0.1, default_count);
            } else if is_full_board_random && !any_heuristic {
                if bad_self_atari(board, m.mv, to_play) {
                    set_prior(m, 0.1, default_count);
                }
            } else if is_full_board_random {
                if bad_self_atari(board, m.mv, to_play) {
                    set_prior(m, 0.1, default_count);
                } else if is_atari[i] {
                    set_prior(m, 1.0, 3.0);
                } else if is_pattern[i] {
                    set_prior(m, 1.0, 3.0);
                } else {
                    set_prior(m, 0.5, 3.0);
                }
            } else {
                if bad_self_atari(board, m.mv, to_play) {
                    set_prior(m, 0.1, default_count);
                } else if is_atari[i] {
                    set_prior(m, 0.8, default_count);
                } else if is_pattern[i] {
                    set_prior(m, 0.8, default_count);
                } else {
                    set_prior(m, 0.4, default_count);
                }
            }
        }
        if !is_full_board_random {
            for m in moves.iter_mut() {
                if equivalent.contains(&m.mv) {
                    set_prior(m, 1.0, default_count);
                }
            }
        }

        // Locality bonus around the last move.
        if let Some((_, last)) = board.last_move() {
            if last != PASS {
                let dist = cfg_distances(board, last, 3);
                let count = if is_small { 4.0 } else { 5.0 };
                for m in moves.iter_mut() {
                    let value = if m.mv == PASS {
                        0.1
                    } else {
                        match dist[m.mv] {
                            1 => 1.0,
                            2 | 3 => 0.6,
                            _ => 0.1,
                        }
                    };
                    add_prior(m, value, count);
                }
            }
        }

        self.ladder_knowledge(board, moves);
    }
}

/// Factory for per-thread [`DefaultPriorKnowledge`] instances.
pub struct DefaultPriorKnowledgeFactory {
    pub param: PlayoutParam,
}

impl DefaultPriorKnowledgeFactory {
    pub fn new(param: PlayoutParam) -> Self {
        DefaultPriorKnowledgeFactory { param }
    }
}

impl PriorKnowledgeFactory for DefaultPriorKnowledgeFactory {
    fn create(&self) -> Box<dyn PriorKnowledge + Send> {
        Box::new(DefaultPriorKnowledge::new(self.param.clone()))
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

    fn infos(board: &Board) -> Vec<MoveInfo> {
        let mut v: Vec<MoveInfo> = board
            .points()
            .filter(|&p| board.is_empty(p))
            .map(MoveInfo::new)
            .collect();
        v.push(MoveInfo::new(PASS));
        v
    }

    #[test]
    fn pass_gets_a_low_prior() {
        let b = Board::new(9, Rules::default());
        let mut moves = infos(&b);
        let mut prior = DefaultPriorKnowledge::new(PlayoutParam::default());
        let mut rng = fastrand::Rng::with_seed(1);
        prior.process_position(&b, &mut moves, &mut rng);
        let pass = moves.iter().find(|m| m.mv == PASS).unwrap();
        assert!(pass.prior_count > 0.0);
        assert!(pass.prior_value <= 0.2);
    }

    #[test]
    fn atari_setting_move_is_encouraged() {
        // White D4/E4 has two liberties; black F4 sets atari.
        let mut b = setup(&["D5", "E5", "D3", "E3"], &["D4", "E4"]);
        b.play_as(Color::Black, pt("G7")).unwrap();
        b.play_as(Color::White, pt("H8")).unwrap();
        assert_eq!(b.num_liberties(pt("D4")), 2);
        let mut moves = infos(&b);
        let mut prior = DefaultPriorKnowledge::new(PlayoutParam::default());
        let mut rng = fastrand::Rng::with_seed(1);
        prior.process_position(&b, &mut moves, &mut rng);
        let f4 = moves.iter().find(|m| m.mv == pt("F4")).unwrap();
        let far = moves.iter().find(|m| m.mv == pt("A9")).unwrap();
        assert!(f4.prior_count > 0.0);
        assert!(
            f4.prior_value > far.prior_value,
            "atari move {f4:?} vs quiet move {far:?}"
        );
    }

    #[test]
    fn locality_bonus_prefers_nearby_points() {
        let mut b = Board::new(9, Rules::default());
        b.play(pt("E5")).unwrap();
        let mut moves = infos(&b);
        let mut prior = DefaultPriorKnowledge::new(PlayoutParam::default());
        let mut rng = fastrand::Rng::with_seed(1);
        prior.process_position(&b, &mut moves, &mut rng);
        let near = moves.iter().find(|m| m.mv == pt("E4")).unwrap();
        let far = moves.iter().find(|m| m.mv == pt("A1")).unwrap();
        assert!(near.prior_value > far.prior_value);
    }

    #[test]
    fn small_nakade_self_atari_is_tolerated() {
        // A lone throw-in into a two-point eye space can be nakade.
        let mut b = setup(&["A2", "B2", "C2", "C1"], &[]);
        b.set_to_play(Color::White);
        assert!(would_be_self_atari(&b, pt("B1"), Color::White));
        assert!(!bad_self_atari(&b, pt("B1"), Color::White));
    }

    #[test]
    fn big_self_atari_is_discouraged() {
        // White filling C2 leaves a five-stone block with one liberty:
        // far beyond nakade size.
        let mut b = setup(
            &["A3", "B3", "C3", "D3", "D2", "D1"],
            &["A1", "A2", "B1", "B2"],
        );
        b.set_to_play(Color::White);
        assert!(bad_self_atari(&b, pt("C2"), Color::White));
        let mut moves = infos(&b);
        let mut prior = DefaultPriorKnowledge::new(PlayoutParam::default());
        let mut rng = fastrand::Rng::with_seed(1);
        prior.process_position(&b, &mut moves, &mut rng);
        let c2 = moves.iter().find(|m| m.mv == pt("C2")).unwrap();
        assert!(c2.prior_count > 0.0);
        assert!(c2.prior_value <= 0.2);
    }

    #[test]
    fn cfg_distance_rides_blocks() {
        // Stones of one block are distance 0 from each other, so points
        // beyond a long block stay close in CFG terms.
        let b = setup(&["C3", "D3", "E3", "F3"], &[]);
        let dist = cfg_distances(&b, pt("C3"), 3);
        assert_eq!(dist[pt("F3")], 0);
        assert_eq!(dist[pt("G3")], 1);
        assert_eq!(dist[pt("C4")], 1);
    }
}
