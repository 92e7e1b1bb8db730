//! Playout policies for the random rollout phase.
//!
//! A policy is a stateful object owned by one worker thread. The search
//! calls `start_playout` when a rollout begins, `generate_move` once per
//! move, `on_play` after every executed move, and `end_playout` when the
//! rollout is scored.
//!
//! A policy must return a legal move for the side to move, or pass. It
//! must not pass while any empty point is still generatable (legal and
//! not completely surrounded); this guarantees every rollout ends in a
//! position scorable by area counting after two consecutive passes.
//!
//! The default policy generates moves by priority tiers: atari capture,
//! atari defense, low-liberty tactics around the last move, 3x3 patterns
//! around the last two moves, global captures, then pure random. One move
//! is chosen uniformly from the first non-empty tier; self-atari and
//! clump corrections may veto and replace the choice.

use std::fmt;

use crate::board::{
    all_neighbors, neighbors, Board, Color, Point, PointState, PASS,
};
use crate::patterns::pat3_match;

/// Which tier produced the last generated move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayoutMoveType {
    AtariCapture,
    AtariDefend,
    LowLib,
    Pattern,
    Capture,
    Random,
    SelfAtariCorrection,
    ClumpCorrection,
    Pass,
}

impl PlayoutMoveType {
    pub const COUNT: usize = 9;

    fn index(self) -> usize {
        match self {
            PlayoutMoveType::AtariCapture => 0,
            PlayoutMoveType::AtariDefend => 1,
            PlayoutMoveType::LowLib => 2,
            PlayoutMoveType::Pattern => 3,
            PlayoutMoveType::Capture => 4,
            PlayoutMoveType::Random => 5,
            PlayoutMoveType::SelfAtariCorrection => 6,
            PlayoutMoveType::ClumpCorrection => 7,
            PlayoutMoveType::Pass => 8,
        }
    }
}

impl fmt::Display for PlayoutMoveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlayoutMoveType::AtariCapture => "atari_capture",
            PlayoutMoveType::AtariDefend => "atari_defend",
            PlayoutMoveType::LowLib => "low_lib",
            PlayoutMoveType::Pattern => "pattern",
            PlayoutMoveType::Capture => "capture",
            PlayoutMoveType::Random => "random",
            PlayoutMoveType::SelfAtariCorrection => "self_atari_correction",
            PlayoutMoveType::ClumpCorrection => "clump_correction",
            PlayoutMoveType::Pass => "pass",
        };
        f.write_str(s)
    }
}

/// Generator of one move per call during the rollout phase.
pub trait PlayoutPolicy {
    fn start_playout(&mut self, board: &Board, rng: &mut fastrand::Rng);

    /// Produce a legal move for the side to move, or `PASS` only when no
    /// generatable point remains.
    fn generate_move(&mut self, board: &Board, rng: &mut fastrand::Rng) -> Point;

    /// Called after every move executed in the rollout.
    fn on_play(&mut self, board: &Board);

    fn end_playout(&mut self);

    /// Tier of the most recently generated move.
    fn move_type(&self) -> PlayoutMoveType {
        PlayoutMoveType::Random
    }

    /// Equivalent best moves of the last generation (the played move was
    /// chosen uniformly from this list). Empty for pure random moves.
    fn equivalent_best_moves(&self) -> &[Point] {
        &[]
    }
}

/// Creates per-thread policy instances.
pub trait PlayoutPolicyFactory: Send + Sync {
    fn create(&self) -> Box<dyn PlayoutPolicy + Send>;
}

/// Tier and correction toggles for the default policy.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayoutParam {
    pub respond_to_atari: bool,
    pub low_lib_tactics: bool,
    pub use_patterns: bool,
    pub global_capture: bool,
    pub self_atari_correction: bool,
    pub use_clump_correction: bool,
    /// Collect per-tier move statistics. Costs a little time.
    pub statistics_enabled: bool,
}

impl Default for PlayoutParam {
    fn default() -> Self {
        PlayoutParam {
            respond_to_atari: true,
            low_lib_tactics: true,
            use_patterns: true,
            global_capture: true,
            self_atari_correction: true,
            use_clump_correction: false,
            statistics_enabled: false,
        }
    }
}

/// Per-tier move counts, collected when enabled.
#[derive(Debug, Clone, Default)]
pub struct PolicyStatistics {
    pub nu_moves: u64,
    pub nu_by_type: [u64; PlayoutMoveType::COUNT],
}

impl PolicyStatistics {
    pub fn clear(&mut self) {
        *self = PolicyStatistics::default();
    }
}

impl fmt::Display for PolicyStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "moves: {}", self.nu_moves)?;
        for (i, label) in [
            "atari_capture",
            "atari_defend",
            "low_lib",
            "pattern",
            "capture",
            "random",
            "self_atari_correction",
            "clump_correction",
            "pass",
        ]
        .iter()
        .enumerate()
        {
            writeln!(f, "{label}: {}", self.nu_by_type[i])?;
        }
        Ok(())
    }
}

/// The default tiered policy.
pub struct DefaultPlayoutPolicy {
    param: PlayoutParam,
    move_type: PlayoutMoveType,
    /// Candidate list of the winning tier.
    moves: Vec<Point>,
    /// Anchors of blocks that may be in atari (capture generator state).
    capture_candidates: Vec<Point>,
    /// Shuffled empty points for the pure random tier, consumed from the
    /// back.
    empties: Vec<Point>,
    statistics: PolicyStatistics,
}

impl DefaultPlayoutPolicy {
    pub fn new(param: PlayoutParam) -> Self {
        DefaultPlayoutPolicy {
            param,
            move_type: PlayoutMoveType::Pass,
            moves: Vec::new(),
            capture_candidates: Vec::new(),
            empties: Vec::new(),
            statistics: PolicyStatistics::default(),
        }
    }

    pub fn statistics(&self) -> &PolicyStatistics {
        &self.statistics
    }

    pub fn clear_statistics(&mut self) {
        self.statistics.clear();
    }

    // ------------------------------------------------------------------
    // Tier generators. Each fills self.moves; candidates are not yet
    // checked for legality.
    // ------------------------------------------------------------------

    /// Capture the opponent block the last move left in atari.
    fn generate_atari_capture(&mut self, board: &Board) {
        let Some((color, last)) = board.last_move() else {
            return;
        };
        if last == PASS || color == board.to_play() {
            return;
        }
        if board.occupied_in_atari(last) {
            self.moves.push(board.the_liberty(last));
        }
    }

    /// Escape or counter-capture for own blocks the last move put in
    /// atari.
    fn generate_atari_defense(&mut self, board: &Board) {
        let Some((_, last)) = board.last_move() else {
            return;
        };
        if last == PASS {
            return;
        }
        let own: PointState = board.to_play().into();
        let mut seen: Vec<Point> = Vec::new();
        for n in neighbors(last) {
            if board.color_at(n) != own || !board.occupied_in_atari(n) {
                continue;
            }
            let anchor = board.anchor(n);
            if seen.contains(&anchor) {
                continue;
            }
            seen.push(anchor);
            // Counter-capture any adjacent opponent block in atari.
            let opp: PointState = board.to_play().opponent().into();
            let mut opp_seen: Vec<Point> = Vec::new();
            for s in board.block_stones(anchor).collect::<Vec<_>>() {
                for nn in neighbors(s) {
                    if board.color_at(nn) == opp && board.occupied_in_atari(nn) {
                        let oa = board.anchor(nn);
                        if !opp_seen.contains(&oa) {
                            opp_seen.push(oa);
                            self.moves.push(board.the_liberty(nn));
                        }
                    }
                }
            }
            // Escape on the last liberty if that actually gains breath.
            let lib = board.the_liberty(anchor);
            if gains_liberties(board, anchor, lib) {
                self.moves.push(lib);
            }
        }
    }

    /// Liberty-gaining moves for own two-liberty blocks near the last
    /// move.
    fn generate_low_lib(&mut self, board: &Board) {
        let Some((_, last)) = board.last_move() else {
            return;
        };
        if last == PASS {
            return;
        }
        let own: PointState = board.to_play().into();
        let mut seen: Vec<Point> = Vec::new();
        for n in neighbors(last) {
            if board.color_at(n) != own || board.num_liberties(n) != 2 {
                continue;
            }
            let anchor = board.anchor(n);
            if seen.contains(&anchor) {
                continue;
            }
            seen.push(anchor);
            for lib in board.liberties(anchor).collect::<Vec<_>>() {
                if gains_liberties(board, anchor, lib) {
                    self.moves.push(lib);
                }
            }
        }
    }

    /// 3x3 pattern matches in the neighborhood of the last two moves.
    fn generate_pattern(&mut self, board: &Board) {
        let mut push_around = |pt: Point, moves: &mut Vec<Point>| {
            for n in all_neighbors(pt) {
                if board.is_empty(n) && !moves.contains(&n) && pat3_match(board, n) {
                    moves.push(n);
                }
            }
        };
        if let Some((_, last)) = board.last_move() {
            if last != PASS {
                push_around(last, &mut self.moves);
            }
        }
        if let Some((_, last2)) = board.second_last_move() {
            if last2 != PASS {
                push_around(last2, &mut self.moves);
            }
        }
    }

    /// Global captures from the incrementally maintained candidate list.
    fn generate_capture(&mut self, board: &Board) {
        let opp: PointState = board.to_play().opponent().into();
        let mut i = 0;
        while i < self.capture_candidates.len() {
            let p = self.capture_candidates[i];
            if !board.occupied_in_atari(p) {
                self.capture_candidates.swap_remove(i);
                continue;
            }
            if board.color_at(p) == opp {
                self.moves.push(board.the_liberty(p));
            }
            i += 1;
        }
    }

    /// Pure random from the shuffled empty-point list. Filled points are
    /// dropped; non-generatable empty points stay for later.
    fn generate_pure_random(&mut self, board: &Board) -> Option<Point> {
        let mut i = self.empties.len();
        while i > 0 {
            i -= 1;
            let p = self.empties[i];
            if !board.is_empty(p) {
                self.empties.swap_remove(i);
                continue;
            }
            if is_generatable(board, p) {
                return Some(p);
            }
        }
        None
    }

    /// Pick a legal candidate uniformly at random from self.moves,
    /// discarding failures.
    fn select_from_moves(&mut self, board: &Board, rng: &mut fastrand::Rng) -> Option<Point> {
        while !self.moves.is_empty() {
            let i = rng.usize(..self.moves.len());
            let mv = self.moves[i];
            if is_generatable(board, mv) {
                return Some(mv);
            }
            self.moves.swap_remove(i);
        }
        None
    }

    /// Self-atari and clump corrections; may replace the move.
    fn correct_move(&mut self, board: &Board, mv: Point) -> Point {
        if self.param.self_atari_correction {
            if let Some(better) = self_atari_correction(board, mv) {
                self.move_type = PlayoutMoveType::SelfAtariCorrection;
                self.moves.clear();
                self.moves.push(better);
                return better;
            }
        }
        if self.param.use_clump_correction {
            if let Some(better) = clump_correction(board, mv) {
                self.move_type = PlayoutMoveType::ClumpCorrection;
                self.moves.clear();
                self.moves.push(better);
                return better;
            }
        }
        mv
    }

    fn record(&mut self, mv: Point) -> Point {
        if self.param.statistics_enabled {
            self.statistics.nu_moves += 1;
            self.statistics.nu_by_type[self.move_type.index()] += 1;
        }
        mv
    }
}

impl PlayoutPolicy for DefaultPlayoutPolicy {
    fn start_playout(&mut self, board: &Board, rng: &mut fastrand::Rng) {
        self.moves.clear();
        self.capture_candidates.clear();
        for a in board.block_anchors() {
            if board.in_atari(a) {
                self.capture_candidates.push(a);
            }
        }
        self.empties.clear();
        self.empties.extend(board.points().filter(|&p| board.is_empty(p)));
        rng.shuffle(&mut self.empties);
    }

    fn generate_move(&mut self, board: &Board, rng: &mut fastrand::Rng) -> Point {
        self.moves.clear();

        if self.param.respond_to_atari {
            self.move_type = PlayoutMoveType::AtariCapture;
            self.generate_atari_capture(board);
            if let Some(mv) = self.select_from_moves(board, rng) {
                let mv = self.correct_move(board, mv);
                return self.record(mv);
            }
            self.moves.clear();
            self.move_type = PlayoutMoveType::AtariDefend;
            self.generate_atari_defense(board);
            if let Some(mv) = self.select_from_moves(board, rng) {
                let mv = self.correct_move(board, mv);
                return self.record(mv);
            }
        }

        if self.param.low_lib_tactics {
            self.moves.clear();
            self.move_type = PlayoutMoveType::LowLib;
            self.generate_low_lib(board);
            if let Some(mv) = self.select_from_moves(board, rng) {
                let mv = self.correct_move(board, mv);
                return self.record(mv);
            }
        }

        if self.param.use_patterns {
            self.moves.clear();
            self.move_type = PlayoutMoveType::Pattern;
            self.generate_pattern(board);
            if let Some(mv) = self.select_from_moves(board, rng) {
                let mv = self.correct_move(board, mv);
                return self.record(mv);
            }
        }

        if self.param.global_capture {
            self.moves.clear();
            self.move_type = PlayoutMoveType::Capture;
            self.generate_capture(board);
            if let Some(mv) = self.select_from_moves(board, rng) {
                let mv = self.correct_move(board, mv);
                return self.record(mv);
            }
        }

        self.moves.clear();
        self.move_type = PlayoutMoveType::Random;
        if let Some(mv) = self.generate_pure_random(board) {
            let mv = self.correct_move(board, mv);
            return self.record(mv);
        }

        self.move_type = PlayoutMoveType::Pass;
        self.record(PASS)
    }

    fn on_play(&mut self, board: &Board) {
        // Track fresh atari candidates around the last move.
        let Some((_, last)) = board.last_move() else {
            return;
        };
        if last != PASS {
            if board.occupied_in_atari(last) {
                self.capture_candidates.push(board.anchor(last));
            }
            for n in neighbors(last) {
                if board.occupied_in_atari(n) {
                    let a = board.anchor(n);
                    if !self.capture_candidates.contains(&a) {
                        self.capture_candidates.push(a);
                    }
                }
            }
        }
        // Captured points re-enter the pure random pool.
        for p in board.last_captured_points().collect::<Vec<_>>() {
            self.empties.push(p);
        }
    }

    fn end_playout(&mut self) {}

    fn move_type(&self) -> PlayoutMoveType {
        self.move_type
    }

    fn equivalent_best_moves(&self) -> &[Point] {
        if self.move_type == PlayoutMoveType::Random || self.move_type == PlayoutMoveType::Pass {
            &[]
        } else {
            &self.moves
        }
    }
}

/// Factory for [`DefaultPlayoutPolicy`] instances sharing one parameter
/// set.
pub struct DefaultPolicyFactory {
    pub param: PlayoutParam,
}

impl DefaultPolicyFactory {
    pub fn new(param: PlayoutParam) -> Self {
        DefaultPolicyFactory { param }
    }
}

impl PlayoutPolicyFactory for DefaultPolicyFactory {
    fn create(&self) -> Box<dyn PlayoutPolicy + Send> {
        Box::new(DefaultPlayoutPolicy::new(self.param.clone()))
    }
}

// ----------------------------------------------------------------------
// Move tests shared with prior knowledge
// ----------------------------------------------------------------------

/// A point the rollout may play: empty, not completely surrounded, and
/// legal for the side to move.
pub fn is_generatable(board: &Board, pt: Point) -> bool {
    board.is_empty(pt)
        && !board.is_completely_surrounded(pt)
        && board.is_legal(pt, board.to_play())
}

/// Liberties of the block anchored at `anchor` after playing on `lib`,
/// compared against its current count: true if breath is gained.
pub fn gains_liberties(board: &Board, anchor: Point, lib: Point) -> bool {
    let color = board.color_at(anchor).color().expect("anchor holds a stone");
    let own: PointState = color.into();
    // Playing on the liberty spends it.
    let mut gained: i32 = -1;
    let mut counted: Vec<Point> = Vec::new();
    for n in neighbors(lib) {
        if board.is_empty(n) {
            if !board.is_liberty_of(n, anchor) && !counted.contains(&n) {
                counted.push(n);
                gained += 1;
            }
        } else if board.color_at(n) == own && board.anchor(n) != anchor {
            for l in board.liberties(board.anchor(n)).collect::<Vec<_>>() {
                if l != lib && !board.is_liberty_of(l, anchor) && !counted.contains(&l) {
                    counted.push(l);
                    gained += 1;
                }
            }
        }
    }
    gained > 0
}

/// Number of liberties the played stone's block would have after `color`
/// plays at `pt`, accounting for merges and captures.
pub fn liberties_after(board: &Board, pt: Point, color: Color) -> usize {
    let own: PointState = color.into();
    let opp: PointState = color.opponent().into();
    let mut libs: Vec<Point> = Vec::new();
    let mut captured: Vec<Point> = Vec::new();
    for n in neighbors(pt) {
        if board.color_at(n) == opp
            && board.in_atari(n)
            && board.the_liberty(n) == pt
            && !captured.contains(&board.anchor(n))
        {
            captured.push(board.anchor(n));
        }
    }
    for n in neighbors(pt) {
        match board.color_at(n) {
            PointState::Empty => {
                if !libs.contains(&n) {
                    libs.push(n);
                }
            }
            s if s == own => {
                for l in board.liberties(board.anchor(n)).collect::<Vec<_>>() {
                    if l != pt && !libs.contains(&l) {
                        libs.push(l);
                    }
                }
            }
            _ => {}
        }
    }
    // Captured stones adjacent to the new block become liberties.
    for &a in &captured {
        for s in board.block_stones(a).collect::<Vec<_>>() {
            let touches_new = neighbors(s).iter().any(|&n| {
                n == pt || (board.color_at(n) == own && !captured.contains(&board.anchor(n)))
            });
            if touches_new && !libs.contains(&s) {
                libs.push(s);
            }
        }
    }
    libs.len()
}

/// True if `color` playing `pt` leaves the played block in atari.
pub fn would_be_self_atari(board: &Board, pt: Point, color: Color) -> bool {
    liberties_after(board, pt, color) == 1
}

/// If `mv` is a self-atari, propose the surviving block's liberty
/// instead, when that point is safer.
fn self_atari_correction(board: &Board, mv: Point) -> Option<Point> {
    let color = board.to_play();
    if !would_be_self_atari(board, mv, color) {
        return None;
    }
    // The replacement is the single liberty the played block would have:
    // extend there instead of pushing in.
    let own: PointState = color.into();
    let mut candidate = None;
    for n in neighbors(mv) {
        if board.is_empty(n) && n != mv {
            candidate = Some(n);
            break;
        }
        if board.color_at(n) == own {
            for l in board.liberties(board.anchor(n)).collect::<Vec<_>>() {
                if l != mv {
                    candidate = Some(l);
                    break;
                }
            }
        }
        if candidate.is_some() {
            break;
        }
    }
    let candidate = candidate?;
    if is_generatable(board, candidate) && !would_be_self_atari(board, candidate, color) {
        Some(candidate)
    } else {
        None
    }
}

/// If `mv` would wedge into an own clump with a single exit, shift to
/// the exit when it is roomier.
fn clump_correction(board: &Board, mv: Point) -> Option<Point> {
    let color = board.to_play();
    if board.num_empty_neighbors(mv) != 1 || board.num_neighbors(mv, color) < 2 {
        return None;
    }
    let exit = neighbors(mv).into_iter().find(|&n| board.is_empty(n))?;
    if board.num_empty_neighbors(exit) > 1
        && is_generatable(board, exit)
        && !would_be_self_atari(board, exit, color)
    {
        Some(exit)
    } else {
        None
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

    fn policy() -> DefaultPlayoutPolicy {
        DefaultPlayoutPolicy::new(PlayoutParam::default())
    }

    #[test]
    fn captures_block_left_in_atari() {
        // White E4 is in self-atari after white just played it.
        let mut b = setup(&["D4", "E5", "F4"], &[]);
        b.play_as(Color::White, pt("E4")).unwrap();
        assert!(b.occupied_in_atari(pt("E4")));
        let mut rng = fastrand::Rng::with_seed(1);
        let mut p = policy();
        p.start_playout(&b, &mut rng);
        let mv = p.generate_move(&b, &mut rng);
        assert_eq!(mv, pt("E3"));
        assert_eq!(p.move_type(), PlayoutMoveType::AtariCapture);
    }

    #[test]
    fn defends_block_put_in_atari() {
        // Black D4/E4 is left with the single liberty C4 after white's
        // atari at F4; the escape gains three liberties.
        let mut b = setup(&["D4", "E4"], &["D5", "E5", "D3", "E3"]);
        b.play_as(Color::White, pt("F4")).unwrap();
        assert!(b.in_atari(pt("D4")));
        let mut rng = fastrand::Rng::with_seed(1);
        let mut p = policy();
        p.start_playout(&b, &mut rng);
        let mv = p.generate_move(&b, &mut rng);
        assert_eq!(mv, pt("C4"));
        assert_eq!(p.move_type(), PlayoutMoveType::AtariDefend);
    }

    #[test]
    fn pure_random_avoids_own_eyes() {
        // Black has an eye at A1; a rollout for black must not fill it.
        let b = setup(&["A2", "B1", "B2"], &[]);
        let mut rng = fastrand::Rng::with_seed(7);
        let mut p = policy();
        p.start_playout(&b, &mut rng);
        for _ in 0..50 {
            let mv = p.generate_move(&b, &mut rng);
            assert_ne!(mv, pt("A1"));
        }
    }

    #[test]
    fn passes_only_when_nothing_generatable() {
        // Fill a tiny board almost completely: black owns everything
        // except its two eyes.
        let mut b = Board::new(3, Rules::default());
        for m in ["A2", "A3", "B1", "B2", "B3", "C2"] {
            b.setup_stone(Color::Black, pt_sz(m, 3)).unwrap();
        }
        // Empty: A1, C1, C3 -- A1 and C1 are eyes; C3 is surrounded too.
        let mut rng = fastrand::Rng::with_seed(3);
        let mut p = policy();
        p.start_playout(&b, &mut rng);
        let mv = p.generate_move(&b, &mut rng);
        assert_eq!(mv, PASS);
        assert_eq!(p.move_type(), PlayoutMoveType::Pass);
    }

    fn pt_sz(s: &str, size: usize) -> Point {
        parse_coord(s, size).expect("coordinate")
    }

    #[test]
    fn gains_liberties_distinguishes_escapes() {
        // Black A1/A2 in atari at A3; extending to A3 only trades one
        // liberty for another, so it gains nothing.
        let b = setup(&["A1", "A2"], &["B1", "B2", "B3"]);
        let anchor = b.anchor(pt("A1"));
        assert!(!gains_liberties(&b, anchor, pt("A3")));
        // An open-board block gains from extending.
        let b2 = setup(&["E5"], &["E6"]);
        let anchor2 = b2.anchor(pt("E5"));
        assert!(gains_liberties(&b2, anchor2, pt("E4")));
    }

    #[test]
    fn liberties_after_counts_captures() {
        // White C2 is in atari; black capturing at C1 gets liberties from
        // the freed point.
        let b = setup(&["B1", "B2", "C3", "D2"], &["C2"]);
        assert!(b.in_atari(pt("C2")));
        assert_eq!(b.the_liberty(pt("C2")), pt("C1"));
        let libs = liberties_after(&b, pt("C1"), Color::Black);
        assert!(libs >= 2, "capture should free breathing room, got {libs}");
        assert!(!would_be_self_atari(&b, pt("C1"), Color::Black));
    }

    #[test]
    fn self_atari_detected() {
        // Playing A1 as white inside black's corner is a self-atari.
        let b = setup(&["A2", "B2", "C1"], &[]);
        assert!(would_be_self_atari(&b, pt("B1"), Color::White));
    }

    #[test]
    fn policy_statistics_count_moves() {
        let mut param = PlayoutParam::default();
        param.statistics_enabled = true;
        let mut p = DefaultPlayoutPolicy::new(param);
        let b = Board::new(9, Rules::default());
        let mut rng = fastrand::Rng::with_seed(5);
        p.start_playout(&b, &mut rng);
        for _ in 0..10 {
            p.generate_move(&b, &mut rng);
        }
        assert_eq!(p.statistics().nu_moves, 10);
    }
}
