//! Go board with incremental block and liberty state.
//!
//! The board is a 1-D array with border padding, indexed so that the four
//! orthogonal and four diagonal neighbor offsets are compile-time
//! constants. The grid is dimensioned for the maximum supported board
//! side (25); smaller boards leave the outer cells as border. This keeps
//! the Zobrist tables and neighbor deltas shared across all sizes.
//!
//! Derived state kept incrementally across `play`/`undo`:
//! - a block table keyed by anchor point (the smallest point index of the
//!   block), with per-point anchor links,
//! - sorted liberty lists per block,
//! - the simple-ko point, the Zobrist hash, and the position-hash history
//!   consulted under the super-ko rules.
//!
//! `undo` restores everything bit-identically from per-move records that
//! carry the prior anchor assignments and the consumed blocks.

use std::fmt;

use crate::rules::{KoRule, Rules};
use crate::zobrist::ZOBRIST;

/// A point on the board: an index into the padded 1-D grid.
pub type Point = usize;

/// Maximum supported board side.
pub const MAX_SIZE: usize = 25;

/// Distance between vertically adjacent points in the grid.
pub const STRIDE: usize = MAX_SIZE + 1;

/// Total grid length including all padding.
pub const GRID_LEN: usize = STRIDE * (MAX_SIZE + 2) + 1;

/// Pass move marker (index 0 is padding, so safe to use).
pub const PASS: Point = 0;

/// Offsets to neighboring points: N, E, S, W, then NE, SE, SW, NW.
pub const DELTA: [isize; 8] = [
    -(STRIDE as isize),
    1,
    STRIDE as isize,
    -1,
    -(STRIDE as isize) + 1,
    STRIDE as isize + 1,
    STRIDE as isize - 1,
    -(STRIDE as isize) - 1,
];

/// The 4 orthogonal neighbors of a point.
#[inline]
pub fn neighbors(pt: Point) -> [Point; 4] {
    std::array::from_fn(|i| (pt as isize + DELTA[i]) as Point)
}

/// The 4 diagonal neighbors of a point.
#[inline]
pub fn diagonal_neighbors(pt: Point) -> [Point; 4] {
    std::array::from_fn(|i| (pt as isize + DELTA[i + 4]) as Point)
}

/// All 8 neighbors of a point.
#[inline]
pub fn all_neighbors(pt: Point) -> [Point; 8] {
    std::array::from_fn(|i| (pt as isize + DELTA[i]) as Point)
}

/// Stone color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Black,
    White,
}

impl Color {
    #[inline]
    pub fn opponent(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        match self {
            Color::Black => 0,
            Color::White => 1,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => f.write_str("black"),
            Color::White => f.write_str("white"),
        }
    }
}

impl std::str::FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "b" | "black" => Ok(Color::Black),
            "w" | "white" => Ok(Color::White),
            other => Err(format!("invalid color: {other}")),
        }
    }
}

/// Contents of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointState {
    Empty,
    Black,
    White,
    Border,
}

impl PointState {
    #[inline]
    pub fn color(self) -> Option<Color> {
        match self {
            PointState::Black => Some(Color::Black),
            PointState::White => Some(Color::White),
            _ => None,
        }
    }

    #[inline]
    pub fn is_stone(self) -> bool {
        matches!(self, PointState::Black | PointState::White)
    }
}

impl From<Color> for PointState {
    fn from(c: Color) -> PointState {
        match c {
            Color::Black => PointState::Black,
            Color::White => PointState::White,
        }
    }
}

/// Why a move was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IllegalMove {
    Occupied,
    Suicide,
    /// Simple-ko recapture.
    Ko,
    /// Whole-board repetition under a super-ko rule.
    Repetition,
    OutOfBoard,
    /// The configurable move-count ceiling was reached.
    GameTooLong,
}

impl fmt::Display for IllegalMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            IllegalMove::Occupied => "point not empty",
            IllegalMove::Suicide => "suicide",
            IllegalMove::Ko => "retakes ko",
            IllegalMove::Repetition => "repeats earlier position",
            IllegalMove::OutOfBoard => "outside the board",
            IllegalMove::GameTooLong => "game too long",
        };
        write!(f, "illegal move: {msg}")
    }
}

impl std::error::Error for IllegalMove {}

/// Flags describing the outcome of the most recent `play` attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LastMoveInfo {
    pub is_capture: bool,
    pub is_suicide: bool,
    pub is_repetition: bool,
    pub is_illegal: bool,
}

/// A maximal same-color connected component.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub color: Color,
    pub stones: Vec<Point>,
    /// Sorted list of the block's liberties.
    pub liberties: Vec<Point>,
}

impl Block {
    #[inline]
    pub fn num_liberties(&self) -> usize {
        self.liberties.len()
    }

    #[inline]
    pub fn in_atari(&self) -> bool {
        self.liberties.len() == 1
    }

    fn add_liberty(&mut self, pt: Point) {
        if let Err(idx) = self.liberties.binary_search(&pt) {
            self.liberties.insert(idx, pt);
        }
    }

    fn remove_liberty(&mut self, pt: Point) {
        if let Ok(idx) = self.liberties.binary_search(&pt) {
            self.liberties.remove(idx);
        }
    }
}

/// Undo record for one move. Carries enough to reverse every mutation.
/// Block clones are taken before any liberty mutation, so restoring them
/// is exact.
#[derive(Debug, Clone)]
struct UndoEntry {
    mv: Point,
    color: Color,
    to_play_before: Color,
    ko_before: Point,
    hash_before: u64,
    last_info_before: LastMoveInfo,
    captures_before: [u32; 2],
    /// Anchor of the block created by this move (0 for pass/self-capture).
    new_anchor: Point,
    /// Same-color blocks consumed by the merge, keyed by their old anchor.
    merged: Vec<(Point, Block)>,
    /// Captured opponent blocks, keyed by their old anchor.
    captured: Vec<(Point, Block)>,
    /// The played block itself when removed by an allowed suicide.
    self_captured: Option<Block>,
    /// Anchors of surviving opponent blocks that lost the liberty at `mv`.
    adjacent_opponents: Vec<Point>,
}

/// A Go position with incremental derived state.
#[derive(Clone)]
pub struct Board {
    state: [PointState; GRID_LEN],
    anchor: [Point; GRID_LEN],
    blocks: Vec<Option<Block>>,
    size: usize,
    rules: Rules,
    to_play: Color,
    initial_to_play: Color,
    ko_point: Point,
    hash: u64,
    /// Stone hashes after each move, including the initial position.
    hash_history: Vec<u64>,
    history: Vec<UndoEntry>,
    /// Stones captured by black / by white.
    captured: [u32; 2],
    last_info: LastMoveInfo,
    max_moves: usize,
}

impl Board {
    /// Create an empty board. `size` must be in `2..=25`.
    pub fn new(size: usize, rules: Rules) -> Board {
        assert!((2..=MAX_SIZE).contains(&size), "board size out of range");
        let mut state = [PointState::Border; GRID_LEN];
        for row in 1..=size {
            for col in 1..=size {
                state[row * STRIDE + col] = PointState::Empty;
            }
        }
        Board {
            state,
            anchor: [0; GRID_LEN],
            blocks: vec![None; GRID_LEN],
            size,
            rules,
            to_play: Color::Black,
            initial_to_play: Color::Black,
            ko_point: 0,
            hash: 0,
            hash_history: vec![0],
            history: Vec::new(),
            captured: [0, 0],
            last_info: LastMoveInfo::default(),
            max_moves: 10 * size * size,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn rules_mut(&mut self) -> &mut Rules {
        &mut self.rules
    }

    #[inline]
    pub fn komi(&self) -> f32 {
        self.rules.komi
    }

    pub fn set_komi(&mut self, komi: f32) {
        self.rules.komi = komi;
    }

    #[inline]
    pub fn to_play(&self) -> Color {
        self.to_play
    }

    /// Set the side to move. Clears a pending simple-ko point, since the
    /// ko restriction only binds the player who was to move.
    pub fn set_to_play(&mut self, color: Color) {
        if self.to_play != color {
            self.to_play = color;
            self.ko_point = 0;
        }
        if self.history.is_empty() {
            self.initial_to_play = color;
        }
    }

    #[inline]
    pub fn color_at(&self, pt: Point) -> PointState {
        self.state[pt]
    }

    #[inline]
    pub fn is_empty(&self, pt: Point) -> bool {
        self.state[pt] == PointState::Empty
    }

    #[inline]
    pub fn on_board(&self, pt: Point) -> bool {
        pt < GRID_LEN && self.state[pt] != PointState::Border
    }

    #[inline]
    pub fn ko_point(&self) -> Point {
        self.ko_point
    }

    /// Zobrist code over the stones only.
    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Zobrist code including the side to move.
    #[inline]
    pub fn hash_with_to_play(&self) -> u64 {
        match self.to_play {
            Color::Black => self.hash,
            Color::White => self.hash ^ ZOBRIST.to_play,
        }
    }

    #[inline]
    pub fn move_count(&self) -> usize {
        self.history.len()
    }

    /// Number of stones captured by `color` so far.
    #[inline]
    pub fn count_captured(&self, color: Color) -> u32 {
        self.captured[color.index()]
    }

    #[inline]
    pub fn last_move_info(&self) -> LastMoveInfo {
        self.last_info
    }

    /// The most recent move, if any.
    pub fn last_move(&self) -> Option<(Color, Point)> {
        self.history.last().map(|e| (e.color, e.mv))
    }

    pub fn second_last_move(&self) -> Option<(Color, Point)> {
        let n = self.history.len();
        if n < 2 {
            None
        } else {
            Some((self.history[n - 2].color, self.history[n - 2].mv))
        }
    }

    /// Number of consecutive passes at the end of the move history.
    pub fn consecutive_passes(&self) -> usize {
        self.history
            .iter()
            .rev()
            .take_while(|e| e.mv == PASS)
            .count()
    }

    /// The full move history as (color, point) pairs.
    pub fn move_history(&self) -> impl Iterator<Item = (Color, Point)> + '_ {
        self.history.iter().map(|e| (e.color, e.mv))
    }

    /// Points freed by the most recent move (captures and allowed
    /// suicide), in removal order.
    pub fn last_captured_points(&self) -> impl Iterator<Item = Point> + '_ {
        self.history
            .last()
            .into_iter()
            .flat_map(|e| {
                e.captured
                    .iter()
                    .flat_map(|(_, b)| b.stones.iter().copied())
                    .chain(
                        e.self_captured
                            .iter()
                            .flat_map(|b| b.stones.iter().copied()),
                    )
            })
    }

    /// Iterate over all on-board points, in index order.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        let size = self.size;
        (1..=size).flat_map(move |row| (1..=size).map(move |col| row * STRIDE + col))
    }

    #[inline]
    pub fn num_neighbors(&self, pt: Point, color: Color) -> usize {
        let want: PointState = color.into();
        neighbors(pt)
            .iter()
            .filter(|&&n| self.state[n] == want)
            .count()
    }

    #[inline]
    pub fn num_empty_neighbors(&self, pt: Point) -> usize {
        neighbors(pt)
            .iter()
            .filter(|&&n| self.state[n] == PointState::Empty)
            .count()
    }

    pub fn num_empty_8_neighbors(&self, pt: Point) -> usize {
        all_neighbors(pt)
            .iter()
            .filter(|&&n| self.state[n] == PointState::Empty)
            .count()
    }

    /// Line number of a point: 1 on the edge, 2 one step in, and so on.
    pub fn line(&self, pt: Point) -> usize {
        let row = pt / STRIDE;
        let col = pt % STRIDE;
        row.min(col)
            .min(self.size + 1 - row)
            .min(self.size + 1 - col)
    }

    // ------------------------------------------------------------------
    // Block queries
    // ------------------------------------------------------------------

    /// Anchor of the block at `pt`, or 0 if the point holds no stone.
    #[inline]
    pub fn anchor(&self, pt: Point) -> Point {
        self.anchor[pt]
    }

    fn block(&self, anchor: Point) -> &Block {
        self.blocks[anchor].as_ref().expect("anchor without block")
    }

    fn block_mut(&mut self, anchor: Point) -> &mut Block {
        self.blocks[anchor].as_mut().expect("anchor without block")
    }

    /// Liberty count of the block at `pt`. `pt` must hold a stone.
    #[inline]
    pub fn num_liberties(&self, pt: Point) -> usize {
        self.block(self.anchor[pt]).num_liberties()
    }

    /// Stone count of the block at `pt`. `pt` must hold a stone.
    #[inline]
    pub fn num_stones(&self, pt: Point) -> usize {
        self.block(self.anchor[pt]).stones.len()
    }

    #[inline]
    pub fn in_atari(&self, pt: Point) -> bool {
        self.block(self.anchor[pt]).in_atari()
    }

    /// True if `pt` holds a stone whose block is in atari.
    #[inline]
    pub fn occupied_in_atari(&self, pt: Point) -> bool {
        self.state[pt].is_stone() && self.in_atari(pt)
    }

    /// The single liberty of a block in atari.
    pub fn the_liberty(&self, pt: Point) -> Point {
        let block = self.block(self.anchor[pt]);
        debug_assert!(block.in_atari());
        block.liberties[0]
    }

    /// Iterate the liberties of the block at `pt`.
    pub fn liberties(&self, pt: Point) -> impl Iterator<Item = Point> + '_ {
        self.block(self.anchor[pt]).liberties.iter().copied()
    }

    /// Iterate the stones of the block at `pt`.
    pub fn block_stones(&self, pt: Point) -> impl Iterator<Item = Point> + '_ {
        self.block(self.anchor[pt]).stones.iter().copied()
    }

    /// True if `lib` is a liberty of the block anchored at `anchor`.
    pub fn is_liberty_of(&self, lib: Point, anchor: Point) -> bool {
        self.block(anchor).liberties.binary_search(&lib).is_ok()
    }

    /// Anchors of all blocks on the board, in index order.
    pub fn block_anchors(&self) -> impl Iterator<Item = Point> + '_ {
        self.points().filter(move |&p| self.anchor[p] == p)
    }

    // ------------------------------------------------------------------
    // Legality
    // ------------------------------------------------------------------

    /// Non-mutating legality test for `color` playing at `pt`.
    pub fn is_legal(&self, pt: Point, color: Color) -> bool {
        if pt == PASS {
            return true;
        }
        if pt >= GRID_LEN || self.state[pt] != PointState::Empty {
            return false;
        }
        if pt == self.ko_point && color == self.to_play {
            return false;
        }
        let captures = self.captures_of(pt, color);
        if captures.is_empty() && self.is_suicide(pt, color) {
            if !self.rules.allow_suicide {
                return false;
            }
            if self.rules.ko_rule == KoRule::Simple {
                return true;
            }
            // Position after an allowed suicide: the own neighbor blocks
            // vanish with the played stone, nothing else changes. A
            // lone-stone suicide in particular always repeats.
            let own: PointState = color.into();
            let mut hash = self.hash;
            let mut seen: Vec<Point> = Vec::new();
            for n in neighbors(pt) {
                if self.state[n] == own {
                    let a = self.anchor[n];
                    if !seen.contains(&a) {
                        seen.push(a);
                        for &s in &self.block(a).stones {
                            hash ^= ZOBRIST.stones[color.index()][s];
                        }
                    }
                }
            }
            let code = match self.rules.ko_rule {
                KoRule::Superko => match color.opponent() {
                    Color::Black => hash,
                    Color::White => hash ^ ZOBRIST.to_play,
                },
                _ => hash,
            };
            return !self.position_history_contains(code);
        }
        match self.rules.ko_rule {
            KoRule::Simple => true,
            KoRule::Superko | KoRule::PositionalSuperko => {
                !self.would_repeat(pt, color, &captures)
            }
        }
    }

    /// Anchors of opponent blocks that would be captured by `color`
    /// playing at `pt`.
    fn captures_of(&self, pt: Point, color: Color) -> Vec<Point> {
        let opp: PointState = color.opponent().into();
        let mut out = Vec::new();
        for n in neighbors(pt) {
            if self.state[n] == opp {
                let a = self.anchor[n];
                let block = self.block(a);
                if block.in_atari() && block.liberties[0] == pt && !out.contains(&a) {
                    out.push(a);
                }
            }
        }
        out
    }

    /// True if `color` playing at `pt` leaves the played block without
    /// liberties, assuming no capture happens.
    fn is_suicide(&self, pt: Point, color: Color) -> bool {
        let own: PointState = color.into();
        for n in neighbors(pt) {
            match self.state[n] {
                PointState::Empty => return false,
                s if s == own => {
                    // Any neighbor block with a liberty besides pt keeps
                    // the merged block alive.
                    if self.block(self.anchor[n]).num_liberties() >= 2 {
                        return false;
                    }
                }
                _ => {}
            }
        }
        true
    }

    /// Predict whether the position after `color` plays `pt` repeats an
    /// earlier one, under the active super-ko rule.
    fn would_repeat(&self, pt: Point, color: Color, captures: &[Point]) -> bool {
        let mut hash = self.hash ^ ZOBRIST.stones[color.index()][pt];
        let opp = color.opponent();
        for &a in captures {
            for &s in &self.block(a).stones {
                hash ^= ZOBRIST.stones[opp.index()][s];
            }
        }
        let code = match self.rules.ko_rule {
            KoRule::Superko => match opp {
                Color::Black => hash,
                Color::White => hash ^ ZOBRIST.to_play,
            },
            _ => hash,
        };
        self.position_history_contains(code)
    }

    fn position_history_contains(&self, code: u64) -> bool {
        match self.rules.ko_rule {
            KoRule::PositionalSuperko => self.hash_history.contains(&code),
            KoRule::Superko => {
                // Stored history holds stone-only hashes; fold in the side
                // to move that held after each stored position.
                let mut to_play_was = self.initial_to_play;
                for (i, &h) in self.hash_history.iter().enumerate() {
                    let situational = match to_play_was {
                        Color::Black => h,
                        Color::White => h ^ ZOBRIST.to_play,
                    };
                    if situational == code {
                        return true;
                    }
                    if i < self.history.len() {
                        to_play_was = self.history[i].color.opponent();
                    }
                }
                false
            }
            KoRule::Simple => false,
        }
    }

    // ------------------------------------------------------------------
    // Play and undo
    // ------------------------------------------------------------------

    /// Play a move for the side to move.
    pub fn play(&mut self, pt: Point) -> Result<(), IllegalMove> {
        let color = self.to_play;
        if self.history.len() >= self.max_moves {
            self.last_info.is_illegal = true;
            return Err(IllegalMove::GameTooLong);
        }
        if pt == PASS {
            self.play_pass(color);
            return Ok(());
        }
        if pt >= GRID_LEN || self.state[pt] == PointState::Border {
            self.last_info.is_illegal = true;
            return Err(IllegalMove::OutOfBoard);
        }
        if self.state[pt] != PointState::Empty {
            self.last_info.is_illegal = true;
            return Err(IllegalMove::Occupied);
        }
        if pt == self.ko_point {
            self.last_info = LastMoveInfo {
                is_illegal: true,
                ..LastMoveInfo::default()
            };
            return Err(IllegalMove::Ko);
        }

        let own: PointState = color.into();
        let opp_state: PointState = color.opponent().into();

        let mut entry = UndoEntry {
            mv: pt,
            color,
            to_play_before: self.to_play,
            ko_before: self.ko_point,
            hash_before: self.hash,
            last_info_before: self.last_info,
            captures_before: self.captured,
            new_anchor: 0,
            merged: Vec::new(),
            captured: Vec::new(),
            self_captured: None,
            adjacent_opponents: Vec::new(),
        };

        // Snapshot affected neighbor blocks before mutating anything.
        let mut merged_anchors: Vec<Point> = Vec::new();
        for n in neighbors(pt) {
            if self.state[n] == own {
                let a = self.anchor[n];
                if !merged_anchors.contains(&a) {
                    merged_anchors.push(a);
                    entry.merged.push((a, self.block(a).clone()));
                }
            } else if self.state[n] == opp_state {
                let a = self.anchor[n];
                let block = self.block(a);
                if block.in_atari() && block.liberties[0] == pt {
                    if !entry.captured.iter().any(|&(ca, _)| ca == a) {
                        entry.captured.push((a, block.clone()));
                    }
                } else if !entry.adjacent_opponents.contains(&a) {
                    entry.adjacent_opponents.push(a);
                }
            }
        }

        // Place the stone.
        self.state[pt] = own;
        self.hash ^= ZOBRIST.stones[color.index()][pt];

        // Capture opponent blocks that ran out of liberties.
        let mut captured_stones = 0usize;
        for &(a, _) in &entry.captured {
            let block = self.blocks[a].take().expect("capturing missing block");
            captured_stones += block.stones.len();
            self.remove_block_stones(&block);
        }

        // Surviving opponent neighbors lose the played point.
        for &a in &entry.adjacent_opponents {
            self.block_mut(a).remove_liberty(pt);
        }

        // Merge with same-color neighbor blocks into one new block.
        let mut stones = vec![pt];
        for &a in &merged_anchors {
            let block = self.blocks[a].take().expect("merging missing block");
            stones.extend_from_slice(&block.stones);
        }
        let new_anchor = *stones.iter().min().expect("nonempty block");
        let mut liberties: Vec<Point> = Vec::new();
        for &s in &stones {
            self.anchor[s] = new_anchor;
            for n in neighbors(s) {
                if self.state[n] == PointState::Empty {
                    if let Err(idx) = liberties.binary_search(&n) {
                        liberties.insert(idx, n);
                    }
                }
            }
        }
        entry.new_anchor = new_anchor;
        self.blocks[new_anchor] = Some(Block {
            color,
            stones,
            liberties,
        });

        // Suicide handling.
        if entry.captured.is_empty() && self.block(new_anchor).num_liberties() == 0 {
            if !self.rules.allow_suicide {
                self.unwind(entry);
                self.last_info = LastMoveInfo {
                    is_illegal: true,
                    is_suicide: true,
                    ..LastMoveInfo::default()
                };
                return Err(IllegalMove::Suicide);
            }
            let block = self.blocks[new_anchor]
                .take()
                .expect("suicide block missing");
            self.remove_block_stones(&block);
            self.captured[color.opponent().index()] += block.stones.len() as u32;
            entry.self_captured = Some(block);
            entry.new_anchor = 0;
        }

        self.captured[color.index()] += captured_stones as u32;

        // Super-ko: reject whole-board repetition.
        if self.rules.ko_rule != KoRule::Simple {
            let code = match self.rules.ko_rule {
                KoRule::Superko => match color.opponent() {
                    Color::Black => self.hash,
                    Color::White => self.hash ^ ZOBRIST.to_play,
                },
                _ => self.hash,
            };
            if self.position_history_contains(code) {
                self.unwind(entry);
                self.last_info = LastMoveInfo {
                    is_illegal: true,
                    is_repetition: true,
                    ..LastMoveInfo::default()
                };
                return Err(IllegalMove::Repetition);
            }
        }

        // Simple ko: a single capture leaving a lone stone whose one
        // liberty is the captured point.
        self.ko_point = 0;
        if captured_stones == 1 && entry.new_anchor != 0 {
            let block = self.block(entry.new_anchor);
            if block.stones.len() == 1 && block.num_liberties() == 1 {
                let cap = entry.captured[0].1.stones[0];
                if block.liberties[0] == cap {
                    self.ko_point = cap;
                }
            }
        }

        self.last_info = LastMoveInfo {
            is_capture: captured_stones > 0,
            is_suicide: entry.self_captured.is_some(),
            ..LastMoveInfo::default()
        };
        self.to_play = color.opponent();
        self.hash_history.push(self.hash);
        self.history.push(entry);
        Ok(())
    }

    /// Set the mover and play. Used by the GTP `play` command, which may
    /// place moves out of turn.
    pub fn play_as(&mut self, color: Color, pt: Point) -> Result<(), IllegalMove> {
        self.set_to_play(color);
        self.play(pt)
    }

    fn play_pass(&mut self, color: Color) {
        let entry = UndoEntry {
            mv: PASS,
            color,
            to_play_before: self.to_play,
            ko_before: self.ko_point,
            hash_before: self.hash,
            last_info_before: self.last_info,
            captures_before: self.captured,
            new_anchor: 0,
            merged: Vec::new(),
            captured: Vec::new(),
            self_captured: None,
            adjacent_opponents: Vec::new(),
        };
        self.ko_point = 0;
        self.to_play = color.opponent();
        self.last_info = LastMoveInfo::default();
        self.hash_history.push(self.hash);
        self.history.push(entry);
    }

    /// Undo the most recent move. Returns false if there is no history.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.pop() else {
            return false;
        };
        self.hash_history.pop();
        self.unwind(entry);
        true
    }

    /// Reverse every mutation recorded in `entry` and restore the saved
    /// scalar state. Usable both for `undo` and for rolling back a move
    /// rejected after mutation (suicide, super-ko).
    fn unwind(&mut self, entry: UndoEntry) {
        let player = entry.color;
        let own: PointState = player.into();
        let opp_state: PointState = player.opponent().into();

        // Surviving friendly blocks gained liberties where captured
        // stones were removed; take those back. The new block is about to
        // be dismantled and the merged clones are pristine, so both are
        // skipped.
        for (_, block) in &entry.captured {
            for &s in &block.stones {
                for n in neighbors(s) {
                    if self.state[n] == own {
                        let a = self.anchor[n];
                        if a != 0 && a != entry.new_anchor {
                            self.block_mut(a).remove_liberty(s);
                        }
                    }
                }
            }
        }

        // Dismantle the block created by the move, without side effects.
        if entry.new_anchor != 0 {
            let block = self.blocks[entry.new_anchor]
                .take()
                .expect("undo: new block missing");
            for &s in &block.stones {
                self.state[s] = PointState::Empty;
                self.anchor[s] = 0;
            }
        }

        // Opponent blocks gained liberties from an allowed suicide; take
        // those back before the merged stones return to the grid.
        if let Some(block) = &entry.self_captured {
            for &s in &block.stones {
                for n in neighbors(s) {
                    if self.state[n] == opp_state {
                        let a = self.anchor[n];
                        if a != 0 {
                            self.block_mut(a).remove_liberty(s);
                        }
                    }
                }
            }
        }

        // Restore the merged same-color blocks from their clones.
        for (a, block) in entry.merged {
            for &s in &block.stones {
                self.state[s] = own;
                self.anchor[s] = a;
            }
            self.blocks[a] = Some(block);
        }

        // Restore the captured opponent blocks.
        for (a, block) in entry.captured {
            for &s in &block.stones {
                self.state[s] = opp_state;
                self.anchor[s] = a;
            }
            self.blocks[a] = Some(block);
        }

        // Surviving opponent neighbors get the played point back.
        for a in entry.adjacent_opponents {
            self.block_mut(a).add_liberty(entry.mv);
        }

        if entry.mv != PASS {
            self.state[entry.mv] = PointState::Empty;
            self.anchor[entry.mv] = 0;
        }

        self.to_play = entry.to_play_before;
        self.ko_point = entry.ko_before;
        self.hash = entry.hash_before;
        self.last_info = entry.last_info_before;
        self.captured = entry.captures_before;
    }

    /// Remove a block from the grid. Freed points become liberties of
    /// adjacent enemy blocks; the not-yet-anchored played stone (anchor 0)
    /// is skipped, its liberties are computed when its block is built.
    fn remove_block_stones(&mut self, block: &Block) {
        let enemy: PointState = block.color.opponent().into();
        for &s in &block.stones {
            self.state[s] = PointState::Empty;
            self.anchor[s] = 0;
            self.hash ^= ZOBRIST.stones[block.color.index()][s];
        }
        for &s in &block.stones {
            for n in neighbors(s) {
                if self.state[n] == enemy {
                    let a = self.anchor[n];
                    if a != 0 {
                        self.block_mut(a).add_liberty(s);
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Position setup
    // ------------------------------------------------------------------

    /// Place a setup stone (handicap or loaded position) before any move
    /// has been played. Rebuilds the block table from scratch.
    pub fn setup_stone(&mut self, color: Color, pt: Point) -> Result<(), IllegalMove> {
        debug_assert!(self.history.is_empty(), "setup after moves were played");
        if pt >= GRID_LEN || self.state[pt] == PointState::Border {
            return Err(IllegalMove::OutOfBoard);
        }
        if self.state[pt] != PointState::Empty {
            return Err(IllegalMove::Occupied);
        }
        self.state[pt] = color.into();
        self.rebuild_blocks();
        Ok(())
    }

    /// Recompute the block table, anchors, and hash from the raw grid.
    fn rebuild_blocks(&mut self) {
        self.anchor = [0; GRID_LEN];
        for b in &mut self.blocks {
            *b = None;
        }
        self.hash = 0;
        let points: Vec<Point> = self.points().collect();
        for pt in points {
            let Some(color) = self.state[pt].color() else {
                continue;
            };
            self.hash ^= ZOBRIST.stones[color.index()][pt];
            if self.anchor[pt] != 0 {
                continue;
            }
            let own = self.state[pt];
            let mut stones = Vec::new();
            let mut liberties: Vec<Point> = Vec::new();
            let mut stack = vec![pt];
            let mut seen = vec![pt];
            while let Some(s) = stack.pop() {
                stones.push(s);
                for n in neighbors(s) {
                    if self.state[n] == own && !seen.contains(&n) {
                        seen.push(n);
                        stack.push(n);
                    } else if self.state[n] == PointState::Empty {
                        if let Err(idx) = liberties.binary_search(&n) {
                            liberties.insert(idx, n);
                        }
                    }
                }
            }
            let anchor = *stones.iter().min().expect("nonempty block");
            for &s in &stones {
                self.anchor[s] = anchor;
            }
            self.blocks[anchor] = Some(Block {
                color,
                stones,
                liberties,
            });
        }
        self.hash_history = vec![self.hash];
    }

    // ------------------------------------------------------------------
    // Scoring
    // ------------------------------------------------------------------

    /// Tromp-Taylor area score, black-positive, komi applied. Every empty
    /// region goes to the color that exclusively borders it.
    pub fn area_score(&self) -> f32 {
        let mut black = 0f32;
        let mut white = 0f32;
        let mut visited = [false; GRID_LEN];
        for pt in self.points() {
            match self.state[pt] {
                PointState::Black => black += 1.0,
                PointState::White => white += 1.0,
                PointState::Empty if !visited[pt] => {
                    let mut region = 0f32;
                    let mut touches_black = false;
                    let mut touches_white = false;
                    let mut stack = vec![pt];
                    visited[pt] = true;
                    while let Some(p) = stack.pop() {
                        region += 1.0;
                        for n in neighbors(p) {
                            match self.state[n] {
                                PointState::Empty if !visited[n] => {
                                    visited[n] = true;
                                    stack.push(n);
                                }
                                PointState::Black => touches_black = true,
                                PointState::White => touches_white = true,
                                _ => {}
                            }
                        }
                    }
                    if touches_black && !touches_white {
                        black += region;
                    } else if touches_white && !touches_black {
                        white += region;
                    }
                }
                _ => {}
            }
        }
        black - white - self.rules.komi
    }

    /// Render the area score as a GTP result string: "B+X", "W+X" or "0".
    pub fn score_string(&self) -> String {
        let s = self.area_score();
        if s > 0.0 {
            format!("B+{s}")
        } else if s < 0.0 {
            format!("W+{}", -s)
        } else {
            "0".to_string()
        }
    }

    // ------------------------------------------------------------------
    // Eye shape
    // ------------------------------------------------------------------

    /// If every stone or border neighbor of the empty point `pt` belongs
    /// to one color, return that color.
    pub fn eyeish_color(&self, pt: Point) -> Option<Color> {
        let mut eye_color = None;
        for n in neighbors(pt) {
            match self.state[n] {
                PointState::Border => continue,
                PointState::Empty => return None,
                s => {
                    let c = s.color().expect("stone state");
                    match eye_color {
                        None => eye_color = Some(c),
                        Some(e) if e != c => return None,
                        _ => {}
                    }
                }
            }
        }
        eye_color
    }

    /// Single-point eye test: eyeish, and the diagonals do not let the
    /// opponent falsify the eye. At the edge one opposing diagonal is
    /// tolerated, in the center none.
    pub fn is_eye_of(&self, pt: Point, color: Color) -> bool {
        match self.eyeish_color(pt) {
            Some(c) if c == color => {}
            _ => return false,
        }
        let false_color: PointState = color.opponent().into();
        let mut at_edge = false;
        let mut false_count = 0;
        for d in diagonal_neighbors(pt) {
            if self.state[d] == PointState::Border {
                at_edge = true;
            } else if self.state[d] == false_color {
                false_count += 1;
            }
        }
        false_count <= usize::from(at_edge)
    }

    /// True if the empty point `pt` is enclosed by stones of one color
    /// and filling it achieves nothing: no empty neighbor, no opposing
    /// neighbors, and no adjacent block in atari. Rollout move
    /// generation skips exactly these points, which is what lets a
    /// rollout pass.
    pub fn is_completely_surrounded(&self, pt: Point) -> bool {
        debug_assert!(self.state[pt] == PointState::Empty);
        let mut has_black = false;
        let mut has_white = false;
        for n in neighbors(pt) {
            match self.state[n] {
                PointState::Empty => return false,
                PointState::Black => has_black = true,
                PointState::White => has_white = true,
                PointState::Border => {}
            }
        }
        if has_black && has_white {
            return false;
        }
        for n in neighbors(pt) {
            if self.state[n].is_stone() && self.in_atari(n) {
                return false;
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // Consistency checks
    // ------------------------------------------------------------------

    /// Verify the block table against a from-scratch recomputation.
    pub fn check_consistency(&self) -> bool {
        let mut copy = self.clone();
        copy.rebuild_blocks();
        for pt in self.points() {
            if self.anchor[pt] != copy.anchor[pt] {
                return false;
            }
        }
        for pt in self.points() {
            let a = self.anchor[pt];
            if a == 0 || a != pt {
                continue;
            }
            let mine = self.block(a);
            let theirs = copy.block(a);
            if mine.liberties != theirs.liberties || mine.color != theirs.color {
                return false;
            }
            let mut s1 = mine.stones.clone();
            let mut s2 = theirs.stones.clone();
            s1.sort_unstable();
            s2.sort_unstable();
            if s1 != s2 {
                return false;
            }
        }
        self.hash == copy.hash
    }
}

// ----------------------------------------------------------------------
// Coordinates
// ----------------------------------------------------------------------

/// Column labels, skipping 'I' per Go convention.
const COL_LABELS: &[u8] = b"ABCDEFGHJKLMNOPQRSTUVWXYZ";

/// Grid point for 1-indexed (col, row) with row 1 at the bottom.
#[inline]
pub fn from_col_row(col: usize, row: usize, size: usize) -> Point {
    (size - row + 1) * STRIDE + col
}

/// Parse a GTP coordinate ("D4", "pass") for a board of the given size.
pub fn parse_coord(s: &str, size: usize) -> Option<Point> {
    if s.eq_ignore_ascii_case("pass") {
        return Some(PASS);
    }
    let bytes = s.as_bytes();
    if bytes.len() < 2 || !bytes[0].is_ascii_alphabetic() {
        return None;
    }
    let col_char = bytes[0].to_ascii_uppercase();
    if col_char == b'I' {
        return None;
    }
    let mut col = (col_char - b'A' + 1) as usize;
    if col_char > b'I' {
        col -= 1;
    }
    let row: usize = std::str::from_utf8(&bytes[1..]).ok()?.parse().ok()?;
    if col == 0 || col > size || row == 0 || row > size {
        return None;
    }
    Some(from_col_row(col, row, size))
}

/// Render a point as a GTP coordinate for a board of the given size.
pub fn str_coord(pt: Point, size: usize) -> String {
    if pt == PASS {
        return "pass".to_string();
    }
    let row = size + 1 - pt / STRIDE;
    let col = pt % STRIDE;
    format!("{}{}", COL_LABELS[col - 1] as char, row)
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Move: {:<3}   Black: {} caps   White: {} caps   Komi: {:.1}",
            self.move_count(),
            self.count_captured(Color::Black),
            self.count_captured(Color::White),
            self.komi()
        )?;
        let last = self.last_move().map(|(_, p)| p).unwrap_or(PASS);
        for row in (1..=self.size).rev() {
            write!(f, " {row:>2} ")?;
            for col in 1..=self.size {
                let pt = from_col_row(col, row, self.size);
                let c = match self.state[pt] {
                    PointState::Black => 'X',
                    PointState::White => 'O',
                    _ => '.',
                };
                let prev = if col > 1 {
                    from_col_row(col - 1, row, self.size)
                } else {
                    0
                };
                if last != PASS && last == pt {
                    write!(f, "({c}")?;
                } else if last != PASS && last == prev {
                    write!(f, "){c}")?;
                } else {
                    write!(f, " {c}")?;
                }
            }
            if last != PASS && last == from_col_row(self.size, row, self.size) {
                write!(f, ")")?;
            }
            writeln!(f)?;
        }
        write!(f, "    ")?;
        for col in 0..self.size {
            write!(f, " {}", COL_LABELS[col] as char)?;
        }
        writeln!(f)
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Board {{ size: {}, to_play: {}, ko: {} }}",
            self.size, self.to_play, self.ko_point
        )?;
        write!(f, "{self}")
    }
}
