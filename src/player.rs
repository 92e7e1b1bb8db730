//! The engine player.
//!
//! Owns the game board and the UCT search and drives one `genmove`:
//! probe the opening book, compute the root filter, try to reuse the
//! previous search tree, search under the time budget, then apply the
//! pass and resign rules to the selected child. Also provides handicap
//! placement, position load/save, and the optional auto-save of the game
//! record.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info};

use crate::board::{str_coord, Board, Color, IllegalMove, Point, PASS};
use crate::book::{EmptyBook, OpeningBook};
use crate::filter::{DefaultMoveFilter, DefaultMoveFilterFactory, MoveFilter, MoveFilterParam};
use crate::playout::{DefaultPolicyFactory, PlayoutParam};
use crate::prior::DefaultPriorKnowledgeFactory;
use crate::rules::{handicap_points, Rules};
use crate::search::{SearchConfig, UctSearch};
use crate::timecontrol::{TimeControl, TimeSettings};

/// What `genmove` decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenMove {
    Move(Point),
    Pass,
    Resign,
}

/// Player-level parameters.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// Simulation budget per move.
    pub max_games: u64,
    /// Wall-clock budget per move when no game clock runs.
    pub max_time: Duration,
    pub resign_threshold: f32,
    pub resign_min_games: u64,
    pub reuse_subtree: bool,
    pub use_root_filter: bool,
    /// Budget for extracting the reusable subtree.
    pub max_reuse_time: Duration,
    /// Write the move list here after every played move.
    pub auto_save: Option<PathBuf>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            max_games: 10_000,
            max_time: Duration::from_secs(10),
            resign_threshold: 0.1,
            resign_min_games: 3000,
            reuse_subtree: true,
            use_root_filter: true,
            max_reuse_time: Duration::from_millis(500),
            auto_save: None,
        }
    }
}

/// Engine player: board + search + policies around the search result.
pub struct Player {
    board: Board,
    search: UctSearch,
    pub config: PlayerConfig,
    playout_param: PlayoutParam,
    filter_param: MoveFilterParam,
    root_filter: DefaultMoveFilter,
    book: Box<dyn OpeningBook>,
    time_control: TimeControl,
    /// Move history at the root of the previous search, for reuse.
    last_search_history: Option<Vec<(Color, Point)>>,
}

impl Player {
    pub fn new(size: usize, rules: Rules, search_config: SearchConfig) -> Player {
        let playout_param = PlayoutParam::default();
        let filter_param = MoveFilterParam::default();
        let mut search = UctSearch::new(
            search_config,
            Box::new(DefaultPolicyFactory::new(playout_param.clone())),
        );
        search.set_prior_knowledge(Box::new(DefaultPriorKnowledgeFactory::new(
            playout_param.clone(),
        )));
        search.set_tree_filter(Box::new(DefaultMoveFilterFactory::new(
            filter_param.clone(),
        )));
        Player {
            board: Board::new(size, rules),
            search,
            config: PlayerConfig::default(),
            playout_param,
            filter_param: filter_param.clone(),
            root_filter: DefaultMoveFilter::new(filter_param),
            book: Box::new(EmptyBook),
            time_control: TimeControl::new(),
            last_search_history: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    pub fn search(&self) -> &UctSearch {
        &self.search
    }

    pub fn search_mut(&mut self) -> &mut UctSearch {
        &mut self.search
    }

    pub fn time_control_mut(&mut self) -> &mut TimeControl {
        &mut self.time_control
    }

    pub fn set_book(&mut self, book: Box<dyn OpeningBook>) {
        self.book = book;
    }

    pub fn playout_param(&self) -> &PlayoutParam {
        &self.playout_param
    }

    /// Replace the playout parameters; the search factories are rebuilt.
    pub fn set_playout_param(&mut self, param: PlayoutParam) {
        self.playout_param = param.clone();
        self.search
            .set_playout_factory(Box::new(DefaultPolicyFactory::new(param.clone())));
        self.search
            .set_prior_knowledge(Box::new(DefaultPriorKnowledgeFactory::new(param)));
    }

    pub fn filter_param(&self) -> &MoveFilterParam {
        &self.filter_param
    }

    pub fn set_filter_param(&mut self, param: MoveFilterParam) {
        self.filter_param = param.clone();
        self.root_filter = DefaultMoveFilter::new(param.clone());
        self.search
            .set_tree_filter(Box::new(DefaultMoveFilterFactory::new(param)));
    }

    /// Start a fresh game on a board of the given size.
    pub fn clear_board(&mut self, size: usize) {
        let rules = self.board.rules().clone();
        self.board = Board::new(size, rules);
        self.last_search_history = None;
    }

    /// Execute a move for `color` (GTP `play`).
    pub fn play(&mut self, color: Color, mv: Point) -> Result<(), IllegalMove> {
        self.board.play_as(color, mv)?;
        self.auto_save();
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        let ok = self.board.undo();
        if ok {
            self.last_search_history = None;
            self.auto_save();
        }
        ok
    }

    /// Load a game: setup handicap-free history of alternating moves.
    pub fn load_position(&mut self, history: &[(Color, Point)]) -> Result<(), IllegalMove> {
        let size = self.board.size();
        let rules = self.board.rules().clone();
        let mut board = Board::new(size, rules);
        for &(color, mv) in history {
            board.play_as(color, mv)?;
        }
        self.board = board;
        self.last_search_history = None;
        Ok(())
    }

    pub fn save_position(&self) -> Vec<(Color, Point)> {
        self.board.move_history().collect()
    }

    /// Fixed handicap placement: the standard star points.
    pub fn place_fixed_handicap(&mut self, stones: usize) -> Result<Vec<Point>, String> {
        if self.board.move_count() > 0 {
            return Err("board is not empty".to_string());
        }
        let size = self.board.size();
        let points: Vec<Point> = handicap_points(size, stones)?
            .into_iter()
            .map(|(col, row)| crate::board::from_col_row(col, row, size))
            .collect();
        for &p in &points {
            self.board
                .setup_stone(Color::Black, p)
                .map_err(|e| e.to_string())?;
        }
        self.board.rules_mut().handicap = stones;
        self.board.set_to_play(Color::White);
        self.auto_save();
        Ok(points)
    }

    /// Free handicap placement: this engine plays the fixed points.
    pub fn place_free_handicap(&mut self, stones: usize) -> Result<Vec<Point>, String> {
        self.place_fixed_handicap(stones)
    }

    /// Accept opponent-chosen handicap stones.
    pub fn set_free_handicap(&mut self, points: &[Point]) -> Result<(), String> {
        if self.board.move_count() > 0 {
            return Err("board is not empty".to_string());
        }
        for &p in points {
            self.board
                .setup_stone(Color::Black, p)
                .map_err(|e| e.to_string())?;
        }
        self.board.rules_mut().handicap = points.len();
        self.board.set_to_play(Color::White);
        self.auto_save();
        Ok(())
    }

    /// Generate, and play, a move for `color`.
    pub fn genmove(&mut self, color: Color) -> GenMove {
        self.board.set_to_play(color);

        // Opening book first.
        if let Some(mv) = self.book.lookup(&self.board) {
            if self.board.is_legal(mv, color) {
                debug!("book move {}", str_coord(mv, self.board.size()));
                return self.commit(GenMove::Move(mv));
            }
        }

        let excluded = if self.config.use_root_filter {
            self.root_filter.get(&self.board)
        } else {
            Vec::new()
        };

        let reuse = self.try_reuse_subtree();
        let max_time = self.move_time_budget(color);
        let root_history: Vec<(Color, Point)> = self.board.move_history().collect();
        let result = self.search.search(
            &self.board,
            self.config.max_games,
            max_time,
            &excluded,
            reuse,
        );
        self.last_search_history = Some(root_history);

        // Resign in clearly lost positions.
        let root_count = self.search.tree().root().stats().count() as u64;
        if result.value < self.config.resign_threshold
            && root_count >= self.config.resign_min_games
        {
            info!(
                "resigning: value {:.3} after {} games",
                result.value, root_count
            );
            return GenMove::Resign;
        }

        let Some(mut best) = result.best_move else {
            return self.commit(GenMove::Pass);
        };

        // Pass only when passing wins the game outright under area
        // scoring; otherwise fall back to the runner-up move.
        if best == PASS && !self.pass_wins(color) {
            if let Some(second) = self
                .search
                .move_values()
                .into_iter()
                .find(|v| v.mv != PASS && v.count > 0)
            {
                best = second.mv;
            }
        }

        if best == PASS {
            self.commit(GenMove::Pass)
        } else {
            self.commit(GenMove::Move(best))
        }
    }

    fn commit(&mut self, decision: GenMove) -> GenMove {
        let result = match decision {
            GenMove::Move(mv) => self.board.play(mv).map(|()| decision),
            GenMove::Pass => self.board.play(PASS).map(|()| decision),
            GenMove::Resign => Ok(decision),
        };
        match result {
            Ok(d) => {
                self.auto_save();
                d
            }
            Err(e) => {
                // The search produced an unplayable move; pass rather
                // than crash the game.
                debug!("selected move rejected by the board: {e}");
                let _ = self.board.play(PASS);
                self.auto_save();
                GenMove::Pass
            }
        }
    }

    fn pass_wins(&self, color: Color) -> bool {
        let score = self.board.area_score();
        match color {
            Color::Black => score > 0.0,
            Color::White => score < 0.0,
        }
    }

    fn move_time_budget(&self, color: Color) -> Duration {
        match self.time_control.time_for_move(
            color,
            self.board.size(),
            self.board.move_count(),
        ) {
            Some(clocked) => clocked.min(self.config.max_time.max(Duration::from_millis(100))),
            None => self.config.max_time,
        }
    }

    /// Check whether the current position continues the previous search
    /// root, and if so swap the old subtree in.
    fn try_reuse_subtree(&mut self) -> bool {
        if !self.config.reuse_subtree {
            return false;
        }
        let Some(last) = &self.last_search_history else {
            return false;
        };
        let current: Vec<(Color, Point)> = self.board.move_history().collect();
        if current.len() <= last.len() || current[..last.len()] != last[..] {
            return false;
        }
        let sequence: Vec<Point> = current[last.len()..].iter().map(|&(_, mv)| mv).collect();
        let ok = self
            .search
            .find_init_tree(&sequence, self.config.max_reuse_time);
        if ok {
            debug!("subtree reuse along {} moves", sequence.len());
        }
        ok
    }

    pub fn set_time_settings(&mut self, settings: TimeSettings) {
        self.time_control.set_settings(settings);
    }

    pub fn update_time_left(&mut self, color: Color, remaining: Duration, stones: u32) {
        self.time_control.update(color, remaining, stones);
    }

    fn auto_save(&self) {
        let Some(path) = &self.config.auto_save else {
            return;
        };
        let size = self.board.size();
        let mut out = String::new();
        out.push_str(&format!(
            "size {size} komi {}\n",
            self.board.komi()
        ));
        for (color, mv) in self.board.move_history() {
            let c = match color {
                Color::Black => "B",
                Color::White => "W",
            };
            out.push_str(&format!("{c} {}\n", str_coord(mv, size)));
        }
        let write = std::fs::File::create(path).and_then(|mut f| f.write_all(out.as_bytes()));
        if let Err(e) = write {
            debug!("auto-save to {path:?} failed: {e}");
        }
    }
}
