//! Parallel UCT search.
//!
//! Worker threads share one node pool and repeat the simulation cycle:
//! descend from the root by the UCB+RAVE+additive score, expand a leaf
//! that has reached the expansion threshold, run a policy playout on a
//! thread-local scratch board, and back the result up the path with RAVE
//! updates. Virtual losses spread the threads over different lines; the
//! scratch board is rewound by undo after every simulation.
//!
//! The search stops on any of: time budget, simulation budget, abort
//! flag, pool pressure (after a best-effort low-count prune into the
//! spare pool), or an early abort when the best root child cannot be
//! overtaken anymore.
//!
//! In the in-tree phase only the simple ko rule is checked on the
//! scratch board; two consecutive passes end the game and the position
//! is scored by area counting, so pass is always among the generated
//! moves and zugzwang in seki is handled. Playouts rely on the policy
//! contract never to pass while a generatable point remains.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::board::{Board, Color, Point, GRID_LEN, PASS};
use crate::filter::MoveFilterFactory;
use crate::knowledge::{AdditiveKnowledgeFactory, MoveInfo, PriorKnowledgeFactory};
use crate::playout::{PlayoutPolicy, PlayoutPolicyFactory};
use crate::rules::KoRule;
use crate::tree::{CreateResult, Proven, UctTree};

/// How the move played at the root is chosen after the search stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveSelect {
    /// Highest mean value.
    Value,
    /// Highest visit count.
    Count,
    /// Highest upper confidence bound.
    Bound,
    /// Highest RAVE-blended estimate.
    Estimate,
}

impl fmt::Display for MoveSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MoveSelect::Value => "value",
            MoveSelect::Count => "count",
            MoveSelect::Bound => "bound",
            MoveSelect::Estimate => "estimate",
        };
        f.write_str(s)
    }
}

impl FromStr for MoveSelect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "value" => Ok(MoveSelect::Value),
            "count" => Ok(MoveSelect::Count),
            "bound" => Ok(MoveSelect::Bound),
            "estimate" => Ok(MoveSelect::Estimate),
            other => Err(format!("unknown move selection: {other}")),
        }
    }
}

/// Why a search run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StopReason {
    None,
    MaxGames,
    Deadline,
    Aborted,
    EarlyAbort,
    PoolFull,
}

impl StopReason {
    fn from_u8(v: u8) -> StopReason {
        match v {
            1 => StopReason::MaxGames,
            2 => StopReason::Deadline,
            3 => StopReason::Aborted,
            4 => StopReason::EarlyAbort,
            5 => StopReason::PoolFull,
            _ => StopReason::None,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            StopReason::None => 0,
            StopReason::MaxGames => 1,
            StopReason::Deadline => 2,
            StopReason::Aborted => 3,
            StopReason::EarlyAbort => 4,
            StopReason::PoolFull => 5,
        }
    }
}

/// Search parameters. All settable through the parameter interface.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub num_threads: usize,
    /// Relaxed statistics updates; when false one search-global mutex
    /// serializes expansion and backup.
    pub lock_free: bool,
    /// Node budget of each of the two pools.
    pub max_nodes: usize,
    /// Position visits required before a leaf is expanded.
    pub expand_threshold: u32,
    /// UCB exploration constant.
    pub bias_term_constant: f32,
    /// Score for unvisited children (no prior, count 0).
    pub first_play_urgency: f32,
    pub rave: bool,
    /// RAVE-equivalence parameter: with plentiful RAVE samples, the
    /// RAVE term keeps half its weight at this many real visits.
    pub rave_equiv: f32,
    /// Distance-decayed RAVE weights instead of constant ones.
    pub rave_weight_decay: bool,
    pub virtual_loss: bool,
    /// Scale of the additive knowledge term.
    pub knowledge_weight: f32,
    /// Count offset in the additive knowledge denominator.
    pub knowledge_decay: f32,
    /// Forces one thread and count-based stop checks.
    pub deterministic: bool,
    pub seed: u64,
    /// Simulations between clock and early-abort checks.
    pub check_interval: u64,
    pub mercy_rule: bool,
    /// Terminal value spread by the final score; see the evaluation.
    pub score_modification: f32,
    /// Per-move pull of long games toward a draw. Zero disables.
    pub length_modification: f32,
    pub move_select: MoveSelect,
    /// Initial threshold for the low-count prune on pool pressure.
    pub prune_min_count: u32,
    pub early_abort: bool,
    pub early_abort_min_games: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            num_threads: 1,
            lock_free: true,
            max_nodes: 250_000,
            expand_threshold: 1,
            bias_term_constant: 0.7,
            first_play_urgency: 10.0,
            rave: true,
            rave_equiv: 3500.0,
            rave_weight_decay: false,
            virtual_loss: true,
            knowledge_weight: 1.0,
            knowledge_decay: 5.0,
            deterministic: false,
            seed: 1,
            check_interval: 128,
            mercy_rule: true,
            score_modification: 0.02,
            length_modification: 0.0,
            move_select: MoveSelect::Count,
            prune_min_count: 16,
            early_abort: true,
            early_abort_min_games: 3000,
        }
    }
}

impl SearchConfig {
    /// Threads actually used, honoring deterministic mode.
    pub fn effective_threads(&self) -> usize {
        if self.deterministic {
            1
        } else {
            self.num_threads.max(1)
        }
    }
}

/// Outcome of one search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Best root child by the configured selection, if any exists.
    pub best_move: Option<Point>,
    /// Root value: win probability for the side to move at the root.
    pub value: f32,
    pub games: u64,
    pub elapsed: Duration,
}

impl SearchResult {
    pub fn games_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.games as f64 / secs
        } else {
            0.0
        }
    }
}

/// Per-child analyze data for live outputs.
#[derive(Debug, Clone)]
pub struct MoveValue {
    pub mv: Point,
    pub count: u32,
    pub mean: f32,
    pub rave_count: f32,
    pub rave_mean: f32,
}

/// Shared state borrowed by every worker for the duration of one run.
struct Shared<'a> {
    config: &'a SearchConfig,
    tree: &'a UctTree,
    root_board: &'a Board,
    playout_factory: &'a dyn PlayoutPolicyFactory,
    prior_factory: Option<&'a dyn PriorKnowledgeFactory>,
    additive_factory: Option<&'a dyn AdditiveKnowledgeFactory>,
    tree_filter_factory: Option<&'a dyn MoveFilterFactory>,
    abort: &'a AtomicBool,
    stop_reason: AtomicU8,
    games: AtomicU64,
    pool_low: AtomicBool,
    global_lock: Mutex<()>,
    start: Instant,
    max_games: u64,
    max_time: Duration,
}

impl Shared<'_> {
    fn stop(&self, reason: StopReason) {
        self.abort.store(true, Ordering::Release);
        let _ = self.stop_reason.compare_exchange(
            0,
            reason.as_u8(),
            Ordering::AcqRel,
            Ordering::Relaxed,
        );
    }
}

/// Thread-local search state.
struct ThreadState {
    id: usize,
    board: Board,
    root_move_count: usize,
    policy: Box<dyn PlayoutPolicy + Send>,
    prior: Option<Box<dyn crate::knowledge::PriorKnowledge + Send>>,
    additive: Option<Box<dyn crate::knowledge::AdditiveKnowledge + Send>>,
    tree_filter: Option<Box<dyn crate::filter::MoveFilter + Send>>,
    rng: fastrand::Rng,
    /// Node indices of the current descent, root first.
    path: Vec<u32>,
    /// All moves of the current simulation, in play order.
    sim_moves: Vec<(Color, Point)>,
    /// First index in `sim_moves` where (color, point) was played.
    first_play: [Vec<u32>; 2],
}

const NOT_PLAYED: u32 = u32::MAX;

impl ThreadState {
    fn new(shared: &Shared<'_>, id: usize) -> ThreadState {
        let mut board = shared.root_board.clone();
        // Only simple ko is checked during simulations.
        board.rules_mut().ko_rule = KoRule::Simple;
        let root_move_count = board.move_count();
        ThreadState {
            id,
            board,
            root_move_count,
            policy: shared.playout_factory.create(),
            prior: shared.prior_factory.map(|f| f.create()),
            additive: shared.additive_factory.map(|f| f.create()),
            tree_filter: shared.tree_filter_factory.map(|f| f.create()),
            rng: fastrand::Rng::with_seed(shared.config.seed ^ (id as u64).wrapping_mul(0x9e3779b97f4a7c15)),
            path: Vec::with_capacity(128),
            sim_moves: Vec::with_capacity(1024),
            first_play: [vec![NOT_PLAYED; GRID_LEN], vec![NOT_PLAYED; GRID_LEN]],
        }
    }

    fn rewind(&mut self) {
        while self.board.move_count() > self.root_move_count {
            self.board.undo();
        }
    }
}

/// The search driver: two node pools, pluggable knowledge, filters and
/// playout policies, and the worker loop.
pub struct UctSearch {
    pub config: SearchConfig,
    tree: UctTree,
    temp_tree: UctTree,
    playout_factory: Box<dyn PlayoutPolicyFactory>,
    prior_factory: Option<Box<dyn PriorKnowledgeFactory>>,
    additive_factory: Option<Box<dyn AdditiveKnowledgeFactory>>,
    tree_filter_factory: Option<Box<dyn MoveFilterFactory>>,
    abort: AtomicBool,
    last_games: u64,
}

impl UctSearch {
    pub fn new(config: SearchConfig, playout_factory: Box<dyn PlayoutPolicyFactory>) -> Self {
        let threads = config.effective_threads();
        let tree = UctTree::new(config.max_nodes, threads);
        let temp_tree = UctTree::new(config.max_nodes, threads);
        UctSearch {
            config,
            tree,
            temp_tree,
            playout_factory,
            prior_factory: None,
            additive_factory: None,
            tree_filter_factory: None,
            abort: AtomicBool::new(false),
            last_games: 0,
        }
    }

    pub fn set_playout_factory(&mut self, factory: Box<dyn PlayoutPolicyFactory>) {
        self.playout_factory = factory;
    }

    pub fn set_prior_knowledge(&mut self, factory: Box<dyn PriorKnowledgeFactory>) {
        self.prior_factory = Some(factory);
    }

    pub fn clear_prior_knowledge(&mut self) {
        self.prior_factory = None;
    }

    pub fn set_additive_knowledge(&mut self, factory: Box<dyn AdditiveKnowledgeFactory>) {
        self.additive_factory = Some(factory);
    }

    pub fn set_tree_filter(&mut self, factory: Box<dyn MoveFilterFactory>) {
        self.tree_filter_factory = Some(factory);
    }

    pub fn tree(&self) -> &UctTree {
        &self.tree
    }

    /// Request that workers finish their current simulation and stop.
    pub fn abort(&self) {
        self.abort.store(true, Ordering::Release);
    }

    /// Extract the subtree under `sequence` into the spare pool and swap
    /// it in. On failure the live tree is cleared for a fresh start.
    pub fn find_init_tree(&mut self, sequence: &[Point], max_time: Duration) -> bool {
        self.ensure_tree_shape();
        let ok = self
            .tree
            .extract_subtree(&mut self.temp_tree, sequence, max_time);
        if ok {
            std::mem::swap(&mut self.tree, &mut self.temp_tree);
            debug!(
                "reusing subtree: {} nodes, {} root visits",
                self.tree.nu_nodes(),
                self.tree.root().pos_count()
            );
        } else {
            self.tree.clear();
        }
        ok
    }

    fn ensure_tree_shape(&mut self) {
        let threads = self.config.effective_threads();
        if self.tree.max_nodes() != self.config.max_nodes
            || self.tree.num_allocators() != threads
        {
            self.tree = UctTree::new(self.config.max_nodes, threads);
            self.temp_tree = UctTree::new(self.config.max_nodes, threads);
        }
    }

    /// Run the search from `board` until a stop condition fires.
    ///
    /// `excluded_root` removes moves from the root (the root filter);
    /// `reuse_tree` keeps the current tree (after `find_init_tree`)
    /// instead of starting fresh.
    pub fn search(
        &mut self,
        board: &Board,
        max_games: u64,
        max_time: Duration,
        excluded_root: &[Point],
        reuse_tree: bool,
    ) -> SearchResult {
        let start = Instant::now();
        self.ensure_tree_shape();
        if !reuse_tree {
            self.tree.clear();
        }
        self.abort.store(false, Ordering::Release);
        self.last_games = 0;

        // The root must have children before workers descend.
        self.expand_root(board, excluded_root);

        let mut games_done;
        loop {
            let reason = self.run_workers(board, max_games, max_time, start);
            games_done = self.last_games;
            match reason {
                StopReason::PoolFull => {
                    if games_done >= max_games || start.elapsed() >= max_time {
                        break;
                    }
                    if !self.prune_tree() {
                        info!("node pool exhausted, stopping search");
                        break;
                    }
                }
                _ => break,
            }
        }

        let root = self.tree.root();
        let result = SearchResult {
            best_move: self
                .select_best_child(self.config.move_select)
                .map(|idx| self.tree.node(idx).mv()),
            value: root.stats().mean(),
            games: games_done,
            elapsed: start.elapsed(),
        };
        info!(
            "search: {} games in {:.2}s ({:.0}/s), value {:.3}, {} nodes",
            result.games,
            result.elapsed.as_secs_f64(),
            result.games_per_second(),
            result.value,
            self.tree.nu_nodes()
        );
        result
    }

    /// Prune low-count nodes into the spare pool and swap, doubling the
    /// threshold until the result leaves breathing room.
    fn prune_tree(&mut self) -> bool {
        let mut min_count = self.config.prune_min_count.max(1);
        loop {
            if !self.tree.copy_prune_low_count(&mut self.temp_tree, min_count) {
                min_count *= 2;
                if min_count > u32::MAX / 4 {
                    return false;
                }
                continue;
            }
            let pruned = self.temp_tree.nu_nodes();
            if pruned * 2 > self.tree.max_nodes() {
                min_count *= 2;
                continue;
            }
            info!(
                "pruned tree: {} -> {} nodes (min count {})",
                self.tree.nu_nodes(),
                pruned,
                min_count
            );
            std::mem::swap(&mut self.tree, &mut self.temp_tree);
            return true;
        }
    }

    fn run_workers(
        &mut self,
        board: &Board,
        max_games: u64,
        max_time: Duration,
        start: Instant,
    ) -> StopReason {
        let shared = Shared {
            config: &self.config,
            tree: &self.tree,
            root_board: board,
            playout_factory: self.playout_factory.as_ref(),
            prior_factory: self.prior_factory.as_deref(),
            additive_factory: self.additive_factory.as_deref(),
            tree_filter_factory: self.tree_filter_factory.as_deref(),
            abort: &self.abort,
            stop_reason: AtomicU8::new(0),
            games: AtomicU64::new(self.last_games),
            pool_low: AtomicBool::new(false),
            global_lock: Mutex::new(()),
            start,
            max_games,
            max_time,
        };

        let threads = self.config.effective_threads();
        std::thread::scope(|scope| {
            for id in 1..threads {
                let shared_ref = &shared;
                scope.spawn(move || worker_loop(shared_ref, id));
            }
            worker_loop(&shared, 0);
        });

        self.last_games = shared.games.load(Ordering::Relaxed);
        let reason = StopReason::from_u8(shared.stop_reason.load(Ordering::Acquire));
        // Pool pressure is resumable; everything else keeps abort set.
        if reason == StopReason::PoolFull {
            self.abort.store(false, Ordering::Release);
        }
        reason
    }

    /// Expand the root node on the main thread so that priors and child
    /// order are reproducible.
    fn expand_root(&mut self, board: &Board, excluded_root: &[Point]) {
        if self.tree.root().has_children() {
            return;
        }
        let shared_rng_seed = self.config.seed;
        let mut rng = fastrand::Rng::with_seed(shared_rng_seed);
        let mut prior = self.prior_factory.as_ref().map(|f| f.create());
        let mut additive = self.additive_factory.as_ref().map(|f| f.create());
        let mut tree_filter = self.tree_filter_factory.as_ref().map(|f| f.create());

        let mut moves = generate_moves(board, excluded_root, tree_filter.as_deref_mut());
        if let Some(prior) = prior.as_deref_mut() {
            prior.process_position(board, &mut moves, &mut rng);
        }
        if let Some(additive) = additive.as_deref_mut() {
            additive.process_position(board, &mut moves);
        }
        let result = self.tree.create_children(0, 0, &moves);
        debug_assert!(result == CreateResult::Published);
    }

    /// The root child picked by the given selection mode. Proven wins
    /// are preferred; proven losses avoided while any alternative
    /// exists.
    pub fn select_best_child(&self, mode: MoveSelect) -> Option<u32> {
        let root = self.tree.root();
        let parent_count = root.pos_count().max(1) as f32;
        let log_parent = parent_count.ln();
        let mut best: Option<(u32, f32, bool)> = None;
        for (idx, child) in self.tree.children_of(0) {
            if child.proven() == Proven::Win {
                return Some(idx);
            }
            let proven_loss = child.proven() == Proven::Loss;
            let n = child.stats().count();
            let key = match mode {
                MoveSelect::Count => n as f32,
                MoveSelect::Value => {
                    if n == 0 {
                        f32::NEG_INFINITY
                    } else {
                        child.stats().mean()
                    }
                }
                MoveSelect::Bound => {
                    if n == 0 {
                        f32::NEG_INFINITY
                    } else {
                        child.stats().mean()
                            + self.config.bias_term_constant
                                * (log_parent / n as f32).sqrt()
                    }
                }
                MoveSelect::Estimate => {
                    if n == 0 && child.rave().count() <= 0.0 {
                        f32::NEG_INFINITY
                    } else {
                        rave_blended_value(&self.config, child)
                    }
                }
            };
            let better = match &best {
                None => true,
                Some((_, best_key, best_loss)) => {
                    (*best_loss && !proven_loss) || (*best_loss == proven_loss && key > *best_key)
                }
            };
            if better {
                best = Some((idx, key, proven_loss));
            }
        }
        best.map(|(idx, _, _)| idx)
    }

    /// Per-child analyze data, sorted by count, best first.
    pub fn move_values(&self) -> Vec<MoveValue> {
        let mut values: Vec<MoveValue> = self
            .tree
            .children_of(0)
            .map(|(_, child)| MoveValue {
                mv: child.mv(),
                count: child.stats().count(),
                mean: child.stats().mean(),
                rave_count: child.rave().count(),
                rave_mean: child.rave().mean(),
            })
            .collect();
        values.sort_by(|a, b| b.count.cmp(&a.count));
        values
    }

    /// Principal variation by visit count.
    pub fn best_sequence(&self, max_len: usize) -> Vec<Point> {
        let mut seq = Vec::new();
        let mut idx = 0u32;
        while seq.len() < max_len {
            let mut best: Option<(u32, u32)> = None;
            for (child_idx, child) in self.tree.children_of(idx) {
                let n = child.stats().count();
                if best.map_or(true, |(_, bn)| n > bn) && n > 0 {
                    best = Some((child_idx, n));
                }
            }
            let Some((child_idx, _)) = best else {
                break;
            };
            seq.push(self.tree.node(child_idx).mv());
            idx = child_idx;
        }
        seq
    }
}

/// Generate the candidate moves of a position: legal moves minus
/// exclusions and tree-filter hits, plus pass.
fn generate_moves<'a>(
    board: &Board,
    excluded: &[Point],
    tree_filter: Option<&'a mut (dyn crate::filter::MoveFilter + Send + 'static)>,
) -> Vec<MoveInfo> {
    let to_play = board.to_play();
    let filtered = tree_filter.map(|f| f.get(board)).unwrap_or_default();
    let mut moves: Vec<MoveInfo> = board
        .points()
        .filter(|&p| {
            board.is_empty(p)
                && board.is_legal(p, to_play)
                && !excluded.contains(&p)
                && !filtered.contains(&p)
        })
        .map(MoveInfo::new)
        .collect();
    moves.push(MoveInfo::new(PASS));
    moves
}

/// RAVE-blended value of a child, without the exploration term.
///
/// The blend follows the RAVE-equivalence schedule: beta starts near 1
/// while RAVE samples dominate the real visit count, falls as real
/// visits accumulate, and approaches rave_equiv / (rave_equiv + n) once
/// RAVE samples are plentiful.
fn rave_blended_value(config: &SearchConfig, child: &crate::tree::UctNode) -> f32 {
    let n = child.stats().count() as f32;
    let mean = child.stats().mean();
    let rave_count = child.rave().count();
    if !config.rave || rave_count <= 0.0 {
        return mean;
    }
    let beta = rave_count / (rave_count + n + n * rave_count / config.rave_equiv);
    (1.0 - beta) * mean + beta * child.rave().mean()
}

fn worker_loop(shared: &Shared<'_>, id: usize) {
    let mut state = ThreadState::new(shared, id);
    let mut next_check = 0u64;
    loop {
        if shared.abort.load(Ordering::Acquire) {
            shared.stop(StopReason::Aborted);
            break;
        }
        let games = shared.games.load(Ordering::Relaxed);
        if games >= shared.max_games {
            shared.stop(StopReason::MaxGames);
            break;
        }
        if id == 0 && games >= next_check {
            next_check = games + shared.config.check_interval;
            periodic_check(shared, games);
            if shared.abort.load(Ordering::Acquire) {
                break;
            }
        }
        simulate(shared, &mut state);
        shared.games.fetch_add(1, Ordering::Relaxed);
    }
}

/// Clock, pool and early-abort checks, run by thread 0 between
/// simulations. Also emits the live search summary.
fn periodic_check(shared: &Shared<'_>, games: u64) {
    if shared.start.elapsed() >= shared.max_time {
        shared.stop(StopReason::Deadline);
        return;
    }
    if shared.pool_low.load(Ordering::Acquire) {
        shared.stop(StopReason::PoolFull);
        return;
    }
    if games > 0 && log::log_enabled!(log::Level::Debug) {
        let mut best_count = 0u32;
        let mut best_mean = 0f32;
        let mut best_mv = PASS;
        for (_, child) in shared.tree.children_of(0) {
            let n = child.stats().count();
            if n > best_count {
                best_count = n;
                best_mean = child.stats().mean();
                best_mv = child.mv();
            }
        }
        let size = shared.root_board.size();
        debug!(
            "[{games:>6}] value {best_mean:.3} best {} ({best_count} visits)",
            crate::board::str_coord(best_mv, size)
        );
    }
    if shared.config.early_abort && games >= shared.config.early_abort_min_games {
        let mut best = 0u64;
        let mut second = 0u64;
        for (_, child) in shared.tree.children_of(0) {
            let n = child.stats().count() as u64;
            if n > best {
                second = best;
                best = n;
            } else if n > second {
                second = n;
            }
        }
        let remaining = shared.max_games.saturating_sub(games);
        if best > second + remaining {
            debug!("early abort: best child out of reach at {games} games");
            shared.stop(StopReason::EarlyAbort);
        }
    }
}

/// One complete simulation: descend, expand, play out, back up.
fn simulate(shared: &Shared<'_>, state: &mut ThreadState) {
    let config = shared.config;
    let tree = shared.tree;
    state.path.clear();
    state.sim_moves.clear();
    state.path.push(0);

    let mut node_idx = 0u32;
    let mut virtual_losses: Vec<u32> = Vec::new();
    let mut terminal_eval: Option<f32> = None;

    // Descend.
    loop {
        let node = tree.node(node_idx);
        match node.proven() {
            Proven::None => {}
            proven => {
                // Result known exactly: a win for the player who moved
                // into this node is a loss for the side to move here.
                terminal_eval = Some(match proven {
                    Proven::Win => 0.0,
                    _ => 1.0,
                });
                break;
            }
        }
        if !node.has_children() {
            break;
        }
        let child_idx = select_child(shared, node_idx);
        let child = tree.node(child_idx);
        let mv = child.mv();
        let mover = state.board.to_play();
        if state.board.play(mv).is_err() {
            // Children are position-deterministic, so this does not
            // happen in practice; abandon the simulation if it does.
            undo_virtual_losses(tree, &virtual_losses);
            reset_first_play(state);
            state.rewind();
            return;
        }
        record_move(state, mover, mv);
        if config.virtual_loss && config.effective_threads() > 1 {
            child.add_virtual_loss();
            virtual_losses.push(child_idx);
        }
        state.path.push(child_idx);
        node_idx = child_idx;

        // Two passes end the in-tree game: score it exactly.
        if state.board.consecutive_passes() >= 2
            && state.board.rules().two_passes_end_game
        {
            let score = state.board.area_score();
            let to_play = state.board.to_play();
            let mover_won = match mover {
                Color::Black => score > 0.0,
                Color::White => score < 0.0,
            };
            child.set_proven(if mover_won { Proven::Win } else { Proven::Loss });
            // Evaluate from the side to move at the terminal position.
            terminal_eval = Some(evaluate_position(&state.board, to_play, config, 0));
            break;
        }
    }

    let eval = match terminal_eval {
        Some(eval) => eval,
        None => {
            // Expand when the leaf has seen enough visits.
            let leaf_idx = *state.path.last().expect("path has the root");
            let leaf = tree.node(leaf_idx);
            if leaf.pos_count() >= config.expand_threshold && !leaf.has_children() {
                let guard = if config.lock_free {
                    None
                } else {
                    Some(shared.global_lock.lock().expect("search lock"))
                };
                expand_node(shared, state, leaf_idx);
                drop(guard);
                // Continue one step into the fresh children.
                if tree.node(leaf_idx).has_children() {
                    let child_idx = select_child(shared, leaf_idx);
                    let child = tree.node(child_idx);
                    let mover = state.board.to_play();
                    if state.board.play(child.mv()).is_ok() {
                        record_move(state, mover, child.mv());
                        if config.virtual_loss && config.effective_threads() > 1 {
                            child.add_virtual_loss();
                            virtual_losses.push(child_idx);
                        }
                        state.path.push(child_idx);
                    }
                }
            }
            playout(shared, state)
        }
    };

    // Back up.
    let guard = if config.lock_free {
        None
    } else {
        Some(shared.global_lock.lock().expect("search lock"))
    };
    backup(shared, state, eval);
    drop(guard);

    undo_virtual_losses(tree, &virtual_losses);
    reset_first_play(state);
    state.rewind();
}

/// Append a move to the simulation record and note its first play.
fn record_move(state: &mut ThreadState, mover: Color, mv: Point) {
    state.sim_moves.push((mover, mv));
    if mv != PASS {
        let fp = &mut state.first_play[mover.index()][mv];
        if *fp == NOT_PLAYED {
            *fp = (state.sim_moves.len() - 1) as u32;
        }
    }
}

/// Clear the first-play table entries touched by this simulation.
fn reset_first_play(state: &mut ThreadState) {
    for i in 0..state.sim_moves.len() {
        let (color, mv) = state.sim_moves[i];
        if mv != PASS {
            state.first_play[color.index()][mv] = NOT_PLAYED;
        }
    }
}

fn undo_virtual_losses(tree: &UctTree, nodes: &[u32]) {
    for &idx in nodes {
        tree.node(idx).remove_virtual_loss();
    }
}

/// Generate, annotate and publish children of `leaf`.
fn expand_node(shared: &Shared<'_>, state: &mut ThreadState, leaf_idx: u32) {
    let mut moves = generate_moves(&state.board, &[], state.tree_filter.as_deref_mut());
    if let Some(prior) = state.prior.as_deref_mut() {
        prior.process_position(&state.board, &mut moves, &mut state.rng);
    }
    if let Some(additive) = state.additive.as_deref_mut() {
        additive.process_position(&state.board, &mut moves);
    }
    match shared.tree.create_children(state.id, leaf_idx, &moves) {
        CreateResult::OutOfMemory => {
            shared.pool_low.store(true, Ordering::Release);
        }
        CreateResult::Published | CreateResult::Raced => {}
    }
}

/// UCB + RAVE + additive-knowledge selection among published children.
fn select_child(shared: &Shared<'_>, parent_idx: u32) -> u32 {
    let config = shared.config;
    let tree = shared.tree;
    let parent = tree.node(parent_idx);
    let parent_count = parent.pos_count().max(1) as f32;
    let log_parent = parent_count.ln();
    let mut best_idx = 0u32;
    let mut best_score = f32::NEG_INFINITY;
    for (idx, child) in tree.children_of(parent_idx) {
        match child.proven() {
            Proven::Win => return idx,
            Proven::Loss => continue,
            Proven::None => {}
        }
        let n = child.stats().count();
        let score = if n == 0 {
            config.first_play_urgency
                + config.knowledge_weight * child.predictor() / config.knowledge_decay
        } else {
            let value = rave_blended_value(config, child);
            let ucb = config.bias_term_constant * (log_parent / n as f32).sqrt();
            let add =
                config.knowledge_weight * child.predictor() / (n as f32 + config.knowledge_decay);
            value + ucb + add
        };
        // Strict comparison keeps ties on the lowest child index.
        if score > best_score {
            best_score = score;
            best_idx = idx;
        }
    }
    if best_score == f32::NEG_INFINITY {
        // Everything is a proven loss; concede to the first child.
        if let Some((idx, _)) = tree.children_of(parent_idx).next() {
            return idx;
        }
    }
    best_idx
}

/// Policy-driven rollout from the current scratch position. Returns the
/// evaluation from the perspective of the side to move at the playout
/// start.
fn playout(shared: &Shared<'_>, state: &mut ThreadState) -> f32 {
    let config = shared.config;
    let start_player = state.board.to_play();
    let size = state.board.size();
    let area = (size * size) as i32;
    let max_playout_len = 3 * size * size;
    let mercy_threshold = (area * 3) / 10;

    let mut stone_diff: i32 = 0;
    for p in state.board.points() {
        match state.board.color_at(p) {
            crate::board::PointState::Black => stone_diff += 1,
            crate::board::PointState::White => stone_diff -= 1,
            _ => {}
        }
    }

    state.policy.start_playout(&state.board, &mut state.rng);
    let mut length = 0usize;
    let mut mercy_result: Option<Color> = None;
    while state.board.consecutive_passes() < 2 && length < max_playout_len {
        let mover = state.board.to_play();
        let mv = state.policy.generate_move(&state.board, &mut state.rng);
        if state.board.play(mv).is_err() {
            // Treat an unplayable suggestion as the end of the rollout
            // and score the position as it stands.
            break;
        }
        record_move(state, mover, mv);
        if mv != PASS {
            let sign = if mover == Color::Black { 1 } else { -1 };
            stone_diff += sign;
            let captured = state.board.last_captured_points().count() as i32;
            if state.board.last_move_info().is_suicide {
                stone_diff -= sign * captured;
            } else {
                stone_diff += sign * captured;
            }
        }
        state.policy.on_play(&state.board);
        length += 1;
        if config.mercy_rule && stone_diff.abs() > mercy_threshold {
            mercy_result = Some(if stone_diff > 0 {
                Color::Black
            } else {
                Color::White
            });
            break;
        }
    }
    state.policy.end_playout();

    match mercy_result {
        Some(winner) => {
            if winner == start_player {
                1.0
            } else {
                0.0
            }
        }
        None => evaluate_position(&state.board, start_player, config, length),
    }
}

/// Terminal evaluation in [0, 1] from `player`'s perspective: win/loss
/// spread slightly by the final score, and optionally pulled toward a
/// draw for long games.
fn evaluate_position(
    board: &Board,
    player: Color,
    config: &SearchConfig,
    game_length: usize,
) -> f32 {
    let score_black = board.area_score();
    let score = match player {
        Color::Black => score_black,
        Color::White => -score_black,
    };
    let size = board.size();
    let max_score = (size * size) as f32 + board.komi().abs();
    let modification = config.score_modification;
    let mut eval = if score > f32::EPSILON {
        1.0 - modification + modification * score / max_score
    } else if score < -f32::EPSILON {
        modification + modification * score / max_score
    } else {
        0.5
    };
    if config.length_modification > 0.0 {
        let pull = config.length_modification * game_length as f32;
        if eval > 0.5 {
            eval = (eval - pull).max(0.5);
        } else {
            eval = (eval + pull).min(0.5);
        }
    }
    eval
}

/// Propagate the result up the path, flipping perspective per level,
/// and update RAVE statistics of the children along the way.
fn backup(shared: &Shared<'_>, state: &mut ThreadState, eval: f32) {
    let tree = shared.tree;
    let config = shared.config;
    let depth = state.path.len() - 1;
    // Perspective helper: value for the player to move after j plies
    // from the root. The eval is from the player to move at ply depth.
    let value_at = |j: usize| -> f32 {
        if (depth - j) % 2 == 0 {
            eval
        } else {
            1.0 - eval
        }
    };

    let total_moves = state.sim_moves.len() as u32;
    for (i, &idx) in state.path.iter().enumerate() {
        let node = tree.node(idx);
        node.inc_pos_count();
        // The node's own statistic is from the perspective of the player
        // who moved into it; the root keeps the root player's view.
        let own_value = if i == 0 { value_at(0) } else { value_at(i - 1) };
        node.stats().add(own_value);

        // RAVE: children matching a later move by the mover at this
        // node.
        if config.rave && node.has_children() {
            let mover = if i % 2 == 0 {
                shared.root_board.to_play()
            } else {
                shared.root_board.to_play().opponent()
            };
            let mover_value = value_at(i);
            for (_, child) in tree.children_of(idx) {
                let mv = child.mv();
                if mv == PASS {
                    continue;
                }
                let first = state.first_play[mover.index()][mv];
                if first == NOT_PLAYED || (first as usize) < i {
                    continue;
                }
                let weight = if config.rave_weight_decay {
                    let span = (total_moves as f32 - i as f32).max(1.0);
                    ((total_moves - first) as f32 / span).clamp(0.05, 1.0)
                } else {
                    1.0
                };
                child.rave().add(mover_value, weight);
            }
        }
    }
}
