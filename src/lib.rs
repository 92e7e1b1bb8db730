//! Sente: a Go engine built around parallel Monte-Carlo tree search.
//!
//! The engine couples an incremental Go board (blocks, liberties, ko,
//! undo, Zobrist hashing) with a UCT search using RAVE, virtual losses,
//! pluggable prior/additive knowledge, move filters and playout
//! policies, behind a GTP front-end.
//!
//! ## Modules
//!
//! - [`board`] - Board state, blocks, liberties, ko, undo, scoring
//! - [`zobrist`] - Position hash codes
//! - [`rules`] - Rule sets and handicap placement
//! - [`stats`] - Count/mean accumulators shared by the tree
//! - [`tree`] - Node pool with per-thread allocators
//! - [`patterns`] - 3x3 playout patterns
//! - [`playout`] - Playout policy protocol and the default tiered policy
//! - [`knowledge`] - Prior and additive knowledge protocols
//! - [`prior`] - Default prior knowledge
//! - [`ladder`] - Ladder reading
//! - [`safety`] - Benson-style unconditional life
//! - [`filter`] - Root and tree move filters
//! - [`search`] - The parallel UCT search driver
//! - [`player`] - genmove pipeline: book, filters, reuse, resign
//! - [`timecontrol`] - Thin clock consumer
//! - [`book`] - Opening book lookup contract
//! - [`gtp`] - GTP front-end
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use sente::board::{Board, parse_coord};
//! use sente::playout::{DefaultPolicyFactory, PlayoutParam};
//! use sente::rules::Rules;
//! use sente::search::{SearchConfig, UctSearch};
//!
//! let mut board = Board::new(9, Rules::chinese());
//! board.play(parse_coord("E5", 9).unwrap()).unwrap();
//!
//! let config = SearchConfig { deterministic: true, ..SearchConfig::default() };
//! let mut search = UctSearch::new(
//!     config,
//!     Box::new(DefaultPolicyFactory::new(PlayoutParam::default())),
//! );
//! let result = search.search(&board, 100, Duration::from_secs(60), &[], false);
//! assert!(result.best_move.is_some());
//! ```

pub mod board;
pub mod book;
pub mod filter;
pub mod gtp;
pub mod knowledge;
pub mod ladder;
pub mod patterns;
pub mod player;
pub mod playout;
pub mod prior;
pub mod rules;
pub mod safety;
pub mod search;
pub mod stats;
pub mod timecontrol;
pub mod tree;
pub mod zobrist;
