//! Go Text Protocol (GTP) front-end.
//!
//! Implements GTP version 2 over stdio so the engine can be driven by
//! controllers like GoGui or Sabaki. Besides the standard game commands
//! the engine exposes its parameters by name (`param_search`,
//! `param_playout`, `param_filter`, `param_player`) and live analyze
//! data from the last search (`move_values`, `best_sequence`).
//!
//! Every command either succeeds with a response or fails with a
//! one-line reason; bad input never crashes the process.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use crate::board::{parse_coord, str_coord, Color, PASS};
use crate::player::{GenMove, Player};
use crate::rules::Rules;
use crate::search::MoveSelect;
use crate::timecontrol::TimeSettings;

/// The list of known GTP commands.
const KNOWN_COMMANDS: &[&str] = &[
    "best_sequence",
    "boardsize",
    "clear_board",
    "cputime",
    "final_score",
    "fixed_handicap",
    "genmove",
    "known_command",
    "komi",
    "list_commands",
    "move_values",
    "name",
    "param_filter",
    "param_player",
    "param_playout",
    "param_search",
    "place_free_handicap",
    "play",
    "protocol_version",
    "quit",
    "rules",
    "set_free_handicap",
    "showboard",
    "time_left",
    "time_settings",
    "undo",
    "version",
];

/// GTP engine state.
pub struct GtpEngine {
    player: Player,
    start_time: std::time::Instant,
}

impl GtpEngine {
    pub fn new(player: Player) -> Self {
        GtpEngine {
            player,
            start_time: std::time::Instant::now(),
        }
    }

    /// Run the command loop, reading from stdin and writing to stdout.
    pub fn run(&mut self) {
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (id, command_line) = Self::parse_id(line);
            let parts: Vec<&str> = command_line.split_whitespace().collect();
            if parts.is_empty() {
                continue;
            }
            let command = parts[0].to_lowercase();
            let args = &parts[1..];

            let (success, message) = self.execute(&command, args);
            let prefix = if success { '=' } else { '?' };
            let id_str = id.map(|i| i.to_string()).unwrap_or_default();
            writeln!(stdout, "{prefix}{id_str} {message}\n").ok();
            stdout.flush().ok();

            if command == "quit" {
                break;
            }
        }
    }

    /// Parse an optional numeric command id from the start of the line.
    fn parse_id(line: &str) -> (Option<u32>, &str) {
        let trimmed = line.trim();
        let end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        if end > 0 {
            if let Ok(id) = trimmed[..end].parse::<u32>() {
                return (Some(id), trimmed[end..].trim());
            }
        }
        (None, trimmed)
    }

    fn size(&self) -> usize {
        self.player.board().size()
    }

    /// Execute one command; returns (success, response body).
    pub fn execute(&mut self, command: &str, args: &[&str]) -> (bool, String) {
        match command {
            "name" => (true, "sente".to_string()),
            "version" => (true, env!("CARGO_PKG_VERSION").to_string()),
            "protocol_version" => (true, "2".to_string()),
            "list_commands" => (true, KNOWN_COMMANDS.join("\n")),
            "known_command" => {
                let Some(&cmd) = args.first() else {
                    return (false, "missing argument".to_string());
                };
                let known = KNOWN_COMMANDS.contains(&cmd.to_lowercase().as_str());
                (true, known.to_string())
            }
            "quit" => (true, String::new()),

            "boardsize" => match args.first().and_then(|s| s.parse::<usize>().ok()) {
                Some(size) if (2..=crate::board::MAX_SIZE).contains(&size) => {
                    self.player.clear_board(size);
                    (true, String::new())
                }
                Some(size) => (false, format!("unacceptable size: {size}")),
                None => (false, "invalid size".to_string()),
            },

            "clear_board" => {
                let size = self.size();
                self.player.clear_board(size);
                (true, String::new())
            }

            "komi" => match args.first().and_then(|s| s.parse::<f32>().ok()) {
                Some(komi) => {
                    self.player.board_mut().set_komi(komi);
                    (true, String::new())
                }
                None => (false, "invalid komi".to_string()),
            },

            "rules" => {
                if args.is_empty() {
                    let r = self.player.board().rules().clone();
                    return (
                        true,
                        format!(
                            "komi {}\nsuicide {}\nko_rule {}\ncapture_dead {}\nhandicap {}",
                            r.komi, r.allow_suicide, r.ko_rule, r.capture_dead, r.handicap
                        ),
                    );
                }
                match Rules::named(args[0]) {
                    Ok(rules) => {
                        *self.player.board_mut().rules_mut() = rules;
                        (true, String::new())
                    }
                    Err(e) => (false, e),
                }
            }

            "play" => {
                if args.len() < 2 {
                    return (false, "missing arguments".to_string());
                }
                let Ok(color) = args[0].parse::<Color>() else {
                    return (false, format!("invalid color: {}", args[0]));
                };
                let Some(mv) = parse_coord(args[1], self.size()) else {
                    return (false, format!("invalid vertex: {}", args[1]));
                };
                match self.player.play(color, mv) {
                    Ok(()) => (true, String::new()),
                    Err(e) => (false, e.to_string()),
                }
            }

            "undo" => {
                if self.player.undo() {
                    (true, String::new())
                } else {
                    (false, "cannot undo".to_string())
                }
            }

            "genmove" => {
                let Some(&color_str) = args.first() else {
                    return (false, "missing argument".to_string());
                };
                let Ok(color) = color_str.parse::<Color>() else {
                    return (false, format!("invalid color: {color_str}"));
                };
                let answer = match self.player.genmove(color) {
                    GenMove::Resign => "resign".to_string(),
                    GenMove::Pass => "pass".to_string(),
                    GenMove::Move(mv) => str_coord(mv, self.size()),
                };
                eprint!("{}", self.player.board());
                (true, answer)
            }

            "final_score" => (true, self.player.board().score_string()),

            "showboard" => (true, format!("\n{}", self.player.board())),

            "fixed_handicap" | "place_free_handicap" => {
                let Some(n) = args.first().and_then(|s| s.parse::<usize>().ok()) else {
                    return (false, "invalid number of stones".to_string());
                };
                let result = if command == "fixed_handicap" {
                    self.player.place_fixed_handicap(n)
                } else {
                    self.player.place_free_handicap(n)
                };
                match result {
                    Ok(points) => {
                        let size = self.size();
                        let coords: Vec<String> =
                            points.iter().map(|&p| str_coord(p, size)).collect();
                        (true, coords.join(" "))
                    }
                    Err(e) => (false, e),
                }
            }

            "set_free_handicap" => {
                let size = self.size();
                let mut points = Vec::new();
                for &arg in args {
                    match parse_coord(arg, size) {
                        Some(p) if p != PASS => points.push(p),
                        _ => return (false, format!("invalid vertex: {arg}")),
                    }
                }
                match self.player.set_free_handicap(&points) {
                    Ok(()) => (true, String::new()),
                    Err(e) => (false, e),
                }
            }

            "time_settings" => {
                if args.len() < 3 {
                    return (false, "missing arguments".to_string());
                }
                let parse = |s: &str| s.parse::<u64>().ok();
                match (parse(args[0]), parse(args[1]), args[2].parse::<u32>().ok()) {
                    (Some(main), Some(byo), Some(stones)) => {
                        self.player.set_time_settings(TimeSettings {
                            main_time: Duration::from_secs(main),
                            byoyomi_time: Duration::from_secs(byo),
                            byoyomi_stones: stones,
                        });
                        (true, String::new())
                    }
                    _ => (false, "invalid time settings".to_string()),
                }
            }

            "time_left" => {
                if args.len() < 3 {
                    return (false, "missing arguments".to_string());
                }
                let Ok(color) = args[0].parse::<Color>() else {
                    return (false, format!("invalid color: {}", args[0]));
                };
                match (args[1].parse::<u64>(), args[2].parse::<u32>()) {
                    (Ok(time), Ok(stones)) => {
                        self.player
                            .update_time_left(color, Duration::from_secs(time), stones);
                        (true, String::new())
                    }
                    _ => (false, "invalid time_left arguments".to_string()),
                }
            }

            "move_values" => {
                let size = self.size();
                let lines: Vec<String> = self
                    .player
                    .search()
                    .move_values()
                    .iter()
                    .map(|v| {
                        format!(
                            "{} {} {:.3} {:.0} {:.3}",
                            str_coord(v.mv, size),
                            v.count,
                            v.mean,
                            v.rave_count,
                            v.rave_mean
                        )
                    })
                    .collect();
                (true, lines.join("\n"))
            }

            "best_sequence" => {
                let size = self.size();
                let seq: Vec<String> = self
                    .player
                    .search()
                    .best_sequence(10)
                    .iter()
                    .map(|&mv| str_coord(mv, size))
                    .collect();
                (true, seq.join(" "))
            }

            "param_search" => self.param_search(args),
            "param_playout" => self.param_playout(args),
            "param_filter" => self.param_filter(args),
            "param_player" => self.param_player(args),

            "cputime" => (
                true,
                format!("{:.3}", self.start_time.elapsed().as_secs_f64()),
            ),

            _ => (false, format!("unknown command: {command}")),
        }
    }

    fn param_search(&mut self, args: &[&str]) -> (bool, String) {
        let config = &mut self.player.search_mut().config;
        if args.is_empty() {
            let rows = [
                format!("num_threads int {}", config.num_threads),
                format!("lock_free bool {}", config.lock_free),
                format!("max_nodes int {}", config.max_nodes),
                format!("expand_threshold int {}", config.expand_threshold),
                format!("bias_term_constant float {}", config.bias_term_constant),
                format!("first_play_urgency float {}", config.first_play_urgency),
                format!("rave bool {}", config.rave),
                format!("rave_equiv float {}", config.rave_equiv),
                format!("rave_weight_decay bool {}", config.rave_weight_decay),
                format!("virtual_loss bool {}", config.virtual_loss),
                format!("knowledge_weight float {}", config.knowledge_weight),
                format!("knowledge_decay float {}", config.knowledge_decay),
                format!("deterministic bool {}", config.deterministic),
                format!("seed int {}", config.seed),
                format!("check_interval int {}", config.check_interval),
                format!("mercy_rule bool {}", config.mercy_rule),
                format!("score_modification float {}", config.score_modification),
                format!("length_modification float {}", config.length_modification),
                format!("move_select string {}", config.move_select),
                format!("prune_min_count int {}", config.prune_min_count),
                format!("early_abort bool {}", config.early_abort),
                format!("early_abort_min_games int {}", config.early_abort_min_games),
            ];
            return (true, rows.join("\n"));
        }
        if args.len() != 2 {
            return (false, "expected: param_search [name value]".to_string());
        }
        let (name, value) = (args[0], args[1]);
        let result: Result<(), String> = (|| {
            match name {
                "num_threads" => {
                    let v = parse_int(value)? as usize;
                    if !(1..=256).contains(&v) {
                        return Err(format!("num_threads out of range: {v}"));
                    }
                    config.num_threads = v;
                }
                "lock_free" => config.lock_free = parse_bool(value)?,
                "max_nodes" => {
                    let v = parse_int(value)? as usize;
                    if v < 1000 {
                        return Err(format!("max_nodes too small: {v}"));
                    }
                    config.max_nodes = v;
                }
                "expand_threshold" => config.expand_threshold = parse_int(value)? as u32,
                "bias_term_constant" => {
                    let v = parse_float(value)?;
                    if v < 0.0 {
                        return Err(format!("bias_term_constant negative: {v}"));
                    }
                    config.bias_term_constant = v;
                }
                "first_play_urgency" => config.first_play_urgency = parse_float(value)?,
                "rave" => config.rave = parse_bool(value)?,
                "rave_equiv" => {
                    let v = parse_float(value)?;
                    if v <= 0.0 {
                        return Err(format!("rave_equiv must be positive: {v}"));
                    }
                    config.rave_equiv = v;
                }
                "rave_weight_decay" => config.rave_weight_decay = parse_bool(value)?,
                "virtual_loss" => config.virtual_loss = parse_bool(value)?,
                "knowledge_weight" => config.knowledge_weight = parse_float(value)?,
                "knowledge_decay" => {
                    let v = parse_float(value)?;
                    if v <= 0.0 {
                        return Err(format!("knowledge_decay must be positive: {v}"));
                    }
                    config.knowledge_decay = v;
                }
                "deterministic" => config.deterministic = parse_bool(value)?,
                "seed" => config.seed = parse_int(value)?,
                "check_interval" => {
                    let v = parse_int(value)?;
                    if v == 0 {
                        return Err("check_interval must be positive".to_string());
                    }
                    config.check_interval = v;
                }
                "mercy_rule" => config.mercy_rule = parse_bool(value)?,
                "score_modification" => {
                    let v = parse_float(value)?;
                    if !(0.0..=1.0).contains(&v) {
                        return Err(format!("score_modification out of range: {v}"));
                    }
                    config.score_modification = v;
                }
                "length_modification" => config.length_modification = parse_float(value)?,
                "move_select" => config.move_select = value.parse::<MoveSelect>()?,
                "prune_min_count" => config.prune_min_count = parse_int(value)? as u32,
                "early_abort" => config.early_abort = parse_bool(value)?,
                "early_abort_min_games" => config.early_abort_min_games = parse_int(value)?,
                other => return Err(format!("unknown parameter: {other}")),
            }
            Ok(())
        })();
        match result {
            Ok(()) => (true, String::new()),
            Err(e) => (false, e),
        }
    }

    fn param_playout(&mut self, args: &[&str]) -> (bool, String) {
        if args.is_empty() {
            let p = self.player.playout_param();
            let rows = [
                format!("respond_to_atari bool {}", p.respond_to_atari),
                format!("low_lib_tactics bool {}", p.low_lib_tactics),
                format!("use_patterns bool {}", p.use_patterns),
                format!("global_capture bool {}", p.global_capture),
                format!("self_atari_correction bool {}", p.self_atari_correction),
                format!("use_clump_correction bool {}", p.use_clump_correction),
                format!("statistics_enabled bool {}", p.statistics_enabled),
            ];
            return (true, rows.join("\n"));
        }
        if args.len() != 2 {
            return (false, "expected: param_playout [name value]".to_string());
        }
        let mut param = self.player.playout_param().clone();
        let result: Result<(), String> = (|| {
            let v = parse_bool(args[1])?;
            match args[0] {
                "respond_to_atari" => param.respond_to_atari = v,
                "low_lib_tactics" => param.low_lib_tactics = v,
                "use_patterns" => param.use_patterns = v,
                "global_capture" => param.global_capture = v,
                "self_atari_correction" => param.self_atari_correction = v,
                "use_clump_correction" => param.use_clump_correction = v,
                "statistics_enabled" => param.statistics_enabled = v,
                other => return Err(format!("unknown parameter: {other}")),
            }
            Ok(())
        })();
        match result {
            Ok(()) => {
                self.player.set_playout_param(param);
                (true, String::new())
            }
            Err(e) => (false, e),
        }
    }

    fn param_filter(&mut self, args: &[&str]) -> (bool, String) {
        if args.is_empty() {
            let p = self.player.filter_param();
            let rows = [
                format!("check_safety bool {}", p.check_safety),
                format!("check_ladders bool {}", p.check_ladders),
                format!("check_offensive_ladders bool {}", p.check_offensive_ladders),
                format!("min_ladder_length int {}", p.min_ladder_length),
                format!("filter_first_line bool {}", p.filter_first_line),
            ];
            return (true, rows.join("\n"));
        }
        if args.len() != 2 {
            return (false, "expected: param_filter [name value]".to_string());
        }
        let mut param = self.player.filter_param().clone();
        let result: Result<(), String> = (|| {
            match args[0] {
                "check_safety" => param.check_safety = parse_bool(args[1])?,
                "check_ladders" => param.check_ladders = parse_bool(args[1])?,
                "check_offensive_ladders" => {
                    param.check_offensive_ladders = parse_bool(args[1])?;
                }
                "min_ladder_length" => {
                    param.min_ladder_length = parse_int(args[1])? as usize;
                }
                "filter_first_line" => param.filter_first_line = parse_bool(args[1])?,
                other => return Err(format!("unknown parameter: {other}")),
            }
            Ok(())
        })();
        match result {
            Ok(()) => {
                self.player.set_filter_param(param);
                (true, String::new())
            }
            Err(e) => (false, e),
        }
    }

    fn param_player(&mut self, args: &[&str]) -> (bool, String) {
        if args.is_empty() {
            let c = &self.player.config;
            let auto_save = c
                .auto_save
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            let rows = [
                format!("max_games int {}", c.max_games),
                format!("max_time float {}", c.max_time.as_secs_f64()),
                format!("resign_threshold float {}", c.resign_threshold),
                format!("resign_min_games int {}", c.resign_min_games),
                format!("reuse_subtree bool {}", c.reuse_subtree),
                format!("use_root_filter bool {}", c.use_root_filter),
                format!("max_reuse_time float {}", c.max_reuse_time.as_secs_f64()),
                format!("auto_save string {auto_save}"),
            ];
            return (true, rows.join("\n"));
        }
        if args.len() != 2 {
            return (false, "expected: param_player [name value]".to_string());
        }
        let config = &mut self.player.config;
        let result: Result<(), String> = (|| {
            match args[0] {
                "max_games" => {
                    let v = parse_int(args[1])?;
                    if v == 0 {
                        return Err("max_games must be positive".to_string());
                    }
                    config.max_games = v;
                }
                "max_time" => {
                    let v = parse_float(args[1])?;
                    if v <= 0.0 {
                        return Err(format!("max_time must be positive: {v}"));
                    }
                    config.max_time = Duration::from_secs_f32(v);
                }
                "resign_threshold" => {
                    let v = parse_float(args[1])?;
                    if !(0.0..=1.0).contains(&v) {
                        return Err(format!("resign_threshold out of range: {v}"));
                    }
                    config.resign_threshold = v;
                }
                "resign_min_games" => config.resign_min_games = parse_int(args[1])?,
                "reuse_subtree" => config.reuse_subtree = parse_bool(args[1])?,
                "use_root_filter" => config.use_root_filter = parse_bool(args[1])?,
                "max_reuse_time" => {
                    let v = parse_float(args[1])?;
                    if v < 0.0 {
                        return Err(format!("max_reuse_time negative: {v}"));
                    }
                    config.max_reuse_time = Duration::from_secs_f32(v);
                }
                "auto_save" => {
                    config.auto_save = if args[1].is_empty() {
                        None
                    } else {
                        Some(args[1].into())
                    };
                }
                other => return Err(format!("unknown parameter: {other}")),
            }
            Ok(())
        })();
        match result {
            Ok(()) => (true, String::new()),
            Err(e) => (false, e),
        }
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(format!("invalid bool: {other}")),
    }
}

fn parse_int(s: &str) -> Result<u64, String> {
    s.parse::<u64>().map_err(|_| format!("invalid integer: {s}"))
}

fn parse_float(s: &str) -> Result<f32, String> {
    s.parse::<f32>().map_err(|_| format!("invalid number: {s}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchConfig;

    fn engine() -> GtpEngine {
        let config = SearchConfig {
            deterministic: true,
            seed: 3,
            max_nodes: 20_000,
            early_abort: false,
            ..SearchConfig::default()
        };
        let mut player = Player::new(9, Rules::chinese(), config);
        player.config.max_games = 60;
        player.config.max_time = Duration::from_secs(3600);
        player.config.resign_min_games = u64::MAX;
        GtpEngine::new(player)
    }

    #[test]
    fn parse_id_variants() {
        assert_eq!(GtpEngine::parse_id("12 play b D4"), (Some(12), "play b D4"));
        assert_eq!(GtpEngine::parse_id("play b D4"), (None, "play b D4"));
    }

    #[test]
    fn protocol_basics() {
        let mut e = engine();
        assert_eq!(e.execute("protocol_version", &[]), (true, "2".to_string()));
        assert_eq!(e.execute("name", &[]).1, "sente");
        let (ok, known) = e.execute("known_command", &["genmove"]);
        assert!(ok);
        assert_eq!(known, "true");
        let (ok, known) = e.execute("known_command", &["loadsgf"]);
        assert!(ok);
        assert_eq!(known, "false");
    }

    #[test]
    fn boardsize_bounds() {
        let mut e = engine();
        assert!(e.execute("boardsize", &["19"]).0);
        assert!(e.execute("boardsize", &["25"]).0);
        assert!(!e.execute("boardsize", &["26"]).0);
        assert!(!e.execute("boardsize", &["1"]).0);
        assert!(!e.execute("boardsize", &["x"]).0);
    }

    #[test]
    fn play_undo_cycle() {
        let mut e = engine();
        assert!(e.execute("play", &["black", "D4"]).0);
        assert!(e.execute("play", &["white", "E5"]).0);
        assert!(!e.execute("play", &["black", "D4"]).0);
        assert!(e.execute("undo", &[]).0);
        assert!(e.execute("undo", &[]).0);
        assert!(!e.execute("undo", &[]).0);
    }

    #[test]
    fn empty_board_passes_score_to_white() {
        let mut e = engine();
        // Two passes end the game; with no stones the komi decides.
        assert!(e.execute("play", &["black", "pass"]).0);
        assert!(e.execute("play", &["white", "pass"]).0);
        let (ok, score) = e.execute("final_score", &[]);
        assert!(ok);
        assert_eq!(score, "W+7.5");
    }

    #[test]
    fn fixed_handicap_output() {
        let mut e = engine();
        assert!(e.execute("boardsize", &["19"]).0);
        let (ok, coords) = e.execute("place_free_handicap", &["5"]);
        assert!(ok, "{coords}");
        let mut parts: Vec<&str> = coords.split_whitespace().collect();
        parts.sort_unstable();
        assert_eq!(parts.len(), 5);
        for expected in ["D4", "Q16", "D16", "Q4", "K10"] {
            assert!(parts.contains(&expected), "missing {expected}: {coords}");
        }
    }

    #[test]
    fn param_round_trip_and_validation() {
        let mut e = engine();
        assert!(e.execute("param_search", &["rave", "false"]).0);
        let (_, listing) = e.execute("param_search", &[]);
        assert!(listing.contains("rave bool false"));

        // Out-of-range value fails and preserves the old one.
        let before = e.player.search().config.score_modification;
        assert!(!e.execute("param_search", &["score_modification", "7"]).0);
        assert_eq!(e.player.search().config.score_modification, before);

        assert!(!e.execute("param_search", &["no_such_param", "1"]).0);
        assert!(e.execute("param_playout", &["use_patterns", "false"]).0);
        assert!(e.execute("param_filter", &["min_ladder_length", "8"]).0);
        assert!(e.execute("param_player", &["resign_threshold", "0.05"]).0);
        assert!(!e.execute("param_player", &["resign_threshold", "5"]).0);
    }

    #[test]
    fn genmove_answers_with_a_vertex() {
        let mut e = engine();
        assert!(e.execute("boardsize", &["5"]).0);
        let (ok, answer) = e.execute("genmove", &["black"]);
        assert!(ok);
        assert!(
            answer == "pass" || parse_coord(&answer, 5).is_some(),
            "unexpected answer {answer}"
        );
        // Analyze data from the finished search is available.
        let (ok, values) = e.execute("move_values", &[]);
        assert!(ok);
        assert!(!values.is_empty());
        let (ok, _seq) = e.execute("best_sequence", &[]);
        assert!(ok);
    }

    #[test]
    fn rules_command() {
        let mut e = engine();
        assert!(e.execute("rules", &["tromp-taylor"]).0);
        let (ok, listing) = e.execute("rules", &[]);
        assert!(ok);
        assert!(listing.contains("suicide true"));
        assert!(!e.execute("rules", &["ing"]).0);
    }

    #[test]
    fn unknown_command_fails_cleanly() {
        let mut e = engine();
        let (ok, msg) = e.execute("loadsgf", &["x.sgf"]);
        assert!(!ok);
        assert!(msg.contains("unknown command"));
    }
}
