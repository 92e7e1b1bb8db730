//! Game rules and handicap placement.
//!
//! A [`Rules`] value travels with every board. Named rule sets ("chinese",
//! "japanese", "tromp-taylor") are parseable for the GTP `rules` command;
//! individual fields are settable by name through the parameter interface.

use std::fmt;
use std::str::FromStr;

/// Ko handling variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KoRule {
    /// Only the immediate recapture is forbidden.
    Simple,
    /// Situational super-ko: no whole-board position with the same side to
    /// move may repeat.
    Superko,
    /// Positional super-ko: no whole-board position may repeat at all.
    PositionalSuperko,
}

impl fmt::Display for KoRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KoRule::Simple => "simple",
            KoRule::Superko => "superko",
            KoRule::PositionalSuperko => "pos_superko",
        };
        f.write_str(s)
    }
}

impl FromStr for KoRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(KoRule::Simple),
            "superko" => Ok(KoRule::Superko),
            "pos_superko" | "positional_superko" => Ok(KoRule::PositionalSuperko),
            other => Err(format!("unknown ko rule: {other}")),
        }
    }
}

/// The rules of the game being played.
#[derive(Debug, Clone, PartialEq)]
pub struct Rules {
    /// Compensation added to white's score. Half-integer in practice.
    pub komi: f32,
    /// Whether playing a move that leaves one's own block without
    /// liberties (and captures nothing) is legal.
    pub allow_suicide: bool,
    /// Whether dead stones are captured before scoring. Under these rules
    /// the engine scores terminal positions with Tromp-Taylor.
    pub capture_dead: bool,
    /// Japanese (territory) scoring flag. Carried for rule-set identity
    /// only; end scoring is always area scoring.
    pub japanese_scoring: bool,
    /// Whether two consecutive passes end the game.
    pub two_passes_end_game: bool,
    pub ko_rule: KoRule,
    /// Number of handicap stones placed before the game.
    pub handicap: usize,
}

impl Default for Rules {
    fn default() -> Self {
        Rules::chinese()
    }
}

impl Rules {
    pub fn chinese() -> Self {
        Rules {
            komi: 7.5,
            allow_suicide: false,
            capture_dead: true,
            japanese_scoring: false,
            two_passes_end_game: true,
            ko_rule: KoRule::PositionalSuperko,
            handicap: 0,
        }
    }

    pub fn japanese() -> Self {
        Rules {
            komi: 6.5,
            allow_suicide: false,
            capture_dead: false,
            japanese_scoring: true,
            two_passes_end_game: true,
            ko_rule: KoRule::Simple,
            handicap: 0,
        }
    }

    pub fn tromp_taylor() -> Self {
        Rules {
            komi: 7.5,
            allow_suicide: true,
            capture_dead: true,
            japanese_scoring: false,
            two_passes_end_game: true,
            ko_rule: KoRule::PositionalSuperko,
            handicap: 0,
        }
    }

    /// Look up a named rule set.
    pub fn named(name: &str) -> Result<Self, String> {
        match name.to_ascii_lowercase().as_str() {
            "chinese" | "cgos" => Ok(Rules::chinese()),
            "japanese" => Ok(Rules::japanese()),
            "tromp-taylor" | "tromp_taylor" => Ok(Rules::tromp_taylor()),
            other => Err(format!("unknown rules: {other}")),
        }
    }
}

/// Standard star-point handicap placement for a square board.
///
/// Returns `(col, row)` pairs, 1-indexed from the lower-left corner, in
/// the conventional order: the four corner points, then the center, then
/// side points. Supported for `7 <= size < 26` and `2 <= stones <= 9`
/// (center-requiring counts need an odd board side).
pub fn handicap_points(size: usize, stones: usize) -> Result<Vec<(usize, usize)>, String> {
    if !(7..26).contains(&size) {
        return Err(format!("no standard handicap placement for size {size}"));
    }
    if !(2..=9).contains(&stones) {
        return Err(format!("invalid number of handicap stones: {stones}"));
    }
    let edge = if size < 13 { 3 } else { 4 };
    let lo = edge;
    let hi = size + 1 - edge;
    let mid = (size + 1) / 2;
    let needs_center = stones == 5 || stones == 7 || stones == 9;
    if (needs_center || stones >= 6) && size % 2 == 0 {
        return Err(format!(
            "cannot place {stones} handicap stones on even board size {size}"
        ));
    }

    let mut points = vec![(lo, lo), (hi, hi), (lo, hi), (hi, lo)];
    match stones {
        2..=4 => {}
        5 | 7 => points.push((mid, mid)),
        6 | 8 => {}
        9 => points.push((mid, mid)),
        _ => unreachable!(),
    }
    if stones >= 6 {
        points.push((lo, mid));
        points.push((hi, mid));
    }
    if stones >= 8 {
        points.push((mid, lo));
        points.push((mid, hi));
    }
    points.truncate(stones);
    // Reorder so the center, when present, comes last of the first five,
    // matching the conventional tables.
    if needs_center {
        let center = (mid, mid);
        if let Some(idx) = points.iter().position(|&p| p == center) {
            let c = points.remove(idx);
            points.push(c);
        }
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_rule_sets() {
        assert_eq!(Rules::named("chinese").unwrap().komi, 7.5);
        assert!(Rules::named("japanese").unwrap().japanese_scoring);
        assert!(Rules::named("tromp-taylor").unwrap().allow_suicide);
        assert!(Rules::named("new-zealand").is_err());
    }

    #[test]
    fn handicap_five_on_19() {
        let pts = handicap_points(19, 5).unwrap();
        assert_eq!(pts.len(), 5);
        for expect in [(4, 4), (16, 16), (4, 16), (16, 4), (10, 10)] {
            assert!(pts.contains(&expect), "missing {expect:?} in {pts:?}");
        }
    }

    #[test]
    fn handicap_two_on_9() {
        let pts = handicap_points(9, 2).unwrap();
        assert_eq!(pts, vec![(3, 3), (7, 7)]);
    }

    #[test]
    fn handicap_rejects_bad_requests() {
        assert!(handicap_points(5, 2).is_err());
        assert!(handicap_points(19, 1).is_err());
        assert!(handicap_points(19, 10).is_err());
        assert!(handicap_points(8, 5).is_err());
    }

    #[test]
    fn ko_rule_round_trip() {
        for ko in [KoRule::Simple, KoRule::Superko, KoRule::PositionalSuperko] {
            assert_eq!(ko.to_string().parse::<KoRule>().unwrap(), ko);
        }
    }
}
