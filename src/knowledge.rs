//! Prior and additive knowledge protocols.
//!
//! Prior knowledge attaches virtual (value, count) pairs to the children
//! of a freshly expanded node; the priors are applied exactly once, at
//! expansion time, and frozen on the node. Additive knowledge supplies a
//! predictor value per move that the selection score adds as a decaying
//! bonus. Multiple additive predictors compose through
//! [`MultipleKnowledge`] with a configurable combination.

use std::fmt;
use std::str::FromStr;

use crate::board::{Board, Point};

/// Per-move knowledge carrier handed to the tree at expansion.
#[derive(Debug, Clone, Copy)]
pub struct MoveInfo {
    pub mv: Point,
    /// Prior win probability in [0, 1].
    pub prior_value: f32,
    /// Virtual trial count backing the prior value.
    pub prior_count: f32,
    /// Additive-knowledge bonus; meaning depends on the predictor style.
    pub predictor: f32,
}

impl MoveInfo {
    pub fn new(mv: Point) -> Self {
        MoveInfo {
            mv,
            prior_value: 0.0,
            prior_count: 0.0,
            predictor: 0.0,
        }
    }
}

/// Supplies virtual counts for newly expanded children. The worker
/// thread's RNG is passed through because the default implementation
/// probes its playout policy.
pub trait PriorKnowledge {
    fn process_position(
        &mut self,
        board: &Board,
        moves: &mut [MoveInfo],
        rng: &mut fastrand::Rng,
    );
}

/// Creates per-thread prior knowledge instances.
pub trait PriorKnowledgeFactory: Send + Sync {
    fn create(&self) -> Box<dyn PriorKnowledge + Send>;
}

/// Per-selection bonus supplier.
pub trait AdditiveKnowledge {
    /// Probability-based predictors produce values in [epsilon, 1] and
    /// compose multiplicatively; PUCB-style predictors produce values in
    /// [0, inf) and compose additively.
    fn probability_based(&self) -> bool;

    /// Predictors may be restricted to a phase of the game.
    fn in_move_range(&self, _move_number: usize) -> bool {
        true
    }

    fn process_position(&mut self, board: &Board, moves: &mut [MoveInfo]);
}

/// Creates per-thread additive knowledge instances.
pub trait AdditiveKnowledgeFactory: Send + Sync {
    fn create(&self) -> Box<dyn AdditiveKnowledge + Send>;
}

/// How [`MultipleKnowledge`] combines its predictors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnowledgeCombination {
    Multiply,
    GeometricMean,
    Add,
    Average,
    Max,
}

impl fmt::Display for KnowledgeCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            KnowledgeCombination::Multiply => "multiply",
            KnowledgeCombination::GeometricMean => "geometric_mean",
            KnowledgeCombination::Add => "add",
            KnowledgeCombination::Average => "average",
            KnowledgeCombination::Max => "max",
        };
        f.write_str(s)
    }
}

impl FromStr for KnowledgeCombination {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiply" => Ok(KnowledgeCombination::Multiply),
            "geometric_mean" => Ok(KnowledgeCombination::GeometricMean),
            "add" => Ok(KnowledgeCombination::Add),
            "average" => Ok(KnowledgeCombination::Average),
            "max" => Ok(KnowledgeCombination::Max),
            other => Err(format!("unknown combination: {other}")),
        }
    }
}

/// Combines several additive predictors into one.
pub struct MultipleKnowledge {
    parts: Vec<Box<dyn AdditiveKnowledge + Send>>,
    combination: KnowledgeCombination,
}

impl MultipleKnowledge {
    pub fn new(
        parts: Vec<Box<dyn AdditiveKnowledge + Send>>,
        combination: KnowledgeCombination,
    ) -> Self {
        debug_assert!(!parts.is_empty());
        debug_assert!(
            parts
                .windows(2)
                .all(|w| w[0].probability_based() == w[1].probability_based()),
            "mixed predictor styles cannot be combined"
        );
        MultipleKnowledge { parts, combination }
    }

    fn neutral(&self) -> f32 {
        match self.combination {
            KnowledgeCombination::Multiply | KnowledgeCombination::GeometricMean => 1.0,
            _ => 0.0,
        }
    }

    fn combine_with(combination: KnowledgeCombination, acc: f32, new: f32) -> f32 {
        match combination {
            KnowledgeCombination::Multiply | KnowledgeCombination::GeometricMean => acc * new,
            KnowledgeCombination::Add | KnowledgeCombination::Average => acc + new,
            KnowledgeCombination::Max => acc.max(new),
        }
    }
}

impl AdditiveKnowledge for MultipleKnowledge {
    fn probability_based(&self) -> bool {
        self.parts[0].probability_based()
    }

    fn process_position(&mut self, board: &Board, moves: &mut [MoveInfo]) {
        let neutral = self.neutral();
        for m in moves.iter_mut() {
            m.predictor = neutral;
        }
        let move_number = board.move_count();
        let mut used = 0u32;
        let mut scratch: Vec<MoveInfo> = Vec::new();
        let combination = self.combination;
        for part in &mut self.parts {
            if !part.in_move_range(move_number) {
                continue;
            }
            used += 1;
            scratch.clear();
            scratch.extend(moves.iter().map(|m| MoveInfo {
                predictor: 0.0,
                ..*m
            }));
            part.process_position(board, &mut scratch);
            for (m, s) in moves.iter_mut().zip(scratch.iter()) {
                m.predictor = Self::combine_with(combination, m.predictor, s.predictor);
            }
        }
        if used > 1 {
            match self.combination {
                KnowledgeCombination::GeometricMean => {
                    let exponent = 1.0 / used as f32;
                    for m in moves.iter_mut() {
                        m.predictor = m.predictor.powf(exponent);
                    }
                }
                KnowledgeCombination::Average => {
                    for m in moves.iter_mut() {
                        m.predictor /= used as f32;
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rules;

    struct Constant {
        value: f32,
        from_move: usize,
    }

    impl AdditiveKnowledge for Constant {
        fn probability_based(&self) -> bool {
            true
        }

        fn in_move_range(&self, move_number: usize) -> bool {
            move_number >= self.from_move
        }

        fn process_position(&mut self, _board: &Board, moves: &mut [MoveInfo]) {
            for m in moves {
                m.predictor = self.value;
            }
        }
    }

    fn moves() -> Vec<MoveInfo> {
        vec![MoveInfo::new(100), MoveInfo::new(101)]
    }

    #[test]
    fn multiply_combines_product() {
        let board = Board::new(9, Rules::default());
        let mut k = MultipleKnowledge::new(
            vec![
                Box::new(Constant { value: 0.5, from_move: 0 }),
                Box::new(Constant { value: 0.4, from_move: 0 }),
            ],
            KnowledgeCombination::Multiply,
        );
        let mut m = moves();
        k.process_position(&board, &mut m);
        assert!((m[0].predictor - 0.2).abs() < 1e-6);
    }

    #[test]
    fn geometric_mean_takes_root() {
        let board = Board::new(9, Rules::default());
        let mut k = MultipleKnowledge::new(
            vec![
                Box::new(Constant { value: 0.25, from_move: 0 }),
                Box::new(Constant { value: 1.0, from_move: 0 }),
            ],
            KnowledgeCombination::GeometricMean,
        );
        let mut m = moves();
        k.process_position(&board, &mut m);
        assert!((m[0].predictor - 0.5).abs() < 1e-6);
    }

    #[test]
    fn average_divides_by_used_predictors() {
        let board = Board::new(9, Rules::default());
        let mut k = MultipleKnowledge::new(
            vec![
                Box::new(Constant { value: 0.2, from_move: 0 }),
                Box::new(Constant { value: 0.6, from_move: 0 }),
            ],
            KnowledgeCombination::Average,
        );
        let mut m = moves();
        k.process_position(&board, &mut m);
        assert!((m[0].predictor - 0.4).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_predictor_is_skipped() {
        let board = Board::new(9, Rules::default());
        let mut k = MultipleKnowledge::new(
            vec![
                Box::new(Constant { value: 0.2, from_move: 0 }),
                Box::new(Constant { value: 0.6, from_move: 50 }),
            ],
            KnowledgeCombination::Max,
        );
        let mut m = moves();
        k.process_position(&board, &mut m);
        assert!((m[0].predictor - 0.2).abs() < 1e-6);
    }

    #[test]
    fn combination_parses() {
        assert_eq!(
            "geometric_mean".parse::<KnowledgeCombination>().unwrap(),
            KnowledgeCombination::GeometricMean
        );
        assert!("mean".parse::<KnowledgeCombination>().is_err());
    }
}
