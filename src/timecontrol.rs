//! Thin time control.
//!
//! Consumes GTP `time_settings` / `time_left` updates and turns them
//! into a per-move search budget: the remaining main time is spread over
//! an estimate of the moves left in the game; in byo-yomi the period
//! time is split over the required stones. No deeper time management is
//! attempted.

use std::time::Duration;

use crate::board::Color;

/// Clock settings as announced by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSettings {
    pub main_time: Duration,
    pub byoyomi_time: Duration,
    pub byoyomi_stones: u32,
}

/// Per-player clock state.
#[derive(Debug, Clone, Copy)]
struct ClockState {
    remaining: Duration,
    /// Stones left in the current byo-yomi period; 0 while in main time.
    stones_left: u32,
}

/// Tracks both clocks and produces per-move budgets.
#[derive(Debug, Clone)]
pub struct TimeControl {
    settings: Option<TimeSettings>,
    clocks: [ClockState; 2],
}

impl Default for TimeControl {
    fn default() -> Self {
        TimeControl::new()
    }
}

impl TimeControl {
    pub fn new() -> TimeControl {
        TimeControl {
            settings: None,
            clocks: [ClockState {
                remaining: Duration::ZERO,
                stones_left: 0,
            }; 2],
        }
    }

    /// Install settings and reset both clocks to the main time.
    pub fn set_settings(&mut self, settings: TimeSettings) {
        self.settings = Some(settings);
        for clock in &mut self.clocks {
            clock.remaining = settings.main_time;
            clock.stones_left = 0;
        }
    }

    pub fn settings(&self) -> Option<TimeSettings> {
        self.settings
    }

    /// GTP `time_left` update: remaining time and byo-yomi stones
    /// (0 stones means still in main time).
    pub fn update(&mut self, color: Color, remaining: Duration, stones: u32) {
        let clock = &mut self.clocks[color.index()];
        clock.remaining = remaining;
        clock.stones_left = stones;
    }

    /// Budget for the next move of `color`, or None when no clock runs.
    pub fn time_for_move(
        &self,
        color: Color,
        board_size: usize,
        moves_played: usize,
    ) -> Option<Duration> {
        let settings = self.settings?;
        let clock = self.clocks[color.index()];
        if clock.stones_left > 0 {
            // Byo-yomi: the period must cover the remaining stones.
            let budget = clock.remaining / clock.stones_left.max(1);
            return Some(budget.mul_f64(0.95));
        }
        // Main time: spread over an estimate of the moves this player
        // still has to make.
        let area = board_size * board_size;
        let expected_total = area / 3;
        let own_moves_played = moves_played / 2;
        let moves_left = expected_total.saturating_sub(own_moves_played).max(10);
        let mut budget = clock.remaining / moves_left as u32;
        if settings.byoyomi_time > Duration::ZERO && settings.byoyomi_stones > 0 {
            // Overtime exists: main time can be spent more freely.
            let per_stone = settings.byoyomi_time / settings.byoyomi_stones;
            budget = budget.max(per_stone.mul_f64(0.95));
        }
        Some(budget)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(main: u64, byo: u64, stones: u32) -> TimeSettings {
        TimeSettings {
            main_time: Duration::from_secs(main),
            byoyomi_time: Duration::from_secs(byo),
            byoyomi_stones: stones,
        }
    }

    #[test]
    fn no_settings_no_budget() {
        let tc = TimeControl::new();
        assert_eq!(tc.time_for_move(Color::Black, 9, 0), None);
    }

    #[test]
    fn main_time_is_spread_over_expected_moves() {
        let mut tc = TimeControl::new();
        tc.set_settings(settings(270, 0, 0));
        // 9x9: about 27 own moves expected, 10s each.
        let budget = tc.time_for_move(Color::Black, 9, 0).unwrap();
        assert!(budget >= Duration::from_secs(8) && budget <= Duration::from_secs(14));
    }

    #[test]
    fn budget_grows_as_the_game_shortens() {
        let mut tc = TimeControl::new();
        tc.set_settings(settings(100, 0, 0));
        let early = tc.time_for_move(Color::Black, 9, 0).unwrap();
        tc.update(Color::Black, Duration::from_secs(100), 0);
        let late = tc.time_for_move(Color::Black, 9, 40).unwrap();
        assert!(late >= early);
    }

    #[test]
    fn byoyomi_splits_the_period() {
        let mut tc = TimeControl::new();
        tc.set_settings(settings(0, 60, 10));
        tc.update(Color::White, Duration::from_secs(60), 10);
        let budget = tc.time_for_move(Color::White, 19, 50).unwrap();
        assert!(budget <= Duration::from_secs(6));
        assert!(budget >= Duration::from_secs(5));
    }

    #[test]
    fn clocks_are_independent() {
        let mut tc = TimeControl::new();
        tc.set_settings(settings(100, 0, 0));
        tc.update(Color::Black, Duration::from_secs(10), 0);
        let black = tc.time_for_move(Color::Black, 9, 20).unwrap();
        let white = tc.time_for_move(Color::White, 9, 20).unwrap();
        assert!(white > black);
    }
}
