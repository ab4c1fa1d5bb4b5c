/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Operating-mode Thompson bandit (C5): four arms, re-evaluated on a
//! wall-clock timer or after enough handshakes land in the current mode.

use nightjar_crypto::{sample_beta, Xorshift64};

const SUCCESS_REWARD: f64 = 1.0;
const FAILURE_PENALTY: f64 = 0.2;

/// Scores within this margin of the best are considered tied.
const TIE_MARGIN: f64 = 0.1;

/// Re-evaluate the mode after this long in the current one.
pub const MODE_MAX_DURATION_MS: i64 = 120_000;
/// ...or after this many handshakes land while in the current mode.
pub const MODE_HANDSHAKE_TRIGGER: u32 = 3;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    Passive,
    Active,
    Cooldown,
    Sync,
}

pub const ALL_MODES: [Mode; 4] = [Mode::Passive, Mode::Active, Mode::Cooldown, Mode::Sync];

#[derive(Clone, Copy, Debug, Default)]
struct Arm {
    alpha: f64,
    beta: f64,
}

impl Arm {
    fn neutral() -> Self {
        Self { alpha: 1.0, beta: 1.0 }
    }
}

pub struct ModeBandit {
    arms: [Arm; 4],
    pub current: Mode,
    mode_started_ms: i64,
    handshakes_in_mode: u32,
}

impl Default for ModeBandit {
    fn default() -> Self {
        Self { arms: [Arm::neutral(); 4], current: Mode::Passive, mode_started_ms: 0, handshakes_in_mode: 0 }
    }
}

impl ModeBandit {
    pub fn new() -> Self {
        Self::default()
    }

    fn index(mode: Mode) -> usize {
        ALL_MODES.iter().position(|&m| m == mode).unwrap()
    }

    /// True once the current mode's wall-clock dwell or handshake count has
    /// crossed its re-evaluation threshold (§4.5).
    pub fn is_due_for_reevaluation(&self, now_ms: i64) -> bool {
        (now_ms - self.mode_started_ms) > MODE_MAX_DURATION_MS || self.handshakes_in_mode >= MODE_HANDSHAKE_TRIGGER
    }

    /// Draw a new mode via Thompson sampling, with uniform tie-breaking when
    /// the spread between best and worst draw is under `TIE_MARGIN`. Always
    /// commits the draw as the new current mode and resets its timers.
    pub fn select_mode(&mut self, now_ms: i64, rng: &Xorshift64) -> Mode {
        let scores: Vec<f64> = self.arms.iter().map(|a| sample_beta(rng, a.alpha, a.beta)).collect();
        let max = scores.iter().cloned().fold(f64::MIN, f64::max);
        let min = scores.iter().cloned().fold(f64::MAX, f64::min);

        let chosen = if (max - min) < TIE_MARGIN {
            let idx = (rng.next_u64() as usize) % ALL_MODES.len();
            ALL_MODES[idx]
        } else {
            let idx = scores.iter().enumerate().max_by(|a, b| a.1.partial_cmp(b.1).unwrap()).map(|(i, _)| i).unwrap();
            ALL_MODES[idx]
        };

        self.current = chosen;
        self.mode_started_ms = now_ms;
        self.handshakes_in_mode = 0;
        chosen
    }

    /// Note a handshake landing while in the current mode, toward the
    /// 3-handshake re-evaluation trigger.
    pub fn record_handshake(&mut self) {
        self.handshakes_in_mode += 1;
    }

    pub fn observe(&mut self, mode: Mode, success: bool) {
        let arm = &mut self.arms[Self::index(mode)];
        if success {
            arm.alpha += SUCCESS_REWARD;
        } else {
            arm.beta += FAILURE_PENALTY;
        }
        arm.alpha = arm.alpha.max(0.01);
        arm.beta = arm.beta.max(0.01);
    }

    /// The raw `(alpha, beta)` pair backing `mode`'s arm, for persistence.
    pub fn arm_alpha_beta(&self, mode: Mode) -> (f64, f64) {
        let arm = &self.arms[Self::index(mode)];
        (arm.alpha, arm.beta)
    }

    /// Restore a previously-persisted `(alpha, beta)` pair for `mode`.
    pub fn set_arm(&mut self, mode: Mode, alpha: f64, beta: f64) {
        let arm = &mut self.arms[Self::index(mode)];
        arm.alpha = alpha.max(0.01);
        arm.beta = beta.max(0.01);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_after_max_duration_elapses() {
        let b = ModeBandit::new();
        assert!(!b.is_due_for_reevaluation(1000));
        assert!(b.is_due_for_reevaluation(MODE_MAX_DURATION_MS + 1));
    }

    #[test]
    fn due_after_three_handshakes() {
        let mut b = ModeBandit::new();
        b.record_handshake();
        b.record_handshake();
        assert!(!b.is_due_for_reevaluation(0));
        b.record_handshake();
        assert!(b.is_due_for_reevaluation(0));
    }

    #[test]
    fn select_mode_resets_dwell_timer_and_handshake_count() {
        let mut b = ModeBandit::new();
        let rng = Xorshift64::seeded(1);
        b.record_handshake();
        b.record_handshake();
        b.record_handshake();
        b.select_mode(50_000, &rng);
        assert!(!b.is_due_for_reevaluation(50_000));
    }

    #[test]
    fn strongly_favored_arm_wins_outside_tie_margin() {
        let mut b = ModeBandit::new();
        let rng = Xorshift64::seeded(9);
        for _ in 0..200 {
            b.observe(Mode::Active, true);
        }
        let mut active_wins = 0;
        for _ in 0..500 {
            if b.select_mode(0, &rng) == Mode::Active {
                active_wins += 1;
            }
        }
        assert!(active_wins > 400, "active_wins={active_wins}");
    }
}
