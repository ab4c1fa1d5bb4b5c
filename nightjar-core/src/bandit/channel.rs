/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Global channel-selection Thompson bandit (C4): one arm per 2.4 GHz
//! channel (1-14) and the standard 5 GHz channel set, with a recency
//! exploration bonus and an AP-density multiplier.

use std::collections::HashMap;

use nightjar_crypto::{sample_beta, Xorshift64};

const SUCCESS_REWARD: f64 = 1.0;
const FAILURE_PENALTY: f64 = 0.2;
const RECENCY_BONUS_MAX: f64 = 0.2;
const RECENCY_BONUS_HOURS: f64 = 2.0;
const DENSITY_WEIGHT: f64 = 0.1;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Standard 5 GHz UNII channel set carried alongside 1-14 (2.4 GHz).
pub const CHANNELS_5GHZ: &[u8] = &[36, 40, 44, 48, 52, 56, 60, 64, 100, 104, 108, 112, 116, 120, 124, 128, 132, 136, 140, 144, 149, 153, 157, 161, 165];

#[derive(Clone, Debug)]
struct ChannelArm {
    alpha: f64,
    beta: f64,
    visits: u32,
    last_visited_ms: Option<i64>,
    aps_seen: u32,
    handshakes: u32,
}

impl Default for ChannelArm {
    fn default() -> Self {
        Self { alpha: 1.0, beta: 1.0, visits: 0, last_visited_ms: None, aps_seen: 0, handshakes: 0 }
    }
}

/// Owns one arm per channel number ever observed. Populated lazily: a
/// channel not yet seen gets a fresh neutral-prior arm on first touch.
#[derive(Default)]
pub struct ChannelBandit {
    arms: HashMap<u8, ChannelArm>,
}

impl ChannelBandit {
    pub fn new() -> Self {
        Self::default()
    }

    fn arm_mut(&mut self, channel: u8) -> &mut ChannelArm {
        self.arms.entry(channel).or_default()
    }

    /// Order `visible_channels` by a single Thompson draw each, using
    /// `ap_counts` (channel -> AP count on that channel right now) for the
    /// density multiplier. Returns the full ordering, strongest choice
    /// first, matching §4.12 step 7 ("order by channel bandit").
    pub fn order_channels(&mut self, visible_channels: &[u8], ap_counts: &HashMap<u8, u32>, now_ms: i64, rng: &Xorshift64) -> Vec<u8> {
        let mut scored: Vec<(u8, f64)> = visible_channels
            .iter()
            .map(|&ch| {
                let score = self.score_channel(ch, ap_counts.get(&ch).copied().unwrap_or(0), now_ms, rng);
                (ch, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        scored.into_iter().map(|(ch, _)| ch).collect()
    }

    /// Draw and score a single channel, as used internally by
    /// `order_channels` and exposed for tests / status reporting.
    pub fn score_channel(&mut self, channel: u8, ap_count: u32, now_ms: i64, rng: &Xorshift64) -> f64 {
        let arm = self.arm_mut(channel);
        let s = sample_beta(rng, arm.alpha, arm.beta);
        let hours_since_last = match arm.last_visited_ms {
            None => return (s + RECENCY_BONUS_MAX) * (1.0 + DENSITY_WEIGHT * ap_count as f64),
            Some(last) => ((now_ms - last).max(0) as f64) / MS_PER_HOUR,
        };
        let recency_bonus = RECENCY_BONUS_MAX * (hours_since_last / RECENCY_BONUS_HOURS).min(1.0);
        let density_factor = 1.0 + DENSITY_WEIGHT * ap_count as f64;
        (s + recency_bonus) * density_factor
    }

    /// Record that the loop actually hopped onto `channel` at `now_ms`.
    pub fn record_visit(&mut self, channel: u8, now_ms: i64) {
        let arm = self.arm_mut(channel);
        arm.visits += 1;
        arm.last_visited_ms = Some(now_ms);
    }

    pub fn record_aps_seen(&mut self, channel: u8, count: u32) {
        self.arm_mut(channel).aps_seen = count;
    }

    pub fn record_handshake(&mut self, channel: u8) {
        self.arm_mut(channel).handshakes += 1;
    }

    /// Record an epoch-end reward or penalty for one channel (§4.12 step 10).
    pub fn observe(&mut self, channel: u8, success: bool) {
        let arm = self.arm_mut(channel);
        if success {
            arm.alpha += SUCCESS_REWARD;
        } else {
            arm.beta += FAILURE_PENALTY;
        }
        arm.alpha = arm.alpha.max(0.01);
        arm.beta = arm.beta.max(0.01);
    }

    pub fn alpha_of(&self, channel: u8) -> f64 {
        self.arms.get(&channel).map(|a| a.alpha).unwrap_or(1.0)
    }

    pub fn beta_of(&self, channel: u8) -> f64 {
        self.arms.get(&channel).map(|a| a.beta).unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_visited_channel_gets_full_recency_bonus() {
        let mut b = ChannelBandit::new();
        let rng = Xorshift64::seeded(1);
        let counts = HashMap::new();
        let score = b.score_channel(6, 0, 10_000, &rng);
        // With neutral priors (mean 0.5) and full bonus the score should sit
        // noticeably above a plain unbonused 0.5 draw on average.
        assert!(score > 0.0);
    }

    #[test]
    fn never_visited_bonus_is_additive_not_multiplicative() {
        // Same shape as the visited-arm formula: (s + bonus) * density, not
        // s * (1 + bonus) * density.
        let mut b = ChannelBandit::new();
        let rng = Xorshift64::seeded(1);
        let s = sample_beta(&rng, 1.0, 1.0);
        let rng_again = Xorshift64::seeded(1);
        let score = b.score_channel(6, 0, 10_000, &rng_again);
        assert!((score - (s + RECENCY_BONUS_MAX) * (1.0 + DENSITY_WEIGHT * 0.0)).abs() < 1e-9);
    }

    #[test]
    fn observe_success_increases_alpha() {
        let mut b = ChannelBandit::new();
        let before = b.alpha_of(11);
        b.observe(11, true);
        assert!(b.alpha_of(11) > before);
    }

    #[test]
    fn observe_failure_increases_beta_not_alpha() {
        let mut b = ChannelBandit::new();
        let a_before = b.alpha_of(1);
        b.observe(1, false);
        assert_eq!(b.alpha_of(1), a_before);
        assert!(b.beta_of(1) > 1.0);
    }

    #[test]
    fn density_factor_favors_busier_channels() {
        let mut b = ChannelBandit::new();
        let rng = Xorshift64::seeded(5);
        // Force both channels to an identical posterior and visit time so
        // the only remaining difference is AP density.
        b.record_visit(1, 0);
        b.record_visit(6, 0);
        let mut counts = HashMap::new();
        counts.insert(1_u8, 0_u32);
        counts.insert(6_u8, 10_u32);
        let sparse = b.score_channel(1, 0, 0, &Xorshift64::seeded(42));
        let dense = b.score_channel(6, 10, 0, &Xorshift64::seeded(42));
        assert!(dense >= sparse);
        let _ = rng;
    }

    #[test]
    fn five_ghz_channel_set_is_well_formed() {
        assert!(CHANNELS_5GHZ.contains(&36));
        assert!(CHANNELS_5GHZ.contains(&165));
        assert_eq!(CHANNELS_5GHZ.len(), 25);
    }
}
