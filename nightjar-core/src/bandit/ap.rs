/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Per-AP attack-phase Thompson bandit (C3): eight arms, one per attack
//! phase in the §4.7 catalogue, re-weighted when the target looks WPA3/SAE.

use nightjar_crypto::{sample_beta, Xorshift64};

use crate::entity::Entity;

pub const NUM_PHASES: usize = 8;

pub const PHASE_PMKID: usize = 0;
pub const PHASE_CSA: usize = 1;
pub const PHASE_DEAUTH: usize = 2;
pub const PHASE_PMF_BYPASS: usize = 3;
pub const PHASE_DISASSOC: usize = 4;
pub const PHASE_ROGUE_M2: usize = 5;
pub const PHASE_PROBE: usize = 6;
pub const PHASE_PASSIVE: usize = 7;

const WPA3_SUPPRESS: f64 = 0.05;
const WPA3_BOOST: f64 = 2.0;

/// Once a phase's success count passes this many observations, decay both
/// posteriors by 0.8 to bound memory and let the arm keep adapting.
const DECAY_THRESHOLD: f64 = 50.0;
const DECAY_FACTOR: f64 = 0.8;

const SUCCESS_REWARD: f64 = 1.0;
const FAILURE_PENALTY: f64 = 0.3;

/// Draw a phase for `entity` restricted to `enabled_mask`, re-weighted for
/// WPA3/SAE targets. Panics only if every mask entry is false, which callers
/// must never do — the orchestrator always has at least the passive-listen
/// phase enabled.
pub fn select_phase(entity: &Entity, is_wpa3: bool, enabled_mask: &[bool; NUM_PHASES], rng: &Xorshift64) -> usize {
    let mut best_phase = None;
    let mut best_score = f64::MIN;
    for phase in 0..NUM_PHASES {
        if !enabled_mask[phase] {
            continue;
        }
        let mut s = sample_beta(rng, entity.atk_alpha[phase], entity.atk_beta[phase]);
        if is_wpa3 {
            if phase == PHASE_DEAUTH || phase == PHASE_DISASSOC {
                s *= WPA3_SUPPRESS;
            } else if phase == PHASE_PMF_BYPASS || phase == PHASE_ROGUE_M2 {
                s *= WPA3_BOOST;
            }
        }
        if s > best_score {
            best_score = s;
            best_phase = Some(phase);
        }
    }
    best_phase.expect("at least one phase must be enabled")
}

/// Record the outcome of attacking `entity` with `phase`.
pub fn observe(entity: &mut Entity, phase: usize, success: bool) {
    if success {
        entity.atk_alpha[phase] += SUCCESS_REWARD;
    } else {
        entity.atk_beta[phase] += FAILURE_PENALTY;
    }
    if entity.atk_alpha[phase] > DECAY_THRESHOLD {
        entity.atk_alpha[phase] *= DECAY_FACTOR;
        entity.atk_beta[phase] *= DECAY_FACTOR;
    }
    entity.clamp_atk_posterior(phase);
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ENABLED: [bool; NUM_PHASES] = [true; NUM_PHASES];

    #[test]
    fn priors_stay_positive_under_long_failure_runs() {
        let mut e = Entity::new([0; 6], 0);
        for _ in 0..10_000 {
            observe(&mut e, PHASE_DEAUTH, false);
        }
        assert!(e.atk_alpha[PHASE_DEAUTH] >= 0.01);
        assert!(e.atk_beta[PHASE_DEAUTH] >= 0.01);
    }

    #[test]
    fn success_ratio_is_nondecreasing_under_pure_success() {
        let mut e = Entity::new([0; 6], 0);
        let mut last_ratio = 0.0;
        for _ in 0..200 {
            observe(&mut e, PHASE_PMKID, true);
            let ratio = e.atk_alpha[PHASE_PMKID] / (e.atk_alpha[PHASE_PMKID] + e.atk_beta[PHASE_PMKID]);
            assert!(ratio >= last_ratio - 1e-9, "ratio regressed: {ratio} < {last_ratio}");
            last_ratio = ratio;
        }
    }

    #[test]
    fn decay_triggers_past_threshold() {
        let mut e = Entity::new([0; 6], 0);
        for _ in 0..51 {
            observe(&mut e, PHASE_PMKID, true);
        }
        assert!(e.atk_alpha[PHASE_PMKID] < 51.0);
    }

    #[test]
    fn wpa3_routing_strongly_favors_pmf_bypass_and_rogue_m2() {
        let rng = Xorshift64::seeded(77);
        let mut wpa2_hits = [0_u32; NUM_PHASES];
        let mut wpa3_hits = [0_u32; NUM_PHASES];
        let e = Entity::new([0; 6], 0);
        const TRIALS: u32 = 10_000;
        for _ in 0..TRIALS {
            wpa2_hits[select_phase(&e, false, &ALL_ENABLED, &rng)] += 1;
            wpa3_hits[select_phase(&e, true, &ALL_ENABLED, &rng)] += 1;
        }
        let wpa2_rate = (wpa2_hits[PHASE_DEAUTH] + wpa2_hits[PHASE_DISASSOC]) as f64 / TRIALS as f64;
        let wpa3_rate = (wpa3_hits[PHASE_DEAUTH] + wpa3_hits[PHASE_DISASSOC]) as f64 / TRIALS as f64;
        assert!(wpa3_rate <= wpa2_rate * 0.10 + 0.001, "wpa3_rate={wpa3_rate} wpa2_rate={wpa2_rate}");
    }

    #[test]
    fn select_phase_respects_mask() {
        let rng = Xorshift64::seeded(3);
        let mut e = Entity::new([0; 6], 0);
        e.atk_alpha[PHASE_PASSIVE] = 1000.0;
        let mut mask = [false; NUM_PHASES];
        mask[PHASE_PASSIVE] = true;
        for _ in 0..50 {
            assert_eq!(select_phase(&e, false, &mask, &rng), PHASE_PASSIVE);
        }
        mask[PHASE_PASSIVE] = false;
        mask[PHASE_CSA] = true;
        for _ in 0..50 {
            assert_eq!(select_phase(&e, false, &mask, &rng), PHASE_CSA);
        }
    }
}
