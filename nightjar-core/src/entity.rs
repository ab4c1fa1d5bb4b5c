/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! One AP or STA observed by the session source (§3 "Entity"), along with
//! its Thompson-sampling posteriors, signal tracker, and lifecycle state.

use nightjar_crypto::format_mac;

use crate::bandit::ap::NUM_PHASES;
use crate::signal::SignalTracker;

/// Posteriors must never reach zero: a shape of zero makes the Gamma
/// sampler underlying Beta draws degenerate (Testable Property 1).
pub const MIN_POSTERIOR: f64 = 0.01;

const DORMANT_STALE_DAYS: i64 = 7;
const DORMANT_ARCHIVED_DAYS: i64 = 30;
const DORMANT_EVICT_DAYS: i64 = 90;
const DAY_MS: i64 = 86_400_000;

pub const STALE_AFTER_MS: i64 = DORMANT_STALE_DAYS * DAY_MS;
pub const ARCHIVED_AFTER_MS: i64 = DORMANT_ARCHIVED_DAYS * DAY_MS;
pub const EVICT_AFTER_MS: i64 = DORMANT_EVICT_DAYS * DAY_MS;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Active,
    Stale,
    Archived,
    Flagged,
    Evicted,
}

/// One AP or STA, keyed externally by `mac`.
#[derive(Clone, Debug)]
pub struct Entity {
    pub mac: [u8; 6],
    pub soft_identity: String,

    pub ssid: String,
    pub vendor_oui: String,
    pub channel: u8,
    pub beacon_interval: u16,
    pub encryption: String,
    pub clients_count: u32,

    /// Entity-level Beta posterior, distinct from the per-phase arrays
    /// below; tracks overall desirability independent of which attack
    /// phase was used.
    pub alpha: f64,
    pub beta: f64,

    pub atk_alpha: [f64; NUM_PHASES],
    pub atk_beta: [f64; NUM_PHASES],

    pub signal: SignalTracker,
    pub last_rssi: f64,
    pub client_boost: f64,

    pub status: Status,
    pub first_seen: i64,
    pub last_seen: i64,
    pub last_attacked: i64,
}

impl Entity {
    pub fn new(mac: [u8; 6], now: i64) -> Self {
        Self {
            mac,
            soft_identity: String::new(),
            ssid: String::new(),
            vendor_oui: String::new(),
            channel: 0,
            beacon_interval: 0,
            encryption: String::new(),
            clients_count: 0,
            alpha: 1.0,
            beta: 1.0,
            atk_alpha: [1.0; NUM_PHASES],
            atk_beta: [1.0; NUM_PHASES],
            signal: SignalTracker::new(),
            last_rssi: 0.0,
            client_boost: 1.0,
            status: Status::Active,
            first_seen: now,
            last_seen: now,
            last_attacked: 0,
        }
    }

    pub fn mac_string(&self) -> String {
        format_mac(&self.mac)
    }

    pub fn is_wpa3(&self) -> bool {
        self.encryption.contains("WPA3") || self.encryption.contains("SAE")
    }

    /// Recompute the soft-identity fingerprint from current metadata and
    /// store it, returning the new value.
    pub fn refresh_soft_identity(&mut self) -> &str {
        self.soft_identity = compute_soft_identity(&self.vendor_oui, self.beacon_interval, self.channel, &self.encryption);
        &self.soft_identity
    }

    /// Clamp both entity-level posteriors to the invariant floor. Called
    /// after any mutation to `alpha`/`beta`.
    pub fn clamp_posterior(&mut self) {
        self.alpha = self.alpha.max(MIN_POSTERIOR);
        self.beta = self.beta.max(MIN_POSTERIOR);
    }

    /// Clamp one phase's posterior pair to the invariant floor.
    pub fn clamp_atk_posterior(&mut self, phase: usize) {
        self.atk_alpha[phase] = self.atk_alpha[phase].max(MIN_POSTERIOR);
        self.atk_beta[phase] = self.atk_beta[phase].max(MIN_POSTERIOR);
    }
}

/// 16-hex-digit fingerprint derived from `(vendor_oui, beacon_interval
/// bucketed to 50 ms, channel, encryption_string)`. Stable across MAC
/// rotations and AP soft-resets that don't change these four properties;
/// used to detect identity drift (C6).
pub fn compute_soft_identity(vendor_oui: &str, beacon_interval: u16, channel: u8, encryption: &str) -> String {
    let bucketed = (beacon_interval / 50) * 50;
    let mut hasher = Fnv1a64::new();
    hasher.write(vendor_oui.as_bytes());
    hasher.write(&bucketed.to_le_bytes());
    hasher.write(&[channel]);
    hasher.write(encryption.as_bytes());
    format!("{:016x}", hasher.finish())
}

/// Count of hex positions that differ between two 16-hex-digit fingerprints.
/// A caller treats a difference of more than 4 positions as identity drift
/// (§4.6).
pub fn hex_drift(a: &str, b: &str) -> usize {
    a.chars().zip(b.chars()).filter(|(x, y)| x != y).count() + a.len().abs_diff(b.len())
}

/// Minimal FNV-1a 64-bit hasher, used only for the soft-identity fingerprint
/// (not a cryptographic hash; collisions are acceptable noise here).
struct Fnv1a64(u64);

impl Fnv1a64 {
    fn new() -> Self {
        Self(0xcbf29ce484222325)
    }
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(0x100000001b3);
        }
    }
    fn finish(&self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_identity_is_sixteen_hex_digits() {
        let id = compute_soft_identity("aa:bb:cc", 100, 6, "WPA2-PSK-CCMP");
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn soft_identity_is_stable_for_identical_inputs() {
        let a = compute_soft_identity("aa:bb:cc", 100, 6, "WPA2-PSK-CCMP");
        let b = compute_soft_identity("aa:bb:cc", 100, 6, "WPA2-PSK-CCMP");
        assert_eq!(a, b);
    }

    #[test]
    fn soft_identity_buckets_beacon_interval_to_50ms() {
        let a = compute_soft_identity("aa:bb:cc", 100, 6, "WPA2");
        let b = compute_soft_identity("aa:bb:cc", 110, 6, "WPA2");
        assert_eq!(a, b, "110 buckets down to the same 100ms bucket as 100");
    }

    #[test]
    fn soft_identity_changes_with_channel() {
        let a = compute_soft_identity("aa:bb:cc", 100, 6, "WPA2");
        let b = compute_soft_identity("aa:bb:cc", 100, 11, "WPA2");
        assert_ne!(a, b);
    }

    #[test]
    fn hex_drift_counts_differing_positions() {
        assert_eq!(hex_drift("0123456789abcdef", "0123456789abcdef"), 0);
        assert_eq!(hex_drift("0000000000000000", "0000000000000001"), 1);
        assert_eq!(hex_drift("0000000000000000", "ffffffffffffffff"), 16);
    }

    #[test]
    fn new_entity_has_neutral_priors() {
        let e = Entity::new([1, 2, 3, 4, 5, 6], 1_000);
        assert_eq!(e.alpha, 1.0);
        assert_eq!(e.beta, 1.0);
        assert!(e.atk_alpha.iter().all(|&a| a == 1.0));
        assert!(e.atk_beta.iter().all(|&b| b == 1.0));
        assert_eq!(e.status, Status::Active);
    }

    #[test]
    fn wpa3_detection_matches_substrings() {
        let mut e = Entity::new([0; 6], 0);
        e.encryption = "WPA2-PSK-CCMP".into();
        assert!(!e.is_wpa3());
        e.encryption = "WPA3-SAE".into();
        assert!(e.is_wpa3());
        e.encryption = "WPA2/WPA3-Transition".into();
        assert!(e.is_wpa3());
    }
}
