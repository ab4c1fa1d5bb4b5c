/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

/// A small, fast, non-cryptographic PRNG. Every bandit draw (C2), jitter
/// delay (§4.7), and rogue MAC byte in the attack frame catalogue goes
/// through an instance of this type rather than calling the OS RNG directly,
/// per the Design Notes' "centralize behind an injectable source" guidance:
/// tests construct a `Xorshift64::seeded(n)` for determinism, while the
/// running daemon uses `Xorshift64::from_entropy()`.
#[derive(Clone)]
pub struct Xorshift64 {
    state: Cell<u64>,
}

impl Xorshift64 {
    /// Construct from an explicit seed. The seed must be non-zero; zero is
    /// mapped to a fixed non-zero constant since xorshift64 has a fixed
    /// point at zero.
    #[inline]
    pub fn seeded(seed: u64) -> Self {
        Self { state: Cell::new(if seed == 0 { 0x9E3779B97F4A7C15 } else { seed }) }
    }

    /// Seed from wall-clock time and OS entropy, as specified for the
    /// per-process PRNG in §4.2.
    pub fn from_entropy() -> Self {
        let wall = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0x1234_5678_9abc_def0);
        let mut os_bytes = [0_u8; 8];
        let _ = getrandom::getrandom(&mut os_bytes);
        Self::seeded(wall ^ u64::from_ne_bytes(os_bytes))
    }

    /// Raw 64-bit xorshift step.
    #[inline]
    pub fn next_u64(&self) -> u64 {
        let mut x = self.state.get();
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state.set(x);
        x
    }

    #[inline]
    pub fn next_u32(&self) -> u32 {
        (self.next_u64() >> 32) as u32
    }

    /// Uniform float in `[0, 1)`.
    #[inline]
    pub fn next_f64(&self) -> f64 {
        // Use the top 53 bits for a uniform double in [0, 1).
        ((self.next_u64() >> 11) as f64) * (1.0 / ((1_u64 << 53) as f64))
    }

    /// Uniform float in `(0, 1)`, excluding both endpoints. Needed by the
    /// Marsaglia–Tsang sampler, which divides by and takes logs of uniforms.
    #[inline]
    pub fn next_f64_open(&self) -> f64 {
        let mut u = self.next_f64();
        while u <= 0.0 {
            u = self.next_f64();
        }
        u
    }

    /// Random value in `[lo, hi]` inclusive, for jitter delays and reason
    /// code / phase tie-breaking.
    pub fn range_u64(&self, lo: u64, hi: u64) -> u64 {
        if hi <= lo {
            return lo;
        }
        lo + (self.next_u64() % (hi - lo + 1))
    }

    pub fn range_f64(&self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    /// Pick a random element from a non-empty slice.
    pub fn choose<'a, T>(&self, items: &'a [T]) -> &'a T {
        let i = (self.next_u64() as usize) % items.len();
        &items[i]
    }

    /// Fill a locally-administered, unicast random MAC (used by rogue-MAC
    /// attack frames: `auth_assoc_pmkid`, `rogue_m2`, `probe_undirected`).
    /// Bit 1 (locally administered) is set, bit 0 (multicast) is cleared, on
    /// the first octet, per 802 MAC addressing rules.
    pub fn random_locally_administered_mac(&self) -> [u8; 6] {
        let mut m = [0_u8; 6];
        for b in m.iter_mut() {
            *b = self.next_u32() as u8;
        }
        m[0] = (m[0] & 0xFC) | 0x02;
        m
    }
}

impl Default for Xorshift64 {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sequences_are_deterministic() {
        let a = Xorshift64::seeded(42);
        let b = Xorshift64::seeded(42);
        for _ in 0..100 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn zero_seed_is_remapped() {
        let r = Xorshift64::seeded(0);
        // Must not get stuck at zero forever.
        assert_ne!(r.next_u64(), 0);
    }

    #[test]
    fn range_u64_respects_bounds() {
        let r = Xorshift64::seeded(7);
        for _ in 0..1000 {
            let v = r.range_u64(10, 20);
            assert!((10..=20).contains(&v));
        }
    }

    #[test]
    fn random_mac_is_locally_administered_unicast() {
        let r = Xorshift64::seeded(99);
        for _ in 0..50 {
            let mac = r.random_locally_administered_mac();
            assert_eq!(mac[0] & 0x01, 0); // unicast
            assert_eq!(mac[0] & 0x02, 0x02); // locally administered
        }
    }

    #[test]
    fn next_f64_is_in_unit_interval() {
        let r = Xorshift64::seeded(123);
        for _ in 0..10_000 {
            let v = r.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
