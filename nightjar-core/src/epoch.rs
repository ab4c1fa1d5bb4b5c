/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! One scan/attack cycle's counters (§3 "Epoch"): per-epoch counts and
//! flags that reset every cycle, plus consecutive trackers that accumulate
//! across cycles until broken by an opposing observation.

/// Counters and flags reset by `reset_counters`; consecutive trackers persist
/// until explicitly broken by the control loop.
#[derive(Default, Debug)]
pub struct Epoch {
    pub epoch_num: u64,

    pub num_deauths: u32,
    pub num_assocs: u32,
    pub num_shakes: u32,
    pub num_hops: u32,
    pub num_missed: u32,

    pub did_deauth: bool,
    pub did_associate: bool,
    pub did_handshake: bool,
    pub any_activity: bool,

    pub inactive_for: u32,
    pub active_for: u32,
    pub blind_for: u32,
    pub sad_for: u32,
    pub bored_for: u32,
}

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the per-epoch counters and flags ahead of a new cycle. Leaves
    /// the consecutive trackers untouched — those are rolled forward
    /// separately by `roll_activity_trackers` / `roll_blind_tracker`.
    pub fn reset_counters(&mut self) {
        self.num_deauths = 0;
        self.num_assocs = 0;
        self.num_shakes = 0;
        self.num_hops = 0;
        self.num_missed = 0;
        self.did_deauth = false;
        self.did_associate = false;
        self.did_handshake = false;
        self.any_activity = false;
    }

    pub fn advance(&mut self) {
        self.epoch_num += 1;
    }

    pub fn record_deauth(&mut self) {
        self.num_deauths += 1;
        self.did_deauth = true;
        self.any_activity = true;
    }

    pub fn record_assoc(&mut self) {
        self.num_assocs += 1;
        self.did_associate = true;
        self.any_activity = true;
    }

    pub fn record_handshake(&mut self) {
        self.num_shakes += 1;
        self.did_handshake = true;
        self.any_activity = true;
    }

    pub fn record_hop(&mut self) {
        self.num_hops += 1;
    }

    pub fn record_miss(&mut self) {
        self.num_missed += 1;
    }

    /// Roll `active_for`/`inactive_for` forward based on this epoch's
    /// activity flag. Exactly one side resets to zero.
    pub fn roll_activity_trackers(&mut self) {
        if self.any_activity {
            self.active_for += 1;
            self.inactive_for = 0;
        } else {
            self.inactive_for += 1;
            self.active_for = 0;
        }
    }

    /// Roll `blind_for` forward: called by the control loop when an epoch
    /// saw zero visible APs, reset otherwise.
    pub fn roll_blind_tracker(&mut self, saw_any_aps: bool) {
        if saw_any_aps {
            self.blind_for = 0;
        } else {
            self.blind_for += 1;
        }
    }

    /// Derive `bored_for`/`sad_for` from the current inactivity streak
    /// against the two configured thresholds. Boredom sets in first;
    /// sustained inactivity past the (larger) sad threshold escalates past
    /// boredom into sadness.
    pub fn roll_mood_trackers(&mut self, bored_num_epochs: u32, sad_num_epochs: u32) {
        if self.inactive_for >= sad_num_epochs {
            self.sad_for += 1;
            self.bored_for = 0;
        } else if self.inactive_for >= bored_num_epochs {
            self.bored_for += 1;
            self.sad_for = 0;
        } else {
            self.bored_for = 0;
            self.sad_for = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_counters_clears_flags_but_not_trackers() {
        let mut e = Epoch::new();
        e.record_deauth();
        e.active_for = 7;
        e.reset_counters();
        assert_eq!(e.num_deauths, 0);
        assert!(!e.did_deauth);
        assert_eq!(e.active_for, 7);
    }

    #[test]
    fn activity_trackers_are_mutually_exclusive() {
        let mut e = Epoch::new();
        e.any_activity = true;
        e.roll_activity_trackers();
        assert_eq!(e.active_for, 1);
        assert_eq!(e.inactive_for, 0);

        e.any_activity = false;
        e.roll_activity_trackers();
        assert_eq!(e.inactive_for, 1);
        assert_eq!(e.active_for, 0);
    }

    #[test]
    fn mood_trackers_escalate_from_bored_to_sad() {
        let mut e = Epoch::new();
        e.inactive_for = 5;
        e.roll_mood_trackers(5, 15);
        assert_eq!(e.bored_for, 1);
        assert_eq!(e.sad_for, 0);

        e.inactive_for = 15;
        e.roll_mood_trackers(5, 15);
        assert_eq!(e.sad_for, 1);
        assert_eq!(e.bored_for, 0);
    }

    #[test]
    fn blind_tracker_resets_on_any_ap_sighting() {
        let mut e = Epoch::new();
        e.roll_blind_tracker(false);
        e.roll_blind_tracker(false);
        assert_eq!(e.blind_for, 2);
        e.roll_blind_tracker(true);
        assert_eq!(e.blind_for, 0);
    }
}
