/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! The typed radiotap/802.11/EAPOL framing DSL, the thirteen attack frame
//! builders (C7, §4.7), and the attack orchestrator (C8, §4.8) that
//! sequences them against a candidate AP.

pub mod builders;
pub mod dot11;
pub mod eapol;
pub mod ie;
pub mod orchestrator;
pub mod radiotap;

pub use builders::{
    anon_reassoc, auth_assoc_pmkid, csa_action, csa_beacon, deauth_bidi, deauth_broadcast, disassoc_bidi, eapol_m1_malformed, power_save_spoof,
    probe_directed, probe_undirected, rogue_m2, rsn_downgrade, BuiltFrame, Frame, FRAME_CAPACITY,
};
pub use dot11::{SeqSource, SequenceCounters};
pub use orchestrator::{AttackOutcome, Orchestrator};
