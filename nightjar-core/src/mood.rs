/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Epoch-driven mood state machine (C11) and the frustration diagnosis
//! attached when entering SAD or ANGRY.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Mood {
    Starting,
    Ready,
    Normal,
    Bored,
    Sad,
    Angry,
    Lonely,
    Excited,
    Grateful,
    Sleeping,
}

/// Every quantity the decision tree in §4.11 reads. `support_network_factor`
/// is the "factor ≥ 2" switch described as unused in this deployment — it is
/// wired through rather than hard-coded so a future collaborator can set it,
/// but today's control loop always passes `false`.
pub struct MoodInputs {
    pub num_missed: u32,
    pub max_misses_for_recon: u32,
    pub sad_for: u32,
    pub bored_for: u32,
    pub active_for: u32,
    pub excited_num_epochs: u32,
    pub support_network_factor_ge_2: bool,
    pub all_visible_fully_captured: bool,
}

/// Apply the §4.11 decision tree and return the new mood. Bootstrap states
/// (`Starting`, `Ready`) and externally triggered states (`Grateful` on
/// crack success, `Sleeping` under manual mode) are not produced here; the
/// control loop sets those directly.
pub fn transition(inputs: &MoodInputs) -> Mood {
    if inputs.num_missed > inputs.max_misses_for_recon {
        let base = if inputs.support_network_factor_ge_2 { Mood::Angry } else { Mood::Lonely };
        return cap_at_bored(base, inputs.all_visible_fully_captured);
    }
    if inputs.sad_for > 0 {
        let base = if inputs.support_network_factor_ge_2 { Mood::Angry } else { Mood::Sad };
        return cap_at_bored(base, inputs.all_visible_fully_captured);
    }
    if inputs.bored_for > 0 {
        return if inputs.all_visible_fully_captured { Mood::Bored } else { Mood::Normal };
    }
    if inputs.active_for >= inputs.excited_num_epochs {
        return Mood::Excited;
    }
    Mood::Normal
}

fn cap_at_bored(base: Mood, all_captured: bool) -> Mood {
    if all_captured {
        Mood::Bored
    } else {
        base
    }
}

/// True the first epoch the mood becomes `Angry`; the control loop uses this
/// to fire the initial HULK barrage.
pub fn entered_angry(previous: Mood, current: Mood) -> bool {
    previous != Mood::Angry && current == Mood::Angry
}

/// True when HULK should repeat: still angry, on every fifth epoch.
pub fn should_repeat_hulk(current: Mood, epoch_num: u64) -> bool {
    current == Mood::Angry && epoch_num % 5 == 0
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrustrationReason {
    Generic,
    NoClients,
    Wpa3Pmf,
    WeakSignal,
    DeauthsIgnored,
}

/// Tallies over the uncaptured-and-attack-eligible APs, gathered by the
/// control loop just before entering SAD/ANGRY.
#[derive(Default)]
pub struct FrustrationInputs {
    pub total_eligible: u32,
    pub zero_client_count: u32,
    pub wpa3_count: u32,
    pub weak_signal_count: u32,
    pub deauths_without_handshake: u32,
}

/// Label the dominant cause of frustration among eligible-but-uncaptured
/// APs. A category must cover at least half of the eligible set to be named
/// specifically; otherwise `Generic`.
pub fn diagnose_frustration(inputs: &FrustrationInputs) -> FrustrationReason {
    if inputs.total_eligible == 0 {
        return FrustrationReason::Generic;
    }
    let majority = inputs.total_eligible.div_ceil(2);
    let candidates = [
        (FrustrationReason::NoClients, inputs.zero_client_count),
        (FrustrationReason::Wpa3Pmf, inputs.wpa3_count),
        (FrustrationReason::WeakSignal, inputs.weak_signal_count),
        (FrustrationReason::DeauthsIgnored, inputs.deauths_without_handshake),
    ];
    candidates
        .into_iter()
        .filter(|(_, count)| *count >= majority)
        .max_by_key(|(_, count)| *count)
        .map(|(reason, _)| reason)
        .unwrap_or(FrustrationReason::Generic)
}
