/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! The three Thompson-sampling bandits: per-AP attack phase (C3), global
//! channel (C4), and operating mode (C5). All draw from the shared
//! `nightjar_crypto::sample_beta` sampler.

pub mod ap;
pub mod channel;
pub mod mode;
