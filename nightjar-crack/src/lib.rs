/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Idle dictionary-attack scheduling: the crack manager's child-process
//! lifecycle, wordlist enumeration and mutation, and append-only crack-state
//! persistence (C13).

pub mod manager;
pub mod state;
pub mod wordlist;

pub use manager::{CheckResult, CrackError, CrackManager, CrackTarget, ManagerState};
pub use state::{CrackState, Outcome, StateError};
pub use wordlist::{enumerate_wordlists, expand_variations, WordlistEntry, SUFFIXES};
