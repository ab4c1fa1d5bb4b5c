/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! PRNG, Thompson-sampling Beta/Gamma draws, and the small checksum/hex
//! helpers shared by the bandits, attack frame builders, and GPS ingest.

pub mod beta;
pub mod checksum;
pub mod random;

pub use beta::{beta_mean, sample_beta, sample_gamma, MIN_SHAPE};
pub use checksum::{format_mac, parse_mac, verify_nmea_checksum};
pub use random::Xorshift64;
