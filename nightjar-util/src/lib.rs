/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Small, dependency-light primitives shared by every `nightjar-*` crate:
//! a bounds-checked fixed-capacity buffer with a typed-append DSL, and
//! monotonic/wall clock helpers.

pub mod buffer;
pub mod time;

pub use buffer::{Buffer, FlatBlob};
pub use time::{ms_monotonic, ms_since_epoch};
