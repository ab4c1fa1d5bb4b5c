/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! The nightjar daemon: CLI surface, on-disk data directory, the engine
//! handle that gathers every singleton the control loop touches, and the
//! epoch/control loop itself (C12).

pub mod control_loop;
pub mod datadir;
pub mod engine;
pub mod firmware_recovery;
pub mod geo;
pub mod persistence;
pub mod settings;
