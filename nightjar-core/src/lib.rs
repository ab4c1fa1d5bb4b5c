/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! The decision engine: entities, their signal tracker and Thompson
//! bandits, the bounded interaction/attack/blacklist tables, the mood FSM,
//! epoch bookkeeping, and engine-wide configuration.

pub mod bandit;
pub mod config;
pub mod entity;
pub mod epoch;
pub mod mood;
pub mod registry;
pub mod signal;
pub mod throttle;

pub use config::Config;
pub use entity::Entity;
pub use epoch::Epoch;
pub use registry::Registry;
