/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds on a monotonic clock. Not comparable across process restarts;
/// used for all interval gating, cooldowns, and dwell timing.
#[inline(always)]
pub fn ms_monotonic() -> i64 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static START: OnceLock<Instant> = OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_millis() as i64
}

/// Milliseconds since the Unix epoch on the wall clock. Used for timestamps
/// that must survive process restarts (e.g. blacklist/attack-tracker entries,
/// `first_seen`/`last_seen`).
#[inline(always)]
pub fn ms_since_epoch() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}
