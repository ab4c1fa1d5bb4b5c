/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! The two external collaborators pinned by §6: the session-source
//! command/query client and the raw 802.11 injection socket. Both are
//! owned as singletons by the control loop (§5).

pub mod client;
pub mod raw_socket;

pub use client::{interpolate_tx_power, ApInfo, DeauthTarget, SessionError, SessionEvent, SessionSource, StaInfo, StealthLevel, TextLineSessionSource};
pub use raw_socket::{InjectError, NullInjector, RawInjector};

#[cfg(target_os = "linux")]
pub use raw_socket::PacketSocketInjector;
