/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! The fixed 8-byte radiotap header every injected frame begins with:
//! version 0, no padding, length 8, and an empty "present" bitmap — we
//! carry no radio metadata on transmit, only on the receive/classify path
//! in `nightjar-capture`.

use nightjar_util::Buffer;

pub const RADIOTAP_HEADER_LEN: usize = 8;

/// Append the transmit-side radiotap header to `buf`.
pub fn write_radiotap_header<const L: usize>(buf: &mut Buffer<L>) {
    buf.append_u8(0).expect("radiotap header fits"); // version
    buf.append_u8(0).expect("radiotap header fits"); // pad
    buf.append_u16_le(RADIOTAP_HEADER_LEN as u16).expect("radiotap header fits"); // header length, LE
    buf.append_u32_le(0).expect("radiotap header fits"); // present bitmap, empty
}
