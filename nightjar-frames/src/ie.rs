/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Information elements used by the attack catalogue: SSID, RSN, and CSA.
//! Every IE is `tag(1) + length(1) + payload`, where length counts only the
//! bytes that follow it.

use nightjar_util::Buffer;

pub const TAG_SSID: u8 = 0;
pub const TAG_RSN: u8 = 48;
pub const TAG_CSA: u8 = 37;

const OUI_CCMP: [u8; 4] = [0x00, 0x0F, 0xAC, 0x04];
const OUI_PSK: [u8; 4] = [0x00, 0x0F, 0xAC, 0x02];

/// Append a generic `tag, len, payload` IE.
pub fn write_ie<const L: usize>(buf: &mut Buffer<L>, tag: u8, payload: &[u8]) {
    buf.append_u8(tag).expect("frame fits");
    buf.append_u8(payload.len() as u8).expect("frame fits");
    buf.append_bytes(payload).expect("frame fits");
}

/// SSID IE; an empty `ssid` produces the zero-length wildcard form used by
/// undirected probe requests.
pub fn write_ssid_ie<const L: usize>(buf: &mut Buffer<L>, ssid: &str) {
    write_ie(buf, TAG_SSID, ssid.as_bytes());
}

/// Full RSN IE: version 1, CCMP group/pairwise cipher, PSK AKM, and
/// optionally the Management Frame Protection Capable bit in RSN
/// capabilities. `auth_assoc_pmkid` sets `mfpc=true`; `rsn_downgrade` sets
/// it `false` to coerce a transition-mode client into plain WPA2.
pub fn write_rsn_ie<const L: usize>(buf: &mut Buffer<L>, mfpc: bool) {
    let mut body = Vec::with_capacity(20);
    body.extend_from_slice(&1_u16.to_le_bytes()); // version
    body.extend_from_slice(&OUI_CCMP); // group cipher suite
    body.extend_from_slice(&1_u16.to_le_bytes()); // pairwise cipher count
    body.extend_from_slice(&OUI_CCMP); // pairwise cipher list
    body.extend_from_slice(&1_u16.to_le_bytes()); // AKM count
    body.extend_from_slice(&OUI_PSK); // AKM list
    let capabilities: u16 = if mfpc { 0x0040 } else { 0x0000 };
    body.extend_from_slice(&capabilities.to_le_bytes());
    write_ie(buf, TAG_RSN, &body);
}

/// CSA IE: mode, new channel, switch count.
pub fn write_csa_ie<const L: usize>(buf: &mut Buffer<L>, mode: u8, new_channel: u8, switch_count: u8) {
    write_ie(buf, TAG_CSA, &[mode, new_channel, switch_count]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ssid_ie_length_excludes_tag_and_length_bytes() {
        let mut buf: Buffer<64> = Buffer::new();
        write_ssid_ie(&mut buf, "home");
        assert_eq!(buf.as_bytes(), &[TAG_SSID, 4, b'h', b'o', b'm', b'e']);
    }

    #[test]
    fn wildcard_ssid_ie_has_zero_length() {
        let mut buf: Buffer<64> = Buffer::new();
        write_ssid_ie(&mut buf, "");
        assert_eq!(buf.as_bytes(), &[TAG_SSID, 0]);
    }

    #[test]
    fn rsn_ie_toggles_mfpc_bit() {
        let mut with_mfpc: Buffer<64> = Buffer::new();
        write_rsn_ie(&mut with_mfpc, true);
        let mut without_mfpc: Buffer<64> = Buffer::new();
        write_rsn_ie(&mut without_mfpc, false);
        assert_ne!(with_mfpc.as_bytes(), without_mfpc.as_bytes());
        let caps_with = u16::from_le_bytes([with_mfpc.as_bytes()[18], with_mfpc.as_bytes()[19]]);
        assert_eq!(caps_with & 0x0040, 0x0040);
        let caps_without = u16::from_le_bytes([without_mfpc.as_bytes()[18], without_mfpc.as_bytes()[19]]);
        assert_eq!(caps_without & 0x0040, 0);
    }

    #[test]
    fn csa_ie_has_fixed_three_byte_payload() {
        let mut buf: Buffer<64> = Buffer::new();
        write_csa_ie(&mut buf, 1, 14, 5);
        assert_eq!(buf.as_bytes(), &[TAG_CSA, 3, 1, 14, 5]);
    }
}
