/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! 802.11 MAC header framing: frame control, the three sequence counters,
//! and the two deauth/disassoc reason-code pools (§4.7).

use nightjar_crypto::Xorshift64;
use nightjar_util::Buffer;

// Management subtypes (type = 0).
pub const SUBTYPE_ASSOC_REQ: u8 = 0x00;
pub const SUBTYPE_ASSOC_RESP: u8 = 0x01;
pub const SUBTYPE_REASSOC_REQ: u8 = 0x02;
pub const SUBTYPE_PROBE_REQ: u8 = 0x04;
pub const SUBTYPE_PROBE_RESP: u8 = 0x05;
pub const SUBTYPE_BEACON: u8 = 0x08;
pub const SUBTYPE_DISASSOC: u8 = 0x0A;
pub const SUBTYPE_AUTH: u8 = 0x0B;
pub const SUBTYPE_DEAUTH: u8 = 0x0C;
pub const SUBTYPE_ACTION: u8 = 0x0D;

// Data subtypes (type = 2).
pub const SUBTYPE_NULL_DATA: u8 = 0x04;

pub const TYPE_MANAGEMENT: u8 = 0x00;
pub const TYPE_DATA: u8 = 0x02;

/// Reason codes an AP would legitimately use (802.11-2020 Table 9-49);
/// rotated randomly per injected frame to frustrate signature-based WIDS.
pub const AP_ORIGIN_REASONS: [u16; 6] = [7, 4, 13, 14, 15, 72];
/// Reason codes a station would legitimately use.
pub const STA_ORIGIN_REASONS: [u16; 3] = [8, 4, 25];

pub fn random_ap_reason(rng: &Xorshift64) -> u16 {
    *rng.choose(&AP_ORIGIN_REASONS)
}

pub fn random_sta_reason(rng: &Xorshift64) -> u16 {
    *rng.choose(&STA_ORIGIN_REASONS)
}

/// Three independent 12-bit sequence counters (AP-spoofed, STA-spoofed,
/// probe), each wrapping at 4096 and shifted left 4 bits into the
/// sequence-control field on write.
#[derive(Default)]
pub struct SequenceCounters {
    ap: u16,
    sta: u16,
    probe: u16,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SeqSource {
    Ap,
    Sta,
    Probe,
}

impl SequenceCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance and return the next sequence-control value (fragment number
    /// 0, sequence number in the high 12 bits) for `source`.
    pub fn next(&mut self, source: SeqSource) -> u16 {
        let counter = match source {
            SeqSource::Ap => &mut self.ap,
            SeqSource::Sta => &mut self.sta,
            SeqSource::Probe => &mut self.probe,
        };
        let value = *counter & 0x0FFF;
        *counter = (*counter + 1) & 0x0FFF;
        value << 4
    }
}

/// Pack a management/data frame control field. `protected` sets bit 6 of
/// the second octet; the remaining flag bits (ToDS/FromDS/PwrMgt/...) are
/// passed explicitly since each attack frame needs a different subset.
#[allow(clippy::too_many_arguments)]
pub fn frame_control(frame_type: u8, subtype: u8, to_ds: bool, from_ds: bool, pwr_mgt: bool, protected: bool) -> u16 {
    let byte0 = (subtype << 4) | (frame_type << 2);
    let mut byte1 = 0_u8;
    if to_ds {
        byte1 |= 0x01;
    }
    if from_ds {
        byte1 |= 0x02;
    }
    if pwr_mgt {
        byte1 |= 0x10;
    }
    if protected {
        byte1 |= 0x40;
    }
    u16::from_le_bytes([byte0, byte1])
}

/// Write the standard 24-byte 802.11 header: frame control, duration,
/// address 1 (destination), address 2 (source), address 3 (BSSID), and
/// sequence control.
#[allow(clippy::too_many_arguments)]
pub fn write_header<const L: usize>(buf: &mut Buffer<L>, fc: u16, duration: u16, addr1: &[u8; 6], addr2: &[u8; 6], addr3: &[u8; 6], seq_ctrl: u16) {
    buf.append_u16_le(fc).expect("frame fits");
    buf.append_u16_le(duration).expect("frame fits");
    buf.append_bytes_fixed(addr1).expect("frame fits");
    buf.append_bytes_fixed(addr2).expect("frame fits");
    buf.append_bytes_fixed(addr3).expect("frame fits");
    buf.append_u16_le(seq_ctrl).expect("frame fits");
}

pub const HEADER_LEN: usize = 24;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_counters_wrap_at_4096_and_are_independent() {
        let mut c = SequenceCounters::new();
        for _ in 0..4096 {
            c.next(SeqSource::Ap);
        }
        assert_eq!(c.next(SeqSource::Ap), 0);
        assert_eq!(c.next(SeqSource::Sta), 0);
    }

    #[test]
    fn frame_control_packs_subtype_and_flags() {
        let fc = frame_control(TYPE_MANAGEMENT, SUBTYPE_DEAUTH, false, true, false, false);
        let bytes = fc.to_le_bytes();
        assert_eq!(bytes[0], (SUBTYPE_DEAUTH << 4) | (TYPE_MANAGEMENT << 2));
        assert_eq!(bytes[1], 0x02);
    }

    #[test]
    fn header_round_trips_expected_byte_layout() {
        let mut buf: Buffer<64> = Buffer::new();
        let fc = frame_control(TYPE_MANAGEMENT, SUBTYPE_DEAUTH, false, false, false, false);
        write_header(&mut buf, fc, 0, &[0xff; 6], &[0x11; 6], &[0x22; 6], 0x1230);
        assert_eq!(buf.len(), HEADER_LEN);
        assert_eq!(&buf.as_bytes()[4..10], &[0xff; 6]);
        assert_eq!(&buf.as_bytes()[10..16], &[0x11; 6]);
        assert_eq!(&buf.as_bytes()[16..22], &[0x22; 6]);
    }

    #[test]
    fn reason_pools_are_disjoint_and_nonempty() {
        for r in AP_ORIGIN_REASONS {
            assert!(!STA_ORIGIN_REASONS.contains(&r) || r == 4);
        }
    }
}
