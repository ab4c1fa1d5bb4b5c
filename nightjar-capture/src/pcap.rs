/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! A radiotap/802.11/EAPOL walker over a classic (non-pcapng) pcap file, just
//! deep enough to recognize the four 4-way-handshake messages and the PMKID
//! KDE (§4.9). Malformed input is never fatal: every parse step returns
//! `Option`/`Result` and the caller (classifier.rs) downgrades any failure
//! to `Quality::None` per the §7 "Capture parse errors" policy.

const PCAP_MAGIC_LE: u32 = 0xa1b2c3d4;
const PCAP_MAGIC_LE_NS: u32 = 0xa1b23c4d;
const PCAP_GLOBAL_HEADER_LEN: usize = 24;
const PCAP_RECORD_HEADER_LEN: usize = 16;

const DOT11_HEADER_LEN: usize = 24;
const QOS_CONTROL_LEN: usize = 2;
const SNAP_HEADER: [u8; 8] = [0xAA, 0xAA, 0x03, 0x00, 0x00, 0x00, 0x88, 0x8E];

const EAPOL_KEY_TYPE: u8 = 3;
const EAPOL_HEADER_LEN: usize = 4;
const KEY_DESCRIPTOR_FIXED_LEN: usize = 1 + 2 + 2 + 8 + 32 + 16 + 8 + 8 + 16 + 2;

const KEY_INFO_INSTALL: u16 = 0x0040;
const KEY_INFO_ACK: u16 = 0x0080;
const KEY_INFO_MIC: u16 = 0x0100;
const KEY_INFO_SECURE: u16 = 0x0200;

const PMKID_KDE_TAG: u8 = 0xDD;
const PMKID_KDE_OUI: [u8; 3] = [0x00, 0x0F, 0xAC];
const PMKID_KDE_TYPE: u8 = 4;
const PMKID_LEN: usize = 16;

#[derive(thiserror::Error, Debug)]
pub enum PcapParseError {
    #[error("truncated or missing pcap global header")]
    ShortGlobalHeader,
    #[error("unrecognized pcap magic number")]
    BadMagic,
    #[error("truncated packet record")]
    ShortRecord,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EapolMessage {
    M1,
    M2,
    M3,
    M4,
}

/// One parsed EAPOL-Key frame, enough to cross-check replay counters and
/// ANonce reuse across a handshake (§4.9).
#[derive(Clone, Debug)]
pub struct EapolKeyFrame {
    pub message: EapolMessage,
    pub timestamp_us: i64,
    pub replay_counter: u64,
    pub nonce: [u8; 32],
    pub has_pmkid: bool,
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(n)?;
        if end > self.data.len() {
            return None;
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Some(slice)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u16_le(&mut self) -> Option<u16> {
        self.take(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    fn u32_le(&mut self) -> Option<u32> {
        self.take(4).map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

/// One raw packet record's payload plus its capture timestamp, lifted out of
/// the pcap container before 802.11 parsing begins.
struct RawRecord<'a> {
    timestamp_us: i64,
    data: &'a [u8],
}

fn iter_records(file: &[u8]) -> Result<(bool, Vec<RawRecord<'_>>), PcapParseError> {
    if file.len() < PCAP_GLOBAL_HEADER_LEN {
        return Err(PcapParseError::ShortGlobalHeader);
    }
    let magic = u32::from_le_bytes([file[0], file[1], file[2], file[3]]);
    let nanosecond_resolution = match magic {
        PCAP_MAGIC_LE => false,
        PCAP_MAGIC_LE_NS => true,
        _ => return Err(PcapParseError::BadMagic),
    };

    let mut records = Vec::new();
    let mut cursor = Cursor::new(&file[PCAP_GLOBAL_HEADER_LEN..]);
    while cursor.remaining() > 0 {
        if cursor.remaining() < PCAP_RECORD_HEADER_LEN {
            break;
        }
        let ts_sec = cursor.u32_le().ok_or(PcapParseError::ShortRecord)?;
        let ts_frac = cursor.u32_le().ok_or(PcapParseError::ShortRecord)?;
        let incl_len = cursor.u32_le().ok_or(PcapParseError::ShortRecord)? as usize;
        let _orig_len = cursor.u32_le().ok_or(PcapParseError::ShortRecord)?;
        let payload = cursor.take(incl_len).ok_or(PcapParseError::ShortRecord)?;
        let frac_us = if nanosecond_resolution { ts_frac / 1000 } else { ts_frac };
        records.push(RawRecord { timestamp_us: ts_sec as i64 * 1_000_000 + frac_us as i64, data: payload });
    }
    Ok((nanosecond_resolution, records))
}

/// Skip the variable-length radiotap header (its own length field at bytes
/// 2-3, little-endian) and return what follows: the 802.11 MAC header.
fn skip_radiotap(frame: &[u8]) -> Option<&[u8]> {
    if frame.len() < 4 {
        return None;
    }
    let len = u16::from_le_bytes([frame[2], frame[3]]) as usize;
    frame.get(len..)
}

fn frame_control_type_subtype(header: &[u8]) -> Option<(u8, u8)> {
    let byte0 = *header.first()?;
    Some(((byte0 >> 2) & 0x03, (byte0 >> 4) & 0x0F))
}

/// Locate the EAPOL-Key body within one 802.11 data frame, if present.
fn find_eapol_body(mac_frame: &[u8]) -> Option<&[u8]> {
    let (frame_type, _subtype) = frame_control_type_subtype(mac_frame)?;
    if frame_type != 0x02 {
        return None; // not a data frame
    }
    let fc1 = *mac_frame.get(1)?;
    let qos = (mac_frame.first()? >> 7) & 0x01 == 1; // subtype bit 7 marks QoS data
    let mut offset = DOT11_HEADER_LEN;
    if qos {
        offset += QOS_CONTROL_LEN;
    }
    let _ = fc1;
    let body = mac_frame.get(offset..)?;
    let snap = body.get(0..8)?;
    if snap != SNAP_HEADER {
        return None;
    }
    let eapol = body.get(8..)?;
    if eapol.len() < EAPOL_HEADER_LEN {
        return None;
    }
    if eapol[1] != EAPOL_KEY_TYPE {
        return None;
    }
    eapol.get(EAPOL_HEADER_LEN..)
}

fn classify_message(key_info: u16) -> EapolMessage {
    let install = key_info & KEY_INFO_INSTALL != 0;
    let ack = key_info & KEY_INFO_ACK != 0;
    let mic = key_info & KEY_INFO_MIC != 0;
    let secure = key_info & KEY_INFO_SECURE != 0;
    match (ack, mic, secure, install) {
        (true, false, _, _) => EapolMessage::M1,
        (false, true, false, _) => EapolMessage::M2,
        (true, true, true, _) => EapolMessage::M3,
        _ => EapolMessage::M4,
    }
}

fn scan_pmkid(key_data: &[u8]) -> bool {
    let mut i = 0;
    while i + 2 <= key_data.len() {
        let tag = key_data[i];
        let len = key_data[i + 1] as usize;
        let value = match key_data.get(i + 2..i + 2 + len) {
            Some(v) => v,
            None => break,
        };
        if tag == PMKID_KDE_TAG && value.len() >= 3 + 1 + PMKID_LEN && value[0..3] == PMKID_KDE_OUI && value[3] == PMKID_KDE_TYPE {
            return true;
        }
        i += 2 + len;
    }
    false
}

fn parse_eapol_key(body: &[u8], timestamp_us: i64) -> Option<EapolKeyFrame> {
    if body.len() < KEY_DESCRIPTOR_FIXED_LEN {
        return None;
    }
    let mut c = Cursor::new(body);
    let _descriptor_type = c.u8()?;
    let key_info_be = c.take(2)?;
    let key_info = u16::from_be_bytes([key_info_be[0], key_info_be[1]]);
    let _key_length = c.take(2)?;
    let replay_counter_be = c.take(8)?;
    let replay_counter = u64::from_be_bytes(replay_counter_be.try_into().ok()?);
    let nonce_bytes = c.take(32)?;
    let mut nonce = [0_u8; 32];
    nonce.copy_from_slice(nonce_bytes);
    let _iv = c.take(16)?;
    let _rsc = c.take(8)?;
    let _reserved = c.take(8)?;
    let _mic = c.take(16)?;
    let key_data_len_be = c.take(2)?;
    let key_data_len = u16::from_be_bytes([key_data_len_be[0], key_data_len_be[1]]) as usize;
    let key_data = c.take(key_data_len.min(c.remaining())).unwrap_or(&[]);

    let message = classify_message(key_info);
    let has_pmkid = message == EapolMessage::M1 && scan_pmkid(key_data);

    Some(EapolKeyFrame { message, timestamp_us, replay_counter, nonce, has_pmkid })
}

/// Parse every frame in a pcap file byte blob and return the EAPOL-Key
/// frames found, in capture order. Any structural failure (bad magic,
/// truncated record) is surfaced as `PcapParseError`; individual frames
/// that fail to parse as 802.11/EAPOL are silently skipped, since a pcap
/// legitimately contains plenty of non-handshake traffic.
pub fn parse_eapol_frames(file: &[u8]) -> Result<Vec<EapolKeyFrame>, PcapParseError> {
    let (_ns, records) = iter_records(file)?;
    let mut frames = Vec::new();
    for record in records {
        let Some(mac_frame) = skip_radiotap(record.data) else { continue };
        let Some(eapol_body) = find_eapol_body(mac_frame) else { continue };
        if let Some(parsed) = parse_eapol_key(eapol_body, record.timestamp_us) {
            frames.push(parsed);
        }
    }
    Ok(frames)
}
