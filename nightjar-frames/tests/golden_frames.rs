/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Byte-for-byte fixtures for the attack builders whose output does not
//! depend on randomness. Sequence counters always start at zero in these
//! tests, so the expected bytes below are exact, not just structural.

use nightjar_frames::{anon_reassoc, csa_action, csa_beacon, power_save_spoof, SequenceCounters};

const AP: [u8; 6] = [0x00, 0x11, 0x22, 0x33, 0x44, 0x55];
const STA: [u8; 6] = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];
const BROADCAST: [u8; 6] = [0xff; 6];
const RADIOTAP: [u8; 8] = [0x00, 0x00, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00];

fn dummy_rng() -> nightjar_crypto::Xorshift64 {
    nightjar_crypto::Xorshift64::seeded(0xC0FFEE)
}

#[test]
fn anon_reassoc_matches_fixture() {
    let mut seq = SequenceCounters::new();
    let rng = dummy_rng();
    let frames = anon_reassoc(AP, "home", &mut seq, &rng);
    assert_eq!(frames.len(), 1);

    let mut expected = Vec::new();
    expected.extend_from_slice(&RADIOTAP);
    expected.extend_from_slice(&[0x20, 0x00]); // frame control: reassoc request
    expected.extend_from_slice(&[0x00, 0x00]); // duration
    expected.extend_from_slice(&AP); // addr1: destination
    expected.extend_from_slice(&BROADCAST); // addr2: spoofed source
    expected.extend_from_slice(&AP); // addr3: bssid
    expected.extend_from_slice(&[0x00, 0x00]); // sequence control
    expected.extend_from_slice(&[0x11, 0x00]); // capability info
    expected.extend_from_slice(&[0x01, 0x00]); // listen interval
    expected.extend_from_slice(&AP); // current AP address field
    expected.extend_from_slice(&[0x00, 0x04, b'h', b'o', b'm', b'e']); // SSID IE

    assert_eq!(frames[0].bytes.as_bytes(), expected.as_slice());
    assert!(frames[0].jitter_after_ms.is_none());
}

#[test]
fn power_save_spoof_matches_fixture() {
    let mut seq = SequenceCounters::new();
    let frames = power_save_spoof(AP, STA, &mut seq);
    assert_eq!(frames.len(), 2);

    let mut sleep = Vec::new();
    sleep.extend_from_slice(&RADIOTAP);
    sleep.extend_from_slice(&[0x48, 0x11]); // frame control: null data, ToDS+PwrMgt
    sleep.extend_from_slice(&[0x00, 0x00]);
    sleep.extend_from_slice(&AP);
    sleep.extend_from_slice(&STA);
    sleep.extend_from_slice(&AP);
    sleep.extend_from_slice(&[0x00, 0x00]);
    assert_eq!(frames[0].bytes.as_bytes(), sleep.as_slice());
    assert_eq!(frames[0].jitter_after_ms, Some((7.0, 13.0)));

    let mut wake = Vec::new();
    wake.extend_from_slice(&RADIOTAP);
    wake.extend_from_slice(&[0x48, 0x01]); // frame control: null data, ToDS only
    wake.extend_from_slice(&[0x00, 0x00]);
    wake.extend_from_slice(&AP);
    wake.extend_from_slice(&STA);
    wake.extend_from_slice(&AP);
    wake.extend_from_slice(&[0x10, 0x00]); // second frame on the STA counter
    assert_eq!(frames[1].bytes.as_bytes(), wake.as_slice());
    assert!(frames[1].jitter_after_ms.is_none());
}

#[test]
fn csa_beacon_first_frame_matches_fixture() {
    let mut seq = SequenceCounters::new();
    let frames = csa_beacon(AP, "home", &mut seq);
    assert_eq!(frames.len(), 6);

    let mut expected = Vec::new();
    expected.extend_from_slice(&RADIOTAP);
    expected.extend_from_slice(&[0x80, 0x00]); // frame control: beacon
    expected.extend_from_slice(&[0x00, 0x00]);
    expected.extend_from_slice(&BROADCAST);
    expected.extend_from_slice(&AP);
    expected.extend_from_slice(&AP);
    expected.extend_from_slice(&[0x00, 0x00]); // sequence control, first beacon
    expected.extend_from_slice(&[0; 8]); // timestamp, zeroed at build time
    expected.extend_from_slice(&[0x64, 0x00]); // beacon interval: 100 TU
    expected.extend_from_slice(&[0x11, 0x00]); // capability info
    expected.extend_from_slice(&[0x00, 0x04, b'h', b'o', b'm', b'e']); // SSID IE
    expected.extend_from_slice(&[0x25, 0x03, 0x01, 0x0e, 0x05]); // CSA IE, countdown 5

    assert_eq!(frames[0].bytes.as_bytes(), expected.as_slice());
    assert_eq!(frames[0].jitter_after_ms, Some((70.0, 130.0)));
}

#[test]
fn csa_action_matches_fixture() {
    let mut seq = SequenceCounters::new();
    let frames = csa_action(AP, &mut seq);
    assert_eq!(frames.len(), 1);

    let mut expected = Vec::new();
    expected.extend_from_slice(&RADIOTAP);
    expected.extend_from_slice(&[0xd0, 0x00]); // frame control: action
    expected.extend_from_slice(&[0x00, 0x00]);
    expected.extend_from_slice(&BROADCAST);
    expected.extend_from_slice(&AP);
    expected.extend_from_slice(&AP);
    expected.extend_from_slice(&[0x00, 0x00]);
    expected.push(0x00); // category: spectrum management
    expected.push(0x04); // action: channel switch announcement
    expected.extend_from_slice(&[0x25, 0x03, 0x01, 0x0e, 0x03]); // CSA IE, fixed count 3

    assert_eq!(frames[0].bytes.as_bytes(), expected.as_slice());
    assert!(frames[0].jitter_after_ms.is_none());
}
