/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Handshake capture classification: a pcap reader narrow enough to
//! recognize EAPOL-Key frames, a directory-scanning classifier with a
//! time-to-live cache, filename-embedded BSSID recovery, and advisory
//! conversion to the formats downstream cracking tools expect.

pub mod classifier;
pub mod convert;
pub mod filename;
pub mod pcap;

pub use classifier::{CaptureRecord, Classifier, Quality, SCAN_TTL_MS};
pub use convert::{convert_to_hc22000, convert_to_pcapng, try_advisory_conversions, ConvertError};
pub use filename::{extract_bssid_from_filename, split_ssid_and_bssid};
pub use pcap::{parse_eapol_frames, EapolKeyFrame, EapolMessage, PcapParseError};
