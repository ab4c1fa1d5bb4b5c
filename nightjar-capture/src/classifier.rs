/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Handshake quality classification over a capture directory (§4.9). A
//! directory scan is expensive relative to the epoch cadence it's consulted
//! from, so results are cached for `SCAN_TTL_MS` and refreshed lazily.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::filename::extract_bssid_from_filename;
use crate::pcap::{EapolMessage, parse_eapol_frames};

/// How long a directory scan's results are trusted before a rescan.
pub const SCAN_TTL_MS: i64 = 300_000;

/// Messages separated by more than this are not considered the same 4-way
/// exchange (a stale M1 from a much earlier attempt paired with a fresh M2
/// would otherwise misclassify as a handshake).
const MAX_MESSAGE_SPAN_US: i64 = 5_000_000;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Quality {
    None,
    Partial,
    Pmkid,
    Full,
}

/// A single capture file's classification, cached by [`Classifier`].
#[derive(Clone, Debug)]
pub struct CaptureRecord {
    pub path: PathBuf,
    pub quality: Quality,
}

fn classify_pcap_bytes(bytes: &[u8]) -> Quality {
    let frames = match parse_eapol_frames(bytes) {
        Ok(frames) => frames,
        Err(_) => return Quality::None,
    };
    if frames.is_empty() {
        return Quality::None;
    }

    let has_pmkid = frames.iter().any(|f| f.message == EapolMessage::M1 && f.has_pmkid);

    // Full 4-way: an M1/M2 pair sharing a replay counter, followed by an
    // M3/M4 pair sharing the next replay counter, with the M3's ANonce
    // matching the initiating M1, all within MAX_MESSAGE_SPAN_US of M1.
    for m1 in frames.iter().filter(|f| f.message == EapolMessage::M1) {
        let m2 = frames.iter().find(|f| {
            f.message == EapolMessage::M2
                && f.replay_counter == m1.replay_counter
                && f.timestamp_us >= m1.timestamp_us
                && f.timestamp_us - m1.timestamp_us <= MAX_MESSAGE_SPAN_US
        });
        let Some(m2) = m2 else { continue };

        let m3 = frames.iter().find(|f| {
            f.message == EapolMessage::M3
                && f.nonce == m1.nonce
                && f.timestamp_us >= m2.timestamp_us
                && f.timestamp_us - m1.timestamp_us <= MAX_MESSAGE_SPAN_US
        });
        let Some(m3) = m3 else { continue };

        let m4 = frames.iter().find(|f| {
            f.message == EapolMessage::M4
                && f.replay_counter == m3.replay_counter
                && f.timestamp_us >= m3.timestamp_us
                && f.timestamp_us - m1.timestamp_us <= MAX_MESSAGE_SPAN_US
        });
        if m4.is_some() {
            return Quality::Full;
        }
    }

    if has_pmkid {
        return Quality::Pmkid;
    }

    // frames is already confirmed non-empty above; any M1-M4 present but not
    // forming a full handshake or carrying a PMKID is a partial capture.
    Quality::Partial
}

fn classify_file(path: &Path) -> Quality {
    match fs::read(path) {
        Ok(bytes) => classify_pcap_bytes(&bytes),
        Err(_) => Quality::None,
    }
}

/// Scans a capture directory on demand, caching the per-BSSID best quality
/// seen across all files until the cache expires.
pub struct Classifier {
    capture_dir: PathBuf,
    by_bssid: HashMap<String, CaptureRecord>,
    last_scan_ms: Option<i64>,
}

impl Classifier {
    pub fn new(capture_dir: impl Into<PathBuf>) -> Self {
        Self { capture_dir: capture_dir.into(), by_bssid: HashMap::new(), last_scan_ms: None }
    }

    fn is_stale(&self, now_ms: i64) -> bool {
        match self.last_scan_ms {
            Some(last) => now_ms - last >= SCAN_TTL_MS,
            None => true,
        }
    }

    /// Rescans the capture directory if the cache is stale. Read/parse
    /// errors for individual files are logged and skipped; a missing
    /// directory is treated as "nothing captured yet", not an error.
    pub fn refresh(&mut self, now_ms: i64) {
        if !self.is_stale(now_ms) {
            return;
        }
        self.last_scan_ms = Some(now_ms);

        let entries = match fs::read_dir(&self.capture_dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!(dir = %self.capture_dir.display(), %err, "capture directory unreadable");
                return;
            }
        };

        let mut fresh: HashMap<String, CaptureRecord> = HashMap::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
            if !name.ends_with(".pcap") {
                continue;
            }
            let Some(bssid) = extract_bssid_from_filename(name) else { continue };
            let quality = classify_file(&path);
            fresh
                .entry(bssid)
                .and_modify(|existing| {
                    if quality > existing.quality {
                        existing.quality = quality;
                        existing.path = path.clone();
                    }
                })
                .or_insert(CaptureRecord { path, quality });
        }
        self.by_bssid = fresh;
    }

    /// Best known handshake quality for `bssid`, refreshing the cache first
    /// if it has expired.
    pub fn get_handshake_quality(&mut self, bssid: &str, now_ms: i64) -> Quality {
        self.refresh(now_ms);
        self.by_bssid.get(bssid).map(|r| r.quality).unwrap_or(Quality::None)
    }

    pub fn has_full_handshake(&mut self, bssid: &str, now_ms: i64) -> bool {
        self.get_handshake_quality(bssid, now_ms) == Quality::Full
    }

    pub fn record_for(&self, bssid: &str) -> Option<&CaptureRecord> {
        self.by_bssid.get(bssid)
    }

    pub fn cache_age(&self, now_ms: i64) -> Option<Duration> {
        self.last_scan_ms.map(|last| Duration::from_millis((now_ms - last).max(0) as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn tempdir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("nightjar-capture-test-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_directory_yields_none_without_panicking() {
        let mut classifier = Classifier::new("/nonexistent/path/that/does/not/exist");
        assert_eq!(classifier.get_handshake_quality("aa:bb:cc:dd:ee:ff", 0), Quality::None);
    }

    #[test]
    fn unparseable_file_bytes_classify_as_none() {
        let dir = tempdir();
        let path = dir.join("Home_aabbccddeeff.pcap");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(b"not a pcap file").unwrap();

        let mut classifier = Classifier::new(&dir);
        assert_eq!(classifier.get_handshake_quality("aa:bb:cc:dd:ee:ff", 0), Quality::None);
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn cache_does_not_rescan_before_ttl_expires() {
        let dir = tempdir();
        let mut classifier = Classifier::new(&dir);
        classifier.refresh(0);
        assert!(!classifier.is_stale(SCAN_TTL_MS - 1));
        assert!(classifier.is_stale(SCAN_TTL_MS));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn quality_ordering_places_full_above_pmkid_above_partial_above_none() {
        assert!(Quality::Full > Quality::Pmkid);
        assert!(Quality::Pmkid > Quality::Partial);
        assert!(Quality::Partial > Quality::None);
    }

    fn pcap_with_single_m2_frame() -> Vec<u8> {
        const SNAP_HEADER: [u8; 8] = [0xAA, 0xAA, 0x03, 0x00, 0x00, 0x00, 0x88, 0x8E];
        const EAPOL_KEY_TYPE: u8 = 3;
        const KEY_INFO_MIC: u16 = 0x0100;
        const KEY_DESCRIPTOR_FIXED_LEN: usize = 1 + 2 + 2 + 8 + 32 + 16 + 8 + 8 + 16 + 2;

        let mut dot11 = Vec::new();
        dot11.push(0x08); // data frame, non-qos
        dot11.push(0x02);
        dot11.extend_from_slice(&[0_u8; 2]);
        dot11.extend_from_slice(&[0x11; 6]);
        dot11.extend_from_slice(&[0x22; 6]);
        dot11.extend_from_slice(&[0x33; 6]);
        dot11.extend_from_slice(&[0_u8; 2]);

        let mut frame = Vec::new();
        frame.extend_from_slice(&[0, 0, 8, 0, 0, 0, 0, 0]); // radiotap
        frame.extend_from_slice(&dot11);
        frame.extend_from_slice(&SNAP_HEADER);
        frame.push(2); // eapol version
        frame.push(EAPOL_KEY_TYPE);
        frame.extend_from_slice(&(KEY_DESCRIPTOR_FIXED_LEN as u16).to_be_bytes());
        frame.push(2); // descriptor type RSN
        frame.extend_from_slice(&KEY_INFO_MIC.to_be_bytes()); // M2: mic set, ack clear
        frame.extend_from_slice(&0_u16.to_be_bytes()); // key length
        frame.extend_from_slice(&5_u64.to_be_bytes()); // replay counter
        frame.extend_from_slice(&[0xBB; 32]); // nonce
        frame.extend_from_slice(&[0_u8; 16]); // iv
        frame.extend_from_slice(&[0_u8; 8]); // rsc
        frame.extend_from_slice(&[0_u8; 8]); // reserved
        frame.extend_from_slice(&[0_u8; 16]); // mic
        frame.extend_from_slice(&0_u16.to_be_bytes()); // key data len

        let mut file = Vec::new();
        file.extend_from_slice(&0xa1b2c3d4_u32.to_le_bytes());
        file.extend_from_slice(&2_u16.to_le_bytes());
        file.extend_from_slice(&4_u16.to_le_bytes());
        file.extend_from_slice(&0_i32.to_le_bytes());
        file.extend_from_slice(&0_u32.to_le_bytes());
        file.extend_from_slice(&262_144_u32.to_le_bytes());
        file.extend_from_slice(&105_u32.to_le_bytes());

        file.extend_from_slice(&1000_u32.to_le_bytes());
        file.extend_from_slice(&0_u32.to_le_bytes());
        file.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        file.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        file.extend_from_slice(&frame);
        file
    }

    #[test]
    fn m2_only_capture_without_m1_still_classifies_as_partial() {
        let dir = tempdir();
        let path = dir.join("Home_aabbccddeeff.pcap");
        fs::write(&path, pcap_with_single_m2_frame()).unwrap();

        assert_eq!(classify_file(&path), Quality::Partial);
        fs::remove_dir_all(&dir).unwrap();
    }
}
