/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Filename-embedded BSSID extraction (§4.9, Testable Property 4). Capture
//! files are named `<SSID>_<bssid>.pcap`, where the BSSID segment is either
//! 12 bare hex digits or the dash-separated `AA-BB-CC-DD-EE-FF` form.

use nightjar_crypto::{format_mac, parse_mac};

/// Extract and canonicalize the BSSID embedded in `filename`. Returns a
/// lowercase colon-separated MAC, or `None` if the name doesn't end in
/// `_<bssid>.pcap` in a recognized form.
pub fn extract_bssid_from_filename(filename: &str) -> Option<String> {
    let stem = filename.strip_suffix(".pcap")?;
    let (_, bssid_part) = stem.rsplit_once('_')?;

    if bssid_part.len() == 12 && bssid_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        let colonized: String = bssid_part
            .as_bytes()
            .chunks(2)
            .map(|pair| std::str::from_utf8(pair).unwrap())
            .collect::<Vec<_>>()
            .join(":");
        return parse_mac(&colonized).map(|mac| format_mac(&mac));
    }

    if bssid_part.len() == 17 {
        let dashed_to_colon = bssid_part.replace('-', ":");
        return parse_mac(&dashed_to_colon).map(|mac| format_mac(&mac));
    }

    None
}

/// Split `filename` into its SSID and canonicalized BSSID, for callers that
/// need both halves rather than just the address.
pub fn split_ssid_and_bssid(filename: &str) -> Option<(String, String)> {
    let stem = filename.strip_suffix(".pcap")?;
    let (ssid, _) = stem.rsplit_once('_')?;
    let bssid = extract_bssid_from_filename(filename)?;
    Some((ssid.to_string(), bssid))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twelve_hex_digit_form_gets_colonized() {
        let got = extract_bssid_from_filename("MyNetwork_aabbccddeeff.pcap").unwrap();
        assert_eq!(got, "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn dash_separated_form_is_accepted() {
        let got = extract_bssid_from_filename("MyNetwork_AA-BB-CC-DD-EE-FF.pcap").unwrap();
        assert_eq!(got, "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn ssid_containing_underscores_does_not_confuse_the_parser() {
        let got = extract_bssid_from_filename("my_home_network_aabbccddeeff.pcap").unwrap();
        assert_eq!(got, "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn non_pcap_suffix_is_rejected() {
        assert!(extract_bssid_from_filename("MyNetwork_aabbccddeeff.cap").is_none());
    }

    #[test]
    fn malformed_bssid_segment_is_rejected() {
        assert!(extract_bssid_from_filename("MyNetwork_notamac.pcap").is_none());
        assert!(extract_bssid_from_filename("MyNetwork_aabbccddeefg.pcap").is_none());
    }

    #[test]
    fn round_trip_is_case_insensitive_on_compare() {
        let a = extract_bssid_from_filename("net_AABBCCDDEEFF.pcap").unwrap();
        let b = extract_bssid_from_filename("net_aabbccddeeff.pcap").unwrap();
        assert_eq!(a.to_lowercase(), b.to_lowercase());
    }

    #[test]
    fn split_recovers_both_ssid_and_bssid() {
        let (ssid, bssid) = split_ssid_and_bssid("my_home_network_aabbccddeeff.pcap").unwrap();
        assert_eq!(ssid, "my_home_network");
        assert_eq!(bssid, "aa:bb:cc:dd:ee:ff");
    }
}
