/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Geo-fence gate (§4.12 step 6): a pure haversine-distance predicate over
//! the current fix and the `Config` fence, plus NMEA sentence ingestion for
//! the GPS helper the control loop polls.

use nightjar_crypto::verify_nmea_checksum;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A single GPS fix, in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fix {
    pub lat: f64,
    pub lon: f64,
}

/// Great-circle distance between two points, in meters.
pub fn distance_m(a: Fix, b: Fix) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

/// True if `fix` sits within `radius_m` of `center`. Attacks proceed only
/// while this holds (§4.12 step 6); outside the fence the loop skips
/// attacks for the epoch but keeps scanning.
pub fn inside_fence(fix: Fix, center: Fix, radius_m: f64) -> bool {
    distance_m(fix, center) <= radius_m
}

/// Parse a `$GPGGA`/`$GPRMC`-style sentence into a fix, rejecting anything
/// whose checksum doesn't verify (Testable Property 5) before it ever
/// reaches the geo-fence gate.
pub fn parse_fix(sentence: &str) -> Option<Fix> {
    let payload = verify_nmea_checksum(sentence)?;
    let fields: Vec<&str> = payload.split(',').collect();

    match fields.first().copied() {
        Some("GPGGA") if fields.len() >= 6 => {
            let lat = parse_coord(fields[2], fields[3])?;
            let lon = parse_coord(fields[4], fields[5])?;
            Some(Fix { lat, lon })
        }
        Some("GPRMC") if fields.len() >= 7 => {
            let lat = parse_coord(fields[3], fields[4])?;
            let lon = parse_coord(fields[5], fields[6])?;
            Some(Fix { lat, lon })
        }
        _ => None,
    }
}

/// `ddmm.mmmm` + hemisphere letter to signed decimal degrees.
fn parse_coord(value: &str, hemisphere: &str) -> Option<f64> {
    if value.is_empty() {
        return None;
    }
    let dot = value.find('.')?;
    let deg_digits = dot.saturating_sub(2);
    let degrees: f64 = value[..deg_digits].parse().ok()?;
    let minutes: f64 = value[deg_digits..].parse().ok()?;
    let magnitude = degrees + minutes / 60.0;
    match hemisphere {
        "S" | "W" => Some(-magnitude),
        "N" | "E" => Some(magnitude),
        _ => None,
    }
}
