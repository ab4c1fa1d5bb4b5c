/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Engine-wide configuration (§6), deserialized from the on-disk TOML file
//! by `nightjar-service::datadir`. Every field has a default so a partial
//! config file only needs to name the options it overrides.

use serde::{Deserialize, Serialize};

use crate::bandit::ap::NUM_PHASES;

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial scan delay, in seconds, before the first epoch runs.
    pub recon_time: f64,
    pub min_recon_time: f64,
    pub max_recon_time: f64,
    /// Dwell time after an attack fires on a channel, in seconds.
    pub hop_recon_time: f64,

    /// Session-source AP/STA table aging, in seconds.
    pub ap_ttl: u32,
    pub sta_ttl: u32,

    /// Base post-association / post-deauth throttle, in seconds, before the
    /// RSSI multiplier from §4.8 is applied.
    pub throttle_a: f64,
    pub throttle_d: f64,

    pub bored_num_epochs: u32,
    pub sad_num_epochs: u32,
    pub excited_num_epochs: u32,
    pub max_misses_for_recon: u32,
    pub mon_max_blind_epochs: u32,

    #[serde(default = "default_true")]
    pub associate: bool,
    #[serde(default = "default_true")]
    pub deauth: bool,

    pub filter_weak: bool,
    pub min_rssi: i32,

    /// Restricted channel list; empty means "all observed channels".
    pub channels: Vec<u8>,

    pub home_ssid: Option<String>,
    /// Never shipped with a real value; operators must supply this via
    /// their own config file (Design Notes §9).
    pub home_psk: Option<String>,
    pub home_min_rssi: i32,

    pub home2_ssid: Option<String>,
    pub home2_psk: Option<String>,
    pub home2_min_rssi: i32,

    pub mac_rotation_enabled: bool,
    pub mac_rotation_interval: u32,

    pub tx_power_min: i32,
    pub tx_power_max: i32,

    pub geo_fence_enabled: bool,
    pub geo_fence_lat: f64,
    pub geo_fence_lon: f64,
    pub geo_fence_radius_m: f64,

    pub attack_phase_enabled: [bool; NUM_PHASES],

    pub monitor_interface: String,
    pub capture_dir: String,
    pub wordlist_dir: String,

    /// Unix domain socket the session source listens on for the text
    /// command/query protocol (§6).
    pub session_socket_path: String,

    /// Shell script invoked by the firmware-recovery collaborator when the
    /// radio goes blind for `mon_max_blind_epochs` (§4.12 step 4, §9 open
    /// question: "the exact recovery sequence" is left to the operator).
    /// `None` falls back to a no-op recovery that just logs and waits.
    pub firmware_recovery_script: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recon_time: 30.0,
            min_recon_time: 2.0,
            max_recon_time: 10.0,
            hop_recon_time: 1.0,

            ap_ttl: 300,
            sta_ttl: 300,

            throttle_a: 0.4,
            throttle_d: 0.4,

            bored_num_epochs: 15,
            sad_num_epochs: 45,
            excited_num_epochs: 5,
            max_misses_for_recon: 5,
            mon_max_blind_epochs: 50,

            associate: true,
            deauth: true,

            filter_weak: false,
            min_rssi: -200,

            channels: Vec::new(),

            home_ssid: None,
            home_psk: None,
            home_min_rssi: -70,

            home2_ssid: None,
            home2_psk: None,
            home2_min_rssi: -70,

            mac_rotation_enabled: false,
            mac_rotation_interval: 3600,

            tx_power_min: 5,
            tx_power_max: 20,

            geo_fence_enabled: false,
            geo_fence_lat: 0.0,
            geo_fence_lon: 0.0,
            geo_fence_radius_m: 0.0,

            attack_phase_enabled: [true; NUM_PHASES],

            monitor_interface: "wlan0mon".to_string(),
            capture_dir: "/home/pi/handshakes".to_string(),
            wordlist_dir: "/usr/share/dict".to_string(),

            session_socket_path: "/run/nightjar/session.sock".to_string(),

            firmware_recovery_script: None,
        }
    }
}

impl Config {
    /// Clamp a requested channel to 1-165, silently, per the §7 error
    /// taxonomy ("Configuration range errors ... clamp silently").
    pub fn clamp_channel(channel: i32) -> u8 {
        channel.clamp(1, 165) as u8
    }

    /// Clamp a requested TX power into this config's configured range.
    pub fn clamp_tx_power(&self, dbm: i32) -> i32 {
        dbm.clamp(self.tx_power_min, self.tx_power_max)
    }
}
