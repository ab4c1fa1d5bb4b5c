/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! The engine: every singleton the control loop touches, gathered into one
//! handle (§9 "gather globals into one explicit engine handle owned by the
//! loop, passed by `&mut` rather than scattered through statics").

use std::path::PathBuf;
use std::sync::Arc;

use nightjar_core::bandit::channel::ChannelBandit;
use nightjar_core::bandit::mode::ModeBandit;
use nightjar_core::mood::Mood;
use nightjar_core::throttle::{AttackTracker, Blacklist, InteractionHistory};
use nightjar_core::{Config, Epoch, Registry};
use nightjar_crack::{CrackManager, CrackState};
use nightjar_capture::Classifier;
use nightjar_crypto::Xorshift64;
use nightjar_frames::SequenceCounters;
use nightjar_session::{RawInjector, SessionSource};

use crate::firmware_recovery::{FirmwareRecovery, RecoveryEscalation};
use crate::persistence::Totals;

/// Everything the epoch loop reads or mutates, collected so the control
/// loop's entry point takes one argument instead of a dozen.
pub struct Engine {
    pub config: Config,

    pub session: Arc<dyn SessionSource + Send + Sync>,
    pub injector: Arc<dyn RawInjector + Send + Sync>,
    pub firmware_recovery: Arc<dyn FirmwareRecovery + Send + Sync>,

    pub rng: Xorshift64,
    pub seq: SequenceCounters,

    pub registry: Registry,
    pub channel_bandit: ChannelBandit,
    pub mode_bandit: ModeBandit,
    pub epoch: Epoch,
    pub mood: Mood,

    pub interactions: InteractionHistory,
    pub attack_tracker: AttackTracker,
    pub blacklist: Blacklist,

    pub classifier: Classifier,
    pub crack_manager: CrackManager,

    pub recovery_escalation: RecoveryEscalation,

    pub total_handshakes: u64,
    pub manual_mode: bool,
    pub running: bool,

    capture_dir: PathBuf,
}

impl Engine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        session: Arc<dyn SessionSource + Send + Sync>,
        injector: Arc<dyn RawInjector + Send + Sync>,
        firmware_recovery: Arc<dyn FirmwareRecovery + Send + Sync>,
        crack_state: CrackState,
        totals: Totals,
        mode_bandit: ModeBandit,
        loaded_entities: Vec<nightjar_core::entity::Entity>,
    ) -> Self {
        let capture_dir = PathBuf::from(&config.capture_dir);
        let wordlist_dir = PathBuf::from(&config.wordlist_dir);

        let mut registry = Registry::new();
        crate::persistence::restore_entities(&mut registry, loaded_entities);

        let mut epoch = Epoch::new();
        epoch.epoch_num = totals.epoch_num;

        Self {
            config,
            session,
            injector,
            firmware_recovery,
            rng: Xorshift64::from_entropy(),
            seq: SequenceCounters::new(),
            registry,
            channel_bandit: ChannelBandit::new(),
            mode_bandit,
            epoch,
            mood: Mood::Starting,
            interactions: InteractionHistory::new(),
            attack_tracker: AttackTracker::new(),
            blacklist: Blacklist::new(),
            classifier: Classifier::new(capture_dir.clone()),
            crack_manager: CrackManager::new(capture_dir.clone(), wordlist_dir, crack_state),
            recovery_escalation: RecoveryEscalation::new(),
            total_handshakes: totals.total_handshakes,
            manual_mode: false,
            running: true,
            capture_dir,
        }
    }

    pub fn capture_dir(&self) -> &PathBuf {
        &self.capture_dir
    }

    /// Sum of every `.pcap` file's size under the capture directory,
    /// compared epoch-over-epoch to decide whether the end-of-epoch reward
    /// pass saw new handshake material (§4.12 step 10).
    pub fn total_handshake_bytes(&self) -> u64 {
        let entries = match std::fs::read_dir(&self.capture_dir) {
            Ok(entries) => entries,
            Err(_) => return 0,
        };
        entries
            .flatten()
            .filter(|e| e.path().extension().and_then(|ext| ext.to_str()) == Some("pcap"))
            .filter_map(|e| e.metadata().ok())
            .map(|m| m.len())
            .sum()
    }

    /// A JSON-friendly snapshot for the `status` subcommand and the UI
    /// epoch callback (§4.12 step 8).
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            epoch_num: self.epoch.epoch_num,
            mood: format!("{:?}", self.mood),
            entities_tracked: self.registry.len(),
            total_handshakes: self.total_handshakes,
            blind_for: self.epoch.blind_for,
            inactive_for: self.epoch.inactive_for,
            manual_mode: self.manual_mode,
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct EngineSnapshot {
    pub epoch_num: u64,
    pub mood: String,
    pub entities_tracked: usize,
    pub total_handshakes: u64,
    pub blind_for: u32,
    pub inactive_for: u32,
    pub manual_mode: bool,
}
