/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Append-only crack-state persistence (§4.13, §6). One record per line:
//! `<pcap_basename>|<wordlist_path>|<CRACKED|NOKEY>|<key>`. The file is
//! never rewritten in place; state is rebuilt by replaying it from the top
//! at startup, the same way a write-ahead log is replayed.

use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(thiserror::Error, Debug)]
pub enum StateError {
    #[error("crack state I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Cracked,
    NoKey,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Cracked => "CRACKED",
            Outcome::NoKey => "NOKEY",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "CRACKED" => Some(Outcome::Cracked),
            "NOKEY" => Some(Outcome::NoKey),
            _ => None,
        }
    }
}

/// In-memory view of the crack-state log, rebuilt by replay at startup and
/// kept current by appending new records as attempts complete.
pub struct CrackState {
    path: PathBuf,
    /// `(pcap_basename, wordlist_path)` pairs already attempted.
    tried: HashSet<(String, String)>,
    /// pcap_basename -> discovered key, for targets already cracked.
    cracked_keys: HashMap<String, String>,
}

impl CrackState {
    /// An empty state bound to `path`, with no prior attempts replayed.
    /// `load` falls back to this on its "file not found" path; callers that
    /// hit a *corrupt* state file (§7 "discard and restart with neutral
    /// priors") use this directly instead of propagating the read error.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), tried: HashSet::new(), cracked_keys: HashMap::new() }
    }

    /// Load (or create) the state file at `path`, replaying every record to
    /// rebuild the `tried` and `cracked_keys` tables.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();
        let mut state = Self { path: path.clone(), tried: HashSet::new(), cracked_keys: HashMap::new() };

        let file = match fs::File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(state),
            Err(err) => return Err(err.into()),
        };

        for line in BufReader::new(file).lines() {
            let line = line?;
            state.replay_line(&line);
        }
        Ok(state)
    }

    fn replay_line(&mut self, line: &str) {
        let mut fields = line.splitn(4, '|');
        let (Some(target), Some(wordlist), Some(outcome_str)) = (fields.next(), fields.next(), fields.next()) else {
            tracing::warn!(%line, "skipping malformed crack-state record");
            return;
        };
        let key = fields.next().unwrap_or("");
        let Some(outcome) = Outcome::parse(outcome_str) else {
            tracing::warn!(%line, "skipping crack-state record with unknown outcome");
            return;
        };

        self.tried.insert((target.to_string(), wordlist.to_string()));
        if outcome == Outcome::Cracked && !key.is_empty() {
            self.cracked_keys.insert(target.to_string(), key.to_string());
        }
    }

    pub fn has_tried(&self, target: &str, wordlist: &str) -> bool {
        self.tried.contains(&(target.to_string(), wordlist.to_string()))
    }

    pub fn cracked_key(&self, target: &str) -> Option<&str> {
        self.cracked_keys.get(target).map(String::as_str)
    }

    pub fn is_cracked(&self, target: &str) -> bool {
        self.cracked_keys.contains_key(target)
    }

    /// Append a new `(target, wordlist)` attempt outcome, updating the
    /// in-memory tables and fsyncing the record to disk.
    pub fn record(&mut self, target: &str, wordlist: &str, outcome: Outcome, key: Option<&str>) -> Result<(), StateError> {
        self.tried.insert((target.to_string(), wordlist.to_string()));
        if let (Outcome::Cracked, Some(key)) = (outcome, key) {
            self.cracked_keys.insert(target.to_string(), key.to_string());
        }

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}|{}|{}|{}", target, wordlist, outcome.as_str(), key.unwrap_or(""))?;
        file.sync_data()?;
        Ok(())
    }
}

/// Writes `key` to the per-SSID `.key` companion file next to the capture
/// directory, overwriting any previous content — there is only ever one
/// live key per SSID.
pub fn write_key_file(capture_dir: &Path, ssid: &str, key: &str) -> Result<PathBuf, StateError> {
    let path = capture_dir.join(format!("{ssid}.key"));
    fs::write(&path, format!("{key}\n"))?;
    Ok(path)
}
