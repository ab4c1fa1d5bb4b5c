/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Idle cracking subprocess lifecycle (C13, §4.13). The crack manager runs
//! the external dictionary-attack tool as a detached, niced child process
//! and polls it non-blockingly from the control loop; it never blocks the
//! epoch loop on the child's exit.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};

use crate::state::{write_key_file, CrackState, Outcome};
use crate::wordlist::{enumerate_wordlists, expand_variations, WordlistEntry};

/// `nice` value applied to the cracker child so it never starves the epoch
/// loop or the session source for CPU.
const CRACKER_NICE: i32 = 19;

/// Grace period between SIGTERM and SIGKILL when stopping a running attempt.
const STOP_GRACE_MS: u64 = 200;

#[derive(thiserror::Error, Debug)]
pub enum CrackError {
    #[error("failed to spawn cracker child process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("crack state error: {0}")]
    State(#[from] crate::state::StateError),
    #[error("no cracker is currently running")]
    NotRunning,
}

/// One candidate target for the idle cracker: a pcap file paired with the
/// SSID/BSSID extracted from its name.
#[derive(Clone, Debug)]
pub struct CrackTarget {
    pub pcap_path: PathBuf,
    pub basename: String,
    pub ssid: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ManagerState {
    Idle,
    Running,
}

struct ActiveAttempt {
    child: Child,
    target: CrackTarget,
    wordlist: WordlistEntry,
    key_path: PathBuf,
}

/// Outcome of a completed (or still-running) attempt, as reported by
/// [`CrackManager::check`].
#[derive(Debug)]
pub enum CheckResult {
    StillRunning,
    Cracked { target: String, key: String },
    NoKey { target: String },
    NothingRunning,
}

pub struct CrackManager {
    state: CrackState,
    capture_dir: PathBuf,
    wordlist_dir: PathBuf,
    active: Option<ActiveAttempt>,
}

impl CrackManager {
    pub fn new(capture_dir: impl Into<PathBuf>, wordlist_dir: impl Into<PathBuf>, state: CrackState) -> Self {
        Self { state, capture_dir: capture_dir.into(), wordlist_dir: wordlist_dir.into(), active: None }
    }

    pub fn manager_state(&self) -> ManagerState {
        if self.active.is_some() {
            ManagerState::Running
        } else {
            ManagerState::Idle
        }
    }

    pub fn is_cracked(&self, target_basename: &str) -> bool {
        self.state.is_cracked(target_basename)
    }

    /// Pick the next untried `(target, wordlist)` pair, smallest wordlist
    /// first, skipping targets already cracked.
    fn pick_next(&self, targets: &[CrackTarget]) -> Option<(CrackTarget, WordlistEntry)> {
        let wordlists = enumerate_wordlists(&self.wordlist_dir);
        for target in targets {
            if self.state.is_cracked(&target.basename) {
                continue;
            }
            for wordlist in &wordlists {
                let wordlist_key = wordlist.path.to_string_lossy().to_string();
                if !self.state.has_tried(&target.basename, &wordlist_key) {
                    return Some((target.clone(), wordlist.clone()));
                }
            }
        }
        None
    }

    /// Start a new attempt if one isn't already running and an untried
    /// `(target, wordlist)` pair exists. Returns `Ok(false)` (not an error)
    /// when there's simply nothing left to try.
    pub async fn start(&mut self, targets: &[CrackTarget]) -> Result<bool, CrackError> {
        if self.active.is_some() {
            return Ok(false);
        }
        let Some((target, wordlist)) = self.pick_next(targets) else {
            return Ok(false);
        };

        let key_path = self.capture_dir.join(format!("{}.key", target.ssid));
        let child = spawn_cracker(&target.pcap_path, &wordlist.path, &key_path)?;

        tracing::info!(target = %target.basename, wordlist = %wordlist.path.display(), "started crack attempt");
        self.active = Some(ActiveAttempt { child, target, wordlist, key_path });
        Ok(true)
    }

    /// Non-blocking poll for the active attempt's completion. On exit, reads
    /// the key file (if any), records the outcome, and expands a discovered
    /// key into the learned dictionary.
    pub async fn check(&mut self) -> Result<CheckResult, CrackError> {
        let Some(attempt) = self.active.as_mut() else {
            return Ok(CheckResult::NothingRunning);
        };

        let exited = attempt.child.try_wait().map_err(CrackError::Spawn)?;
        if exited.is_none() {
            return Ok(CheckResult::StillRunning);
        }

        let attempt = self.active.take().expect("checked Some above");
        let wordlist_key = attempt.wordlist.path.to_string_lossy().to_string();
        let key = std::fs::read_to_string(&attempt.key_path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        match key {
            Some(key) => {
                self.state.record(&attempt.target.basename, &wordlist_key, Outcome::Cracked, Some(&key))?;
                write_key_file(&self.capture_dir, &attempt.target.ssid, &key)?;
                self.learn(&key);
                tracing::info!(target = %attempt.target.basename, "crack succeeded");
                Ok(CheckResult::Cracked { target: attempt.target.basename, key })
            }
            None => {
                self.state.record(&attempt.target.basename, &wordlist_key, Outcome::NoKey, None)?;
                Ok(CheckResult::NoKey { target: attempt.target.basename })
            }
        }
    }

    /// Expand a freshly cracked key into its mutation family and append
    /// each variant to a `learned.txt` dictionary under the wordlist
    /// directory, for future attempts to draw on.
    fn learn(&self, key: &str) {
        let learned_path = self.wordlist_dir.join("learned.txt");
        let mut body = String::new();
        for variant in expand_variations(key) {
            body.push_str(&variant);
            body.push('\n');
        }
        if let Err(err) = append_to_file(&learned_path, &body) {
            tracing::warn!(%err, "failed to append learned dictionary variants");
        }
    }

    /// Stop the active attempt, if any: SIGTERM, a short grace period, then
    /// SIGKILL if it hasn't exited.
    pub async fn stop(&mut self) -> Result<(), CrackError> {
        let Some(mut attempt) = self.active.take() else {
            return Err(CrackError::NotRunning);
        };

        send_sigterm(&attempt.child);
        tokio::time::sleep(std::time::Duration::from_millis(STOP_GRACE_MS)).await;
        if attempt.child.try_wait().ok().flatten().is_none() {
            let _ = attempt.child.kill().await;
        }
        Ok(())
    }
}

fn append_to_file(path: &Path, body: &str) -> std::io::Result<()> {
    use std::io::Write as _;
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(body.as_bytes())
}

#[cfg(unix)]
fn send_sigterm(child: &Child) {
    if let Some(pid) = child.id() {
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
}

#[cfg(not(unix))]
fn send_sigterm(_child: &Child) {}

#[cfg(unix)]
fn spawn_cracker(pcap_path: &Path, wordlist_path: &Path, key_path: &Path) -> Result<Child, CrackError> {
    let mut command = Command::new("nice");
    command
        .arg("-n")
        .arg(CRACKER_NICE.to_string())
        .arg("aircrack-ng")
        .arg("-w")
        .arg(wordlist_path)
        .arg("-l")
        .arg(key_path)
        .arg(pcap_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    command.spawn().map_err(CrackError::Spawn)
}

#[cfg(not(unix))]
fn spawn_cracker(pcap_path: &Path, wordlist_path: &Path, key_path: &Path) -> Result<Child, CrackError> {
    Command::new("aircrack-ng")
        .arg("-w")
        .arg(wordlist_path)
        .arg("-l")
        .arg(key_path)
        .arg(pcap_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(CrackError::Spawn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tempdir(name: &str) -> PathBuf {
        let mut dir = std::env::temp_dir();
        dir.push(format!("nightjar-crackmgr-test-{}-{name}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn start_with_no_targets_is_a_noop() {
        let capture_dir = tempdir("capture");
        let wordlist_dir = tempdir("wordlists");
        let state_path = capture_dir.join("crack_state.txt");
        let state = CrackState::load(&state_path).unwrap();
        let mut manager = CrackManager::new(&capture_dir, &wordlist_dir, state);

        let started = manager.start(&[]).await.unwrap();
        assert!(!started);
        assert_eq!(manager.manager_state(), ManagerState::Idle);
    }

    #[tokio::test]
    async fn check_with_nothing_running_reports_nothing_running() {
        let capture_dir = tempdir("capture2");
        let wordlist_dir = tempdir("wordlists2");
        let state_path = capture_dir.join("crack_state.txt");
        let state = CrackState::load(&state_path).unwrap();
        let mut manager = CrackManager::new(&capture_dir, &wordlist_dir, state);

        let result = manager.check().await.unwrap();
        assert!(matches!(result, CheckResult::NothingRunning));
    }

    #[tokio::test]
    async fn stop_with_nothing_running_is_an_error() {
        let capture_dir = tempdir("capture3");
        let wordlist_dir = tempdir("wordlists3");
        let state_path = capture_dir.join("crack_state.txt");
        let state = CrackState::load(&state_path).unwrap();
        let mut manager = CrackManager::new(&capture_dir, &wordlist_dir, state);

        let result = manager.stop().await;
        assert!(matches!(result, Err(CrackError::NotRunning)));
    }

    #[test]
    fn pick_next_skips_already_cracked_targets() {
        let capture_dir = tempdir("capture4");
        let wordlist_dir = tempdir("wordlists4");
        fs::write(wordlist_dir.join("small.txt"), "password1\n").unwrap();

        let state_path = capture_dir.join("crack_state.txt");
        let mut state = CrackState::load(&state_path).unwrap();
        state.record("Home_aabbccddeeff", "anything", Outcome::Cracked, Some("password1")).unwrap();

        let manager = CrackManager::new(&capture_dir, &wordlist_dir, state);
        let targets = vec![CrackTarget {
            pcap_path: capture_dir.join("Home_aabbccddeeff.pcap"),
            basename: "Home_aabbccddeeff".to_string(),
            ssid: "Home".to_string(),
        }];
        assert!(manager.pick_next(&targets).is_none());
    }
}
