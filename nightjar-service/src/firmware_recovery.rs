/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Firmware recovery collaborator (§4.12 step 4, §7 "persistent blindness").
//! The spec leaves the exact recovery sequence to this collaborator (§9 open
//! question); `ShellScriptRecovery` runs an operator-supplied script and
//! `NullRecovery` is the default, matching the interface-only treatment
//! given to the session source in Design Notes §9.

const MAX_RECOVERY_ATTEMPTS: u32 = 3;

#[async_trait::async_trait]
pub trait FirmwareRecovery: Send + Sync {
    /// Attempt to recover the radio. Returning `Ok(())` does not guarantee
    /// APs are visible again; the control loop simply resets `blind_for` and
    /// retries normally on the next epoch.
    async fn attempt_recovery(&self) -> std::io::Result<()>;
}

/// Does nothing. Used when no recovery script is configured; the loop still
/// escalates to the reboot signal after `MAX_RECOVERY_ATTEMPTS`.
#[derive(Default)]
pub struct NullRecovery;

#[async_trait::async_trait]
impl FirmwareRecovery for NullRecovery {
    async fn attempt_recovery(&self) -> std::io::Result<()> {
        tracing::warn!("no firmware recovery collaborator configured; radio stays blind");
        Ok(())
    }
}

/// Runs an operator-supplied shell script (e.g. `rmmod`/`modprobe` the Wi-Fi
/// chipset driver, or power-cycle a USB hub) as a detached child process.
pub struct ShellScriptRecovery {
    script_path: std::path::PathBuf,
}

impl ShellScriptRecovery {
    pub fn new(script_path: impl Into<std::path::PathBuf>) -> Self {
        Self { script_path: script_path.into() }
    }
}

#[async_trait::async_trait]
impl FirmwareRecovery for ShellScriptRecovery {
    async fn attempt_recovery(&self) -> std::io::Result<()> {
        let status = tokio::process::Command::new("sh").arg(&self.script_path).status().await?;
        if !status.success() {
            tracing::warn!(?status, script = %self.script_path.display(), "firmware recovery script exited non-zero");
        }
        Ok(())
    }
}

/// Tracks consecutive recovery attempts and reports when the loop should
/// escalate to a reboot signal instead of retrying again.
#[derive(Default)]
pub struct RecoveryEscalation {
    attempts: u32,
}

impl RecoveryEscalation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempt(&mut self) -> bool {
        self.attempts += 1;
        self.attempts >= MAX_RECOVERY_ATTEMPTS
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn null_recovery_always_succeeds() {
        let recovery = NullRecovery;
        assert!(recovery.attempt_recovery().await.is_ok());
    }

    #[test]
    fn escalation_trips_after_max_attempts() {
        let mut e = RecoveryEscalation::new();
        assert!(!e.record_attempt());
        assert!(!e.record_attempt());
        assert!(e.record_attempt());
    }

    #[test]
    fn escalation_resets() {
        let mut e = RecoveryEscalation::new();
        e.record_attempt();
        e.record_attempt();
        e.reset();
        assert!(!e.record_attempt());
    }
}
