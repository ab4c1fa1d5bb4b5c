/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Advisory, best-effort conversion of captured pcap files to the formats
//! downstream cracking tools expect. Neither conversion is required for
//! correctness elsewhere in this crate: a missing `hcxpcapngtool` binary, or
//! a conversion that exits non-zero, is logged and otherwise ignored (§7 —
//! "a missing external tool degrades a feature, it does not abort the
//! epoch").

use std::path::{Path, PathBuf};

use tokio::process::Command;

#[derive(thiserror::Error, Debug)]
pub enum ConvertError {
    #[error("failed to launch conversion tool: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("conversion tool exited with status {0}")]
    NonZeroExit(std::process::ExitStatus),
}

/// Runs `hcxpcapngtool` to produce an hc22000 hash file suitable for
/// hashcat mode 22000, alongside the pcap it was given.
pub async fn convert_to_hc22000(pcap_path: &Path) -> Result<PathBuf, ConvertError> {
    let out_path = pcap_path.with_extension("hc22000");
    let status = Command::new("hcxpcapngtool")
        .arg("-o")
        .arg(&out_path)
        .arg(pcap_path)
        .status()
        .await
        .map_err(ConvertError::Spawn)?;
    if !status.success() {
        return Err(ConvertError::NonZeroExit(status));
    }
    Ok(out_path)
}

/// Runs `hcxpcapngtool`'s sibling converter to wrap a legacy pcap (with
/// embedded GPS NMEA comments, where present) into pcapng. Advisory only;
/// downstream classification works directly against the original pcap.
pub async fn convert_to_pcapng(pcap_path: &Path) -> Result<PathBuf, ConvertError> {
    let out_path = pcap_path.with_extension("pcapng");
    let status = Command::new("editcap")
        .arg("-F")
        .arg("pcapng")
        .arg(pcap_path)
        .arg(&out_path)
        .status()
        .await
        .map_err(ConvertError::Spawn)?;
    if !status.success() {
        return Err(ConvertError::NonZeroExit(status));
    }
    Ok(out_path)
}

/// Attempts both conversions for `pcap_path`, logging and swallowing any
/// failure. Intended to be fired-and-forgotten from the control loop after a
/// capture is classified as at least [`crate::classifier::Quality::Pmkid`].
pub async fn try_advisory_conversions(pcap_path: &Path) {
    match convert_to_hc22000(pcap_path).await {
        Ok(path) => tracing::debug!(?path, "wrote hc22000 hash file"),
        Err(err) => tracing::debug!(%err, "hc22000 conversion skipped"),
    }
    match convert_to_pcapng(pcap_path).await {
        Ok(path) => tracing::debug!(?path, "wrote pcapng conversion"),
        Err(err) => tracing::debug!(%err, "pcapng conversion skipped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_tool_surfaces_as_spawn_error_not_a_panic() {
        let result = Command::new("nightjar-definitely-not-a-real-binary").status().await;
        assert!(result.is_err());
    }

    #[test]
    fn output_paths_swap_extension_in_place() {
        let pcap = Path::new("/tmp/Home_aabbccddeeff.pcap");
        assert_eq!(pcap.with_extension("hc22000"), Path::new("/tmp/Home_aabbccddeeff.hc22000"));
        assert_eq!(pcap.with_extension("pcapng"), Path::new("/tmp/Home_aabbccddeeff.pcapng"));
    }
}
