/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Command-line surface. `run` launches the daemon (the default if no
//! subcommand is given); `status` and `reset-bandits` are one-shot
//! operator commands that read or delete `bandits.tsbr` directly from
//! disk under the data directory — neither talks to a running daemon,
//! so they work whether or not one is up.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

fn default_base_path() -> PathBuf {
    if cfg!(target_os = "linux") {
        PathBuf::from("/var/lib/nightjar")
    } else {
        PathBuf::from("/usr/local/var/nightjar")
    }
}

#[derive(Parser, Debug)]
#[command(name = "nightjar", version, about = "Autonomous Wi-Fi handshake harvester")]
pub struct Cli {
    /// Data directory holding local.conf, bandit state, and crack state.
    #[arg(long, global = true)]
    pub base_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the daemon in the foreground (default).
    Run,
    /// Print the current mood/epoch snapshot as JSON.
    Status,
    /// Reset all bandit posteriors to neutral priors and exit.
    ResetBandits,
}

impl Cli {
    pub fn base_path(&self) -> PathBuf {
        self.base_path.clone().unwrap_or_else(default_base_path)
    }

    pub fn command(&self) -> Command {
        match self.command {
            Some(Command::Run) | None => Command::Run,
            Some(Command::Status) => Command::Status,
            Some(Command::ResetBandits) => Command::ResetBandits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_defaults_to_run() {
        let cli = Cli::parse_from(["nightjar"]);
        assert!(matches!(cli.command(), Command::Run));
    }

    #[test]
    fn status_subcommand_parses() {
        let cli = Cli::parse_from(["nightjar", "status"]);
        assert!(matches!(cli.command(), Command::Status));
    }

    #[test]
    fn base_path_override_is_honored() {
        let cli = Cli::parse_from(["nightjar", "--base-path", "/tmp/nj"]);
        assert_eq!(cli.base_path(), PathBuf::from("/tmp/nj"));
    }
}
