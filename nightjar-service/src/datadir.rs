/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Data directory layout: the config file, the bandit-state file, and the
//! crack-state log all live under one base path, created on first run.

use std::path::{Path, PathBuf};

use tokio::sync::{RwLock, RwLockReadGuard};

use nightjar_core::Config;

const CONFIG_FILENAME: &str = "local.conf";
const BANDIT_STATE_FILENAME: &str = "bandits.tsbr";
const CRACK_STATE_FILENAME: &str = "crack.state";

/// Abstraction around nightjar's home data directory, modeled on the
/// pattern ZeroTier's system service uses for its own `local.conf`.
pub struct DataDir {
    pub base_path: PathBuf,
    config: RwLock<Config>,
}

impl DataDir {
    pub async fn open<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        if !base_path.is_dir() {
            let _ = std::fs::create_dir_all(&base_path);
            if !base_path.is_dir() {
                return Err(std::io::Error::new(std::io::ErrorKind::NotFound, "base path not found and cannot be created"));
            }
        }

        let config_path = base_path.join(CONFIG_FILENAME);
        let config = match tokio::fs::read_to_string(&config_path).await {
            Ok(text) => toml::from_str::<Config>(&text)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e),
        };

        Ok(Self { base_path, config: RwLock::new(config) })
    }

    pub fn bandit_state_path(&self) -> PathBuf {
        self.base_path.join(BANDIT_STATE_FILENAME)
    }

    pub fn crack_state_path(&self) -> PathBuf {
        self.base_path.join(CRACK_STATE_FILENAME)
    }

    /// Get a readable locked reference to the loaded configuration. Clone it
    /// to modify, then persist the copy with `save_config`.
    pub async fn config(&self) -> RwLockReadGuard<'_, Config> {
        self.config.read().await
    }

    /// Persist `modified_config`, rewriting the file only if it actually
    /// changed from the copy already held in memory.
    pub async fn save_config(&self, modified_config: Config) -> std::io::Result<()> {
        let mut config = self.config.write().await;
        let current = toml::to_string_pretty(&*config).unwrap_or_default();
        let next = toml::to_string_pretty(&modified_config).unwrap_or_default();
        if current != next {
            tokio::fs::write(self.base_path.join(CONFIG_FILENAME), next.as_bytes()).await?;
            *config = modified_config;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_creates_missing_directory_with_default_config() {
        let dir = tempdir();
        let data_dir = DataDir::open(dir.path()).await.unwrap();
        assert_eq!(data_dir.config().await.min_recon_time, 2.0);
    }

    #[tokio::test]
    async fn save_config_only_rewrites_when_changed() {
        let dir = tempdir();
        let data_dir = DataDir::open(dir.path()).await.unwrap();
        let unchanged = data_dir.config().await.clone();
        data_dir.save_config(unchanged).await.unwrap();
        assert!(!dir.path().join(CONFIG_FILENAME).exists());

        let mut changed = data_dir.config().await.clone();
        changed.min_rssi = -55;
        data_dir.save_config(changed).await.unwrap();
        assert!(dir.path().join(CONFIG_FILENAME).exists());
        assert_eq!(data_dir.config().await.min_rssi, -55);
    }

    #[tokio::test]
    async fn existing_toml_config_overrides_defaults() {
        let dir = tempdir();
        std::fs::write(dir.path().join(CONFIG_FILENAME), "min_rssi = -90\n").unwrap();
        let data_dir = DataDir::open(dir.path()).await.unwrap();
        assert_eq!(data_dir.config().await.min_rssi, -90);
    }

    fn tempdir() -> TempDir {
        TempDir::new()
    }

    struct TempDir(PathBuf);

    impl TempDir {
        fn new() -> Self {
            let mut p = std::env::temp_dir();
            p.push(format!("nightjar-datadir-test-{}-{}", std::process::id(), ADDR.fetch_add(1, std::sync::atomic::Ordering::Relaxed)));
            Self(p)
        }

        fn path(&self) -> &Path {
            &self.0
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    static ADDR: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);
}
