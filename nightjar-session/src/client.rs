/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Session-source client (§6): a text command/query protocol to the
//! out-of-process Wi-Fi session daemon that owns the radio's AP/STA tables.
//! The control loop is the sole caller; it holds no locks while awaiting a
//! response (§5 "the session source itself enforces its own internal
//! locking").

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session source I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session source rejected command: {0}")]
    Rejected(String),
    #[error("malformed session source response: {0}")]
    Malformed(String),
    #[error("index out of range")]
    OutOfRange,
}

/// A single AP row from `get_ap(i)`.
#[derive(Clone, Debug, PartialEq)]
pub struct ApInfo {
    pub bssid: [u8; 6],
    pub ssid: String,
    pub encryption: String,
    pub vendor: String,
    pub channel: u8,
    pub rssi: i32,
    pub clients_count: u32,
    pub beacon_interval: u16,
}

/// A single STA row from `get_sta(i)`.
#[derive(Clone, Debug, PartialEq)]
pub struct StaInfo {
    pub mac: [u8; 6],
    pub ap_bssid: [u8; 6],
    pub associated: bool,
}

/// One command/query target for `wifi.deauth`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeauthTarget {
    Broadcast,
    Mac([u8; 6]),
}

/// An event-driven delta returned by `poll`.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    ApUpdated(ApInfo),
    ApGone([u8; 6]),
    StaUpdated(StaInfo),
    StaGone([u8; 6]),
}

/// Stealth level under which TX power is adapted (§4.8).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StealthLevel {
    Passive,
    Medium,
    Aggressive,
}

/// The session-source contract (§6, §9 "treat the session source as a
/// library-level collaborator with a clean lifecycle interface"). Every
/// method is fallible: transient rejections are epoch misses, never panics.
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn recon_on(&self) -> Result<(), SessionError>;
    async fn recon_channel(&self, channels: Option<&[u8]>) -> Result<(), SessionError>;
    async fn deauth(&self, target: DeauthTarget) -> Result<(), SessionError>;
    async fn assoc(&self, mac: [u8; 6]) -> Result<(), SessionError>;
    async fn channel_switch_announce(&self, mac: [u8; 6], channel: u8) -> Result<(), SessionError>;
    async fn set_rssi_min(&self, n: i32) -> Result<(), SessionError>;
    async fn set_tx_power(&self, n: i32) -> Result<(), SessionError>;
    async fn set_ap_ttl(&self, n: u32) -> Result<(), SessionError>;
    async fn set_sta_ttl(&self, n: u32) -> Result<(), SessionError>;
    async fn set_region(&self, region: &str) -> Result<(), SessionError>;

    async fn get_ap_count(&self) -> Result<usize, SessionError>;
    async fn get_ap(&self, index: usize) -> Result<ApInfo, SessionError>;
    async fn get_sta_count(&self) -> Result<usize, SessionError>;
    async fn get_sta(&self, index: usize) -> Result<StaInfo, SessionError>;

    /// Non-blocking poll bounded by `deadline_ms` (§4.12 step 3: "short
    /// non-blocking poll, 100 ms").
    async fn poll(&self, deadline_ms: u64) -> Result<Vec<SessionEvent>, SessionError>;

    /// True roughly every 60 s (§4.12 step 3: "every ~60 s, do a full table
    /// re-sync"); the loop calls this once per iteration and triggers a
    /// full re-sync when it returns true.
    fn needs_sync(&self) -> bool;

    async fn pause(&self) -> Result<(), SessionError> {
        Ok(())
    }
    async fn resume(&self) -> Result<(), SessionError> {
        Ok(())
    }
    async fn close(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

fn format_mac(mac: [u8; 6]) -> String {
    nightjar_crypto::format_mac(&mac)
}

/// Line-oriented `SessionSource` over any duplex byte stream: write a
/// command line, read a single response line. Concrete transport (unix
/// socket, pty, TCP loopback) is the caller's choice.
pub struct TextLineSessionSource<S> {
    stream: tokio::sync::Mutex<BufReader<S>>,
    last_sync_ms: std::sync::atomic::AtomicI64,
}

const SYNC_INTERVAL_MS: i64 = 60_000;

impl<S> TextLineSessionSource<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self { stream: tokio::sync::Mutex::new(BufReader::new(stream)), last_sync_ms: std::sync::atomic::AtomicI64::new(nightjar_util::ms_monotonic()) }
    }

    async fn command(&self, line: &str) -> Result<String, SessionError> {
        let mut guard = self.stream.lock().await;
        guard.get_mut().write_all(line.as_bytes()).await?;
        guard.get_mut().write_all(b"\n").await?;
        guard.get_mut().flush().await?;
        let mut reply = String::new();
        guard.read_line(&mut reply).await?;
        let reply = reply.trim_end().to_string();
        if let Some(rest) = reply.strip_prefix("ERR ") {
            return Err(SessionError::Rejected(rest.to_string()));
        }
        Ok(reply)
    }

    fn parse_ap(line: &str) -> Result<ApInfo, SessionError> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 8 {
            return Err(SessionError::Malformed(line.to_string()));
        }
        let bssid = nightjar_crypto::parse_mac(fields[0]).ok_or_else(|| SessionError::Malformed(line.to_string()))?;
        Ok(ApInfo {
            bssid,
            ssid: fields[1].to_string(),
            encryption: fields[2].to_string(),
            vendor: fields[3].to_string(),
            channel: fields[4].parse().map_err(|_| SessionError::Malformed(line.to_string()))?,
            rssi: fields[5].parse().map_err(|_| SessionError::Malformed(line.to_string()))?,
            clients_count: fields[6].parse().map_err(|_| SessionError::Malformed(line.to_string()))?,
            beacon_interval: fields[7].parse().map_err(|_| SessionError::Malformed(line.to_string()))?,
        })
    }

    fn parse_sta(line: &str) -> Result<StaInfo, SessionError> {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 3 {
            return Err(SessionError::Malformed(line.to_string()));
        }
        let mac = nightjar_crypto::parse_mac(fields[0]).ok_or_else(|| SessionError::Malformed(line.to_string()))?;
        let ap_bssid = nightjar_crypto::parse_mac(fields[1]).ok_or_else(|| SessionError::Malformed(line.to_string()))?;
        Ok(StaInfo { mac, ap_bssid, associated: fields[2] == "1" })
    }
}

#[async_trait]
impl<S> SessionSource for TextLineSessionSource<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send,
{
    async fn recon_on(&self) -> Result<(), SessionError> {
        self.command("wifi.recon on").await.map(|_| ())
    }

    async fn recon_channel(&self, channels: Option<&[u8]>) -> Result<(), SessionError> {
        match channels {
            None => self.command("wifi.recon.channel clear").await.map(|_| ()),
            Some(list) => {
                let joined = list.iter().map(|c| c.to_string()).collect::<Vec<_>>().join(",");
                self.command(&format!("wifi.recon.channel {joined}")).await.map(|_| ())
            }
        }
    }

    async fn deauth(&self, target: DeauthTarget) -> Result<(), SessionError> {
        match target {
            DeauthTarget::Broadcast => self.command("wifi.deauth *").await.map(|_| ()),
            DeauthTarget::Mac(mac) => self.command(&format!("wifi.deauth {}", format_mac(mac))).await.map(|_| ()),
        }
    }

    async fn assoc(&self, mac: [u8; 6]) -> Result<(), SessionError> {
        self.command(&format!("wifi.assoc {}", format_mac(mac))).await.map(|_| ())
    }

    async fn channel_switch_announce(&self, mac: [u8; 6], channel: u8) -> Result<(), SessionError> {
        self.command(&format!("wifi.channel_switch_announce {} {}", format_mac(mac), channel)).await.map(|_| ())
    }

    async fn set_rssi_min(&self, n: i32) -> Result<(), SessionError> {
        self.command(&format!("set wifi.rssi.min {n}")).await.map(|_| ())
    }

    async fn set_tx_power(&self, n: i32) -> Result<(), SessionError> {
        self.command(&format!("set wifi.txpower {n}")).await.map(|_| ())
    }

    async fn set_ap_ttl(&self, n: u32) -> Result<(), SessionError> {
        self.command(&format!("set wifi.ap.ttl {n}")).await.map(|_| ())
    }

    async fn set_sta_ttl(&self, n: u32) -> Result<(), SessionError> {
        self.command(&format!("set wifi.sta.ttl {n}")).await.map(|_| ())
    }

    async fn set_region(&self, region: &str) -> Result<(), SessionError> {
        self.command(&format!("set wifi.region {region}")).await.map(|_| ())
    }

    async fn get_ap_count(&self) -> Result<usize, SessionError> {
        self.command("get_ap_count").await?.trim().parse().map_err(|_| SessionError::Malformed("get_ap_count".into()))
    }

    async fn get_ap(&self, index: usize) -> Result<ApInfo, SessionError> {
        let line = self.command(&format!("get_ap {index}")).await?;
        Self::parse_ap(&line)
    }

    async fn get_sta_count(&self) -> Result<usize, SessionError> {
        self.command("get_sta_count").await?.trim().parse().map_err(|_| SessionError::Malformed("get_sta_count".into()))
    }

    async fn get_sta(&self, index: usize) -> Result<StaInfo, SessionError> {
        let line = self.command(&format!("get_sta {index}")).await?;
        Self::parse_sta(&line)
    }

    async fn poll(&self, deadline_ms: u64) -> Result<Vec<SessionEvent>, SessionError> {
        let reply = tokio::time::timeout(std::time::Duration::from_millis(deadline_ms), self.command("poll")).await;
        let reply = match reply {
            Ok(r) => r?,
            Err(_) => return Ok(Vec::new()),
        };
        if reply.is_empty() {
            return Ok(Vec::new());
        }
        let mut events = Vec::new();
        for record in reply.split(';').filter(|s| !s.is_empty()) {
            let mut parts = record.splitn(2, ' ');
            let kind = parts.next().unwrap_or("");
            let rest = parts.next().unwrap_or("");
            match kind {
                "ap" => events.push(SessionEvent::ApUpdated(Self::parse_ap(rest)?)),
                "ap_gone" => {
                    let mac = nightjar_crypto::parse_mac(rest).ok_or_else(|| SessionError::Malformed(record.to_string()))?;
                    events.push(SessionEvent::ApGone(mac));
                }
                "sta" => events.push(SessionEvent::StaUpdated(Self::parse_sta(rest)?)),
                "sta_gone" => {
                    let mac = nightjar_crypto::parse_mac(rest).ok_or_else(|| SessionError::Malformed(record.to_string()))?;
                    events.push(SessionEvent::StaGone(mac));
                }
                _ => return Err(SessionError::Malformed(record.to_string())),
            }
        }
        Ok(events)
    }

    fn needs_sync(&self) -> bool {
        let now = nightjar_util::ms_monotonic();
        let last = self.last_sync_ms.load(std::sync::atomic::Ordering::Relaxed);
        if now - last >= SYNC_INTERVAL_MS {
            self.last_sync_ms.store(now, std::sync::atomic::Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

/// Interpolate TX power by RSSI for the PASSIVE stealth level (§4.8); at
/// AGGRESSIVE always return `max`, and at MEDIUM the caller should draw
/// uniformly in `[min, max]` instead of calling this function.
pub fn interpolate_tx_power(min: i32, max: i32, rssi: i32) -> i32 {
    let clamped_rssi = rssi.clamp(-90, -30) as f64;
    let t = (clamped_rssi + 90.0) / 60.0;
    let power = min as f64 + t * (max - min) as f64;
    power.round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tx_power_interpolates_between_bounds() {
        assert_eq!(interpolate_tx_power(5, 20, -90), 5);
        assert_eq!(interpolate_tx_power(5, 20, -30), 20);
        let mid = interpolate_tx_power(5, 20, -60);
        assert!(mid > 5 && mid < 20);
    }

    #[test]
    fn tx_power_clamps_out_of_range_rssi() {
        assert_eq!(interpolate_tx_power(5, 20, -120), interpolate_tx_power(5, 20, -90));
        assert_eq!(interpolate_tx_power(5, 20, 0), interpolate_tx_power(5, 20, -30));
    }

    #[test]
    fn parse_ap_reads_all_eight_fields() {
        let line = "aa:bb:cc:dd:ee:ff\tHome\tWPA2\tVendorX\t6\t-55\t3\t100";
        let ap = TextLineSessionSource::<tokio::io::DuplexStream>::parse_ap(line).unwrap();
        assert_eq!(ap.ssid, "Home");
        assert_eq!(ap.channel, 6);
        assert_eq!(ap.rssi, -55);
        assert_eq!(ap.clients_count, 3);
        assert_eq!(ap.beacon_interval, 100);
    }

    #[test]
    fn parse_ap_rejects_legacy_seven_field_line() {
        let line = "aa:bb:cc:dd:ee:ff\tHome\tWPA2\tVendorX\t6\t-55\t100";
        assert!(TextLineSessionSource::<tokio::io::DuplexStream>::parse_ap(line).is_err());
    }
}
