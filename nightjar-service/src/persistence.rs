/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! TSBR bandit-state persistence (§6): a small binary format saved every 10
//! epochs so a restart resumes with learned posteriors instead of neutral
//! priors. Any read failure is treated as "no prior state" per the §7 error
//! taxonomy ("bandit persistence errors discard and restart with neutral
//! priors") rather than propagated to the caller.

use std::io::{Read, Write};
use std::path::Path;

use thiserror::Error;

use nightjar_core::bandit::mode::{Mode, ModeBandit, ALL_MODES};
use nightjar_core::entity::{Entity, Status};
use nightjar_core::Registry;

const MAGIC: &[u8; 4] = b"TSBR";
const VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("bad magic")]
    BadMagic,
    #[error("unsupported version {0}")]
    UnsupportedVersion(u32),
    #[error("truncated record")]
    Truncated,
}

/// Everything saved alongside the bandit arms: running totals surfaced by
/// `status`, unrelated to any one bandit's posterior.
#[derive(Clone, Copy, Debug, Default)]
pub struct Totals {
    pub epoch_num: u64,
    pub total_handshakes: u64,
}

pub fn save(path: &Path, totals: Totals, mode_bandit: &ModeBandit, registry: &Registry) -> Result<(), PersistError> {
    let mut buf: Vec<u8> = Vec::new();
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(&VERSION.to_be_bytes());
    buf.extend_from_slice(&totals.epoch_num.to_be_bytes());
    buf.extend_from_slice(&totals.total_handshakes.to_be_bytes());

    for mode in ALL_MODES {
        let (alpha, beta) = mode_bandit.arm_alpha_beta(mode);
        buf.extend_from_slice(&alpha.to_be_bytes());
        buf.extend_from_slice(&beta.to_be_bytes());
    }

    let entities: Vec<&Entity> = registry.iter().collect();
    buf.extend_from_slice(&(entities.len() as u32).to_be_bytes());
    for e in entities {
        write_entity(&mut buf, e);
    }

    let tmp_path = path.with_extension("tsbr.tmp");
    {
        let mut f = std::fs::File::create(&tmp_path)?;
        f.write_all(&buf)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Load persisted state, or neutral defaults if `path` doesn't exist or is
/// corrupt. Entities that don't fit the registry's capacity are skipped.
pub fn load_or_default(path: &Path) -> (Totals, ModeBandit, Vec<Entity>) {
    match load(path) {
        Ok(loaded) => loaded,
        Err(_) => (Totals::default(), ModeBandit::new(), Vec::new()),
    }
}

fn load(path: &Path) -> Result<(Totals, ModeBandit, Vec<Entity>), PersistError> {
    let mut bytes = Vec::new();
    std::fs::File::open(path)?.read_to_end(&mut bytes)?;
    let mut cur = Cursor::new(&bytes);

    if cur.take_fixed::<4>()? != *MAGIC {
        return Err(PersistError::BadMagic);
    }
    let version = u32::from_be_bytes(cur.take_fixed::<4>()?);
    if version != VERSION {
        return Err(PersistError::UnsupportedVersion(version));
    }

    let epoch_num = u64::from_be_bytes(cur.take_fixed::<8>()?);
    let total_handshakes = u64::from_be_bytes(cur.take_fixed::<8>()?);
    let totals = Totals { epoch_num, total_handshakes };

    let mut mode_bandit = ModeBandit::new();
    for mode in ALL_MODES {
        let alpha = f64::from_be_bytes(cur.take_fixed::<8>()?);
        let beta = f64::from_be_bytes(cur.take_fixed::<8>()?);
        mode_bandit.set_arm(mode, alpha, beta);
    }

    let entity_count = u32::from_be_bytes(cur.take_fixed::<4>()?);
    let mut entities = Vec::with_capacity(entity_count as usize);
    for _ in 0..entity_count {
        entities.push(read_entity(&mut cur)?);
    }

    Ok((totals, mode_bandit, entities))
}

fn write_entity(buf: &mut Vec<u8>, e: &Entity) {
    buf.extend_from_slice(&e.mac);
    write_string(buf, &e.soft_identity);
    write_string(buf, &e.ssid);
    write_string(buf, &e.vendor_oui);
    write_string(buf, &e.encryption);
    buf.push(e.channel);
    buf.extend_from_slice(&e.beacon_interval.to_be_bytes());
    buf.extend_from_slice(&e.clients_count.to_be_bytes());
    buf.extend_from_slice(&e.alpha.to_be_bytes());
    buf.extend_from_slice(&e.beta.to_be_bytes());
    for v in e.atk_alpha {
        buf.extend_from_slice(&v.to_be_bytes());
    }
    for v in e.atk_beta {
        buf.extend_from_slice(&v.to_be_bytes());
    }
    buf.extend_from_slice(&e.last_rssi.to_be_bytes());
    buf.extend_from_slice(&e.client_boost.to_be_bytes());
    buf.push(status_to_byte(e.status));
    buf.extend_from_slice(&e.first_seen.to_be_bytes());
    buf.extend_from_slice(&e.last_seen.to_be_bytes());
    buf.extend_from_slice(&e.last_attacked.to_be_bytes());
}

fn read_entity(cur: &mut Cursor) -> Result<Entity, PersistError> {
    let mac = cur.take_fixed::<6>()?;
    let mut e = Entity::new(mac, 0);
    e.soft_identity = read_string(cur)?;
    e.ssid = read_string(cur)?;
    e.vendor_oui = read_string(cur)?;
    e.encryption = read_string(cur)?;
    e.channel = cur.take_u8()?;
    e.beacon_interval = u16::from_be_bytes(cur.take_fixed::<2>()?);
    e.clients_count = u32::from_be_bytes(cur.take_fixed::<4>()?);
    e.alpha = f64::from_be_bytes(cur.take_fixed::<8>()?);
    e.beta = f64::from_be_bytes(cur.take_fixed::<8>()?);
    for v in e.atk_alpha.iter_mut() {
        *v = f64::from_be_bytes(cur.take_fixed::<8>()?);
    }
    for v in e.atk_beta.iter_mut() {
        *v = f64::from_be_bytes(cur.take_fixed::<8>()?);
    }
    e.last_rssi = f64::from_be_bytes(cur.take_fixed::<8>()?);
    e.client_boost = f64::from_be_bytes(cur.take_fixed::<8>()?);
    e.status = byte_to_status(cur.take_u8()?);
    e.first_seen = i64::from_be_bytes(cur.take_fixed::<8>()?);
    e.last_seen = i64::from_be_bytes(cur.take_fixed::<8>()?);
    e.last_attacked = i64::from_be_bytes(cur.take_fixed::<8>()?);
    Ok(e)
}

fn write_string(buf: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    buf.extend_from_slice(&(bytes.len() as u16).to_be_bytes());
    buf.extend_from_slice(bytes);
}

fn read_string(cur: &mut Cursor) -> Result<String, PersistError> {
    let len = u16::from_be_bytes(cur.take_fixed::<2>()?) as usize;
    let bytes = cur.take(len)?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
}

fn status_to_byte(s: Status) -> u8 {
    match s {
        Status::Active => 0,
        Status::Stale => 1,
        Status::Archived => 2,
        Status::Flagged => 3,
        Status::Evicted => 4,
    }
}

fn byte_to_status(b: u8) -> Status {
    match b {
        1 => Status::Stale,
        2 => Status::Archived,
        3 => Status::Flagged,
        4 => Status::Evicted,
        _ => Status::Active,
    }
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take_fixed<const S: usize>(&mut self) -> Result<[u8; S], PersistError> {
        let slice = self.take(S)?;
        let mut out = [0u8; S];
        out.copy_from_slice(slice);
        Ok(out)
    }

    fn take_u8(&mut self) -> Result<u8, PersistError> {
        Ok(self.take(1)?[0])
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], PersistError> {
        if self.pos + n > self.bytes.len() {
            return Err(PersistError::Truncated);
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

/// Restore persisted entities into a fresh registry, silently skipping any
/// that no longer fit (registry may be smaller across versions).
pub fn restore_entities(registry: &mut Registry, entities: Vec<Entity>) {
    for e in entities {
        let _ = registry.insert_loaded(e);
    }
}
