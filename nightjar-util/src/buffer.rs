/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

use std::io::Write;
use std::mem::size_of;

/// Marker for structures that are safe to place in a `Buffer` and read back
/// by raw pointer cast: plain-old-data, no padding-sensitive invariants, no
/// `Drop` glue.
///
/// # Safety
/// Implementers must be `#[repr(C, packed)]` (or otherwise have a layout with
/// no padding and no niche requirements) so that any bit pattern found at
/// that address is a valid instance.
pub unsafe trait FlatBlob: Sized {}

fn overflow_err() -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "buffer overflow")
}

/// A bounds-checked, fixed-capacity I/O buffer with typed append/read
/// helpers. This is the framing primitive behind every radiotap/802.11/EAPOL
/// builder in `nightjar-frames` and every capture parser cursor in
/// `nightjar-capture`: all mutation goes through `append_*`/`read_*`, so a
/// single bounds check protects the whole frame catalogue.
pub struct Buffer<const L: usize>(usize, [u8; L]);

unsafe impl<const L: usize> FlatBlob for Buffer<L> {}

impl<const L: usize> Default for Buffer<L> {
    #[inline(always)]
    fn default() -> Self {
        Self::new()
    }
}

impl<const L: usize> Buffer<L> {
    pub const CAPACITY: usize = L;

    #[inline(always)]
    pub fn new() -> Self {
        Self(0, [0_u8; L])
    }

    #[inline(always)]
    pub fn from_bytes(b: &[u8]) -> std::io::Result<Self> {
        let l = b.len();
        if l <= L {
            let mut tmp = Self::new();
            tmp.0 = l;
            tmp.1[0..l].copy_from_slice(b);
            Ok(tmp)
        } else {
            Err(overflow_err())
        }
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.1[0..self.0]
    }

    #[inline(always)]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.1[0..self.0]
    }

    #[inline(always)]
    pub fn clear(&mut self) {
        self.1[0..self.0].fill(0);
        self.0 = 0;
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.0
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Reserve `S` bytes and return a mutable reference to them, without
    /// writing anything. Callers fill in the struct fields themselves; used
    /// for header types whose fields are set individually (e.g. radiotap).
    #[inline(always)]
    pub fn append_struct_get_mut<T: FlatBlob>(&mut self) -> std::io::Result<&mut T> {
        let ptr = self.0;
        let end = ptr + size_of::<T>();
        if end <= L {
            self.0 = end;
            Ok(unsafe { &mut *self.1.as_mut_ptr().add(ptr).cast() })
        } else {
            Err(overflow_err())
        }
    }

    pub fn append_bytes(&mut self, buf: &[u8]) -> std::io::Result<()> {
        let ptr = self.0;
        let end = ptr + buf.len();
        if end <= L {
            self.0 = end;
            self.1[ptr..end].copy_from_slice(buf);
            Ok(())
        } else {
            Err(overflow_err())
        }
    }

    pub fn append_bytes_fixed<const S: usize>(&mut self, buf: &[u8; S]) -> std::io::Result<()> {
        self.append_bytes(buf)
    }

    pub fn append_padding(&mut self, b: u8, count: usize) -> std::io::Result<()> {
        let ptr = self.0;
        let end = ptr + count;
        if end <= L {
            self.0 = end;
            self.1[ptr..end].fill(b);
            Ok(())
        } else {
            Err(overflow_err())
        }
    }

    #[inline(always)]
    pub fn append_u8(&mut self, i: u8) -> std::io::Result<()> {
        let ptr = self.0;
        if ptr < L {
            self.0 = ptr + 1;
            self.1[ptr] = i;
            Ok(())
        } else {
            Err(overflow_err())
        }
    }

    /// Append a little-endian u16 (radiotap fields are little-endian).
    #[inline(always)]
    pub fn append_u16_le(&mut self, i: u16) -> std::io::Result<()> {
        self.append_bytes(&i.to_le_bytes())
    }

    /// Append a big-endian u16 (802.11/EAPOL fields are big-endian).
    #[inline(always)]
    pub fn append_u16_be(&mut self, i: u16) -> std::io::Result<()> {
        self.append_bytes(&i.to_be_bytes())
    }

    #[inline(always)]
    pub fn append_u32_le(&mut self, i: u32) -> std::io::Result<()> {
        self.append_bytes(&i.to_le_bytes())
    }

    #[inline(always)]
    pub fn append_u64_be(&mut self, i: u64) -> std::io::Result<()> {
        self.append_bytes(&i.to_be_bytes())
    }

    #[inline(always)]
    pub fn u8_at(&self, ptr: usize) -> std::io::Result<u8> {
        if ptr < self.0 {
            Ok(self.1[ptr])
        } else {
            Err(overflow_err())
        }
    }

    #[inline(always)]
    pub fn read_u8(&self, cursor: &mut usize) -> std::io::Result<u8> {
        let ptr = *cursor;
        if ptr < self.0 {
            *cursor = ptr + 1;
            Ok(self.1[ptr])
        } else {
            Err(overflow_err())
        }
    }

    #[inline(always)]
    pub fn read_u16_le(&self, cursor: &mut usize) -> std::io::Result<u16> {
        let b = self.read_bytes_fixed::<2>(cursor)?;
        Ok(u16::from_le_bytes(*b))
    }

    #[inline(always)]
    pub fn read_u16_be(&self, cursor: &mut usize) -> std::io::Result<u16> {
        let b = self.read_bytes_fixed::<2>(cursor)?;
        Ok(u16::from_be_bytes(*b))
    }

    #[inline(always)]
    pub fn read_u64_be(&self, cursor: &mut usize) -> std::io::Result<u64> {
        let b = self.read_bytes_fixed::<8>(cursor)?;
        Ok(u64::from_be_bytes(*b))
    }

    pub fn read_bytes_fixed<const S: usize>(&self, cursor: &mut usize) -> std::io::Result<&[u8; S]> {
        let ptr = *cursor;
        let end = ptr + S;
        if end <= self.0 {
            *cursor = end;
            unsafe { Ok(&*self.1.as_ptr().add(ptr).cast::<[u8; S]>()) }
        } else {
            Err(overflow_err())
        }
    }

    pub fn read_bytes(&self, l: usize, cursor: &mut usize) -> std::io::Result<&[u8]> {
        let ptr = *cursor;
        let end = ptr + l;
        if end <= self.0 {
            *cursor = end;
            Ok(&self.1[ptr..end])
        } else {
            Err(overflow_err())
        }
    }
}

impl<const L: usize> PartialEq for Buffer<L> {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.1[0..self.0].eq(&other.1[0..other.0])
    }
}

impl<const L: usize> Eq for Buffer<L> {}

impl<const L: usize> Write for Buffer<L> {
    #[inline(always)]
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.append_bytes(buf).map(|_| buf.len())
    }

    #[inline(always)]
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<const L: usize> AsRef<[u8]> for Buffer<L> {
    #[inline(always)]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl<const L: usize> AsMut<[u8]> for Buffer<L> {
    #[inline(always)]
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_bytes_mut()
    }
}
