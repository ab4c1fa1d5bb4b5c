/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 *
 * (c) 2024 The Nightjar Authors.
 */

//! Raw 802.11 injection socket (§6): one packet socket bound to the
//! monitor-mode interface, owned as a process-wide singleton by the control
//! loop (§5 "the raw injection socket ... are singletons owned by the
//! loop"). Opening it is one of the two fatal startup failures named in §7.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("failed to open raw injection socket: {0}")]
    Open(std::io::Error),
    #[error("failed to bind raw injection socket to interface {0:?}: {1}")]
    Bind(String, std::io::Error),
    #[error("send failed: {0}")]
    Send(std::io::Error),
}

/// A sink for complete, radiotap-prefixed 802.11 frames. Tests and dry runs
/// use `NullInjector`; production code uses `PacketSocketInjector`.
pub trait RawInjector: Send + Sync {
    fn send(&self, frame: &[u8]) -> Result<(), InjectError>;
}

/// Discards every frame, logging at debug level. Used by `nightjar status`
/// and unit tests that exercise the orchestrator without a live radio.
#[derive(Default)]
pub struct NullInjector {
    pub sent: std::sync::atomic::AtomicU64,
}

impl RawInjector for NullInjector {
    fn send(&self, frame: &[u8]) -> Result<(), InjectError> {
        tracing::debug!(bytes = frame.len(), "null injector dropped frame");
        self.sent.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use super::{InjectError, RawInjector};
    use std::os::unix::io::RawFd;

    /// `AF_PACKET`/`SOCK_RAW` socket bound to a monitor-mode interface by
    /// index, addressing it directly rather than through the kernel's
    /// 802.3 path so radiotap-prefixed frames go out unmodified.
    pub struct PacketSocketInjector {
        fd: RawFd,
        ifindex: libc::c_int,
    }

    // SAFETY: the fd is exclusively owned by this struct and every access
    // goes through `&self` methods that only call thread-safe syscalls.
    unsafe impl Send for PacketSocketInjector {}
    unsafe impl Sync for PacketSocketInjector {}

    impl PacketSocketInjector {
        pub fn bind(interface: &str) -> Result<Self, InjectError> {
            let fd = unsafe { libc::socket(libc::AF_PACKET, libc::SOCK_RAW, (libc::ETH_P_ALL as u16).to_be() as i32) };
            if fd < 0 {
                return Err(InjectError::Open(std::io::Error::last_os_error()));
            }
            let ifindex = unsafe {
                let cstr = std::ffi::CString::new(interface).map_err(|_| InjectError::Bind(interface.to_string(), std::io::Error::new(std::io::ErrorKind::InvalidInput, "interface name contains a NUL byte")))?;
                libc::if_nametoindex(cstr.as_ptr())
            };
            if ifindex == 0 {
                unsafe { libc::close(fd) };
                return Err(InjectError::Bind(interface.to_string(), std::io::Error::last_os_error()));
            }

            let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
            addr.sll_family = libc::AF_PACKET as u16;
            addr.sll_protocol = (libc::ETH_P_ALL as u16).to_be();
            addr.sll_ifindex = ifindex as i32;

            let rc = unsafe { libc::bind(fd, &addr as *const _ as *const libc::sockaddr, std::mem::size_of::<libc::sockaddr_ll>() as u32) };
            if rc < 0 {
                let err = std::io::Error::last_os_error();
                unsafe { libc::close(fd) };
                return Err(InjectError::Bind(interface.to_string(), err));
            }

            Ok(Self { fd, ifindex: ifindex as i32 })
        }
    }

    impl Drop for PacketSocketInjector {
        fn drop(&mut self) {
            unsafe {
                libc::close(self.fd);
            }
        }
    }

    impl RawInjector for PacketSocketInjector {
        fn send(&self, frame: &[u8]) -> Result<(), InjectError> {
            let mut addr: libc::sockaddr_ll = unsafe { std::mem::zeroed() };
            addr.sll_family = libc::AF_PACKET as u16;
            addr.sll_protocol = (libc::ETH_P_ALL as u16).to_be();
            addr.sll_ifindex = self.ifindex;
            let rc = unsafe {
                libc::sendto(
                    self.fd,
                    frame.as_ptr() as *const libc::c_void,
                    frame.len(),
                    0,
                    &addr as *const _ as *const libc::sockaddr,
                    std::mem::size_of::<libc::sockaddr_ll>() as u32,
                )
            };
            if rc < 0 {
                return Err(InjectError::Send(std::io::Error::last_os_error()));
            }
            Ok(())
        }
    }
}

#[cfg(target_os = "linux")]
pub use linux::PacketSocketInjector;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_injector_counts_sends() {
        let inj = NullInjector::default();
        inj.send(&[0u8; 8]).unwrap();
        inj.send(&[0u8; 8]).unwrap();
        assert_eq!(inj.sent.load(std::sync::atomic::Ordering::Relaxed), 2);
    }
}
