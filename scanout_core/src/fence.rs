// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sync-file fences with move-only ownership.
//!
//! A [`Fence`] owns one file descriptor. Handing a fence to another component
//! moves it; dropping it closes the descriptor. "No fence" is spelled
//! `Option::<Fence>::None` rather than `-1`, so a consumed slot can never be
//! confused with a live descriptor.

use std::fmt;
use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};

use rustix::event::{PollFd, PollFlags, poll};
use rustix::time::Timespec;

/// Errors from fence operations.
#[derive(Debug, thiserror::Error)]
pub enum FenceError {
    /// Duplicating the descriptor failed (usually descriptor exhaustion).
    #[error("failed to duplicate fence: {0}")]
    Duplicate(#[source] io::Error),
    /// Polling the descriptor failed.
    #[error("failed to poll fence: {0}")]
    Poll(#[source] io::Error),
}

/// An owned synchronization fence.
///
/// The fence signals when the producer's work on the associated buffer has
/// completed. The pipeline never waits on fences itself; it only moves them
/// between the client, the compositor and the caller.
pub struct Fence {
    fd: OwnedFd,
}

impl Fence {
    /// Takes ownership of a fence descriptor.
    #[must_use]
    pub fn new(fd: OwnedFd) -> Self {
        Self { fd }
    }

    /// Duplicates the descriptor. Both fences signal together.
    pub fn try_clone(&self) -> Result<Self, FenceError> {
        self.fd
            .try_clone()
            .map(Self::new)
            .map_err(FenceError::Duplicate)
    }

    /// Returns `true` if the fence has already signalled.
    ///
    /// This is a zero-timeout poll and never blocks.
    pub fn is_signaled(&self) -> Result<bool, FenceError> {
        let mut fds = [PollFd::new(&self.fd, PollFlags::IN)];
        let zero = Timespec {
            tv_sec: 0,
            tv_nsec: 0,
        };
        let ready = poll(&mut fds, Some(&zero)).map_err(|e| FenceError::Poll(e.into()))?;
        Ok(ready > 0 && !fds[0].revents().is_empty())
    }
}

impl From<OwnedFd> for Fence {
    fn from(fd: OwnedFd) -> Self {
        Self::new(fd)
    }
}

impl AsFd for Fence {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for Fence {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl fmt::Debug for Fence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fence({})", self.fd.as_raw_fd())
    }
}

/// Raw descriptor number for diagnostics, `-1` for no fence.
#[must_use]
pub fn raw_or_none(fence: Option<&Fence>) -> RawFd {
    fence.map_or(-1, AsRawFd::as_raw_fd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fence_pair;

    #[test]
    fn pending_until_producer_finishes() {
        let (fence, producer) = fence_pair();
        assert!(!fence.is_signaled().unwrap());
        drop(producer);
        assert!(fence.is_signaled().unwrap());
    }

    #[test]
    fn clone_is_a_distinct_descriptor() {
        let (fence, _producer) = fence_pair();
        let dup = fence.try_clone().unwrap();
        assert_ne!(fence.as_raw_fd(), dup.as_raw_fd());
    }

    #[test]
    fn none_reads_as_minus_one() {
        let (fence, _producer) = fence_pair();
        assert_eq!(raw_or_none(None), -1);
        assert_eq!(raw_or_none(Some(&fence)), fence.as_raw_fd());
    }
}
