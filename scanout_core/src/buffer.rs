// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Imported native buffers and the references layers hold to them.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::fence::Fence;

/// Opaque handle to a client-allocated native buffer.
///
/// Handles are assigned by the buffer allocator; the core only compares them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeHandle(pub u64);

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeHandle({:#x})", self.0)
    }
}

bitflags! {
    /// Allocation usage bits reported by the importer.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// Decoded video content.
        const VIDEO = 1 << 0;
        /// Content must only reach the display through a secure path.
        const PROTECTED = 1 << 1;
        /// Allocated for the cursor plane.
        const CURSOR = 1 << 2;
    }
}

/// Description of an imported buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferInfo {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// DRM fourcc pixel format.
    pub format: u32,
    /// DRM format modifier.
    pub modifier: u64,
    /// Allocation usage.
    pub usage: BufferUsage,
    /// Whether a framebuffer for direct scanout could be created.
    pub scanout: bool,
}

/// A native buffer that has been imported for this display.
///
/// Shared through [`Arc`] between the resource cache and every layer showing
/// it; the last owner releasing its reference ends the import.
#[derive(Debug, PartialEq, Eq)]
pub struct OverlayBuffer {
    handle: NativeHandle,
    info: BufferInfo,
}

impl OverlayBuffer {
    /// Wraps importer output.
    #[must_use]
    pub fn new(handle: NativeHandle, info: BufferInfo) -> Self {
        Self { handle, info }
    }

    /// The native handle this buffer was imported from.
    #[must_use]
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    /// Buffer description.
    #[must_use]
    pub fn info(&self) -> &BufferInfo {
        &self.info
    }

    /// DRM fourcc format.
    #[must_use]
    pub fn format(&self) -> u32 {
        self.info.format
    }

    /// Returns `true` for decoded video buffers.
    #[must_use]
    pub fn is_video(&self) -> bool {
        self.info.usage.contains(BufferUsage::VIDEO)
    }
}

/// A layer's reference to an imported buffer plus the fence guarding it.
///
/// The buffer is shared; the acquire fence is not. Once the presentation
/// backend takes the fence the slot reads as `None` for good.
#[derive(Debug)]
pub struct BufferReference {
    buffer: Arc<OverlayBuffer>,
    acquire_fence: Option<Fence>,
}

impl BufferReference {
    /// Pairs a shared buffer with its acquire fence.
    #[must_use]
    pub fn new(buffer: Arc<OverlayBuffer>, acquire_fence: Option<Fence>) -> Self {
        Self {
            buffer,
            acquire_fence,
        }
    }

    /// The imported buffer.
    #[must_use]
    pub fn buffer(&self) -> &Arc<OverlayBuffer> {
        &self.buffer
    }

    /// Borrows the acquire fence, if it has not been consumed.
    #[must_use]
    pub fn acquire_fence(&self) -> Option<&Fence> {
        self.acquire_fence.as_ref()
    }

    /// Replaces the acquire fence, closing any previous one.
    pub fn set_acquire_fence(&mut self, fence: Option<Fence>) {
        self.acquire_fence = fence;
    }

    /// Moves the acquire fence out, leaving `None`.
    pub fn take_acquire_fence(&mut self) -> Option<Fence> {
        self.acquire_fence.take()
    }
}
