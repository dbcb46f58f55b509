// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contract with the plane validator and GPU compositor.
//!
//! A [`FramePresenter`](crate::display::FramePresenter) builds the frame's
//! [`OverlayLayer`] list and hands it, together with the [`OutputTarget`], to a
//! [`Compositor`]. The compositor decides per layer whether it is scanned out
//! or composited, does whatever work that needs, and answers with a
//! [`FrameVerdict`].

use std::sync::Arc;

use crate::buffer::OverlayBuffer;
use crate::fence::Fence;
use crate::layer::{Composition, OverlayLayer};

/// Errors reported by a [`Compositor`].
#[derive(Debug, thiserror::Error)]
pub enum CompositorError {
    /// The requested plane assignment cannot be realized. Retrying with
    /// every layer on the GPU is expected to succeed.
    #[error("plane assignment rejected")]
    Rejected,
    /// No free buffers or planes are left.
    #[error("compositor resources exhausted")]
    Exhausted,
    /// The backend failed.
    #[error("compositor backend failed: {0}")]
    Backend(String),
}

/// The buffer a frame is composited into.
#[derive(Debug)]
pub struct OutputTarget {
    /// The imported output buffer.
    pub buffer: Arc<OverlayBuffer>,
    /// Fence guarding the output buffer. A compositor that waits on it takes
    /// it; whatever is left is handed back to the caller if the frame fails.
    pub acquire_fence: Option<Fence>,
}

/// A compositor's answer for one frame.
#[derive(Debug)]
pub struct FrameVerdict {
    /// Chosen composition per layer, in the order the layers were submitted.
    /// Each entry is [`Composition::GPU`] or [`Composition::DISPLAY`].
    pub compositions: Vec<Composition>,
    /// Signals once the frame has been displayed and its buffers may be
    /// reused.
    pub retire_fence: Option<Fence>,
}

/// Plane validation and composition for one output.
pub trait Compositor {
    /// Composites `layers` into `target`.
    ///
    /// Layers come in stacking order. The compositor may take their acquire
    /// fences; it must not keep references to the layers past the call.
    fn compose(
        &mut self,
        layers: &mut [OverlayLayer],
        target: &mut OutputTarget,
    ) -> Result<FrameVerdict, CompositorError>;
}
