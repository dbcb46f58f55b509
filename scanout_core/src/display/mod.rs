// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame presentation.
//!
//! A [`FramePresenter`] turns the caller's client layers into a committed
//! frame. Each present call walks through [`PresentState`]:
//!
//! ```text
//!   Idle ──► BuildingFrame ──► AwaitingCompositor ──► Committed ──► Idle
//!                 │                    │
//!                 └────── failure ─────┴──► Idle (previous frame kept)
//! ```
//!
//! - **BuildingFrame** — one [`OverlayLayer`] per client layer, diffed against
//!   the in-flight layer at the same stacking position.
//! - **AwaitingCompositor** — the layers and the output target go to the
//!   [`Compositor`](crate::compositor::Compositor).
//! - **Committed** — verdicts are written back, client layers receive their
//!   release fences and are validated, and the new layers replace the
//!   in-flight ones.
//!
//! A failure in either of the first two states leaves the in-flight frame and
//! every client layer untouched: acquire fences taken during the build and
//! the pending output buffer are handed back so the frame can be presented
//! again.
//!
//! [`OverlayLayer`]: crate::layer::OverlayLayer

mod virtual_display;

pub use virtual_display::VirtualDisplay;

use crate::buffer::NativeHandle;
use crate::compositor::CompositorError;
use crate::fence::{Fence, FenceError};
use crate::layer::{ClientLayer, OverlayLayer};
use crate::resource::ImportError;

/// Kind of display behind a presenter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DisplayType {
    /// An off-screen output rendering into caller-supplied buffers.
    Virtual,
}

/// Attributes queryable per display configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DisplayAttribute {
    /// Width in pixels.
    Width,
    /// Height in pixels.
    Height,
    /// Refresh period in nanoseconds.
    RefreshRate,
    /// Horizontal density.
    DpiX,
    /// Vertical density.
    DpiY,
}

/// How a frame should be composited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CompositionPlan {
    /// Let the compositor pick per layer.
    #[default]
    Preferred,
    /// Composite every layer on the GPU. The fallback after a rejected frame.
    AllGpu,
}

/// Per-call present options.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PresentOptions {
    /// Apply the client layers' tiling constraints.
    pub handle_constraints: bool,
    /// Composition plan.
    pub plan: CompositionPlan,
    /// Number of displays presenting the same client layers this frame.
    pub displays: u32,
}

impl PresentOptions {
    /// Default options: no constraints, preferred plan, a single display.
    pub const DEFAULT: Self = Self {
        handle_constraints: false,
        plan: CompositionPlan::Preferred,
        displays: 1,
    };

    /// The conservative retry after [`PresentError::is_recoverable`].
    #[must_use]
    pub const fn all_gpu(mut self) -> Self {
        self.plan = CompositionPlan::AllGpu;
        self
    }

    /// Enables tiling constraints.
    #[must_use]
    pub const fn with_constraints(mut self) -> Self {
        self.handle_constraints = true;
        self
    }
}

impl Default for PresentOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Stage of a present call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PresentState {
    /// No present in progress.
    #[default]
    Idle,
    /// Building overlay layers.
    BuildingFrame,
    /// Waiting for the compositor's verdict.
    AwaitingCompositor,
    /// Writing back the verdict.
    Committed,
}

/// Errors from a present call.
///
/// Whatever the error, the previously committed frame stays in flight and no
/// client layer was validated or given a release fence.
#[derive(Debug, thiserror::Error)]
pub enum PresentError {
    /// No output buffer was set since the last present.
    #[error("no output buffer set")]
    MissingOutputBuffer,
    /// The output buffer could not be imported.
    #[error("failed to import output buffer")]
    OutputImport(#[source] ImportError),
    /// The compositor rejected the plane assignment.
    #[error("compositor rejected the frame")]
    Rejected,
    /// The compositor failed.
    #[error("composition failed")]
    Compositor(#[source] CompositorError),
    /// The compositor answered for a different number of layers.
    #[error("compositor returned {actual} verdicts for {expected} layers")]
    VerdictMismatch {
        /// Layers submitted.
        expected: usize,
        /// Verdicts returned.
        actual: usize,
    },
    /// Duplicating the retire fence failed.
    #[error(transparent)]
    Fence(#[from] FenceError),
}

impl PresentError {
    /// Returns `true` if presenting again with [`CompositionPlan::AllGpu`] may
    /// succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Rejected)
    }
}

impl From<CompositorError> for PresentError {
    fn from(e: CompositorError) -> Self {
        match e {
            CompositorError::Rejected => Self::Rejected,
            other => Self::Compositor(other),
        }
    }
}

/// Errors from display configuration queries.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration with this id exists.
    #[error("unknown display config {0}")]
    UnknownConfig(u32),
}

/// Presents frames built from client layers on one output.
pub trait FramePresenter {
    /// Presents one frame.
    ///
    /// `layers` are in stacking order. On success the frame is committed and
    /// the retire fence, if the compositor produced one, is returned.
    fn present(
        &mut self,
        layers: &mut [&mut ClientLayer],
        options: PresentOptions,
    ) -> Result<Option<Fence>, PresentError>;

    /// Sets the buffer the next frame is composited into.
    ///
    /// Replaces, and closes the fence of, any output set since the last
    /// present.
    fn set_output_buffer(&mut self, handle: NativeHandle, acquire_fence: Option<Fence>);

    /// The layers of the last committed frame.
    fn in_flight_layers(&self) -> &[OverlayLayer];

    /// Kind of display.
    fn display_type(&self) -> DisplayType;

    /// Output width in pixels.
    fn width(&self) -> u32;

    /// Output height in pixels.
    fn height(&self) -> u32;
}
