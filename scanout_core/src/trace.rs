// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Instrumentation hooks for the present cycle.
//!
//! This module provides a [`TraceSink`] trait with one method per event the
//! presenter emits while it builds, composes and commits a frame. All method
//! bodies default to no-ops, so implementing only the events you care about
//! is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing. When **on**, each
//! method performs a single `Option` branch before dispatching.
//!
//! Plain log lines go through `tracing` independently of this module.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates [`DamageRect`] events and the
//!   corresponding `TraceSink` method.

use std::time::Instant;

use crate::display::{CompositionPlan, PresentState};
use crate::layer::{Composition, LayerKind, OverlayState};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the present cycle is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Building overlay layers from client layers.
    Build,
    /// Waiting on the compositor.
    Compose,
    /// Writing back verdicts and swapping the in-flight frame.
    Commit,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a present call starts.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Monotonic frame counter of the presenter.
    pub frame_index: u64,
    /// Number of client layers submitted.
    pub layer_count: usize,
    /// Composition plan requested by the caller.
    pub plan: CompositionPlan,
    /// Whether tiling constraints are applied.
    pub handle_constraints: bool,
}

/// Marks the beginning of a present phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// When the phase started.
    pub timestamp: Instant,
}

/// Marks the end of a present phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// When the phase ended.
    pub timestamp: Instant,
}

/// Emitted for every overlay layer built.
#[derive(Clone, Copy, Debug)]
pub struct LayerBuiltEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Stacking position.
    pub layer_index: u32,
    /// Classification.
    pub kind: LayerKind,
    /// Diff against the previous frame.
    pub state: OverlayState,
    /// Compositions the layer allows.
    pub supported: Composition,
}

/// Emitted when a layer's buffer could not be imported.
#[derive(Clone, Copy, Debug)]
pub struct ImportFailureEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Stacking position of the affected layer.
    pub layer_index: u32,
}

/// Emitted after a frame has been committed.
#[derive(Clone, Copy, Debug)]
pub struct FrameCommittedEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Layers in the frame.
    pub layers: usize,
    /// Layers composited by the GPU.
    pub gpu_layers: usize,
    /// Layers scanned out directly.
    pub display_layers: usize,
    /// Imports released because no layer used them any more.
    pub released_buffers: usize,
    /// Whether the compositor returned a retire fence.
    pub has_retire_fence: bool,
}

/// Emitted when a present call fails.
#[derive(Clone, Copy, Debug)]
pub struct FrameFailedEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// The state the presenter was in when it failed.
    pub during: PresentState,
    /// Whether retrying with the all-GPU plan may succeed.
    pub recoverable: bool,
}

/// An output-space damage rectangle.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct DamageRect {
    /// Stacking position of the layer causing the damage.
    pub layer_index: u32,
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the present cycle.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a present call starts.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a present phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a present phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called for every overlay layer built.
    fn on_layer_built(&mut self, e: &LayerBuiltEvent) {
        _ = e;
    }

    /// Called when a layer's buffer import failed.
    fn on_import_failure(&mut self, e: &ImportFailureEvent) {
        _ = e;
    }

    /// Called after a frame was committed.
    fn on_frame_committed(&mut self, e: &FrameCommittedEvent) {
        _ = e;
    }

    /// Called when a present call failed.
    fn on_frame_failed(&mut self, e: &FrameFailedEvent) {
        _ = e;
    }

    /// Called with per-layer damage rectangles (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        _ = (frame_index, rects);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseBeginEvent`] stamped with the current time.
    #[inline]
    pub fn phase_begin(&mut self, frame_index: u64, phase: PhaseKind) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(&PhaseBeginEvent {
                frame_index,
                phase,
                timestamp: Instant::now(),
            });
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (frame_index, phase);
        }
    }

    /// Emits a [`PhaseEndEvent`] stamped with the current time.
    #[inline]
    pub fn phase_end(&mut self, frame_index: u64, phase: PhaseKind) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(&PhaseEndEvent {
                frame_index,
                phase,
                timestamp: Instant::now(),
            });
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = (frame_index, phase);
        }
    }

    /// Emits a [`LayerBuiltEvent`].
    #[inline]
    pub fn layer_built(&mut self, e: &LayerBuiltEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_layer_built(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`ImportFailureEvent`].
    #[inline]
    pub fn import_failure(&mut self, e: &ImportFailureEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_import_failure(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameCommittedEvent`].
    #[inline]
    pub fn frame_committed(&mut self, e: &FrameCommittedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_committed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameFailedEvent`].
    #[inline]
    pub fn frame_failed(&mut self, e: &FrameFailedEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_frame_failed(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits damage rectangles (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        if let Some(s) = &mut self.sink {
            s.on_damage_rects(frame_index, rects);
        }
    }

    /// Returns `true` if events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
