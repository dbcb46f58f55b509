// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Phase
//! timestamps are printed in microseconds since the sink was created.

use std::io::Write;
use std::time::Instant;

use scanout_core::trace::{
    DamageRect, FrameBeginEvent, FrameCommittedEvent, FrameFailedEvent, ImportFailureEvent,
    LayerBuiltEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    epoch: Instant,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("epoch", &self.epoch)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            epoch: Instant::now(),
        }
    }

    /// Consumes the sink, returning the writer.
    #[must_use]
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn us(&self, t: Instant) -> f64 {
        t.saturating_duration_since(self.epoch).as_secs_f64() * 1e6
    }
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Build => "build",
        PhaseKind::Compose => "compose",
        PhaseKind::Commit => "commit",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[frame] frame={} layers={} plan={:?} constraints={}",
            e.frame_index, e.layer_count, e.plan, e.handle_constraints,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {} at {:.1}µs",
            e.frame_index,
            phase_name(e.phase),
            self.us(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {} at {:.1}µs",
            e.frame_index,
            phase_name(e.phase),
            self.us(e.timestamp),
        );
    }

    fn on_layer_built(&mut self, e: &LayerBuiltEvent) {
        let _ = writeln!(
            self.writer,
            "[layer] frame={} index={} kind={:?} state={:?} supported={:?}",
            e.frame_index, e.layer_index, e.kind, e.state, e.supported,
        );
    }

    fn on_import_failure(&mut self, e: &ImportFailureEvent) {
        let _ = writeln!(
            self.writer,
            "[import:failed] frame={} index={}",
            e.frame_index, e.layer_index,
        );
    }

    fn on_frame_committed(&mut self, e: &FrameCommittedEvent) {
        let retire = if e.has_retire_fence { "fence" } else { "none" };
        let _ = writeln!(
            self.writer,
            "[commit] frame={} layers={} gpu={} display={} released={} retire={retire}",
            e.frame_index, e.layers, e.gpu_layers, e.display_layers, e.released_buffers,
        );
    }

    fn on_frame_failed(&mut self, e: &FrameFailedEvent) {
        let retry = if e.recoverable { "all-gpu" } else { "no" };
        let _ = writeln!(
            self.writer,
            "[failed] frame={} during={:?} retry={retry}",
            e.frame_index, e.during,
        );
    }

    fn on_damage_rects(&mut self, frame_index: u64, rects: &[DamageRect]) {
        let _ = writeln!(
            self.writer,
            "[damage] frame={frame_index} rects={}",
            rects.len(),
        );
    }
}
