// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer change tracking and composition decisions for display scanout.
//!
//! `scanout_core` sits between a window system's per-layer calls and the
//! plane validator that decides which layers are scanned out directly and
//! which are composited on the GPU. It records what clients change, turns
//! each frame's client layers into overlay layers diffed against the frame
//! in flight, and runs the present cycle.
//!
//! # Architecture
//!
//! ```text
//!   window system ──► ClientLayer setters (change bits, pending damage)
//!                          │
//!                          ▼
//!   FramePresenter::present()
//!       │
//!       ├─► OverlayLayer::from_client_layer()   ◄── previous frame's layer
//!       │        │                              ◄── ResourceManager (imports)
//!       │        ▼
//!       ├─► Compositor::compose() ──► FrameVerdict
//!       │
//!       ▼
//!   commit: verdicts written back, release fences out, clients validated
//! ```
//!
//! **[`layer`]** — [`ClientLayer`](layer::ClientLayer) holds what the window
//! system set and which of it changed since the last validated frame.
//! [`OverlayLayer`](layer::OverlayLayer) is the per-frame snapshot the
//! compositor sees, classified and diffed against its predecessor.
//!
//! **[`display`]** — The [`FramePresenter`](display::FramePresenter) trait and
//! the [`VirtualDisplay`](display::VirtualDisplay) that composites into
//! caller-supplied buffers.
//!
//! **[`compositor`]** — The contract with the plane validator.
//!
//! **[`resource`]** — Buffer import behind [`BufferImporter`](resource::BufferImporter),
//! de-duplicated per native handle.
//!
//! **[`buffer`]** and **[`fence`]** — Imported buffers and owned sync fences.
//!
//! **[`geometry`]** and **[`transform`]** — Integer rectangles and the
//! 90-degree-step transforms layers are shown with.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types for
//! present-cycle instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-layer
//!   damage-rect events.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod buffer;
pub mod compositor;
pub mod config;
pub mod display;
pub mod fence;
pub mod geometry;
pub mod layer;
pub mod resource;
pub mod trace;
pub mod transform;

#[cfg(test)]
mod test_support;
