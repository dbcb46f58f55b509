// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer data model.
//!
//! Two layer types take part in every frame:
//!
//! - [`ClientLayer`] — the descriptor a client keeps across frames and mutates
//!   through setters. It records which of its own fields changed since the
//!   last frame in [`ClientState`] and [`ClientCache`], and accumulates the
//!   output damage those changes cause.
//! - [`OverlayLayer`] — derived from a client layer for one frame and one
//!   output. It merges the output rotation into the layer transform, clamps
//!   geometry to the output, holds the imported buffer with its acquire fence,
//!   classifies the layer ([`LayerKind`]) and diffs itself against the
//!   previous frame's layer at the same stacking position ([`OverlayState`]).
//!
//! # Change tracking
//!
//! Client change bits are set by setters that actually change a value and
//! cleared when a presentation pipeline validates the layer after a
//! successful present. Overlay state bits are recomputed from scratch on every
//! build; a slot with no predecessor always needs revalidation.

mod attributes;
mod client;
mod overlay;
mod state;

pub use attributes::{Blending, Chromaticity, CompositionType, HdrStaticMetadata, TileConstraint};
pub use client::{ClientLayer, SurfaceDamage};
pub use overlay::{LayerPlacement, OverlayLayer};
pub use state::{ClientCache, ClientState, Composition, LayerKind, OverlayState};
