// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-plan definitions and damage tracking for GPU composition.
//!
//! This crate turns a committed frame of [`scanout_core`] overlay layers into
//! the work a GPU compositor has to do. It defines:
//!
//! - [`RenderItem`] — a single draw command in the render plan
//! - [`RenderPlan`] — the GPU-composited layers of one frame, back to front
//! - [`DamageRegion`] — the part of the output that must be redrawn

#![cfg_attr(docsrs, feature(doc_cfg))]

mod damage;
mod plan;

pub use damage::DamageRegion;
pub use plan::{ItemContent, RenderItem, RenderPlan};

#[cfg(test)]
mod testing;
