// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Spatial damage tracking for partial re-rendering.

use scanout_core::geometry::Rect;
use scanout_core::layer::{Composition, OverlayLayer};

/// A region of the output that needs re-rendering.
///
/// GPU backends use this to limit the redraw of the output buffer to the
/// areas that changed since the last frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum DamageRegion {
    /// The entire output needs redrawing.
    #[default]
    Full,
    /// Output-space rectangles that need redrawing.
    Rects(Vec<Rect>),
    /// Nothing changed; the previous frame can be reused.
    None,
}

impl DamageRegion {
    /// Computes the damage of a frame from its overlay layers.
    ///
    /// Any layer that needs a partial clear, and any visible GPU layer whose
    /// frame or transform changed, damages the whole output. Otherwise a
    /// visible GPU layer contributes its display frame when it needs
    /// revalidation and its surface damage when only its content changed.
    #[must_use]
    pub fn from_layers(layers: &[OverlayLayer]) -> Self {
        let mut rects = Vec::new();
        for layer in layers {
            if layer.needs_partial_clear() {
                return Self::Full;
            }
            if !layer.is_visible() || layer.actual_composition() != Composition::GPU {
                continue;
            }
            if layer.has_dimensions_changed() {
                return Self::Full;
            }
            let rect = if layer.needs_revalidation() {
                layer.display_frame()
            } else if layer.has_layer_content_changed() {
                layer.surface_damage()
            } else {
                continue;
            };
            if !rect.is_empty() {
                rects.push(rect);
            }
        }
        if rects.is_empty() {
            Self::None
        } else {
            Self::Rects(rects)
        }
    }

    /// Returns `true` if no region needs redrawing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Bounding box of the damage on an output covering `output`.
    #[must_use]
    pub fn bounds(&self, output: Rect) -> Rect {
        match self {
            Self::Full => output,
            Self::Rects(rects) => Rect::bounds_of(rects).intersect(&output),
            Self::None => Rect::ZERO,
        }
    }

    /// Merges another damage region into this one.
    pub fn merge(&mut self, other: &Self) {
        match (&*self, other) {
            (Self::Full, _) | (_, Self::Full) => *self = Self::Full,
            (Self::None, _) => *self = other.clone(),
            (_, Self::None) => {}
            (Self::Rects(a), Self::Rects(b)) => {
                let mut merged = a.clone();
                merged.extend_from_slice(b);
                *self = Self::Rects(merged);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GpuOnly, client, harness};

    #[test]
    fn merge_rules() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(20, 20, 30, 30);

        let mut d = DamageRegion::None;
        d.merge(&DamageRegion::Rects(vec![a]));
        assert_eq!(d, DamageRegion::Rects(vec![a]));

        d.merge(&DamageRegion::Rects(vec![b]));
        assert_eq!(d, DamageRegion::Rects(vec![a, b]));
        assert_eq!(d.bounds(Rect::from_size(100, 100)), Rect::new(0, 0, 30, 30));

        d.merge(&DamageRegion::None);
        assert!(!d.is_empty());

        d.merge(&DamageRegion::Full);
        assert_eq!(d, DamageRegion::Full);
        assert_eq!(d.bounds(Rect::from_size(8, 8)), Rect::from_size(8, 8));
        assert!(DamageRegion::None.bounds(Rect::from_size(8, 8)).is_empty());
    }

    #[test]
    fn first_frame_is_full() {
        let mut h = harness(GpuOnly::All);
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        h.present(&mut [&mut a]);

        assert_eq!(DamageRegion::from_layers(h.layers()), DamageRegion::Full);
    }

    #[test]
    fn unchanged_frame_has_no_damage() {
        let mut h = harness(GpuOnly::All);
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        h.present(&mut [&mut a]);
        h.present(&mut [&mut a]);

        assert!(DamageRegion::from_layers(h.layers()).is_empty());
    }

    #[test]
    fn content_update_damages_surface_rect() {
        let mut h = harness(GpuOnly::All);
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        h.present(&mut [&mut a]);

        a.set_native_handle(scanout_core::buffer::NativeHandle(2));
        a.set_surface_damage(&[Rect::new(10, 10, 20, 20)]);
        h.present(&mut [&mut a]);

        assert_eq!(
            DamageRegion::from_layers(h.layers()),
            DamageRegion::Rects(vec![Rect::new(10, 10, 20, 20)])
        );
    }

    #[test]
    fn alpha_change_damages_display_frame() {
        let mut h = harness(GpuOnly::All);
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        let mut b = client(2, Rect::new(100, 0, 200, 50));
        h.present(&mut [&mut a, &mut b]);

        b.set_alpha(0x80);
        h.present(&mut [&mut a, &mut b]);

        assert_eq!(
            DamageRegion::from_layers(h.layers()),
            DamageRegion::Rects(vec![Rect::new(100, 0, 200, 50)])
        );
    }

    #[test]
    fn scanned_out_layers_do_not_damage() {
        let mut h = harness(GpuOnly::None);
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        h.present(&mut [&mut a]);

        a.set_alpha(0x80);
        h.present(&mut [&mut a]);

        assert!(DamageRegion::from_layers(h.layers()).is_empty());
    }

    #[test]
    fn hiding_a_gpu_layer_clears_the_output() {
        let mut h = harness(GpuOnly::All);
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        h.present(&mut [&mut a]);

        a.set_hidden(true);
        h.present(&mut [&mut a]);

        assert_eq!(DamageRegion::from_layers(h.layers()), DamageRegion::Full);
    }
}
