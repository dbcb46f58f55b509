// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan: the GPU-composited layers of one frame.

use kurbo::Affine;

use scanout_core::buffer::NativeHandle;
use scanout_core::geometry::Rect;
use scanout_core::layer::{Blending, Composition, OverlayLayer};
use scanout_core::transform::Transform;

use crate::DamageRegion;

/// What a render item draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemContent {
    /// Sample the imported buffer.
    Buffer(NativeHandle),
    /// Fill with an RGBA colour.
    SolidColor([u8; 4]),
}

/// A single draw command in the render plan.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderItem {
    /// Position of the source layer in the presenter's layer list.
    pub layer_index: u32,
    /// Stacking position.
    pub z_order: u32,
    /// What to draw.
    pub content: ItemContent,
    /// Region of the buffer to sample, in buffer pixels.
    pub source_crop: kurbo::Rect,
    /// Destination on the output.
    pub display_frame: Rect,
    /// Maps `source_crop` onto `display_frame`, including the layer transform.
    pub transform: Affine,
    /// Rotation of the whole output, applied after `transform`.
    pub output_transform: Transform,
    /// Plane alpha (0.0–1.0).
    pub opacity: f32,
    /// Blend mode.
    pub blending: Blending,
}

impl RenderItem {
    /// Draw command for `layer`, or `None` if it has nothing to draw.
    #[must_use]
    pub fn from_layer(layer: &OverlayLayer) -> Option<Self> {
        let content = if layer.is_solid_color() {
            ItemContent::SolidColor(layer.solid_color_bytes())
        } else {
            ItemContent::Buffer(layer.buffer()?.handle())
        };
        let source_crop = layer.source_crop();
        let display_frame = layer.display_frame();
        Some(Self {
            layer_index: layer.layer_index(),
            z_order: layer.z_order(),
            content,
            source_crop,
            display_frame,
            transform: layer
                .transform()
                .rect_mapping(source_crop, display_frame.to_kurbo()),
            output_transform: layer.plane_transform(),
            opacity: f32::from(layer.alpha()) / 255.0,
            blending: layer.blending(),
        })
    }
}

/// The GPU work for a single frame on a single output.
///
/// Layers the compositor scanned out directly are absent; their area is
/// left for the display hardware.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderPlan {
    /// Buffer the plan renders into.
    pub output: Option<NativeHandle>,
    /// Draw items in back-to-front order.
    pub items: Vec<RenderItem>,
    /// Part of the output that must be redrawn.
    pub damage: DamageRegion,
}

impl RenderPlan {
    /// Creates an empty render plan for the given output.
    #[must_use]
    pub fn new(output: NativeHandle) -> Self {
        Self {
            output: Some(output),
            items: Vec::new(),
            damage: DamageRegion::Full,
        }
    }

    /// Builds the plan for a committed frame.
    ///
    /// Collects the visible layers whose actual composition is the GPU,
    /// ordered by z-order with ties kept in list order.
    #[must_use]
    pub fn from_layers(output: NativeHandle, layers: &[OverlayLayer]) -> Self {
        let mut items: Vec<_> = layers
            .iter()
            .filter(|layer| layer.is_visible() && layer.actual_composition() == Composition::GPU)
            .filter_map(RenderItem::from_layer)
            .collect();
        items.sort_by_key(|item| item.z_order);
        Self {
            output: Some(output),
            items,
            damage: DamageRegion::from_layers(layers),
        }
    }

    /// Returns `true` if there is nothing to draw and nothing to redraw.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.items.is_empty() && self.damage.is_empty()
    }

    /// Clears the plan for reuse.
    pub fn clear(&mut self) {
        self.items.clear();
        self.damage = DamageRegion::Full;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{GpuOnly, OUTPUT, client, harness};
    use scanout_core::layer::CompositionType;

    #[test]
    fn gpu_layers_become_items_back_to_front() {
        let mut h = harness(GpuOnly::All);
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        let mut b = client(2, Rect::new(50, 50, 150, 150));
        h.present(&mut [&mut a, &mut b]);

        let plan = RenderPlan::from_layers(OUTPUT, h.layers());

        assert_eq!(plan.output, Some(OUTPUT));
        let order: Vec<_> = plan.items.iter().map(|i| i.layer_index).collect();
        assert_eq!(order, [0, 1]);
        assert_eq!(plan.items[0].content, ItemContent::Buffer(NativeHandle(1)));
        assert_eq!(plan.damage, DamageRegion::Full);
    }

    #[test]
    fn scanned_out_and_hidden_layers_are_skipped() {
        let mut h = harness(GpuOnly::None);
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        let mut b = client(2, Rect::new(0, 0, 100, 100));
        let mut c = client(3, Rect::new(0, 0, 100, 100));
        b.set_composition_type(CompositionType::Client);
        c.set_hidden(true);
        h.present(&mut [&mut a, &mut b, &mut c]);

        let plan = RenderPlan::from_layers(OUTPUT, h.layers());

        assert_eq!(plan.items.len(), 1);
        assert_eq!(plan.items[0].layer_index, 1);
    }

    #[test]
    fn solid_color_item() {
        let mut h = harness(GpuOnly::All);
        let mut a = client(1, Rect::new(10, 20, 110, 70));
        a.set_composition_type(CompositionType::SolidColor);
        a.set_solid_color(0x8000_ff00);
        a.set_alpha(0x80);
        h.present(&mut [&mut a]);

        let plan = RenderPlan::from_layers(OUTPUT, h.layers());
        let item = &plan.items[0];

        assert_eq!(
            item.content,
            ItemContent::SolidColor(0x8000_ff00_u32.to_le_bytes())
        );
        assert_eq!(item.source_crop, kurbo::Rect::new(0.0, 0.0, 100.0, 50.0));
        assert!((item.opacity - 128.0 / 255.0).abs() < 1e-6);
        let origin = item.transform * kurbo::Point::ORIGIN;
        assert!((origin.x - 10.0).abs() < 1e-9 && (origin.y - 20.0).abs() < 1e-9);
    }

    #[test]
    fn quiet_frame_is_idle() {
        let mut h = harness(GpuOnly::None);
        let mut a = client(1, Rect::new(0, 0, 100, 100));
        h.present(&mut [&mut a]);
        h.present(&mut [&mut a]);

        let mut plan = RenderPlan::from_layers(OUTPUT, h.layers());
        assert!(plan.is_idle());

        plan.clear();
        assert_eq!(plan.damage, DamageRegion::Full);
        assert!(!plan.is_idle());
        assert_eq!(RenderPlan::new(OUTPUT).output, Some(OUTPUT));
    }
}
