// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The client-facing layer descriptor.

use std::collections::VecDeque;

use crate::buffer::NativeHandle;
use crate::fence::Fence;
use crate::geometry::{Rect, crop_height, crop_width};
use crate::transform::Transform;

use super::attributes::{Blending, CompositionType, HdrStaticMetadata, TileConstraint};
use super::state::{ClientCache, ClientState};

/// Damage reported for a layer's content since the last frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SurfaceDamage {
    /// The whole layer changed.
    #[default]
    Full,
    /// Part of the layer changed; bounding rectangle in source-crop
    /// coordinates.
    Partial(Rect),
    /// Nothing changed.
    Unchanged,
}

impl SurfaceDamage {
    /// Interprets a damage region as supplied by a client.
    ///
    /// No rectangles means everything changed. A single empty rectangle means
    /// nothing changed. Otherwise the damage is the region's bounds.
    #[must_use]
    pub fn from_region(region: &[Rect]) -> Self {
        match region {
            [] => Self::Full,
            [r] if r.is_empty() => Self::Unchanged,
            _ => {
                let bounds = Rect::bounds_of(region);
                if bounds.is_empty() {
                    Self::Unchanged
                } else {
                    Self::Partial(bounds)
                }
            }
        }
    }

    /// Folds damage reported later in the same frame into `self`.
    ///
    /// `Unchanged` adds nothing and `Full` absorbs everything else.
    #[must_use]
    pub fn accumulate(self, next: Self) -> Self {
        match (self, next) {
            (Self::Full, _) | (_, Self::Full) => Self::Full,
            (Self::Unchanged, next) => next,
            (prev, Self::Unchanged) => prev,
            (Self::Partial(a), Self::Partial(b)) => Self::Partial(a.union(&b)),
        }
    }
}

/// A surface as described by the client, one per stacking slot.
///
/// The client mutates it between frames; every setter compares against the
/// stored value and only records a change when the value actually differs,
/// so calling a setter twice with the same value never flips a change bit.
/// A real change also clears [`is_validated`](Self::is_validated).
///
/// Change bits are cleared when a presentation pipeline validates the layer
/// at the end of a successful present.
#[derive(Debug)]
pub struct ClientLayer {
    native_handle: Option<NativeHandle>,
    transform: Transform,
    source_crop: kurbo::Rect,
    display_frame: Rect,
    alpha: u8,
    blending: Blending,
    dataspace: u32,
    color_space: u32,
    hdr_metadata: HdrStaticMetadata,
    surface_damage: SurfaceDamage,
    pending_damage: Rect,
    visible_rect: Rect,
    z_order: Option<u32>,
    solid_color: u32,
    composition_type: CompositionType,
    acquire_fence: Option<Fence>,
    release_fence: Option<Fence>,
    constraints: VecDeque<TileConstraint>,
    source_constraints: VecDeque<TileConstraint>,
    total_displays: u32,
    consumed_displays: u32,
    hidden: bool,
    cursor: bool,
    state: ClientState,
    cache: ClientCache,
}

impl Default for ClientLayer {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientLayer {
    /// Creates a layer with no buffer, an empty frame and opaque alpha.
    #[must_use]
    pub fn new() -> Self {
        Self {
            native_handle: None,
            transform: Transform::Identity,
            source_crop: kurbo::Rect::ZERO,
            display_frame: Rect::ZERO,
            alpha: 0xff,
            blending: Blending::None,
            dataspace: 0,
            color_space: 0,
            hdr_metadata: HdrStaticMetadata::default(),
            surface_damage: SurfaceDamage::Full,
            pending_damage: Rect::ZERO,
            visible_rect: Rect::ZERO,
            z_order: None,
            solid_color: 0xff,
            composition_type: CompositionType::Device,
            acquire_fence: None,
            release_fence: None,
            constraints: VecDeque::new(),
            source_constraints: VecDeque::new(),
            total_displays: 1,
            consumed_displays: 0,
            hidden: false,
            cursor: false,
            state: ClientState::default(),
            cache: ClientCache::default(),
        }
    }

    // -- Content --

    /// Attaches a native buffer.
    pub fn set_native_handle(&mut self, handle: NativeHandle) {
        if self.native_handle == Some(handle) {
            return;
        }
        self.native_handle = Some(handle);
        self.state.insert(ClientState::CONTENT_CHANGED);
        self.invalidate();
    }

    /// The attached native buffer.
    #[must_use]
    pub fn native_handle(&self) -> Option<NativeHandle> {
        self.native_handle
    }

    /// Sets the fill colour used with [`CompositionType::SolidColor`].
    pub fn set_solid_color(&mut self, color: u32) {
        if self.solid_color == color {
            return;
        }
        self.solid_color = color;
        self.state.insert(ClientState::CONTENT_CHANGED);
        self.invalidate();
    }

    /// Fill colour.
    #[must_use]
    pub fn solid_color(&self) -> u32 {
        self.solid_color
    }

    /// Requests a composition path.
    pub fn set_composition_type(&mut self, kind: CompositionType) {
        if self.composition_type != kind {
            self.composition_type = kind;
            self.attributes_changed();
        }
    }

    /// Requested composition path.
    #[must_use]
    pub fn composition_type(&self) -> CompositionType {
        self.composition_type
    }

    // -- Geometry --

    /// Sets the sub-pixel region of the buffer to show.
    pub fn set_source_crop(&mut self, crop: kurbo::Rect) {
        if self.source_crop == crop {
            return;
        }
        self.source_crop = crop;
        self.cache.insert(ClientCache::SOURCE_RECT_CHANGED);
        self.attributes_changed();
    }

    /// Source crop.
    #[must_use]
    pub fn source_crop(&self) -> kurbo::Rect {
        self.source_crop
    }

    /// Source crop width in whole pixels.
    #[must_use]
    pub fn source_crop_width(&self) -> u32 {
        crop_width(&self.source_crop)
    }

    /// Source crop height in whole pixels.
    #[must_use]
    pub fn source_crop_height(&self) -> u32 {
        crop_height(&self.source_crop)
    }

    /// Sets where the layer lands on the output, shifted by
    /// `(translate_x, translate_y)` first.
    ///
    /// The translation places a layer within a larger virtual canvas.
    pub fn set_display_frame(&mut self, frame: Rect, translate_x: i32, translate_y: i32) {
        let frame = frame.translate(translate_x, translate_y);
        if self.display_frame == frame {
            return;
        }
        let old = self.display_frame;
        self.add_rendering_damage(old);
        self.add_rendering_damage(frame);
        self.display_frame = frame;
        self.cache.insert(ClientCache::DISPLAY_FRAME_CHANGED);
        self.attributes_changed();
        self.update_visibility();
    }

    /// Display frame.
    #[must_use]
    pub fn display_frame(&self) -> Rect {
        self.display_frame
    }

    /// Display frame width.
    #[must_use]
    pub fn display_frame_width(&self) -> u32 {
        self.display_frame.width()
    }

    /// Display frame height.
    #[must_use]
    pub fn display_frame_height(&self) -> u32 {
        self.display_frame.height()
    }

    /// Sets the buffer transform.
    pub fn set_transform(&mut self, transform: Transform) {
        if self.transform != transform {
            self.transform = transform;
            self.attributes_changed();
        }
    }

    /// Buffer transform.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Sets the plane alpha.
    pub fn set_alpha(&mut self, alpha: u8) {
        if self.alpha != alpha {
            self.alpha = alpha;
            self.attributes_changed();
        }
    }

    /// Plane alpha.
    #[must_use]
    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    /// Sets the blending mode.
    pub fn set_blending(&mut self, blending: Blending) {
        if self.blending != blending {
            self.blending = blending;
            self.attributes_changed();
        }
    }

    /// Blending mode.
    #[must_use]
    pub fn blending(&self) -> Blending {
        self.blending
    }

    /// Sets the dataspace.
    pub fn set_dataspace(&mut self, dataspace: u32) {
        if self.dataspace != dataspace {
            self.dataspace = dataspace;
            self.attributes_changed();
        }
    }

    /// Dataspace.
    #[must_use]
    pub fn dataspace(&self) -> u32 {
        self.dataspace
    }

    /// Sets the colour space.
    pub fn set_color_space(&mut self, color_space: u32) {
        if self.color_space != color_space {
            self.color_space = color_space;
            self.attributes_changed();
        }
    }

    /// Colour space.
    #[must_use]
    pub fn color_space(&self) -> u32 {
        self.color_space
    }

    /// Replaces the static HDR metadata, keeping the transfer function.
    pub fn set_hdr_metadata(&mut self, metadata: HdrStaticMetadata) {
        let eotf = self.hdr_metadata.eotf;
        self.hdr_metadata = HdrStaticMetadata { eotf, ..metadata };
    }

    /// Sets the HDR transfer function.
    pub fn set_hdr_eotf(&mut self, eotf: u32) {
        self.hdr_metadata.eotf = Some(eotf);
    }

    /// Static HDR metadata.
    #[must_use]
    pub fn hdr_metadata(&self) -> &HdrStaticMetadata {
        &self.hdr_metadata
    }

    /// Sets the stacking order.
    ///
    /// A fresh layer has no z-order, so the first assignment always counts as
    /// a change.
    pub fn set_z_order(&mut self, z_order: u32) {
        if self.z_order == Some(z_order) {
            return;
        }
        self.z_order = Some(z_order);
        self.state.insert(ClientState::ZORDER_CHANGED);
        let frame = self.display_frame;
        self.add_rendering_damage(frame);
        self.invalidate();
    }

    /// Stacking order, `None` until set.
    #[must_use]
    pub fn z_order(&self) -> Option<u32> {
        self.z_order
    }

    /// Hides or shows the layer without touching its geometry.
    pub fn set_hidden(&mut self, hidden: bool) {
        if self.hidden == hidden {
            return;
        }
        self.hidden = hidden;
        let frame = self.display_frame;
        self.add_rendering_damage(frame);
        self.invalidate();
        self.update_visibility();
    }

    /// Marks the layer as a cursor. This is a plane-preference hint only and
    /// cannot be undone.
    pub fn mark_as_cursor_layer(&mut self) {
        self.cursor = true;
    }

    /// Whether the layer was marked as a cursor.
    #[must_use]
    pub fn is_cursor_layer(&self) -> bool {
        self.cursor
    }

    // -- Damage and visibility --

    /// Sets the region of the content that changed since the last frame.
    ///
    /// See [`SurfaceDamage::from_region`] for how the region is read. Damage
    /// not yet consumed by a validation is kept and unioned with the new
    /// region. The surface-damage bit is set only if that moves
    /// [`layer_damage`](Self::layer_damage).
    pub fn set_surface_damage(&mut self, region: &[Rect]) {
        let damage = self
            .surface_damage
            .accumulate(SurfaceDamage::from_region(region));
        if self.surface_damage == damage {
            return;
        }
        let before = self.layer_damage();
        self.surface_damage = damage;
        if self.layer_damage() != before {
            self.state.insert(ClientState::SURFACE_DAMAGE_CHANGED);
        }
        if damage != SurfaceDamage::Unchanged {
            self.state.insert(ClientState::CONTENT_CHANGED);
        }
        self.invalidate();
    }

    /// Damage reported by the client since the last validation.
    #[must_use]
    pub fn surface_damage(&self) -> SurfaceDamage {
        self.surface_damage
    }

    /// Output area this layer dirties in the current frame.
    ///
    /// The surface damage is mapped through the transform in effect *now*, so
    /// a transform set after the damage is still honoured. Geometry changes
    /// since the last frame contribute both the old and the new frame.
    #[must_use]
    pub fn layer_damage(&self) -> Rect {
        let surface = match self.surface_damage {
            SurfaceDamage::Unchanged => Rect::ZERO,
            SurfaceDamage::Full => self.display_frame,
            SurfaceDamage::Partial(damage) => {
                let frame = self.display_frame.to_kurbo();
                let src = if self.source_crop.area() > 0.0 {
                    self.source_crop
                } else {
                    kurbo::Rect::from_origin_size(kurbo::Point::ORIGIN, frame.size())
                };
                let mapped = self
                    .transform
                    .rect_mapping(src, frame)
                    .transform_rect_bbox(damage.to_kurbo());
                Rect::from_kurbo_expand(mapped).intersect(&self.display_frame)
            }
        };
        surface.union(&self.pending_damage)
    }

    /// Sets the visible region.
    pub fn set_visible_region(&mut self, region: &[Rect]) {
        self.state.insert(ClientState::VISIBLE_REGION_SET);
        let bounds = Rect::bounds_of(region);
        if self.visible_rect == bounds {
            return;
        }
        self.visible_rect = bounds;
        self.state.insert(ClientState::VISIBLE_REGION_CHANGED);
        self.invalidate();
    }

    /// Bounds of the visible region.
    #[must_use]
    pub fn visible_rect(&self) -> Rect {
        self.visible_rect
    }

    // -- Fences --

    /// Hands over the fence guarding the attached buffer.
    pub fn set_acquire_fence(&mut self, fence: Option<Fence>) {
        self.acquire_fence = fence;
    }

    /// Takes the acquire fence; later calls return `None` until a new one is
    /// set.
    pub fn take_acquire_fence(&mut self) -> Option<Fence> {
        self.acquire_fence.take()
    }

    /// Stores the fence signalling that the previous buffer may be reused.
    pub fn set_release_fence(&mut self, fence: Option<Fence>) {
        self.release_fence = fence;
    }

    /// Takes the release fence; later calls return `None` until the next
    /// present.
    pub fn take_release_fence(&mut self) -> Option<Fence> {
        self.release_fence.take()
    }

    // -- Tiling constraints --

    /// Queues the output band for the next display consuming this layer.
    pub fn push_constraint(&mut self, constraint: TileConstraint) {
        self.constraints.push_back(constraint);
    }

    /// Queues the matching source band for the next display.
    pub fn push_source_constraint(&mut self, constraint: TileConstraint) {
        self.source_constraints.push_back(constraint);
    }

    // -- Change queries --

    /// Raw per-frame state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Raw geometry change cache.
    #[must_use]
    pub fn cache(&self) -> ClientCache {
        self.cache
    }

    /// Whether new content was attached since the last frame.
    #[must_use]
    pub fn has_content_changed(&self) -> bool {
        self.state.contains(ClientState::CONTENT_CHANGED)
    }

    /// Whether the surface damage changed since the last frame.
    #[must_use]
    pub fn has_surface_damage_changed(&self) -> bool {
        self.state.contains(ClientState::SURFACE_DAMAGE_CHANGED)
    }

    /// Whether the visible region changed since the last frame.
    #[must_use]
    pub fn has_visible_region_changed(&self) -> bool {
        self.state.contains(ClientState::VISIBLE_REGION_CHANGED)
    }

    /// Whether the z-order changed since the last frame.
    #[must_use]
    pub fn has_z_order_changed(&self) -> bool {
        self.state.contains(ClientState::ZORDER_CHANGED)
    }

    /// Whether any attribute changed since the last frame.
    #[must_use]
    pub fn has_attributes_changed(&self) -> bool {
        self.cache.contains(ClientCache::ATTRIBUTES_CHANGED)
    }

    /// Whether the display frame changed since the last frame.
    #[must_use]
    pub fn has_display_rect_changed(&self) -> bool {
        self.cache.contains(ClientCache::DISPLAY_FRAME_CHANGED)
    }

    /// Whether the source crop changed since the last frame.
    #[must_use]
    pub fn has_source_rect_changed(&self) -> bool {
        self.cache.contains(ClientCache::SOURCE_RECT_CHANGED)
    }

    /// The display frame is non-empty and the layer is not hidden.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.state.contains(ClientState::VISIBLE)
    }

    /// Whether a pipeline has consumed the current values.
    #[must_use]
    pub fn is_validated(&self) -> bool {
        self.state.contains(ClientState::VALIDATED)
    }

    pub(crate) fn pipeline(&mut self) -> PipelineAccess<'_> {
        PipelineAccess { layer: self }
    }

    // -- Internals --

    fn invalidate(&mut self) {
        self.state.remove(ClientState::VALIDATED);
    }

    fn attributes_changed(&mut self) {
        self.cache.insert(ClientCache::ATTRIBUTES_CHANGED);
        let frame = self.display_frame;
        self.add_rendering_damage(frame);
        self.invalidate();
    }

    fn add_rendering_damage(&mut self, rect: Rect) {
        self.pending_damage = self.pending_damage.union(&rect);
    }

    fn update_visibility(&mut self) {
        let visible = !self.display_frame.is_empty() && !self.hidden;
        self.state.set(ClientState::VISIBLE, visible);
    }
}

/// Mutation rights reserved for presentation pipelines.
///
/// Only code inside this crate can obtain one, through
/// `ClientLayer::pipeline`.
pub(crate) struct PipelineAccess<'a> {
    layer: &'a mut ClientLayer,
}

impl PipelineAccess<'_> {
    /// Sets how many displays consume the layer each frame.
    pub(crate) fn set_total_displays(&mut self, total: u32) {
        self.layer.total_displays = total.max(1);
    }

    /// Records that one display consumed the layer.
    ///
    /// Once every display has, the change bits and pending damage are
    /// cleared, the tiling queues emptied and the layer marked validated.
    /// Returns `true` if that happened.
    pub(crate) fn validate(&mut self) -> bool {
        let layer = &mut *self.layer;
        layer.consumed_displays += 1;
        if layer.consumed_displays < layer.total_displays {
            return false;
        }
        layer.consumed_displays = 0;
        layer.state.remove(
            ClientState::CONTENT_CHANGED
                | ClientState::SURFACE_DAMAGE_CHANGED
                | ClientState::VISIBLE_REGION_CHANGED
                | ClientState::ZORDER_CHANGED,
        );
        layer.state.insert(ClientState::VALIDATED);
        layer.cache = ClientCache::empty();
        layer.surface_damage = SurfaceDamage::Unchanged;
        layer.pending_damage = Rect::ZERO;
        layer.constraints.clear();
        layer.source_constraints.clear();
        true
    }

    /// Output band for the display being built.
    ///
    /// Reading a band does not consume it, so a frame that fails to present
    /// sees the same band when it is built again.
    pub(crate) fn constraint(&self) -> Option<TileConstraint> {
        self.layer.constraints.front().copied()
    }

    /// Source band matching [`constraint`](Self::constraint).
    pub(crate) fn source_constraint(&self) -> Option<TileConstraint> {
        self.layer.source_constraints.front().copied()
    }

    /// Moves on to the bands of the next display once a frame is committed.
    ///
    /// Bands are handed out in queue order; the last one stays in place so
    /// every further display sees it too.
    pub(crate) fn advance_constraints(&mut self) {
        pop_keep_last(&mut self.layer.constraints);
        pop_keep_last(&mut self.layer.source_constraints);
    }
}

fn pop_keep_last(queue: &mut VecDeque<TileConstraint>) {
    if queue.len() > 1 {
        queue.pop_front();
    }
}
