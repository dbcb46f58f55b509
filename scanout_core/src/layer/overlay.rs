// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-frame internal layers derived from client layers.

use std::sync::Arc;

use crate::buffer::{BufferReference, BufferUsage, NativeHandle, OverlayBuffer};
use crate::fence::{Fence, FenceError};
use crate::geometry::{Rect, crop_height, crop_width};
use crate::resource::{ImportError, ResourceManager};
use crate::transform::Transform;

use super::attributes::{Blending, CompositionType, HdrStaticMetadata};
use super::client::ClientLayer;
use super::state::{Composition, LayerKind, OverlayState};

/// Where an overlay layer is built: its slot and the output it lands on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerPlacement {
    /// Stacking position on the output.
    pub z_order: u32,
    /// Index of the client layer in the caller's list.
    pub layer_index: u32,
    /// Output width before rotation.
    pub max_width: u32,
    /// Output height before rotation.
    pub max_height: u32,
    /// Rotation of the whole output.
    pub rotation: Transform,
    /// Apply the client's tiling constraints.
    pub handle_constraints: bool,
    /// Restrict the layer to GPU composition.
    pub gpu_only: bool,
}

impl LayerPlacement {
    /// Slot `index` on an unrotated `max_width` x `max_height` output.
    #[must_use]
    pub const fn new(index: u32, max_width: u32, max_height: u32) -> Self {
        Self {
            z_order: index,
            layer_index: index,
            max_width,
            max_height,
            rotation: Transform::Identity,
            handle_constraints: false,
            gpu_only: false,
        }
    }

    /// Sets the output rotation.
    #[must_use]
    pub const fn with_rotation(mut self, rotation: Transform) -> Self {
        self.rotation = rotation;
        self
    }

    /// Enables tiling constraints.
    #[must_use]
    pub const fn with_constraints(mut self, handle_constraints: bool) -> Self {
        self.handle_constraints = handle_constraints;
        self
    }

    /// Restricts the layer to GPU composition.
    #[must_use]
    pub const fn with_gpu_only(mut self, gpu_only: bool) -> Self {
        self.gpu_only = gpu_only;
        self
    }

    /// Output bounds in the client's (unrotated) coordinate space.
    #[must_use]
    pub const fn logical_bounds(&self) -> Rect {
        if self.rotation.swaps_axes() {
            Rect::from_size(self.max_height, self.max_width)
        } else {
            Rect::from_size(self.max_width, self.max_height)
        }
    }
}

/// A layer as the composition stage sees it for one frame.
///
/// Built fresh every frame from a [`ClientLayer`] and, when there is one, the
/// previous frame's layer at the same stacking position. The comparison with
/// that predecessor fills the [`OverlayState`] bits, which tell the plane
/// validator whether the previous decision for this slot still holds.
#[derive(Debug)]
pub struct OverlayLayer {
    transform: Transform,
    plane_transform: Transform,
    merged_transform: Transform,
    z_order: u32,
    layer_index: u32,
    alpha: u8,
    blending: Blending,
    dataspace: u32,
    color_space: u32,
    hdr_metadata: HdrStaticMetadata,
    solid_color: u32,
    source_crop: kurbo::Rect,
    display_frame: Rect,
    surface_damage: Rect,
    state: OverlayState,
    imported: Option<BufferReference>,
    import_failed: bool,
    supported_composition: Composition,
    actual_composition: Composition,
    kind: LayerKind,
}

impl OverlayLayer {
    fn empty(placement: &LayerPlacement) -> Self {
        Self {
            transform: Transform::Identity,
            plane_transform: placement.rotation,
            merged_transform: placement.rotation,
            z_order: placement.z_order,
            layer_index: placement.layer_index,
            alpha: 0xff,
            blending: Blending::None,
            dataspace: 0,
            color_space: 0,
            hdr_metadata: HdrStaticMetadata::default(),
            solid_color: 0,
            source_crop: kurbo::Rect::ZERO,
            display_frame: Rect::ZERO,
            surface_damage: Rect::ZERO,
            state: OverlayState::default(),
            imported: None,
            import_failed: false,
            supported_composition: Composition::ALL,
            actual_composition: Composition::ALL,
            kind: LayerKind::Normal,
        }
    }

    /// Builds the layer for `client` at `placement`.
    ///
    /// The client's buffer is imported through `resources` and its acquire
    /// fence moves into the layer. An import failure does not fail the build:
    /// the layer comes back without a buffer and limited to GPU composition.
    pub fn from_client_layer(
        client: &mut ClientLayer,
        resources: &mut ResourceManager,
        previous: Option<&Self>,
        placement: &LayerPlacement,
    ) -> Self {
        let frame = client.display_frame();
        Self::build(client, resources, previous, frame, placement)
    }

    /// Like [`from_client_layer`](Self::from_client_layer), but placed at
    /// `display_frame` instead of the client's own frame.
    ///
    /// Used when a downstream scaler already decided where the layer lands.
    pub fn from_scaled_client_layer(
        client: &mut ClientLayer,
        resources: &mut ResourceManager,
        previous: Option<&Self>,
        display_frame: Rect,
        placement: &LayerPlacement,
    ) -> Self {
        Self::build(client, resources, previous, display_frame, placement)
    }

    fn build(
        client: &mut ClientLayer,
        resources: &mut ResourceManager,
        previous: Option<&Self>,
        display_frame: Rect,
        placement: &LayerPlacement,
    ) -> Self {
        let mut layer = Self::empty(placement);
        layer.transform = client.transform();
        layer.merged_transform = layer.transform.then(placement.rotation);
        layer.alpha = client.alpha();
        layer.blending = client.blending();
        layer.dataspace = client.dataspace();
        layer.color_space = client.color_space();
        layer.hdr_metadata = *client.hdr_metadata();
        layer.solid_color = client.solid_color();
        layer.source_crop = client.source_crop();
        layer.display_frame = display_frame;
        layer.surface_damage = client.layer_damage();

        layer.clip_to_output(client, placement);
        if !client.is_visible() || layer.display_frame.is_empty() {
            layer.state.insert(OverlayState::INVISIBLE);
        }
        if client.is_cursor_layer() {
            layer.kind = LayerKind::Cursor;
        }

        match client.composition_type() {
            CompositionType::SolidColor => {
                layer.kind = LayerKind::SolidColor;
                layer.source_crop = kurbo::Rect::from_origin_size(
                    kurbo::Point::ORIGIN,
                    layer.display_frame.to_kurbo().size(),
                );
            }
            CompositionType::Device | CompositionType::Client => {
                if layer.is_visible() {
                    layer.import_from(client, resources);
                }
                if layer.imported.is_none() {
                    layer.supported_composition = Composition::GPU;
                }
            }
        }
        if client.composition_type() == CompositionType::Client || placement.gpu_only {
            layer.supported_composition = Composition::GPU;
        }

        layer.validate_previous_frame_state(previous, client);
        tracing::trace!(
            layer = layer.layer_index,
            kind = ?layer.kind,
            state = ?layer.state,
            "built overlay layer"
        );
        layer
    }

    fn clip_to_output(&mut self, client: &mut ClientLayer, placement: &LayerPlacement) {
        let mut bounds = placement.logical_bounds();
        let mut rebase = 0;
        let mut source_band = None;
        if placement.handle_constraints {
            let pipeline = client.pipeline();
            if let Some(band) = pipeline.constraint() {
                bounds = bounds.intersect(&Rect::new(band.left, bounds.top, band.right, bounds.bottom));
                rebase = band.left;
            }
            source_band = pipeline.source_constraint();
        }

        let frame = self.display_frame;
        let clipped = frame.intersect(&bounds);
        if clipped != frame && !clipped.is_empty() && self.source_crop.area() > 0.0 {
            // Pull the crop in by the same share of the frame that was cut.
            let mapping = self.transform.rect_mapping(self.source_crop, frame.to_kurbo());
            if mapping.determinant() != 0.0 {
                self.source_crop = mapping.inverse().transform_rect_bbox(clipped.to_kurbo());
            }
        }
        if let Some(band) = source_band {
            self.source_crop.x0 = self.source_crop.x0.max(f64::from(band.left));
            self.source_crop.x1 = self.source_crop.x1.min(f64::from(band.right));
        }

        self.surface_damage = self.surface_damage.intersect(&clipped);
        self.display_frame = clipped;
        if rebase != 0 && !clipped.is_empty() {
            self.display_frame = clipped.translate(-rebase, 0);
            self.surface_damage = self.surface_damage.translate(-rebase, 0);
        }
    }

    fn import_from(&mut self, client: &mut ClientLayer, resources: &mut ResourceManager) {
        let imported = client
            .native_handle()
            .ok_or(ImportError::MissingHandle)
            .and_then(|handle| resources.import(handle));
        match imported {
            Ok(buffer) => {
                let fence = client.take_acquire_fence();
                self.attach(buffer, fence);
            }
            Err(error) => {
                tracing::warn!(
                    layer = self.layer_index,
                    %error,
                    "buffer import failed, layer limited to GPU composition"
                );
                self.fail_import();
            }
        }
    }

    fn attach(&mut self, buffer: Arc<OverlayBuffer>, acquire_fence: Option<Fence>) {
        let info = *buffer.info();
        self.kind = match self.kind {
            LayerKind::Cursor | LayerKind::SolidColor => self.kind,
            _ if info.usage.contains(BufferUsage::CURSOR) => LayerKind::Cursor,
            _ => LayerKind::Normal
                .with_video(buffer.is_video())
                .with_protected(info.usage.contains(BufferUsage::PROTECTED)),
        };
        self.supported_composition = if info.scanout {
            Composition::ALL
        } else {
            Composition::GPU
        };
        self.import_failed = false;
        self.imported = Some(BufferReference::new(buffer, acquire_fence));
    }

    fn fail_import(&mut self) {
        self.imported = None;
        self.import_failed = true;
        self.supported_composition = Composition::GPU;
    }

    /// Diffs against the previous frame's layer at the same slot.
    fn validate_previous_frame_state(&mut self, previous: Option<&Self>, client: &ClientLayer) {
        let invisible = self.state & OverlayState::INVISIBLE;
        let Some(prev) = previous else {
            self.state = OverlayState::default() | OverlayState::NEEDS_REVALIDATION | invisible;
            return;
        };

        let mut state = invisible;
        if prev.is_visible() != self.is_visible() || prev.kind != self.kind {
            state |= OverlayState::NEEDS_REVALIDATION;
        }
        if prev.display_frame != self.display_frame
            || prev.merged_transform != self.merged_transform
        {
            state |= OverlayState::DIMENSIONS_CHANGED | OverlayState::NEEDS_REVALIDATION;
        }
        if prev.source_crop != self.source_crop {
            state |= OverlayState::SOURCE_RECT_CHANGED | OverlayState::NEEDS_REVALIDATION;
        }
        if prev.blending != self.blending
            || prev.alpha != self.alpha
            || prev.color_space != self.color_space
            || prev.supported_composition != self.supported_composition
        {
            state |= OverlayState::NEEDS_REVALIDATION;
        }
        match (self.buffer(), prev.buffer()) {
            (Some(cur), Some(old)) => {
                if !Arc::ptr_eq(cur, old) {
                    state |= OverlayState::CONTENT_CHANGED;
                    if cur.format() != old.format() || cur.info().modifier != old.info().modifier {
                        state |= OverlayState::NEEDS_REVALIDATION;
                    }
                }
            }
            (None, None) => {
                if prev.solid_color != self.solid_color {
                    state |= OverlayState::CONTENT_CHANGED;
                }
            }
            _ => state |= OverlayState::CONTENT_CHANGED | OverlayState::NEEDS_REVALIDATION,
        }
        if client.has_content_changed() {
            state |= OverlayState::CONTENT_CHANGED;
        }

        let moved = state.contains(OverlayState::DIMENSIONS_CHANGED)
            || (prev.is_visible() && !self.is_visible());
        if moved && prev.actual_composition == Composition::GPU {
            state |= OverlayState::NEEDS_PARTIAL_CLEAR;
        }
        if !state.contains(OverlayState::NEEDS_REVALIDATION) {
            self.actual_composition = prev.actual_composition;
        }
        self.state = state;
    }

    /// A copy sharing this layer's buffer, placed at `display_frame`.
    ///
    /// No import takes place; the acquire fence is duplicated so both layers
    /// can hand one to their plane.
    pub fn clone_layer(&self, display_frame: Rect, z_order: u32) -> Result<Self, FenceError> {
        let imported = match &self.imported {
            Some(reference) => {
                let fence = reference.acquire_fence().map(Fence::try_clone).transpose()?;
                Some(BufferReference::new(reference.buffer().clone(), fence))
            }
            None => None,
        };
        let surface_damage = if self.surface_damage.is_empty() {
            Rect::ZERO
        } else {
            display_frame
        };
        Ok(Self {
            transform: self.transform,
            plane_transform: self.plane_transform,
            merged_transform: self.merged_transform,
            z_order,
            layer_index: self.layer_index,
            alpha: self.alpha,
            blending: self.blending,
            dataspace: self.dataspace,
            color_space: self.color_space,
            hdr_metadata: self.hdr_metadata,
            solid_color: self.solid_color,
            source_crop: self.source_crop,
            display_frame,
            surface_damage,
            state: self.state,
            imported,
            import_failed: self.import_failed,
            supported_composition: self.supported_composition,
            actual_composition: self.actual_composition,
            kind: self.kind,
        })
    }

    // -- Buffer and fence --

    /// Replaces the buffer.
    ///
    /// With `register` set the import goes through the cache; otherwise the
    /// buffer is imported privately. On failure the layer is left without a
    /// buffer and `acquire_fence` is closed.
    pub fn set_buffer(
        &mut self,
        handle: NativeHandle,
        acquire_fence: Option<Fence>,
        resources: &mut ResourceManager,
        register: bool,
    ) -> Result<(), ImportError> {
        let imported = if register {
            resources.import(handle)
        } else {
            resources.import_uncached(handle)
        };
        match imported {
            Ok(buffer) => {
                if !matches!(self.kind, LayerKind::Cursor | LayerKind::SolidColor) {
                    self.kind = LayerKind::Normal;
                }
                self.attach(buffer, acquire_fence);
                Ok(())
            }
            Err(error) => {
                self.fail_import();
                Err(error)
            }
        }
    }

    /// The imported buffer, if the import succeeded.
    #[must_use]
    pub fn buffer(&self) -> Option<&Arc<OverlayBuffer>> {
        self.imported.as_ref().map(BufferReference::buffer)
    }

    /// The buffer together with its acquire fence.
    #[must_use]
    pub fn buffer_reference(&self) -> Option<&BufferReference> {
        self.imported.as_ref()
    }

    /// Whether importing the client's buffer failed this frame.
    #[must_use]
    pub fn import_failed(&self) -> bool {
        self.import_failed
    }

    /// Borrows the acquire fence.
    #[must_use]
    pub fn acquire_fence(&self) -> Option<&Fence> {
        self.imported.as_ref().and_then(BufferReference::acquire_fence)
    }

    /// Replaces the acquire fence. Without a buffer the fence is closed.
    pub fn set_acquire_fence(&mut self, fence: Option<Fence>) {
        if let Some(reference) = &mut self.imported {
            reference.set_acquire_fence(fence);
        }
    }

    /// Moves the acquire fence out.
    pub fn take_acquire_fence(&mut self) -> Option<Fence> {
        self.imported
            .as_mut()
            .and_then(BufferReference::take_acquire_fence)
    }

    // -- Geometry --

    /// Stacking position.
    #[must_use]
    pub fn z_order(&self) -> u32 {
        self.z_order
    }

    /// Index of the client layer this one was built from.
    #[must_use]
    pub fn layer_index(&self) -> u32 {
        self.layer_index
    }

    /// Source crop.
    #[must_use]
    pub fn source_crop(&self) -> kurbo::Rect {
        self.source_crop
    }

    /// Sets the source crop.
    pub fn set_source_crop(&mut self, crop: kurbo::Rect) {
        self.source_crop = crop;
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

    /// Display frame, clamped to the output.
    #[must_use]
    pub fn display_frame(&self) -> Rect {
        self.display_frame
    }

    /// Sets the display frame.
    pub fn set_display_frame(&mut self, frame: Rect) {
        self.display_frame = frame;
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

    /// Output area this layer dirtied.
    #[must_use]
    pub fn surface_damage(&self) -> Rect {
        self.surface_damage
    }

    /// The layer's own transform, without the output rotation.
    #[must_use]
    pub fn transform(&self) -> Transform {
        self.transform
    }

    /// Sets the layer's own transform.
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.merged_transform = transform.then(self.plane_transform);
    }

    /// The output rotation alone, for backends that rotate per plane.
    #[must_use]
    pub fn plane_transform(&self) -> Transform {
        self.plane_transform
    }

    /// The layer transform followed by the output rotation.
    #[must_use]
    pub fn merged_transform(&self) -> Transform {
        self.merged_transform
    }

    // -- Appearance --

    /// Plane alpha.
    #[must_use]
    pub fn alpha(&self) -> u8 {
        self.alpha
    }

    /// Blending mode.
    #[must_use]
    pub fn blending(&self) -> Blending {
        self.blending
    }

    /// Sets the blending mode.
    pub fn set_blending(&mut self, blending: Blending) {
        self.blending = blending;
    }

    /// Dataspace.
    #[must_use]
    pub fn dataspace(&self) -> u32 {
        self.dataspace
    }

    /// Colour space.
    #[must_use]
    pub fn color_space(&self) -> u32 {
        self.color_space
    }

    /// Static HDR metadata.
    #[must_use]
    pub fn hdr_metadata(&self) -> &HdrStaticMetadata {
        &self.hdr_metadata
    }

    /// Fill colour of a solid-colour layer.
    #[must_use]
    pub fn solid_color(&self) -> u32 {
        self.solid_color
    }

    /// Fill colour bytes in little-endian order.
    #[must_use]
    pub fn solid_color_bytes(&self) -> [u8; 4] {
        self.solid_color.to_le_bytes()
    }

    // -- Classification --

    /// Layer kind.
    #[must_use]
    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    /// Applies a video hint.
    pub fn set_video_layer(&mut self, video: bool) {
        self.kind = self.kind.with_video(video);
    }

    /// Applies a protection hint.
    pub fn set_protected(&mut self, protected: bool) {
        self.kind = self.kind.with_protected(protected);
    }

    /// Video or protected video.
    #[must_use]
    pub fn is_video_layer(&self) -> bool {
        self.kind.is_video()
    }

    /// Protected video.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.kind == LayerKind::Protected
    }

    /// Cursor.
    #[must_use]
    pub fn is_cursor_layer(&self) -> bool {
        self.kind == LayerKind::Cursor
    }

    /// Solid colour fill.
    #[must_use]
    pub fn is_solid_color(&self) -> bool {
        self.kind == LayerKind::SolidColor
    }

    /// Whether the layer should get a plane of its own.
    #[must_use]
    pub fn prefers_separate_plane(&self) -> bool {
        self.kind.prefers_separate_plane()
    }

    // -- Composition --

    /// Narrows the ways this layer may be composited.
    pub fn set_supported_composition(&mut self, composition: Composition) {
        self.supported_composition = composition;
    }

    /// Ways this layer may be composited.
    #[must_use]
    pub fn supported_composition(&self) -> Composition {
        self.supported_composition
    }

    /// Records the composition chosen for this frame.
    pub fn set_layer_composition(&mut self, composition: Composition) {
        self.actual_composition = composition;
    }

    /// Composition chosen for this frame.
    #[must_use]
    pub fn actual_composition(&self) -> Composition {
        self.actual_composition
    }

    /// Whether a display plane may scan the layer out directly.
    #[must_use]
    pub fn can_scan_out(&self) -> bool {
        self.supported_composition.contains(Composition::DISPLAY)
    }

    // -- State --

    /// Raw state bits.
    #[must_use]
    pub fn state(&self) -> OverlayState {
        self.state
    }

    /// Whether the content changed since the previous frame.
    #[must_use]
    pub fn has_layer_content_changed(&self) -> bool {
        self.state.contains(OverlayState::CONTENT_CHANGED)
    }

    /// Whether the frame or transform changed since the previous frame.
    #[must_use]
    pub fn has_dimensions_changed(&self) -> bool {
        self.state.contains(OverlayState::DIMENSIONS_CHANGED)
    }

    /// Whether the source crop changed since the previous frame.
    #[must_use]
    pub fn has_source_rect_changed(&self) -> bool {
        self.state.contains(OverlayState::SOURCE_RECT_CHANGED)
    }

    /// Whether the plane assignment has to be validated again.
    #[must_use]
    pub fn needs_revalidation(&self) -> bool {
        self.state.contains(OverlayState::NEEDS_REVALIDATION)
    }

    /// Whether GPU-composited area left behind must be cleared.
    #[must_use]
    pub fn needs_partial_clear(&self) -> bool {
        self.state.contains(OverlayState::NEEDS_PARTIAL_CLEAR)
    }

    /// Whether any of the layer reaches the screen.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        !self.state.contains(OverlayState::INVISIBLE)
    }
}
