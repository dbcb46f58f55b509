// Copyright 2026 the Scanout Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change-tracking flag sets and the layer classification state machine.

use bitflags::bitflags;

bitflags! {
    /// Per-frame state of a [`ClientLayer`](super::ClientLayer).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ClientState: u8 {
        /// The surface damage differs from the last frame.
        const SURFACE_DAMAGE_CHANGED = 1 << 0;
        /// New content was attached (buffer, damage or solid colour).
        const CONTENT_CHANGED = 1 << 1;
        /// The visible region differs from the last frame.
        const VISIBLE_REGION_CHANGED = 1 << 2;
        /// The display frame is non-empty and the layer is not hidden.
        const VISIBLE = 1 << 3;
        /// A presentation pipeline has consumed the current values.
        const VALIDATED = 1 << 4;
        /// A visible region has been supplied at least once.
        const VISIBLE_REGION_SET = 1 << 5;
        /// The z-order differs from the last frame.
        const ZORDER_CHANGED = 1 << 6;
    }
}

impl Default for ClientState {
    fn default() -> Self {
        Self::SURFACE_DAMAGE_CHANGED | Self::VISIBLE_REGION_CHANGED | Self::ZORDER_CHANGED
    }
}

bitflags! {
    /// Geometry change cache of a [`ClientLayer`](super::ClientLayer).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ClientCache: u8 {
        /// Geometry, transform, alpha, blending or colour changed.
        const ATTRIBUTES_CHANGED = 1 << 0;
        /// The display frame changed.
        const DISPLAY_FRAME_CHANGED = 1 << 1;
        /// The source crop changed.
        const SOURCE_RECT_CHANGED = 1 << 2;
    }
}

impl Default for ClientCache {
    fn default() -> Self {
        Self::ATTRIBUTES_CHANGED | Self::DISPLAY_FRAME_CHANGED
    }
}

bitflags! {
    /// Per-frame state of an [`OverlayLayer`](super::OverlayLayer), relative
    /// to the previous frame's layer at the same stacking position.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OverlayState: u8 {
        /// The buffer or its damage changed.
        const CONTENT_CHANGED = 1 << 0;
        /// The display frame or transform changed.
        const DIMENSIONS_CHANGED = 1 << 1;
        /// Nothing of the layer reaches the screen.
        const INVISIBLE = 1 << 2;
        /// The source crop changed.
        const SOURCE_RECT_CHANGED = 1 << 3;
        /// The plane assignment must be validated again.
        const NEEDS_REVALIDATION = 1 << 4;
        /// Area previously composited by the GPU must be cleared.
        const NEEDS_PARTIAL_CLEAR = 1 << 5;
    }
}

impl Default for OverlayState {
    fn default() -> Self {
        Self::CONTENT_CHANGED | Self::DIMENSIONS_CHANGED
    }
}

bitflags! {
    /// Ways a layer can reach the screen.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Composition: u8 {
        /// Merged into the output by a GPU pass.
        const GPU = 1 << 0;
        /// Scanned out by a display plane directly.
        const DISPLAY = 1 << 1;
        /// Either.
        const ALL = Self::GPU.bits() | Self::DISPLAY.bits();
    }
}

impl Default for Composition {
    fn default() -> Self {
        Self::ALL
    }
}

/// Classification of an overlay layer.
///
/// Video and protected content form a small sticky state machine; the
/// transitions are spelled out in [`with_video`](Self::with_video) and
/// [`with_protected`](Self::with_protected). Cursor and solid-colour layers
/// never take part in it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Ordinary client content.
    #[default]
    Normal,
    /// Decoded video.
    Video,
    /// Video that must stay on a secure path.
    Protected,
    /// Cursor content.
    Cursor,
    /// A plain colour fill with no buffer.
    SolidColor,
}

impl LayerKind {
    /// Applies a video hint.
    ///
    /// | from        | `true`      | `false`     |
    /// |-------------|-------------|-------------|
    /// | `Normal`    | `Video`     | `Normal`    |
    /// | `Video`     | `Video`     | `Normal`    |
    /// | `Protected` | `Protected` | `Protected` |
    #[must_use]
    pub const fn with_video(self, video: bool) -> Self {
        match (self, video) {
            (Self::Normal | Self::Video, true) => Self::Video,
            (Self::Normal | Self::Video, false) => Self::Normal,
            (other, _) => other,
        }
    }

    /// Applies a protection hint.
    ///
    /// | from        | `true`      | `false`  |
    /// |-------------|-------------|----------|
    /// | `Normal`    | `Protected` | `Normal` |
    /// | `Video`     | `Protected` | `Video`  |
    /// | `Protected` | `Protected` | `Video`  |
    #[must_use]
    pub const fn with_protected(self, protected: bool) -> Self {
        match (self, protected) {
            (Self::Normal | Self::Video | Self::Protected, true) => Self::Protected,
            (Self::Protected, false) => Self::Video,
            (other, _) => other,
        }
    }

    /// Video and protected layers.
    #[must_use]
    pub const fn is_video(self) -> bool {
        matches!(self, Self::Video | Self::Protected)
    }

    /// Layers that should get a plane of their own instead of sharing the
    /// GPU-composited one.
    #[must_use]
    pub const fn prefers_separate_plane(self) -> bool {
        self.is_video()
    }
}
